//! kafkette-probe - query a broker for its API versions and topic descriptions
//!
//! Sends an ApiVersions request, prints the advertised version ranges, and when
//! `--topic` is given also sends a DescribeTopicPartitions v0 request for that
//! topic and prints the broker's answer.

use anyhow::{anyhow, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use clap::Parser;
use kafka_protocol::messages::api_versions_request::ApiVersionsRequest;
use kafka_protocol::messages::api_versions_response::ApiVersionsResponse;
use kafka_protocol::messages::{RequestHeader, ResponseHeader};
use kafka_protocol::protocol::{Decodable, Encodable, StrBytes};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use kafkette::protocol::constants::{API_KEY_API_VERSIONS, API_KEY_DESCRIBE_TOPIC_PARTITIONS};
use kafkette::protocol::{decode_compact_len, encode_compact_len, HeaderLayout};

/// ApiVersions version the probe speaks
const API_VERSIONS_VERSION: i16 = 3;

/// Largest response the probe will read (100MB)
const MAX_RESPONSE_BYTES: usize = 100 * 1024 * 1024;

/// Command-line arguments for the probe
#[derive(Parser, Debug)]
#[command(name = "kafkette-probe")]
#[command(about = "Query a Kafka-protocol broker for API versions and topic descriptions")]
struct Args {
    /// Broker address
    #[arg(short, long, default_value = "localhost:9092")]
    broker: String,

    /// Topic to describe with DescribeTopicPartitions
    #[arg(short, long)]
    topic: Option<String>,

    /// Client id sent in request headers
    #[arg(long, default_value = "kafkette-probe")]
    client_id: String,
}

/// Single-connection client that sends one request at a time
struct ProbeClient {
    stream: TcpStream,
    client_id: String,
    correlation_id: i32,
}

impl ProbeClient {
    async fn connect(broker: &str, client_id: &str) -> Result<Self> {
        info!("Connecting to broker at {}", broker);
        let stream = TcpStream::connect(broker)
            .await
            .map_err(|e| anyhow!("Failed to connect to broker at {}: {}", broker, e))?;
        Ok(Self {
            stream,
            client_id: client_id.to_string(),
            correlation_id: 1,
        })
    }

    /// Sends a request with the given pre-encoded body and returns the raw response
    ///
    /// The response still starts with the response header; callers decode it.
    async fn send_request(&mut self, api_key: i16, version: i16, body: &[u8]) -> Result<Bytes> {
        let correlation_id = self.correlation_id;
        self.correlation_id += 1;

        let mut header = RequestHeader::default();
        header.request_api_key = api_key;
        header.request_api_version = version;
        header.correlation_id = correlation_id;
        header.client_id = Some(StrBytes::from_string(self.client_id.clone()));

        let header_version = match HeaderLayout::for_api(api_key, version) {
            HeaderLayout::Fixed => 0,
            HeaderLayout::WithClientId => 1,
            HeaderLayout::Flexible => 2,
        };

        let mut buf = Vec::new();
        header
            .encode(&mut buf, header_version)
            .map_err(|e| anyhow!("Failed to encode request header: {}", e))?;
        buf.extend_from_slice(body);

        debug!(
            "Sending api_key {} v{} (correlation_id: {}, {} bytes)",
            api_key,
            version,
            correlation_id,
            buf.len()
        );

        self.stream
            .write_all(&(buf.len() as u32).to_be_bytes())
            .await
            .map_err(|e| anyhow!("Failed to write request size: {}", e))?;
        self.stream
            .write_all(&buf)
            .await
            .map_err(|e| anyhow!("Failed to write request: {}", e))?;

        let mut size_buf = [0u8; 4];
        self.stream.read_exact(&mut size_buf).await.map_err(|e| {
            anyhow!(
                "Failed to read response size: {} (the broker may have closed the connection)",
                e
            )
        })?;
        let response_size = u32::from_be_bytes(size_buf) as usize;
        if response_size > MAX_RESPONSE_BYTES {
            return Err(anyhow!("Response size too large: {} bytes", response_size));
        }

        let mut response = vec![0u8; response_size];
        self.stream
            .read_exact(&mut response)
            .await
            .map_err(|e| anyhow!("Failed to read response body: {}", e))?;

        let response = Bytes::from(response);
        if response.len() < 4 {
            return Err(anyhow!("Response of {} bytes has no header", response.len()));
        }
        let echoed = i32::from_be_bytes([response[0], response[1], response[2], response[3]]);
        if echoed != correlation_id {
            return Err(anyhow!(
                "Correlation id mismatch: sent {}, received {}",
                correlation_id,
                echoed
            ));
        }
        debug!("Received {} byte response", response.len());
        Ok(response)
    }

    /// Sends ApiVersions and returns the decoded response
    async fn api_versions(&mut self) -> Result<ApiVersionsResponse> {
        let mut body = Vec::new();
        ApiVersionsRequest::default()
            .encode(&mut body, API_VERSIONS_VERSION)
            .map_err(|e| anyhow!("Failed to encode ApiVersions request: {}", e))?;

        let mut response = self
            .send_request(API_KEY_API_VERSIONS, API_VERSIONS_VERSION, &body)
            .await?;

        // ApiVersions responses always use response header v0
        ResponseHeader::decode(&mut response, 0)
            .map_err(|e| anyhow!("Failed to decode response header: {}", e))?;
        ApiVersionsResponse::decode(&mut response, API_VERSIONS_VERSION)
            .map_err(|e| anyhow!("Failed to decode ApiVersions response: {}", e))
    }

    /// Sends DescribeTopicPartitions v0 for one topic
    async fn describe_topic(&mut self, topic: &str) -> Result<DescribedTopic> {
        let mut body = BytesMut::new();
        body.put_u8(encode_compact_len(1)?);
        body.put_u8(encode_compact_len(topic.len())?);
        body.put_slice(topic.as_bytes());
        body.put_u8(0);
        body.put_i32(2000); // response_partition_limit
        body.put_u8(0xff); // null cursor
        body.put_u8(0);

        let response = self
            .send_request(API_KEY_DESCRIBE_TOPIC_PARTITIONS, 0, &body)
            .await?;
        parse_describe_response(response)
    }
}

/// First topic of a DescribeTopicPartitions response
#[derive(Debug, PartialEq)]
struct DescribedTopic {
    error_code: i16,
    name: String,
    topic_id: [u8; 16],
    is_internal: bool,
    partitions: usize,
    authorized_operations: u32,
}

fn parse_describe_response(mut buf: Bytes) -> Result<DescribedTopic> {
    // correlation_id(4) + tagged(1) + throttle(4) + topics length(1) + error_code(2) + name length(1)
    if buf.remaining() < 13 {
        return Err(anyhow!("DescribeTopicPartitions response too short"));
    }
    buf.advance(4 + 1 + 4);
    let topics = decode_compact_len(buf.get_u8())
        .ok_or_else(|| anyhow!("Null topics array in response"))?;
    if topics == 0 {
        return Err(anyhow!("Response contains no topics"));
    }

    let error_code = buf.get_i16();
    let name_len = decode_compact_len(buf.get_u8())
        .ok_or_else(|| anyhow!("Null topic name in response"))?;
    // name + topic_id(16) + is_internal(1) + partitions length(1) + authorized_operations(4)
    if buf.remaining() < name_len + 22 {
        return Err(anyhow!("Truncated topic entry in response"));
    }
    let name = String::from_utf8_lossy(&buf[..name_len]).into_owned();
    buf.advance(name_len);

    let mut topic_id = [0u8; 16];
    buf.copy_to_slice(&mut topic_id);
    let is_internal = buf.get_u8() != 0;
    let partitions = decode_compact_len(buf.get_u8()).unwrap_or(0);
    let authorized_operations = buf.get_u32();

    Ok(DescribedTopic {
        error_code,
        name,
        topic_id,
        is_internal,
        partitions,
        authorized_operations,
    })
}

/// Initialize tracing subscriber for structured logging
fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new("warn")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging();

    let mut client = ProbeClient::connect(&args.broker, &args.client_id).await?;

    let versions = client.api_versions().await?;
    println!("ApiVersions (error code {}):", versions.error_code);
    for api in &versions.api_keys {
        println!(
            "   - api_key {:>3}: versions {}-{}",
            api.api_key, api.min_version, api.max_version
        );
    }

    if let Some(topic) = &args.topic {
        let described = client.describe_topic(topic).await?;
        println!("DescribeTopicPartitions '{}':", described.name);
        println!("   - error code: {}", described.error_code);
        println!(
            "   - topic id: {}",
            described
                .topic_id
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<String>()
        );
        println!("   - internal: {}", described.is_internal);
        println!("   - partitions: {}", described.partitions);
        println!(
            "   - authorized operations: 0x{:08x}",
            described.authorized_operations
        );
    }

    Ok(())
}
