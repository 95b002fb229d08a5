//! Per-connection request loop
//!
//! A connection reads a frame, parses the header, decodes the body when the
//! API has one, writes the response, and goes back to reading. Requests on one
//! connection are handled strictly one after another, so responses leave in
//! the order requests arrived. Any error ends the loop and the connection.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::constants::{
    API_KEY_API_VERSIONS, API_KEY_DESCRIBE_TOPIC_PARTITIONS, DESCRIBE_TOPIC_PARTITIONS_MAX_VERSION,
    DESCRIBE_TOPIC_PARTITIONS_MIN_VERSION,
};
use crate::protocol::{
    encode_api_versions_response, encode_describe_topic_partitions_response, parse_header,
    read_frame, write_frame, DescribeTopicPartitionsRequestBody, Request, TopicDescription,
};

/// Outcome of dispatching one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Send this response body (size prefix not included)
    Respond(Bytes),
    /// The API key is not handled; send nothing and wait for the next frame
    Ignore,
}

/// Routes a parsed request to its handler and encodes the reply
///
/// # Arguments
/// * `request` - Parsed header
/// * `payload` - Full frame payload, header included
/// * `body_offset` - Offset where the request body starts
///
/// # Returns
/// * `Ok(Dispatch::Respond)` - For ApiVersions (any version) and DescribeTopicPartitions v0
/// * `Ok(Dispatch::Ignore)` - For every other key/version
/// * `Err(ProtocolError)` - If the body is malformed or the reply cannot be encoded
pub fn dispatch(request: &Request, payload: &[u8], body_offset: usize) -> Result<Dispatch> {
    match request.api_key {
        API_KEY_DESCRIBE_TOPIC_PARTITIONS
            if (DESCRIBE_TOPIC_PARTITIONS_MIN_VERSION..=DESCRIBE_TOPIC_PARTITIONS_MAX_VERSION)
                .contains(&request.api_version) =>
        {
            let body = DescribeTopicPartitionsRequestBody::decode(payload, body_offset)?;
            debug!(
                "DescribeTopicPartitions for topic '{}' (partition limit {})",
                String::from_utf8_lossy(&body.topic_name),
                body.response_partition_limit
            );
            let topics = [TopicDescription::unknown(body.topic_name)];
            let response =
                encode_describe_topic_partitions_response(request.correlation_id, &topics)?;
            Ok(Dispatch::Respond(response))
        }
        API_KEY_API_VERSIONS => Ok(Dispatch::Respond(encode_api_versions_response(request)?)),
        _ => Ok(Dispatch::Ignore),
    }
}

/// One client connection and its request loop
pub struct Connection<S> {
    stream: S,
    peer: String,
    max_frame_bytes: usize,
    requests_handled: u64,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an accepted stream
    ///
    /// # Arguments
    /// * `stream` - The client socket (or any duplex byte stream in tests)
    /// * `peer` - Peer description used in log lines
    /// * `max_frame_bytes` - Largest request payload accepted
    pub fn new(stream: S, peer: impl Into<String>, max_frame_bytes: usize) -> Self {
        Self {
            stream,
            peer: peer.into(),
            max_frame_bytes,
            requests_handled: 0,
        }
    }

    /// Number of requests answered or ignored so far
    pub fn requests_handled(&self) -> u64 {
        self.requests_handled
    }

    /// Serves requests until the peer closes the stream or an error occurs
    ///
    /// # Returns
    /// * `Ok(())` - The peer closed the stream between frames
    /// * `Err(ProtocolError)` - Framing, header, body or write failure; the
    ///   connection must be dropped
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let payload = match read_frame(&mut self.stream, self.max_frame_bytes).await? {
                Some(payload) => payload,
                None => {
                    debug!(
                        "Peer {} closed the connection after {} requests",
                        self.peer, self.requests_handled
                    );
                    return Ok(());
                }
            };

            let (request, body_offset) = parse_header(&payload)?;
            debug!(
                "Request from {}: api_key={} api_version={} correlation_id={} client_id={:?} size={}",
                self.peer,
                request.api_key,
                request.api_version,
                request.correlation_id,
                request.client_id,
                request.message_size
            );

            match dispatch(&request, &payload, body_offset)? {
                Dispatch::Respond(response) => {
                    write_frame(&mut self.stream, &response).await?;
                }
                Dispatch::Ignore => {
                    warn!(
                        "Ignoring unsupported request from {}: api_key={} api_version={} correlation_id={}",
                        self.peer, request.api_key, request.api_version, request.correlation_id
                    );
                }
            }
            self.requests_handled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use crate::protocol::DEFAULT_MAX_FRAME_BYTES;
    use bytes::{BufMut, BytesMut};
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn api_versions_frame(api_version: i16, correlation_id: i32) -> Vec<u8> {
        let mut payload = BytesMut::new();
        payload.put_i16(API_KEY_API_VERSIONS);
        payload.put_i16(api_version);
        payload.put_i32(correlation_id);
        payload.put_i16(4);
        payload.put_slice(b"test");
        if api_version >= 3 {
            payload.put_u8(0);
        }
        frame(&payload)
    }

    fn describe_frame(correlation_id: i32, topics_len: u8, name: &[u8]) -> Vec<u8> {
        let mut payload = BytesMut::new();
        payload.put_i16(API_KEY_DESCRIBE_TOPIC_PARTITIONS);
        payload.put_i16(0);
        payload.put_i32(correlation_id);
        payload.put_i16(-1);
        payload.put_u8(0);
        payload.put_u8(topics_len);
        payload.put_u8(name.len() as u8 + 1);
        payload.put_slice(name);
        payload.put_u8(0);
        payload.put_i32(100);
        payload.put_u8(0xff);
        payload.put_u8(0);
        frame(&payload)
    }

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut buf = (payload.len() as u32).to_be_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf
    }

    async fn read_response(client: &mut DuplexStream) -> Vec<u8> {
        let mut size = [0u8; 4];
        client.read_exact(&mut size).await.unwrap();
        let mut body = vec![0u8; u32::from_be_bytes(size) as usize];
        client.read_exact(&mut body).await.unwrap();
        body
    }

    fn spawn_connection(
        server: DuplexStream,
    ) -> tokio::task::JoinHandle<(Result<()>, u64)> {
        tokio::spawn(async move {
            let mut connection = Connection::new(server, "test-peer", DEFAULT_MAX_FRAME_BYTES);
            let result = connection.run().await;
            (result, connection.requests_handled())
        })
    }

    #[test]
    fn test_dispatch_unknown_key_is_ignored() {
        let request = Request {
            message_size: 8,
            api_key: 0,
            api_version: 9,
            correlation_id: 1,
            client_id: None,
        };
        assert_eq!(dispatch(&request, &[], 8).unwrap(), Dispatch::Ignore);
    }

    #[test]
    fn test_dispatch_describe_unsupported_version_is_ignored() {
        let request = Request {
            message_size: 11,
            api_key: API_KEY_DESCRIBE_TOPIC_PARTITIONS,
            api_version: 1,
            correlation_id: 1,
            client_id: None,
        };
        assert_eq!(dispatch(&request, &[], 11).unwrap(), Dispatch::Ignore);
    }

    #[tokio::test]
    async fn test_api_versions_round_trip() {
        let (mut client, server) = duplex(1024);
        let handle = spawn_connection(server);

        client.write_all(&api_versions_frame(4, 7)).await.unwrap();
        let body = read_response(&mut client).await;
        assert_eq!(&body[0..4], &7i32.to_be_bytes());
        assert_eq!(&body[4..6], &0i16.to_be_bytes());
        assert_eq!(body[6], 3);

        drop(client);
        let (result, handled) = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(handled, 1);
    }

    #[tokio::test]
    async fn test_describe_topic_partitions_round_trip() {
        let (mut client, server) = duplex(1024);
        let handle = spawn_connection(server);

        client.write_all(&describe_frame(21, 2, b"foo")).await.unwrap();
        let body = read_response(&mut client).await;
        assert_eq!(&body[0..4], &21i32.to_be_bytes());
        assert_eq!(&body[10..12], &3i16.to_be_bytes());
        assert_eq!(&body[12..16], &[4, b'f', b'o', b'o']);
        assert_eq!(&body[body.len() - 2..], &[0xff, 0x00]);

        drop(client);
        let (result, _) = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_describe_echoes_non_utf8_topic_name() {
        let (mut client, server) = duplex(1024);
        let handle = spawn_connection(server);

        client
            .write_all(&describe_frame(22, 2, &[0xff, 0xfe, 0xfd]))
            .await
            .unwrap();
        let body = read_response(&mut client).await;
        assert_eq!(&body[0..4], &22i32.to_be_bytes());
        assert_eq!(&body[10..12], &3i16.to_be_bytes());
        assert_eq!(&body[12..16], &[4, 0xff, 0xfe, 0xfd]);

        drop(client);
        let (result, handled) = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(handled, 1);
    }

    #[tokio::test]
    async fn test_responses_follow_request_order() {
        let (mut client, server) = duplex(4096);
        let handle = spawn_connection(server);

        let mut batch = api_versions_frame(4, 1);
        batch.extend_from_slice(&describe_frame(2, 2, b"orders"));
        batch.extend_from_slice(&api_versions_frame(7, 3));
        client.write_all(&batch).await.unwrap();

        let first = read_response(&mut client).await;
        let second = read_response(&mut client).await;
        let third = read_response(&mut client).await;
        assert_eq!(&first[0..4], &1i32.to_be_bytes());
        assert_eq!(&second[0..4], &2i32.to_be_bytes());
        assert_eq!(&third[0..4], &3i32.to_be_bytes());
        assert_eq!(&third[4..6], &35i16.to_be_bytes());

        drop(client);
        let (_, handled) = handle.await.unwrap();
        assert_eq!(handled, 3);
    }

    #[tokio::test]
    async fn test_unknown_key_keeps_connection_open() {
        let (mut client, server) = duplex(1024);
        let handle = spawn_connection(server);

        let mut unknown = BytesMut::new();
        unknown.put_i16(3);
        unknown.put_i16(12);
        unknown.put_i32(50);
        client.write_all(&frame(&unknown)).await.unwrap();
        client.write_all(&api_versions_frame(4, 51)).await.unwrap();

        let body = read_response(&mut client).await;
        assert_eq!(&body[0..4], &51i32.to_be_bytes());

        drop(client);
        let (result, handled) = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(handled, 2);
    }

    #[tokio::test]
    async fn test_malformed_body_closes_connection() {
        let (mut client, server) = duplex(1024);
        let handle = spawn_connection(server);

        client.write_all(&describe_frame(9, 1, b"foo")).await.unwrap();

        let (result, handled) = handle.await.unwrap();
        assert!(matches!(result, Err(ProtocolError::MalformedBody(_))));
        assert_eq!(handled, 0);

        // Server side is gone, so the client sees end of stream
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_short_header_closes_connection() {
        let (mut client, server) = duplex(1024);
        let handle = spawn_connection(server);

        client.write_all(&frame(&[0x00, 0x12, 0x00])).await.unwrap();

        let (result, _) = handle.await.unwrap();
        assert!(matches!(result, Err(ProtocolError::HeaderParse { .. })));
    }

    #[tokio::test]
    async fn test_truncated_frame_closes_connection() {
        let (mut client, server) = duplex(1024);
        let handle = spawn_connection(server);

        client.write_all(&[0x00, 0x00, 0x00, 0x20, 0x00]).await.unwrap();
        drop(client);

        let (result, _) = handle.await.unwrap();
        assert!(matches!(result, Err(ProtocolError::Framing(_))));
    }
}
