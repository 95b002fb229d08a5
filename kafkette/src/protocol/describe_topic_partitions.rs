//! DescribeTopicPartitions (key 75) request decoding and response encoding
//!
//! Only the first entry of the request's topics array is decoded. Requests
//! naming several topics are answered for the first one alone.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use super::compact::{decode_compact_len, encode_compact_len};
use super::constants::{
    ERROR_UNKNOWN_TOPIC_OR_PARTITION, NULL_CURSOR, TAG_BUFFER_EMPTY, THROTTLE_TIME_MS,
    TOPIC_AUTHORIZED_OPERATIONS, UNKNOWN_TOPIC_ID,
};
use crate::error::{ProtocolError, Result};

/// Decoded DescribeTopicPartitions v0 request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeTopicPartitionsRequestBody {
    /// Name of the first topic in the request, as sent on the wire
    pub topic_name: Bytes,
    /// Maximum number of partitions the client wants back
    pub response_partition_limit: i32,
}

impl DescribeTopicPartitionsRequestBody {
    /// Decodes the body starting at `offset`, the end of the request header
    ///
    /// Body layout:
    /// - topics: compact array length (1 byte)
    /// - first topic name: compact string length (1 byte), then raw bytes
    /// - first topic tagged fields (1 byte)
    /// - response_partition_limit: int32
    ///
    /// # Returns
    /// * `Ok(Self)` - Topic name and partition limit
    /// * `Err(ProtocolError::MalformedBody)` - If a compact length is null or
    ///   zero, or the payload ends early
    pub fn decode(payload: &[u8], offset: usize) -> Result<Self> {
        let mut buf = payload.get(offset..).ok_or_else(|| {
            malformed(format!(
                "body offset {} is past the end of a {} byte payload",
                offset,
                payload.len()
            ))
        })?;

        let topics_len = read_u8(&mut buf, "topics array length")?;
        match decode_compact_len(topics_len) {
            Some(count) if count >= 1 => {}
            _ => return Err(malformed("no topics found".to_string())),
        }

        let name_len = read_u8(&mut buf, "topic name length")?;
        let name_len = match decode_compact_len(name_len) {
            Some(len) if len >= 1 => len,
            _ => return Err(malformed("invalid topic name length".to_string())),
        };
        if buf.remaining() < name_len {
            return Err(malformed(format!(
                "topic name needs {} bytes, {} remain",
                name_len,
                buf.remaining()
            )));
        }
        let topic_name = Bytes::copy_from_slice(&buf[..name_len]);
        buf.advance(name_len);

        read_u8(&mut buf, "topic tagged fields")?;

        if buf.remaining() < 4 {
            return Err(malformed(
                "unexpected end of payload while reading response partition limit".to_string(),
            ));
        }
        let response_partition_limit = buf.get_i32();

        Ok(Self {
            topic_name,
            response_partition_limit,
        })
    }
}

fn read_u8(buf: &mut &[u8], field: &str) -> Result<u8> {
    if !buf.has_remaining() {
        return Err(malformed(format!(
            "unexpected end of payload while reading {}",
            field
        )));
    }
    Ok(buf.get_u8())
}

fn malformed(message: String) -> ProtocolError {
    ProtocolError::MalformedBody(message)
}

/// Per-topic values reported in a DescribeTopicPartitions response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescription {
    pub error_code: i16,
    /// Topic name bytes, echoed unchanged
    pub name: Bytes,
    pub topic_id: Uuid,
    pub is_internal: bool,
    pub authorized_operations: u32,
}

impl TopicDescription {
    /// Describes a topic this broker has no record of
    ///
    /// With no topic registry behind the broker, this is the answer for every
    /// name: UNKNOWN_TOPIC_OR_PARTITION, a nil topic id and no partitions.
    pub fn unknown(name: impl Into<Bytes>) -> Self {
        Self {
            error_code: ERROR_UNKNOWN_TOPIC_OR_PARTITION,
            name: name.into(),
            topic_id: UNKNOWN_TOPIC_ID,
            is_internal: false,
            authorized_operations: TOPIC_AUTHORIZED_OPERATIONS,
        }
    }
}

/// Encodes a DescribeTopicPartitions v0 response body, without the size prefix
///
/// Layout:
/// - correlation_id: int32, then header tagged fields
/// - throttle_time_ms: int32
/// - topics: compact array length, then per topic
///   error_code int16, compact name, topic_id (16 bytes), is_internal int8,
///   empty partitions array, authorized_operations uint32, tagged fields
/// - next_cursor: 0xff (null)
/// - tagged fields
pub fn encode_describe_topic_partitions_response(
    correlation_id: i32,
    topics: &[TopicDescription],
) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(64);

    buf.put_i32(correlation_id);
    buf.put_u8(TAG_BUFFER_EMPTY);
    buf.put_i32(THROTTLE_TIME_MS);

    buf.put_u8(encode_compact_len(topics.len())?);
    for topic in topics {
        buf.put_i16(topic.error_code);
        buf.put_u8(encode_compact_len(topic.name.len())?);
        buf.put_slice(&topic.name);
        buf.put_slice(topic.topic_id.as_bytes());
        buf.put_u8(topic.is_internal as u8);
        // No partitions are ever reported
        buf.put_u8(encode_compact_len(0)?);
        buf.put_u32(topic.authorized_operations);
        buf.put_u8(TAG_BUFFER_EMPTY);
    }

    buf.put_u8(NULL_CURSOR);
    buf.put_u8(TAG_BUFFER_EMPTY);

    Ok(buf.freeze())
}
