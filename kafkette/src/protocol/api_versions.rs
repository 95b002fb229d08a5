//! ApiVersions (key 18) response encoding
//!
//! ApiVersions requests carry no body this broker needs, so only the response
//! side lives here.

use bytes::{BufMut, Bytes, BytesMut};

use super::compact::encode_compact_len;
use super::constants::{
    API_KEY_API_VERSIONS, API_KEY_DESCRIBE_TOPIC_PARTITIONS, API_VERSIONS_MAX_VERSION,
    API_VERSIONS_MIN_VERSION, DESCRIBE_TOPIC_PARTITIONS_MAX_VERSION,
    DESCRIBE_TOPIC_PARTITIONS_MIN_VERSION, ERROR_NONE, ERROR_UNSUPPORTED_VERSION,
    TAG_BUFFER_EMPTY, THROTTLE_TIME_MS,
};
use super::header::Request;
use crate::error::Result;

/// One advertised API and its inclusive version range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersionRange {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

/// APIs advertised in every ApiVersions response, in wire order
pub const SUPPORTED_APIS: [ApiVersionRange; 2] = [
    ApiVersionRange {
        api_key: API_KEY_API_VERSIONS,
        min_version: API_VERSIONS_MIN_VERSION,
        max_version: API_VERSIONS_MAX_VERSION,
    },
    ApiVersionRange {
        api_key: API_KEY_DESCRIBE_TOPIC_PARTITIONS,
        min_version: DESCRIBE_TOPIC_PARTITIONS_MIN_VERSION,
        max_version: DESCRIBE_TOPIC_PARTITIONS_MAX_VERSION,
    },
];

/// Error code for an ApiVersions request of the given version
///
/// 0 inside the advertised range, 35 (UNSUPPORTED_VERSION) otherwise.
pub fn api_versions_error_code(api_version: i16) -> i16 {
    if (API_VERSIONS_MIN_VERSION..=API_VERSIONS_MAX_VERSION).contains(&api_version) {
        ERROR_NONE
    } else {
        ERROR_UNSUPPORTED_VERSION
    }
}

/// Encodes the ApiVersions response body for `request`, without the size prefix
///
/// Layout:
/// - correlation_id: int32
/// - error_code: int16
/// - api_keys: compact array length (1 byte), then per entry
///   api_key int16, min_version int16, max_version int16, tagged fields
/// - throttle_time_ms: int32
/// - tagged fields
pub fn encode_api_versions_response(request: &Request) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(32);

    buf.put_i32(request.correlation_id);
    buf.put_i16(api_versions_error_code(request.api_version));

    buf.put_u8(encode_compact_len(SUPPORTED_APIS.len())?);
    for api in &SUPPORTED_APIS {
        buf.put_i16(api.api_key);
        buf.put_i16(api.min_version);
        buf.put_i16(api.max_version);
        buf.put_u8(TAG_BUFFER_EMPTY);
    }

    buf.put_i32(THROTTLE_TIME_MS);
    buf.put_u8(TAG_BUFFER_EMPTY);

    Ok(buf.freeze())
}
