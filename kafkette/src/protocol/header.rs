//! Request header parsing
//!
//! Request payload layout (all integers big-endian):
//! - api_key: int16 (offset 0)
//! - api_version: int16 (offset 2)
//! - correlation_id: int32 (offset 4)
//! - client_id_length: int16, then that many bytes (when the API carries a client id)
//! - tagged fields: 1 byte (flexible headers only)

use bytes::Buf;

use super::constants::{
    API_KEY_API_VERSIONS, API_KEY_DESCRIBE_TOPIC_PARTITIONS, API_VERSIONS_FIRST_FLEXIBLE_VERSION,
};
use crate::error::{ProtocolError, Result};

/// Bytes taken by api_key, api_version and correlation_id
pub const FIXED_HEADER_BYTES: usize = 8;

/// Which optional header fields follow the fixed ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    /// api_key, api_version, correlation_id only
    Fixed,
    /// Fixed fields plus an int16-length client id (request header v1)
    WithClientId,
    /// Client id plus one tagged-field byte (request header v2)
    Flexible,
}

impl HeaderLayout {
    /// Selects the header layout a request with this key and version uses
    ///
    /// Keys this broker does not handle only get their fixed fields parsed,
    /// since their bodies are never read.
    pub fn for_api(api_key: i16, api_version: i16) -> Self {
        match api_key {
            API_KEY_API_VERSIONS if api_version >= API_VERSIONS_FIRST_FLEXIBLE_VERSION => {
                HeaderLayout::Flexible
            }
            API_KEY_API_VERSIONS => HeaderLayout::WithClientId,
            API_KEY_DESCRIBE_TOPIC_PARTITIONS => HeaderLayout::Flexible,
            _ => HeaderLayout::Fixed,
        }
    }
}

/// A parsed request header
///
/// Created once per frame and handed to the dispatcher; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Number of payload bytes in the frame, excluding the length prefix
    pub message_size: i32,
    pub api_key: i16,
    pub api_version: i16,
    /// Echoed back in the response so the client can match replies
    pub correlation_id: i32,
    /// `None` when the layout has no client id or the client sent a null one
    pub client_id: Option<String>,
}

/// Parses the request header at the start of `payload`
///
/// # Returns
/// * `Ok((Request, usize))` - The header and the offset where the body begins
/// * `Err(ProtocolError::HeaderParse)` - If the payload ends inside the header
/// * `Err(ProtocolError::InvalidClientIdLength)` - If the client id length is below -1
pub fn parse_header(payload: &[u8]) -> Result<(Request, usize)> {
    let mut buf = payload;

    ensure_remaining(payload, buf, FIXED_HEADER_BYTES)?;
    let api_key = buf.get_i16();
    let api_version = buf.get_i16();
    let correlation_id = buf.get_i32();

    let layout = HeaderLayout::for_api(api_key, api_version);
    let mut client_id = None;

    if layout != HeaderLayout::Fixed {
        ensure_remaining(payload, buf, 2)?;
        match buf.get_i16() {
            -1 => {}
            len if len >= 0 => {
                let len = len as usize;
                ensure_remaining(payload, buf, len)?;
                client_id = Some(String::from_utf8_lossy(&buf[..len]).into_owned());
                buf.advance(len);
            }
            len => return Err(ProtocolError::InvalidClientIdLength(len)),
        }
    }

    if layout == HeaderLayout::Flexible {
        ensure_remaining(payload, buf, 1)?;
        buf.advance(1);
    }

    let offset = payload.len() - buf.remaining();
    let request = Request {
        message_size: payload.len() as i32,
        api_key,
        api_version,
        correlation_id,
        client_id,
    };

    Ok((request, offset))
}

fn ensure_remaining(payload: &[u8], buf: &[u8], wanted: usize) -> Result<()> {
    if buf.remaining() < wanted {
        let consumed = payload.len() - buf.remaining();
        return Err(ProtocolError::HeaderParse {
            needed: consumed + wanted,
            available: payload.len(),
        });
    }
    Ok(())
}
