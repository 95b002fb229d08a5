//! Protocol error types
//!
//! Every variant is fatal to the connection that produced it: the connection
//! loop stops, the listener logs the error and the socket is dropped.

use thiserror::Error;

/// Errors raised while reading, parsing, or answering a request
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The length prefix or payload could not be read in full
    #[error("Framing error: {0}")]
    Framing(String),

    /// Payload is shorter than the request header requires
    #[error("Header parse error: needed {needed} bytes, payload has {available}")]
    HeaderParse { needed: usize, available: usize },

    /// Client id length is negative but not the null marker -1
    #[error("Header parse error: invalid client id length {0}")]
    InvalidClientIdLength(i16),

    /// DescribeTopicPartitions body violates the compact-length or size rules
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// A response value does not fit the single-byte compact encoding
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Writing the response failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Short label used in connection-close log lines
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::Framing(_) => "framing",
            ProtocolError::HeaderParse { .. } | ProtocolError::InvalidClientIdLength(_) => {
                "header"
            }
            ProtocolError::MalformedBody(_) => "body",
            ProtocolError::Encoding(_) => "encoding",
            ProtocolError::Io(_) => "io",
        }
    }
}

/// Result alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ProtocolError::HeaderParse {
            needed: 8,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Header parse error: needed 8 bytes, payload has 3"
        );

        let err = ProtocolError::InvalidClientIdLength(-2);
        assert_eq!(
            err.to_string(),
            "Header parse error: invalid client id length -2"
        );
        assert_eq!(err.kind(), "header");

        let err = ProtocolError::MalformedBody("no topics found".to_string());
        assert_eq!(err.to_string(), "Malformed request body: no topics found");
        assert_eq!(err.kind(), "body");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone");
        let err: ProtocolError = io.into();
        assert_eq!(err.kind(), "io");
        assert!(err.to_string().contains("peer gone"));
    }
}
