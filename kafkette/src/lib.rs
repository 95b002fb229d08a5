//! kafkette - a minimal Kafka-protocol broker
//!
//! Answers ApiVersions and DescribeTopicPartitions requests over TCP. There is
//! no topic registry: every described topic comes back as unknown.

pub mod args;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;

// Re-export commonly used types
pub use connection::{dispatch, Connection, Dispatch};
pub use error::ProtocolError;
pub use server::Server;
