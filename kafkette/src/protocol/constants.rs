//! Protocol constants
//!
//! API keys, error codes, and the fixed values the responses carry in place of
//! a real topic registry. Keeping them here means a metadata store can replace
//! the stand-ins without touching the framing or encoding code.
//!
//! See: https://kafka.apache.org/protocol.html

use uuid::Uuid;

// ===== API Keys =====

/// API key for ApiVersions requests
pub const API_KEY_API_VERSIONS: i16 = 18;

/// API key for DescribeTopicPartitions requests
pub const API_KEY_DESCRIBE_TOPIC_PARTITIONS: i16 = 75;

// ===== Supported version ranges =====

/// Lowest ApiVersions version answered with error code 0
pub const API_VERSIONS_MIN_VERSION: i16 = 0;

/// Highest ApiVersions version answered with error code 0
pub const API_VERSIONS_MAX_VERSION: i16 = 4;

/// Lowest DescribeTopicPartitions version handled
pub const DESCRIBE_TOPIC_PARTITIONS_MIN_VERSION: i16 = 0;

/// Highest DescribeTopicPartitions version handled
pub const DESCRIBE_TOPIC_PARTITIONS_MAX_VERSION: i16 = 0;

/// First ApiVersions version whose request header carries tagged fields
pub const API_VERSIONS_FIRST_FLEXIBLE_VERSION: i16 = 3;

// ===== Error codes =====

/// No error
pub const ERROR_NONE: i16 = 0;

/// The topic does not exist on this broker
pub const ERROR_UNKNOWN_TOPIC_OR_PARTITION: i16 = 3;

/// The requested API version is outside the advertised range
pub const ERROR_UNSUPPORTED_VERSION: i16 = 35;

// ===== Response stand-ins =====

/// Throttle time reported in every response
pub const THROTTLE_TIME_MS: i32 = 0;

/// Topic id reported for unknown topics
pub const UNKNOWN_TOPIC_ID: Uuid = Uuid::nil();

/// Authorized-operations bitmask reported for every topic
pub const TOPIC_AUTHORIZED_OPERATIONS: u32 = 0x0000_0df8;

/// Null value for the DescribeTopicPartitions next-cursor field
pub const NULL_CURSOR: u8 = 0xff;

/// Empty tagged-field section
pub const TAG_BUFFER_EMPTY: u8 = 0;
