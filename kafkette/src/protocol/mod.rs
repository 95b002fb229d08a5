//! Kafka wire protocol subset
//!
//! Framing, header parsing, and the request/response codecs for the two APIs
//! this broker answers: ApiVersions (18) and DescribeTopicPartitions (75).
//! Everything here is a pure transform over byte buffers except the frame
//! reader and writer, which drive async I/O.

pub mod api_versions;
pub mod compact;
pub mod constants;
pub mod describe_topic_partitions;
pub mod frame;
pub mod header;

pub use api_versions::{api_versions_error_code, encode_api_versions_response};
pub use compact::{decode_compact_len, encode_compact_len};
pub use describe_topic_partitions::{
    encode_describe_topic_partitions_response, DescribeTopicPartitionsRequestBody,
    TopicDescription,
};
pub use frame::{read_frame, write_frame, DEFAULT_MAX_FRAME_BYTES};
pub use header::{parse_header, HeaderLayout, Request};
