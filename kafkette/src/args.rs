//! Command-line arguments for the kafkette broker

use clap::Parser;

use crate::protocol::DEFAULT_MAX_FRAME_BYTES;

/// Command-line arguments for the broker
#[derive(Parser, Debug)]
#[command(name = "kafkette")]
#[command(about = "Minimal broker for the ApiVersions and DescribeTopicPartitions Kafka APIs")]
pub struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:9092")]
    pub listen: String,

    /// Largest request payload accepted, in bytes; larger frames close the connection
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: usize,

    /// Quiet mode: only log errors unless RUST_LOG says otherwise
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["kafkette"]).unwrap();
        assert_eq!(args.listen, "0.0.0.0:9092");
        assert_eq!(args.max_frame_bytes, 100 * 1024 * 1024);
        assert!(!args.quiet);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "kafkette",
            "--listen",
            "127.0.0.1:19092",
            "--max-frame-bytes",
            "4096",
            "-q",
        ])
        .unwrap();
        assert_eq!(args.listen, "127.0.0.1:19092");
        assert_eq!(args.max_frame_bytes, 4096);
        assert!(args.quiet);
    }

    #[test]
    fn test_invalid_frame_limit() {
        let result = Args::try_parse_from(["kafkette", "--max-frame-bytes", "lots"]);
        assert!(result.is_err());
    }
}
