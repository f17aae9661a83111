use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Reasons the ingest loop stops. Every variant is fatal to the loop: the
/// upstream connection is dropped and nothing reconnects.
#[derive(Debug, Error)]
pub enum IngestError {
    /// TCP connect to the producer failed.
    #[error("Upstream connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The established stream broke (I/O error or invalid UTF-8).
    #[error("Upstream read failed: {0}")]
    Read(#[from] LinesCodecError),

    /// A line was not a JSON array of numbers.
    #[error("Malformed sample on line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
}

/// Delivery failure for a single subscriber. Never fatal to anything else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("subscriber queue is full")]
    Full,

    #[error("subscriber connection is closed")]
    Closed,

    #[error("frame encoding failed: {0}")]
    Encode(String),
}
