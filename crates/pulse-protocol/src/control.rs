use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const ACK_MESSAGE: &str = "Parameter received";

/// Longest accepted broadcast interval: one day.
pub const MAX_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

/// Rejections for `POST /broadcast_interval`.
/// The `Display` text is exactly the `error` string sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Missing 'interval' parameter")]
    MissingInterval,

    /// Present but not an integer in `0..=MAX_INTERVAL_MS`.
    #[error("Invalid 'interval' parameter")]
    InvalidInterval,
}

/// Parsed control body.
/// Wire: `{ "interval": 500 }` (milliseconds, 0 = broadcast every sample)
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalRequest {
    pub interval_ms: u64,
    /// The whole request body, echoed back in the ack.
    pub body: Value,
}

impl IntervalRequest {
    pub fn parse(raw: &[u8]) -> Result<Self, ControlError> {
        let body: Value = serde_json::from_slice(raw).map_err(|_| ControlError::InvalidJson)?;

        let interval_ms = match body.get("interval") {
            None | Some(Value::Null) => return Err(ControlError::MissingInterval),
            Some(v) => v
                .as_u64()
                .filter(|ms| *ms <= MAX_INTERVAL_MS)
                .ok_or(ControlError::InvalidInterval)?,
        };

        Ok(Self { interval_ms, body })
    }
}

/// Success response.
/// Wire: `{ "message": "Parameter received", "interval": { "interval": 500 } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalAck {
    pub message: String,
    pub interval: Value,
}

impl IntervalAck {
    pub fn new(request: IntervalRequest) -> Self {
        Self {
            message: ACK_MESSAGE.to_string(),
            interval: request.body,
        }
    }
}

/// Error response body: `{ "error": "..." }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&ControlError> for ErrorBody {
    fn from(e: &ControlError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}
