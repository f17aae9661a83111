use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// Server → subscriber frame on `/ws`.
///
/// Wire:
///   `{ "type": "sync", "data": [[...], [...]] }` once, right after connect
///   `{ "type": "append", "data": [...] }` for every dispatched sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum RelayFrame {
    /// Buffer snapshot, oldest first.
    Sync(Vec<Sample>),
    Append(Sample),
}

impl RelayFrame {
    /// Serialize to the JSON text sent in a WS text frame.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RelayFrame::Sync(_) => "sync",
            RelayFrame::Append(_) => "append",
        }
    }
}
