use serde::{Deserialize, Serialize};
use serde_json::Number;

/// One telemetry reading: an ordered array of JSON numbers.
///
/// Contents are never interpreted by the relay. Numbers keep their JSON form,
/// so `[1, 2.5]` goes back out as `[1,2.5]`.
/// Wire: `[0.12, -3, 7.5e-3]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample(Vec<Number>);

impl Sample {
    pub fn new(values: Vec<Number>) -> Self {
        Self(values)
    }

    /// Decode one upstream line. Surrounding whitespace is ignored.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }

    pub fn values(&self) -> &[Number] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<i64>> for Sample {
    fn from(values: Vec<i64>) -> Self {
        Self(values.into_iter().map(Number::from).collect())
    }
}
