pub mod config;
pub mod error;

pub use config::{PendingPolicy, PulseConfig};
pub use error::{PulseError, Result};
