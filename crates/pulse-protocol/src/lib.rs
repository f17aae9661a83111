//! Wire types shared by the relay and the gateway: the upstream sample
//! format, the frames pushed to WS subscribers and the control-endpoint
//! request/response bodies.

pub mod control;
pub mod frames;
pub mod sample;

pub use control::{ControlError, ErrorBody, IntervalAck, IntervalRequest, MAX_INTERVAL_MS};
pub use frames::RelayFrame;
pub use sample::Sample;
