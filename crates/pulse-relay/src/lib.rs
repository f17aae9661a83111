//! `pulse-relay`: the stateful core of the telemetry relay.
//!
//! # Overview
//!
//! A single [`Relay`] owns the bounded sample history, the subscriber
//! registry and the dispatch state. The [`ingest`] loop feeds it from the
//! upstream TCP producer; WS connections register sinks; the control endpoint
//! switches the broadcast mode.
//!
//! # Broadcast modes
//!
//! | Mode        | Behaviour                                                  |
//! |-------------|------------------------------------------------------------|
//! | `Immediate` | every sample is broadcast as it arrives                    |
//! | `Timed(ms)` | a timer broadcasts the latest sample once per `ms`         |
//!
//! Background loops (ingest, broadcast timer) are [`TaskHandle`]s: cancel,
//! then await completion.

pub mod buffer;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod registry;
pub mod relay;
pub mod task;
mod timer;

pub use buffer::SampleBuffer;
pub use dispatch::{BroadcastMode, DispatchState, TimerPlan};
pub use error::{IngestError, SendError};
pub use ingest::{IngestExit, IngestReport};
pub use registry::{BroadcastReport, Registry, SubscriberId, SubscriberSink};
pub use relay::{Relay, RelayStatus};
pub use task::TaskHandle;
