use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pulse_core::config::RelayConfig;
use pulse_core::PulseError;
use pulse_protocol::{RelayFrame, Sample};
use serde::Serialize;
use tracing::{info, trace, warn};

use crate::buffer::SampleBuffer;
use crate::dispatch::{BroadcastMode, DispatchState, TimerPlan};
use crate::error::SendError;
use crate::registry::{BroadcastReport, Registry, SubscriberId, SubscriberSink};
use crate::task::TaskHandle;
use crate::timer;

/// Everything that must change together.
///
/// Buffer, registry and dispatch state share one lock so that
/// append-then-dispatch and snapshot-then-register are each a single step.
/// Nothing awaits while holding it: subscriber delivery is a non-blocking
/// queue push.
struct Shared {
    buffer: SampleBuffer,
    registry: Registry,
    dispatch: DispatchState,
}

impl Shared {
    fn broadcast(&self, frame: &RelayFrame) -> BroadcastReport {
        match frame.to_text() {
            Ok(text) => self.registry.broadcast(&text),
            Err(e) => {
                warn!(error = %e, kind = frame.kind(), "frame encoding failed, broadcast skipped");
                BroadcastReport::default()
            }
        }
    }
}

/// Point-in-time view for health output.
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatus {
    pub mode: BroadcastMode,
    pub buffered: usize,
    pub capacity: usize,
    pub subscribers: usize,
}

/// The relay context: history buffer, subscriber registry, dispatch
/// controller and the broadcast timer that serves timed mode.
///
/// Constructed once and shared as `Arc<Relay>` with the ingest loop, the
/// HTTP control handler and every WS connection.
pub struct Relay {
    shared: Mutex<Shared>,
    /// Live broadcast timer. Held across the await on a stopping timer, which
    /// serializes concurrent `set_interval` calls.
    timer: tokio::sync::Mutex<Option<TaskHandle>>,
}

impl Relay {
    /// Fails with [`PulseError::Config`] when `buffer_capacity` is zero.
    pub fn new(config: &RelayConfig) -> pulse_core::Result<Self> {
        let capacity = NonZeroUsize::new(config.buffer_capacity)
            .ok_or_else(|| PulseError::Config("relay.buffer_capacity must be at least 1".to_string()))?;
        Ok(Self {
            shared: Mutex::new(Shared {
                buffer: SampleBuffer::new(capacity),
                registry: Registry::new(),
                dispatch: DispatchState::new(config.pending_policy),
            }),
            timer: tokio::sync::Mutex::new(None),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a sample and dispatch it according to the current mode.
    pub fn ingest(&self, sample: Sample) {
        let mut shared = self.lock();
        shared.buffer.append(sample.clone());
        if let Some(now) = shared.dispatch.on_sample(sample) {
            let report = shared.broadcast(&RelayFrame::Append(now));
            trace!(delivered = report.delivered, failed = report.failed, "sample broadcast");
        }
    }

    /// Send the current snapshot to `sink`, then add it to the registry.
    ///
    /// Both happen under the lock, so the subscriber sees every later sample
    /// exactly once and none of the snapshot's samples again. If the sync
    /// frame cannot be delivered the sink is not registered.
    pub fn register(&self, sink: Box<dyn SubscriberSink>) -> Result<SubscriberId, SendError> {
        let mut shared = self.lock();
        let sync = RelayFrame::Sync(shared.buffer.snapshot());
        let text = sync.to_text().map_err(|e| SendError::Encode(e.to_string()))?;
        sink.try_deliver(&text)?;
        let id = shared.registry.insert(sink);
        info!(
            sub_id = %id,
            snapshot = shared.buffer.len(),
            subscribers = shared.registry.len(),
            "subscriber registered"
        );
        Ok(id)
    }

    /// Idempotent.
    pub fn unregister(&self, id: SubscriberId) {
        let mut shared = self.lock();
        if shared.registry.remove(id) {
            info!(sub_id = %id, subscribers = shared.registry.len(), "subscriber unregistered");
        }
    }

    /// Switch broadcast mode. `0` means immediate.
    ///
    /// Returns only after any timer that must go away has fully stopped, so
    /// no tick from it can interleave with what follows.
    pub async fn set_interval(self: &Arc<Self>, interval_ms: u64) {
        let mut timer = self.timer.lock().await;
        let plan = self
            .lock()
            .dispatch
            .transition(BroadcastMode::from_interval(interval_ms));

        match plan {
            TimerPlan::Keep => {
                info!(interval_ms, "broadcast interval unchanged");
            }
            TimerPlan::Stop => {
                if let Some(handle) = timer.take() {
                    handle.stop().await;
                }
                info!("broadcast mode: immediate");
            }
            TimerPlan::Start { generation, period } => {
                if let Some(handle) = timer.take() {
                    handle.stop().await;
                }
                *timer = Some(timer::spawn(Arc::downgrade(self), generation, period));
                info!(interval_ms, "broadcast mode: timed");
            }
        }
    }

    /// One timer tick; no-op unless `generation` is still current.
    pub(crate) fn tick(&self, generation: u64) {
        let mut shared = self.lock();
        if let Some(sample) = shared.dispatch.on_tick(generation) {
            let report = shared.broadcast(&RelayFrame::Append(sample));
            trace!(generation, delivered = report.delivered, failed = report.failed, "tick broadcast");
        }
    }

    pub fn mode(&self) -> BroadcastMode {
        self.lock().dispatch.mode()
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.lock().buffer.snapshot()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().registry.len()
    }

    pub fn status(&self) -> RelayStatus {
        let shared = self.lock();
        RelayStatus {
            mode: shared.dispatch.mode(),
            buffered: shared.buffer.len(),
            capacity: shared.buffer.capacity(),
            subscribers: shared.registry.len(),
        }
    }

    /// Whether a broadcast timer task is currently alive.
    pub async fn timer_active(&self) -> bool {
        self.timer
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the broadcast timer, if any, and wait for it.
    pub async fn shutdown(&self) {
        let handle = self.timer.lock().await.take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
        info!("relay shut down");
    }
}
