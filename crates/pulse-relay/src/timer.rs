use std::sync::Weak;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::relay::Relay;
use crate::task::TaskHandle;

/// Spawn the periodic broadcaster for timed mode.
///
/// First tick fires one `period` after spawning. The timer holds a weak
/// reference so it never keeps a dropped relay alive.
pub(crate) fn spawn(relay: Weak<Relay>, generation: u64, period: Duration) -> TaskHandle {
    // anchored here, not when the task is first polled
    let start = Instant::now() + period;

    TaskHandle::spawn("broadcast-timer", move |cancel| async move {
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(generation, period_ms = period.as_millis() as u64, "broadcast timer started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(relay) = relay.upgrade() else { break };
                    relay.tick(generation);
                }
            }
        }

        debug!(generation, "broadcast timer exited");
    })
}
