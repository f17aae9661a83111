use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

use crate::error::SendError;

/// Anything that can take a serialized frame without blocking.
///
/// Delivery is fire-and-forget: an error is reported back to the registry,
/// which logs it and moves on to the next subscriber.
pub trait SubscriberSink: Send + Sync {
    fn try_deliver(&self, payload: &str) -> Result<(), SendError>;
}

/// The per-connection WS queue. The connection task drains the receiver.
impl SubscriberSink for mpsc::Sender<String> {
    fn try_deliver(&self, payload: &str) -> Result<(), SendError> {
        self.try_send(payload.to_string()).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

/// Registry handle, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of one broadcast round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Currently connected sinks, iterated in registration order.
///
/// Sinks are only removed through [`Registry::remove`], i.e. when their
/// connection ends. A failed send leaves the sink in place.
#[derive(Default)]
pub struct Registry {
    sinks: BTreeMap<SubscriberId, Box<dyn SubscriberSink>>,
    next_id: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sink: Box<dyn SubscriberSink>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.sinks.insert(id, sink);
        id
    }

    /// Idempotent; returns whether the id was still present.
    pub fn remove(&mut self, id: SubscriberId) -> bool {
        self.sinks.remove(&id).is_some()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.sinks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Offer `payload` to every sink. One failure never stops the round.
    pub fn broadcast(&self, payload: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for (id, sink) in &self.sinks {
            match sink.try_deliver(payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(sub_id = %id, error = %e, "send to subscriber failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DeadSink;

    impl SubscriberSink for DeadSink {
        fn try_deliver(&self, _payload: &str) -> Result<(), SendError> {
            Err(SendError::Closed)
        }
    }

    #[test]
    fn failure_does_not_stop_the_round() {
        let mut registry = Registry::new();
        let (tx_a, mut rx_a) = mpsc::channel::<String>(8);
        let (tx_b, mut rx_b) = mpsc::channel::<String>(8);
        registry.insert(Box::new(tx_a));
        let dead = registry.insert(Box::new(DeadSink));
        registry.insert(Box::new(tx_b));

        let report = registry.broadcast("hello");
        assert_eq!(report, BroadcastReport { delivered: 2, failed: 1 });
        assert_eq!(rx_a.try_recv().unwrap(), "hello");
        assert_eq!(rx_b.try_recv().unwrap(), "hello");

        // failed sinks stay until their owner removes them
        assert!(registry.contains(dead));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn dropped_receiver_reports_closed() {
        let (tx, rx) = mpsc::channel::<String>(1);
        drop(rx);
        assert_eq!(tx.try_deliver("x"), Err(SendError::Closed));
    }

    #[test]
    fn full_queue_reports_full() {
        let (tx, _rx) = mpsc::channel::<String>(1);
        assert!(tx.try_deliver("x").is_ok());
        assert_eq!(tx.try_deliver("y"), Err(SendError::Full));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut registry = Registry::new();
        let id = registry.insert(Box::new(DeadSink));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn ids_are_never_reused() {
        let mut registry = Registry::new();
        let a = registry.insert(Box::new(DeadSink));
        registry.remove(a);
        let b = registry.insert(Box::new(DeadSink));
        assert_ne!(a, b);
    }
}
