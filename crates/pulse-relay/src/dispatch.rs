//! Broadcast mode state machine.
//!
//! `DispatchState` decides, per sample and per timer tick, what gets
//! broadcast. It never touches tasks itself: [`DispatchState::transition`]
//! returns a [`TimerPlan`] and the relay carries it out.
//!
//! | From            | To              | Plan    |
//! |-----------------|-----------------|---------|
//! | any             | same mode       | `Keep`  |
//! | `Timed(_)`      | `Immediate`     | `Stop`  |
//! | any             | `Timed(ms)`     | `Start` (after stopping any live timer) |
//!
//! Every change bumps `generation`. A tick carrying an older generation is
//! ignored, so a timer that is being torn down can never broadcast.

use std::time::Duration;

use pulse_core::PendingPolicy;
use pulse_protocol::Sample;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Every ingested sample is broadcast on arrival.
    Immediate,
    /// Only the latest sample is broadcast, once per period.
    Timed { interval_ms: u64 },
}

impl BroadcastMode {
    /// `0` means immediate.
    pub fn from_interval(interval_ms: u64) -> Self {
        if interval_ms == 0 {
            BroadcastMode::Immediate
        } else {
            BroadcastMode::Timed { interval_ms }
        }
    }

    pub fn interval_ms(&self) -> u64 {
        match self {
            BroadcastMode::Immediate => 0,
            BroadcastMode::Timed { interval_ms } => *interval_ms,
        }
    }
}

/// What the relay must do with the broadcast timer after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPlan {
    Keep,
    Stop,
    Start { generation: u64, period: Duration },
}

#[derive(Debug)]
pub struct DispatchState {
    mode: BroadcastMode,
    pending: Option<Sample>,
    generation: u64,
    policy: PendingPolicy,
}

impl DispatchState {
    pub fn new(policy: PendingPolicy) -> Self {
        Self {
            mode: BroadcastMode::Immediate,
            pending: None,
            generation: 0,
            policy,
        }
    }

    pub fn mode(&self) -> BroadcastMode {
        self.mode
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> Option<&Sample> {
        self.pending.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the sample to broadcast right away, if any.
    pub fn on_sample(&mut self, sample: Sample) -> Option<Sample> {
        match self.mode {
            BroadcastMode::Immediate => {
                self.pending = None;
                Some(sample)
            }
            BroadcastMode::Timed { .. } => {
                self.pending = Some(sample);
                None
            }
        }
    }

    /// Returns the sample a timer of `generation` should broadcast now.
    pub fn on_tick(&mut self, generation: u64) -> Option<Sample> {
        if generation != self.generation || self.mode == BroadcastMode::Immediate {
            return None;
        }
        match self.policy {
            PendingPolicy::Retain => self.pending.clone(),
            PendingPolicy::Clear => self.pending.take(),
        }
    }

    pub fn transition(&mut self, next: BroadcastMode) -> TimerPlan {
        if next == self.mode {
            return TimerPlan::Keep;
        }
        self.mode = next;
        self.generation += 1;
        match next {
            BroadcastMode::Immediate => {
                self.pending = None;
                TimerPlan::Stop
            }
            BroadcastMode::Timed { interval_ms } => TimerPlan::Start {
                generation: self.generation,
                period: Duration::from_millis(interval_ms),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: i64) -> Sample {
        Sample::from(vec![v])
    }

    #[test]
    fn starts_immediate_and_passes_samples_through() {
        let mut state = DispatchState::new(PendingPolicy::Retain);
        assert_eq!(state.mode(), BroadcastMode::Immediate);
        assert_eq!(state.on_sample(s(1)), Some(s(1)));
        assert!(state.pending().is_none());
    }

    #[test]
    fn timed_mode_coalesces_to_latest() {
        let mut state = DispatchState::new(PendingPolicy::Retain);
        let TimerPlan::Start { generation, period } =
            state.transition(BroadcastMode::from_interval(500))
        else {
            panic!("expected a timer start");
        };
        assert_eq!(period, Duration::from_millis(500));

        assert_eq!(state.on_sample(s(1)), None);
        assert_eq!(state.on_sample(s(2)), None);
        assert_eq!(state.on_tick(generation), Some(s(2)));
        // retained: the next quiet tick repeats it
        assert_eq!(state.on_tick(generation), Some(s(2)));
    }

    #[test]
    fn clear_policy_sends_once() {
        let mut state = DispatchState::new(PendingPolicy::Clear);
        let TimerPlan::Start { generation, .. } = state.transition(BroadcastMode::from_interval(10))
        else {
            panic!("expected a timer start");
        };
        state.on_sample(s(7));
        assert_eq!(state.on_tick(generation), Some(s(7)));
        assert_eq!(state.on_tick(generation), None);
    }

    #[test]
    fn tick_before_any_sample_is_empty() {
        let mut state = DispatchState::new(PendingPolicy::Retain);
        let TimerPlan::Start { generation, .. } = state.transition(BroadcastMode::from_interval(10))
        else {
            panic!("expected a timer start");
        };
        assert_eq!(state.on_tick(generation), None);
    }

    #[test]
    fn stale_generation_never_broadcasts() {
        let mut state = DispatchState::new(PendingPolicy::Retain);
        let TimerPlan::Start { generation: old, .. } =
            state.transition(BroadcastMode::from_interval(100))
        else {
            panic!("expected a timer start");
        };
        state.on_sample(s(1));
        let plan = state.transition(BroadcastMode::from_interval(300));
        assert!(matches!(plan, TimerPlan::Start { generation, .. } if generation == old + 1));
        assert_eq!(state.on_tick(old), None);
        assert_eq!(state.on_tick(old + 1), Some(s(1)));
    }

    #[test]
    fn back_to_immediate_stops_and_clears() {
        let mut state = DispatchState::new(PendingPolicy::Retain);
        let TimerPlan::Start { generation, .. } = state.transition(BroadcastMode::from_interval(100))
        else {
            panic!("expected a timer start");
        };
        state.on_sample(s(1));
        assert_eq!(state.transition(BroadcastMode::Immediate), TimerPlan::Stop);
        assert!(state.pending().is_none());
        assert_eq!(state.on_tick(generation), None);
        assert_eq!(state.on_sample(s(2)), Some(s(2)));
    }

    #[test]
    fn same_mode_is_a_no_op() {
        let mut state = DispatchState::new(PendingPolicy::Retain);
        assert_eq!(state.transition(BroadcastMode::Immediate), TimerPlan::Keep);
        state.transition(BroadcastMode::from_interval(250));
        let generation = state.generation();
        assert_eq!(state.transition(BroadcastMode::from_interval(250)), TimerPlan::Keep);
        assert_eq!(state.generation(), generation);
    }

    #[test]
    fn mode_wire_shape() {
        let json = serde_json::to_value(BroadcastMode::from_interval(500)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "timed", "interval_ms": 500}));
        let json = serde_json::to_value(BroadcastMode::Immediate).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "immediate"}));
    }
}
