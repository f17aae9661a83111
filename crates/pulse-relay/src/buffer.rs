use std::collections::VecDeque;
use std::num::NonZeroUsize;

use pulse_protocol::Sample;

/// Fixed-capacity history of the most recent samples, oldest first.
///
/// Not synchronized on its own; the relay keeps it behind the same lock as the
/// registry so a snapshot never sees half of an append.
#[derive(Debug)]
pub struct SampleBuffer {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl SampleBuffer {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: capacity.get(),
            samples: VecDeque::with_capacity(capacity.get()),
        }
    }

    /// Push a sample, evicting the oldest one when full.
    pub fn append(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Owned copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
