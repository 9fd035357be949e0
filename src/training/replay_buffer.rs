use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

use crate::ai::Transition;

/// Fixed-capacity ring buffer for storing training transitions.
pub struct ReplayBuffer {
    buffer: Vec<Transition>,
    capacity: usize,
    position: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_os_rng())
    }

    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        ReplayBuffer {
            // Large capacities are common; grow on demand instead of reserving up front.
            buffer: Vec::new(),
            capacity,
            position: 0,
            rng,
        }
    }

    /// Add a transition to the buffer. Overwrites the oldest when full.
    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(transition);
        } else {
            self.buffer[self.position] = transition;
        }
        self.position = (self.position + 1) % self.capacity;
    }

    /// Sample a uniform batch without repeats, or `None` when fewer than
    /// `batch_size` transitions are stored.
    pub fn sample(&mut self, batch_size: usize) -> Option<Vec<Transition>> {
        if batch_size > self.buffer.len() {
            return None;
        }
        let indices = index::sample(&mut self.rng, self.buffer.len(), batch_size);
        Some(indices.iter().map(|i| self.buffer[i].clone()).collect())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored transitions in insertion order, before the buffer wraps.
    #[cfg(test)]
    pub(crate) fn transitions(&self) -> &[Transition] {
        &self.buffer
    }
}
