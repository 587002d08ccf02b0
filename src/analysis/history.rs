// TemporalHistory - bounded per-band energy history
//
// Each tracked band owns exactly one history, created when the tracker is
// built and reset only by rebuilding the tracker. Samples are normalized
// energies in [0, 1], insertion-ordered, oldest evicted on overflow.

use std::collections::VecDeque;

/// Number of energy samples retained per band
pub const HISTORY_CAPACITY: usize = 20;

/// Fixed-capacity FIFO of recent normalized energy samples for one band
#[derive(Debug, Clone)]
pub struct TemporalHistory {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl TemporalHistory {
    /// Create an empty history with the standard capacity
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create an empty history with an explicit capacity (min 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an energy sample, evicting the oldest past capacity
    pub fn push(&mut self, energy: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(energy);
    }

    /// Last `k` samples in chronological order (oldest first)
    ///
    /// Returns fewer than `k` values while the history is still warming up.
    pub fn recent(&self, k: usize) -> Vec<f32> {
        let start = self.samples.len().saturating_sub(k);
        self.samples.range(start..).copied().collect()
    }

    /// Most recent sample, if any
    pub fn latest(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples have been recorded yet
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for TemporalHistory {
    fn default() -> Self {
        Self::new()
    }
}
