//! Per-command burst-history store.
//!
//! Ring size is fixed at 50 samples per command. A flat array is used
//! instead of a `VecDeque` because the capacity never changes and the online
//! engines may accumulate history for many distinct commands.

use std::collections::HashMap;

const RING_SIZE: usize = 50;

#[derive(Debug, Clone)]
struct RingBuffer {
    samples: [f64; RING_SIZE],
    next_index: usize,
    count: usize,
}

impl RingBuffer {
    fn new() -> Self {
        RingBuffer {
            samples: [0.0; RING_SIZE],
            next_index: 0,
            count: 0,
        }
    }

    fn record(&mut self, ms: f64) {
        self.samples[self.next_index] = ms;
        self.next_index = (self.next_index + 1) % RING_SIZE;
        self.count = (self.count + 1).min(RING_SIZE);
    }

    /// Mean of the most-recent `min(k, count)` samples, walking backward
    /// from `next_index - 1`. `k <= 0` means "use all available samples".
    fn mean_last_k(&self, k: i64) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let take = if k <= 0 {
            self.count
        } else {
            (k as usize).min(self.count)
        };
        let mut sum = 0.0;
        let mut idx = (self.next_index + RING_SIZE - 1) % RING_SIZE;
        for _ in 0..take {
            sum += self.samples[idx];
            idx = (idx + RING_SIZE - 1) % RING_SIZE;
        }
        Some(sum / take as f64)
    }
}

/// Mapping from command string to its burst-duration ring buffer.
#[derive(Debug, Clone, Default)]
pub struct BurstHistory {
    entries: HashMap<String, RingBuffer>,
}

impl BurstHistory {
    pub fn new() -> Self {
        BurstHistory {
            entries: HashMap::new(),
        }
    }

    /// Record an observed burst duration (ms) for `command`.
    pub fn record(&mut self, command: &str, ms: f64) {
        self.entries
            .entry(command.to_string())
            .or_insert_with(RingBuffer::new)
            .record(ms);
    }

    /// Mean of the last `k` samples for `command`, or `None` with no history.
    pub fn mean_last_k(&self, command: &str, k: i64) -> Option<f64> {
        self.entries.get(command).and_then(|r| r.mean_last_k(k))
    }

    /// Number of samples currently stored for `command`.
    pub fn sample_count(&self, command: &str) -> usize {
        self.entries.get(command).map(|r| r.count).unwrap_or(0)
    }
}
