//! Fixed-capacity sliding window over the sample stream.
//!
//! Backed by a heap ring buffer: pushing into a full window evicts the oldest
//! sample, so `len() <= capacity()` holds after every call.

use std::fmt;

use contracts::Sample;
use ringbuf::{traits::*, HeapRb};

/// Sliding window of the most recent samples
pub struct MagnitudeBuffer {
    ring: HeapRb<Sample>,
    capacity: usize,
    evicted_count: u64,
    last_timestamp: Option<f64>,
}

impl fmt::Debug for MagnitudeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MagnitudeBuffer")
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.capacity)
            .field("evicted", &self.evicted_count)
            .finish()
    }
}

impl MagnitudeBuffer {
    /// Create an empty window holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: HeapRb::new(capacity),
            capacity,
            evicted_count: 0,
            last_timestamp: None,
        }
    }

    /// Append samples in order, evicting the oldest beyond capacity
    #[inline]
    pub fn extend<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = Sample>,
    {
        for sample in samples {
            self.push(sample);
        }
    }

    #[inline]
    fn push(&mut self, sample: Sample) {
        if self.ring.is_full() {
            let _ = self.ring.try_pop();
            self.evicted_count += 1;
        }
        self.last_timestamp = Some(sample.timestamp);
        let _ = self.ring.try_push(sample);
    }

    /// Window contents, oldest first
    pub fn snapshot(&self) -> Vec<Sample> {
        self.ring.iter().copied().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Timestamp of the newest sample ever pushed
    #[inline]
    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    /// Samples pushed out of the window so far
    #[inline]
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }
}
