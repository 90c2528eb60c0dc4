//! Received timestamp ranges for duplicate-delivery suppression.
//!
//! Two ranges collide when they are identical or share interior points.
//! Ranges that only touch at an endpoint do not collide, since consecutive
//! batches may legitimately repeat a boundary timestamp. Colliding ranges are
//! rejected rather than merged, so stored ranges ordered by `(start, end)`
//! also have non-decreasing ends.

/// Set of non-colliding `[start, end]` timestamp ranges
#[derive(Debug, Clone, Default)]
pub struct ReceivedRanges {
    ranges: Vec<(f64, f64)>,
}

impl ReceivedRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `[start, end]` repeats or cuts into a stored range
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        let upper = self.ranges.partition_point(|&(s, _)| s <= end);
        self.ranges[..upper]
            .iter()
            .rev()
            .take_while(|&&(_, e)| e >= start)
            .any(|&(s, e)| (s == start && e == end) || (start < e && s < end))
    }

    /// Record `[start, end]` unless it collides with a stored range
    ///
    /// Returns `false` (and stores nothing) on collision.
    pub fn insert(&mut self, start: f64, end: f64) -> bool {
        debug_assert!(start <= end);
        if self.overlaps(start, end) {
            return false;
        }
        let at = self
            .ranges
            .partition_point(|&(s, e)| s < start || (s == start && e < end));
        self.ranges.insert(at, (start, end));
        true
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Stored ranges, ascending
    pub fn iter(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.ranges.iter()
    }
}
