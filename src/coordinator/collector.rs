//! Result collection and completion accounting
//!
//! The collector owns the two mutable accumulators of the run: the progress
//! counter and the per-group frame buckets. It is driven by exactly one
//! message at a time from the coordinator's consume loop, so no locking is
//! involved anywhere here.
//!
//! A worker may split one task's output into `batch` sibling messages, each
//! advancing progress by `1/batch`. Siblings may arrive in any order and
//! interleaved with other tasks' results; once all siblings of a task have
//! arrived their contributions sum to exactly one completion unit. A lost
//! sibling permanently prevents completion: nothing compensates for it and
//! the consume loop blocks forever.

use crate::frames::CollectedFrames;
use crate::protocol::{ProtocolError, ResultBody, ResultMessage};

/// Exact fractional progress counter
///
/// Kept as a reduced integer fraction `num/den` so that `batch` sibling
/// increments of `1/batch` sum to exactly 1, which IEEE-754 accumulation
/// does not guarantee (three increments of `1/3` fall short of `1.0`).
/// Monotonically non-decreasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    num: u64,
    den: u64,
}

impl Progress {
    /// Start at zero
    pub fn new() -> Self {
        Self { num: 0, den: 1 }
    }

    /// Add one whole completion unit
    pub fn add_unit(&mut self) {
        self.normalize();
        self.num += self.den;
    }

    /// Add `1/batch` of a completion unit
    pub fn add_share(&mut self, batch: u64) {
        debug_assert!(batch >= 1);
        self.normalize();

        let batch = batch.max(1);
        let scale = batch / gcd(self.den, batch);
        // New denominator is lcm(den, batch); 1/batch in those units is den/gcd
        self.num = self.num * scale + (self.den * scale) / batch;
        self.den *= scale;
        self.reduce();
    }

    /// True once the counter reaches or exceeds `total` whole units
    pub fn reached(&self, total: u64) -> bool {
        self.num >= total.saturating_mul(self.den.max(1))
    }

    /// Approximate value for display only
    pub fn units(&self) -> f64 {
        self.num as f64 / self.den.max(1) as f64
    }

    fn normalize(&mut self) {
        if self.den == 0 {
            self.den = 1;
        }
    }

    fn reduce(&mut self) {
        let g = gcd(self.num, self.den);
        if g > 1 {
            self.num /= g;
            self.den /= g;
        }
        if self.num == 0 {
            self.den = 1;
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a.max(1)
}

/// Accumulates result messages until every task is accounted for
#[derive(Debug)]
pub struct ResultCollector {
    total_tasks: u64,
    progress: Progress,
    frames: CollectedFrames,
}

impl ResultCollector {
    /// Create a collector for a closed label set and a fixed task count
    pub fn new(labels: impl IntoIterator<Item = String>, total_tasks: u64) -> Self {
        Self {
            total_tasks,
            progress: Progress::new(),
            frames: CollectedFrames::new(labels),
        }
    }

    /// Process one result message
    ///
    /// Returns `Ok(true)` once the progress counter has reached the total
    /// task count (the caller then stops consuming). Unknown group labels
    /// and batch-header faults are fatal.
    pub fn observe(&mut self, message: ResultMessage) -> Result<bool, ProtocolError> {
        match message.body {
            ResultBody::NoData => {
                // One whole task consumed with no output; frames untouched
                self.frames.ensure_known(&message.sample)?;
                self.progress.add_unit();
            }
            ResultBody::Data { fragment, batch } => {
                self.frames.append(&message.sample, fragment)?;
                self.progress.add_share(batch);
            }
        }

        Ok(self.is_complete())
    }

    /// True once all tasks are accounted for
    pub fn is_complete(&self) -> bool {
        self.progress.reached(self.total_tasks)
    }

    /// Current progress
    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Fixed total task count
    pub fn total_tasks(&self) -> u64 {
        self.total_tasks
    }

    /// Collected frames so far
    pub fn frames(&self) -> &CollectedFrames {
        &self.frames
    }

    /// Hand the collected frames off once collection is done
    pub fn into_frames(self) -> CollectedFrames {
        self.frames
    }
}
