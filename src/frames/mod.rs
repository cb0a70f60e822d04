//! Dataset fragments and per-group accumulation
//!
//! Workers answer each task with zero or more fragments of a sample group's
//! dataset. A fragment is a columnar record carrying the two columns the
//! presentation layer contracts on: the derived quantity (`mass`) and the
//! event weighting (`totalWeight`). Fragments of one group are concatenated
//! in arrival order, which need not match file-list order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A result message named a sample group outside the closed catalog set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sample group: '{0}'")]
pub struct UnknownSample(pub String);

/// One columnar dataset fragment
///
/// Column lengths must match; `protocol::decode_result` rejects fragments
/// where they do not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    /// Four-lepton invariant mass per event
    pub mass: Vec<f64>,
    /// Total event weight per event
    #[serde(rename = "totalWeight")]
    pub total_weight: Vec<f64>,
}

impl EventBatch {
    /// Number of events in the fragment
    pub fn len(&self) -> usize {
        self.mass.len()
    }

    /// True if the fragment holds no events
    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    /// True if all columns have equal length
    pub fn is_consistent(&self) -> bool {
        self.mass.len() == self.total_weight.len()
    }

    /// Sum of event weights
    pub fn sum_weights(&self) -> f64 {
        self.total_weight.iter().sum()
    }

    /// Append another fragment's events to this one
    pub fn extend(&mut self, other: &EventBatch) {
        self.mass.extend_from_slice(&other.mass);
        self.total_weight.extend_from_slice(&other.total_weight);
    }

    /// Concatenate fragments into a single batch, preserving order
    pub fn concat<'a>(batches: impl IntoIterator<Item = &'a EventBatch>) -> EventBatch {
        let mut combined = EventBatch::default();
        for batch in batches {
            combined.extend(batch);
        }
        combined
    }
}

/// Per-group fragment accumulator
///
/// The key set is closed at construction from the catalog labels and never
/// grows: appending under an unknown label is rejected instead of creating a
/// new bucket. Owned exclusively by the result collector; append-only while
/// collecting, read-only once handed off.
#[derive(Debug, Clone)]
pub struct CollectedFrames {
    frames: BTreeMap<String, Vec<EventBatch>>,
}

impl CollectedFrames {
    /// Create an accumulator with one empty bucket per known label
    pub fn new(labels: impl IntoIterator<Item = String>) -> Self {
        let frames = labels.into_iter().map(|label| (label, Vec::new())).collect();
        Self { frames }
    }

    /// Check a label against the closed set
    pub fn ensure_known(&self, label: &str) -> Result<(), UnknownSample> {
        if self.frames.contains_key(label) {
            Ok(())
        } else {
            Err(UnknownSample(label.to_string()))
        }
    }

    /// Append a fragment to a group's bucket, in arrival order
    pub fn append(&mut self, label: &str, fragment: EventBatch) -> Result<(), UnknownSample> {
        match self.frames.get_mut(label) {
            Some(bucket) => {
                bucket.push(fragment);
                Ok(())
            }
            None => Err(UnknownSample(label.to_string())),
        }
    }

    /// Fragments collected for one group, in arrival order
    pub fn fragments(&self, label: &str) -> Option<&[EventBatch]> {
        self.frames.get(label).map(|bucket| bucket.as_slice())
    }

    /// Number of fragments collected for one group
    pub fn fragment_count(&self, label: &str) -> usize {
        self.frames.get(label).map_or(0, |bucket| bucket.len())
    }

    /// Total fragments collected across all groups
    pub fn total_fragments(&self) -> usize {
        self.frames.values().map(|bucket| bucket.len()).sum()
    }

    /// Concatenate each group's fragments into one dataset
    pub fn into_datasets(self) -> BTreeMap<String, EventBatch> {
        self.frames
            .into_iter()
            .map(|(label, bucket)| {
                let combined = EventBatch::concat(bucket.iter());
                (label, combined)
            })
            .collect()
    }
}
