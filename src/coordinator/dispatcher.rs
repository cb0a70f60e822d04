//! Task dispatch
//!
//! Publishes exactly one task message per (sample group, file index) pair.
//! Publication is fire-and-forget: no delivery confirmation and no retry.
//! Messages may go out in any order across groups; the collector does not
//! rely on arrival order anywhere.

use crate::broker::Broker;
use crate::catalog::SampleCatalog;
use crate::protocol::{self, TaskMessage};
use crate::Result;

/// Publishes the fixed task set derived from the catalog
pub struct TaskDispatcher<'a> {
    catalog: &'a SampleCatalog,
}

impl<'a> TaskDispatcher<'a> {
    /// Create a dispatcher over a resolved catalog
    pub fn new(catalog: &'a SampleCatalog) -> Self {
        Self { catalog }
    }

    /// Total task count: sum of file-list lengths across all groups
    pub fn total_tasks(&self) -> u64 {
        self.catalog.task_count()
    }

    /// Materialize the task set, one entry per (group, file index) pair
    ///
    /// The set is fixed before dispatch begins and never changes.
    pub fn plan(&self) -> Vec<TaskMessage> {
        self.catalog
            .groups()
            .iter()
            .flat_map(|group| {
                (0..group.files.len()).map(|file_index| TaskMessage {
                    sample: group.label.clone(),
                    file_index,
                })
            })
            .collect()
    }

    /// Publish every task message to the task queue
    ///
    /// Declares both durable queues first (repeated declaration is a no-op).
    /// Returns the number of messages published, which always equals
    /// [`total_tasks`](Self::total_tasks).
    pub async fn dispatch(&self, broker: &Broker) -> Result<u64> {
        broker.declare_queues().await?;

        let mut published = 0u64;

        for group in self.catalog.groups() {
            println!("Processing {} samples", group.label);
            for file_index in 0..group.files.len() {
                let task = TaskMessage {
                    sample: group.label.clone(),
                    file_index,
                };
                let (payload, properties) = protocol::encode_task(&task);
                broker.publish_task(&payload, properties).await?;
                published += 1;
            }
        }

        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, SampleSpec};

    fn catalog(counts: &[(&str, usize)]) -> SampleCatalog {
        let samples: Vec<SampleSpec> = counts
            .iter()
            .map(|(label, n)| SampleSpec {
                label: label.to_string(),
                files: (0..*n).map(|i| format!("{label}_{i}.root")).collect(),
                dids: Vec::new(),
                color: None,
            })
            .collect();
        SampleCatalog::resolve(&samples, &CatalogConfig::default()).unwrap()
    }

    #[test]
    fn test_total_tasks_spec_example() {
        // File counts [2, 1, 3] give a total of 6
        let catalog = catalog(&[("Data", 2), ("Background", 1), ("Signal", 3)]);
        let dispatcher = TaskDispatcher::new(&catalog);

        assert_eq!(dispatcher.total_tasks(), 6);
        assert_eq!(dispatcher.plan().len(), 6);
    }

    #[test]
    fn test_plan_covers_every_pair_once() {
        let catalog = catalog(&[("Data", 2), ("Signal", 3)]);
        let plan = TaskDispatcher::new(&catalog).plan();

        let expected = [
            ("Data", 0),
            ("Data", 1),
            ("Signal", 0),
            ("Signal", 1),
            ("Signal", 2),
        ];
        assert_eq!(plan.len(), expected.len());
        for (task, (sample, file_index)) in plan.iter().zip(expected) {
            assert_eq!(task.sample, sample);
            assert_eq!(task.file_index, file_index);
        }
    }

    #[test]
    fn test_plan_skips_empty_groups() {
        let catalog = catalog(&[("Data", 0), ("Signal", 1)]);
        let plan = TaskDispatcher::new(&catalog).plan();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].sample, "Signal");
    }
}
