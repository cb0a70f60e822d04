//! Sample catalog
//!
//! Resolves the configured sample-group definitions into a closed set of
//! groups with ordered file lists. The catalog is built once at startup and
//! is immutable afterward: it fixes the task set before dispatch begins and
//! the set of group labels the collector will accept.

use crate::config::{CatalogConfig, SampleSpec};
use anyhow::Result;
use std::collections::HashSet;

/// One resolved sample group
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGroup {
    /// Unique, stable group label (the `sample_type` wire header)
    pub label: String,
    /// Ordered list of retrievable files; one task per entry
    pub files: Vec<String>,
    /// Display color, carried opaquely for the presentation layer
    pub color: Option<String>,
}

impl SampleGroup {
    /// Number of tasks this group contributes
    pub fn task_count(&self) -> u64 {
        self.files.len() as u64
    }
}

/// Closed, ordered set of sample groups
///
/// Group order follows the configuration; the label set never changes after
/// resolution.
#[derive(Debug, Clone)]
pub struct SampleCatalog {
    groups: Vec<SampleGroup>,
}

impl SampleCatalog {
    /// Resolve sample definitions into a catalog
    ///
    /// Explicit `files` lists are taken verbatim. `dids` entries are expanded
    /// through the configured URL template, preserving order. Assumes the
    /// definitions already passed configuration validation.
    pub fn resolve(samples: &[SampleSpec], catalog: &CatalogConfig) -> Result<Self> {
        let mut groups = Vec::with_capacity(samples.len());

        for sample in samples {
            let files = if sample.dids.is_empty() {
                sample.files.clone()
            } else {
                let template = catalog.url_template.as_deref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "sample '{}' lists dids but catalog.url_template is not set",
                        sample.label
                    )
                })?;
                sample
                    .dids
                    .iter()
                    .map(|did| template.replace("{did}", did))
                    .collect()
            };

            groups.push(SampleGroup {
                label: sample.label.clone(),
                files,
                color: sample.color.clone(),
            });
        }

        Ok(Self { groups })
    }

    /// Resolved groups, in configuration order
    pub fn groups(&self) -> &[SampleGroup] {
        &self.groups
    }

    /// Group labels, in configuration order
    pub fn labels(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.label.clone()).collect()
    }

    /// Closed label set used to reject out-of-set result messages
    pub fn label_set(&self) -> HashSet<String> {
        self.groups.iter().map(|g| g.label.clone()).collect()
    }

    /// Look up a group by label
    pub fn group(&self, label: &str) -> Option<&SampleGroup> {
        self.groups.iter().find(|g| g.label == label)
    }

    /// Total task count: sum of file-list lengths across all groups
    ///
    /// Computed from the resolved catalog; never recomputed after dispatch.
    pub fn task_count(&self) -> u64 {
        self.groups.iter().map(|g| g.task_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(label: &str, files: &[&str], dids: &[&str]) -> SampleSpec {
        SampleSpec {
            label: label.to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
            dids: dids.iter().map(|d| d.to_string()).collect(),
            color: None,
        }
    }

    #[test]
    fn test_resolve_explicit_files() {
        let samples = vec![spec("Data", &["a.root", "b.root"], &[])];
        let catalog = SampleCatalog::resolve(&samples, &CatalogConfig::default()).unwrap();

        assert_eq!(catalog.groups().len(), 1);
        assert_eq!(catalog.group("Data").unwrap().files, vec!["a.root", "b.root"]);
    }

    #[test]
    fn test_resolve_dids_through_template() {
        let samples = vec![spec("Background $ZZ^{*}$", &[], &["700600", "700601"])];
        let config = CatalogConfig {
            url_template: Some("https://opendata.cern.ch/4lep/{did}.root".to_string()),
        };

        let catalog = SampleCatalog::resolve(&samples, &config).unwrap();
        let group = catalog.group("Background $ZZ^{*}$").unwrap();
        assert_eq!(
            group.files,
            vec![
                "https://opendata.cern.ch/4lep/700600.root",
                "https://opendata.cern.ch/4lep/700601.root",
            ]
        );
    }

    #[test]
    fn test_resolve_dids_without_template_fails() {
        let samples = vec![spec("Signal", &[], &["345060"])];
        let result = SampleCatalog::resolve(&samples, &CatalogConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_task_count_sums_file_lists() {
        // File counts [2, 1, 3] give a total of 6
        let samples = vec![
            spec("Data", &["a", "b"], &[]),
            spec("Background", &["c"], &[]),
            spec("Signal", &["d", "e", "f"], &[]),
        ];
        let catalog = SampleCatalog::resolve(&samples, &CatalogConfig::default()).unwrap();

        assert_eq!(catalog.task_count(), 6);
    }

    #[test]
    fn test_task_count_empty_group() {
        let samples = vec![spec("Data", &["a"], &[]), spec("Empty", &[], &[])];
        let catalog = SampleCatalog::resolve(&samples, &CatalogConfig::default()).unwrap();

        assert_eq!(catalog.task_count(), 1);
        assert_eq!(catalog.group("Empty").unwrap().task_count(), 0);
    }

    #[test]
    fn test_label_set_is_closed() {
        let samples = vec![spec("Data", &["a"], &[]), spec("Signal", &["b"], &[])];
        let catalog = SampleCatalog::resolve(&samples, &CatalogConfig::default()).unwrap();

        let labels = catalog.label_set();
        assert!(labels.contains("Data"));
        assert!(labels.contains("Signal"));
        assert!(!labels.contains("Background"));
    }

    #[test]
    fn test_group_order_follows_configuration() {
        let samples = vec![
            spec("Signal", &["s"], &[]),
            spec("Data", &["d"], &[]),
        ];
        let catalog = SampleCatalog::resolve(&samples, &CatalogConfig::default()).unwrap();
        assert_eq!(catalog.labels(), vec!["Signal", "Data"]);
    }
}
