//! Configuration validation
//!
//! Validates the merged configuration before the catalog is resolved and
//! before anything touches the broker.

use crate::config::Config;
use anyhow::Result;
use std::collections::HashSet;

/// Validate the complete configuration
///
/// Checks broker settings, worker deployment, and sample definitions.
/// Returns the first problem found as an error.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_broker(config)?;
    validate_workers(config)?;
    validate_samples(config)?;

    Ok(())
}

fn validate_broker(config: &Config) -> Result<()> {
    if config.broker.url.is_empty() {
        anyhow::bail!("broker.url must not be empty");
    }
    if config.broker.task_queue.is_empty() {
        anyhow::bail!("broker.task_queue must not be empty");
    }
    if config.broker.result_queue.is_empty() {
        anyhow::bail!("broker.result_queue must not be empty");
    }
    if config.broker.task_queue == config.broker.result_queue {
        anyhow::bail!(
            "broker.task_queue and broker.result_queue must name different queues (both are '{}')",
            config.broker.task_queue
        );
    }

    Ok(())
}

fn validate_workers(config: &Config) -> Result<()> {
    if config.workers.count == 0 {
        anyhow::bail!("workers.count must be at least 1 (it sizes the termination broadcast)");
    }

    Ok(())
}

fn validate_samples(config: &Config) -> Result<()> {
    if config.samples.is_empty() {
        anyhow::bail!("at least one [[samples]] entry is required");
    }

    let mut seen = HashSet::new();
    let mut any_files = false;

    for sample in &config.samples {
        if sample.label.is_empty() {
            anyhow::bail!("sample labels must not be empty");
        }
        if !seen.insert(sample.label.as_str()) {
            anyhow::bail!("duplicate sample label: '{}'", sample.label);
        }
        if !sample.files.is_empty() && !sample.dids.is_empty() {
            anyhow::bail!(
                "sample '{}' defines both files and dids; pick one",
                sample.label
            );
        }
        if !sample.dids.is_empty() {
            match config.catalog.url_template {
                Some(ref template) if template.contains("{did}") => {}
                Some(_) => {
                    anyhow::bail!("catalog.url_template must contain a {{did}} placeholder")
                }
                None => anyhow::bail!(
                    "sample '{}' lists dids but catalog.url_template is not set",
                    sample.label
                ),
            }
        }
        if !sample.files.is_empty() || !sample.dids.is_empty() {
            any_files = true;
        }
    }

    if !any_files {
        anyhow::bail!("no sample defines any files or dids; nothing to dispatch");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, SampleSpec};

    fn sample(label: &str, files: &[&str]) -> SampleSpec {
        SampleSpec {
            label: label.to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
            dids: Vec::new(),
            color: None,
        }
    }

    fn base_config() -> Config {
        Config {
            broker: Default::default(),
            workers: Default::default(),
            catalog: Default::default(),
            samples: vec![sample("Data", &["a.root"])],
            output: Default::default(),
            runtime: Default::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_rejects_equal_queue_names() {
        let mut config = base_config();
        config.broker.result_queue = config.broker.task_queue.clone();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let mut config = base_config();
        config.workers.count = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_samples() {
        let mut config = base_config();
        config.samples.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_duplicate_labels() {
        let mut config = base_config();
        config.samples.push(sample("Data", &["b.root"]));
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_dids_without_template() {
        let mut config = base_config();
        config.samples[0].files.clear();
        config.samples[0].dids = vec!["700600".to_string()];
        assert!(validate_config(&config).is_err());

        config.catalog = CatalogConfig {
            url_template: Some("https://opendata.cern.ch/{did}.root".to_string()),
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_template_without_placeholder() {
        let mut config = base_config();
        config.samples[0].files.clear();
        config.samples[0].dids = vec!["700600".to_string()];
        config.catalog = CatalogConfig {
            url_template: Some("https://opendata.cern.ch/static.root".to_string()),
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_all_empty_samples() {
        let mut config = base_config();
        config.samples[0].files.clear();
        assert!(validate_config(&config).is_err());
    }
}
