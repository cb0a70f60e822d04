//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    pub samples: Vec<SampleSpec>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Broker connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// AMQP broker URL
    pub url: String,
    /// Queue carrying task messages (and termination sentinels)
    pub task_queue: String,
    /// Queue carrying result messages
    pub result_queue: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            task_queue: default_task_queue(),
            result_queue: default_result_queue(),
        }
    }
}

fn default_broker_url() -> String {
    "amqp://rabbitmq:5672/%2f".to_string()
}

fn default_task_queue() -> String {
    "task_queue".to_string()
}

fn default_result_queue() -> String {
    "result_queue".to_string()
}

/// Worker deployment configuration
///
/// The coordinator never discovers workers dynamically; the instance count is
/// a deployment constant used only to size the termination broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of worker instances in the deployment
    pub count: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
        }
    }
}

fn default_worker_count() -> usize {
    2
}

/// Catalog resolution configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// URL template for expanding dataset identifiers into file URLs.
    /// Must contain a `{did}` placeholder. Only required for samples that
    /// list `dids` instead of explicit `files`.
    pub url_template: Option<String>,
}

/// One configured sample group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSpec {
    /// Unique, stable group label (also the `sample_type` wire header)
    pub label: String,
    /// Explicit ordered file list
    #[serde(default)]
    pub files: Vec<String>,
    /// Dataset identifiers, expanded through `catalog.url_template`
    #[serde(default)]
    pub dids: Vec<String>,
    /// Display color, carried opaquely for the presentation layer
    pub color: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the per-group dataset files
    pub directory: PathBuf,
    /// Write per-group JSON dataset files after completion
    pub write_datasets: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            write_datasets: true,
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Enable debug output
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_defaults() {
        let broker = BrokerConfig::default();
        assert_eq!(broker.url, "amqp://rabbitmq:5672/%2f");
        assert_eq!(broker.task_queue, "task_queue");
        assert_eq!(broker.result_queue, "result_queue");
    }

    #[test]
    fn test_worker_default_count() {
        assert_eq!(WorkerConfig::default().count, 2);
    }

    #[test]
    fn test_output_defaults() {
        let output = OutputConfig::default();
        assert_eq!(output.directory, PathBuf::from("output"));
        assert!(output.write_datasets);
    }
}
