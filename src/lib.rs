//! fourlep - Distributed four-lepton analysis coordinator
//!
//! fourlep fans a batch physics analysis out to an external worker pool over
//! an AMQP broker, collects the workers' partial results, and assembles one
//! dataset per sample group for the downstream presentation layer.
//!
//! # Architecture
//!
//! - **Catalog**: resolves configured sample groups into ordered file lists
//! - **Dispatcher**: one task message per (sample group, file) pair
//! - **Collector**: per-group fragment accumulation with fractional
//!   completion accounting for batch-split task outputs
//! - **Shutdown**: poison-pill broadcast so every worker instance exits
//! - **Output**: per-group JSON datasets handed to the presentation layer

pub mod broker;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod frames;
pub mod output;
pub mod protocol;

// Re-export commonly used types
pub use catalog::SampleCatalog;
pub use config::Config;
pub use coordinator::AnalysisCoordinator;

/// Result type used throughout fourlep
pub type Result<T> = anyhow::Result<T>;
