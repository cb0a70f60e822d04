//! CLI argument parsing using clap

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// fourlep - Distributed four-lepton analysis coordinator
#[derive(Parser, Debug)]
#[command(name = "fourlep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file (samples, broker, workers)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// AMQP broker URL (overrides the config file)
    #[arg(long, env = "FOURLEP_BROKER_URL")]
    pub broker_url: Option<String>,

    /// Task queue name (overrides the config file)
    #[arg(long)]
    pub task_queue: Option<String>,

    /// Result queue name (overrides the config file)
    #[arg(long)]
    pub result_queue: Option<String>,

    /// Number of worker instances in the deployment (overrides the config file)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Output directory for dataset files (overrides the config file)
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Resolve the catalog, print the dispatch plan, and exit without
    /// connecting to the broker
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers {
            if workers == 0 {
                anyhow::bail!("--workers must be at least 1");
            }
        }

        if let Some(ref url) = self.broker_url {
            if url.is_empty() {
                anyhow::bail!("--broker-url must not be empty");
            }
        }

        Ok(())
    }
}
