//! fourlep CLI entry point

use anyhow::{Context, Result};
use fourlep::catalog::SampleCatalog;
use fourlep::config::cli::Cli;
use fourlep::config::{toml as config_toml, validator, Config};
use fourlep::coordinator::AnalysisCoordinator;
use fourlep::output;

fn main() -> Result<()> {
    println!("fourlep v{}", env!("CARGO_PKG_VERSION"));
    println!("Distributed four-lepton analysis coordinator");
    println!();

    let cli = Cli::parse_args();
    cli.validate()?;

    let config = config_toml::parse_toml_file(&cli.config)?;
    let config = config_toml::merge_cli_with_config(&cli, config);
    validator::validate_config(&config).context("Configuration validation failed")?;

    let catalog = SampleCatalog::resolve(&config.samples, &config.catalog)
        .context("Failed to resolve sample catalog")?;

    print_configuration(&config, &catalog);

    if cli.dry_run {
        println!();
        print_plan(&catalog);
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    println!();
    println!("Starting analysis...");
    println!();

    // One thread for the whole coordinator: dispatch, consume loop, and the
    // accumulators all live on it.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let outcome = runtime.block_on(async {
        let coordinator = AnalysisCoordinator::new(config.clone(), catalog.clone());
        coordinator.run().await
    })?;

    println!();
    output::text::print_summary(&outcome, &catalog);

    if config.output.write_datasets {
        let written = output::json::write_datasets(&config.output.directory, &catalog, &outcome)?;
        println!();
        println!("Datasets written to: {}", config.output.directory.display());
        if config.runtime.debug {
            for path in &written {
                eprintln!("DEBUG: wrote {}", path.display());
            }
        }
    }

    Ok(())
}

/// Display the resolved configuration
fn print_configuration(config: &Config, catalog: &SampleCatalog) {
    println!("Broker:       {}", config.broker.url);
    println!("Task queue:   {}", config.broker.task_queue);
    println!("Result queue: {}", config.broker.result_queue);
    println!("Workers:      {}", config.workers.count);
    println!("Samples:      {}", catalog.groups().len());
    println!("Total tasks:  {}", catalog.task_count());
}

/// Display the dispatch plan (dry-run mode)
fn print_plan(catalog: &SampleCatalog) {
    println!("Dispatch plan:");
    for group in catalog.groups() {
        println!("  {} ({} file(s))", group.label, group.files.len());
        for (index, file) in group.files.iter().enumerate() {
            println!("    [{index}] {file}");
        }
    }
}
