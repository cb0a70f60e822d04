//! Human-readable run summary

use crate::catalog::SampleCatalog;
use crate::coordinator::AnalysisOutcome;

/// Print the run summary to the console
pub fn print_summary(outcome: &AnalysisOutcome, catalog: &SampleCatalog) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                   ANALYSIS RESULTS");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    println!("Elapsed Time: {:.3}s", outcome.elapsed.as_secs_f64());
    println!("Tasks:        {}", outcome.total_tasks);
    println!();

    println!("Samples:");
    for group in catalog.groups() {
        let events = outcome
            .datasets
            .get(&group.label)
            .map_or(0, |dataset| dataset.len());
        let fragments = outcome
            .fragment_counts
            .get(&group.label)
            .copied()
            .unwrap_or(0);
        let sum_weights = outcome
            .datasets
            .get(&group.label)
            .map_or(0.0, |dataset| dataset.sum_weights());

        println!(
            "  {}: {} events in {} fragment(s), sum of weights {:.4}",
            group.label, events, fragments, sum_weights
        );
    }

    let total_events: usize = outcome.datasets.values().map(|d| d.len()).sum();
    let total_fragments: usize = outcome.fragment_counts.values().sum();
    println!();
    println!(
        "Total: {} events in {} fragment(s) across {} sample group(s)",
        total_events,
        total_fragments,
        catalog.groups().len()
    );
}
