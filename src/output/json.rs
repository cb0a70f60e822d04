//! JSON dataset output
//!
//! Writes one JSON file per sample group plus a run summary. The column
//! names (`mass`, `totalWeight`) are the contract with the presentation
//! layer and are emitted unchanged.

use crate::catalog::SampleCatalog;
use crate::coordinator::AnalysisOutcome;
use crate::frames::EventBatch;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One sample group's final dataset, as written to disk
#[derive(Debug, Serialize)]
pub struct DatasetFile {
    /// Generation timestamp, RFC 3339
    pub generated_at: String,
    /// Sample group label
    pub sample: String,
    /// Display color, if configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Number of events in the dataset
    pub events: usize,
    /// Number of fragments the dataset was assembled from
    pub fragments: usize,
    /// Sum of event weights
    pub sum_weights: f64,
    /// Derived-quantity column
    pub mass: Vec<f64>,
    /// Weighting column
    #[serde(rename = "totalWeight")]
    pub total_weight: Vec<f64>,
}

/// Run summary, as written to disk
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub total_tasks: u64,
    pub elapsed_seconds: f64,
    pub samples: Vec<SummaryEntry>,
}

/// One sample group's line in the run summary
#[derive(Debug, Serialize)]
pub struct SummaryEntry {
    pub sample: String,
    pub events: usize,
    pub fragments: usize,
    pub sum_weights: f64,
}

/// Write per-group dataset files and `summary.json` into `dir`
///
/// Returns the paths written. Group labels are sanitized into file names;
/// colliding names get a numeric suffix.
pub fn write_datasets(
    dir: &Path,
    catalog: &SampleCatalog,
    outcome: &AnalysisOutcome,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let generated_at = Utc::now().to_rfc3339();
    let mut written = Vec::new();
    let mut used_names = HashSet::new();

    for group in catalog.groups() {
        let empty = EventBatch::default();
        let dataset = outcome.datasets.get(&group.label).unwrap_or(&empty);
        let fragments = outcome
            .fragment_counts
            .get(&group.label)
            .copied()
            .unwrap_or(0);

        let file = DatasetFile {
            generated_at: generated_at.clone(),
            sample: group.label.clone(),
            color: group.color.clone(),
            events: dataset.len(),
            fragments,
            sum_weights: dataset.sum_weights(),
            mass: dataset.mass.clone(),
            total_weight: dataset.total_weight.clone(),
        };

        let name = unique_name(&mut used_names, &sanitize_label(&group.label));
        let path = dir.join(format!("{name}.json"));
        write_json_output(&path, &file, true)?;
        written.push(path);
    }

    let summary = RunSummary {
        generated_at,
        total_tasks: outcome.total_tasks,
        elapsed_seconds: outcome.elapsed.as_secs_f64(),
        samples: catalog
            .groups()
            .iter()
            .map(|group| {
                let empty = EventBatch::default();
                let dataset = outcome.datasets.get(&group.label).unwrap_or(&empty);
                SummaryEntry {
                    sample: group.label.clone(),
                    events: dataset.len(),
                    fragments: outcome
                        .fragment_counts
                        .get(&group.label)
                        .copied()
                        .unwrap_or(0),
                    sum_weights: dataset.sum_weights(),
                }
            })
            .collect(),
    };

    let summary_path = dir.join("summary.json");
    write_json_output(&summary_path, &summary, true)?;
    written.push(summary_path);

    Ok(written)
}

/// Serialize a value to a JSON file
pub fn write_json_output<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let contents = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize JSON output")?;

    fs::write(path, contents)
        .with_context(|| format!("Failed to write JSON output: {}", path.display()))?;

    Ok(())
}

/// Reduce a group label to a filesystem-safe name
fn sanitize_label(label: &str) -> String {
    let sanitized: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = sanitized.trim_matches('_');

    if trimmed.is_empty() {
        "sample".to_string()
    } else {
        trimmed.to_string()
    }
}

fn unique_name(used: &mut HashSet<String>, base: &str) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
