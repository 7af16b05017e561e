use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::Feature;
use crate::stages::AccumulationOutcome;

/// Save a feature bank as a pretty-printed JSON array
pub fn write_feature_bank(path: &Path, bank: &[Feature]) -> Result<()> {
    create_parent(path)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    serde_json::to_writer_pretty(file, bank).context("Failed to write feature bank JSON")?;
    Ok(())
}

/// Write a text report (statistics listing, CSV) to a file
pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    create_parent(path)?;
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    write!(file, "{}", contents).with_context(|| format!("Failed to write file: {:?}", path))?;
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    Ok(())
}

/// Record of one accumulation run, written next to the bank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    /// RFC 3339
    pub started_at: String,
    pub finished_at: Option<String>,
    pub train_batches: usize,
    pub batches_processed: usize,
    pub batches_skipped: usize,
    pub bank_size: usize,
    /// Bank size after each batch, before the global pass
    pub bank_sizes: Vec<usize>,
    pub features_pruned: usize,
    pub proposal_failures: usize,
    pub scoring_failures: usize,
    /// Set when the run stopped early
    pub abort_reason: Option<String>,
}

impl RunSummary {
    /// Start a run with a fresh id
    pub fn start(train_batches: usize) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            train_batches,
            batches_processed: 0,
            batches_skipped: 0,
            bank_size: 0,
            bank_sizes: Vec::new(),
            features_pruned: 0,
            proposal_failures: 0,
            scoring_failures: 0,
            abort_reason: None,
        }
    }

    pub fn record_outcome(&mut self, outcome: &AccumulationOutcome) {
        self.batches_processed = outcome.batches_processed;
        self.batches_skipped = outcome.batches_skipped;
        self.bank_size = outcome.bank.len();
        self.bank_sizes = outcome.bank_sizes.clone();
        self.features_pruned = outcome.features_pruned;
        self.proposal_failures = outcome.proposal_failures;
        self.scoring_failures = outcome.scoring_failures;
        self.finished_at = Some(Utc::now().to_rfc3339());
    }

    /// Record the progress of a run that stopped early
    pub fn record_abort(&mut self, progress: &AccumulationOutcome, reason: &str) {
        self.record_outcome(progress);
        self.abort_reason = Some(reason.to_string());
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        create_parent(path)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}
