use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::stages::AccumulationOutcome;

/// Invalid ratios, budgets or corpus locations. Always fatal, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("max_words_per_batch must be > 0")]
    NonPositiveWordBudget,

    #[error("batch_size must be > 0")]
    NonPositiveBatchSize,

    #[error("train_ratio must be between 0 and 1 (exclusive): {0}")]
    TrainRatioOutOfRange(f64),

    #[error("val_ratio must be in [0, 1): {0}")]
    ValRatioOutOfRange(f64),

    #[error("{split} split is empty")]
    EmptySplit { split: &'static str },

    #[error("at least one model is required")]
    NoModels,

    #[error("{what} must be > 0")]
    ZeroRepeats { what: &'static str },

    #[error("corpus directory does not exist or is empty: {path:?}")]
    CorpusUnavailable { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentationError {
    #[error("host phrase not found in any segment: {phrase:?}")]
    HostPhraseNotFound { phrase: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatisticsError {
    #[error("no evaluations for feature '{feature}'")]
    NoEvaluations { feature: String },

    #[error("feature '{feature}' has {count} evaluation(s), at least 2 are required")]
    InsufficientEvaluations { feature: String, count: usize },
}

/// Collaborator step whose calls are fanned out for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutStep {
    Propose,
    Merge,
    Dedupe,
    Score,
}

impl fmt::Display for FanOutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FanOutStep::Propose => "propose",
            FanOutStep::Merge => "merge",
            FanOutStep::Dedupe => "dedupe",
            FanOutStep::Score => "score",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FanOutError {
    #[error("all {calls} {step} call(s) failed, last error: {last_error}")]
    AllFailed {
        step: FanOutStep,
        calls: usize,
        last_error: String,
    },
}

impl FanOutError {
    pub fn all_failed(step: FanOutStep, calls: usize, last_error: &anyhow::Error) -> Self {
        FanOutError::AllFailed {
            step,
            calls,
            last_error: format!("{:#}", last_error),
        }
    }

    pub fn step(&self) -> FanOutStep {
        match self {
            FanOutError::AllFailed { step, .. } => *step,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbortReason {
    #[error(transparent)]
    FanOut(#[from] FanOutError),

    #[error("global stability pass failed: {0}")]
    GlobalPass(#[from] StatisticsError),
}

#[derive(Debug, Error)]
pub enum AccumulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The run stopped early. `progress.bank` is the bank as it stood, the
    /// counters cover every batch handled before the abort.
    #[error(
        "accumulation aborted after {} batch(es) with {} feature(s) in the bank: {reason}",
        .progress.batches_processed,
        .progress.bank.len()
    )]
    Aborted {
        progress: AccumulationOutcome,
        #[source]
        reason: AbortReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Feature;

    #[test]
    fn test_aborted_message_reports_progress() {
        let err = AccumulationError::Aborted {
            progress: AccumulationOutcome {
                bank: vec![Feature::new("Warmth", "d", "cold", "warm")],
                batches_processed: 3,
                ..Default::default()
            },
            reason: AbortReason::FanOut(FanOutError::AllFailed {
                step: FanOutStep::Propose,
                calls: 2,
                last_error: "timeout".to_string(),
            }),
        };

        let message = err.to_string();
        assert!(message.contains("3 batch(es)"));
        assert!(message.contains("1 feature(s)"));
        assert!(message.contains("all 2 propose call(s) failed"));
    }
}
