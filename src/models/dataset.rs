use std::path::PathBuf;

use crate::error::ConfigError;

use super::word_count;

/// A word-budgeted group of segment texts, evaluated as one document
pub type Batch = Vec<String>;

/// Join a batch into the document handed to the LLM collaborators
pub fn batch_document(batch: &[String]) -> String {
    batch.join("\n")
}

/// Total words in a batch
pub fn batch_word_count(batch: &[String]) -> usize {
    batch.iter().map(|t| word_count(t)).sum()
}

/// Target-speaker texts extracted from one corpus file
#[derive(Debug, Clone)]
pub struct CorpusFile {
    pub path: PathBuf,
    pub texts: Vec<String>,
}

impl CorpusFile {
    pub fn word_count(&self) -> usize {
        batch_word_count(&self.texts)
    }
}

/// Configuration for building train/test/validation batches
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Word budget per batch
    pub max_words_per_batch: usize,
    /// Fraction of shuffled batches assigned to train (exclusive 0-1)
    pub train_ratio: f64,
    /// Fraction of files (taken from the end) reserved for validation
    pub val_ratio: f64,
    /// Seed for the batch shuffle; `None` draws from entropy
    pub seed: Option<u64>,
    /// Fail when any split ends up empty
    pub require_non_empty: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            max_words_per_batch: 2000,
            train_ratio: 0.5,
            val_ratio: 0.2,
            seed: None,
            require_non_empty: true,
        }
    }
}

impl DatasetConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_words_per_batch == 0 {
            return Err(ConfigError::NonPositiveWordBudget);
        }
        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            return Err(ConfigError::TrainRatioOutOfRange(self.train_ratio));
        }
        if !(self.val_ratio >= 0.0 && self.val_ratio < 1.0) {
            return Err(ConfigError::ValRatioOutOfRange(self.val_ratio));
        }
        Ok(())
    }
}

fn split_word_count(batches: &[Batch]) -> usize {
    batches.iter().map(|b| batch_word_count(b)).sum()
}

/// Three disjoint ordered collections of batches
#[derive(Debug, Clone, Default)]
pub struct DatasetSplit {
    pub train: Vec<Batch>,
    pub test: Vec<Batch>,
    pub validation: Vec<Batch>,
}

impl DatasetSplit {
    /// Word totals as (train, test, validation)
    pub fn word_counts(&self) -> (usize, usize, usize) {
        (
            split_word_count(&self.train),
            split_word_count(&self.test),
            split_word_count(&self.validation),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_config_default_is_valid() {
        let config = DatasetConfig::default();
        assert_eq!(config.max_words_per_batch, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dataset_config_rejects_bad_values() {
        let config = DatasetConfig {
            max_words_per_batch: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveWordBudget));

        for ratio in [0.0, 1.0, -0.5, f64::NAN] {
            let config = DatasetConfig {
                train_ratio: ratio,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::TrainRatioOutOfRange(_))
            ));
        }

        let config = DatasetConfig {
            val_ratio: 1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ValRatioOutOfRange(1.0)));
    }

    #[test]
    fn test_batch_document_joins_lines() {
        let batch = vec!["first turn".to_string(), "second turn".to_string()];
        assert_eq!(batch_document(&batch), "first turn\nsecond turn");
        assert_eq!(batch_word_count(&batch), 4);
    }
}
