use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::models::{word_count, Batch, CorpusFile, DatasetConfig, DatasetSplit};

/// Greedily group texts into batches of at most `max_words_per_batch` words.
///
/// A batch closes before a text that would push it over budget, and right after
/// a text that brings it to or over budget. Texts are never split, so a single
/// text longer than the budget forms its own batch.
pub fn batch_by_words(
    texts: &[String],
    max_words_per_batch: usize,
) -> Result<Vec<Batch>, ConfigError> {
    if max_words_per_batch == 0 {
        return Err(ConfigError::NonPositiveWordBudget);
    }

    let mut batches = Vec::new();
    let mut current: Batch = Vec::new();
    let mut current_words = 0;

    for text in texts {
        let words = word_count(text);

        if !current.is_empty() && current_words + words > max_words_per_batch {
            batches.push(std::mem::take(&mut current));
            current_words = 0;
        }

        current.push(text.clone());
        current_words += words;

        if current_words >= max_words_per_batch {
            batches.push(std::mem::take(&mut current));
            current_words = 0;
        }
    }

    if !current.is_empty() {
        batches.push(current);
    }

    Ok(batches)
}

/// Split items into chunks of exactly `batch_size`, dropping a trailing partial chunk
pub fn batch_fixed<T: Clone>(items: &[T], batch_size: usize) -> Result<Vec<Vec<T>>, ConfigError> {
    if batch_size == 0 {
        return Err(ConfigError::NonPositiveBatchSize);
    }

    let dropped = items.len() % batch_size;
    if dropped > 0 {
        info!("Dropping {} trailing item(s) that do not fill a batch", dropped);
    }

    Ok(items
        .chunks_exact(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// First `floor(len * train_ratio)` items go to train, the rest to test
pub fn train_test_split<T>(
    mut items: Vec<T>,
    train_ratio: f64,
) -> Result<(Vec<T>, Vec<T>), ConfigError> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(ConfigError::TrainRatioOutOfRange(train_ratio));
    }

    let n_train = (items.len() as f64 * train_ratio).floor() as usize;
    let test = items.split_off(n_train);
    Ok((items, test))
}

/// Build train/test/validation batches from a loaded corpus.
///
/// The last `floor(files * val_ratio)` files are reserved whole for validation
/// and batched in order. The remaining files are batched, shuffled at batch
/// level (keeping neighbouring turns together), then split into train and test.
pub fn build_dataset(corpus: &[CorpusFile], config: &DatasetConfig) -> Result<DatasetSplit, ConfigError> {
    config.validate()?;

    let n_validation = (corpus.len() as f64 * config.val_ratio).floor() as usize;
    let (pool, held_out) = corpus.split_at(corpus.len() - n_validation);

    let mut batches = batch_by_words(&flatten_texts(pool), config.max_words_per_batch)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    batches.shuffle(&mut rng);

    let (train, test) = train_test_split(batches, config.train_ratio)?;
    let validation = batch_by_words(&flatten_texts(held_out), config.max_words_per_batch)?;

    let split = DatasetSplit {
        train,
        test,
        validation,
    };

    let (train_words, test_words, validation_words) = split.word_counts();
    info!(
        "Dataset: {} file(s) ({} held out), batches train={} test={} validation={}",
        corpus.len(),
        n_validation,
        split.train.len(),
        split.test.len(),
        split.validation.len()
    );
    info!(
        "Words: train={} test={} validation={}",
        train_words, test_words, validation_words
    );

    if config.require_non_empty {
        for (name, batches) in [
            ("train", &split.train),
            ("test", &split.test),
            ("validation", &split.validation),
        ] {
            if batches.is_empty() {
                return Err(ConfigError::EmptySplit { split: name });
            }
        }
    }

    Ok(split)
}

/// Batch a whole corpus in file order without splitting, for evaluating a bank
/// on another persona. `max_samples` keeps only the first batches.
pub fn build_evaluation_set(
    corpus: &[CorpusFile],
    max_words_per_batch: usize,
    max_samples: Option<usize>,
) -> Result<Vec<Batch>, ConfigError> {
    let mut batches = batch_by_words(&flatten_texts(corpus), max_words_per_batch)?;

    if let Some(limit) = max_samples {
        if batches.len() > limit {
            warn!("Keeping {} of {} batches", limit, batches.len());
            batches.truncate(limit);
        }
    }

    Ok(batches)
}

fn flatten_texts(files: &[CorpusFile]) -> Vec<String> {
    files.iter().flat_map(|f| f.texts.iter().cloned()).collect()
}
