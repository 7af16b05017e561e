pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod segmentation;
pub mod stages;

pub use error::{AbortReason, AccumulationError, ConfigError, FanOutError, FanOutStep, StatisticsError};
pub use io::{load_corpus, load_feature_bank, write_feature_bank, RunSummary};
pub use llm::{FeatureLab, LlmConfig, OpenRouterClient};
pub use models::{
    Batch, CorpusFile, DatasetConfig, DatasetSplit, Feature, FeatureEvaluation, FeatureStatistics,
    Segment,
};
pub use segmentation::{CorpusFormat, MissingHostPolicy};
pub use stages::{
    accumulate_feature_bank, batch_by_words, build_dataset, evaluate_across_batches,
    train_test_split, AccumulationOutcome, AccumulatorConfig, ScoringConfig, TotalFailurePolicy,
};
