use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, FanOutError, FanOutStep, StatisticsError};
use crate::llm::{validate_evaluations, FeatureScorer, DEFAULT_MODEL};
use crate::models::{aggregate_by_feature, batch_document, Batch, Feature, FeatureEvaluation, FeatureStatistics};

/// Configuration for scoring features against documents
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Scoring models, each called `num_evaluations_per_model` times per document
    pub models: Vec<String>,
    pub num_evaluations_per_model: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            models: vec![DEFAULT_MODEL.to_string()],
            num_evaluations_per_model: 5,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::NoModels);
        }
        if self.num_evaluations_per_model == 0 {
            return Err(ConfigError::ZeroRepeats {
                what: "num_evaluations_per_model",
            });
        }
        Ok(())
    }
}

/// Result of scoring one document
#[derive(Debug, Clone, Default)]
pub struct DocumentScores {
    /// Per-feature statistics, first-seen order, features with fewer than two
    /// evaluations left out
    pub statistics: Vec<FeatureStatistics>,
    pub calls: usize,
    pub failures: usize,
}

/// Score `features` against one document with every model, repeatedly and
/// concurrently, then aggregate per feature.
///
/// Failed calls are logged and left out. Fails only when every call fails.
pub async fn score_document<S: FeatureScorer + ?Sized>(
    scorer: &S,
    document: &str,
    features: &[Feature],
    config: &ScoringConfig,
) -> Result<DocumentScores, FanOutError> {
    if features.is_empty() {
        return Ok(DocumentScores::default());
    }

    let calls = config
        .models
        .iter()
        .flat_map(|model| (0..config.num_evaluations_per_model).map(move |_| model.as_str()))
        .map(|model| async move { (model, scorer.score(document, features, model).await) });

    let results = join_all(calls).await;
    let total = results.len();

    let mut evaluations: Vec<FeatureEvaluation> = Vec::new();
    let mut failures = 0;
    let mut last_error = None;

    for (model, result) in results {
        match result {
            Ok(returned) => evaluations.extend(returned),
            Err(e) => {
                warn!(model = model, error = %e, "Scoring call failed");
                failures += 1;
                last_error = Some(e);
            }
        }
    }

    if let (true, Some(e)) = (failures == total, last_error.as_ref()) {
        return Err(FanOutError::all_failed(FanOutStep::Score, total, e));
    }
    if failures > 0 {
        warn!("{} of {} scoring call(s) failed", failures, total);
    }

    let check = validate_evaluations(evaluations, features);
    if !check.is_clean() {
        warn!("Discarded {} invalid evaluation(s)", check.rejected.len());
        for reason in &check.rejected {
            debug!("{}", reason);
        }
    }

    Ok(DocumentScores {
        statistics: aggregate_by_feature(check.accepted),
        calls: total,
        failures,
    })
}

/// Score a feature list against every batch and aggregate per feature across
/// all batches, sorted ascending by standard deviation.
///
/// Batches are scored concurrently. A batch whose scoring calls all fail is
/// skipped with a warning. A feature left with no evaluations at all is an
/// error; one left with a single evaluation is dropped with a log line.
pub async fn evaluate_across_batches<S: FeatureScorer + ?Sized>(
    scorer: &S,
    batches: &[Batch],
    features: &[Feature],
    config: &ScoringConfig,
) -> Result<Vec<FeatureStatistics>, StatisticsError> {
    if features.is_empty() {
        return Ok(Vec::new());
    }

    info!(
        "Evaluating {} feature(s) over {} batch(es)",
        features.len(),
        batches.len()
    );

    let documents: Vec<String> = batches.iter().map(|b| batch_document(b)).collect();
    let per_batch = join_all(
        documents
            .iter()
            .map(|document| score_document(scorer, document, features, config)),
    )
    .await;

    let mut pooled: HashMap<String, Vec<FeatureEvaluation>> = HashMap::new();
    let mut failed_batches = 0;

    for (index, result) in per_batch.into_iter().enumerate() {
        match result {
            Ok(scores) => {
                for stats in scores.statistics {
                    pooled
                        .entry(stats.feature.name.clone())
                        .or_default()
                        .extend(stats.evaluations);
                }
            }
            Err(e) => {
                warn!(batch = index, error = %e, "Skipping batch");
                failed_batches += 1;
            }
        }
    }

    if failed_batches > 0 {
        warn!("{} of {} batch(es) could not be scored", failed_batches, batches.len());
    }

    let mut seen = HashSet::new();
    let mut statistics = Vec::new();

    for feature in features {
        if !seen.insert(feature.name.as_str()) {
            continue;
        }
        let evaluations = pooled.remove(&feature.name).unwrap_or_default();
        match FeatureStatistics::from_evaluations(feature.clone(), evaluations) {
            Ok(stats) => statistics.push(stats),
            Err(e @ StatisticsError::InsufficientEvaluations { .. }) => {
                info!("Skipping feature: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    statistics.sort_by(|a, b| a.standard_deviation.total_cmp(&b.standard_deviation));
    Ok(statistics)
}
