use std::collections::HashSet;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::{AccumulationError, ConfigError, FanOutError, FanOutStep};
use crate::llm::{
    restrict_to_candidates, validate_features, BoundaryCheck, FeatureDeduplicator, FeatureLab,
    FeatureMerger, FeatureProposer, DEFAULT_MODEL,
};
use crate::models::{batch_document, Batch, Feature};

use super::evaluate::{evaluate_across_batches, score_document, ScoringConfig};

/// Highest standard deviation a feature may show and still be kept
pub const MAX_STD_DEVIATION: f64 = 1.0;

/// What to do when a required step fails for every call on a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TotalFailurePolicy {
    /// Stop the run and hand back the bank built so far
    #[default]
    Abort,
    /// Log the failure and move on to the next batch
    SkipBatch,
}

/// Configuration for feature bank accumulation
#[derive(Debug, Clone)]
pub struct AccumulatorConfig {
    /// Models used both for proposing and scoring
    pub models: Vec<String>,
    /// Proposal calls per model per batch
    pub rubrics_per_model: usize,
    /// Scoring calls per model per batch
    pub evaluations_per_model: usize,
    pub max_std_deviation: f64,
    pub on_total_failure: TotalFailurePolicy,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            models: vec![DEFAULT_MODEL.to_string()],
            rubrics_per_model: 2,
            evaluations_per_model: 5,
            max_std_deviation: MAX_STD_DEVIATION,
            on_total_failure: TotalFailurePolicy::Abort,
        }
    }
}

impl AccumulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rubrics_per_model == 0 {
            return Err(ConfigError::ZeroRepeats {
                what: "rubrics_per_model",
            });
        }
        self.scoring().validate()
    }

    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            models: self.models.clone(),
            num_evaluations_per_model: self.evaluations_per_model,
        }
    }
}

/// Result of an accumulation run, or its progress when the run aborts
#[derive(Debug, Clone, Default)]
pub struct AccumulationOutcome {
    /// Accepted features after the global stability pass
    pub bank: Vec<Feature>,
    pub batches_processed: usize,
    pub batches_skipped: usize,
    /// Bank size after each training batch, before the global pass
    pub bank_sizes: Vec<usize>,
    /// Features removed by the global stability pass
    pub features_pruned: usize,
    pub proposal_failures: usize,
    pub scoring_failures: usize,
}

/// What one batch contributed
#[derive(Debug, Default)]
struct BatchContribution {
    accepted: Vec<Feature>,
    proposal_failures: usize,
    scoring_failures: usize,
}

/// Grow a feature bank over the training batches, one batch at a time.
///
/// For each batch:
/// 1. Propose candidates with every model, `rubrics_per_model` times each
/// 2. Merge correlated candidates into bidirectional features
/// 3. Drop candidates the bank already covers
/// 4. Score the survivors repeatedly and keep the stable ones
///
/// After the last batch the whole bank is scored across all training batches
/// and features that turn out unstable there are removed.
pub async fn accumulate_feature_bank<L: FeatureLab + ?Sized>(
    lab: &L,
    train: &[Batch],
    config: &AccumulatorConfig,
) -> Result<AccumulationOutcome, AccumulationError> {
    config.validate()?;

    let mut outcome = AccumulationOutcome::default();
    let mut bank: Vec<Feature> = Vec::new();

    info!("Accumulating feature bank over {} training batch(es)", train.len());

    for (index, batch) in train.iter().enumerate() {
        let document = batch_document(batch);

        match grow_from_batch(lab, &document, &bank, config).await {
            Ok(contribution) => {
                outcome.proposal_failures += contribution.proposal_failures;
                outcome.scoring_failures += contribution.scoring_failures;
                outcome.batches_processed += 1;

                info!(
                    batch = index,
                    "Accepted {} feature(s), bank size {}",
                    contribution.accepted.len(),
                    bank.len() + contribution.accepted.len()
                );
                bank.extend(contribution.accepted);
            }
            Err(e) => match config.on_total_failure {
                TotalFailurePolicy::Abort => {
                    warn!(batch = index, error = %e, "Aborting accumulation");
                    outcome.bank = bank;
                    return Err(AccumulationError::Aborted {
                        progress: outcome,
                        reason: e.into(),
                    });
                }
                TotalFailurePolicy::SkipBatch => {
                    warn!(batch = index, error = %e, "Skipping batch");
                    outcome.batches_skipped += 1;
                }
            },
        }

        outcome.bank_sizes.push(bank.len());
    }

    if bank.is_empty() {
        info!("Bank is empty, skipping global stability pass");
        return Ok(outcome);
    }

    let statistics = match evaluate_across_batches(lab, train, &bank, &config.scoring()).await {
        Ok(statistics) => statistics,
        Err(e) => {
            warn!(error = %e, "Global stability pass failed");
            outcome.bank = bank;
            return Err(AccumulationError::Aborted {
                progress: outcome,
                reason: e.into(),
            });
        }
    };

    let stable: HashSet<&str> = statistics
        .iter()
        .filter(|s| s.standard_deviation <= config.max_std_deviation)
        .map(|s| s.name())
        .collect();

    let before = bank.len();
    bank.retain(|feature| {
        let keep = stable.contains(feature.name.as_str());
        if !keep {
            info!("Pruning unstable feature '{}'", feature.name);
        }
        keep
    });
    outcome.features_pruned = before - bank.len();

    info!(
        "Global pass kept {} of {} feature(s)",
        bank.len(),
        before
    );

    outcome.bank = bank;
    Ok(outcome)
}

/// Run propose, merge, dedupe, score and filter for one document
async fn grow_from_batch<L: FeatureLab + ?Sized>(
    lab: &L,
    document: &str,
    bank: &[Feature],
    config: &AccumulatorConfig,
) -> Result<BatchContribution, FanOutError> {
    let (proposed, proposal_failures) = propose_candidates(lab, document, config).await?;

    let mut contribution = BatchContribution {
        proposal_failures,
        ..Default::default()
    };

    let candidates = log_rejections("proposed", validate_features(proposed));
    if candidates.is_empty() {
        info!("No valid candidates proposed");
        return Ok(contribution);
    }

    let merged = lab
        .merge(&candidates)
        .await
        .map_err(|e| FanOutError::all_failed(FanOutStep::Merge, 1, &e))?;
    let merged = log_rejections("merged", validate_features(merged));
    debug!("Merged {} candidate(s) into {}", candidates.len(), merged.len());

    let novel = dedupe_against_bank(lab, bank, merged).await?;
    if novel.is_empty() {
        info!("All candidates already covered by the bank");
        return Ok(contribution);
    }

    let scores = score_document(lab, document, &novel, &config.scoring()).await?;
    contribution.scoring_failures = scores.failures;

    let stable: HashSet<&str> = scores
        .statistics
        .iter()
        .filter(|s| s.standard_deviation <= config.max_std_deviation)
        .map(|s| s.name())
        .collect();

    for stats in &scores.statistics {
        if stats.standard_deviation > config.max_std_deviation {
            debug!(
                "Rejecting '{}' (std {:.2} > {:.2})",
                stats.name(),
                stats.standard_deviation,
                config.max_std_deviation
            );
        }
    }

    contribution.accepted = novel
        .into_iter()
        .filter(|f| stable.contains(f.name.as_str()))
        .collect();

    Ok(contribution)
}

/// Fan out proposal calls; fails only when every call fails
async fn propose_candidates<L: FeatureProposer + ?Sized>(
    lab: &L,
    document: &str,
    config: &AccumulatorConfig,
) -> Result<(Vec<Feature>, usize), FanOutError> {
    let calls = config
        .models
        .iter()
        .flat_map(|model| (0..config.rubrics_per_model).map(move |_| model.as_str()))
        .map(|model| async move { (model, lab.propose(document, model).await) });

    let results = join_all(calls).await;
    let total = results.len();

    let mut proposed = Vec::new();
    let mut failures = 0;
    let mut last_error = None;

    for (model, result) in results {
        match result {
            Ok(features) => proposed.extend(features),
            Err(e) => {
                warn!(model = model, error = %e, "Proposal call failed");
                failures += 1;
                last_error = Some(e);
            }
        }
    }

    if let (true, Some(e)) = (failures == total, last_error.as_ref()) {
        return Err(FanOutError::all_failed(FanOutStep::Propose, total, e));
    }
    if failures > 0 {
        warn!("{} of {} proposal call(s) failed", failures, total);
    }

    Ok((proposed, failures))
}

/// Candidates not already represented in the bank
async fn dedupe_against_bank<L: FeatureDeduplicator + ?Sized>(
    lab: &L,
    bank: &[Feature],
    candidates: Vec<Feature>,
) -> Result<Vec<Feature>, FanOutError> {
    if candidates.is_empty() || bank.is_empty() {
        return Ok(candidates);
    }

    let returned = lab
        .dedupe(bank, &candidates)
        .await
        .map_err(|e| FanOutError::all_failed(FanOutStep::Dedupe, 1, &e))?;
    let novel = log_rejections("deduplicated", restrict_to_candidates(returned, &candidates));

    let banked: HashSet<&str> = bank.iter().map(|f| f.name.as_str()).collect();
    Ok(novel
        .into_iter()
        .filter(|f| {
            let known = banked.contains(f.name.as_str());
            if known {
                debug!("'{}' is already in the bank", f.name);
            }
            !known
        })
        .collect())
}

fn log_rejections(stage: &str, check: BoundaryCheck<Feature>) -> Vec<Feature> {
    if !check.is_clean() {
        warn!("Discarded {} invalid {} feature(s)", check.rejected.len(), stage);
        for reason in &check.rejected {
            debug!("{}", reason);
        }
    }
    check.accepted
}
