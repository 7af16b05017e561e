use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{Feature, FeatureEvaluation};

use super::client::{OpenRouterClient, RetryPolicy, StructuredRequest};
use super::prompts::{
    build_dedupe_prompt, build_merge_prompt, build_proposal_prompt, build_scoring_prompt,
    evaluation_list_schema, feature_list_schema, DEDUPE_SYSTEM_PROMPT, MERGE_SYSTEM_PROMPT,
    PROPOSAL_SYSTEM_PROMPT, SCORING_SYSTEM_PROMPT,
};

/// Temperature for scoring calls, so repeated scorings expose instability
pub const SCORING_TEMPERATURE: f64 = 1.0;

/// Generates candidate features for a document
#[async_trait]
pub trait FeatureProposer: Send + Sync {
    async fn propose(&self, document: &str, model: &str) -> Result<Vec<Feature>>;
}

/// Collapses correlated features into bidirectional ones
#[async_trait]
pub trait FeatureMerger: Send + Sync {
    async fn merge(&self, features: &[Feature]) -> Result<Vec<Feature>>;
}

/// Returns the candidates not already represented in the bank
#[async_trait]
pub trait FeatureDeduplicator: Send + Sync {
    async fn dedupe(&self, bank: &[Feature], candidates: &[Feature]) -> Result<Vec<Feature>>;
}

/// Scores a document against features, one evaluation per feature
#[async_trait]
pub trait FeatureScorer: Send + Sync {
    async fn score(
        &self,
        document: &str,
        features: &[Feature],
        model: &str,
    ) -> Result<Vec<FeatureEvaluation>>;
}

/// Everything accumulation needs from its collaborators
pub trait FeatureLab: FeatureProposer + FeatureMerger + FeatureDeduplicator + FeatureScorer {}

impl<T> FeatureLab for T where T: FeatureProposer + FeatureMerger + FeatureDeduplicator + FeatureScorer {}

#[derive(Debug, Deserialize)]
struct FeatureListResponse {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct EvaluationResponse {
    evaluated_features: Vec<FeatureEvaluation>,
}

fn consolidation_retry() -> RetryPolicy {
    RetryPolicy::fixed(3, Duration::from_secs(2))
}

#[async_trait]
impl FeatureProposer for OpenRouterClient {
    async fn propose(&self, document: &str, model: &str) -> Result<Vec<Feature>> {
        let request = StructuredRequest {
            model,
            system: PROPOSAL_SYSTEM_PROMPT,
            user: build_proposal_prompt(document),
            schema_name: "feature_list",
            schema: feature_list_schema(),
            temperature: None,
        };
        let response: FeatureListResponse =
            self.send_structured_with_retry(&request, RetryPolicy::single()).await?;
        Ok(response.features)
    }
}

#[async_trait]
impl FeatureMerger for OpenRouterClient {
    async fn merge(&self, features: &[Feature]) -> Result<Vec<Feature>> {
        let request = StructuredRequest {
            model: &self.config().consolidation_model,
            system: MERGE_SYSTEM_PROMPT,
            user: build_merge_prompt(features),
            schema_name: "feature_list",
            schema: feature_list_schema(),
            temperature: None,
        };
        let response: FeatureListResponse =
            self.send_structured_with_retry(&request, consolidation_retry()).await?;
        Ok(response.features)
    }
}

#[async_trait]
impl FeatureDeduplicator for OpenRouterClient {
    async fn dedupe(&self, bank: &[Feature], candidates: &[Feature]) -> Result<Vec<Feature>> {
        let request = StructuredRequest {
            model: &self.config().consolidation_model,
            system: DEDUPE_SYSTEM_PROMPT,
            user: build_dedupe_prompt(bank, candidates),
            schema_name: "feature_list",
            schema: feature_list_schema(),
            temperature: None,
        };
        let response: FeatureListResponse =
            self.send_structured_with_retry(&request, consolidation_retry()).await?;
        Ok(response.features)
    }
}

#[async_trait]
impl FeatureScorer for OpenRouterClient {
    async fn score(
        &self,
        document: &str,
        features: &[Feature],
        model: &str,
    ) -> Result<Vec<FeatureEvaluation>> {
        let request = StructuredRequest {
            model,
            system: SCORING_SYSTEM_PROMPT,
            user: build_scoring_prompt(document, features),
            schema_name: "feature_evaluations",
            schema: evaluation_list_schema(),
            temperature: Some(SCORING_TEMPERATURE),
        };
        let response: EvaluationResponse =
            self.send_structured_with_retry(&request, RetryPolicy::single()).await?;
        Ok(response.evaluated_features)
    }
}
