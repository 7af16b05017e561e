use crate::models::Feature;

/// System prompt for proposing candidate features from a document
pub const PROPOSAL_SYSTEM_PROMPT: &str = r#"You are a social science researcher building detectors for subjective traits in conversational text.

Propose a rubric of continuous dimensions, each rated from 0 to 10, describing how the speaker comes across to a listener.

RULES:
- Describe style, tone and interpersonal impression. Ignore factual correctness and topic.
- Give every dimension a short name, a one-sentence description, and what a 0 and a 10 look like.
- Cover emotional tone, personality expression, conversational style and relationship dynamics.
- Subjective impressions are acceptable. You are not defining ground truth.

Output MUST be valid JSON matching the provided schema."#;

/// System prompt for scoring a document against a fixed list of features
pub const SCORING_SYSTEM_PROMPT: &str = r#"You are a rater applying a subjective style rubric to conversational text.

For every feature in the rubric, give a score from 0 to 10 and a short explanation citing the passages that justify it.

RULES:
- Rate style and tone only, never factual correctness or task quality.
- Use the feature names exactly as written in the rubric.
- Score every feature once.

Output MUST be valid JSON matching the provided schema."#;

/// System prompt for collapsing correlated features into bidirectional ones
pub const MERGE_SYSTEM_PROMPT: &str = r#"You are a social science researcher consolidating a list of rubric features.

Merge features that are strongly correlated, positively or negatively, into a single feature, and return the consolidated list.

SCALE for every returned feature:
- 10: the feature is maximally present
- 5: the feature is neutral or absent
- 0: the opposite of the feature is maximally present

Output MUST be valid JSON matching the provided schema."#;

/// System prompt for filtering candidates already covered by the bank
pub const DEDUPE_SYSTEM_PROMPT: &str = r#"You are a social science researcher maintaining a bank of rubric features.

You receive the current bank and a list of candidate features. Return only the candidates that measure something not already captured by a feature in the bank.

RULES:
- A candidate that is a synonym, antonym or narrower version of a bank feature is NOT new.
- Return the novel candidates unchanged, with the same name, description and pole descriptions.
- Return an empty list if no candidate is new.

Output MUST be valid JSON matching the provided schema."#;

/// User prompt wrapping a batch document
pub fn build_proposal_prompt(document: &str) -> String {
    format!("Conversation:\n```\n{}\n```", document)
}

pub fn build_scoring_prompt(document: &str, features: &[Feature]) -> String {
    format!(
        "Conversation:\n```\n{}\n```\n\nRubric:\n```json\n{}\n```",
        document,
        format_features(features)
    )
}

pub fn build_merge_prompt(features: &[Feature]) -> String {
    format!("Features:\n```json\n{}\n```", format_features(features))
}

pub fn build_dedupe_prompt(bank: &[Feature], candidates: &[Feature]) -> String {
    format!(
        "Current bank:\n```json\n{}\n```\n\nCandidates:\n```json\n{}\n```",
        format_features(bank),
        format_features(candidates)
    )
}

fn format_features(features: &[Feature]) -> String {
    serde_json::to_string_pretty(features).unwrap_or_else(|_| "[]".to_string())
}

fn feature_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "description": { "type": "string" },
            "description_min_value": {
                "type": "string",
                "description": "What a score of 0 looks like"
            },
            "description_max_value": {
                "type": "string",
                "description": "What a score of 10 looks like"
            }
        },
        "required": ["name", "description", "description_min_value", "description_max_value"],
        "additionalProperties": false
    })
}

/// Schema for `{"features": [Feature, ...]}`
pub fn feature_list_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "features": {
                "type": "array",
                "items": feature_schema()
            }
        },
        "required": ["features"],
        "additionalProperties": false
    })
}

/// Schema for `{"evaluated_features": [{feature, explanation, score}, ...]}`
pub fn evaluation_list_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "evaluated_features": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "feature": feature_schema(),
                        "explanation": { "type": "string" },
                        "score": {
                            "type": "number",
                            "description": "Score from 0 to 10"
                        }
                    },
                    "required": ["feature", "explanation", "score"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["evaluated_features"],
        "additionalProperties": false
    })
}
