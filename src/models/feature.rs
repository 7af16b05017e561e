use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StatisticsError;

/// A named 0-10 evaluative dimension describing text style or tone
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    /// Identity for grouping (case-sensitive exact match)
    pub name: String,
    /// What the dimension measures
    pub description: String,
    /// Meaning of a score of 0
    pub description_min_value: String,
    /// Meaning of a score of 10
    pub description_max_value: String,
}

impl Feature {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        description_min_value: impl Into<String>,
        description_max_value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            description_min_value: description_min_value.into(),
            description_max_value: description_max_value.into(),
        }
    }

    /// Names of required fields that are blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.description_min_value.trim().is_empty() {
            missing.push("description_min_value");
        }
        if self.description_max_value.trim().is_empty() {
            missing.push("description_max_value");
        }
        missing
    }
}

/// One scoring of one feature against one document by one model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEvaluation {
    pub feature: Feature,
    pub explanation: String,
    pub score: f64,
}

/// Aggregate over all evaluations sharing a feature name within a scope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureStatistics {
    /// The canonical feature these statistics describe
    pub feature: Feature,
    pub evaluations: Vec<FeatureEvaluation>,
    pub min_score: f64,
    pub max_score: f64,
    pub average_score: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub standard_deviation: f64,
    /// Sample variance (n - 1 denominator)
    pub variance: f64,
    pub num_evaluations: usize,
}

impl FeatureStatistics {
    /// Compute statistics over `evaluations`. Needs at least two scores.
    pub fn from_evaluations(
        feature: Feature,
        evaluations: Vec<FeatureEvaluation>,
    ) -> Result<Self, StatisticsError> {
        match evaluations.len() {
            0 => {
                return Err(StatisticsError::NoEvaluations {
                    feature: feature.name,
                });
            }
            1 => {
                return Err(StatisticsError::InsufficientEvaluations {
                    feature: feature.name,
                    count: 1,
                });
            }
            _ => {}
        }

        let scores: Vec<f64> = evaluations.iter().map(|e| e.score).collect();
        let n = scores.len() as f64;
        let average_score = scores.iter().sum::<f64>() / n;
        let variance = scores
            .iter()
            .map(|s| (s - average_score).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        let min_score = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            feature,
            num_evaluations: evaluations.len(),
            evaluations,
            min_score,
            max_score,
            average_score,
            standard_deviation: variance.sqrt(),
            variance,
        })
    }

    pub fn name(&self) -> &str {
        &self.feature.name
    }
}

/// Group evaluations by feature name (first-seen order) and aggregate each group.
///
/// Groups with fewer than two evaluations are dropped with a log line.
pub fn aggregate_by_feature(evaluations: Vec<FeatureEvaluation>) -> Vec<FeatureStatistics> {
    let mut groups: Vec<(Feature, Vec<FeatureEvaluation>)> = Vec::new();

    for evaluation in evaluations {
        match groups
            .iter_mut()
            .find(|(feature, _)| feature.name == evaluation.feature.name)
        {
            Some((_, group)) => group.push(evaluation),
            None => groups.push((evaluation.feature.clone(), vec![evaluation])),
        }
    }

    groups
        .into_iter()
        .filter_map(|(feature, group)| {
            match FeatureStatistics::from_evaluations(feature, group) {
                Ok(stats) => Some(stats),
                Err(e) => {
                    info!("Skipping feature: {}", e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(name: &str) -> Feature {
        Feature::new(name, "description", "low", "high")
    }

    fn evaluation(name: &str, score: f64) -> FeatureEvaluation {
        FeatureEvaluation {
            feature: feature(name),
            explanation: String::new(),
            score,
        }
    }

    #[test]
    fn test_statistics_match_sample_formulas() {
        let scores = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let evaluations = scores.iter().map(|&s| evaluation("Warmth", s)).collect();

        let stats = FeatureStatistics::from_evaluations(feature("Warmth"), evaluations).unwrap();

        assert_eq!(stats.num_evaluations, 8);
        assert!((stats.average_score - 5.0).abs() < 1e-12);
        assert!((stats.variance - 32.0 / 7.0).abs() < 1e-12);
        assert!((stats.standard_deviation - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.min_score, 2.0);
        assert_eq!(stats.max_score, 9.0);
    }

    #[test]
    fn test_statistics_identical_scores_have_zero_spread() {
        let evaluations = vec![evaluation("Warmth", 6.0), evaluation("Warmth", 6.0)];
        let stats = FeatureStatistics::from_evaluations(feature("Warmth"), evaluations).unwrap();

        assert_eq!(stats.standard_deviation, 0.0);
        assert_eq!(stats.variance, 0.0);
    }

    #[test]
    fn test_statistics_reject_small_samples() {
        assert_eq!(
            FeatureStatistics::from_evaluations(feature("Warmth"), vec![]),
            Err(StatisticsError::NoEvaluations {
                feature: "Warmth".to_string()
            })
        );
        assert_eq!(
            FeatureStatistics::from_evaluations(feature("Warmth"), vec![evaluation("Warmth", 3.0)]),
            Err(StatisticsError::InsufficientEvaluations {
                feature: "Warmth".to_string(),
                count: 1
            })
        );
    }

    #[test]
    fn test_aggregate_groups_by_name_and_drops_singletons() {
        let evaluations = vec![
            evaluation("Warmth", 6.0),
            evaluation("Humor", 2.0),
            evaluation("Warmth", 8.0),
            evaluation("Formality", 5.0),
            evaluation("Humor", 4.0),
        ];

        let stats = aggregate_by_feature(evaluations);

        let names: Vec<&str> = stats.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Warmth", "Humor"]);
        assert!((stats[0].average_score - 7.0).abs() < 1e-12);
        assert!((stats[1].average_score - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_feature_names_are_case_sensitive() {
        let evaluations = vec![
            evaluation("warmth", 6.0),
            evaluation("Warmth", 8.0),
            evaluation("Warmth", 8.0),
        ];

        let stats = aggregate_by_feature(evaluations);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].name(), "Warmth");
    }

    #[test]
    fn test_feature_round_trips_through_json() {
        let json = r#"{
            "name": "Self-Reference",
            "description": "How often the speaker centers themselves",
            "description_min_value": "impersonal",
            "description_max_value": "first person throughout"
        }"#;

        let parsed: Feature = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.name, "Self-Reference");
        assert!(parsed.missing_fields().is_empty());

        let reparsed: Feature = serde_json::from_str(&serde_json::to_string(&parsed).unwrap()).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn test_missing_fields() {
        let feature = Feature::new("", "d", " ", "high");
        assert_eq!(feature.missing_fields(), vec!["name", "description_min_value"]);
    }
}
