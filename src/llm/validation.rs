use std::collections::{HashMap, HashSet};

use crate::models::{Feature, FeatureEvaluation};

/// Lowest and highest score a rater may return
pub const SCORE_RANGE: (f64, f64) = (0.0, 10.0);

/// Items that passed a boundary check, plus a reason for each rejected one
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCheck<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<String>,
}

impl<T> BoundaryCheck<T> {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Reject features with blank required fields. Repeated names keep the first
/// occurrence and are not counted as rejections.
pub fn validate_features(features: Vec<Feature>) -> BoundaryCheck<Feature> {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    let mut seen = HashSet::new();

    for feature in features {
        let missing = feature.missing_fields();
        if !missing.is_empty() {
            rejected.push(format!(
                "Feature '{}' is missing {}",
                feature.name,
                missing.join(", ")
            ));
            continue;
        }
        if seen.insert(feature.name.clone()) {
            accepted.push(feature);
        }
    }

    BoundaryCheck { accepted, rejected }
}

/// Keep evaluations of requested features with an in-range score.
///
/// The feature echoed back by the rater is replaced with the requested one, so
/// statistics always carry the canonical definition.
pub fn validate_evaluations(
    evaluations: Vec<FeatureEvaluation>,
    requested: &[Feature],
) -> BoundaryCheck<FeatureEvaluation> {
    let by_name: HashMap<&str, &Feature> = requested.iter().map(|f| (f.name.as_str(), f)).collect();
    let (low, high) = SCORE_RANGE;

    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for mut evaluation in evaluations {
        let Some(canonical) = by_name.get(evaluation.feature.name.as_str()) else {
            rejected.push(format!(
                "Evaluation for unknown feature '{}'",
                evaluation.feature.name
            ));
            continue;
        };

        if !evaluation.score.is_finite() || evaluation.score < low || evaluation.score > high {
            rejected.push(format!(
                "Score {} for '{}' is outside [{}, {}]",
                evaluation.score, evaluation.feature.name, low, high
            ));
            continue;
        }

        evaluation.feature = (*canonical).clone();
        accepted.push(evaluation);
    }

    BoundaryCheck { accepted, rejected }
}

/// Keep only returned features that were among the candidates, in candidate form
pub fn restrict_to_candidates(returned: Vec<Feature>, candidates: &[Feature]) -> BoundaryCheck<Feature> {
    let returned_names: HashSet<String> = returned.iter().map(|f| f.name.clone()).collect();
    let candidate_names: HashSet<&str> = candidates.iter().map(|f| f.name.as_str()).collect();

    let rejected = returned
        .iter()
        .filter(|f| !candidate_names.contains(f.name.as_str()))
        .map(|f| format!("Feature '{}' was not a candidate", f.name))
        .collect();

    let accepted = candidates
        .iter()
        .filter(|c| returned_names.contains(&c.name))
        .cloned()
        .collect();

    BoundaryCheck { accepted, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(name: &str) -> Feature {
        Feature::new(name, "desc", "low", "high")
    }

    fn evaluation(name: &str, score: f64) -> FeatureEvaluation {
        FeatureEvaluation {
            feature: Feature::new(name, "rater's paraphrase", "", ""),
            explanation: "because".to_string(),
            score,
        }
    }

    #[test]
    fn test_validate_features_rejects_blank_and_collapses_repeats() {
        let check = validate_features(vec![
            feature("Warmth"),
            Feature::new("Humor", "", "dry", "playful"),
            feature("Warmth"),
            feature("Pace"),
        ]);

        let names: Vec<&str> = check.accepted.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Warmth", "Pace"]);
        assert_eq!(check.rejected.len(), 1);
        assert!(check.rejected[0].contains("description"));
    }

    #[test]
    fn test_validate_evaluations_canonicalizes_and_filters() {
        let requested = vec![feature("Warmth"), feature("Pace")];

        let check = validate_evaluations(
            vec![
                evaluation("Warmth", 7.0),
                evaluation("Unknown", 5.0),
                evaluation("Pace", 11.0),
                evaluation("Pace", f64::NAN),
                evaluation("Pace", 0.0),
            ],
            &requested,
        );

        assert_eq!(check.accepted.len(), 2);
        assert_eq!(check.accepted[0].feature, requested[0]);
        assert_eq!(check.accepted[1].feature, requested[1]);
        assert_eq!(check.rejected.len(), 3);
        assert!(!check.is_clean());
    }

    #[test]
    fn test_restrict_to_candidates() {
        let candidates = vec![feature("Warmth"), feature("Pace"), feature("Humor")];
        let returned = vec![
            Feature::new("Humor", "reworded", "x", "y"),
            feature("Invented"),
            feature("Warmth"),
        ];

        let check = restrict_to_candidates(returned, &candidates);

        assert_eq!(check.accepted, vec![feature("Warmth"), feature("Humor")]);
        assert_eq!(check.rejected, vec!["Feature 'Invented' was not a candidate".to_string()]);
    }
}
