use std::collections::HashMap;
use std::fmt::Write;

use crate::models::{Feature, FeatureStatistics};

/// Mean of the standard deviations, `None` for an empty list
pub fn average_standard_deviation(statistics: &[FeatureStatistics]) -> Option<f64> {
    if statistics.is_empty() {
        return None;
    }
    let total: f64 = statistics.iter().map(|s| s.standard_deviation).sum();
    Some(total / statistics.len() as f64)
}

/// Human-readable listing of per-feature statistics
pub fn render_statistics(statistics: &[FeatureStatistics]) -> String {
    let mut out = String::new();

    for stats in statistics {
        let feature = &stats.feature;
        let _ = writeln!(out, "Feature: {}", feature.name);
        let _ = writeln!(out, "- Description: {}", feature.description);
        let _ = writeln!(out, "- Description Min Value: {}", feature.description_min_value);
        let _ = writeln!(out, "- Description Max Value: {}", feature.description_max_value);
        let _ = writeln!(out, "- Average Score: {}", stats.average_score);
        let _ = writeln!(out, "- Standard Deviation: {}", stats.standard_deviation);
        let _ = writeln!(out, "- Variance: {}", stats.variance);
        out.push('\n');
    }

    match average_standard_deviation(statistics) {
        Some(average) => {
            let _ = writeln!(out, "Average Standard Deviation: {}", average);
        }
        None => out.push_str("No feature statistics\n"),
    }
    out.push_str(&"-".repeat(100));
    out.push('\n');

    out
}

/// Average score and standard deviation of one feature in one dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonCell {
    pub average_score: f64,
    pub standard_deviation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub feature: String,
    /// One cell per dataset, `None` where the feature has no statistics
    pub cells: Vec<Option<ComparisonCell>>,
}

/// One bank evaluated over several named datasets
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetComparison {
    pub datasets: Vec<String>,
    /// One row per bank feature, in bank order
    pub rows: Vec<ComparisonRow>,
}

impl DatasetComparison {
    pub fn build(features: &[Feature], results: &[(String, Vec<FeatureStatistics>)]) -> Self {
        let lookups: Vec<HashMap<&str, &FeatureStatistics>> = results
            .iter()
            .map(|(_, statistics)| statistics.iter().map(|s| (s.name(), s)).collect())
            .collect();

        let rows = features
            .iter()
            .map(|feature| ComparisonRow {
                feature: feature.name.clone(),
                cells: lookups
                    .iter()
                    .map(|lookup| {
                        lookup.get(feature.name.as_str()).map(|s| ComparisonCell {
                            average_score: s.average_score,
                            standard_deviation: s.standard_deviation,
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            datasets: results.iter().map(|(name, _)| name.clone()).collect(),
            rows,
        }
    }

    /// CSV with a "score" and "std" column per dataset, empty cells for gaps
    pub fn to_csv(&self) -> String {
        let mut header = vec!["Feature".to_string()];
        for dataset in &self.datasets {
            header.push(format!("{} score", dataset));
            header.push(format!("{} std", dataset));
        }

        let mut out = csv_line(&header);
        for row in &self.rows {
            let mut fields = vec![row.feature.clone()];
            for cell in &row.cells {
                match cell {
                    Some(cell) => {
                        fields.push(cell.average_score.to_string());
                        fields.push(cell.standard_deviation.to_string());
                    }
                    None => {
                        fields.push(String::new());
                        fields.push(String::new());
                    }
                }
            }
            out.push_str(&csv_line(&fields));
        }
        out
    }

    /// Per-feature block with one aligned line per dataset
    pub fn render_table(&self) -> String {
        let width = self.datasets.iter().map(|d| d.len()).max().unwrap_or(0);
        let mut out = String::new();

        for row in &self.rows {
            let _ = writeln!(out, "{}", row.feature);
            for (dataset, cell) in self.datasets.iter().zip(&row.cells) {
                match cell {
                    Some(cell) => {
                        let _ = writeln!(
                            out,
                            "{:<width$}:\tscore: {:>6.2}\tstd: {:>6.2}",
                            dataset,
                            cell.average_score,
                            cell.standard_deviation,
                            width = width
                        );
                    }
                    None => {
                        let _ = writeln!(out, "{:<width$}: N/A", dataset, width = width);
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}

fn csv_line(fields: &[String]) -> String {
    let mut line = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
    line.push_str("\r\n");
    line
}

/// Quote a field when it holds a separator, quote or line break
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureEvaluation;

    fn stats(name: &str, scores: &[f64]) -> FeatureStatistics {
        let feature = Feature::new(name, format!("{} description", name), "low", "high");
        let evaluations = scores
            .iter()
            .map(|&score| FeatureEvaluation {
                feature: feature.clone(),
                explanation: String::new(),
                score,
            })
            .collect();
        FeatureStatistics::from_evaluations(feature, evaluations).unwrap()
    }

    #[test]
    fn test_render_statistics_lists_features_and_average() {
        let report = render_statistics(&[stats("Calm", &[5.0, 5.0]), stats("Pace", &[4.0, 6.0])]);

        assert!(report.starts_with("Feature: Calm\n- Description: Calm description\n"));
        assert!(report.contains("- Description Min Value: low\n"));
        assert!(report.contains("- Average Score: 5\n"));
        assert!(report.contains("Average Standard Deviation: 0.7071067811865476\n"));
    }

    #[test]
    fn test_render_statistics_empty() {
        let report = render_statistics(&[]);

        assert!(report.starts_with("No feature statistics\n"));
        assert_eq!(average_standard_deviation(&[]), None);
    }

    #[test]
    fn test_comparison_keeps_bank_order_and_gaps() {
        let bank = vec![
            Feature::new("Pace", "d", "slow", "fast"),
            Feature::new("Calm", "d", "tense", "calm"),
        ];
        let results = vec![
            ("jess".to_string(), vec![stats("Calm", &[5.0, 5.0]), stats("Pace", &[4.0, 6.0])]),
            ("dara".to_string(), vec![stats("Calm", &[2.0, 4.0])]),
        ];

        let comparison = DatasetComparison::build(&bank, &results);

        assert_eq!(comparison.rows[0].feature, "Pace");
        assert_eq!(comparison.rows[0].cells[1], None);
        assert_eq!(
            comparison.rows[1].cells[1],
            Some(ComparisonCell {
                average_score: 3.0,
                standard_deviation: 2.0f64.sqrt(),
            })
        );

        let csv = comparison.to_csv();
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], "Feature,jess score,jess std,dara score,dara std");
        assert_eq!(lines[1], format!("Pace,5,{},,", 2.0f64.sqrt()));

        let table = comparison.render_table();
        assert!(table.contains("dara: N/A"));
        assert!(table.contains("jess:\tscore:   5.00\tstd:   0.00"));
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a, b"), "\"a, b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
