pub mod accumulate;
pub mod batching;
pub mod evaluate;
pub mod report;

pub use accumulate::*;
pub use batching::*;
pub use evaluate::*;
pub use report::*;

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use crate::llm::{FeatureDeduplicator, FeatureMerger, FeatureProposer, FeatureScorer};
    use crate::models::{word_count, Feature, FeatureEvaluation};

    pub fn feature(name: &str) -> Feature {
        Feature::new(name, format!("{} description", name), "low", "high")
    }

    /// In-memory collaborators with scripted behavior.
    ///
    /// Stable features always score 5. Unstable features alternate 0 and 10
    /// between scoring calls. Drifting features score the document's word
    /// count (capped at 10), so they are stable within a batch but not across
    /// batches. Documents containing a failure marker make the matching step
    /// fail, and documents containing a key of `marked_proposals` also get
    /// that feature proposed.
    #[derive(Default)]
    pub struct MockLab {
        pub proposals: Vec<Feature>,
        pub marked_proposals: Vec<(String, Feature)>,
        pub unstable: HashSet<String>,
        pub drifting: HashSet<String>,
        /// Names the deduplicator treats as already covered
        pub covered: HashSet<String>,
        pub failing_models: HashSet<String>,
        pub fail_merge: bool,
        pub fail_dedupe: bool,
        /// Scoring calls past this many fail
        pub score_budget: Option<usize>,
        pub propose_calls: AtomicUsize,
        pub merge_calls: AtomicUsize,
        pub dedupe_calls: AtomicUsize,
        pub score_calls: AtomicUsize,
        pub dedupe_banks: Mutex<Vec<Vec<String>>>,
    }

    pub const FAIL_PROPOSE: &str = "[fail-propose]";
    pub const FAIL_SCORE: &str = "[fail-score]";

    impl MockLab {
        pub fn proposing(names: &[&str]) -> Self {
            Self {
                proposals: names.iter().map(|n| feature(n)).collect(),
                ..Default::default()
            }
        }

        pub fn with_unstable(mut self, names: &[&str]) -> Self {
            self.unstable = names.iter().map(|n| n.to_string()).collect();
            self
        }

        pub fn with_drifting(mut self, names: &[&str]) -> Self {
            self.drifting = names.iter().map(|n| n.to_string()).collect();
            self
        }

        pub fn with_marked(mut self, marker: &str, name: &str) -> Self {
            self.marked_proposals.push((marker.to_string(), feature(name)));
            self
        }
    }

    #[async_trait]
    impl FeatureProposer for MockLab {
        async fn propose(&self, document: &str, model: &str) -> Result<Vec<Feature>> {
            self.propose_calls.fetch_add(1, Ordering::SeqCst);
            if document.contains(FAIL_PROPOSE) || self.failing_models.contains(model) {
                bail!("proposer unavailable for {}", model);
            }
            let marked = self
                .marked_proposals
                .iter()
                .filter(|(marker, _)| document.contains(marker.as_str()))
                .map(|(_, f)| f.clone());
            Ok(self.proposals.iter().cloned().chain(marked).collect())
        }
    }

    #[async_trait]
    impl FeatureMerger for MockLab {
        async fn merge(&self, features: &[Feature]) -> Result<Vec<Feature>> {
            self.merge_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_merge {
                bail!("merge unavailable");
            }
            let mut seen = HashSet::new();
            Ok(features
                .iter()
                .filter(|f| seen.insert(f.name.clone()))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl FeatureDeduplicator for MockLab {
        async fn dedupe(&self, bank: &[Feature], candidates: &[Feature]) -> Result<Vec<Feature>> {
            self.dedupe_calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut banks) = self.dedupe_banks.lock() {
                banks.push(bank.iter().map(|f| f.name.clone()).collect());
            }
            if self.fail_dedupe {
                bail!("dedupe unavailable");
            }
            Ok(candidates
                .iter()
                .filter(|c| !self.covered.contains(&c.name))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl FeatureScorer for MockLab {
        async fn score(
            &self,
            document: &str,
            features: &[Feature],
            model: &str,
        ) -> Result<Vec<FeatureEvaluation>> {
            let call = self.score_calls.fetch_add(1, Ordering::SeqCst);
            if document.contains(FAIL_SCORE) || self.failing_models.contains(model) {
                bail!("scorer unavailable for {}", model);
            }
            if self.score_budget.is_some_and(|budget| call >= budget) {
                bail!("scoring budget exhausted");
            }
            Ok(features
                .iter()
                .map(|f| {
                    let score = if self.drifting.contains(&f.name) {
                        word_count(document).min(10) as f64
                    } else if !self.unstable.contains(&f.name) {
                        5.0
                    } else if call % 2 == 0 {
                        0.0
                    } else {
                        10.0
                    };
                    FeatureEvaluation {
                        feature: f.clone(),
                        explanation: format!("call {}", call),
                        score,
                    }
                })
                .collect())
        }
    }
}
