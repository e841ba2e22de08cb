//! String-similarity doctor matching

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::catalog::DoctorCatalog;
use super::similarity;
use super::{DoctorMatcher, ScoredDoctor};
use crate::config::{LexicalMetric, MatcherConfig};

/// Scores every record's blob against the query with a string metric
#[derive(Debug, Clone)]
pub struct LexicalMatcher {
    catalog: Arc<DoctorCatalog>,
    metric: LexicalMetric,
    threshold: f64,
}

impl LexicalMatcher {
    pub fn new(catalog: Arc<DoctorCatalog>, metric: LexicalMetric, threshold: f64) -> Self {
        Self {
            catalog,
            metric,
            threshold,
        }
    }

    pub fn from_config(catalog: Arc<DoctorCatalog>, config: &MatcherConfig) -> Self {
        Self::new(catalog, config.lexical_metric, config.lexical_threshold())
    }

    pub fn metric(&self) -> LexicalMetric {
        self.metric
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, query: &str, blob: &str) -> f64 {
        match self.metric {
            LexicalMetric::Dice => similarity::dice(query, blob),
            LexicalMetric::Partial => similarity::partial(query, blob),
        }
    }

    /// Every record above the threshold, best first
    pub fn rank(&self, query: &str) -> Vec<ScoredDoctor> {
        let mut ranked: Vec<ScoredDoctor> = self
            .catalog
            .iter()
            .map(|record| ScoredDoctor {
                score: self.score(query, &record.blob()),
                record: record.clone(),
            })
            .filter(|scored| scored.score > self.threshold)
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}

#[async_trait]
impl DoctorMatcher for LexicalMatcher {
    async fn search(&self, query: &str, top_k: usize) -> Vec<ScoredDoctor> {
        if top_k == 0 || self.catalog.is_empty() {
            return Vec::new();
        }
        let mut ranked = self.rank(query);
        ranked.truncate(top_k);
        debug!(
            query,
            metric = %self.metric,
            hits = ranked.len(),
            best = ranked.first().map(|s| s.score).unwrap_or(0.0),
            "Lexical doctor search"
        );
        ranked
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}
