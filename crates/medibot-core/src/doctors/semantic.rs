//! Embedding-based doctor matching

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use super::catalog::DoctorCatalog;
use super::embedder::Embedder;
use super::similarity::cosine_similarity;
use super::{DoctorMatcher, ScoredDoctor};
use crate::error::{Error, Result};

/// Default number of leading candidates a single pick is drawn from
pub const DEFAULT_SEMANTIC_POOL: usize = 3;

/// Cosine-similarity matcher over catalog embeddings computed at build time.
///
/// A request for exactly one doctor is answered with a uniformly random
/// member of the top `pool` candidates, so a popular specialty does not
/// always route to the same person.
pub struct SemanticMatcher {
    catalog: Arc<DoctorCatalog>,
    embedder: Arc<dyn Embedder>,
    vectors: Vec<Vec<f32>>,
    threshold: f32,
    pool: usize,
}

impl std::fmt::Debug for SemanticMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticMatcher")
            .field("doctors", &self.catalog.len())
            .field("threshold", &self.threshold)
            .field("pool", &self.pool)
            .finish()
    }
}

impl SemanticMatcher {
    /// Embed every catalog blob up front
    pub async fn build(
        catalog: Arc<DoctorCatalog>,
        embedder: Arc<dyn Embedder>,
        threshold: f32,
        pool: usize,
    ) -> Result<Self> {
        let blobs: Vec<String> = catalog.iter().map(|r| r.blob()).collect();
        let vectors = if blobs.is_empty() {
            Vec::new()
        } else {
            embedder.embed(&blobs).await?
        };
        if vectors.len() != blobs.len() {
            return Err(Error::EmbeddingFailed(format!(
                "catalog has {} doctors but {} vectors were returned",
                blobs.len(),
                vectors.len()
            )));
        }
        info!(doctors = vectors.len(), threshold, pool, "Built semantic doctor index");

        Ok(Self {
            catalog,
            embedder,
            vectors,
            threshold,
            pool: pool.max(1),
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn pool(&self) -> usize {
        self.pool
    }

    /// Every record above the threshold for an embedded query, best first
    pub fn rank(&self, query_vector: &[f32]) -> Vec<ScoredDoctor> {
        let mut ranked: Vec<ScoredDoctor> = self
            .catalog
            .iter()
            .zip(&self.vectors)
            .map(|(record, vector)| ScoredDoctor {
                score: f64::from(cosine_similarity(query_vector, vector)),
                record: record.clone(),
            })
            .filter(|scored| scored.score > f64::from(self.threshold))
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}

fn pick_one(mut candidates: Vec<ScoredDoctor>) -> Vec<ScoredDoctor> {
    let mut rng = rand::thread_rng();
    match candidates.choose(&mut rng) {
        Some(choice) => vec![choice.clone()],
        None => {
            candidates.clear();
            candidates
        }
    }
}

#[async_trait]
impl DoctorMatcher for SemanticMatcher {
    async fn search(&self, query: &str, top_k: usize) -> Vec<ScoredDoctor> {
        if top_k == 0 || self.catalog.is_empty() {
            return Vec::new();
        }

        let query_vector = match self.embedder.embed_one(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(query, error = %e, "Could not embed query, returning no doctors");
                return Vec::new();
            }
        };

        let mut ranked = self.rank(&query_vector);
        debug!(
            query,
            hits = ranked.len(),
            best = ranked.first().map(|s| s.score).unwrap_or(0.0),
            "Semantic doctor search"
        );

        if top_k == 1 {
            ranked.truncate(self.pool);
            pick_one(ranked)
        } else {
            ranked.truncate(top_k);
            ranked
        }
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}
