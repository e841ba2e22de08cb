//! Doctor catalog and specialty → doctor matching
//!
//! A free-text specialty label (possibly noisy) is resolved against a fixed
//! catalog by one of two interchangeable strategies:
//!
//! - [`LexicalMatcher`]: string similarity between the query and each
//!   record's `specialty + tags` blob
//! - [`SemanticMatcher`]: cosine similarity of embeddings, with a random
//!   pick among the leading candidates when one doctor is requested
//!
//! Both return an empty list, never an error, for an empty catalog or when
//! nothing clears the threshold.

mod catalog;
mod embedder;
mod lexical;
mod record;
mod semantic;
pub mod similarity;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use catalog::DoctorCatalog;
pub use embedder::{DEFAULT_HASH_DIMENSIONS, Embedder, HashingEmbedder, LlmEmbedder};
pub use lexical::LexicalMatcher;
pub use record::DoctorRecord;
pub use semantic::{DEFAULT_SEMANTIC_POOL, SemanticMatcher};

use crate::config::{EmbedderKind, MatcherConfig, MatcherMode};
use crate::error::{Error, Result};
use crate::llm::LlmClient;

/// A catalog record together with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoctor {
    pub record: DoctorRecord,
    pub score: f64,
}

/// Resolves a specialty label to catalog records
#[async_trait]
pub trait DoctorMatcher: Send + Sync {
    /// At most `top_k` records scoring at or above the matcher's threshold
    async fn search(&self, query: &str, top_k: usize) -> Vec<ScoredDoctor>;

    /// Short strategy name for logs and output
    fn name(&self) -> &'static str;
}

/// Build the matcher selected by configuration.
///
/// `client` is only needed for the remote embedder.
pub async fn build_matcher(
    config: &MatcherConfig,
    catalog: Arc<DoctorCatalog>,
    client: Option<Arc<LlmClient>>,
) -> Result<Arc<dyn DoctorMatcher>> {
    match config.mode {
        MatcherMode::Lexical => Ok(Arc::new(LexicalMatcher::from_config(catalog, config))),
        MatcherMode::Semantic => {
            let embedder: Arc<dyn Embedder> = match config.embedder {
                EmbedderKind::Hashing => Arc::new(HashingEmbedder::default()),
                EmbedderKind::Remote => {
                    let client = client.ok_or_else(|| {
                        Error::ConfigError(
                            "matcher.embedder = remote needs an API key (MEDIBOT_API_KEY or GROQ_API_KEY)".into(),
                        )
                    })?;
                    let model = client.config().embedding_model.clone();
                    Arc::new(LlmEmbedder::new(client).with_model(model))
                }
            };
            let matcher = SemanticMatcher::build(
                catalog,
                embedder,
                config.semantic_threshold,
                config.semantic_pool,
            )
            .await?;
            Ok(Arc::new(matcher))
        }
    }
}
