//! Text embedders for semantic doctor matching

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::llm::LlmClient;

/// Maps a batch of texts into a shared vector space
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingFailed("embedder returned no vector".into()))
    }
}

/// Default dimensionality of [`HashingEmbedder`]
pub const DEFAULT_HASH_DIMENSIONS: usize = 256;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Offline embedder hashing character trigrams into a fixed-size vector.
///
/// Each lowercase token is padded with spaces and every trigram is hashed
/// (FNV-1a) into a bucket. The result is L2-normalised, so cosine
/// similarity reduces to a dot product. Deterministic across runs.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSIONS)
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let lowered = text.to_lowercase();

        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let padded: Vec<char> = format!(" {} ", token).chars().collect();
            for gram in padded.windows(3) {
                let bucket = (fnv1a(gram) % self.dimensions as u64) as usize;
                vector[bucket] += 1.0;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

fn fnv1a(chars: &[char]) -> u64 {
    let mut hash = FNV_OFFSET;
    let mut buf = [0u8; 4];
    for c in chars {
        for byte in c.encode_utf8(&mut buf).bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Embeddings from the LLM provider's `/embeddings` endpoint
#[derive(Debug, Clone)]
pub struct LlmEmbedder {
    client: Arc<LlmClient>,
    model: Option<String>,
}

impl LlmEmbedder {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client, model: None }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[async_trait]
impl Embedder for LlmEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self
            .client
            .embed_batch(texts.to_vec(), self.model.as_deref())
            .await?;
        if vectors.len() != texts.len() {
            return Err(Error::EmbeddingFailed(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}
