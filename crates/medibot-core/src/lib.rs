//! MediBot Core Library
//!
//! This crate provides the core functionality for MediBot, including:
//! - Knowledge graph classifier (symptom → disease → specialty)
//! - Fallback specialty classifier over an LLM
//! - Doctor catalog with lexical and semantic matching
//! - Triage pipeline (graph, fallback, doctor lookup)
//! - Dialogue driver and multi-session triage service
//! - LLM integration (OpenAI-compatible API, Groq by default)
//! - Configuration

pub mod classifier;
pub mod config;
pub mod dialogue;
pub mod doctors;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod session;
pub mod transcript;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::classifier::SpecialtyClassifier;
    pub use crate::config::Config;
    pub use crate::doctors::{DoctorCatalog, DoctorMatcher, DoctorRecord, ScoredDoctor};
    pub use crate::error::{Error, Result};
    pub use crate::knowledge::KnowledgeGraph;
    pub use crate::pipeline::{ConfidenceSource, TriagePipeline, TriageResult};
    pub use crate::transcript::Transcript;
}
