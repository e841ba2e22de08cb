//! Specialty resolution pipeline
//!
//! ```text
//! transcript ─▶ knowledge graph ──match──▶ specialty ─▶ doctor matcher ─▶ TriageResult
//!                     │                        ▲
//!                  no match                    │
//!                     └──▶ fallback classifier ┘ (default specialty if it fails)
//! ```
//!
//! The pipeline holds only read-only collaborators and is a function of the
//! transcript passed to [`TriagePipeline::resolve`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::SpecialtyClassifier;
use crate::config::DEFAULT_SPECIALTY;
use crate::doctors::{DoctorMatcher, ScoredDoctor};
use crate::error::Result;
use crate::knowledge::{KnowledgeGraph, SpecialtyMatch};
use crate::transcript::Transcript;

/// Which stage produced the final specialty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceSource {
    Graph,
    Fallback,
}

impl std::fmt::Display for ConfidenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Graph => write!(f, "graph"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Outcome of one resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageResult {
    pub specialty: String,
    pub doctor: Option<ScoredDoctor>,
    pub confidence_source: ConfidenceSource,
    /// Set when neither the graph nor the fallback classifier produced a label
    pub defaulted: bool,
    /// Urgency reported by the fallback classifier, if it ran
    pub urgency: Option<String>,
    /// Full graph scoring, kept for explanation
    pub graph: SpecialtyMatch,
}

impl TriageResult {
    pub fn has_doctor(&self) -> bool {
        self.doctor.is_some()
    }
}

/// Graph first, fallback classifier second, then doctor lookup
#[derive(Clone)]
pub struct TriagePipeline {
    graph: Arc<KnowledgeGraph>,
    fallback: Option<SpecialtyClassifier>,
    matcher: Arc<dyn DoctorMatcher>,
    default_specialty: String,
}

impl std::fmt::Debug for TriagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriagePipeline")
            .field("graph", &self.graph)
            .field("fallback", &self.fallback.is_some())
            .field("matcher", &self.matcher.name())
            .field("default_specialty", &self.default_specialty)
            .finish()
    }
}

impl TriagePipeline {
    pub fn new(graph: Arc<KnowledgeGraph>, matcher: Arc<dyn DoctorMatcher>) -> Self {
        Self {
            graph,
            fallback: None,
            matcher,
            default_specialty: DEFAULT_SPECIALTY.to_string(),
        }
    }

    pub fn with_fallback(mut self, classifier: SpecialtyClassifier) -> Self {
        self.fallback = Some(classifier);
        self
    }

    pub fn with_default_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.default_specialty = specialty.into();
        self
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn matcher(&self) -> &dyn DoctorMatcher {
        self.matcher.as_ref()
    }

    pub fn default_specialty(&self) -> &str {
        &self.default_specialty
    }

    /// Resolve a transcript to a specialty and, if one matches, a doctor.
    ///
    /// Always yields a specialty. The only error is a malformed knowledge
    /// graph; collaborator failures degrade to the default specialty or to
    /// `doctor: None`.
    pub async fn resolve(&self, transcript: &Transcript) -> Result<TriageResult> {
        let text = transcript.flatten();
        let graph = self.graph.find_specialty(&text)?;

        let (specialty, confidence_source, urgency, defaulted) = match &graph.specialty {
            Some(specialty) => (specialty.clone(), ConfidenceSource::Graph, None, false),
            None => {
                let assessment = match &self.fallback {
                    Some(classifier) => classifier.classify(transcript).await,
                    None => {
                        debug!("No fallback classifier configured");
                        None
                    }
                };
                match assessment {
                    Some(a) => (a.specialty, ConfidenceSource::Fallback, a.urgency, false),
                    None => {
                        warn!(
                            default = %self.default_specialty,
                            "No specialty from graph or fallback, using default"
                        );
                        (self.default_specialty.clone(), ConfidenceSource::Fallback, None, true)
                    }
                }
            }
        };

        let doctor = self.matcher.search(&specialty, 1).await.into_iter().next();

        info!(
            specialty = %specialty,
            source = %confidence_source,
            graph_score = graph.score,
            doctor = doctor
                .as_ref()
                .and_then(|d| d.record.name())
                .unwrap_or("-"),
            "Triage resolved"
        );

        Ok(TriageResult {
            specialty,
            doctor,
            confidence_source,
            defaulted,
            urgency,
            graph,
        })
    }
}
