//! Fallback specialty classifier
//!
//! Used only when the knowledge graph finds no symptom in the transcript.
//! A text generator is asked for `URGENCY: <level> | SPECIALTY: <word>`;
//! anything it returns that does not parse, and any failure to call it,
//! yields `None` rather than an error.

mod parser;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm::TextGenerator;
use crate::transcript::Transcript;

pub use parser::{FallbackAssessment, parse_assessment, parse_specialty, parse_urgency};

/// Default sampling temperature for diagnosis prompts
pub const DIAGNOSIS_TEMPERATURE: f32 = 0.1;

/// Asks a text generator for a specialty and parses its answer.
#[derive(Clone)]
pub struct SpecialtyClassifier {
    generator: Arc<dyn TextGenerator>,
    temperature: f32,
}

impl std::fmt::Debug for SpecialtyClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecialtyClassifier")
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl SpecialtyClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            temperature: DIAGNOSIS_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Classify a transcript; `None` on generator failure or unparseable output
    pub async fn classify(&self, transcript: &Transcript) -> Option<FallbackAssessment> {
        let prompt = diagnosis_prompt(transcript);

        let response = match self.generator.generate(&prompt, self.temperature).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, code = e.code(), "Fallback classifier unavailable");
                return None;
            }
        };

        match parse_assessment(&response) {
            Some(assessment) => {
                debug!(
                    specialty = %assessment.specialty,
                    urgency = assessment.urgency.as_deref().unwrap_or("-"),
                    "Fallback classifier answered"
                );
                Some(assessment)
            }
            None => {
                warn!(response = %response, "Fallback classifier response had no SPECIALTY field");
                None
            }
        }
    }
}

/// Prompt asking for urgency and a one-word specialty
pub fn diagnosis_prompt(transcript: &Transcript) -> String {
    format!(
        "[INST] Diagnose Patient.
History: {}

RULES:
- Chest pain -> Cardiology
- Headache/Migraine -> Neurology
- Joint/Bone pain -> Orthopedics
- Skin/Rash -> Dermatology
- Fever/Cold -> General Medicine
- Tooth -> Dentistry

Format: URGENCY: [Level] | SPECIALTY: [One Word] [/INST]",
        transcript.render()
    )
}
