//! Question-asking dialogue driver
//!
//! Decides, from the transcript so far, whether the nurse should ask another
//! question or whether enough has been gathered to resolve a specialty.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::llm::TextGenerator;
use crate::transcript::Transcript;

/// Marker the model emits when it has no further questions
pub const STOP_SENTINEL: &str = "[STOP]";

/// Default cap on nurse questions per session
pub const DEFAULT_MAX_QUESTIONS: usize = 5;

/// Default sampling temperature for question generation
pub const QUESTION_TEMPERATURE: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverDecision {
    /// Ask the patient this question next
    Ask(String),
    /// Stop asking and resolve the transcript
    Stop,
}

impl DriverDecision {
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

#[async_trait]
pub trait DialogueDriver: Send + Sync {
    async fn next_turn(&self, transcript: &Transcript) -> DriverDecision;
}

/// Dialogue driver backed by a text generator
#[derive(Clone)]
pub struct LlmDialogueDriver {
    generator: Arc<dyn TextGenerator>,
    max_questions: usize,
    temperature: f32,
}

impl std::fmt::Debug for LlmDialogueDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmDialogueDriver")
            .field("max_questions", &self.max_questions)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl LlmDialogueDriver {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_questions: DEFAULT_MAX_QUESTIONS,
            temperature: QUESTION_TEMPERATURE,
        }
    }

    pub fn with_max_questions(mut self, max_questions: usize) -> Self {
        self.max_questions = max_questions;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_questions(&self) -> usize {
        self.max_questions
    }
}

#[async_trait]
impl DialogueDriver for LlmDialogueDriver {
    async fn next_turn(&self, transcript: &Transcript) -> DriverDecision {
        let asked = transcript.nurse_turns();
        if asked >= self.max_questions {
            debug!(asked, max = self.max_questions, "Question limit reached");
            return DriverDecision::Stop;
        }

        let response = match self
            .generator
            .generate(&question_prompt(transcript), self.temperature)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Question generation failed, stopping dialogue");
                return DriverDecision::Stop;
            }
        };

        interpret_response(&response)
    }
}

/// Map a raw model response to a decision
pub fn interpret_response(response: &str) -> DriverDecision {
    if response.contains(STOP_SENTINEL) {
        return DriverDecision::Stop;
    }
    let question = response.replace("Question:", "");
    let question = question.trim();
    if question.is_empty() {
        DriverDecision::Stop
    } else {
        DriverDecision::Ask(question.to_string())
    }
}

pub fn question_prompt(transcript: &Transcript) -> String {
    format!(
        "[INST] You are a medical triage assistant.

Conversation So Far:
{}

CRITICAL RULES:
1. NO REPETITION: Check the history. If the user already mentioned duration (e.g. \"2 days\"), DO NOT ask \"How long?\".
2. ACCEPT \"UNKNOWN\": If user says \"I don't know\" or \"I didn't measure\", DO NOT ask the same question again. Move to the next symptom immediately.
3. BE NATURAL BUT BRIEF: Use 1-2 sentences. No robotic checklists.
4. CHECKLIST:
   - If Fever: Ask about chills, body ache, or cold.
   - If Pain: Ask location and severity.
   - If done: Output {}.

Your Next Question: [/INST]",
        transcript.render(),
        STOP_SENTINEL
    )
}
