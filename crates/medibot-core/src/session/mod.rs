//! Multi-session triage conversations
//!
//! [`TriageService`] keeps one transcript per caller-supplied session id,
//! asks the dialogue driver for the next question after each patient
//! message, and runs the pipeline once the driver stops. A session's
//! transcript is cleared after its diagnosis. Each session sits behind its
//! own lock, held for the whole turn.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use crate::dialogue::{DialogueDriver, DriverDecision};
use crate::error::{Error, Result};
use crate::pipeline::{TriagePipeline, TriageResult};
use crate::transcript::Transcript;

/// Next step offered to the patient after a diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// A matching doctor is available
    VideoCall,
    /// No doctor matched; book an in-person visit
    ScheduleVisit,
}

impl RecommendedAction {
    pub fn for_result(result: &TriageResult) -> Self {
        if result.has_doctor() {
            Self::VideoCall
        } else {
            Self::ScheduleVisit
        }
    }
}

/// Reply to one patient message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionReply {
    Question {
        message: String,
    },
    Diagnosis {
        message: String,
        result: TriageResult,
        recommended_action: RecommendedAction,
    },
}

/// Message sent with every diagnosis
pub const DIAGNOSIS_MESSAGE: &str = "Diagnosis complete. I have identified the specialist.";

type SessionSlot = Arc<Mutex<Transcript>>;

pub struct TriageService {
    pipeline: TriagePipeline,
    driver: Arc<dyn DialogueDriver>,
    sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl TriageService {
    pub fn new(pipeline: TriagePipeline, driver: Arc<dyn DialogueDriver>) -> Self {
        Self {
            pipeline,
            driver,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn pipeline(&self) -> &TriagePipeline {
        &self.pipeline
    }

    /// Record a patient message and produce the next question or a diagnosis
    ///
    /// Turns on the same session run one at a time. A message that arrives
    /// while a diagnosis is in progress opens a fresh session once it ends.
    pub async fn handle_message(&self, session_id: &str, text: &str) -> Result<SessionReply> {
        let text = text.trim();
        if session_id.trim().is_empty() {
            return Err(Error::InvalidInput("session id must not be empty".into()));
        }
        if text.is_empty() {
            return Err(Error::InvalidInput("message must not be empty".into()));
        }

        let (slot, mut transcript) = self.lock_session(session_id).await;
        transcript.push_patient(text);

        match self.driver.next_turn(&transcript).await {
            DriverDecision::Ask(question) => {
                debug!(session_id, turn = transcript.nurse_turns() + 1, "Asking follow-up");
                transcript.push_nurse(question.clone());
                if !self.is_current(session_id, &slot).await {
                    debug!(session_id, "Session reset during turn; question not recorded");
                }
                Ok(SessionReply::Question { message: question })
            }
            DriverDecision::Stop => {
                let result = self.pipeline.resolve(&transcript).await?;
                transcript.clear();
                self.remove_if_current(session_id, &slot).await;
                let recommended_action = RecommendedAction::for_result(&result);
                info!(
                    session_id,
                    specialty = %result.specialty,
                    action = ?recommended_action,
                    "Session diagnosed"
                );
                Ok(SessionReply::Diagnosis {
                    message: DIAGNOSIS_MESSAGE.to_string(),
                    result,
                    recommended_action,
                })
            }
        }
    }

    /// Lock the live slot for a session, creating it when absent
    async fn lock_session(&self, session_id: &str) -> (SessionSlot, OwnedMutexGuard<Transcript>) {
        loop {
            let slot = {
                let mut sessions = self.sessions.write().await;
                sessions.entry(session_id.to_string()).or_default().clone()
            };
            let guard = slot.clone().lock_owned().await;
            // The slot may have been diagnosed or reset while we waited
            if self.is_current(session_id, &slot).await {
                return (slot, guard);
            }
        }
    }

    async fn is_current(&self, session_id: &str, slot: &SessionSlot) -> bool {
        self.sessions
            .read()
            .await
            .get(session_id)
            .is_some_and(|live| Arc::ptr_eq(live, slot))
    }

    async fn remove_if_current(&self, session_id: &str, slot: &SessionSlot) {
        let mut sessions = self.sessions.write().await;
        if sessions.get(session_id).is_some_and(|live| Arc::ptr_eq(live, slot)) {
            sessions.remove(session_id);
        }
    }

    /// Drop a session's transcript; returns whether it existed
    pub async fn reset(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn transcript(&self, session_id: &str) -> Option<Transcript> {
        let slot = self.sessions.read().await.get(session_id).cloned()?;
        let transcript = slot.lock().await.clone();
        Some(transcript)
    }
}
