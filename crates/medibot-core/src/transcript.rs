//! Conversation transcript for one triage session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who said an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Patient,
    Nurse,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Patient => "Patient",
            Speaker::Nurse => "Nurse",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single labeled line of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Utterance {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// Parse a `Patient: ...` / `Nurse: ...` line. Unlabeled lines are
    /// attributed to the patient.
    pub fn parse_line(line: &str) -> Self {
        let trimmed = line.trim();
        for speaker in [Speaker::Patient, Speaker::Nurse] {
            let labeled = trimmed
                .strip_prefix(speaker.label())
                .and_then(|rest| rest.strip_prefix(':'));
            if let Some(text) = labeled {
                return Self::new(speaker, text.trim());
            }
        }
        Self::new(Speaker::Patient, trimmed)
    }
}

impl std::fmt::Display for Utterance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.speaker, self.text)
    }
}

/// Ordered, append-only record of a triage conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    utterances: Vec<Utterance>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a transcript from pre-labeled lines
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            utterances: lines
                .into_iter()
                .map(|line| Utterance::parse_line(line.as_ref()))
                .collect(),
        }
    }

    pub fn push_patient(&mut self, text: impl Into<String>) {
        self.utterances.push(Utterance::new(Speaker::Patient, text));
    }

    pub fn push_nurse(&mut self, text: impl Into<String>) {
        self.utterances.push(Utterance::new(Speaker::Nurse, text));
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    pub fn nurse_turns(&self) -> usize {
        self.utterances
            .iter()
            .filter(|u| u.speaker == Speaker::Nurse)
            .count()
    }

    /// Newline-joined labeled lines, as shown to the language model
    pub fn render(&self) -> String {
        self.utterances
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Space-joined, lowercased text scanned by the knowledge graph
    pub fn flatten(&self) -> String {
        self.utterances
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    pub fn clear(&mut self) {
        self.utterances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_and_flatten() {
        let mut transcript = Transcript::new();
        transcript.push_patient("I have Chest Pain");
        transcript.push_nurse("Since when?");
        transcript.push_patient("Two days");

        assert_eq!(
            transcript.render(),
            "Patient: I have Chest Pain\nNurse: Since when?\nPatient: Two days"
        );
        assert_eq!(
            transcript.flatten(),
            "patient: i have chest pain nurse: since when? patient: two days"
        );
        assert_eq!(transcript.nurse_turns(), 1);
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn test_from_lines_parses_labels() {
        let transcript = Transcript::from_lines([
            "Patient: my knee hurts",
            "Nurse: How bad is it?",
            "it is bad",
        ]);

        let speakers: Vec<Speaker> = transcript.utterances().iter().map(|u| u.speaker).collect();
        assert_eq!(speakers, vec![Speaker::Patient, Speaker::Nurse, Speaker::Patient]);
        assert_eq!(transcript.utterances()[0].text, "my knee hurts");
        assert_eq!(transcript.utterances()[2].text, "it is bad");
    }

    #[test]
    fn test_clear() {
        let mut transcript = Transcript::from_lines(["Patient: fever"]);
        assert!(!transcript.is_empty());
        transcript.clear();
        assert!(transcript.is_empty());
        assert_eq!(transcript.flatten(), "");
    }
}
