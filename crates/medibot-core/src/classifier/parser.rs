//! Parsing of `URGENCY: <level> | SPECIALTY: <word>` responses

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Structured result of the fallback classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackAssessment {
    pub specialty: String,
    pub urgency: Option<String>,
}

static SPECIALTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SPECIALTY:\s*([^|\n]*)").unwrap());

static URGENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)URGENCY:\s*\[?([A-Za-z]+)").unwrap());

/// Extract the specialty label following `SPECIALTY:`.
///
/// Takes the text up to the next `|` or line end, keeps only alphanumeric
/// characters and spaces, and collapses whitespace. Returns `None` when the
/// field is missing or empty after cleaning.
pub fn parse_specialty(response: &str) -> Option<String> {
    let raw = SPECIALTY_RE.captures(response)?.get(1)?.as_str();
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let normalized = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Extract the urgency level following `URGENCY:`
pub fn parse_urgency(response: &str) -> Option<String> {
    URGENCY_RE
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse a full assessment; `None` unless a specialty is present
pub fn parse_assessment(response: &str) -> Option<FallbackAssessment> {
    let specialty = parse_specialty(response)?;
    Some(FallbackAssessment {
        specialty,
        urgency: parse_urgency(response),
    })
}
