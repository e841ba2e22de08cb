//! How a symptom label is recognised inside patient text

/// Decides whether a symptom phrase occurs in a block of lowercase text.
///
/// Scoring never looks at the text directly, so tokenized or fuzzy
/// recognisers can replace [`SubstringMatcher`] without touching it.
pub trait SymptomMatcher: Send + Sync {
    fn matches(&self, symptom: &str, text: &str) -> bool;
}

/// Plain substring containment.
///
/// No word boundaries: "itch" matches inside "kitchen".
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl SymptomMatcher for SubstringMatcher {
    fn matches(&self, symptom: &str, text: &str) -> bool {
        !symptom.is_empty() && text.contains(symptom)
    }
}
