//! Doctor catalog records

use serde::{Deserialize, Serialize};

/// One doctor in the catalog
///
/// Only `specialty` and `tags` take part in matching. Every other field in
/// the source JSON (name, contact details, availability...) is carried
/// through untouched in `profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorRecord {
    pub specialty: String,
    #[serde(default)]
    pub tags: String,
    #[serde(flatten)]
    pub profile: serde_json::Map<String, serde_json::Value>,
}

impl DoctorRecord {
    pub fn new(specialty: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            specialty: specialty.into(),
            tags: tags.into(),
            profile: serde_json::Map::new(),
        }
    }

    /// Attach an extra profile field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.profile.insert(key.into(), value.into());
        self
    }

    /// Text the matchers score against: `"<specialty> <tags>"`
    pub fn blob(&self) -> String {
        let tags = self.tags.trim();
        if tags.is_empty() {
            self.specialty.trim().to_string()
        } else {
            format!("{} {}", self.specialty.trim(), tags)
        }
    }

    /// Display name from the profile, if the catalog provides one
    pub fn name(&self) -> Option<&str> {
        self.profile.get("name").and_then(|v| v.as_str())
    }
}
