//! Error types for MediBot

use thiserror::Error;

/// Result type alias using MediBot's Error
pub type Result<T> = std::result::Result<T, Error>;

/// MediBot error types with helpful messages and suggestions
///
/// "Nothing matched" is never an error here: the graph, the fallback parser
/// and the doctor matchers report that as `None` or an empty list.
#[derive(Error, Debug)]
pub enum Error {
    // Knowledge graph errors (E001-E099)
    #[error("Malformed knowledge graph: disease '{0}' has no treated_by edge to any specialty")]
    MalformedGraph(String),

    #[error("Invalid symptom weight {weight} on edge '{symptom}' -> '{disease}' (must be in (0, 1])")]
    InvalidWeight {
        symptom: String,
        disease: String,
        weight: f64,
    },

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check that MEDIBOT_API_KEY or GROQ_API_KEY is set.")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    #[error("No suitable model: {0}")]
    NoSuitableModel(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    // Catalog errors (E200-E299)
    #[error("Doctor catalog could not be loaded: {0}")]
    CatalogLoad(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedGraph(_) => "E001",
            Self::InvalidWeight { .. } => "E002",
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::NoSuitableModel(_) => "E103",
            Self::EmbeddingFailed(_) => "E104",
            Self::CatalogLoad(_) => "E200",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Json(_) | Self::Io(_) => "E9999",
        }
    }

    /// Whether this error signals a broken invariant in reference data
    /// rather than a transient or environmental failure.
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::MalformedGraph(_) | Self::InvalidWeight { .. })
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::MalformedGraph(disease) => Some(format!(
                "add a treated_by edge from '{}' to a specialty",
                disease
            )),
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LLMError(_) => Some("medibot doctor".to_string()),
            Self::CatalogLoad(_) => Some("medibot config get catalog.path".to_string()),
            Self::ConfigError(_) => Some("medibot config list".to_string()),
            _ => None,
        }
    }
}
