//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Default Groq OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Specialty assigned when neither the graph nor the fallback classifier produce one
pub const DEFAULT_SPECIALTY: &str = "General Medicine";

/// MediBot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub dialogue: DialogueConfig,
    pub matcher: MatcherConfig,
    pub catalog: CatalogConfig,
    pub triage: TriageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
    pub fallback_models: Vec<String>,
    pub max_tokens: usize,
    pub timeout_secs: u64,
    /// Sampling temperature for follow-up questions
    pub question_temperature: f32,
    /// Sampling temperature for the fallback specialty classifier
    pub diagnosis_temperature: f32,
    pub embedding_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Nurse turns after which the dialogue stops regardless of the model
    pub max_questions: usize,
}

/// Doctor matching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherMode {
    Lexical,
    Semantic,
}

impl std::str::FromStr for MatcherMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "lexical" => Ok(Self::Lexical),
            "semantic" => Ok(Self::Semantic),
            _ => Err(anyhow!("Invalid matcher mode: {}. Valid options: lexical, semantic", s)),
        }
    }
}

impl std::fmt::Display for MatcherMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::Semantic => write!(f, "semantic"),
        }
    }
}

/// String similarity metric used by lexical matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LexicalMetric {
    /// Sørensen–Dice over character bigrams of the token-sorted strings
    Dice,
    /// Best normalized Levenshtein over query-sized windows of the blob
    Partial,
}

impl std::str::FromStr for LexicalMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "dice" => Ok(Self::Dice),
            "partial" => Ok(Self::Partial),
            _ => Err(anyhow!("Invalid lexical metric: {}. Valid options: dice, partial", s)),
        }
    }
}

impl std::fmt::Display for LexicalMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dice => write!(f, "dice"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// Source of vectors for semantic matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Local character-trigram feature hashing
    Hashing,
    /// Embeddings endpoint of the configured LLM provider
    Remote,
}

impl std::str::FromStr for EmbedderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "hashing" => Ok(Self::Hashing),
            "remote" => Ok(Self::Remote),
            _ => Err(anyhow!("Invalid embedder: {}. Valid options: hashing, remote", s)),
        }
    }
}

impl std::fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hashing => write!(f, "hashing"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub mode: MatcherMode,
    pub lexical_metric: LexicalMetric,
    /// Minimum Dice score (0..1). Dice penalises long tag blobs, so the cutoff is low.
    pub dice_threshold: f64,
    /// Minimum partial score (0..1). Any shared substring scores high, so the cutoff is high.
    pub partial_threshold: f64,
    /// Minimum cosine similarity for semantic matching
    pub semantic_threshold: f32,
    /// Number of top semantic candidates a single-result search picks from
    pub semantic_pool: usize,
    pub embedder: EmbedderKind,
}

impl MatcherConfig {
    /// Cutoff that applies to the configured lexical metric
    pub fn lexical_threshold(&self) -> f64 {
        match self.lexical_metric {
            LexicalMetric::Dice => self.dice_threshold,
            LexicalMetric::Partial => self.partial_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub default_specialty: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: "llama-3.3-70b-versatile".to_string(),
            fallback_models: vec!["llama-3.1-8b-instant".to_string()],
            max_tokens: 80,
            timeout_secs: 30,
            question_temperature: 0.5,
            diagnosis_temperature: 0.1,
            embedding_model: "nomic-embed-text-v1.5".to_string(),
        }
    }
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self { max_questions: 5 }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            mode: MatcherMode::Lexical,
            lexical_metric: LexicalMetric::Dice,
            dice_threshold: 0.30,
            partial_threshold: 0.75,
            semantic_threshold: 0.55,
            semantic_pool: 3,
            embedder: EmbedderKind::Hashing,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data").join("doctors_db.json"),
        }
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            default_specialty: DEFAULT_SPECIALTY.to_string(),
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("MEDIBOT_API_KEY")
            .or_else(|_| env::var("GROQ_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty()))
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| opt.map(|key| redact(&key)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

fn redact(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        "***".to_string()
    } else {
        let tail: String = key.chars().skip(count - 4).collect();
        format!("***{}", tail)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("MEDIBOT_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("medibot")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or fall back to defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config = Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;

        for (name, value) in [
            ("matcher.dice_threshold", self.matcher.dice_threshold),
            ("matcher.partial_threshold", self.matcher.partial_threshold),
            ("matcher.semantic_threshold", self.matcher.semantic_threshold as f64),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be between 0.0 and 1.0", name));
            }
        }
        if self.matcher.semantic_pool == 0 {
            return Err(anyhow!("matcher.semantic_pool must be at least 1"));
        }
        if self.dialogue.max_questions == 0 {
            return Err(anyhow!("dialogue.max_questions must be at least 1"));
        }
        if self.triage.default_specialty.trim().is_empty() {
            return Err(anyhow!("triage.default_specialty must not be empty"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // LLM settings
            "llm.base_url" => Ok(self.llm.base_url.clone()),
            "llm.default_model" => Ok(self.llm.default_model.clone()),
            "llm.fallback_models" => Ok(self.llm.fallback_models.join(", ")),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),
            "llm.question_temperature" => Ok(self.llm.question_temperature.to_string()),
            "llm.diagnosis_temperature" => Ok(self.llm.diagnosis_temperature.to_string()),
            "llm.embedding_model" => Ok(self.llm.embedding_model.clone()),

            // Dialogue settings
            "dialogue.max_questions" => Ok(self.dialogue.max_questions.to_string()),

            // Matcher settings
            "matcher.mode" => Ok(self.matcher.mode.to_string()),
            "matcher.lexical_metric" => Ok(self.matcher.lexical_metric.to_string()),
            "matcher.dice_threshold" => Ok(self.matcher.dice_threshold.to_string()),
            "matcher.partial_threshold" => Ok(self.matcher.partial_threshold.to_string()),
            "matcher.semantic_threshold" => Ok(self.matcher.semantic_threshold.to_string()),
            "matcher.semantic_pool" => Ok(self.matcher.semantic_pool.to_string()),
            "matcher.embedder" => Ok(self.matcher.embedder.to_string()),

            // Catalog / triage settings
            "catalog.path" => Ok(self.catalog.path.display().to_string()),
            "triage.default_specialty" => Ok(self.triage.default_specialty.clone()),

            // API key (special handling - show redacted)
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok("(not set - use MEDIBOT_API_KEY or GROQ_API_KEY env var)".to_string()),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `medibot config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "llm.base_url" => {
                self.llm.base_url = value.trim_end_matches('/').to_string();
            }
            "llm.default_model" => {
                self.llm.default_model = value.to_string();
            }
            "llm.fallback_models" => {
                self.llm.fallback_models = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "llm.max_tokens" => {
                self.llm.max_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }
            "llm.question_temperature" => {
                self.llm.question_temperature = parse_temperature(value)?;
            }
            "llm.diagnosis_temperature" => {
                self.llm.diagnosis_temperature = parse_temperature(value)?;
            }
            "llm.embedding_model" => {
                self.llm.embedding_model = value.to_string();
            }

            "dialogue.max_questions" => {
                let max: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_questions value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("max_questions must be at least 1"));
                }
                self.dialogue.max_questions = max;
            }

            "matcher.mode" => {
                self.matcher.mode = value.parse()?;
            }
            "matcher.lexical_metric" => {
                self.matcher.lexical_metric = value.parse()?;
            }
            "matcher.dice_threshold" => {
                self.matcher.dice_threshold = parse_unit_interval(key, value)?;
            }
            "matcher.partial_threshold" => {
                self.matcher.partial_threshold = parse_unit_interval(key, value)?;
            }
            "matcher.semantic_threshold" => {
                self.matcher.semantic_threshold = parse_unit_interval(key, value)? as f32;
            }
            "matcher.semantic_pool" => {
                let pool: usize = value
                    .parse()
                    .with_context(|| format!("Invalid semantic_pool value: {}", value))?;
                if pool == 0 {
                    return Err(anyhow!("semantic_pool must be at least 1"));
                }
                self.matcher.semantic_pool = pool;
            }
            "matcher.embedder" => {
                self.matcher.embedder = value.parse()?;
            }

            "catalog.path" => {
                self.catalog.path = PathBuf::from(value);
            }
            "triage.default_specialty" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("default_specialty must not be empty"));
                }
                self.triage.default_specialty = value.trim().to_string();
            }

            // API key cannot be set via config
            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the MEDIBOT_API_KEY or GROQ_API_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `medibot config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "llm.base_url",
            "llm.default_model",
            "llm.fallback_models",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.question_temperature",
            "llm.diagnosis_temperature",
            "llm.embedding_model",
            "llm.api_key",
            "dialogue.max_questions",
            "matcher.mode",
            "matcher.lexical_metric",
            "matcher.dice_threshold",
            "matcher.partial_threshold",
            "matcher.semantic_threshold",
            "matcher.semantic_pool",
            "matcher.embedder",
            "catalog.path",
            "triage.default_specialty",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn parse_temperature(value: &str) -> anyhow::Result<f32> {
    let temp: f32 = value
        .parse()
        .with_context(|| format!("Invalid temperature value: {}", value))?;
    if !(0.0..=2.0).contains(&temp) {
        return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
    }
    Ok(temp)
}

fn parse_unit_interval(key: &str, value: &str) -> anyhow::Result<f64> {
    let parsed: f64 = value
        .parse()
        .with_context(|| format!("Invalid {} value: {}", key, value))?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(anyhow!("{} must be between 0.0 and 1.0", key));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.llm.default_model, "llama-3.3-70b-versatile");
        assert_eq!(config.llm.max_tokens, 80);
        assert_eq!(config.llm.question_temperature, 0.5);
        assert_eq!(config.llm.diagnosis_temperature, 0.1);

        assert_eq!(config.dialogue.max_questions, 5);

        assert_eq!(config.matcher.mode, MatcherMode::Lexical);
        assert_eq!(config.matcher.lexical_metric, LexicalMetric::Dice);
        assert_eq!(config.matcher.lexical_threshold(), 0.30);
        assert_eq!(config.matcher.semantic_pool, 3);

        assert_eq!(config.triage.default_specialty, "General Medicine");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lexical_threshold_follows_metric() {
        let mut config = Config::default();
        config.set("matcher.lexical_metric", "partial").unwrap();
        assert_eq!(config.matcher.lexical_threshold(), 0.75);
    }

    #[test]
    fn test_get_set_roundtrip() {
        let mut config = Config::default();
        config.set("matcher.mode", "semantic").unwrap();
        config.set("matcher.semantic_threshold", "0.6").unwrap();
        config.set("dialogue.max_questions", "3").unwrap();
        config.set("llm.fallback_models", "a, b,, c").unwrap();

        assert_eq!(config.get("matcher.mode").unwrap(), "semantic");
        assert_eq!(config.get("matcher.semantic_threshold").unwrap(), "0.6");
        assert_eq!(config.get("dialogue.max_questions").unwrap(), "3");
        assert_eq!(config.llm.fallback_models, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_set_rejects_out_of_range() {
        let mut config = Config::default();
        assert!(config.set("matcher.dice_threshold", "1.5").is_err());
        assert!(config.set("llm.question_temperature", "3.0").is_err());
        assert!(config.set("matcher.semantic_pool", "0").is_err());
        assert!(config.set("matcher.mode", "psychic").is_err());
        assert!(config.set("triage.default_specialty", "  ").is_err());
        assert!(config.set("no.such.key", "1").is_err());
    }

    #[test]
    fn test_api_key_cannot_be_set() {
        let mut config = Config::default();
        let err = config.set("llm.api_key", "sk-secret").unwrap_err();
        assert!(err.to_string().contains("environment variable"));
    }

    #[test]
    fn test_stored_api_key_fails_validation() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-test-key".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [matcher]
            mode = "semantic"
            embedder = "hashing"

            [triage]
            default_specialty = "Family Medicine"
            "#,
        )
        .unwrap();

        assert_eq!(config.matcher.mode, MatcherMode::Semantic);
        assert_eq!(config.matcher.dice_threshold, 0.30);
        assert_eq!(config.triage.default_specialty, "Family Medicine");
        assert_eq!(config.dialogue.max_questions, 5);
    }

    #[test]
    fn test_invalid_toml_threshold_rejected() {
        let result = Config::from_toml(
            r#"
            [matcher]
            partial_threshold = 7.5
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml(&serialized).unwrap();
        assert_eq!(parsed.llm.default_model, config.llm.default_model);
        assert_eq!(parsed.catalog.path, config.catalog.path);
    }

    #[test]
    fn test_list_contains_all_sections() {
        let config = Config::default();
        let keys: Vec<String> = config.list().unwrap().into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"llm.default_model".to_string()));
        assert!(keys.contains(&"matcher.semantic_pool".to_string()));
        assert!(keys.contains(&"catalog.path".to_string()));
        assert!(keys.contains(&"triage.default_specialty".to_string()));
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("abc"), "***");
        assert_eq!(redact("gsk_1234567890"), "***7890");
        assert_eq!(redact("sk-a€€"), "***-a€€");
        assert_eq!(redact("€€€€"), "***");
    }
}
