use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Postgres connection string for the pgvector-backed store
    pub database_url: Option<String>,
    /// JSON snapshot for the in-memory store (used when no database is configured)
    pub snapshot_path: Option<PathBuf>,
    /// Maximum pooled database connections
    pub db_max_connections: u32,
    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,
    /// Hosted answer model configuration
    pub answer: AnswerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the embedding API
    pub base_url: String,
    /// Model name for embeddings
    pub model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub dim: usize,
}

/// Configuration for the optional grounded-answer model.
///
/// Answers are only generated when `api_key` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// Base URL of an OpenAI-compatible chat completions API.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Request timeout in seconds (capped at 120).
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            database_url: None,
            snapshot_path: None,
            db_max_connections: 5,
            request_timeout_secs: 60,
            embedding: EmbeddingConfig::default(),
            answer: AnswerConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            api_key: None,
            dim: 384,
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` wraps this so
    /// tests don't have to mutate the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("PROGRAM_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = Some(url);
        }
        if let Some(path) = lookup("PROGRAM_SEARCH_SNAPSHOT") {
            config.snapshot_path = Some(PathBuf::from(path));
        }
        if let Some(val) = lookup("PROGRAM_SEARCH_DB_MAX_CONNECTIONS") {
            if let Ok(v) = val.parse() {
                config.db_max_connections = v;
            }
        }
        if let Some(val) = lookup("PROGRAM_SEARCH_REQUEST_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.request_timeout_secs = v.max(1);
            }
        }

        // Embedding provider
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Some(url) = lookup("EMBEDDING_BASE_URL") {
            config.embedding.base_url = url;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(key) = lookup("EMBEDDING_API_KEY") {
            config.embedding.api_key = Some(key);
        }
        if let Some(dim) = lookup("EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.embedding.dim = d;
            }
        }

        // Answer model. ANSWER_API_KEY wins over the generic OpenAI key.
        config.answer.api_key = lookup("ANSWER_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .filter(|key| !key.trim().is_empty());
        if let Some(url) = lookup("ANSWER_BASE_URL") {
            config.answer.base_url = url;
        }
        if let Some(model) = lookup("ANSWER_MODEL") {
            config.answer.model = model;
        }
        if let Some(val) = lookup("ANSWER_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.answer.timeout_secs = v.min(120);
            }
        }
        // The answer call has to finish inside the request budget.
        config.answer.timeout_secs = config
            .answer
            .timeout_secs
            .min(config.request_timeout_secs.saturating_sub(1).max(1));

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.embedding.dim, 384);
        assert_eq!(config.answer.model, "gpt-4o-mini");
        assert!(config.answer.api_key.is_none());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_openai_key_enables_answers() {
        let config = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(config.answer.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_answer_key_overrides_openai_key() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-generic"),
            ("ANSWER_API_KEY", "sk-answer"),
        ]));
        assert_eq!(config.answer.api_key.as_deref(), Some("sk-answer"));
    }

    #[test]
    fn test_blank_key_is_treated_as_missing() {
        let config = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "  ")]));
        assert!(config.answer.api_key.is_none());
    }

    #[test]
    fn test_answer_timeout_is_capped() {
        let config = Config::from_lookup(lookup_from(&[
            ("ANSWER_TIMEOUT_SECS", "900"),
            ("PROGRAM_SEARCH_REQUEST_TIMEOUT_SECS", "600"),
        ]));
        assert_eq!(config.answer.timeout_secs, 120);
    }

    #[test]
    fn test_answer_timeout_stays_below_request_timeout() {
        let config = Config::from_lookup(lookup_from(&[
            ("ANSWER_TIMEOUT_SECS", "90"),
            ("PROGRAM_SEARCH_REQUEST_TIMEOUT_SECS", "20"),
        ]));
        assert_eq!(config.request_timeout_secs, 20);
        assert_eq!(config.answer.timeout_secs, 19);
    }

    #[test]
    fn test_zero_request_timeout_is_raised() {
        let config =
            Config::from_lookup(lookup_from(&[("PROGRAM_SEARCH_REQUEST_TIMEOUT_SECS", "0")]));
        assert_eq!(config.request_timeout_secs, 1);
        assert_eq!(config.answer.timeout_secs, 1);
    }

    #[test]
    fn test_unparseable_numbers_keep_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("EMBEDDING_DIM", "lots"),
            ("PROGRAM_SEARCH_DB_MAX_CONNECTIONS", "-1"),
        ]));
        assert_eq!(config.embedding.dim, 384);
        assert_eq!(config.db_max_connections, 5);
    }

    #[test]
    fn test_storage_settings() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/programs"),
            ("PROGRAM_SEARCH_SNAPSHOT", "/tmp/programs.json"),
        ]));
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/programs")
        );
        assert_eq!(
            config.snapshot_path,
            Some(PathBuf::from("/tmp/programs.json"))
        );
    }
}
