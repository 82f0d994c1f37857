//! Configuration management.
//!
//! Settings come from a TOML file, then environment variables override them.
//!
//! | Environment Variable | Description | Default |
//! |---------------------|-------------|---------|
//! | `MEMORY_LANE_CONFIG_PATH` | Config file location | platform config dir |
//! | `MEMORY_LANE_DATA_DIR` | Where memories and chat history live | platform data dir |
//! | `ANTHROPIC_API_KEY` | Gateway API key | unset |
//! | `MEMORY_LANE_LLM_BASE_URL` | Gateway base URL | `https://api.anthropic.com/v1` |
//! | `MEMORY_LANE_LLM_TIMEOUT_MS` | Per-request HTTP timeout | `30000` |
//! | `MEMORY_LANE_EMBEDDING_ENDPOINT` | Embed endpoint (LLM vectors if unset) | unset |
//! | `MEMORY_LANE_SEMANTIC_SEARCH` | Prefer semantic ranking | `false` |
//! | `MEMORY_LANE_CLASSIFICATION_TIMEOUT_MS` | Router call bound | `10000` |
//! | `MEMORY_LANE_LOG_FORMAT` | `pretty` or `json` | `pretty` |

use crate::observability::LogFormat;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration for memory-lane.
#[derive(Debug, Clone)]
pub struct MemoryLaneConfig {
    /// Directory holding the persisted memory collection and chat history.
    pub data_dir: PathBuf,
    /// Gateway (LLM) settings.
    pub llm: LlmConfig,
    /// Embedding settings.
    pub embedding: EmbeddingConfig,
    /// Retrieval settings.
    pub retrieval: RetrievalConfig,
    /// Intent routing settings.
    pub routing: RoutingConfig,
    /// Gift idea settings.
    pub gifts: GiftConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key.
    pub api_key: Option<SecretString>,
    /// Base URL of the Messages API.
    pub base_url: Option<String>,
    /// Model used for answers and gift ideas.
    pub model: Option<String>,
    /// Model used for classification, sufficiency and LLM embeddings.
    pub router_model: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: None,
            router_model: None,
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Embedding configuration.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Embed endpoint honoring `{inputs} -> {vectors, model}`.
    ///
    /// When unset, vectors are requested from the router model.
    pub endpoint: Option<String>,
    /// Maximum inputs per embed call.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            batch_size: 20,
        }
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Maximum memories kept for a chat question.
    pub limit: usize,
    /// Cap on the recency fallback when nothing matches.
    pub fallback_limit: usize,
    /// Whether semantic ranking is requested by default.
    pub semantic: bool,
    /// Maximum memories shown to the sufficiency classifier.
    pub digest_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: 30,
            fallback_limit: 12,
            semantic: false,
            digest_limit: 15,
        }
    }
}

/// Intent routing configuration.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Wall-clock bound on each classifier call.
    pub classification_timeout_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            classification_timeout_ms: 10_000,
        }
    }
}

/// Gift idea configuration.
#[derive(Debug, Clone)]
pub struct GiftConfig {
    /// Maximum memories sent with a gift request.
    pub candidate_limit: usize,
}

impl Default for GiftConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 80,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `memory_lane=debug`.
    pub filter: Option<String>,
    /// Optional file to append logs to instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Gateway section.
    pub llm: Option<ConfigFileLlm>,
    /// Embedding section.
    pub embedding: Option<ConfigFileEmbedding>,
    /// Retrieval section.
    pub retrieval: Option<ConfigFileRetrieval>,
    /// Routing section.
    pub routing: Option<ConfigFileRouting>,
    /// Gift section.
    pub gifts: Option<ConfigFileGifts>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// API key.
    pub api_key: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Generation model.
    pub model: Option<String>,
    /// Router model.
    pub router_model: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
}

/// Embedding section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileEmbedding {
    /// Embed endpoint.
    pub endpoint: Option<String>,
    /// Batch size.
    pub batch_size: Option<usize>,
}

/// Retrieval section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRetrieval {
    /// Retrieval limit.
    pub limit: Option<usize>,
    /// Fallback limit.
    pub fallback_limit: Option<usize>,
    /// Semantic ranking by default.
    pub semantic: Option<bool>,
    /// Digest limit.
    pub digest_limit: Option<usize>,
}

/// Routing section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRouting {
    /// Classifier call bound.
    pub classification_timeout_ms: Option<u64>,
}

/// Gift section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileGifts {
    /// Candidate limit.
    pub candidate_limit: Option<usize>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for MemoryLaneConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            routing: RoutingConfig::default(),
            gifts: GiftConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl MemoryLaneConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::failed("read_config_file", format!("{}: {e}", path.display())))?;

        Self::from_toml_str(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or has unknown keys.
    pub fn from_toml_str(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::failed("parse_config_file", e))?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/memory-lane/` on macOS)
    /// 2. XDG config dir (`~/.config/memory-lane/`)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs
            .config_dir()
            .join("memory-lane")
            .join("config.toml");
        if platform_config.exists() {
            match Self::load_from_file(&platform_config) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %platform_config.display(), error = %e, "Ignoring unreadable config"),
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("memory-lane")
            .join("config.toml");
        if xdg_config.exists() {
            match Self::load_from_file(&xdg_config) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %xdg_config.display(), error = %e, "Ignoring unreadable config"),
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `MemoryLaneConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(llm) = file.llm {
            config.llm.api_key = llm.api_key.map(SecretString::from);
            config.llm.base_url = llm.base_url;
            config.llm.model = llm.model;
            config.llm.router_model = llm.router_model;
            if let Some(v) = llm.timeout_ms {
                config.llm.timeout_ms = v;
            }
            if let Some(v) = llm.connect_timeout_ms {
                config.llm.connect_timeout_ms = v;
            }
        }
        if let Some(embedding) = file.embedding {
            config.embedding.endpoint = embedding.endpoint;
            if let Some(v) = embedding.batch_size {
                config.embedding.batch_size = v.max(1);
            }
        }
        if let Some(retrieval) = file.retrieval {
            if let Some(v) = retrieval.limit {
                config.retrieval.limit = v;
            }
            if let Some(v) = retrieval.fallback_limit {
                config.retrieval.fallback_limit = v;
            }
            if let Some(v) = retrieval.semantic {
                config.retrieval.semantic = v;
            }
            if let Some(v) = retrieval.digest_limit {
                config.retrieval.digest_limit = v;
            }
        }
        if let Some(routing) = file.routing
            && let Some(v) = routing.classification_timeout_ms
        {
            config.routing.classification_timeout_ms = v;
        }
        if let Some(gifts) = file.gifts
            && let Some(v) = gifts.candidate_limit
        {
            config.gifts.candidate_limit = v;
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
            config.logging.filter = logging.filter;
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("MEMORY_LANE_DATA_DIR")
            && !v.trim().is_empty()
        {
            self.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ANTHROPIC_API_KEY")
            && !v.trim().is_empty()
        {
            self.llm.api_key = Some(SecretString::from(v));
        }
        if let Ok(v) = std::env::var("MEMORY_LANE_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("MEMORY_LANE_LLM_TIMEOUT_MS")
            && let Ok(parsed) = v.parse::<u64>()
        {
            self.llm.timeout_ms = parsed;
        }
        if let Ok(v) = std::env::var("MEMORY_LANE_EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("MEMORY_LANE_SEMANTIC_SEARCH") {
            self.retrieval.semantic = v.to_lowercase() == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("MEMORY_LANE_CLASSIFICATION_TIMEOUT_MS")
            && let Ok(parsed) = v.parse::<u64>()
        {
            self.routing.classification_timeout_ms = parsed;
        }
        if let Ok(v) = std::env::var("MEMORY_LANE_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&v);
        }
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }
}

/// Platform data directory, or `.memory-lane` in the working directory.
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "memory-lane").map_or_else(
        || PathBuf::from(".memory-lane"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = MemoryLaneConfig::default();
        assert_eq!(config.retrieval.limit, 30);
        assert_eq!(config.retrieval.fallback_limit, 12);
        assert_eq!(config.retrieval.digest_limit, 15);
        assert_eq!(config.embedding.batch_size, 20);
        assert_eq!(config.gifts.candidate_limit, 80);
        assert!(!config.retrieval.semantic);
    }

    #[test]
    fn test_from_toml_str() {
        let config = MemoryLaneConfig::from_toml_str(
            r#"
            data_dir = "/tmp/lane"

            [llm]
            api_key = "sk-ant-test"
            model = "claude-sonnet-4-20250514"
            timeout_ms = 5000

            [embedding]
            endpoint = "https://example.test/api/embed"
            batch_size = 0

            [retrieval]
            semantic = true
            limit = 10

            [routing]
            classification_timeout_ms = 1500

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/lane"));
        assert_eq!(
            config.llm.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("sk-ant-test".to_string())
        );
        assert_eq!(config.llm.timeout_ms, 5000);
        assert_eq!(config.embedding.batch_size, 1);
        assert!(config.retrieval.semantic);
        assert_eq!(config.retrieval.limit, 10);
        assert_eq!(config.retrieval.fallback_limit, 12);
        assert_eq!(config.routing.classification_timeout_ms, 1500);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result = MemoryLaneConfig::from_toml_str("unknown_key = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = MemoryLaneConfig::load_from_file(Path::new("/definitely/not/here.toml"));
        assert!(result.is_err());
    }
}
