//! Configuration management for ragline.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.ragline/config.yaml` or `RAGLINE_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Backend selections (embedding provider, history store, blob store,
//! degradation policy) are closed enums, so an unknown backend name fails
//! when the file is parsed rather than when a request is served.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".ragline";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .ragline/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("ollama", "deepseek", "gemini")
    pub provider: String,

    /// Model override for the active provider
    pub model: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider settings
    pub llm: LlmSettings,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Retrieval engine and context assembly settings
    pub retrieval: RetrievalSettings,

    /// Conversation history settings
    pub history: HistorySettings,

    /// Blob storage settings
    pub storage: StorageSettings,

    /// Web search settings
    pub search: SearchSettings,
}

/// LLM provider settings from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Settings for a single LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Model identifier
    pub model: String,

    /// Custom endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let mut providers = HashMap::new();

        providers.insert(
            "ollama".to_string(),
            ProviderConfig {
                model: "llama3.2".to_string(),
                endpoint: Some("http://localhost:11434".to_string()),
                api_key_env: None,
                timeout: Some(120),
            },
        );
        providers.insert(
            "deepseek".to_string(),
            ProviderConfig {
                model: "deepseek-chat".to_string(),
                endpoint: Some("https://api.deepseek.com/v1/chat/completions".to_string()),
                api_key_env: Some("DEEPSEEK_API_KEY".to_string()),
                timeout: Some(120),
            },
        );
        providers.insert(
            "gemini".to_string(),
            ProviderConfig {
                model: "gemini-2.0-flash-exp".to_string(),
                endpoint: None,
                api_key_env: Some("GEMINI_API_KEY".to_string()),
                timeout: Some(120),
            },
        );

        Self {
            active_provider: "ollama".to_string(),
            providers,
        }
    }
}

/// Embedding backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Offline character-trigram hashing
    Trigram,
    /// Sentence-embedding model served by a local Ollama
    Ollama,
}

impl EmbeddingProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigram => "trigram",
            Self::Ollama => "ollama",
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimension; every index built from this model uses it
    pub dimensions: usize,

    /// Endpoint for server-backed providers
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Trigram,
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// What context assembly does when retrieval or web search fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DegradationPolicy {
    /// Fail the whole request
    #[default]
    Abort,
    /// Log a warning and continue without the failing context
    Degrade,
}

/// Retrieval engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Number of documents returned for a query
    pub top_k: usize,

    /// Number of built indexes kept across calls (0 disables the cache)
    pub index_cache_capacity: usize,

    /// Upper bound on a single retrieval call, in seconds
    pub timeout_secs: u64,

    pub degradation: DegradationPolicy,

    /// Handlebars template for the final prompt (`query` and `context` variables)
    pub prompt_template: Option<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            index_cache_capacity: 8,
            timeout_secs: 60,
            degradation: DegradationPolicy::Abort,
            prompt_template: None,
        }
    }
}

/// Conversation history backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    Sqlite,
    Memory,
}

/// Conversation history settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct HistorySettings {
    pub backend: HistoryBackend,

    /// SQLite database path, relative to the state directory unless absolute
    pub path: PathBuf,

    /// Default number of turns loaded per request
    pub max_history: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::Sqlite,
            path: PathBuf::from("history.sqlite"),
            max_history: 20,
        }
    }
}

/// Blob storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Blobs kept under a local directory
    Local,
}

/// Blob storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageSettings {
    pub backend: StorageBackend,

    /// Root directory, relative to the state directory unless absolute
    pub root: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root: PathBuf::from("blobs"),
        }
    }
}

/// Web search settings (Google Custom Search JSON API).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key_env: String,
    pub engine_id_env: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            api_key_env: "GOOGLE_SEARCH_API_KEY".to_string(),
            engine_id_env: "GOOGLE_CSE_ID".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalSettings>,
    history: Option<HistorySettings>,
    storage: Option<StorageSettings>,
    search: Option<SearchSettings>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let llm = LlmSettings::default();
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: llm.active_provider.clone(),
            model: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm,
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            history: HistorySettings::default(),
            storage: StorageSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// Environment variables:
    /// - `RAGLINE_WORKSPACE`: Override workspace path
    /// - `RAGLINE_CONFIG`: Path to config file
    /// - `RAGLINE_PROVIDER`: LLM provider
    /// - `RAGLINE_MODEL`: Model identifier
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// `workspace` and `config_file` come from the command line. They take
    /// precedence over their environment variables and decide which YAML file
    /// is read.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace
            .clone()
            .or_else(|| std::env::var("RAGLINE_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("RAGLINE_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.state_dir().join("config.yaml"),
        };

        if config.config_file.is_some() && !config_path.exists() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // A workspace given on the command line beats `workspace.path` in the file
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("RAGLINE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("RAGLINE_MODEL") {
            config.model = Some(model);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            // Providers missing from the file keep their defaults
            for (name, provider) in llm.providers {
                result.llm.providers.insert(name, provider);
            }
            result.llm.active_provider = llm.active_provider;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(history) = config_file.history {
            result.history = history;
        }
        if let Some(storage) = config_file.storage {
            result.storage = storage;
        }
        if let Some(search) = config_file.search {
            result.search = search;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = Some(model);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .ragline directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .ragline directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Resolved path of the SQLite history database.
    pub fn history_path(&self) -> PathBuf {
        self.resolve_state_path(&self.history.path)
    }

    /// Resolved root directory of the local blob store.
    pub fn storage_root(&self) -> PathBuf {
        self.resolve_state_path(&self.storage.root)
    }

    fn resolve_state_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.state_dir().join(path)
        }
    }

    /// Get the configuration of a named LLM provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.providers.get(provider)
    }

    /// Model for the active provider, honoring the CLI/env override.
    pub fn active_model(&self) -> Option<String> {
        self.model.clone().or_else(|| {
            self.get_provider_config(&self.provider)
                .map(|pc| pc.model.clone())
        })
    }

    /// Resolve a provider's API key from its configured environment variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.api_key_env.as_ref())
            .and_then(|env_var| std::env::var(env_var).ok())
    }

    /// Resolve the web search credentials `(api_key, engine_id)`.
    pub fn resolve_search_credentials(&self) -> Option<(String, String)> {
        let key = std::env::var(&self.search.api_key_env).ok()?;
        let cx = std::env::var(&self.search.engine_id_env).ok()?;
        Some((key, cx))
    }

    /// Validate configuration for the active provider and retrieval settings.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["ollama", "deepseek", "gemini"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if let Some(env_var) = self
            .get_provider_config(&self.provider)
            .and_then(|pc| pc.api_key_env.as_ref())
        {
            if std::env::var(env_var).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    env_var
                )));
            }
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.active_model().as_deref(), Some("llama3.2"));
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.history.max_history, 20);
        assert!(!config.verbose);
    }

    #[test]
    fn test_state_paths() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(STATE_DIR));
        assert!(config.history_path().starts_with(config.state_dir()));
        assert!(config.storage_root().ends_with("blobs"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            None,
            None,
            Some("gemini".to_string()),
            Some("gemini-pro".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "gemini");
        assert_eq!(overridden.active_model().as_deref(), Some("gemini-pro"));
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_sections() {
        let yaml = r#"
llm:
  activeProvider: deepseek
  providers:
    deepseek:
      model: deepseek-reasoner
      apiKeyEnv: MY_DEEPSEEK_KEY
embedding:
  provider: ollama
  model: all-minilm
  dimensions: 384
retrieval:
  topK: 5
  indexCacheCapacity: 0
  degradation: degrade
history:
  backend: memory
"#;
        let merged = AppConfig::default().merge_yaml_str(yaml).unwrap();

        assert_eq!(merged.provider, "deepseek");
        assert_eq!(merged.active_model().as_deref(), Some("deepseek-reasoner"));
        assert!(merged.llm.providers.contains_key("gemini"));
        assert_eq!(merged.embedding.provider, EmbeddingProviderKind::Ollama);
        assert_eq!(merged.embedding.model, "all-minilm");
        assert_eq!(merged.retrieval.top_k, 5);
        assert_eq!(merged.retrieval.index_cache_capacity, 0);
        assert_eq!(merged.retrieval.timeout_secs, 60);
        assert_eq!(merged.retrieval.degradation, DegradationPolicy::Degrade);
        assert_eq!(merged.history.backend, HistoryBackend::Memory);
        assert_eq!(merged.history.max_history, 20);
    }

    #[test]
    fn test_unknown_backend_rejected_at_parse() {
        let yaml = "history:\n  backend: bigtable\n";
        assert!(AppConfig::default().merge_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_load_reads_workspace_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let state = temp.path().join(STATE_DIR);
        std::fs::create_dir_all(&state).unwrap();
        std::fs::write(state.join("config.yaml"), "retrieval:\n  topK: 7\n").unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();

        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.retrieval.top_k, 7);
    }

    #[test]
    fn test_load_from_explicit_config_file() {
        let workspace = tempfile::TempDir::new().unwrap();
        let elsewhere = tempfile::TempDir::new().unwrap();
        let path = elsewhere.path().join("custom.yaml");
        std::fs::write(
            &path,
            "workspace:\n  path: /does/not/matter\nretrieval:\n  topK: 9\n",
        )
        .unwrap();

        let config =
            AppConfig::load_from(Some(workspace.path().to_path_buf()), Some(path.clone())).unwrap();

        assert_eq!(config.retrieval.top_k, 9);
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.workspace, workspace.path());
        assert!(config.history_path().starts_with(workspace.path()));
    }

    #[test]
    fn test_load_from_missing_config_file() {
        let workspace = tempfile::TempDir::new().unwrap();
        let missing = workspace.path().join("nope.yaml");

        let result = AppConfig::load_from(Some(workspace.path().to_path_buf()), Some(missing));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = AppConfig::load_from(Some(temp.path().join("gone")), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let config = AppConfig {
            provider: "mysql".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_top_k() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }
}
