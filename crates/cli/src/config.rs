//! Configuration loading from tiller.toml, with command-line overrides.

use clap::{Args, ValueEnum};
use runtime::{ModelConfig, ProviderKind, SessionOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE: &str = "tiller.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub model: ModelSection,
    pub history: HistorySection,
    pub session: SessionSection,
}

/// Model backend configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSection {
    /// claude|anthropic, chatgpt|openai or ollama.
    pub provider: String,

    /// Model name. Defaults to the provider's usual choice.
    pub name: Option<String>,

    pub max_tokens: u32,
    pub temperature: f32,

    /// Request streamed replies.
    pub stream: bool,

    /// API key. When absent the provider's environment variable is used.
    pub api_key: Option<String>,

    pub base_url: Option<String>,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            provider: "claude".to_string(),
            name: None,
            max_tokens: runtime::providers::DEFAULT_MAX_TOKENS,
            temperature: runtime::providers::DEFAULT_TEMPERATURE,
            stream: true,
            api_key: None,
            base_url: None,
        }
    }
}

/// Where conversation records are kept.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistorySection {
    pub path: PathBuf,
    pub format: HistoryFormat,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("chat_history.json"),
            format: HistoryFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFormat {
    /// A pretty-printed JSON array.
    #[default]
    Json,
    /// A SQLite database.
    Sqlite,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    /// Print token and timing statistics after each turn.
    pub show_stats: bool,
    pub max_tool_rounds: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = SessionOptions::default();
        Self {
            show_stats: false,
            max_tool_rounds: defaults.max_tool_rounds,
        }
    }
}

/// Flags that override the config file.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Model provider (claude, chatgpt, ollama)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Model name
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Maximum tokens per reply
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// History file
    #[arg(long, global = true)]
    pub history: Option<PathBuf>,

    /// History file format
    #[arg(long, value_enum, global = true)]
    pub history_format: Option<HistoryFormat>,

    /// Directory the file tools are confined to [default: current directory]
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Show token usage and timing statistics
    #[arg(long, global = true)]
    pub stats: bool,

    /// Wait for whole replies instead of streaming them
    #[arg(long, global = true)]
    pub no_stream: bool,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `explicit` if given, else `tiller.toml` if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).exists() => Self::load(CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line flags on top of file values.
    pub fn apply(&mut self, flags: &Overrides) {
        if let Some(provider) = &flags.provider {
            self.model.provider = provider.clone();
        }
        if let Some(name) = &flags.model {
            self.model.name = Some(name.clone());
        }
        if let Some(max_tokens) = flags.max_tokens {
            self.model.max_tokens = max_tokens;
        }
        if let Some(temperature) = flags.temperature {
            self.model.temperature = temperature;
        }
        if let Some(path) = &flags.history {
            self.history.path = path.clone();
        }
        if let Some(format) = flags.history_format {
            self.history.format = format;
        }
        if flags.stats {
            self.session.show_stats = true;
        }
        if flags.no_stream {
            self.model.stream = false;
        }
    }

    /// Resolve the provider and its settings. `env` looks up environment
    /// variables and is only consulted when the file has no API key.
    pub fn model_settings(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(ProviderKind, ModelConfig), ConfigError> {
        let kind: ProviderKind = self
            .model
            .provider
            .parse()
            .map_err(|e: runtime::Error| ConfigError::Invalid(e.to_string()))?;
        if self.model.max_tokens == 0 {
            return Err(ConfigError::Invalid("model.max_tokens must be positive".into()));
        }

        let name = self
            .model
            .name
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string());
        let mut config = ModelConfig::new(name);
        config.max_tokens = self.model.max_tokens;
        config.temperature = self.model.temperature;
        config.base_url = self.model.base_url.clone();
        config.api_key = self
            .model
            .api_key
            .clone()
            .or_else(|| kind.api_key_env().and_then(&env));
        Ok((kind, config))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            stream: self.model.stream,
            max_tool_rounds: self.session.max_tool_rounds,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Invalid(String),
}
