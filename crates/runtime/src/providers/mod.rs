//! Model adapters for hosted and local backends.
//!
//! Each adapter speaks one vendor API and renders any native tool request
//! into one of the text encodings the interpreter understands. [`Provider`]
//! wraps the three so the backend can be chosen at startup from config.

mod anthropic;
mod lines;
mod ollama;
mod openai;

pub use anthropic::{AnthropicAdapter, AnthropicAdapterBuilder};
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;

use crate::model::{Completion, Message, ModelAdapter, ModelError};
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use storage::Usage;
use tokio::sync::mpsc::UnboundedSender;
use tools::ToolSpec;

pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Which vendor API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Ollama,
}

impl ProviderKind {
    /// Prefix used in the adapter's recorded name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Anthropic => "claude",
            Self::OpenAi => "chatgpt",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-3-7-sonnet-latest",
            Self::OpenAi => "gpt-4o",
            Self::Ollama => "llama3.1",
        }
    }

    /// Environment variable holding the API key, if the backend needs one.
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Ollama => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Ok(Self::Anthropic),
            "chatgpt" | "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(Error::Config(format!(
                "unknown provider {other:?} (expected claude, chatgpt or ollama)"
            ))),
        }
    }
}

/// Settings shared by every adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub api_key: Option<String>,
    /// Endpoint override, mostly for proxies and self-hosted servers.
    pub base_url: Option<String>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            api_key: None,
            base_url: None,
        }
    }

    fn require_key(&self, kind: ProviderKind) -> Result<String> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err(Error::Config(format!(
                "an API key is required for {kind}; set {} or model.api_key",
                kind.api_key_env().unwrap_or("model.api_key")
            ))),
        }
    }
}

/// An adapter selected at startup.
pub enum Provider {
    Anthropic(AnthropicAdapter),
    OpenAi(OpenAiAdapter),
    Ollama(OllamaAdapter),
}

impl Provider {
    /// Build the adapter for `kind`. Fails if a hosted backend has no key.
    pub fn from_config(kind: ProviderKind, config: ModelConfig) -> Result<Self> {
        let provider = match kind {
            ProviderKind::Anthropic => {
                let key = config.require_key(kind)?;
                let mut builder = AnthropicAdapter::builder(key, &config.name)
                    .max_tokens(config.max_tokens)
                    .temperature(config.temperature);
                if let Some(url) = config.base_url {
                    builder = builder.base_url(url);
                }
                Self::Anthropic(builder.build())
            }
            ProviderKind::OpenAi => {
                let key = config.require_key(kind)?;
                Self::OpenAi(OpenAiAdapter::new(key, config))
            }
            ProviderKind::Ollama => Self::Ollama(OllamaAdapter::new(config)),
        };
        Ok(provider)
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Anthropic(_) => ProviderKind::Anthropic,
            Self::OpenAi(_) => ProviderKind::OpenAi,
            Self::Ollama(_) => ProviderKind::Ollama,
        }
    }
}

impl ModelAdapter for Provider {
    fn name(&self) -> &str {
        match self {
            Self::Anthropic(a) => a.name(),
            Self::OpenAi(a) => a.name(),
            Self::Ollama(a) => a.name(),
        }
    }

    fn max_tokens(&self) -> u32 {
        match self {
            Self::Anthropic(a) => a.max_tokens(),
            Self::OpenAi(a) => a.max_tokens(),
            Self::Ollama(a) => a.max_tokens(),
        }
    }

    fn advertise(&mut self, tools: &[ToolSpec]) {
        match self {
            Self::Anthropic(a) => a.advertise(tools),
            Self::OpenAi(a) => a.advertise(tools),
            Self::Ollama(a) => a.advertise(tools),
        }
    }

    async fn complete(&self, messages: &[Message]) -> std::result::Result<Completion, ModelError> {
        match self {
            Self::Anthropic(a) => a.complete(messages).await,
            Self::OpenAi(a) => a.complete(messages).await,
            Self::Ollama(a) => a.complete(messages).await,
        }
    }

    async fn stream(
        &self,
        messages: &[Message],
        chunks: UnboundedSender<String>,
    ) -> std::result::Result<Option<Usage>, ModelError> {
        match self {
            Self::Anthropic(a) => a.stream(messages, chunks).await,
            Self::OpenAi(a) => a.stream(messages, chunks).await,
            Self::Ollama(a) => a.stream(messages, chunks).await,
        }
    }
}

/// Map a transport failure.
fn network(e: reqwest::Error) -> ModelError {
    ModelError::Network(e.to_string())
}

/// Turn a non-success status into an API error carrying the body.
async fn check_status(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, ModelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::Api(format!("{status}: {body}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_identifiers_parse() {
        assert_eq!("claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("Anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("chatgpt".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" ollama ".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert!(matches!(
            "gemini".parse::<ProviderKind>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn hosted_backends_need_a_key() {
        for kind in [ProviderKind::Anthropic, ProviderKind::OpenAi] {
            let err = Provider::from_config(kind, ModelConfig::new("m")).err().unwrap();
            assert!(matches!(err, Error::Config(_)));

            let mut config = ModelConfig::new("m");
            config.api_key = Some("   ".into());
            assert!(Provider::from_config(kind, config).is_err());
        }
    }

    #[test]
    fn names_carry_the_provider_label() {
        let mut config = ModelConfig::new("sonnet");
        config.api_key = Some("key".into());
        let provider = Provider::from_config(ProviderKind::Anthropic, config).unwrap();
        assert_eq!(provider.name(), "claude-sonnet");
        assert_eq!(provider.kind(), ProviderKind::Anthropic);

        let mut config = ModelConfig::new("gpt-4o");
        config.api_key = Some("key".into());
        config.max_tokens = 2048;
        let provider = Provider::from_config(ProviderKind::OpenAi, config).unwrap();
        assert_eq!(provider.name(), "chatgpt-gpt-4o");
        assert_eq!(provider.max_tokens(), 2048);

        let provider =
            Provider::from_config(ProviderKind::Ollama, ModelConfig::new("llama3")).unwrap();
        assert_eq!(provider.name(), "ollama-llama3");
        assert_eq!(provider.max_tokens(), DEFAULT_MAX_TOKENS);
    }
}
