//! Anthropic Messages API adapter.

use super::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, check_status, network};
use crate::interpreter::render_lines;
use crate::model::{Completion, Message, ModelAdapter, ModelError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storage::{Role, Usage};
use tokio::sync::mpsc::UnboundedSender;
use tools::ToolSpec;
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ApiTool]>,
}

#[derive(Debug, PartialEq, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Adapter Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic adapter.
#[derive(Debug, Clone)]
pub struct AnthropicAdapterBuilder {
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    base_url: String,
}

impl AnthropicAdapterBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn build(self) -> AnthropicAdapter {
        AnthropicAdapter {
            client: reqwest::Client::new(),
            name: format!("claude-{}", self.model),
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            base_url: self.base_url,
            tools: Vec::new(),
        }
    }
}

/// Anthropic Messages API adapter.
///
/// The API is called without streaming; [`stream`](ModelAdapter::stream)
/// delivers the finished reply as a single chunk. Tool requests come back
/// as `tool_use` blocks and are rendered in the line-prefixed form.
pub struct AnthropicAdapter {
    client: reqwest::Client,
    name: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    base_url: String,
    tools: Vec<ApiTool>,
}

impl AnthropicAdapter {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> AnthropicAdapterBuilder {
        AnthropicAdapterBuilder::new(api_key, model)
    }

    /// Split the transcript into the top-level system prompt and the
    /// alternating message list the API expects. Adjacent messages with the
    /// same role are merged.
    fn to_api(messages: &[Message]) -> (Option<String>, Vec<ApiMessage>) {
        let mut system: Vec<&str> = Vec::new();
        let mut api: Vec<ApiMessage> = Vec::new();

        for message in messages {
            let role = match message.role {
                Role::System => {
                    system.push(&message.content);
                    continue;
                }
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            match api.last_mut() {
                Some(last) if last.role == role => {
                    last.content.push_str("\n\n");
                    last.content.push_str(&message.content);
                }
                _ => api.push(ApiMessage {
                    role,
                    content: message.content.clone(),
                }),
            }
        }

        let system = (!system.is_empty()).then(|| system.join("\n\n"));
        (system, api)
    }

    /// Flatten response blocks into reply text.
    fn render(blocks: Vec<ApiResponseBlock>) -> String {
        let mut content = String::new();
        for block in blocks {
            match block {
                ApiResponseBlock::Text { text } => content.push_str(&text),
                ApiResponseBlock::ToolUse { name, input } => {
                    content.push_str(&render_lines(&name, &input));
                }
                ApiResponseBlock::Unknown => {}
            }
        }
        content
    }
}

impl std::fmt::Display for AnthropicAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({})", self.model)
    }
}

impl ModelAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn advertise(&mut self, tools: &[ToolSpec]) {
        self.tools = tools
            .iter()
            .map(|spec| ApiTool {
                name: spec.name.clone(),
                description: spec.description.clone(),
                input_schema: spec.schema.clone(),
            })
            .collect();
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion, ModelError> {
        let (system, api_messages) = Self::to_api(messages);
        let request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: api_messages,
            system,
            tools: (!self.tools.is_empty()).then_some(self.tools.as_slice()),
        };

        debug!(model = %self.model, messages = request.messages.len(), "anthropic request");
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(network)?;
        let response = check_status(response).await?;

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        Ok(Completion {
            content: Self::render(body.content),
            usage: Some(Usage::new(body.usage.input_tokens, body.usage.output_tokens)),
        })
    }

    async fn stream(
        &self,
        messages: &[Message],
        chunks: UnboundedSender<String>,
    ) -> Result<Option<Usage>, ModelError> {
        let completion = self.complete(messages).await?;
        if !completion.content.is_empty() {
            let _ = chunks.send(completion.content);
        }
        Ok(completion.usage)
    }
}
