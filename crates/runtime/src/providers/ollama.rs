//! Ollama chat adapter.

use super::lines::LineBuffer;
use super::{ModelConfig, check_status, network};
use crate::interpreter::render_block;
use crate::model::{Completion, Message, ModelAdapter, ModelError};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use storage::Usage;
use tokio::sync::mpsc::UnboundedSender;
use tools::ToolSpec;
use tracing::debug;

const OLLAMA_API_URL: &str = "http://localhost:11434/api/chat";

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
    options: Value,
}

/// One response object. Streaming sends a sequence of these, one per line.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: Function,
}

#[derive(Debug, Deserialize)]
struct Function {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl ChatChunk {
    fn parse(line: &str) -> Result<Self, ModelError> {
        let chunk: Self = serde_json::from_str(line)
            .map_err(|e| ModelError::InvalidResponse(format!("{e}, data: {line}")))?;
        match chunk.error {
            Some(error) => Err(ModelError::Api(error)),
            None => Ok(chunk),
        }
    }

    /// Reply text carried by this chunk, with any tool call rendered as a
    /// delimited block.
    fn text(&self) -> String {
        let Some(message) = &self.message else {
            return String::new();
        };
        let mut text = message.content.clone();
        if let Some(call) = message.tool_calls.first() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&render_block(&call.function.name, &call.function.arguments));
        }
        text
    }

    /// Usage, when the server counted both sides.
    fn usage(&self) -> Option<Usage> {
        Some(Usage::new(self.prompt_eval_count?, self.eval_count?))
    }
}

/// Ollama chat adapter for a locally running server.
///
/// Streaming responses are newline-delimited JSON objects; the final one
/// has `done` set and carries the token counts.
pub struct OllamaAdapter {
    client: reqwest::Client,
    name: String,
    config: ModelConfig,
    tools: Vec<Value>,
}

impl OllamaAdapter {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: format!("ollama-{}", config.name),
            config,
            tools: Vec::new(),
        }
    }

    fn request<'a>(&'a self, messages: &'a [Message], stream: bool) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.config.name,
            messages,
            stream,
            tools: (!self.tools.is_empty()).then_some(self.tools.as_slice()),
            options: json!({
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens,
            }),
        }
    }

    async fn send(&self, request: &ApiRequest<'_>) -> Result<reqwest::Response, ModelError> {
        let url = self.config.base_url.as_deref().unwrap_or(OLLAMA_API_URL);
        debug!(model = %self.config.name, stream = request.stream, "ollama request");
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(network)?;
        check_status(response).await
    }
}

impl ModelAdapter for OllamaAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_tokens(&self) -> u32 {
        self.config.max_tokens
    }

    fn advertise(&mut self, tools: &[ToolSpec]) {
        self.tools = tools
            .iter()
            .map(|spec| {
                json!({
                    "type": "function",
                    "function": {
                        "name": spec.name,
                        "description": spec.description,
                        "parameters": spec.schema,
                    }
                })
            })
            .collect();
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion, ModelError> {
        let response = self.send(&self.request(messages, false)).await?;
        let body = response.text().await.map_err(network)?;
        let chunk = ChatChunk::parse(body.trim())?;
        Ok(Completion {
            content: chunk.text(),
            usage: chunk.usage(),
        })
    }

    async fn stream(
        &self,
        messages: &[Message],
        chunks: UnboundedSender<String>,
    ) -> Result<Option<Usage>, ModelError> {
        let response = self.send(&self.request(messages, true)).await?;
        let mut body = response.bytes_stream();
        let mut buffer = LineBuffer::new();

        while let Some(bytes) = body.next().await {
            buffer.push(&bytes.map_err(network)?);
            for line in buffer.lines() {
                let chunk = forward(&line, &chunks)?;
                if chunk.done {
                    return Ok(chunk.usage());
                }
            }
        }
        match buffer.finish() {
            Some(line) => Ok(forward(&line, &chunks)?.usage()),
            None => Ok(None),
        }
    }
}

/// Parse one line and send its text on.
fn forward(line: &str, chunks: &UnboundedSender<String>) -> Result<ChatChunk, ModelError> {
    let chunk = ChatChunk::parse(line)?;
    let text = chunk.text();
    if !text.is_empty() {
        let _ = chunks.send(text);
    }
    Ok(chunk)
}
