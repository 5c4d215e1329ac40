//! OpenAI Chat Completions adapter.

use super::{ModelConfig, check_status, network};
use crate::interpreter::{render_block, render_function};
use crate::model::{Completion, Message, ModelAdapter, ModelError};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use storage::Usage;
use tokio::sync::mpsc::UnboundedSender;
use tools::ToolSpec;
use tracing::{debug, warn};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DONE: &str = "[DONE]";

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    function: FunctionCall,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded argument object, as sent by the API.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(usage: ApiUsage) -> Self {
        Usage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<ApiUsage>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

/// Tool calls assembled from streamed fragments, indexed by position.
///
/// Calls arrive in order, so a fragment may only extend a known call or
/// start the next one. Anything else is dropped.
#[derive(Debug, Default)]
struct CallAccumulator {
    calls: Vec<FunctionCall>,
}

impl CallAccumulator {
    fn apply(&mut self, delta: ToolCallDelta) {
        if delta.index > self.calls.len() {
            warn!(
                index = delta.index,
                known = self.calls.len(),
                "dropping out-of-order tool call fragment"
            );
            return;
        }
        if delta.index == self.calls.len() {
            self.calls.push(FunctionCall::default());
        }
        let Some(function) = delta.function else {
            return;
        };
        let call = &mut self.calls[delta.index];
        if let Some(name) = function.name {
            call.name.push_str(&name);
        }
        if let Some(arguments) = function.arguments {
            call.arguments.push_str(&arguments);
        }
    }
}

/// Text appended to `content` to express the first tool call, if any.
///
/// A reply that is only a tool call becomes a whole-reply function object;
/// one accompanied by prose gets a delimited block after the prose.
fn tool_suffix(content: &str, calls: &[FunctionCall]) -> String {
    let Some(call) = calls.iter().find(|c| !c.name.is_empty()) else {
        return String::new();
    };
    if calls.len() > 1 {
        debug!(count = calls.len(), "reply requested several tools; forwarding the first");
    }
    let arguments = if call.arguments.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&call.arguments).unwrap_or_else(|_| Value::String(call.arguments.clone()))
    };
    if content.trim().is_empty() {
        render_function(&call.name, &arguments)
    } else {
        format!("\n{}", render_block(&call.name, &arguments))
    }
}

/// OpenAI Chat Completions adapter.
///
/// Streams over server-sent events and asks for a trailing usage chunk.
pub struct OpenAiAdapter {
    client: reqwest::Client,
    name: String,
    api_key: String,
    config: ModelConfig,
    tools: Vec<Value>,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>, config: ModelConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: format!("chatgpt-{}", config.name),
            api_key: api_key.into(),
            config,
            tools: Vec::new(),
        }
    }

    fn url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    fn request<'a>(&'a self, messages: &'a [Message], stream: bool) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.config.name,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            tools: (!self.tools.is_empty()).then_some(self.tools.as_slice()),
            stream,
            stream_options: stream.then(|| json!({"include_usage": true})),
        }
    }

    async fn send(&self, request: &ApiRequest<'_>) -> Result<reqwest::Response, ModelError> {
        debug!(model = %self.config.name, stream = request.stream, "openai request");
        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(network)?;
        check_status(response).await
    }
}

impl ModelAdapter for OpenAiAdapter {
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
        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let message = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("response has no choices".into()))?
            .message;
        let mut content = message.content.unwrap_or_default();
        let calls: Vec<FunctionCall> = message.tool_calls.into_iter().map(|c| c.function).collect();
        let suffix = tool_suffix(&content, &calls);
        content.push_str(&suffix);

        Ok(Completion {
            content,
            usage: body.usage.map(Usage::from),
        })
    }

    async fn stream(
        &self,
        messages: &[Message],
        chunks: UnboundedSender<String>,
    ) -> Result<Option<Usage>, ModelError> {
        let response = self.send(&self.request(messages, true)).await?;
        let mut events = response.bytes_stream().eventsource();

        let mut text = String::new();
        let mut calls = CallAccumulator::default();
        let mut usage = None;

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| ModelError::Network(format!("event stream: {e}")))?;
            if event.data == DONE {
                break;
            }
            let chunk: StreamChunk = serde_json::from_str(&event.data).map_err(|e| {
                ModelError::InvalidResponse(format!("{e}, data: {}", event.data))
            })?;
            if let Some(error) = chunk.error {
                return Err(ModelError::Api(error.to_string()));
            }
            if let Some(reported) = chunk.usage {
                usage = Some(Usage::from(reported));
            }
            for choice in chunk.choices {
                if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                    text.push_str(&content);
                    let _ = chunks.send(content);
                }
                for delta in choice.delta.tool_calls {
                    calls.apply(delta);
                }
            }
        }

        let suffix = tool_suffix(&text, &calls.calls);
        if !suffix.is_empty() {
            let _ = chunks.send(suffix);
        }
        if usage.is_none() {
            warn!(model = %self.config.name, "stream ended without usage");
        }
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{Detection, WireFormat, interpret};

    fn delta(value: Value) -> ToolCallDelta {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn tool_call_fragments_accumulate_by_index() {
        let mut acc = CallAccumulator::default();
        acc.apply(delta(json!({"index": 0, "id": "c1", "function": {"name": "read_file", "arguments": ""}})));
        acc.apply(delta(json!({"index": 0, "function": {"arguments": "{\"pa"}})));
        acc.apply(delta(json!({"index": 0, "function": {"arguments": "th\": \"a.md\"}"}})));

        assert_eq!(
            acc.calls,
            [FunctionCall {
                name: "read_file".into(),
                arguments: "{\"path\": \"a.md\"}".into(),
            }]
        );
    }

    #[test]
    fn out_of_range_fragments_are_dropped() {
        let mut acc = CallAccumulator::default();
        acc.apply(delta(json!({"index": usize::MAX, "function": {"name": "read_file"}})));
        acc.apply(delta(json!({"index": 2, "function": {"name": "list_dir"}})));
        assert!(acc.calls.is_empty());

        acc.apply(delta(json!({"index": 0, "function": {"name": "list_dir", "arguments": "{}"}})));
        acc.apply(delta(json!({"index": 5, "function": {"arguments": "junk"}})));
        acc.apply(delta(json!({"index": 1, "function": {"name": "read_file"}})));
        assert_eq!(acc.calls.len(), 2);
        assert_eq!(acc.calls[0].arguments, "{}");
        assert_eq!(acc.calls[1].name, "read_file");
    }

    #[test]
    fn bare_call_renders_as_function_object() {
        let calls = [FunctionCall {
            name: "list_files".into(),
            arguments: "{\"path\": \"src\"}".into(),
        }];
        let reply = tool_suffix("", &calls);

        match interpret(&reply) {
            Detection::Call { call, format } => {
                assert_eq!(format, WireFormat::WholeReply);
                assert_eq!(call.name, "list_files");
                assert_eq!(call.arguments, json!({"path": "src"}));
            }
            Detection::NoCall => panic!("not detected: {reply}"),
        }
    }

    #[test]
    fn call_after_prose_renders_as_block() {
        let calls = [FunctionCall {
            name: "list_files".into(),
            arguments: String::new(),
        }];
        let reply = format!("Checking.{}", tool_suffix("Checking.", &calls));

        match interpret(&reply) {
            Detection::Call { call, format } => {
                assert_eq!(format, WireFormat::DelimitedBlock);
                assert_eq!(call.arguments, json!({}));
            }
            Detection::NoCall => panic!("not detected: {reply}"),
        }
    }

    #[test]
    fn no_calls_add_nothing() {
        assert_eq!(tool_suffix("hello", &[]), "");
    }

    #[test]
    fn stream_chunks_parse_content_and_usage() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"object":"chat.completion.chunk","choices":[{"index":0,"delta":{"role":"assistant","content":"Hi"}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hi"));

        let last: StreamChunk = serde_json::from_str(
            r#"{"choices":[],"usage":{"prompt_tokens":9,"completion_tokens":2,"total_tokens":11}}"#,
        )
        .unwrap();
        assert_eq!(last.usage.map(Usage::from), Some(Usage::new(9, 2)));
    }

    #[test]
    fn streaming_request_asks_for_usage() {
        let adapter = OpenAiAdapter::new("key", ModelConfig::new("gpt-4o"));
        let messages = [Message::user("hi")];

        let value = serde_json::to_value(adapter.request(&messages, true)).unwrap();
        assert_eq!(value["stream_options"]["include_usage"], true);
        assert!(value.get("tools").is_none());
        assert_eq!(value["messages"][0], json!({"role": "user", "content": "hi"}));

        let value = serde_json::to_value(adapter.request(&messages, false)).unwrap();
        assert!(value.get("stream_options").is_none());
    }
}
