//! Test doubles for the model and tool seams.

use crate::model::{Completion, Message, ModelAdapter, ModelError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use storage::Usage;
use tokio::sync::mpsc::UnboundedSender;
use tools::{Tool, ToolError, ToolSpec};

/// One scripted model reply.
pub enum Step {
    /// Reply with `text`, reporting `usage` if given.
    Reply { text: String, usage: Option<Usage> },
    /// Send `chunks`, then fail with a network error.
    FailAfter { chunks: Vec<String>, error: String },
}

impl Step {
    pub fn reply(text: impl Into<String>) -> Self {
        Step::Reply {
            text: text.into(),
            usage: None,
        }
    }

    pub fn reply_with_usage(text: impl Into<String>, usage: Usage) -> Self {
        Step::Reply {
            text: text.into(),
            usage: Some(usage),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Step::FailAfter {
            chunks: Vec::new(),
            error: error.into(),
        }
    }
}

/// Model adapter that plays back scripted replies and records requests.
#[derive(Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<Vec<Message>>>,
    advertised: Vec<ToolSpec>,
}

impl ScriptedModel {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn advertised(&self) -> &[ToolSpec] {
        &self.advertised
    }

    fn next(&self, messages: &[Message]) -> Step {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("model called more often than scripted")
    }
}

impl ModelAdapter for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn max_tokens(&self) -> u32 {
        1024
    }

    fn advertise(&mut self, tools: &[ToolSpec]) {
        self.advertised = tools.to_vec();
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion, ModelError> {
        match self.next(messages) {
            Step::Reply { text, usage } => Ok(Completion {
                content: text,
                usage,
            }),
            Step::FailAfter { error, .. } => Err(ModelError::Network(error)),
        }
    }

    async fn stream(
        &self,
        messages: &[Message],
        chunks: UnboundedSender<String>,
    ) -> Result<Option<Usage>, ModelError> {
        match self.next(messages) {
            Step::Reply { text, usage } => {
                for piece in text.split_inclusive(' ') {
                    let _ = chunks.send(piece.to_string());
                }
                Ok(usage)
            }
            Step::FailAfter {
                chunks: sent,
                error,
            } => {
                for piece in sent {
                    let _ = chunks.send(piece);
                }
                Err(ModelError::Network(error))
            }
        }
    }
}

/// Tool that echoes its arguments, or always fails.
pub struct EchoTool {
    name: String,
    fail: bool,
}

impl EchoTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: true,
        }
    }
}

impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Echo the arguments back."
    }

    fn schema(&self) -> Value {
        serde_json::json!({"type": "object", "properties": {}, "required": []})
    }

    fn execute(&self, input: Value) -> Result<String, ToolError> {
        if self.fail {
            return Err(ToolError::Execution(format!("{} exploded", self.name)));
        }
        Ok(format!("{}: {input}", self.name))
    }
}
