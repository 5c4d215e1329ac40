//! Turn coordination.
//!
//! A [`Session`] owns the transcript and drives one exchange at a time:
//! user input goes to the model, tool requests in the reply are executed
//! and their output fed back, and the loop ends when the model answers
//! without asking for a tool.

use crate::interpreter::{Detection, RESULT_OPEN, TOOL_OPEN, ToolCall, interpret, wrap_result};
use crate::model::{Message, ModelAdapter, estimate_tokens};
use crate::registry::Registry;
use crate::stats::SessionStats;
use crate::{Error, Result};
use std::time::{Duration, Instant};
use storage::{HistorySink, Record, TurnId, Usage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where the coordinator is in the current exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingInput,
    ModelRequested,
    ToolRequested,
    ToolExecuting,
    TurnComplete,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Request streamed replies instead of whole completions.
    pub stream: bool,
    /// Tool round-trips allowed per exchange. Requests past the limit are
    /// treated as ordinary content.
    pub max_tool_rounds: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            stream: true,
            max_tool_rounds: 8,
        }
    }
}

/// Receives progress notifications while a turn runs.
///
/// Every method has an empty default so observers implement only what
/// they display.
pub trait TurnObserver {
    /// A model request is about to be sent.
    fn model_started(&mut self) {}

    /// A fragment of reply text arrived. In non-streaming mode this is
    /// called once with the whole reply.
    fn chunk(&mut self, _text: &str) {}

    fn tool_started(&mut self, _call: &ToolCall) {}

    fn tool_finished(&mut self, _call: &ToolCall, _output: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl TurnObserver for Silent {}

/// Summary of a completed exchange.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub turn_id: TurnId,
    /// The model's final reply.
    pub reply: String,
    /// Tools executed during the exchange, in order.
    pub tool_calls: Vec<ToolCall>,
    /// Summed over every model request in the exchange.
    pub usage: Usage,
    /// At least one request's usage was estimated.
    pub estimated: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// Input was empty; nothing happened.
    Skipped,
    Completed(TurnReport),
}

/// A single model reply together with the usage attributed to it.
struct Reply {
    text: String,
    usage: Usage,
    estimated: bool,
}

/// A chat session: transcript, tools, model and history.
pub struct Session<M> {
    model: M,
    registry: Registry,
    history: Box<dyn HistorySink>,
    transcript: Vec<Message>,
    stats: SessionStats,
    state: TurnState,
    options: SessionOptions,
}

impl<M: ModelAdapter> Session<M> {
    /// Create a session. The registry's tools are advertised to the model
    /// and described in the opening system message.
    pub fn new(
        mut model: M,
        registry: Registry,
        history: Box<dyn HistorySink>,
        options: SessionOptions,
    ) -> Self {
        model.advertise(&registry.specs());
        let transcript = vec![Message::system(system_prompt(&registry))];
        info!(model = model.name(), tools = registry.len(), "session started");

        Self {
            model,
            registry,
            history,
            transcript,
            stats: SessionStats::new(),
            state: TurnState::AwaitingInput,
            options,
        }
    }

    /// Resolve one exchange.
    ///
    /// Empty input is skipped without touching the transcript. On error
    /// the messages committed so far stay in the transcript and history,
    /// statistics are left unchanged, and the session is ready for the
    /// next input.
    pub async fn submit(
        &mut self,
        input: &str,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome> {
        if self.state == TurnState::Shutdown {
            return Err(Error::InvalidState("session has shut down".into()));
        }
        // A previous turn may have been abandoned mid-flight.
        self.state = TurnState::AwaitingInput;
        if input.trim().is_empty() {
            return Ok(TurnOutcome::Skipped);
        }

        let result = self.run_turn(input, observer).await;
        self.state = TurnState::AwaitingInput;
        result.map(TurnOutcome::Completed)
    }

    async fn run_turn(
        &mut self,
        input: &str,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnReport> {
        let turn_id = TurnId::new();
        let started = Instant::now();
        debug!(turn = %turn_id, "turn started");

        self.commit(
            turn_id,
            Message::user(input),
            Usage::input(estimate_tokens(input)),
        );

        let mut usage = Usage::default();
        let mut estimated = false;
        let mut tool_calls = Vec::new();

        let reply = loop {
            self.state = TurnState::ModelRequested;
            let reply = self.request(observer).await?;
            usage += reply.usage;
            estimated |= reply.estimated;

            let call = self.requested_tool(&reply.text, tool_calls.len());
            self.commit(turn_id, Message::assistant(&reply.text), reply.usage);

            let Some(call) = call else {
                self.state = TurnState::TurnComplete;
                break reply.text;
            };

            self.state = TurnState::ToolRequested;
            observer.tool_started(&call);
            self.state = TurnState::ToolExecuting;
            debug!(turn = %turn_id, tool = %call.name, "executing tool");
            let output = self
                .registry
                .invoke(&call.name, call.arguments.clone())
                .map_err(|source| Error::Tool {
                    name: call.name.clone(),
                    source,
                })?;
            observer.tool_finished(&call, &output);

            let feedback = wrap_result(&output);
            let feedback_usage = Usage::input(estimate_tokens(&feedback));
            self.commit(turn_id, Message::user(feedback), feedback_usage);
            tool_calls.push(call);
        };

        let elapsed = started.elapsed();
        self.stats.record_turn(usage, elapsed, estimated);
        debug!(
            turn = %turn_id,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            tools = tool_calls.len(),
            "turn complete"
        );

        Ok(TurnReport {
            turn_id,
            reply,
            tool_calls,
            usage,
            estimated,
            elapsed,
        })
    }

    /// Send the transcript to the model and collect one reply.
    async fn request(&self, observer: &mut dyn TurnObserver) -> Result<Reply> {
        observer.model_started();

        if !self.options.stream {
            let completion = self.model.complete(&self.transcript).await?;
            observer.chunk(&completion.content);
            return Ok(self.attribute(completion.content, completion.usage));
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let mut text = String::new();
        let drain = async {
            while let Some(chunk) = rx.recv().await {
                observer.chunk(&chunk);
                text.push_str(&chunk);
            }
        };
        let (reported, ()) = tokio::join!(self.model.stream(&self.transcript, tx), drain);
        let reported = reported?;
        Ok(self.attribute(text, reported))
    }

    /// Pair a reply with its usage, estimating when the backend gave none.
    fn attribute(&self, text: String, reported: Option<Usage>) -> Reply {
        match reported {
            Some(usage) => Reply {
                text,
                usage,
                estimated: false,
            },
            None => {
                let prompt = self
                    .transcript
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                let usage = Usage::new(estimate_tokens(&prompt), estimate_tokens(&text));
                Reply {
                    text,
                    usage,
                    estimated: true,
                }
            }
        }
    }

    /// The tool the reply asks for, if it is registered and the round
    /// limit allows another call.
    fn requested_tool(&self, reply: &str, rounds: usize) -> Option<ToolCall> {
        let Detection::Call { call, format } = interpret(reply) else {
            return None;
        };
        if self.registry.lookup(&call.name).is_none() {
            warn!(tool = %call.name, ?format, "reply names an unknown tool; treating as content");
            return None;
        }
        if rounds >= self.options.max_tool_rounds {
            warn!(
                tool = %call.name,
                limit = self.options.max_tool_rounds,
                "tool round limit reached; treating request as content"
            );
            return None;
        }
        Some(call)
    }

    /// Append a message to the transcript and persist it. Persistence
    /// failures are logged and never interrupt the turn.
    fn commit(&mut self, turn_id: TurnId, message: Message, usage: Usage) {
        let record = Record::new(
            turn_id,
            message.role,
            message.content.as_str(),
            self.model.name(),
            usage,
        );
        if let Err(e) = self.history.append(&record) {
            warn!(turn = %turn_id, error = %e, "failed to persist message");
        }
        self.transcript.push(message);
    }

    /// Stop accepting input. Further calls to [`submit`](Self::submit) fail.
    pub fn shutdown(&mut self) -> &SessionStats {
        self.state = TurnState::Shutdown;
        info!(turns = self.stats.turns, "session ended");
        &self.stats
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Every message sent or received so far, starting with the system
    /// message.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Opening system message listing the available tools.
pub fn system_prompt(registry: &Registry) -> String {
    if registry.is_empty() {
        return "You are a helpful assistant.".to_string();
    }
    format!(
        "You are a helpful assistant that can use these tools:\n\n{}\n\n\
         To use a tool, reply with {TOOL_OPEN}{{\"name\": \"<tool>\", \"arguments\": {{...}}}}</tool>. \
         The tool's output comes back wrapped in {RESULT_OPEN}...</result>. \
         Say what you are doing and report what each tool returned.",
        registry.descriptions()
    )
}
