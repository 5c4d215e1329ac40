use super::errors::ModelError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use storage::{Role, Usage};
use tokio::sync::mpsc::UnboundedSender;
use tools::ToolSpec;

/// A message in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A complete, non-streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    /// Usage reported by the backend, if it reports any.
    pub usage: Option<Usage>,
}

/// Trait for model backends.
///
/// Every call to [`complete`](ModelAdapter::complete) or
/// [`stream`](ModelAdapter::stream) yields exactly one logical reply.
/// Concatenating the streamed chunks in arrival order gives the same text
/// `complete` would have returned.
pub trait ModelAdapter: Send + Sync {
    /// Identifier recorded alongside persisted messages.
    fn name(&self) -> &str;

    /// Maximum number of tokens the backend may generate per reply.
    fn max_tokens(&self) -> u32;

    /// Tell the backend which tools exist. Whether it ever asks for one is
    /// up to the backend.
    fn advertise(&mut self, tools: &[ToolSpec]);

    /// Generate a whole reply.
    fn complete(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<Completion, ModelError>> + Send;

    /// Generate a reply, sending text fragments to `chunks` as they arrive.
    ///
    /// Returns the backend's own usage figures, or `None` when it reports
    /// none and the caller has to estimate. No chunk is sent after the
    /// future resolves.
    fn stream(
        &self,
        messages: &[Message],
        chunks: UnboundedSender<String>,
    ) -> impl Future<Output = Result<Option<Usage>, ModelError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(Message::user("a").role, Role::User);
        assert_eq!(Message::assistant("b").role, Role::Assistant);
        assert_eq!(Message::system("c").role, Role::System);
    }

    #[test]
    fn message_serializes_with_lowercase_role() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }
}
