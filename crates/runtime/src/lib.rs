//! Tiller runtime: turn coordination between a user, a model and local tools.
//!
//! The runtime is organized around these concepts:
//!
//! - **Session**: owns the transcript and resolves one exchange at a time,
//!   executing any tool the model asks for and feeding the result back.
//! - **ModelAdapter**: a trait abstracting model backends. Adapters for the
//!   Anthropic, OpenAI and Ollama APIs live in [`providers`].
//! - **Interpreter**: detects tool requests in reply text, whichever of the
//!   supported encodings the backend used.
//! - **Registry**: the tools a model may invoke, keyed by name.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{ModelConfig, Provider, ProviderKind, Registry, Session, SessionOptions, Silent};
//! use storage::MemoryHistory;
//!
//! # async fn example() -> runtime::Result<()> {
//! let mut config = ModelConfig::new("claude-3-7-sonnet-latest");
//! config.api_key = Some("sk-ant-api01-...".into());
//! let model = Provider::from_config(ProviderKind::Anthropic, config)?;
//! let registry = Registry::with_tools(tools::builtin(tools::Workspace::new(".")))?;
//!
//! let mut session = Session::new(
//!     model,
//!     registry,
//!     Box::new(MemoryHistory::new()),
//!     SessionOptions::default(),
//! );
//! session.submit("What files are here?", &mut Silent).await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod interpreter;
pub mod model;
pub mod providers;
mod registry;
mod session;
mod stats;

#[cfg(test)]
mod testing;

// Error types
pub use error::{Error, Result};

// Model seam
pub use model::{Completion, Message, ModelAdapter, ModelError, estimate_tokens};
pub use providers::{ModelConfig, Provider, ProviderKind};

// Tool requests
pub use interpreter::{Detection, ToolCall, WireFormat, interpret};
pub use registry::Registry;

// Turn coordination
pub use session::{
    Session, SessionOptions, Silent, TurnObserver, TurnOutcome, TurnReport, TurnState,
    system_prompt,
};
pub use stats::SessionStats;

pub use storage::{Role, TurnId, Usage};
