//! Append-only conversation history for Tiller.
//!
//! Every message exchanged during a chat session is persisted as a
//! [`Record`]: who said it, what was said, which model was involved, and the
//! token usage attributed to it. Records that belong to the same user
//! exchange share a [`TurnId`], so an exchange (user input, any tool
//! round-trips, and the final reply) can be reconstructed later.
//!
//! # Sinks
//!
//! [`HistorySink`] is the interface the runtime writes to. Three
//! implementations are provided:
//!
//! - [`JsonHistory`] — a human-readable JSON array file.
//! - [`SqliteHistory`] — a SQLite database, suited to long histories.
//! - [`MemoryHistory`] — in-process only, for tests or ephemeral sessions.
//!
//! # Example
//!
//! ```no_run
//! use storage::{HistorySink, JsonHistory, Record, Role, TurnId, Usage};
//!
//! let history = JsonHistory::open("chat_history.json")?;
//! let turn = TurnId::new();
//! history.append(&Record::new(turn, Role::User, "hello", "ollama-llama2", Usage::input(1)))?;
//!
//! for summary in storage::summarize(&history.records()?) {
//!     println!("{}: {} messages", summary.turn_id, summary.messages);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod json;
mod record;
mod sink;
mod sqlite;

pub use error::{Error, Result};
pub use json::JsonHistory;
pub use record::{Record, Role, TurnId, Usage};
pub use sink::{HistorySink, MemoryHistory, TurnSummary, summarize};
pub use sqlite::SqliteHistory;
