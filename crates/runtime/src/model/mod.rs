//! Model adapter trait and conversation types.

pub mod errors;
mod estimate;
pub mod types;

pub use errors::ModelError;
pub use estimate::{TOKENS_PER_WORD, estimate_tokens};
pub use types::{Completion, Message, ModelAdapter};
