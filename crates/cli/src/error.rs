//! CLI error types.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The history file does not exist.
    ///
    /// This typically means no conversation has been recorded yet.
    #[error("history not found at {path}. Run 'tiller chat' first")]
    HistoryNotFound { path: PathBuf },

    /// No recorded exchange matches the given prefix.
    #[error("no turn found matching '{prefix}'")]
    TurnNotFound { prefix: String },

    /// Multiple exchanges match the given prefix.
    ///
    /// The user should provide a longer prefix to disambiguate.
    #[error("multiple turns match '{prefix}': {matches:?}")]
    AmbiguousTurn {
        prefix: String,
        matches: Vec<String>,
    },

    /// Configuration is invalid or missing required fields.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred in the runtime layer.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
