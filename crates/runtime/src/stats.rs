//! Session statistics.

use std::time::{Duration, Instant};
use storage::Usage;

/// Running totals for a chat session.
///
/// Updated only when a turn completes; aborted and skipped turns leave it
/// untouched.
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub turns: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Wall time spent resolving completed turns.
    pub model_time: Duration,
    pub last_response: Duration,
    pub started: Instant,
    /// At least one count was estimated rather than reported by the backend.
    pub approximate: bool,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            turns: 0,
            input_tokens: 0,
            output_tokens: 0,
            model_time: Duration::ZERO,
            last_response: Duration::ZERO,
            started: Instant::now(),
            approximate: false,
        }
    }

    pub(crate) fn record_turn(&mut self, usage: Usage, elapsed: Duration, estimated: bool) {
        self.turns += 1;
        self.input_tokens += u64::from(usage.input_tokens);
        self.output_tokens += u64::from(usage.output_tokens);
        self.model_time += elapsed;
        self.last_response = elapsed;
        self.approximate |= estimated;
    }

    /// Time since the session started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn average_response(&self) -> Duration {
        if self.turns == 0 {
            Duration::ZERO
        } else {
            self.model_time / self.turns
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
