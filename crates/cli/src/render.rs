//! Terminal output for the chat loop.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use runtime::{SessionStats, ToolCall, TurnObserver, TurnReport};
use std::io::{self, Write};
use std::time::Duration;

/// Lines of tool output echoed to the terminal.
const TOOL_PREVIEW_LINES: usize = 8;

/// Prints streamed replies and tool activity, with a spinner while the
/// model has not answered yet.
#[derive(Default)]
pub struct ConsoleObserver {
    spinner: Option<ProgressBar>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the spinner, if one is showing.
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl TurnObserver for ConsoleObserver {
    fn model_started(&mut self) {
        self.finish();
        let spinner = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg}") {
            spinner.set_style(template);
        }
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn chunk(&mut self, text: &str) {
        self.finish();
        let mut stdout = io::stdout();
        let _ = write!(stdout, "{text}");
        let _ = stdout.flush();
    }

    fn tool_started(&mut self, call: &ToolCall) {
        self.finish();
        println!();
        println!("{}", style(format!("[Running {}]", call.name)).yellow().bold());
    }

    fn tool_finished(&mut self, _call: &ToolCall, output: &str) {
        println!("{}", style(preview(output, TOOL_PREVIEW_LINES)).dim());
        print!("{} ", style("Assistant:").green().bold());
        let _ = io::stdout().flush();
    }
}

impl Drop for ConsoleObserver {
    fn drop(&mut self) {
        self.finish();
    }
}

/// First `lines` lines of `text`, noting how many were left out.
pub fn preview(text: &str, lines: usize) -> String {
    let total = text.lines().count();
    let more = format!("... ({} more lines)", total.saturating_sub(lines));
    let mut shown: Vec<&str> = text.lines().take(lines).collect();
    if total > lines {
        shown.push(&more);
    }
    shown.join("\n")
}

/// One-line usage summary for a completed turn.
pub fn turn_line(report: &TurnReport) -> String {
    let approx = if report.estimated { "~" } else { "" };
    format!(
        "[Stats] Input: {approx}{} tokens | Output: {approx}{} tokens | Time: {}",
        report.usage.input_tokens,
        report.usage.output_tokens,
        format_duration(report.elapsed)
    )
}

/// Multi-line summary of the whole session.
pub fn session_summary(stats: &SessionStats) -> String {
    let approx = if stats.approximate { " (estimated)" } else { "" };
    [
        "Session statistics".to_string(),
        format!("  Turns:            {}", stats.turns),
        format!("  Input tokens:     {}{approx}", stats.input_tokens),
        format!("  Output tokens:    {}{approx}", stats.output_tokens),
        format!(
            "  Total tokens:     {}{approx}",
            stats.input_tokens + stats.output_tokens
        ),
        format!("  Model time:       {}", format_duration(stats.model_time)),
        format!("  Average response: {}", format_duration(stats.average_response())),
        format!("  Session length:   {}", format_duration(stats.elapsed())),
    ]
    .join("\n")
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        let whole = duration.as_secs();
        format!("{}m{:02}s", whole / 60, whole % 60)
    }
}

/// Truncate `text` to at most `max` characters, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::{TurnId, Usage};

    #[test]
    fn preview_notes_hidden_lines() {
        assert_eq!(preview("a\nb", 5), "a\nb");
        assert_eq!(preview("a\nb\nc\nd", 2), "a\nb\n... (2 more lines)");
        assert_eq!(preview("", 3), "");
    }

    #[test]
    fn durations_read_naturally() {
        assert_eq!(format_duration(Duration::from_millis(1234)), "1.23s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
    }

    #[test]
    fn truncation_respects_characters() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn turn_line_marks_estimates() {
        let mut report = TurnReport {
            turn_id: TurnId::new(),
            reply: "hi".into(),
            tool_calls: vec![],
            usage: Usage::new(12, 34),
            estimated: false,
            elapsed: Duration::from_millis(500),
        };
        assert_eq!(
            turn_line(&report),
            "[Stats] Input: 12 tokens | Output: 34 tokens | Time: 0.50s"
        );

        report.estimated = true;
        assert!(turn_line(&report).contains("Input: ~12 tokens"));
    }

    #[test]
    fn summary_lists_totals() {
        let stats = SessionStats::default();
        let summary = session_summary(&stats);
        assert!(summary.starts_with("Session statistics"));
        assert!(summary.contains("Turns:            0"));
        assert!(summary.contains("Average response: 0.00s"));
    }
}
