mod config;
mod error;
mod render;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use console::style;
use runtime::{ModelAdapter, Provider, Registry, Role, Session, TurnOutcome};
use storage::{HistorySink, JsonHistory, Record, SqliteHistory, TurnSummary, summarize};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, HistoryFormat, HistorySection, Overrides};
use error::{Error, Result};
use render::ConsoleObserver;

#[derive(Parser)]
#[command(name = "tiller")]
#[command(about = "Chat with a language model that can use local file tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file [default: ./tiller.toml if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log runtime activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// List recorded exchanges
    Turns {
        /// Show only the last N exchanges
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show the messages of one exchange
    Show {
        /// Turn ID (prefix match supported)
        turn: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::discover(cli.config.as_deref())?;
    config.apply(&cli.overrides);

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(config, cli.overrides.workspace).await,
        Some(Commands::Turns { limit }) => cmd_turns(&config.history, limit),
        Some(Commands::Show { turn }) => cmd_show(&config.history, &turn),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,runtime=debug,tools=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_chat(config: Config, workspace: Option<PathBuf>) -> Result<()> {
    let (kind, model_config) = config.model_settings(|var| std::env::var(var).ok())?;
    let model = Provider::from_config(kind, model_config)?;

    let workspace = match workspace {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let registry = Registry::with_tools(tools::builtin(tools::Workspace::new(&workspace)))?;
    let history = open_history(&config.history)?;
    let show_stats = config.session.show_stats;

    println!("tiller v{}", env!("CARGO_PKG_VERSION"));
    println!("Model: {}", model.name());
    println!("Workspace: {}", workspace.display());
    println!("History: {}", config.history.path.display());
    println!("Type 'quit' or Ctrl+D to exit, '/stats' for statistics.\n");

    let mut session = Session::new(model, registry, history, config.session_options());
    info!(tools = session.registry().len(), "chat started");

    let mut lines = spawn_input();

    loop {
        print!("{} ", style("You:").blue().bold());
        io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.recv() => line,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            // EOF or interrupt at the prompt
            println!();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }
        if input == "/stats" {
            println!("{}\n", render::session_summary(session.stats()));
            continue;
        }

        print!("{} ", style("Assistant:").green().bold());
        io::stdout().flush()?;
        let mut observer = ConsoleObserver::new();
        let outcome = tokio::select! {
            outcome = session.submit(input, &mut observer) => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        observer.finish();

        match outcome {
            Some(Ok(TurnOutcome::Completed(report))) => {
                println!("\n");
                if show_stats {
                    println!("{}\n", style(render::turn_line(&report)).dim());
                }
            }
            Some(Ok(TurnOutcome::Skipped)) => println!(),
            Some(Err(e)) => {
                println!();
                eprintln!("{} {e}\n", style("Error:").red().bold());
            }
            None => {
                println!("\n{}", style("Interrupted.").yellow());
                break;
            }
        }
    }

    let stats = session.shutdown();
    if show_stats {
        println!("{}", render::session_summary(stats));
    }
    println!("Goodbye.");
    Ok(())
}

/// Read stdin lines on a dedicated thread so a pending read never holds up
/// shutdown.
fn spawn_input() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn cmd_turns(settings: &HistorySection, limit: usize) -> Result<()> {
    let history = open_existing_history(settings)?;
    let turns = summarize(&history.records()?);

    if turns.is_empty() {
        println!("No turns recorded.");
        return Ok(());
    }

    println!("{:<36}  {:<20}  {:<6}  TOKENS", "TURN ID", "STARTED", "MSGS");
    println!("{}", "-".repeat(80));

    let skip = turns.len().saturating_sub(limit);
    for summary in turns.into_iter().skip(skip) {
        let started = Local
            .from_utc_datetime(&summary.started_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        println!(
            "{:<36}  {:<20}  {:<6}  {}",
            summary.turn_id,
            started,
            summary.messages,
            summary.usage.total()
        );
    }

    Ok(())
}

fn cmd_show(settings: &HistorySection, prefix: &str) -> Result<()> {
    let history = open_existing_history(settings)?;
    let turns = summarize(&history.records()?);
    let turn = find_turn(&turns, prefix)?;

    println!("Turn: {}\n", turn.turn_id);
    for record in history.turn(turn.turn_id)? {
        print_record(&record);
    }

    Ok(())
}

/// Resolve a turn ID prefix to exactly one recorded exchange.
fn find_turn<'a>(turns: &'a [TurnSummary], prefix: &str) -> Result<&'a TurnSummary> {
    let matching: Vec<_> = turns
        .iter()
        .filter(|t| t.turn_id.to_string().starts_with(prefix))
        .collect();

    match matching.as_slice() {
        [] => Err(Error::TurnNotFound {
            prefix: prefix.to_string(),
        }),
        [turn] => Ok(*turn),
        _ => Err(Error::AmbiguousTurn {
            prefix: prefix.to_string(),
            matches: matching.iter().map(|t| t.turn_id.to_string()).collect(),
        }),
    }
}

fn print_record(record: &Record) {
    let time = Local
        .from_utc_datetime(&record.timestamp.naive_utc())
        .format("%H:%M:%S");
    let role = match record.role {
        Role::User => "USER",
        Role::Assistant => "ASSISTANT",
        Role::System => "SYSTEM",
    };
    println!(
        "[{time}] {role} ({}, in={} out={}): {}",
        record.model,
        record.usage.input_tokens,
        record.usage.output_tokens,
        render::truncate(&record.content, 500)
    );
}

fn open_history(settings: &HistorySection) -> Result<Box<dyn HistorySink>> {
    let path = &settings.path;
    match settings.format {
        HistoryFormat::Json => Ok(Box::new(JsonHistory::open(path)?)),
        HistoryFormat::Sqlite => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Box::new(SqliteHistory::open(path)?))
        }
    }
}

/// Open history for reading without creating it.
fn open_existing_history(settings: &HistorySection) -> Result<Box<dyn HistorySink>> {
    if !Path::new(&settings.path).exists() {
        return Err(Error::HistoryNotFound {
            path: settings.path.clone(),
        });
    }
    open_history(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{TurnId, Usage};

    fn summary(turn_id: TurnId) -> TurnSummary {
        TurnSummary {
            turn_id,
            started_at: chrono::Utc::now(),
            messages: 2,
            usage: Usage::default(),
        }
    }

    #[test]
    fn turn_prefixes_must_be_unique() {
        let a: TurnId = "aaaa1111-0000-4000-8000-000000000000".parse().unwrap();
        let b: TurnId = "aaaa2222-0000-4000-8000-000000000000".parse().unwrap();
        let turns = [summary(a), summary(b)];

        assert_eq!(find_turn(&turns, "aaaa1").unwrap().turn_id, a);
        assert!(matches!(
            find_turn(&turns, "aaaa"),
            Err(Error::AmbiguousTurn { matches, .. }) if matches.len() == 2
        ));
        assert!(matches!(
            find_turn(&turns, "ffff"),
            Err(Error::TurnNotFound { .. })
        ));
    }

    #[test]
    fn missing_history_is_reported_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let settings = HistorySection {
            path: dir.path().join("history.json"),
            format: HistoryFormat::Json,
        };

        assert!(matches!(
            open_existing_history(&settings),
            Err(Error::HistoryNotFound { .. })
        ));
        assert!(!settings.path.exists());
    }

    #[test]
    fn history_formats_open_their_sinks() {
        let dir = tempfile::tempdir().unwrap();
        for (format, name) in [(HistoryFormat::Json, "h.json"), (HistoryFormat::Sqlite, "nested/h.db")] {
            let settings = HistorySection {
                path: dir.path().join(name),
                format,
            };
            let sink = open_history(&settings).unwrap();
            let record = Record::new(TurnId::new(), Role::User, "hi", "test", Usage::input(1));
            sink.append(&record).unwrap();

            let reopened = open_existing_history(&settings).unwrap();
            let records = reopened.records().unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].id, record.id);
            assert_eq!(records[0].content, "hi");
        }
    }
}
