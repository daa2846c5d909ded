mod config;
mod parse;
mod sessions;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::{broadcast, mpsc};

use twchart_logging::{init_tracing, LogFormat};
use twchart_sessions::{RowPolicy, SessionStore, SessionWatcher};

use crate::config::Config;
use crate::sessions::SessionsAction;

#[derive(Parser, Debug)]
#[command(
    name = "twchart",
    about = "Chart process logs against probe temperatures",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Log level (overrides twchart.toml; RUST_LOG overrides both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Sessions directory (overrides twchart.toml)
    #[arg(long, global = true)]
    sessions_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a log and print the session
    Parse {
        /// Path to the log file
        log: PathBuf,

        /// Sensor CSV (default: the log's sibling .csv, if present)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print chart bounds, stage areas and probe series as JSON
    Chart {
        /// Path to the log file
        log: PathBuf,

        /// Sensor CSV (default: the log's sibling .csv, if present)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Convert a fixed-stage bread JSON record to a session
    Legacy {
        /// Path to the JSON record
        path: PathBuf,
    },

    /// Manage stored sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },

    /// Watch the sessions directory and report reloads until Ctrl+C
    Watch,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let config = Config::load(&working_dir)?.unwrap_or_default();

    init_tracing(config.log_level(cli.log_level.as_deref()), cli.log_format.into());

    let policy = config.row_errors;

    match cli.command {
        Command::Parse { log, csv, json } => {
            parse::handle_parse(&log, csv.as_deref(), json, policy)
        }
        Command::Chart { log, csv } => parse::handle_chart(&log, csv.as_deref(), policy),
        Command::Legacy { path } => parse::handle_legacy(&path),
        Command::Sessions { action } => {
            let store = open_store(&config, cli.sessions_dir)?;
            sessions::handle_sessions_command(&store, action)
        }
        Command::Watch => {
            let store = open_store(&config, cli.sessions_dir)?;
            watch(store.sessions_dir().clone(), policy).await
        }
    }
}

fn open_store(config: &Config, flag: Option<PathBuf>) -> Result<SessionStore> {
    let store = match config.sessions_dir(flag) {
        Some(dir) => SessionStore::with_dir(dir),
        None => SessionStore::new()?,
    };
    Ok(store.with_row_policy(config.row_errors))
}

async fn watch(sessions_dir: PathBuf, policy: RowPolicy) -> Result<()> {
    std::fs::create_dir_all(&sessions_dir)
        .with_context(|| format!("Failed to create sessions dir: {:?}", sessions_dir))?;

    let watcher = SessionWatcher::with_policy(sessions_dir.clone(), policy)?;
    let mut events = watcher.subscribe();

    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("Failed to set Ctrl+C handler")?;

    eprintln!("Watching {} (Ctrl+C to stop)", sessions_dir.display());

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            event = events.recv() => match event {
                Ok(event) => ui::print_session_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped session events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}
