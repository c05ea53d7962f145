//! Command-line access to stored Deckflow sessions.

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use deckflow::config::DeckflowConfig;
use deckflow::core::SessionAggregator;
use deckflow::store::{FileSubstrate, StageKind, StageRecordStore};
use log::{debug, info};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Command-line options for the session tool.
#[derive(Parser, Debug)]
#[command(name = "deckflow", version)]
struct Cli {
    /// Optional path to a deckflow.json5 config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Session store file; overrides `storage.path`
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List session summaries, newest first
    List,
    /// Show a session summary with its stage records
    Show { session_id: String },
    /// Print the progress label of a session
    Progress { session_id: String },
    /// Delete one stage record
    Remove { stage: StageKind, session_id: String },
    /// Delete records older than the configured or given age
    ClearExpired {
        #[arg(long)]
        max_age_ms: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    deckflow::init_logging();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let store_path = match cli.store.clone() {
        Some(path) => path,
        None => config
            .storage
            .resolve_path()
            .ok_or_else(|| anyhow!("no store path configured and no home directory found"))?,
    };
    info!("opening session store: {}", store_path.display());
    let substrate = FileSubstrate::open(&store_path)
        .with_context(|| format!("failed to open store {}", store_path.display()))?;
    let sessions = SessionAggregator::new(
        StageRecordStore::new(Arc::new(substrate)),
        config.sessions.clone(),
    );

    let output = run(&cli.command, &sessions)?;
    println!("{output}");
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DeckflowConfig> {
    if let Some(path) = path {
        info!("loading config from {}", path.display());
        return DeckflowConfig::load_from_path(path).context("failed to load config");
    }
    let cwd = std::env::current_dir().context("cwd")?;
    let layered = DeckflowConfig::load_layered(&cwd).context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    Ok(layered.config)
}

/// Execute a command and render its output.
fn run(command: &Command, sessions: &SessionAggregator) -> anyhow::Result<String> {
    match command {
        Command::List => to_json(&sessions.list_session_summaries()),
        Command::Show { session_id } => {
            let records = sessions.stage_records(session_id);
            if records.is_empty() {
                return Err(anyhow!("session {session_id} has no stage records"));
            }
            to_json(&json!({
                "summary": sessions.get_session_summary(session_id),
                "records": records,
            }))
        }
        Command::Progress { session_id } => Ok(sessions.get_progress(session_id)),
        Command::Remove { stage, session_id } => {
            sessions
                .store()
                .remove(*stage, session_id)
                .context("failed to remove stage record")?;
            Ok(format!("removed {}", stage.storage_key(session_id)))
        }
        Command::ClearExpired { max_age_ms } => {
            let removed = match max_age_ms {
                Some(max_age_ms) => sessions.clear_expired(Duration::from_millis(*max_age_ms)),
                None => sessions.clear_expired_with_policy(),
            }
            .context("failed to clear expired sessions")?;
            Ok(format!("removed {removed} expired record(s)"))
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("failed to encode output")
}
