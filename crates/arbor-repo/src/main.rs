//! `arbor-journal`: prints the persisted event journal as JSON lines.
//!
//! Usage: `arbor-journal [config.toml]`. The path restriction (matched deep)
//! and the event types to print come from `ARBOR_JOURNAL_FILTER_PATH` and
//! `ARBOR_JOURNAL_FILTER_TYPES` (comma-separated labels, e.g.
//! `NODE_ADDED,NODE_REMOVED`).

use std::io::Write;
use std::process::ExitCode;

use arbor_observe::ObservationManager;
use arbor_repo::config::{self, Config};
use arbor_repo::{journal_filter, Repository};
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("ARBOR_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr; stdout carries the journal.
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run(config: &Config) -> Result<usize, Box<dyn std::error::Error>> {
    let filter = journal_filter(
        std::env::var("ARBOR_JOURNAL_FILTER_PATH").ok().as_deref(),
        std::env::var("ARBOR_JOURNAL_FILTER_TYPES").ok().as_deref(),
    )?;

    let repo = Repository::open(&config.journal)?;
    let session = repo.login("arbor-journal")?;
    let Some(journal) = session.observation_manager().event_journal(&filter)? else {
        return Err("event journal is disabled in the configuration".into());
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut printed = 0;
    for event in journal {
        serde_json::to_writer(&mut out, &event)?;
        out.write_all(b"\n")?;
        printed += 1;
    }
    out.flush()?;
    Ok(printed)
}

fn main() -> ExitCode {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("arbor.toml"));

    let config = match config::load_config(selected_config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("arbor-journal: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    match run(&config) {
        Ok(printed) => {
            tracing::info!(events = printed, "journal dump complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "journal dump failed");
            ExitCode::FAILURE
        }
    }
}
