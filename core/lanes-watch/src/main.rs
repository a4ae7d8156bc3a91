//! lanes-watch: runs the activity poll loop and prints workspace transitions.
//!
//! Transitions go to stdout, one per line. Stdin takes focus/removal
//! commands, so a host UI (or a person) can drive the directory from a
//! second thread while the poll thread runs. EOF or `quit` stops the loop.

mod commands;

use clap::Parser;
use std::env;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lanes_core::{
    load_config, ActivityEvent, AgentRegistry, LanesConfig, PollLoop, WorkspaceDirectory,
};

use crate::commands::{apply_command, parse_command, render_event, OutputFormat, WatchCommand};

#[derive(Parser)]
#[command(name = "lanes-watch")]
#[command(about = "Watches Lanes workspaces for agent activity")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $LANES_CONFIG, then ~/.lanes/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Poll interval in milliseconds (overrides config)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Print transitions and status as JSON lines
    #[arg(long)]
    json: bool,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let config = resolve_config(cli.config, cli.interval_ms);
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let directory = Arc::new(WorkspaceDirectory::new());
    let poll = PollLoop::new(
        &config,
        AgentRegistry::new(config.agents.clone()),
        directory.clone(),
    );
    spawn_printer(poll.subscribe(), format);

    if let Err(err) = poll.start() {
        error!(error = %err, "Failed to start activity poll loop");
        std::process::exit(1);
    }
    info!(
        activity_dir = %config.activity_dir.display(),
        notify_dir = %config.notify_dir.display(),
        interval_ms = config.poll_interval().as_millis() as u64,
        "lanes-watch started"
    );

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "Failed to read stdin; shutting down");
                break;
            }
        };
        match parse_command(&line) {
            Ok(Some(WatchCommand::Quit)) => break,
            Ok(Some(command)) => {
                if let Some(output) = apply_command(command, &directory, format) {
                    println!("{output}");
                }
            }
            Ok(None) => {}
            Err(message) => warn!(input = %line.trim(), "{message}"),
        }
    }

    poll.stop();
    info!("lanes-watch stopped");
}

fn init_logging() {
    let debug_enabled = env::var("LANES_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // stdout carries transitions.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// A broken config file should not take the watcher down.
fn resolve_config(path: Option<PathBuf>, interval_ms: Option<u64>) -> LanesConfig {
    let mut config = match load_config(path) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "Failed to load config; using defaults");
            LanesConfig::default().apply_overrides(|key| env::var(key).ok())
        }
    };
    if let Some(ms) = interval_ms {
        config.poll_interval_ms = ms;
    }
    config
}

fn spawn_printer(events: Receiver<ActivityEvent>, format: OutputFormat) {
    thread::spawn(move || {
        for event in events {
            println!("{}", render_event(&event, format));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "poll_interval_ms = [").expect("write config");

        let config = resolve_config(Some(path), Some(200));
        assert_eq!(config.poll_interval_ms, 200);
    }

    #[test]
    fn test_config_file_is_used() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "poll_interval_ms = 750").expect("write config");

        let config = resolve_config(Some(path), None);
        if env::var(lanes_core::POLL_INTERVAL_ENV).is_err() {
            assert_eq!(config.poll_interval_ms, 750);
        }
    }
}
