//! lanes-hook: lets coding agents report workspace activity to Lanes.
//!
//! Called from agent hook configuration (e.g. `~/.claude/settings.json`).
//! The owning workspace comes from `--workspace` or `LANES_WORKSPACE_ID`,
//! which Lanes injects into every terminal it spawns.
//!
//! ## Subcommands
//!
//! - `start` / `stop`: create or remove this agent's activity marker
//! - `notify`: one-shot "finished, look at me" signal
//! - `handle`: reads a hook JSON payload from stdin and does one of the above

mod context;
mod error;
mod handle;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::context::HookContext;

#[derive(Parser)]
#[command(name = "lanes-hook")]
#[command(about = "Reports coding agent activity for Lanes workspaces")]
#[command(version)]
struct Cli {
    /// Workspace id (defaults to $LANES_WORKSPACE_ID)
    #[arg(long, global = true)]
    workspace: Option<String>,

    /// Config file (defaults to $LANES_CONFIG, then ~/.lanes/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mark the agent as working
    Start {
        /// Agent kind (claude, codex, opencode, amp)
        #[arg(long)]
        kind: String,

        /// Instance token for per-instance kinds (defaults to the parent pid)
        #[arg(long)]
        instance: Option<String>,
    },

    /// Mark the agent as finished
    Stop {
        /// Agent kind (claude, codex, opencode, amp)
        #[arg(long)]
        kind: String,

        /// Instance token for per-instance kinds (defaults to the parent pid)
        #[arg(long)]
        instance: Option<String>,
    },

    /// Signal that the workspace needs attention
    Notify,

    /// Handle a hook event (reads JSON from stdin)
    Handle {
        /// Agent kind the payload comes from
        #[arg(long, default_value = "claude")]
        kind: String,
    },
}

fn run(cli: Cli) -> error::Result<()> {
    let ctx = HookContext::load(cli.config, cli.workspace)?;

    match cli.command {
        Commands::Start { kind, instance } => {
            ctx.start(&kind, instance)?;
        }
        Commands::Stop { kind, instance } => {
            ctx.stop(&kind, instance)?;
        }
        Commands::Notify => {
            ctx.notify()?;
        }
        Commands::Handle { kind } => handle::run(&ctx, &kind)?,
    }
    Ok(())
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "lanes-hook failed");
        std::process::exit(1);
    }
}
