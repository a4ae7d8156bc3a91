//! # lanes-core
//!
//! Workspace activity tracking for Lanes: which workspaces have a coding
//! agent working right now, and which finished while the user was looking
//! elsewhere.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. The poll loop is one thread.
//! - **Filesystem as transport**: Agents signal through marker files written by
//!   `lanes-hook`; nothing calls back into the host.
//! - **Graceful degradation**: Missing directories read as "no markers", not errors.
//! - **Single owner**: [`WorkspaceDirectory`] holds all activity state; everything
//!   else reaches it through [`ActivitySink`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lanes_core::{load_config, AgentRegistry, PollLoop, WorkspaceDirectory};
//!
//! let config = load_config(None)?;
//! let directory = Arc::new(WorkspaceDirectory::new());
//! let poll = PollLoop::new(&config, AgentRegistry::new(config.agents.clone()), directory.clone());
//! poll.start()?;
//! ```

pub mod activity;
pub mod agents;
pub mod config;
pub mod error;
pub mod types;
pub mod workspace;

pub use activity::{
    ActivityEvent, ActivityMarker, ActivityReconciler, ActivitySink, PollLoop, Snapshot,
    Transition, WorkspaceActivityState, WorkspaceDirectory,
};
pub use agents::{AgentConfig, AgentKind, AgentRegistry, MarkerRule};
pub use config::*;
pub use error::{LanesError, Result};
pub use types::*;
pub use workspace::{
    GitWorktrees, ProcessTerminals, TerminalHost, TerminalId, TerminalRequest, Workspace,
    WorktreeProvider, WorktreeRequest,
};
