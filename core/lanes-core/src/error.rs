//! Error types for lanes-core operations.

use std::path::PathBuf;

/// All errors that can occur in lanes-core operations.
///
/// Filesystem races on the signal channel are deliberately absent: the poll
/// path degrades to "no markers" instead of surfacing them.
#[derive(Debug, thiserror::Error)]
pub enum LanesError {
    // ─────────────────────────────────────────────────────────────────────
    // Identity Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid workspace id {id:?}: {reason}")]
    InvalidWorkspaceId { id: String, reason: &'static str },

    #[error("Workspace id not provided (pass --workspace or set {0})")]
    MissingWorkspaceId(&'static str),

    // ─────────────────────────────────────────────────────────────────────
    // Agent Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Unknown agent kind: {0}")]
    UnknownAgentKind(String),

    #[error("Agent kind disabled by configuration: {0}")]
    AgentKindDisabled(String),

    #[error("Agent kind {kind} tracks one marker per instance; an instance token is required")]
    MissingInstanceToken { kind: String },

    #[error("Agent kind {kind} uses a single marker per workspace; instance tokens are not allowed")]
    UnexpectedInstanceToken { kind: String },

    #[error("Invalid instance token {token:?}: {reason}")]
    InvalidInstanceToken { token: String, reason: &'static str },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Collaborator Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Git command failed: {command}: {details}")]
    GitCommandFailed { command: String, details: String },

    #[error("Failed to spawn terminal in {cwd}: {source}")]
    TerminalSpawnFailed {
        cwd: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Terminal not found: {0}")]
    TerminalNotFound(u64),

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Activity poll loop is already running; stop it before starting again")]
    PollLoopAlreadyRunning,

    #[error("Failed to spawn activity poll thread: {0}")]
    PollThreadSpawnFailed(#[source] std::io::Error),
}

impl LanesError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LanesError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using LanesError.
pub type Result<T> = std::result::Result<T, LanesError>;
