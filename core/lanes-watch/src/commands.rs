//! Line commands read from stdin, and the text the watcher prints.
//!
//! ```text
//! focus <id>     focus a workspace (clears its unread flag)
//! unfocus        nothing focused
//! remove <id>    stop tracking a workspace
//! add <id>       track a previously removed workspace again
//! status         print active / unread / focused
//! quit           stop the poll loop and exit
//! ```

use chrono::SecondsFormat;
use lanes_core::{ActivityEvent, Transition, WorkspaceActivityState, WorkspaceDirectory, WorkspaceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Focus(WorkspaceId),
    Unfocus,
    Remove(WorkspaceId),
    Add(WorkspaceId),
    Status,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<WatchCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let argument = parts.next();
    if parts.next().is_some() {
        return Err(format!("too many arguments for {verb}"));
    }

    let workspace = |verb: &str| -> Result<WorkspaceId, String> {
        let raw = argument.ok_or_else(|| format!("{verb} needs a workspace id"))?;
        WorkspaceId::new(raw).map_err(|err| err.to_string())
    };

    let command = match verb {
        "focus" => WatchCommand::Focus(workspace(verb)?),
        "remove" => WatchCommand::Remove(workspace(verb)?),
        "add" => WatchCommand::Add(workspace(verb)?),
        "unfocus" | "status" | "quit" if argument.is_some() => {
            return Err(format!("{verb} takes no arguments"));
        }
        "unfocus" => WatchCommand::Unfocus,
        "status" => WatchCommand::Status,
        "quit" | "exit" => WatchCommand::Quit,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(command))
}

/// Applies a command to the directory. Returns text to print, if any.
pub fn apply_command(
    command: WatchCommand,
    directory: &WorkspaceDirectory,
    format: OutputFormat,
) -> Option<String> {
    match command {
        WatchCommand::Focus(workspace) => {
            tracing::debug!(workspace = %workspace, "Focus changed");
            directory.on_focus_changed(Some(workspace));
            None
        }
        WatchCommand::Unfocus => {
            directory.on_focus_changed(None);
            None
        }
        WatchCommand::Remove(workspace) => {
            directory.on_workspace_removed(&workspace);
            None
        }
        WatchCommand::Add(workspace) => {
            directory.register_workspace(&workspace);
            None
        }
        WatchCommand::Status => Some(render_status(&directory.snapshot(), format)),
        WatchCommand::Quit => None,
    }
}

pub fn render_event(event: &ActivityEvent, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return serde_json::to_string(event).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Failed to serialize activity event");
            String::new()
        });
    }

    let at = event
        .observed_at
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    match &event.transition {
        Transition::Started { workspace } => format!("{at} started {workspace}"),
        Transition::Stopped {
            workspace,
            forced: true,
        } => format!("{at} stopped {workspace} (signal)"),
        Transition::Stopped { workspace, .. } => format!("{at} stopped {workspace}"),
        Transition::UnreadRaised { workspace } => format!("{at} unread {workspace}"),
    }
}

pub fn render_status(state: &WorkspaceActivityState, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return serde_json::to_string(state).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Failed to serialize activity state");
            String::new()
        });
    }

    let join = |ids: &std::collections::BTreeSet<WorkspaceId>| {
        if ids.is_empty() {
            "-".to_string()
        } else {
            ids.iter().map(WorkspaceId::as_str).collect::<Vec<_>>().join(" ")
        }
    };
    format!(
        "active: {}\nunread: {}\nfocused: {}",
        join(&state.active),
        join(&state.unread),
        state.focused.as_ref().map(WorkspaceId::as_str).unwrap_or("-")
    )
}
