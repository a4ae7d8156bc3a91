//! Event handler for agent hooks.
//!
//! Reads the hook's JSON payload from stdin and maps it onto the workspace's
//! activity marker.
//!
//! ## Event Mapping
//!
//! ```text
//! SessionStart                          → nothing (no work yet)
//! UserPromptSubmit/PreToolUse/PostToolUse → create marker
//! Stop                                  → remove marker (unless stop_hook_active=true)
//! SessionEnd                            → remove marker
//! PermissionRequest                     → notify, then remove marker
//! Notification                          → notify, then remove marker
//!                                          (permission_prompt, idle_prompt,
//!                                           elicitation_dialog only)
//! ```
//!
//! A waiting agent is not working, so notify also drops the marker. The
//! signal is written first: if the poller sees the two in separate ticks,
//! the forced stop comes first and the removal is absorbed by it.

use serde::Deserialize;
use std::io::{self, Read};

use lanes_core::agents::validate_instance_token;
use lanes_core::{LanesError, MarkerRule};

use crate::context::HookContext;
use crate::error::{HookError, Result};

const WAITING_NOTIFICATIONS: [&str; 3] = ["permission_prompt", "idle_prompt", "elicitation_dialog"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub hook_event_name: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub stop_hook_active: Option<bool>,
    #[serde(default)]
    pub tool_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    StartMarker,
    StopMarker,
    Notify,
    Skip,
}

impl HookInput {
    pub fn action(&self) -> HookAction {
        match self.hook_event_name.as_deref() {
            Some("UserPromptSubmit") | Some("PreToolUse") | Some("PostToolUse") => {
                HookAction::StartMarker
            }
            // Another stop hook is keeping the agent going.
            Some("Stop") if self.stop_hook_active == Some(true) => HookAction::Skip,
            Some("Stop") | Some("SessionEnd") => HookAction::StopMarker,
            Some("PermissionRequest") => HookAction::Notify,
            Some("Notification") => match self.notification_type.as_deref() {
                Some(kind) if WAITING_NOTIFICATIONS.contains(&kind) => HookAction::Notify,
                _ => HookAction::Skip,
            },
            _ => HookAction::Skip,
        }
    }

    /// Session ids are stable across one agent session's events, so they make
    /// a better instance token than the pid when they fit in a filename.
    fn instance_token(&self) -> Option<String> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| validate_instance_token(id).is_ok())
            .map(str::to_string)
    }
}

pub fn run(ctx: &HookContext, kind: &str) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(HookError::Stdin)?;

    handle_payload(ctx, kind, &input).map(|_| ())
}

pub fn handle_payload(ctx: &HookContext, kind: &str, raw: &str) -> Result<HookAction> {
    if raw.trim().is_empty() {
        return Ok(HookAction::Skip);
    }

    let input: HookInput = serde_json::from_str(raw).map_err(HookError::Payload)?;
    let action = input.action();
    if action == HookAction::Skip {
        tracing::debug!(event = ?input.hook_event_name, "Skipping event (no activity change)");
        return Ok(HookAction::Skip);
    }

    let Some(workspace) = ctx.workspace.as_ref() else {
        tracing::debug!(
            event = ?input.hook_event_name,
            session = ?input.session_id,
            "Skipping event (missing workspace id)"
        );
        return Ok(HookAction::Skip);
    };

    let agent = match ctx.registry.resolve(kind) {
        Ok(agent) => agent,
        Err(LanesError::AgentKindDisabled(_)) => {
            tracing::debug!(kind, "Skipping event (agent kind disabled)");
            return Ok(HookAction::Skip);
        }
        Err(err) => return Err(err.into()),
    };
    let instance = match agent.marker_rule() {
        MarkerRule::Instanced => input.instance_token(),
        MarkerRule::FixedName => None,
    };

    tracing::debug!(
        event = ?input.hook_event_name,
        workspace = %workspace,
        kind = %agent,
        ?action,
        "Handling hook event"
    );

    match action {
        HookAction::StartMarker => {
            ctx.start(kind, instance)?;
        }
        HookAction::StopMarker => {
            ctx.stop(kind, instance)?;
        }
        HookAction::Notify => {
            ctx.notify()?;
            ctx.stop(kind, instance)?;
        }
        HookAction::Skip => {}
    }
    Ok(action)
}
