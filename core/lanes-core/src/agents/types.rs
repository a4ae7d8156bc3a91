//! Agent kinds and the marker conventions each one uses.
//! Add a variant here (plus its rule) to teach the aggregator a new agent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LanesError;
use crate::types::WorkspaceId;

/// How an agent kind lays out its marker files in the activity directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRule {
    /// Exactly one marker per workspace: `<workspaceId>.<kind>`.
    FixedName,
    /// One marker per running instance: `<workspaceId>.<kind>.<instanceToken>`.
    Instanced,
}

impl MarkerRule {
    /// Splits a marker filename into workspace id and instance token.
    ///
    /// Returns `None` for anything that is not a well-formed marker of `kind`
    /// under this rule.
    pub fn match_file_name(
        &self,
        kind: &str,
        file_name: &str,
    ) -> Option<(WorkspaceId, Option<String>)> {
        match self {
            MarkerRule::FixedName => {
                let workspace = file_name.strip_suffix(kind)?.strip_suffix('.')?;
                Some((workspace_segment(workspace)?, None))
            }
            MarkerRule::Instanced => {
                let (head, token) = file_name.rsplit_once('.')?;
                if validate_instance_token(token).is_err() {
                    return None;
                }
                let workspace = head.strip_suffix(kind)?.strip_suffix('.')?;
                Some((workspace_segment(workspace)?, Some(token.to_string())))
            }
        }
    }
}

// Producers never pad ids, so a segment that needs trimming is not ours.
fn workspace_segment(segment: &str) -> Option<WorkspaceId> {
    if segment.trim() != segment {
        return None;
    }
    WorkspaceId::new(segment).ok()
}

/// Instance tokens become the last filename segment, so they may not contain
/// separators of any kind.
pub fn validate_instance_token(token: &str) -> Result<(), LanesError> {
    let reason = if token.is_empty() {
        Some("empty")
    } else if token.contains('.') || token.contains('/') || token.contains('\\') {
        Some("separator character")
    } else if token.chars().any(|c| c.is_control() || c.is_whitespace()) {
        Some("whitespace or control character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(LanesError::InvalidInstanceToken {
            token: token.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Known agent kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
    Codex,
    OpenCode,
    Amp,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Claude,
        AgentKind::Codex,
        AgentKind::OpenCode,
        AgentKind::Amp,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::OpenCode => "opencode",
            Self::Amp => "amp",
        }
    }

    /// Claude hooks run once per session and share one marker per workspace;
    /// the others may run several processes side by side.
    pub fn marker_rule(&self) -> MarkerRule {
        match self {
            Self::Claude => MarkerRule::FixedName,
            Self::Codex | Self::OpenCode | Self::Amp => MarkerRule::Instanced,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for AgentKind {
    type Err = LanesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| LanesError::UnknownAgentKind(s.to_string()))
    }
}

/// Agent configuration with user preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_kind_id_round_trips_through_from_str() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.id().parse::<AgentKind>().unwrap(), kind);
        }
        assert_eq!("  CODEX ".parse::<AgentKind>().unwrap(), AgentKind::Codex);
        assert!("cursor".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_marker_rules() {
        assert_eq!(AgentKind::Claude.marker_rule(), MarkerRule::FixedName);
        assert_eq!(AgentKind::Codex.marker_rule(), MarkerRule::Instanced);
        assert_eq!(AgentKind::OpenCode.marker_rule(), MarkerRule::Instanced);
    }

    #[test]
    fn test_fixed_name_matching() {
        let rule = MarkerRule::FixedName;
        let (ws, token) = rule.match_file_name("claude", "ws-1.claude").unwrap();
        assert_eq!(ws.as_str(), "ws-1");
        assert!(token.is_none());

        assert!(rule.match_file_name("claude", ".claude").is_none());
        assert!(rule.match_file_name("claude", "ws-1claude").is_none());
        assert!(rule.match_file_name("claude", "ws-1.claude.42").is_none());
        assert!(rule.match_file_name("claude", "ws-1.codex").is_none());
    }

    #[test]
    fn test_instanced_matching() {
        let rule = MarkerRule::Instanced;
        let (ws, token) = rule.match_file_name("codex", "ws-1.codex.123").unwrap();
        assert_eq!(ws.as_str(), "ws-1");
        assert_eq!(token.as_deref(), Some("123"));

        // Dotted workspace ids are fine; the kind anchors the split.
        let (ws, _) = rule.match_file_name("codex", "team.ws.codex.9").unwrap();
        assert_eq!(ws.as_str(), "team.ws");

        assert!(rule.match_file_name("codex", "ws-1.codex").is_none());
        assert!(rule.match_file_name("codex", "ws-1.codex.").is_none());
        assert!(rule.match_file_name("codex", ".codex.1").is_none());
        assert!(rule.match_file_name("codex", "ws-1.claude.1").is_none());
    }

    #[test]
    fn test_instance_token_validation() {
        assert!(validate_instance_token("4242").is_ok());
        assert!(validate_instance_token("tty-3").is_ok());
        assert!(validate_instance_token("").is_err());
        assert!(validate_instance_token("a.b").is_err());
        assert!(validate_instance_token("a b").is_err());
    }

    #[test]
    fn test_agent_config_default() {
        let config = AgentConfig::default();
        assert!(config.disabled.is_empty());
    }
}
