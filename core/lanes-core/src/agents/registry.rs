//! Resolves which agent kinds participate in marker aggregation.

use super::types::{validate_instance_token, AgentConfig, AgentKind, MarkerRule};
use crate::error::{LanesError, Result};

#[derive(Debug, Clone)]
pub struct AgentRegistry {
    kinds: Vec<AgentKind>,
    config: AgentConfig,
}

impl AgentRegistry {
    pub fn new(config: AgentConfig) -> Self {
        Self::with_kinds(AgentKind::ALL.to_vec(), config)
    }

    pub fn with_kinds(kinds: Vec<AgentKind>, config: AgentConfig) -> Self {
        for disabled in &config.disabled {
            if disabled.parse::<AgentKind>().is_err() {
                tracing::warn!(kind = %disabled, "Ignoring unknown agent kind in disabled list");
            }
        }
        Self { kinds, config }
    }

    fn is_disabled(&self, kind: AgentKind) -> bool {
        self.config
            .disabled
            .iter()
            .any(|id| id.trim().eq_ignore_ascii_case(kind.id()))
    }

    /// Agent kinds whose markers count toward activity, in declaration order.
    pub fn enabled_kinds(&self) -> impl Iterator<Item = AgentKind> + '_ {
        self.kinds
            .iter()
            .copied()
            .filter(move |kind| !self.is_disabled(*kind))
    }

    /// Looks up an enabled kind by id.
    pub fn resolve(&self, id: &str) -> Result<AgentKind> {
        let kind = id.parse::<AgentKind>()?;
        if !self.kinds.contains(&kind) {
            return Err(LanesError::UnknownAgentKind(id.to_string()));
        }
        if self.is_disabled(kind) {
            return Err(LanesError::AgentKindDisabled(kind.id().to_string()));
        }
        Ok(kind)
    }

    /// Checks that an instance token agrees with the kind's marker rule.
    pub fn check_instance(&self, kind: AgentKind, instance: Option<&str>) -> Result<()> {
        match (kind.marker_rule(), instance) {
            (MarkerRule::FixedName, None) => Ok(()),
            (MarkerRule::FixedName, Some(_)) => Err(LanesError::UnexpectedInstanceToken {
                kind: kind.id().to_string(),
            }),
            (MarkerRule::Instanced, Some(token)) => validate_instance_token(token),
            (MarkerRule::Instanced, None) => Err(LanesError::MissingInstanceToken {
                kind: kind.id().to_string(),
            }),
        }
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(AgentConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_enables_all_kinds_by_default() {
        let registry = AgentRegistry::default();
        let kinds: Vec<_> = registry.enabled_kinds().collect();
        assert_eq!(kinds, AgentKind::ALL.to_vec());
    }

    #[test]
    fn test_registry_filters_disabled_kinds() {
        let registry = AgentRegistry::new(AgentConfig {
            disabled: vec!["Codex".to_string(), "bogus".to_string()],
        });
        assert!(registry.enabled_kinds().all(|k| k != AgentKind::Codex));
        assert!(matches!(
            registry.resolve("codex"),
            Err(LanesError::AgentKindDisabled(_))
        ));
        assert_eq!(registry.resolve("claude").unwrap(), AgentKind::Claude);
    }

    #[test]
    fn test_registry_with_kinds_limits_resolution() {
        let registry = AgentRegistry::with_kinds(vec![AgentKind::Codex], AgentConfig::default());
        assert!(registry.resolve("codex").is_ok());
        assert!(matches!(
            registry.resolve("claude"),
            Err(LanesError::UnknownAgentKind(_))
        ));
    }

    #[test]
    fn test_check_instance_follows_marker_rule() {
        let registry = AgentRegistry::default();
        assert!(registry.check_instance(AgentKind::Claude, None).is_ok());
        assert!(registry
            .check_instance(AgentKind::Claude, Some("1"))
            .is_err());
        assert!(registry.check_instance(AgentKind::Codex, Some("1")).is_ok());
        assert!(registry.check_instance(AgentKind::Codex, None).is_err());
        assert!(registry
            .check_instance(AgentKind::Codex, Some("bad.token"))
            .is_err());
    }
}
