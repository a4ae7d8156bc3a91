//! Marker and signal operations for the workspace a hook runs in.

use std::env;
use std::path::PathBuf;

use lanes_core::activity::write_notify_signal;
use lanes_core::{
    load_config, ActivityMarker, AgentRegistry, LanesConfig, LanesError, MarkerRule, WorkspaceId,
    WORKSPACE_ID_ENV,
};

use crate::error::Result;

pub struct HookContext {
    pub config: LanesConfig,
    pub registry: AgentRegistry,
    pub workspace: Option<WorkspaceId>,
}

impl HookContext {
    /// Loads config and takes the workspace from `--workspace`, falling back
    /// to `LANES_WORKSPACE_ID`.
    pub fn load(config_path: Option<PathBuf>, workspace_flag: Option<String>) -> Result<Self> {
        let config = load_config(config_path)?;
        let raw = workspace_flag.or_else(|| env::var(WORKSPACE_ID_ENV).ok());
        Self::new(config, raw)
    }

    pub fn new(config: LanesConfig, raw_workspace: Option<String>) -> Result<Self> {
        let workspace = raw_workspace
            .filter(|raw| !raw.trim().is_empty())
            .map(WorkspaceId::new)
            .transpose()?;
        let registry = AgentRegistry::new(config.agents.clone());
        Ok(Self {
            config,
            registry,
            workspace,
        })
    }

    pub fn require_workspace(&self) -> Result<&WorkspaceId> {
        self.workspace
            .as_ref()
            .ok_or(LanesError::MissingWorkspaceId(WORKSPACE_ID_ENV).into())
    }

    fn marker(&self, kind: &str, instance: Option<String>) -> Result<ActivityMarker> {
        let workspace = self.require_workspace()?.clone();
        let kind = self.registry.resolve(kind)?;
        let instance = match kind.marker_rule() {
            MarkerRule::Instanced => Some(instance.unwrap_or_else(default_instance_token)),
            MarkerRule::FixedName => instance,
        };
        Ok(ActivityMarker::new(
            &self.registry,
            kind,
            workspace,
            instance,
        )?)
    }

    pub fn start(&self, kind: &str, instance: Option<String>) -> Result<PathBuf> {
        let marker = self.marker(kind, instance)?;
        let path = marker.create(&self.config.activity_dir)?;
        tracing::info!(
            workspace = %marker.workspace,
            kind = %marker.kind,
            marker = %marker.file_name(),
            "Activity marker created"
        );
        Ok(path)
    }

    /// Returns false when the marker was already gone.
    pub fn stop(&self, kind: &str, instance: Option<String>) -> Result<bool> {
        let marker = self.marker(kind, instance)?;
        let removed = marker.remove(&self.config.activity_dir)?;
        tracing::info!(
            workspace = %marker.workspace,
            kind = %marker.kind,
            marker = %marker.file_name(),
            removed,
            "Activity marker removed"
        );
        Ok(removed)
    }

    pub fn notify(&self) -> Result<PathBuf> {
        let workspace = self.require_workspace()?;
        let path = write_notify_signal(&self.config.notify_dir, workspace)?;
        tracing::info!(workspace = %workspace, signal = %path.display(), "Notify signal written");
        Ok(path)
    }
}

/// Hook scripts are children of the agent, so the parent pid identifies the
/// agent instance across start and stop.
pub fn default_instance_token() -> String {
    #[cfg(unix)]
    {
        std::os::unix::process::parent_id().to_string()
    }
    #[cfg(not(unix))]
    {
        std::process::id().to_string()
    }
}
