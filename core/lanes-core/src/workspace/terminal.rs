//! Terminal processes bound to a workspace.
//!
//! A terminal's only job in activity tracking is to carry the workspace id
//! and signal directories into the agent's environment. Destroying a
//! terminal never touches markers: an agent killed mid-turn leaves its
//! marker behind and the workspace stays active until the marker is gone.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::config::{LanesConfig, ACTIVITY_DIR_ENV, NOTIFY_DIR_ENV, WORKSPACE_ID_ENV};
use crate::error::{LanesError, Result};
use crate::types::WorkspaceId;

pub type TerminalId = u64;

const FALLBACK_SHELL: &str = "/bin/sh";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalRequest {
    pub workspace: WorkspaceId,
    pub cwd: PathBuf,
    /// Program to run instead of the user's shell.
    pub shell_override: Option<String>,
    pub extra_env: Vec<(String, String)>,
}

pub trait TerminalHost {
    fn create(&self, request: &TerminalRequest) -> Result<TerminalId>;

    fn destroy(&self, id: TerminalId) -> Result<()>;
}

/// The environment a terminal for `workspace` is started with.
///
/// `extra` comes first so it cannot shadow the `LANES_*` variables.
pub fn terminal_env(
    config: &LanesConfig,
    workspace: &WorkspaceId,
    extra: &[(String, String)],
) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = extra
        .iter()
        .filter(|(key, _)| {
            key != WORKSPACE_ID_ENV && key != ACTIVITY_DIR_ENV && key != NOTIFY_DIR_ENV
        })
        .cloned()
        .collect();
    env.push((WORKSPACE_ID_ENV.to_string(), workspace.to_string()));
    env.push((
        ACTIVITY_DIR_ENV.to_string(),
        config.activity_dir.to_string_lossy().to_string(),
    ));
    env.push((
        NOTIFY_DIR_ENV.to_string(),
        config.notify_dir.to_string_lossy().to_string(),
    ));
    env
}

fn resolve_shell(shell_override: Option<&str>) -> String {
    shell_override
        .map(str::to_string)
        .or_else(|| std::env::var("SHELL").ok())
        .filter(|shell| !shell.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_SHELL.to_string())
}

/// Local child processes, one per terminal.
pub struct ProcessTerminals {
    config: LanesConfig,
    next_id: AtomicU64,
    children: Mutex<HashMap<TerminalId, (WorkspaceId, Child)>>,
}

impl ProcessTerminals {
    pub fn new(config: LanesConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            children: Mutex::new(HashMap::new()),
        }
    }

    fn children(&self) -> MutexGuard<'_, HashMap<TerminalId, (WorkspaceId, Child)>> {
        self.children
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn workspace_of(&self, id: TerminalId) -> Option<WorkspaceId> {
        self.children()
            .get(&id)
            .map(|(workspace, _)| workspace.clone())
    }

    pub fn len(&self) -> usize {
        self.children().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }
}

impl TerminalHost for ProcessTerminals {
    fn create(&self, request: &TerminalRequest) -> Result<TerminalId> {
        let shell = resolve_shell(request.shell_override.as_deref());
        let child = Command::new(&shell)
            .current_dir(&request.cwd)
            .envs(terminal_env(
                &self.config,
                &request.workspace,
                &request.extra_env,
            ))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LanesError::TerminalSpawnFailed {
                cwd: request.cwd.clone(),
                source,
            })?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            terminal = id,
            workspace = %request.workspace,
            shell = %shell,
            pid = child.id(),
            "Terminal created"
        );
        self.children()
            .insert(id, (request.workspace.clone(), child));
        Ok(id)
    }

    fn destroy(&self, id: TerminalId) -> Result<()> {
        let (workspace, mut child) = self
            .children()
            .remove(&id)
            .ok_or(LanesError::TerminalNotFound(id))?;

        if let Err(err) = child.kill() {
            // Already exited.
            tracing::debug!(terminal = id, error = %err, "Terminal kill failed");
        }
        if let Err(err) = child.wait() {
            tracing::warn!(terminal = id, error = %err, "Failed to reap terminal");
        }

        tracing::info!(terminal = id, workspace = %workspace, "Terminal destroyed");
        Ok(())
    }
}

impl Drop for ProcessTerminals {
    fn drop(&mut self) {
        let children = std::mem::take(&mut *self.children());
        for (_, (_, mut child)) in children {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(id: &str) -> WorkspaceId {
        WorkspaceId::new(id).unwrap()
    }

    fn lookup<'a>(env: &'a [(String, String)], key: &str) -> Option<&'a str> {
        env.iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_env_carries_workspace_and_dirs() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config = LanesConfig::in_dir(temp.path());
        let env = terminal_env(
            &config,
            &ws("w1"),
            &[("TERM".to_string(), "xterm-256color".to_string())],
        );

        assert_eq!(lookup(&env, WORKSPACE_ID_ENV), Some("w1"));
        assert_eq!(
            lookup(&env, ACTIVITY_DIR_ENV).map(PathBuf::from),
            Some(config.activity_dir.clone())
        );
        assert_eq!(
            lookup(&env, NOTIFY_DIR_ENV).map(PathBuf::from),
            Some(config.notify_dir.clone())
        );
        assert_eq!(lookup(&env, "TERM"), Some("xterm-256color"));
    }

    #[test]
    fn test_extra_env_cannot_override_workspace() {
        let config = LanesConfig::default();
        let env = terminal_env(
            &config,
            &ws("w1"),
            &[(WORKSPACE_ID_ENV.to_string(), "w2".to_string())],
        );
        let values: Vec<&str> = env
            .iter()
            .filter(|(k, _)| k == WORKSPACE_ID_ENV)
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(values, vec!["w1"]);
    }

    #[test]
    fn test_shell_resolution_prefers_override() {
        assert_eq!(resolve_shell(Some("/bin/zsh")), "/bin/zsh");
        assert_eq!(resolve_shell(Some("  ")), FALLBACK_SHELL);
    }

    #[cfg(unix)]
    #[test]
    fn test_create_and_destroy() {
        let temp = tempfile::tempdir().expect("temp dir");
        let terminals = ProcessTerminals::new(LanesConfig::in_dir(temp.path()));
        let id = terminals
            .create(&TerminalRequest {
                workspace: ws("w1"),
                cwd: temp.path().to_path_buf(),
                shell_override: Some("/bin/sh".to_string()),
                extra_env: Vec::new(),
            })
            .expect("spawn shell");

        assert_eq!(terminals.workspace_of(id), Some(ws("w1")));
        terminals.destroy(id).expect("destroy");
        assert!(terminals.is_empty());
        assert!(matches!(
            terminals.destroy(id),
            Err(LanesError::TerminalNotFound(_))
        ));
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let temp = tempfile::tempdir().expect("temp dir");
        let terminals = ProcessTerminals::new(LanesConfig::in_dir(temp.path()));
        let err = terminals
            .create(&TerminalRequest {
                workspace: ws("w1"),
                cwd: temp.path().join("missing"),
                shell_override: Some("/bin/sh".to_string()),
                extra_env: Vec::new(),
            })
            .unwrap_err();
        assert!(matches!(err, LanesError::TerminalSpawnFailed { .. }));
    }
}
