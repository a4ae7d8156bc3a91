//! Workspace collaborators: git worktrees and terminals.
//!
//! Neither writes activity state. A workspace becomes active only when an
//! agent running in one of its terminals creates a marker.

pub mod terminal;
pub mod worktree;

pub use terminal::{terminal_env, ProcessTerminals, TerminalHost, TerminalId, TerminalRequest};
pub use worktree::{
    worktree_path, CommandGitRunner, GitCommandRunner, GitWorktrees, WorktreeProvider,
    WorktreeRequest,
};

use serde::Serialize;
use std::path::PathBuf;

use crate::error::Result;
use crate::types::WorkspaceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub branch: String,
    pub worktree_path: PathBuf,
}

impl Workspace {
    /// Creates the worktree and assigns a fresh id.
    pub fn create(provider: &dyn WorktreeProvider, request: &WorktreeRequest) -> Result<Self> {
        let worktree_path = provider.create(request)?;
        let workspace = Self {
            id: WorkspaceId::generate(),
            name: request.name.clone(),
            branch: request.branch.clone(),
            worktree_path,
        };
        tracing::info!(workspace = %workspace.id, name = %workspace.name, "Workspace created");
        Ok(workspace)
    }

    /// Request for a terminal rooted in this workspace's worktree.
    pub fn terminal_request(&self, shell_override: Option<String>) -> TerminalRequest {
        TerminalRequest {
            workspace: self.id.clone(),
            cwd: self.worktree_path.clone(),
            shell_override,
            extra_env: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct FixedPath(PathBuf);

    impl WorktreeProvider for FixedPath {
        fn create(&self, _request: &WorktreeRequest) -> Result<PathBuf> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let provider = FixedPath(PathBuf::from("/src/app-feature"));
        let request = WorktreeRequest {
            repo_path: PathBuf::from("/src/app"),
            name: "feature".to_string(),
            branch: "lanes/feature".to_string(),
            force: false,
            base_branch: None,
        };

        let first = Workspace::create(&provider, &request).unwrap();
        let second = Workspace::create(&provider, &request).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.worktree_path, Path::new("/src/app-feature"));

        let terminal = first.terminal_request(None);
        assert_eq!(terminal.workspace, first.id);
        assert_eq!(terminal.cwd, first.worktree_path);
    }
}
