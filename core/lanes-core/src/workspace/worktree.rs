//! Git worktree creation, one worktree per workspace.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{LanesError, Result};

pub trait GitCommandRunner {
    fn run(&self, repo_root: &Path, args: &[String]) -> std::result::Result<(), String>;
}

pub struct CommandGitRunner;

impl GitCommandRunner for CommandGitRunner {
    fn run(&self, repo_root: &Path, args: &[String]) -> std::result::Result<(), String> {
        let output = Command::new("git")
            .current_dir(repo_root)
            .args(args)
            .output()
            .map_err(|error| error.to_string())?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("git exited with status {}", output.status)
        } else {
            stderr
        };
        Err(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeRequest {
    pub repo_path: PathBuf,
    pub name: String,
    pub branch: String,
    /// Reset an existing branch and overwrite a stale worktree registration.
    pub force: bool,
    pub base_branch: Option<String>,
}

pub trait WorktreeProvider {
    /// Creates the worktree and returns its path.
    fn create(&self, request: &WorktreeRequest) -> Result<PathBuf>;
}

pub struct GitWorktrees<R: GitCommandRunner> {
    runner: R,
}

impl GitWorktrees<CommandGitRunner> {
    pub fn new() -> Self {
        Self {
            runner: CommandGitRunner,
        }
    }
}

impl Default for GitWorktrees<CommandGitRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: GitCommandRunner> GitWorktrees<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    fn branch_exists(&self, repo_root: &Path, branch: &str) -> bool {
        let args = vec![
            "rev-parse".to_string(),
            "--verify".to_string(),
            "--quiet".to_string(),
            format!("refs/heads/{branch}"),
        ];
        self.runner.run(repo_root, &args).is_ok()
    }
}

/// `<parent>/<repo>-<name>`, next to the main checkout.
pub fn worktree_path(repo_root: &Path, name: &str) -> Result<PathBuf> {
    let repo_name = repo_root
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LanesError::GitCommandFailed {
            command: "worktree add".to_string(),
            details: format!("repository path has no name: {}", repo_root.display()),
        })?;

    let parent = repo_root.parent().unwrap_or(repo_root);
    Ok(parent.join(format!("{repo_name}-{name}")))
}

impl<R: GitCommandRunner> WorktreeProvider for GitWorktrees<R> {
    fn create(&self, request: &WorktreeRequest) -> Result<PathBuf> {
        if request.name.trim().is_empty() || request.name.contains('/') {
            return Err(LanesError::GitCommandFailed {
                command: "worktree add".to_string(),
                details: format!("invalid worktree name {:?}", request.name),
            });
        }
        if request.branch.trim().is_empty() {
            return Err(LanesError::GitCommandFailed {
                command: "worktree add".to_string(),
                details: "empty branch name".to_string(),
            });
        }

        let path = worktree_path(&request.repo_path, &request.name)?;
        let path_arg = path.to_string_lossy().to_string();

        let mut args = vec!["worktree".to_string(), "add".to_string()];
        if request.force {
            args.push("--force".to_string());
        }

        if request.force {
            args.extend(["-B".to_string(), request.branch.clone(), path_arg]);
            if let Some(base) = &request.base_branch {
                args.push(base.clone());
            }
        } else if self.branch_exists(&request.repo_path, &request.branch) {
            args.extend([path_arg, request.branch.clone()]);
        } else {
            args.extend(["-b".to_string(), request.branch.clone(), path_arg]);
            if let Some(base) = &request.base_branch {
                args.push(base.clone());
            }
        }

        self.runner
            .run(&request.repo_path, &args)
            .map_err(|details| LanesError::GitCommandFailed {
                command: args.join(" "),
                details,
            })?;

        tracing::info!(
            repo = %request.repo_path.display(),
            worktree = %path.display(),
            branch = %request.branch,
            "Worktree created"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<Vec<String>>>,
        existing_branches: Vec<String>,
        fail_add: bool,
    }

    impl GitCommandRunner for RecordingRunner {
        fn run(&self, _repo_root: &Path, args: &[String]) -> std::result::Result<(), String> {
            self.calls.borrow_mut().push(args.to_vec());
            if args[0] == "rev-parse" {
                let wanted = args[3].trim_start_matches("refs/heads/");
                return if self.existing_branches.iter().any(|b| b == wanted) {
                    Ok(())
                } else {
                    Err("unknown revision".to_string())
                };
            }
            if self.fail_add {
                return Err("fatal: already exists".to_string());
            }
            Ok(())
        }
    }

    fn request(force: bool, base: Option<&str>) -> WorktreeRequest {
        WorktreeRequest {
            repo_path: PathBuf::from("/src/app"),
            name: "feature".to_string(),
            branch: "lanes/feature".to_string(),
            force,
            base_branch: base.map(str::to_string),
        }
    }

    #[test]
    fn test_new_branch_from_base() {
        let worktrees = GitWorktrees::with_runner(RecordingRunner::default());
        let path = worktrees.create(&request(false, Some("main"))).unwrap();

        assert_eq!(path, PathBuf::from("/src/app-feature"));
        let calls = worktrees.runner.calls.borrow();
        assert_eq!(
            calls.last().unwrap(),
            &vec!["worktree", "add", "-b", "lanes/feature", "/src/app-feature", "main"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_existing_branch_is_checked_out() {
        let worktrees = GitWorktrees::with_runner(RecordingRunner {
            existing_branches: vec!["lanes/feature".to_string()],
            ..RecordingRunner::default()
        });
        worktrees.create(&request(false, Some("main"))).unwrap();

        let calls = worktrees.runner.calls.borrow();
        assert_eq!(
            calls.last().unwrap(),
            &vec!["worktree", "add", "/src/app-feature", "lanes/feature"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_force_resets_branch() {
        let worktrees = GitWorktrees::with_runner(RecordingRunner::default());
        worktrees.create(&request(true, None)).unwrap();

        let calls = worktrees.runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec!["worktree", "add", "--force", "-B", "lanes/feature", "/src/app-feature"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_git_failure_is_reported() {
        let worktrees = GitWorktrees::with_runner(RecordingRunner {
            fail_add: true,
            ..RecordingRunner::default()
        });
        let err = worktrees.create(&request(false, None)).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_rejects_bad_names() {
        let worktrees = GitWorktrees::with_runner(RecordingRunner::default());
        let mut bad = request(false, None);
        bad.name = "a/b".to_string();
        assert!(worktrees.create(&bad).is_err());
        assert!(worktrees.runner.calls.borrow().is_empty());
    }
}
