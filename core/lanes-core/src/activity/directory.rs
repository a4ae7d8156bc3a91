//! Workspace activity state and the callback seam the poll loop drives.
//!
//! [`WorkspaceDirectory`] is the single owner of the active/unread sets and
//! the focus pointer. It is shared as `Arc` between the poll thread (which
//! calls the [`ActivitySink`] callbacks) and whatever handles user input
//! (which calls [`WorkspaceDirectory::on_focus_changed`]). Every mutation
//! takes the same mutex, so the two never interleave mid-update.
//!
//! The state is ephemeral: markers are ephemeral too, and a restart simply
//! re-reports whatever is still running.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use crate::types::WorkspaceId;

/// What the reconciler needs from the workspace owner.
pub trait ActivitySink: Send + Sync {
    fn is_focused(&self, workspace: &WorkspaceId) -> bool;

    /// Removed workspaces return false so lingering markers can't bring
    /// them back.
    fn is_tracked(&self, _workspace: &WorkspaceId) -> bool {
        true
    }

    fn on_activity_started(&self, workspace: &WorkspaceId);

    fn on_activity_stopped(&self, workspace: &WorkspaceId);

    fn on_unread_raised(&self, workspace: &WorkspaceId);

    /// Called once per tick with the marker-derived active test, so
    /// bookkeeping for removed workspaces can be dropped once their markers
    /// are gone.
    fn prune_removed(&self, _still_marked: &dyn Fn(&WorkspaceId) -> bool) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceActivityState {
    pub active: BTreeSet<WorkspaceId>,
    pub unread: BTreeSet<WorkspaceId>,
    pub focused: Option<WorkspaceId>,
    #[serde(skip)]
    removed: BTreeSet<WorkspaceId>,
}

#[derive(Debug, Default)]
pub struct WorkspaceDirectory {
    state: Mutex<WorkspaceActivityState>,
}

impl WorkspaceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, WorkspaceActivityState> {
        // A panic mid-update leaves two small sets; still usable.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Moves focus. The newly focused workspace's unread flag is cleared in
    /// the same critical section; active status is untouched.
    pub fn on_focus_changed(&self, workspace: Option<WorkspaceId>) {
        let mut state = self.lock();
        if let Some(id) = &workspace {
            if state.unread.remove(id) {
                tracing::debug!(workspace = %id, "Unread cleared by focus");
            }
        }
        state.focused = workspace;
    }

    /// Drops every trace of a deleted workspace.
    pub fn on_workspace_removed(&self, workspace: &WorkspaceId) {
        let mut state = self.lock();
        state.active.remove(workspace);
        state.unread.remove(workspace);
        if state.focused.as_ref() == Some(workspace) {
            state.focused = None;
        }
        state.removed.insert(workspace.clone());
        tracing::info!(workspace = %workspace, "Workspace removed from activity tracking");
    }

    /// Makes a workspace trackable again after [`Self::on_workspace_removed`].
    pub fn register_workspace(&self, workspace: &WorkspaceId) {
        self.lock().removed.remove(workspace);
    }

    pub fn is_active(&self, workspace: &WorkspaceId) -> bool {
        self.lock().active.contains(workspace)
    }

    pub fn is_unread(&self, workspace: &WorkspaceId) -> bool {
        self.lock().unread.contains(workspace)
    }

    pub fn focused(&self) -> Option<WorkspaceId> {
        self.lock().focused.clone()
    }

    pub fn active_ids(&self) -> BTreeSet<WorkspaceId> {
        self.lock().active.clone()
    }

    pub fn unread_ids(&self) -> BTreeSet<WorkspaceId> {
        self.lock().unread.clone()
    }

    pub fn snapshot(&self) -> WorkspaceActivityState {
        self.lock().clone()
    }
}

impl ActivitySink for WorkspaceDirectory {
    fn is_focused(&self, workspace: &WorkspaceId) -> bool {
        self.lock().focused.as_ref() == Some(workspace)
    }

    fn is_tracked(&self, workspace: &WorkspaceId) -> bool {
        !self.lock().removed.contains(workspace)
    }

    fn on_activity_started(&self, workspace: &WorkspaceId) {
        let mut state = self.lock();
        if state.removed.contains(workspace) {
            return;
        }
        state.active.insert(workspace.clone());
    }

    fn on_activity_stopped(&self, workspace: &WorkspaceId) {
        self.lock().active.remove(workspace);
    }

    fn on_unread_raised(&self, workspace: &WorkspaceId) {
        let mut state = self.lock();
        // Focus may have moved here between reconcile and apply.
        if state.focused.as_ref() == Some(workspace) || state.removed.contains(workspace) {
            return;
        }
        state.unread.insert(workspace.clone());
    }

    fn prune_removed(&self, still_marked: &dyn Fn(&WorkspaceId) -> bool) {
        let mut state = self.lock();
        let before = state.removed.len();
        state.removed.retain(|workspace| still_marked(workspace));
        let pruned = before - state.removed.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Forgot removed workspaces with no markers left");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(id: &str) -> WorkspaceId {
        WorkspaceId::new(id).unwrap()
    }

    #[test]
    fn test_focus_clears_unread_but_not_active() {
        let dir = WorkspaceDirectory::new();
        dir.on_activity_started(&ws("w1"));
        dir.on_unread_raised(&ws("w1"));
        assert!(dir.is_unread(&ws("w1")));

        dir.on_focus_changed(Some(ws("w1")));
        assert!(!dir.is_unread(&ws("w1")));
        assert!(dir.is_active(&ws("w1")));
        assert!(dir.is_focused(&ws("w1")));
    }

    #[test]
    fn test_unread_not_raised_for_focused_workspace() {
        let dir = WorkspaceDirectory::new();
        dir.on_focus_changed(Some(ws("w1")));
        dir.on_unread_raised(&ws("w1"));
        assert!(!dir.is_unread(&ws("w1")));

        dir.on_unread_raised(&ws("w2"));
        assert!(dir.is_unread(&ws("w2")));
    }

    #[test]
    fn test_unfocus_keeps_other_unread() {
        let dir = WorkspaceDirectory::new();
        dir.on_unread_raised(&ws("w2"));
        dir.on_focus_changed(Some(ws("w1")));
        dir.on_focus_changed(None);
        assert!(dir.is_unread(&ws("w2")));
        assert_eq!(dir.focused(), None);
    }

    #[test]
    fn test_removal_drops_both_sets_and_blocks_resurrection() {
        let dir = WorkspaceDirectory::new();
        dir.on_activity_started(&ws("w1"));
        dir.on_unread_raised(&ws("w1"));
        dir.on_focus_changed(Some(ws("w1")));

        dir.on_workspace_removed(&ws("w1"));
        let state = dir.snapshot();
        assert!(state.active.is_empty());
        assert!(state.unread.is_empty());
        assert_eq!(state.focused, None);
        assert!(!dir.is_tracked(&ws("w1")));

        dir.on_activity_started(&ws("w1"));
        dir.on_unread_raised(&ws("w1"));
        assert!(!dir.is_active(&ws("w1")));
        assert!(!dir.is_unread(&ws("w1")));

        dir.register_workspace(&ws("w1"));
        assert!(dir.is_tracked(&ws("w1")));
    }

    #[test]
    fn test_removed_ids_are_pruned_once_unmarked() {
        let dir = WorkspaceDirectory::new();
        dir.on_workspace_removed(&ws("w1"));
        dir.on_workspace_removed(&ws("w2"));

        dir.prune_removed(&|workspace: &WorkspaceId| workspace.as_str() == "w1");
        assert!(!dir.is_tracked(&ws("w1")));
        assert!(dir.is_tracked(&ws("w2")));

        dir.prune_removed(&|_: &WorkspaceId| false);
        assert!(dir.is_tracked(&ws("w1")));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let dir = WorkspaceDirectory::new();
        dir.on_activity_stopped(&ws("w1"));
        dir.on_activity_started(&ws("w1"));
        dir.on_activity_stopped(&ws("w1"));
        dir.on_activity_stopped(&ws("w1"));
        assert!(dir.active_ids().is_empty());
    }
}
