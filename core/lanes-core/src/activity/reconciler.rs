//! Diffs successive marker snapshots into activity transitions.
//!
//! ```text
//! previous  current  forced   → transitions
//! idle      active   -        → Started
//! active    idle     -        → Stopped (+ UnreadRaised unless focused)
//! any       any      signal   → Stopped{forced} (+ UnreadRaised unless focused)
//! ```
//!
//! A forced stop usually arrives while the agent's marker is still on disk
//! (the agent is blocked on the user, not finished). The workspace is then
//! *held*: it stays stopped while those same markers linger, and their
//! eventual removal is swallowed instead of producing a second stop. A marker
//! that was not present when the hold began means new work and releases the
//! hold with a `Started`.
//!
//! `Stopped` is only ever emitted for a workspace last reported active. A
//! signal for one that is already idle or held just raises unread.
//!
//! Untracked (removed) workspaces are skipped. One skipped in the previous
//! tick counts as idle there, so tracking it again reports its markers as
//! `Started` instead of inheriting an activity nobody was told about.
//!
//! Focus is read when a transition is derived. The directory re-checks it
//! when applying, so focusing a workspace mid-tick never leaves it unread.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::directory::ActivitySink;
use super::markers::Snapshot;
use crate::types::WorkspaceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Transition {
    Started {
        workspace: WorkspaceId,
    },
    Stopped {
        workspace: WorkspaceId,
        /// True when caused by a one-shot signal rather than marker removal.
        forced: bool,
    },
    UnreadRaised {
        workspace: WorkspaceId,
    },
}

impl Transition {
    pub fn workspace(&self) -> &WorkspaceId {
        match self {
            Transition::Started { workspace }
            | Transition::Stopped { workspace, .. }
            | Transition::UnreadRaised { workspace } => workspace,
        }
    }
}

#[derive(Debug, Default)]
pub struct ActivityReconciler {
    /// Force-stopped workspaces whose markers are still present, with the
    /// markers seen since the hold began.
    held: BTreeMap<WorkspaceId, BTreeSet<String>>,
    /// Workspaces skipped as untracked in the last reconcile.
    skipped: BTreeSet<WorkspaceId>,
}

impl ActivityReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, workspace: &WorkspaceId) -> bool {
        self.held.contains_key(workspace)
    }

    /// Forgets all holds; used when the poll loop restarts from an empty
    /// snapshot.
    pub fn reset(&mut self) {
        self.held.clear();
        self.skipped.clear();
    }

    pub fn reconcile(
        &mut self,
        previous: &Snapshot,
        current: &Snapshot,
        forced: &[WorkspaceId],
        sink: &dyn ActivitySink,
    ) -> Vec<Transition> {
        self.held.retain(|workspace, _| sink.is_tracked(workspace));
        let was_skipped = std::mem::take(&mut self.skipped);

        let forced: BTreeSet<&WorkspaceId> = forced.iter().collect();
        let candidates: BTreeSet<WorkspaceId> = previous
            .active_ids()
            .chain(current.active_ids())
            .chain(forced.iter().copied())
            .chain(self.held.keys())
            .cloned()
            .collect();

        let mut transitions = Vec::new();
        for workspace in candidates {
            if !sink.is_tracked(&workspace) {
                self.skipped.insert(workspace);
                continue;
            }
            let was_active = previous.is_active(&workspace) && !was_skipped.contains(&workspace);
            let now_active = current.is_active(&workspace);

            if forced.contains(&workspace) {
                self.force_stop(&workspace, was_active, current, sink, &mut transitions);
                continue;
            }

            if self.held.contains_key(&workspace) {
                self.update_hold(&workspace, current, &mut transitions);
                continue;
            }

            match (was_active, now_active) {
                (false, true) => transitions.push(Transition::Started { workspace }),
                (true, false) => {
                    let focused = sink.is_focused(&workspace);
                    transitions.push(Transition::Stopped {
                        workspace: workspace.clone(),
                        forced: false,
                    });
                    if !focused {
                        transitions.push(Transition::UnreadRaised { workspace });
                    }
                }
                _ => {}
            }
        }

        transitions
    }

    fn force_stop(
        &mut self,
        workspace: &WorkspaceId,
        was_active: bool,
        current: &Snapshot,
        sink: &dyn ActivitySink,
        transitions: &mut Vec<Transition>,
    ) {
        // Held means already reported stopped.
        if was_active && !self.held.contains_key(workspace) {
            transitions.push(Transition::Stopped {
                workspace: workspace.clone(),
                forced: true,
            });
        }
        if !sink.is_focused(workspace) {
            transitions.push(Transition::UnreadRaised {
                workspace: workspace.clone(),
            });
        }

        match current.markers(workspace) {
            Some(markers) => {
                self.held.insert(workspace.clone(), markers.clone());
            }
            None => {
                self.held.remove(workspace);
            }
        }
    }

    fn update_hold(
        &mut self,
        workspace: &WorkspaceId,
        current: &Snapshot,
        transitions: &mut Vec<Transition>,
    ) {
        let Some(markers) = current.markers(workspace) else {
            // Lingering markers finally went away; already reported stopped.
            self.held.remove(workspace);
            return;
        };

        let known = self.held.get(workspace);
        let fresh = markers
            .iter()
            .any(|name| known.map(|known| !known.contains(name)).unwrap_or(true));

        if fresh {
            self.held.remove(workspace);
            transitions.push(Transition::Started {
                workspace: workspace.clone(),
            });
        } else {
            // Narrow to what is still there, so a marker that disappears and
            // comes back later counts as new work.
            self.held.insert(workspace.clone(), markers.clone());
        }
    }
}

/// Feeds transitions to the sink in order.
pub fn apply_transitions(transitions: &[Transition], sink: &dyn ActivitySink) {
    for transition in transitions {
        match transition {
            Transition::Started { workspace } => sink.on_activity_started(workspace),
            Transition::Stopped { workspace, .. } => sink.on_activity_stopped(workspace),
            Transition::UnreadRaised { workspace } => sink.on_unread_raised(workspace),
        }
    }
}
