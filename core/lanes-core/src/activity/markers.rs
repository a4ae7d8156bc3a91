//! Activity markers and the stateless aggregator that turns a directory
//! listing into a per-workspace snapshot.
//!
//! # Layout
//!
//! ```text
//! <activity_dir>/
//! ├── ws-1.claude        # FixedName: one marker per workspace
//! ├── ws-1.codex.4242    # Instanced: one marker per running instance
//! └── ws-2.codex.4310
//! ```
//!
//! Markers are owned by the agent process that wrote them. Nothing on the
//! consumer side ever deletes one, and terminal teardown leaves them alone.
//! Names that don't parse (other tools' files, unknown kinds, in-flight
//! `.tmp*` writes) are skipped so new producers can't break old consumers.

use fs_err as fs;
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::agents::{AgentKind, AgentRegistry};
use crate::error::{LanesError, Result};
use crate::types::{ActivityStatus, WorkspaceId};

/// One "an agent is working here" assertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivityMarker {
    pub kind: AgentKind,
    pub workspace: WorkspaceId,
    pub instance: Option<String>,
}

impl ActivityMarker {
    /// Builds a marker, checking the instance token against the kind's rule.
    pub fn new(
        registry: &AgentRegistry,
        kind: AgentKind,
        workspace: WorkspaceId,
        instance: Option<String>,
    ) -> Result<Self> {
        registry.check_instance(kind, instance.as_deref())?;
        Ok(Self {
            kind,
            workspace,
            instance,
        })
    }

    pub fn file_name(&self) -> String {
        match &self.instance {
            Some(token) => format!("{}.{}.{}", self.workspace, self.kind.id(), token),
            None => format!("{}.{}", self.workspace, self.kind.id()),
        }
    }

    /// Parses a filename against every enabled kind; first match wins.
    pub fn parse(file_name: &str, registry: &AgentRegistry) -> Option<Self> {
        if file_name.starts_with('.') {
            return None;
        }
        registry.enabled_kinds().find_map(|kind| {
            kind.marker_rule()
                .match_file_name(kind.id(), file_name)
                .map(|(workspace, instance)| Self {
                    kind,
                    workspace,
                    instance,
                })
        })
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Creates the marker file (and the directory, if this is the first
    /// producer). Re-creating an existing marker is fine.
    pub fn create(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .map_err(|err| LanesError::io("creating activity directory", err))?;
        let path = self.path_in(dir);
        fs::write(&path, b"").map_err(|err| LanesError::io("writing activity marker", err))?;
        Ok(path)
    }

    /// Removes the marker. Returns `false` if it was already gone.
    pub fn remove(&self, dir: &Path) -> Result<bool> {
        match fs::remove_file(self.path_in(dir)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(LanesError::io("removing activity marker", err)),
        }
    }
}

/// Active/Idle status of every workspace with markers, as of one read.
///
/// Only active workspaces are stored; anything absent is idle. The marker
/// names are kept so the reconciler can tell a fresh instance from a
/// lingering one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    workspaces: BTreeMap<WorkspaceId, BTreeSet<String>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    fn insert(&mut self, marker: &ActivityMarker) {
        self.workspaces
            .entry(marker.workspace.clone())
            .or_default()
            .insert(marker.file_name());
    }

    pub fn status(&self, workspace: &WorkspaceId) -> ActivityStatus {
        if self.is_active(workspace) {
            ActivityStatus::Active
        } else {
            ActivityStatus::Idle
        }
    }

    pub fn is_active(&self, workspace: &WorkspaceId) -> bool {
        self.workspaces.contains_key(workspace)
    }

    pub fn markers(&self, workspace: &WorkspaceId) -> Option<&BTreeSet<String>> {
        self.workspaces.get(workspace)
    }

    pub fn active_ids(&self) -> impl Iterator<Item = &WorkspaceId> {
        self.workspaces.keys()
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }
}

/// Folds a listing of filenames into a snapshot.
pub fn aggregate<I, S>(file_names: I, registry: &AgentRegistry) -> Snapshot
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut snapshot = Snapshot::empty();
    for name in file_names {
        let name = name.as_ref();
        match ActivityMarker::parse(name, registry) {
            Some(marker) => snapshot.insert(&marker),
            None => tracing::trace!(file = %name, "Ignoring unrecognized activity file"),
        }
    }
    snapshot
}

/// Reads `dir` and aggregates it.
///
/// A missing or unreadable directory reads as "no markers": nobody may have
/// written to it yet, and the next tick retries anyway.
pub fn scan_markers(dir: &Path, registry: &AgentRegistry) -> Snapshot {
    aggregate(list_file_names(dir), registry)
}

pub(crate) fn list_file_names(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() != ErrorKind::NotFound {
                tracing::debug!(dir = %dir.display(), error = %err, "Signal directory unreadable");
            }
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_type()
                .map(|kind| !kind.is_dir())
                .unwrap_or(false)
        })
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect()
}
