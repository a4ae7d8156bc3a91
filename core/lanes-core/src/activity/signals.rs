//! One-shot notify signals.
//!
//! A producer drops a file whose body is a workspace id into the notify
//! directory; the next poll tick reads it, deletes it, and forces a stop for
//! that workspace. Producers use this when the agent is blocked on the user
//! but its activity marker is still in place.
//!
//! Consumption is read-then-delete. Only the caller whose `remove_file`
//! succeeds gets the signal; a concurrent poller that loses the race sees
//! `NotFound` and moves on, so each file is processed at most once.

use fs_err as fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::activity::markers::list_file_names;
use crate::error::{LanesError, Result};
use crate::types::WorkspaceId;

#[derive(Debug, PartialEq, Eq)]
enum Consumed {
    Signal(WorkspaceId),
    /// Another consumer deleted it first.
    Lost,
    /// Deleted, but the body was not a workspace id.
    Malformed,
    /// Left in place for the next tick.
    Deferred,
}

/// Writes a signal for `workspace` and returns its path.
///
/// The body is written to a hidden temp file in the same directory and
/// renamed into place, so a poller never sees a partial id.
pub fn write_notify_signal(dir: &Path, workspace: &WorkspaceId) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|err| LanesError::io("creating notify directory", err))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".tmp")
        .tempfile_in(dir)
        .map_err(|err| LanesError::io("creating notify temp file", err))?;
    temp.write_all(workspace.as_str().as_bytes())
        .map_err(|err| LanesError::io("writing notify signal", err))?;

    // ULIDs sort by creation time, which keeps consumption roughly FIFO.
    let path = dir.join(ulid::Ulid::new().to_string());
    temp.persist(&path)
        .map_err(|err| LanesError::io("committing notify signal", err.error))?;
    Ok(path)
}

/// Consumes every pending signal in `dir`, returning the target workspaces
/// in file order. Never fails; anything odd is logged and skipped.
pub fn consume_notify_signals(dir: &Path) -> Vec<WorkspaceId> {
    let mut names = list_file_names(dir);
    names.retain(|name| !name.starts_with('.'));
    names.sort();

    names
        .into_iter()
        .filter_map(|name| match consume_signal_file(&dir.join(&name)) {
            Consumed::Signal(workspace) => Some(workspace),
            Consumed::Lost | Consumed::Malformed | Consumed::Deferred => None,
        })
        .collect()
}

fn consume_signal_file(path: &Path) -> Consumed {
    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(err) if err.kind() == ErrorKind::NotFound => return Consumed::Lost,
        Err(err) if err.kind() == ErrorKind::InvalidData => String::new(),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "Notify signal unreadable; retrying next tick");
            return Consumed::Deferred;
        }
    };

    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => return Consumed::Lost,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Failed to delete notify signal");
            return Consumed::Deferred;
        }
    }

    match WorkspaceId::new(&body) {
        Ok(workspace) => Consumed::Signal(workspace),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "Dropping malformed notify signal");
            Consumed::Malformed
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
    fn test_write_then_consume_deletes_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = write_notify_signal(temp.path(), &ws("w1")).expect("write");
        assert!(path.exists());

        assert_eq!(consume_notify_signals(temp.path()), vec![ws("w1")]);
        assert!(!path.exists());
        assert!(consume_notify_signals(temp.path()).is_empty());
    }

    #[test]
    fn test_consume_missing_directory_is_empty() {
        let temp = tempfile::tempdir().expect("temp dir");
        assert!(consume_notify_signals(&temp.path().join("nope")).is_empty());
    }

    #[test]
    fn test_lost_race_is_a_no_op() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = write_notify_signal(temp.path(), &ws("w1")).expect("write");
        std::fs::remove_file(&path).expect("competing delete");

        assert_eq!(consume_signal_file(&path), Consumed::Lost);
    }

    #[test]
    fn test_malformed_body_is_deleted_and_dropped() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("bogus");
        std::fs::write(&path, "../../etc").expect("write");

        assert!(consume_notify_signals(temp.path()).is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_body_whitespace_is_trimmed() {
        let temp = tempfile::tempdir().expect("temp dir");
        std::fs::write(temp.path().join("manual"), "w2\n").expect("write");
        assert_eq!(consume_notify_signals(temp.path()), vec![ws("w2")]);
    }

    #[test]
    fn test_in_flight_temp_files_are_left_alone() {
        let temp = tempfile::tempdir().expect("temp dir");
        let in_flight = temp.path().join(".tmpXYZ");
        std::fs::write(&in_flight, "w1").expect("write");

        assert!(consume_notify_signals(temp.path()).is_empty());
        assert!(in_flight.exists());
    }

    #[test]
    fn test_signals_are_consumed_in_creation_order() {
        let temp = tempfile::tempdir().expect("temp dir");
        write_notify_signal(temp.path(), &ws("first")).expect("write");
        std::thread::sleep(std::time::Duration::from_millis(2));
        write_notify_signal(temp.path(), &ws("second")).expect("write");

        assert_eq!(
            consume_notify_signals(temp.path()),
            vec![ws("first"), ws("second")]
        );
    }
}
