//! Workspace activity tracking.
//!
//! Answers two questions for the UI: which workspaces have an agent working
//! right now, and which finished while the user was looking elsewhere.
//!
//! # Architecture: Filesystem Signal Channel
//!
//! Agents run sandboxed hook scripts with no IPC back to us, so they talk
//! through files. We poll; they never wait on us.
//!
//! ```text
//! agent hook → lanes-hook → marker / notify files → PollLoop tick
//!      → aggregate (Snapshot) → ActivityReconciler (Transitions)
//!      → WorkspaceDirectory (active / unread / focus)
//! ```
//!
//! Anything that happens between two ticks and undoes itself is invisible.
//! State may lag the filesystem by one poll interval.
//!
//! # Module Structure
//!
//! - [`markers`]: marker filenames and the stateless aggregator
//! - [`signals`]: one-shot notify files (write, consume exactly once)
//! - [`reconciler`]: snapshot diff → transitions, forced-stop holds
//! - [`directory`]: the state owner and the [`ActivitySink`] seam
//! - [`poll_loop`]: the timer that ties it together

pub mod directory;
pub mod markers;
pub mod poll_loop;
pub mod reconciler;
pub mod signals;

pub use directory::{ActivitySink, WorkspaceActivityState, WorkspaceDirectory};
pub use markers::{aggregate, scan_markers, ActivityMarker, Snapshot};
pub use poll_loop::{ActivityEvent, PollLoop};
pub use reconciler::{apply_transitions, ActivityReconciler, Transition};
pub use signals::{consume_notify_signals, write_notify_signal};
