//! Fixed-period driver for the activity pipeline.
//!
//! Each tick: consume notify signals → scan markers → reconcile against the
//! previous snapshot → apply to the sink → publish → keep the new snapshot.
//! The loop is the only owner of the previous snapshot. `tick` holds the
//! tracker lock for its whole duration, so a manual tick and the background
//! thread never overlap.
//!
//! At most one background loop runs per process. Two loops over the same
//! directories would race for signals and report every marker twice.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::directory::ActivitySink;
use super::markers::{scan_markers, Snapshot};
use super::reconciler::{apply_transitions, ActivityReconciler, Transition};
use super::signals::consume_notify_signals;
use crate::agents::AgentRegistry;
use crate::config::LanesConfig;
use crate::error::{LanesError, Result};
use crate::types::WorkspaceId;

// Upper bound on how long `stop` waits for the thread to notice.
const STOP_CHECK_SLICE: Duration = Duration::from_millis(25);

static POLL_LOOP_RUNNING: AtomicBool = AtomicBool::new(false);

/// The process-wide run slot. Released on drop.
struct RunClaim;

impl RunClaim {
    fn acquire() -> Option<Self> {
        POLL_LOOP_RUNNING
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunClaim)
    }
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        POLL_LOOP_RUNNING.store(false, Ordering::SeqCst);
    }
}

/// A transition as published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEvent {
    #[serde(flatten)]
    pub transition: Transition,
    pub observed_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tracker {
    previous: Snapshot,
    reconciler: ActivityReconciler,
}

struct PollState {
    activity_dir: PathBuf,
    notify_dir: PathBuf,
    interval: Duration,
    registry: AgentRegistry,
    sink: Arc<dyn ActivitySink>,
    tracker: Mutex<Tracker>,
    subscribers: Mutex<Vec<Sender<ActivityEvent>>>,
}

struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    _claim: RunClaim,
}

pub struct PollLoop {
    state: Arc<PollState>,
    worker: Mutex<Option<Worker>>,
}

fn recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PollState {
    fn tick(&self) -> Vec<Transition> {
        let mut tracker = recover(&self.tracker);

        let forced = consume_notify_signals(&self.notify_dir);
        let current = scan_markers(&self.activity_dir, &self.registry);

        let Tracker {
            previous,
            reconciler,
        } = &mut *tracker;
        let transitions = reconciler.reconcile(previous, &current, &forced, self.sink.as_ref());
        apply_transitions(&transitions, self.sink.as_ref());
        self.sink
            .prune_removed(&|workspace: &WorkspaceId| current.is_active(workspace));
        *previous = current;

        for transition in &transitions {
            tracing::info!(
                workspace = %transition.workspace(),
                transition = ?transition,
                "Workspace activity transition"
            );
        }
        tracing::debug!(
            forced = forced.len(),
            active = previous.len(),
            transitions = transitions.len(),
            "Activity poll tick"
        );

        self.publish(&transitions);
        transitions
    }

    fn publish(&self, transitions: &[Transition]) {
        if transitions.is_empty() {
            return;
        }
        let observed_at = Utc::now();
        let mut subscribers = recover(&self.subscribers);
        subscribers.retain(|subscriber| {
            transitions.iter().all(|transition| {
                subscriber
                    .send(ActivityEvent {
                        transition: transition.clone(),
                        observed_at,
                    })
                    .is_ok()
            })
        });
    }

    fn run(&self, stop: &AtomicBool) {
        tracing::info!(
            activity_dir = %self.activity_dir.display(),
            notify_dir = %self.notify_dir.display(),
            interval_ms = self.interval.as_millis() as u64,
            "Activity poll loop started"
        );

        while !stop.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.tick();

            // Overrunning ticks roll straight into the next one.
            let deadline = started + self.interval;
            while !stop.load(Ordering::SeqCst) {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                thread::sleep((deadline - now).min(STOP_CHECK_SLICE));
            }
        }

        tracing::info!("Activity poll loop stopped");
    }
}

impl PollLoop {
    pub fn new(config: &LanesConfig, registry: AgentRegistry, sink: Arc<dyn ActivitySink>) -> Self {
        Self {
            state: Arc::new(PollState {
                activity_dir: config.activity_dir.clone(),
                notify_dir: config.notify_dir.clone(),
                interval: config.poll_interval(),
                registry,
                sink,
                tracker: Mutex::new(Tracker::default()),
                subscribers: Mutex::new(Vec::new()),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Runs one tick on the calling thread.
    pub fn tick(&self) -> Vec<Transition> {
        self.state.tick()
    }

    /// Receives every transition from now on. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> Receiver<ActivityEvent> {
        let (sender, receiver) = mpsc::channel();
        recover(&self.state.subscribers).push(sender);
        receiver
    }

    /// Spawns the background thread.
    ///
    /// Fails with [`LanesError::PollLoopAlreadyRunning`] while this or any
    /// other loop in the process is running.
    pub fn start(&self) -> Result<()> {
        let mut worker = recover(&self.worker);
        if let Some(existing) = worker.as_ref() {
            if !existing.handle.is_finished() {
                tracing::error!("Refusing to start a second activity poll loop");
                return Err(LanesError::PollLoopAlreadyRunning);
            }
        }
        if let Some(finished) = worker.take() {
            let _ = finished.handle.join();
        }

        let Some(claim) = RunClaim::acquire() else {
            tracing::error!("Refusing to start a second activity poll loop in this process");
            return Err(LanesError::PollLoopAlreadyRunning);
        };

        // Fresh start: whatever is on disk now is reported as new activity.
        *recover(&self.state.tracker) = Tracker::default();

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let state = Arc::clone(&self.state);
        let handle = thread::Builder::new()
            .name("lanes-activity-poll".to_string())
            .spawn(move || state.run(&thread_stop))
            .map_err(LanesError::PollThreadSpawnFailed)?;

        *worker = Some(Worker {
            stop,
            handle,
            _claim: claim,
        });
        Ok(())
    }

    /// Stops the background thread and waits for it. No-op when idle.
    pub fn stop(&self) {
        let Some(worker) = recover(&self.worker).take() else {
            return;
        };
        worker.stop.store(true, Ordering::SeqCst);
        if worker.handle.join().is_err() {
            tracing::warn!("Activity poll thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        recover(&self.worker)
            .as_ref()
            .map(|worker| !worker.handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
