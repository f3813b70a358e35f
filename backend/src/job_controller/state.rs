//! Tracks report generation runs that are currently executing.
//!
//! A run is synchronous from the caller's point of view, so nothing here
//! schedules work. The tracker only answers "is a run for this report in
//! flight?" and makes overlapping runs for one report visible in the logs.
//! Overlap is allowed: the terminal write of whichever run finishes last wins.
//!
//! The main components are:
//! - `RunTracker`: a clonable, thread-safe registry shared by every worker.
//! - `RunGuard`: returned by `RunTracker::begin`; dropping it ends the run,
//!   even when the request future is cancelled half way.

use log::warn;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone, Default)]
pub struct RunTracker {
    /// Report id to the ids of its in-flight runs.
    runs: Arc<Mutex<HashMap<String, Vec<u64>>>>,
    next_run: Arc<AtomicU64>,
}

/// Marks one in-flight run. The run ends when the guard is dropped.
pub struct RunGuard {
    tracker: RunTracker,
    report_id: String,
    run_id: u64,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, report_id: &str) -> RunGuard {
        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed) + 1;
        let mut runs = self.lock();
        let active = runs.entry(report_id.to_string()).or_default();
        if !active.is_empty() {
            warn!(
                "report {} already has {} run(s) in flight; the last one to finish wins",
                report_id,
                active.len()
            );
        }
        active.push(run_id);
        RunGuard {
            tracker: self.clone(),
            report_id: report_id.to_string(),
            run_id,
        }
    }

    pub fn in_flight(&self, report_id: &str) -> usize {
        self.lock().get(report_id).map_or(0, Vec::len)
    }

    fn finish(&self, report_id: &str, run_id: u64) {
        let mut runs = self.lock();
        if let Some(active) = runs.get_mut(report_id) {
            active.retain(|id| *id != run_id);
            if active.is_empty() {
                runs.remove(report_id);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u64>>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RunGuard {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.tracker.finish(&self.report_id, self.run_id);
    }
}
