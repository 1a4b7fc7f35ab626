//! List refresh sequencing
//!
//! Every fetch gets a ticket with a sequence number. Only the result of the
//! most recently issued ticket is applied; anything older is discarded.

use crate::idle::Activity;
use tokio::task::JoinHandle;

/// Handle for one list fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    /// Show a success notification when this fetch lands
    pub notify: bool,
}

/// Issues fetch tickets and decides which results to keep
#[derive(Debug, Default)]
pub struct Poller {
    issued: u64,
    in_flight: Option<u64>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Periodic tick. No-op while idle or while a fetch is outstanding.
    pub fn on_tick(&mut self, activity: Activity) -> Option<FetchTicket> {
        if activity.is_idle() {
            tracing::debug!("Not updating, idle");
            return None;
        }
        if self.in_flight.is_some() {
            tracing::debug!("Not updating, fetch {} still in flight", self.issued);
            return None;
        }
        Some(self.issue(false))
    }

    /// Manual sync or refresh after a replay. Supersedes any outstanding fetch.
    pub fn force(&mut self, notify: bool) -> FetchTicket {
        self.issue(notify)
    }

    /// A fetch finished. Returns true if its result should be applied.
    pub fn complete(&mut self, seq: u64) -> bool {
        if seq == self.issued {
            self.in_flight = None;
            true
        } else {
            tracing::debug!("Discarding stale fetch {} (latest {})", seq, self.issued);
            false
        }
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    fn issue(&mut self, notify: bool) -> FetchTicket {
        self.issued += 1;
        self.in_flight = Some(self.issued);
        FetchTicket {
            seq: self.issued,
            notify,
        }
    }
}

/// Owns spawned network tasks and aborts them on teardown
#[derive(Default)]
pub struct TaskGuard {
    fetch: Option<JoinHandle<()>>,
    others: Vec<JoinHandle<()>>,
}

impl TaskGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the current list fetch, aborting the one it supersedes
    pub fn replace_fetch(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.fetch.replace(handle) {
            previous.abort();
        }
    }

    /// Track any other task (replay, registration)
    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.others.retain(|h| !h.is_finished());
        self.others.push(handle);
    }

    pub fn abort_all(&mut self) {
        if let Some(task) = self.fetch.take() {
            task.abort();
        }
        for task in self.others.drain(..) {
            task.abort();
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.abort_all();
    }
}
