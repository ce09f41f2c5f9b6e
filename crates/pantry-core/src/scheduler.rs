//! ============================================================================
//! Poll Scheduler - Named Periodic Refresh Streams
//! ============================================================================
//! Runs N independently-named refresh loops. Each stream is a single tokio
//! task that runs its action, then awaits the next interval tick with
//! missed-tick skipping: a tick landing while the action is still running is
//! dropped, never queued, so at most one invocation per stream is ever in
//! flight.
//!
//! Action failures are recorded per stream and never halt the schedule.
//! `stop` aborts the stream task synchronously; an aborted task cannot
//! resume past its await point, so no late result is applied after stop.
//! ============================================================================

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::types::Result;

/// Per-stream bookkeeping, readable while the stream runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamStatus {
    /// Completed action invocations (success or failure).
    pub runs: u64,
    pub failures: u64,
    /// Operation-prefixed text of the most recent failure.
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
}

pub struct PollScheduler {
    streams: Mutex<HashMap<String, JoinHandle<()>>>,
    statuses: Arc<RwLock<HashMap<String, StreamStatus>>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            statuses: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a named stream: run `action` immediately, then once per
    /// `every`, skipping ticks that land while a run is in flight.
    /// `label` names the operation for failure text ("load inventory" ->
    /// "Failed to load inventory: ..."). Restarting an existing name
    /// replaces the previous stream.
    pub fn start<F>(&self, name: &str, label: &str, every: Duration, action: F)
    where
        F: Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        let mut streams = self
            .streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = streams.remove(name) {
            warn!(stream = name, "restarting stream, aborting previous loop");
            previous.abort();
        }
        self.statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), StreamStatus::default());

        let statuses = Arc::clone(&self.statuses);
        let stream = name.to_string();
        let label = label.to_string();
        debug!(stream = name, interval_ms = every.as_millis() as u64, "starting stream");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // First tick completes immediately.
                ticker.tick().await;
                let outcome = action().await;
                let mut statuses = statuses.write().unwrap_or_else(PoisonError::into_inner);
                let status = statuses.entry(stream.clone()).or_default();
                status.runs += 1;
                match outcome {
                    Ok(()) => {
                        status.last_success = Some(Utc::now());
                    }
                    Err(err) => {
                        let message = err.describe(&label);
                        warn!(stream = %stream, "{message}");
                        status.failures += 1;
                        status.last_error = Some(message);
                    }
                }
            }
        });
        streams.insert(name.to_string(), handle);
    }

    /// Abort a stream. Returns false if no such stream was running. After
    /// this returns, no callback for the stream fires again.
    pub fn stop(&self, name: &str) -> bool {
        let handle = self
            .streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        match handle {
            Some(handle) => {
                handle.abort();
                debug!(stream = name, "stream stopped");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let mut streams = self
            .streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (name, handle) in streams.drain() {
            handle.abort();
            debug!(stream = %name, "stream stopped");
        }
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn status(&self, name: &str) -> Option<StreamStatus> {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn statuses(&self) -> HashMap<String, StreamStatus> {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}
