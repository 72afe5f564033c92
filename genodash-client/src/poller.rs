//! Job status poll loop
//!
//! Each watched job owns exactly one loop. The loop issues a status
//! request immediately and then once per interval while the job is in
//! flight; a terminal snapshot is delivered exactly once and stops the
//! loop. Teardown goes through a `CancellationToken`: once `cancel` is
//! called no further callback fires, even for a response already in
//! flight (it is discarded on arrival).
//!
//! Responses are applied through a shared [`JobStateCell`] keyed by
//! request sequence number, so a stale response can never overwrite a
//! newer one.

use crate::analysis::AnalysisService;
use genodash_common::config::ClientConfig;
use genodash_common::models::AnalysisJob;
use genodash_common::Error;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Poll loop tuning, taken from [`ClientConfig`]
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Consecutive failures before a `TransientFailure` event is surfaced
    pub warn_after: u32,
    /// Consecutive failures before the loop gives up entirely
    pub max_failures: u32,
}

impl From<&ClientConfig> for PollerConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval,
            warn_after: config.poll_warn_after,
            max_failures: config.poll_max_failures,
        }
    }
}

/// Why a poll loop stopped. Caller-initiated cancellation produces no
/// event at all, so it has no reason here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Job reached Completed
    Completed,
    /// Job reached Failed
    Failed,
    /// 404 for the analysis id
    NotFound,
    /// 401/403 during polling
    Unauthorized,
    /// Backend rejected the status request outright (non-retryable)
    Rejected,
    /// Hard cap on consecutive transient failures reached
    RetriesExhausted,
}

/// Events delivered to the watch callback
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// Fresh job snapshot; the terminal snapshot is the final one
    Update(AnalysisJob),
    /// Repeated transient failures; last-known progress stays valid and
    /// retries continue in the background
    TransientFailure { consecutive: u32, message: String },
    /// The loop ended and no further events will follow
    Stopped(StopReason),
}

/// Latest applied snapshot, ordered by request sequence number.
///
/// `apply` rejects any snapshot whose sequence is not newer than the
/// last applied one, so responses arriving out of order can never roll
/// displayed state backwards.
#[derive(Default)]
pub struct JobStateCell {
    inner: Mutex<CellInner>,
}

#[derive(Default)]
struct CellInner {
    applied_seq: u64,
    latest: Option<AnalysisJob>,
}

impl JobStateCell {
    /// Apply a snapshot from request `seq`. Returns false when a newer
    /// request already won.
    pub fn apply(&self, seq: u64, job: AnalysisJob) -> bool {
        let mut inner = self.inner.lock().expect("job state lock poisoned");
        if seq <= inner.applied_seq {
            return false;
        }
        inner.applied_seq = seq;
        inner.latest = Some(job);
        true
    }

    pub fn latest(&self) -> Option<AnalysisJob> {
        self.inner
            .lock()
            .expect("job state lock poisoned")
            .latest
            .clone()
    }
}

/// Owning handle for one poll subscription.
///
/// Must be cancelled (or allowed to finish) by the view that created it;
/// cancelling synchronously prevents any further callback invocation.
#[derive(Clone)]
pub struct PollHandle {
    analysis_id: String,
    cancel: CancellationToken,
    state: Arc<JobStateCell>,
    active: Arc<AtomicBool>,
    finished: Arc<Notify>,
    /// Held across every callback invocation; `cancel` synchronizes on it
    /// so teardown cannot race a delivery already past the token check.
    delivery: Arc<Mutex<()>>,
}

impl PollHandle {
    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }

    /// Tear down the subscription. Idempotent. After this returns, no
    /// further `PollEvent` is delivered for this handle, even if a
    /// status request is currently in flight.
    ///
    /// Blocks until a delivery already executing has finished, so it
    /// must not be called from inside the `on_update` callback itself.
    pub fn cancel(&self) {
        self.cancel.cancel();
        // A delivery that passed the token check before the cancel
        // must complete before teardown is considered done.
        drop(self.delivery.lock().expect("delivery lock poisoned"));
    }

    /// True while the loop is still running
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Last applied snapshot, if any
    pub fn latest(&self) -> Option<AnalysisJob> {
        self.state.latest()
    }

    /// Wait until the loop has fully stopped (terminal state, fatal
    /// error, retry exhaustion, or cancellation).
    pub async fn wait(&self) {
        loop {
            let notified = self.finished.notified();
            if !self.active.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

/// Spawns and tracks poll loops, one per analysis id.
///
/// `watch` is idempotent per id: while a loop is active, a second call
/// returns the existing handle instead of racing a duplicate loop.
pub struct JobPoller {
    analyses: Arc<AnalysisService>,
    config: PollerConfig,
    active: Arc<Mutex<HashMap<String, PollHandle>>>,
}

impl JobPoller {
    pub fn new(analyses: Arc<AnalysisService>, config: PollerConfig) -> Self {
        Self {
            analyses,
            config,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start polling `analysis_id`, delivering events to `on_update`.
    ///
    /// If a loop for this id is already active the existing subscription
    /// is returned unchanged and `on_update` is dropped.
    pub fn watch<F>(&self, analysis_id: &str, on_update: F) -> PollHandle
    where
        F: Fn(PollEvent) + Send + Sync + 'static,
    {
        let mut registry = self.active.lock().expect("poller registry poisoned");
        if let Some(existing) = registry.get(analysis_id) {
            if existing.is_active() {
                tracing::debug!(analysis_id = %analysis_id, "Poll loop already active, returning existing subscription");
                return existing.clone();
            }
        }

        let handle = PollHandle {
            analysis_id: analysis_id.to_string(),
            cancel: CancellationToken::new(),
            state: Arc::new(JobStateCell::default()),
            active: Arc::new(AtomicBool::new(true)),
            finished: Arc::new(Notify::new()),
            delivery: Arc::new(Mutex::new(())),
        };
        registry.insert(analysis_id.to_string(), handle.clone());
        drop(registry);

        tokio::spawn(run_loop(
            self.analyses.clone(),
            self.config.clone(),
            self.active.clone(),
            handle.clone(),
            Arc::new(on_update),
        ));

        handle
    }
}

async fn run_loop(
    analyses: Arc<AnalysisService>,
    config: PollerConfig,
    registry: Arc<Mutex<HashMap<String, PollHandle>>>,
    handle: PollHandle,
    on_update: Arc<dyn Fn(PollEvent) + Send + Sync>,
) {
    let analysis_id = handle.analysis_id.clone();
    let cancel = handle.cancel.clone();

    // Cancellation gate on every delivery: a response already in flight
    // when the view tears down must not reach the callback. The token is
    // checked under the delivery lock, which `PollHandle::cancel` also
    // takes after tripping the token, so once `cancel` returns no
    // callback can start and none is still running.
    let emit = |event: PollEvent| {
        let _delivering = handle.delivery.lock().expect("delivery lock poisoned");
        if !cancel.is_cancelled() {
            on_update(event);
        }
    };

    let mut seq: u64 = 0;
    let mut consecutive_failures: u32 = 0;

    loop {
        seq += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = analyses.get(&analysis_id) => result,
        };
        if cancel.is_cancelled() {
            break;
        }

        match result {
            Ok(job) => {
                consecutive_failures = 0;
                let terminal = job.is_terminal();
                let status = job.status;

                if handle.state.apply(seq, job.clone()) {
                    emit(PollEvent::Update(job));
                } else {
                    tracing::debug!(analysis_id = %analysis_id, seq, "Dropped stale poll response");
                }

                if terminal {
                    tracing::info!(analysis_id = %analysis_id, ?status, "Job reached terminal state, polling stopped");
                    emit(PollEvent::Stopped(if status == genodash_common::models::JobStatus::Failed {
                        StopReason::Failed
                    } else {
                        StopReason::Completed
                    }));
                    break;
                }
            }
            Err(e) if e.is_retryable_in_poll() => {
                consecutive_failures += 1;
                tracing::warn!(
                    analysis_id = %analysis_id,
                    consecutive = consecutive_failures,
                    error = %e,
                    "Transient poll failure, retrying at next interval"
                );
                if consecutive_failures == config.warn_after {
                    emit(PollEvent::TransientFailure {
                        consecutive: consecutive_failures,
                        message: e.to_string(),
                    });
                }
                if consecutive_failures >= config.max_failures {
                    tracing::error!(analysis_id = %analysis_id, "Retry budget exhausted, giving up");
                    emit(PollEvent::Stopped(StopReason::RetriesExhausted));
                    break;
                }
            }
            Err(Error::NotFound(message)) => {
                tracing::error!(analysis_id = %analysis_id, %message, "Analysis not found, polling stopped");
                emit(PollEvent::Stopped(StopReason::NotFound));
                break;
            }
            Err(Error::Auth { status, message }) => {
                tracing::error!(analysis_id = %analysis_id, status, %message, "Auth failure, polling stopped");
                emit(PollEvent::Stopped(StopReason::Unauthorized));
                break;
            }
            Err(e) => {
                tracing::error!(analysis_id = %analysis_id, error = %e, "Unexpected poll error, polling stopped");
                emit(PollEvent::Stopped(StopReason::Rejected));
                break;
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.interval) => {}
        }
    }

    handle.active.store(false, Ordering::Release);
    handle.finished.notify_waiters();

    // Remove our own registry entry; a replacement inserted after this
    // loop went inactive must be left alone.
    let mut registry = registry.lock().expect("poller registry poisoned");
    if let Some(current) = registry.get(&analysis_id) {
        if Arc::ptr_eq(&current.active, &handle.active) {
            registry.remove(&analysis_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genodash_common::models::JobStatus;

    fn snapshot(status: JobStatus, progress: f64) -> AnalysisJob {
        serde_json::from_value(serde_json::json!({
            "analysisId": "j-1",
            "status": status,
            "progress": progress,
        }))
        .unwrap()
    }

    #[test]
    fn state_cell_rejects_stale_sequence() {
        let cell = JobStateCell::default();

        assert!(cell.apply(2, snapshot(JobStatus::Running, 55.0)));
        // Request 1 resolving late must not overwrite request 2's result
        assert!(!cell.apply(1, snapshot(JobStatus::Running, 10.0)));

        assert_eq!(cell.latest().unwrap().progress(), 55.0);
    }

    #[test]
    fn state_cell_applies_in_order() {
        let cell = JobStateCell::default();
        assert!(cell.apply(1, snapshot(JobStatus::Running, 10.0)));
        assert!(cell.apply(2, snapshot(JobStatus::Running, 55.0)));
        assert!(cell.apply(3, snapshot(JobStatus::Completed, 100.0)));
        assert!(!cell.apply(3, snapshot(JobStatus::Running, 0.0)));

        let latest = cell.latest().unwrap();
        assert_eq!(latest.status, JobStatus::Completed);
        assert_eq!(latest.progress(), 100.0);
    }

    #[test]
    fn poller_config_follows_client_config() {
        let client = ClientConfig::default();
        let poller = PollerConfig::from(&client);
        assert_eq!(poller.interval, client.poll_interval);
        assert_eq!(poller.warn_after, client.poll_warn_after);
        assert_eq!(poller.max_failures, client.poll_max_failures);
    }
}
