use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::connector::metrics::{error_counted, ReplicationMetrics};
use crate::connector::scn::Scn;
use crate::connector::source::{CallbackError, CommitCallback, DispatchError, SourceContext};
use crate::connector::{Error, ErrorHandler, Result};

/// One scheduled commit: the transaction's callbacks moved out of the
/// buffer, plus everything they need at execution time.
pub(crate) struct EmissionTask {
    pub callbacks: Vec<Box<dyn CommitCallback>>,
    pub timestamp: DateTime<Utc>,
    pub smallest_open_scn: Option<Scn>,
    pub commit_scn: Scn,
    pub ctx: SourceContext,
}

/// Dedicated thread draining commit-scheduled tasks in FIFO order, so
/// emission order equals commit-arrival order. A bounded queue makes the
/// mining thread block rather than buffer unboundedly.
pub(crate) struct EmissionWorker {
    sender: Option<SyncSender<EmissionTask>>,
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
    force_stop: Arc<AtomicBool>,
}

impl EmissionWorker {
    pub(crate) fn spawn(
        queue_capacity: usize,
        last_committed_scn: Arc<AtomicU64>,
        pending: Arc<AtomicUsize>,
        metrics: Arc<ReplicationMetrics>,
        errors: ErrorHandler,
    ) -> Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(queue_capacity);
        let (done_sender, done) = mpsc::channel();
        let force_stop = Arc::new(AtomicBool::new(false));
        let worker_stop = force_stop.clone();
        let handle = std::thread::Builder::new()
            .name("oracle-cdc-emission".to_owned())
            .spawn(move || {
                run(receiver, worker_stop, last_committed_scn, pending, metrics, errors);
                let _ = done_sender.send(());
            })
            .map_err(Error::from)?;
        Ok(Self {
            sender: Some(sender),
            done,
            handle: Some(handle),
            force_stop,
        })
    }

    pub(crate) fn submit(&self, task: EmissionTask) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(Error::EmissionWorkerStopped)?;
        sender.send(task).map_err(|_| Error::EmissionWorkerStopped)
    }

    /// Lets the worker drain its queue for up to a second, then abandons
    /// it. An abandoned worker skips execution of whatever remains.
    pub(crate) fn close(&mut self) {
        drop(self.sender.take());
        match self.done.recv_timeout(Duration::from_secs(1)) {
            Ok(()) => {
                if let Some(handle) = self.handle.take() {
                    let _ = handle.join();
                }
            }
            Err(_) => {
                self.force_stop.store(true, Ordering::Relaxed);
                drop(self.handle.take());
            }
        }
    }
}

impl Drop for EmissionWorker {
    fn drop(&mut self) {
        drop(self.sender.take());
        drop(self.handle.take());
    }
}

fn run(
    receiver: Receiver<EmissionTask>,
    force_stop: Arc<AtomicBool>,
    last_committed_scn: Arc<AtomicU64>,
    pending: Arc<AtomicUsize>,
    metrics: Arc<ReplicationMetrics>,
    errors: ErrorHandler,
) {
    while let Ok(task) = receiver.recv() {
        if !force_stop.load(Ordering::Relaxed) {
            let dml_count = task.callbacks.len();
            match execute(&task) {
                Ok(true) => {
                    last_committed_scn.store(task.commit_scn.as_u64(), Ordering::Relaxed);
                    metrics.increment_committed_transactions();
                    metrics.increment_committed_dml(dml_count);
                    metrics.set_committed_scn(task.commit_scn);
                }
                Ok(false) => {
                    log::debug!(
                        "emission of commit SCN {} aborted, source is shutting down",
                        task.commit_scn
                    );
                }
                Err(e) => {
                    error_counted!(metrics, "emission of commit SCN {} failed: {e}", task.commit_scn);
                    errors.set_producer_error(e);
                }
            }
        }
        pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs one task's callbacks in insertion order. `Ok(false)` means a clean
/// abort: the source stopped or the downstream queue shut down.
fn execute(task: &EmissionTask) -> Result<bool> {
    let mut remaining = task.callbacks.len();
    for callback in &task.callbacks {
        if !task.ctx.is_running() {
            return Ok(false);
        }
        remaining -= 1;
        match callback.execute(
            task.timestamp,
            task.smallest_open_scn,
            task.commit_scn,
            remaining,
        ) {
            Ok(()) => {}
            Err(CallbackError::Dispatch(DispatchError::Closed)) => return Ok(false),
            Err(e) => return Err(Error::Emission(e)),
        }
    }
    Ok(true)
}
