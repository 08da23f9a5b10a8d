//! Serialized LIFO queue in front of the image transcoder.
//!
//! Transcoding is CPU- and I/O-heavy, so at most one job runs at a time.
//! Pending jobs are served newest first: the latest request usually comes
//! from what the visitor is looking at right now, while older requests
//! belong to pages they may already have scrolled away from.
//!
//! The queue does not de-duplicate; two jobs for the same destination run
//! twice. De-duplication happens one layer up in the resolver.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::error::TranscodeError;

use super::transcoder::{ImageTranscoder, TranscodeJob};

struct PendingJob {
    job: TranscodeJob,
    done: oneshot::Sender<Result<(), TranscodeError>>,
}

#[derive(Default)]
struct QueueState {
    /// Stack of waiting jobs; the last element runs next
    pending: Vec<PendingJob>,
    running: bool,
}

struct QueueInner {
    transcoder: Arc<dyn ImageTranscoder>,
    state: Mutex<QueueState>,
}

impl QueueInner {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        // The state is a plain Vec and flag; a panic elsewhere cannot leave it torn
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Single-worker job queue with last-in-first-out ordering.
///
/// Cloning is cheap and shares the same queue.
#[derive(Clone)]
pub struct ResizeQueue {
    inner: Arc<QueueInner>,
}

impl ResizeQueue {
    pub fn new(transcoder: Arc<dyn ImageTranscoder>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                transcoder,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Queue `job` and return a future resolving when it has run.
    ///
    /// The job is pushed before this function returns, so enqueue order is
    /// call order, not poll order. Dropping the returned future does not
    /// cancel the job.
    pub fn enqueue(
        &self,
        job: TranscodeJob,
    ) -> impl Future<Output = Result<(), TranscodeError>> + Send + 'static {
        let (done, finished) = oneshot::channel();
        let target = job.target().display().to_string();

        let start_worker = {
            let mut state = self.inner.lock_state();
            state.pending.push(PendingJob { job, done });
            debug!(target = %target, pending = state.pending.len(), "Transcode queued");
            !std::mem::replace(&mut state.running, true)
        };

        if start_worker {
            tokio::spawn(run_worker(Arc::clone(&self.inner)));
        }

        async move { finished.await.unwrap_or(Err(TranscodeError::WorkerGone)) }
    }

    /// Number of jobs waiting to run (excluding the running one).
    pub fn pending_count(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    /// Whether a job is currently being transcoded.
    pub fn is_running(&self) -> bool {
        self.inner.lock_state().running
    }
}

/// Drain the stack until empty, one job at a time.
async fn run_worker(inner: Arc<QueueInner>) {
    loop {
        let next = {
            let mut state = inner.lock_state();
            match state.pending.pop() {
                Some(next) => next,
                None => {
                    state.running = false;
                    return;
                }
            }
        };

        let target = next.job.target().display().to_string();
        debug!(target = %target, "Transcode started");

        // A panicking transcoder fails its own job; the worker keeps draining
        let result = AssertUnwindSafe(inner.transcoder.run(&next.job))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(TranscodeError::Failed {
                    message: "transcoder panicked".to_string(),
                })
            });
        match &result {
            Ok(()) => debug!(target = %target, "Transcode finished"),
            Err(e) => error!(target = %target, error = %e, "Transcode failed"),
        }

        // Receiver gone means the requester stopped waiting; the file still exists
        let _ = next.done.send(result);
    }
}
