//! Flush policies and the background flush worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Controls when the collection gets written to disk, and where reads come from.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Re-read the document on every load and write it after every save.
    /// The disk is the only source of truth.
    #[default]
    Immediate,
    /// Serve from memory; a background thread writes on a timer and whenever
    /// the collection changes.
    Async(Duration),
    /// Serve from memory; only write when `flush()` is called.
    Manual,
}

impl FlushPolicy {
    /// `true` when loads must go to disk rather than the in-memory copy.
    #[must_use]
    pub fn reads_from_disk(&self) -> bool {
        matches!(self, FlushPolicy::Immediate)
    }
}

/// Background thread that calls a flush closure on a timer or when poked.
/// Joins the thread on drop so nothing leaks.
pub struct AsyncFlushWorker {
    stop: Arc<AtomicBool>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl AsyncFlushWorker {
    /// Spawn a worker listening on `rx`. The caller keeps the sender side and
    /// drops it when the store is done, which tells the worker to exit.
    pub fn spawn<F>(interval: Duration, flush_fn: F, rx: mpsc::Receiver<()>) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let join_handle = thread::Builder::new()
            .name("products-flush".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    match rx.recv_timeout(interval) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Timeout) => flush_fn(),
                        Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
                // Last write so nothing saved since the previous tick is lost.
                flush_fn();
            });

        let join_handle = match join_handle {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!("failed to spawn flush worker: {e}");
                None
            }
        };

        Self { stop, join_handle }
    }

    /// `true` while the background thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AsyncFlushWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.join_handle.take() {
            let _ = h.join();
        }
    }
}

impl std::fmt::Debug for AsyncFlushWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFlushWorker")
            .field("running", &self.is_running())
            .finish()
    }
}
