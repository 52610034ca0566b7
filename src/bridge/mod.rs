//! Runs blocking extraction calls off the async runtime.
//!
//! The extraction tools used by this crate are synchronous: they spawn
//! processes, wait on them, and download subtitle files with a blocking
//! HTTP client. [`BlockingBridge`] moves each such call onto tokio's
//! blocking thread pool and hands the result back as a future, so request
//! handling on the runtime keeps making progress while the call runs.
//!
//! Cancellation: dropping the future returned by [`BlockingBridge::run`]
//! only stops waiting for the result. The blocking call itself runs to
//! completion on its worker thread and keeps its concurrency permit until
//! then.
//!
//! Panics: a panic inside a blocking call resumes on the awaiting task.
//! Release builds set `panic = "abort"`, so there the process aborts at the
//! original panic instead and nothing resumes.

use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Blocking task was cancelled before it completed")]
    Cancelled,

    #[error("Blocking worker pool has been shut down")]
    Closed,
}

/// Bridge between blocking calls and the async runtime
#[derive(Debug, Clone)]
pub struct BlockingBridge {
    permits: Arc<Semaphore>,
}

impl BlockingBridge {
    /// Create a bridge allowing at most `max_concurrent` blocking calls at once
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run `task` on the blocking pool and await its return value.
    ///
    /// Whatever `task` returns, including its own `Err`, is handed back
    /// untouched. A panic inside `task` resumes on the awaiting task. The
    /// call is executed exactly once and never retried.
    pub async fn run<F, T>(&self, task: F) -> Result<T, BridgeError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| BridgeError::Closed)?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        });

        match handle.await {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(BridgeError::Cancelled),
        }
    }
}

impl Default for BlockingBridge {
    fn default() -> Self {
        Self::new(4)
    }
}
