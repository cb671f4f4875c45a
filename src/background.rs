//! Detached side effects that must not block or fail the request that started them.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::middleware::recover::panic_message;

#[derive(Default)]
struct Inner {
    active: AtomicUsize,
    closed: AtomicBool,
    idle: Notify,
}

/// Counts background jobs so shutdown can wait for them.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

/// Decrements the live count exactly once, however the job ends.
struct InFlight(Arc<Inner>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` on its own task. Errors and panics are logged, never propagated.
    ///
    /// After [`close`](Self::close) the job is logged and dropped.
    pub fn spawn<F>(&self, name: &'static str, work: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        // count first so `close` either sees this job or we see `closed`
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(self.inner.clone());
        if self.inner.closed.load(Ordering::SeqCst) {
            warn!(task = name, "background tasks are closed, dropping job");
            return;
        }

        tokio::spawn(async move {
            let _guard = guard;
            match AssertUnwindSafe(work).catch_unwind().await {
                Ok(Ok(())) => debug!(task = name, "background task finished"),
                Ok(Err(err)) => error!(task = name, error = ?err, "background task failed"),
                Err(payload) => error!(
                    task = name,
                    panic = %panic_message(payload.as_ref()),
                    "background task panicked"
                ),
            }
        });
    }

    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Wait for running jobs, then refuse new ones.
    pub async fn close(&self) {
        self.wait_idle().await;
        self.inner.closed.store(true, Ordering::SeqCst);
        // a job may have registered between the wait and the flag
        self.wait_idle().await;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Resolves once no background job is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // register before checking so a wakeup between the two isn't missed
            notified.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}
