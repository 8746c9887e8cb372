//! Shared pool that runs retry backoff timers.
//!
//! One [`BackoffScheduler`] is created by the process and handed to every
//! client. Each client holds a [`SchedulerLease`]; when the last lease is
//! released the pool cancels its pending timers and closes. A later
//! `acquire` starts a fresh generation.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Debug)]
struct Generation {
    tracker: TaskTracker,
    shutdown: CancellationToken,
    leases: usize,
}

impl Generation {
    fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            leases: 0,
        }
    }

    fn close(&self) {
        self.shutdown.cancel();
        self.tracker.close();
    }
}

/// Reference-counted pool for scheduled retry attempts.
#[derive(Debug, Clone)]
pub struct BackoffScheduler {
    pool: Arc<Mutex<Generation>>,
}

impl Default for BackoffScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffScheduler {
    pub fn new() -> Self {
        Self {
            pool: Arc::new(Mutex::new(Generation::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Generation> {
        self.pool.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take a lease on the pool. The pool stays open while any lease is alive.
    pub fn acquire(&self) -> SchedulerLease {
        let mut generation = self.lock();
        if generation.leases == 0 && generation.shutdown.is_cancelled() {
            *generation = Generation::new();
            tracing::debug!(target: "grpc_client", "Backoff scheduler reopened");
        }
        generation.leases += 1;

        SchedulerLease {
            pool: self.pool.clone(),
            tracker: generation.tracker.clone(),
            shutdown: generation.shutdown.clone(),
        }
    }

    pub fn active_leases(&self) -> usize {
        self.lock().leases
    }

    /// Number of backoff timers currently pending.
    pub fn pending(&self) -> usize {
        self.lock().tracker.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().shutdown.is_cancelled()
    }

    /// Cancel every pending timer and wait for the pool to drain.
    pub async fn shutdown(&self) {
        let tracker = {
            let generation = self.lock();
            generation.close();
            generation.tracker.clone()
        };
        tracker.wait().await;
        tracing::debug!(target: "grpc_client", "Backoff scheduler shut down");
    }
}

/// A client's handle on the [`BackoffScheduler`].
///
/// Cloning takes another lease; dropping (or [`release`](Self::release))
/// gives it back.
#[derive(Debug)]
pub struct SchedulerLease {
    pool: Arc<Mutex<Generation>>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl SchedulerLease {
    /// Run a timer of `delay` on the pool.
    ///
    /// The timer resolves to [`BackoffOutcome::Cancelled`] as soon as
    /// `cancellation` fires or the pool shuts down, so a cancelled call never
    /// starts another attempt.
    pub fn schedule(&self, delay: Duration, cancellation: &CancellationToken) -> ScheduledRetry {
        let shutdown = self.shutdown.clone();
        let cancellation = cancellation.clone();

        let handle = self.tracker.spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => BackoffOutcome::Cancelled,
                _ = cancellation.cancelled() => BackoffOutcome::Cancelled,
                _ = tokio::time::sleep(delay) => BackoffOutcome::Elapsed,
            }
        });

        ScheduledRetry { handle }
    }

    pub fn release(self) {}
}

impl Clone for SchedulerLease {
    fn clone(&self) -> Self {
        let mut generation = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        generation.leases += 1;
        Self {
            pool: self.pool.clone(),
            tracker: self.tracker.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl Drop for SchedulerLease {
    fn drop(&mut self) {
        let mut generation = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        generation.leases = generation.leases.saturating_sub(1);
        if generation.leases == 0 {
            generation.close();
            tracing::debug!(target: "grpc_client", "Last scheduler lease released, pool closed");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffOutcome {
    /// The delay elapsed; the next attempt may start.
    Elapsed,
    /// The call or the pool was cancelled first.
    Cancelled,
}

/// A pending backoff timer. Dropping it cancels the timer.
#[derive(Debug)]
pub struct ScheduledRetry {
    handle: JoinHandle<BackoffOutcome>,
}

impl ScheduledRetry {
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Future for ScheduledRetry {
    type Output = BackoffOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(BackoffOutcome::Cancelled),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ScheduledRetry {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
