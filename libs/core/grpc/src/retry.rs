//! Retry layer: one logical unary call becomes a bounded sequence of
//! physical attempts.
//!
//! The outbound headers and message are buffered once and replayed on every
//! attempt, each with a fresh deadline. Between attempts the layer waits an
//! exponential backoff (`2^retries * base`) on the shared
//! [`BackoffScheduler`](crate::scheduler::BackoffScheduler).
//!
//! ## Example
//! ```ignore
//! use grpc_client::{BackoffScheduler, RetryConfig, RetryLayer};
//! use tower::ServiceBuilder;
//!
//! let scheduler = BackoffScheduler::new();
//! let service = ServiceBuilder::new()
//!     .layer(RetryLayer::new(RetryConfig::default(), scheduler.acquire()))
//!     .service(transport);
//! ```

use crate::call::{CallOutcome, UnaryCall, into_outcome, status_code_name};
use crate::scheduler::{BackoffOutcome, SchedulerLease};
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tonic::Code;
use tower::{Layer, Service, ServiceExt};

/// Retry policy for one client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Deadline of each physical attempt, measured from its start.
    pub deadline: Duration,
    pub base_backoff: Duration,
    pub max_retries: u32,
    pub retryable_codes: Vec<Code>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
            base_backoff: Duration::from_millis(150),
            max_retries: 12,
            retryable_codes: vec![
                Code::Unavailable,
                Code::ResourceExhausted,
                Code::DeadlineExceeded,
            ],
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_base_backoff(mut self, base: Duration) -> Self {
        self.base_backoff = base;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retryable_codes(mut self, codes: impl IntoIterator<Item = Code>) -> Self {
        self.retryable_codes = codes.into_iter().collect();
        self
    }

    pub fn is_retryable(&self, code: Code) -> bool {
        self.retryable_codes.contains(&code)
    }

    /// Delay before the attempt that follows retry number `retries`.
    pub fn backoff_for(&self, retries: u32) -> Duration {
        self
            .base_backoff
            .saturating_mul(2u32.saturating_pow(retries))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Open,
    Closed,
    Cancelled,
}

/// One physical attempt of a logical call.
#[derive(Debug, Clone)]
pub struct CallAttempt {
    /// Zero-based position within the logical call.
    pub number: u32,
    pub deadline: Instant,
    pub state: AttemptState,
    /// Headers, message, status and trailers, once closed.
    pub outcome: Option<CallOutcome>,
}

impl CallAttempt {
    fn open(number: u32, deadline: Instant) -> Self {
        Self {
            number,
            deadline,
            state: AttemptState::Open,
            outcome: None,
        }
    }
}

/// What to do after an attempt closes.
#[derive(Debug)]
pub enum Decision {
    Deliver(CallOutcome),
    Retry { backoff: Duration },
}

/// Per-logical-call bookkeeping.
#[derive(Debug)]
pub struct RetryState {
    config: Arc<RetryConfig>,
    buffered: UnaryCall,
    retries: u32,
    attempts: Vec<CallAttempt>,
    latest_retryable: Option<usize>,
}

impl RetryState {
    pub fn new(config: Arc<RetryConfig>, call: UnaryCall) -> Self {
        Self {
            config,
            buffered: call,
            retries: 0,
            attempts: Vec::new(),
            latest_retryable: None,
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn attempts(&self) -> &[CallAttempt] {
        &self.attempts
    }

    pub fn newest(&self) -> Option<&CallAttempt> {
        self.attempts.last()
    }

    /// Open a new attempt and return the replayed call for it.
    pub fn start_attempt(&mut self) -> UnaryCall {
        let deadline = Instant::now() + self.config.deadline;
        let number = self.attempts.len() as u32;
        self.attempts.push(CallAttempt::open(number, deadline));
        self.buffered.clone().with_deadline(deadline)
    }

    /// Close the newest attempt with `outcome` and decide what happens next.
    pub fn on_close(&mut self, outcome: CallOutcome) -> Decision {
        let index = match self.attempts.last_mut() {
            Some(attempt) => {
                attempt.state = AttemptState::Closed;
                attempt.outcome = Some(outcome.clone());
                attempt.number as usize
            }
            None => return Decision::Deliver(outcome),
        };

        if outcome.is_ok() || self.retries >= self.config.max_retries {
            return Decision::Deliver(outcome);
        }

        if !self.config.is_retryable(outcome.code()) {
            // An earlier retryable failure wins over a later terminal one
            let fallback = self
                .latest_retryable
                .and_then(|i| self.attempts.get(i))
                .and_then(|attempt| attempt.outcome.clone());
            return Decision::Deliver(fallback.unwrap_or(outcome));
        }

        self.latest_retryable = Some(index);
        self.retries += 1;
        Decision::Retry {
            backoff: self.config.backoff_for(self.retries),
        }
    }

    /// Mark every open attempt cancelled.
    pub fn cancel_all(&mut self) {
        for attempt in self
            .attempts
            .iter_mut()
            .filter(|a| a.state == AttemptState::Open)
        {
            attempt.state = AttemptState::Cancelled;
        }
    }

    fn newest_outcome(&self) -> Option<CallOutcome> {
        self.newest().and_then(|attempt| attempt.outcome.clone())
    }
}

/// [`Layer`] that applies [`RetryService`].
#[derive(Debug, Clone)]
pub struct RetryLayer {
    config: Arc<RetryConfig>,
    lease: Arc<SchedulerLease>,
}

impl RetryLayer {
    pub fn new(config: RetryConfig, lease: SchedulerLease) -> Self {
        Self {
            config: Arc::new(config),
            lease: Arc::new(lease),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService {
            inner,
            config: self.config.clone(),
            lease: self.lease.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryService<S> {
    inner: S,
    config: Arc<RetryConfig>,
    lease: Arc<SchedulerLease>,
}

impl<S> Service<UnaryCall> for RetryService<S>
where
    S: Service<UnaryCall, Response = CallOutcome, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = CallOutcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<CallOutcome, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: UnaryCall) -> Self::Future {
        let inner = self.inner.clone();
        let state = RetryState::new(self.config.clone(), call);
        let lease = self.lease.clone();
        Box::pin(async move { Ok(run(inner, state, lease).await) })
    }
}

async fn run<S>(inner: S, mut state: RetryState, lease: Arc<SchedulerLease>) -> CallOutcome
where
    S: Service<UnaryCall, Response = CallOutcome, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send,
{
    let token = state.buffered.cancellation().clone();
    let method = state.buffered.method.full_name();

    loop {
        if token.is_cancelled() {
            state.cancel_all();
            return CallOutcome::cancelled();
        }

        let attempt = state.start_attempt();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                state.cancel_all();
                tracing::debug!(
                    target: "grpc_client",
                    method = %method,
                    "Call cancelled during attempt"
                );
                return CallOutcome::cancelled();
            }
            outcome = inner.clone().oneshot(attempt) => into_outcome(outcome),
        };

        if token.is_cancelled() {
            state.cancel_all();
            tracing::debug!(
                target: "grpc_client",
                method = %method,
                "Call cancelled during attempt"
            );
            return CallOutcome::cancelled();
        }

        let code = outcome.code();
        match state.on_close(outcome) {
            Decision::Deliver(outcome) => {
                tracing::debug!(
                    target: "grpc_client",
                    method = %method,
                    attempts = state.attempts().len(),
                    last_code = status_code_name(code),
                    delivered = status_code_name(outcome.code()),
                    "Call completed"
                );
                return outcome;
            }
            Decision::Retry { backoff } => {
                tracing::debug!(
                    target: "grpc_client",
                    method = %method,
                    code = status_code_name(code),
                    retry = state.retries(),
                    backoff_ms = backoff.as_millis() as u64,
                    "Retryable failure, scheduling next attempt"
                );

                match lease.schedule(backoff, &token).await {
                    BackoffOutcome::Elapsed => {}
                    BackoffOutcome::Cancelled if token.is_cancelled() => {
                        state.cancel_all();
                        return CallOutcome::cancelled();
                    }
                    BackoffOutcome::Cancelled => {
                        tracing::warn!(
                            target: "grpc_client",
                            method = %method,
                            "Backoff scheduler closed, delivering last failure"
                        );
                        return state
                            .newest_outcome()
                            .unwrap_or_else(CallOutcome::cancelled);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{CallOptions, MethodDescriptor};
    use crate::scheduler::BackoffScheduler;
    use bytes::Bytes;
    use futures::future::{Ready, ready};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;
    use tonic::Status;
    use tonic::codec::CompressionEncoding;
    use tonic::metadata::MetadataMap;
    use tower::util::ServiceFn;

    const FIND_JOB: MethodDescriptor =
        MethodDescriptor::new("com.netflix.titus.JobManagementService", "FindJob");

    type Seen = Arc<Mutex<Vec<UnaryCall>>>;

    type Answer = Ready<Result<CallOutcome, Infallible>>;

    /// Fake transport answering attempt `n` with `codes[n]`, then OK.
    fn scripted(
        codes: Vec<Code>,
    ) -> (
        ServiceFn<impl FnMut(UnaryCall) -> Answer + Clone + Send + 'static>,
        Seen,
    ) {
        let seen: Seen = Arc::default();
        let log = seen.clone();
        let service = tower::service_fn(move |call: UnaryCall| {
            let mut calls = log.lock().unwrap();
            let outcome = match codes.get(calls.len()) {
                Some(code) => {
                    let mut trailers = MetadataMap::new();
                    trailers.insert("x-attempt", calls.len().to_string().parse().unwrap());
                    CallOutcome::from_status(Status::with_metadata(*code, "scripted", trailers))
                }
                None => CallOutcome::ok(MetadataMap::new(), Bytes::from_static(b"job")),
            };
            calls.push(call);
            ready(Ok::<_, Infallible>(outcome))
        });
        (service, seen)
    }

    fn call() -> UnaryCall {
        let mut metadata = MetadataMap::new();
        metadata.insert("x-request", "abc".parse().unwrap());
        UnaryCall::new(FIND_JOB, Bytes::from_static(b"job-1")).with_metadata(metadata)
    }

    fn attempt_index(outcome: &CallOutcome) -> &str {
        outcome.trailers.get("x-attempt").unwrap().to_str().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_failures_then_success() {
        let scheduler = BackoffScheduler::new();
        let (transport, seen) = scripted(vec![Code::Unavailable, Code::ResourceExhausted]);
        let service = RetryLayer::new(RetryConfig::default(), scheduler.acquire()).layer(transport);

        let start = Instant::now();
        let outcome = service.oneshot(call()).await.unwrap();

        assert!(outcome.is_ok());
        assert_eq!(seen.lock().unwrap().len(), 3);
        // 300ms after the first failure, 600ms after the second
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_first_attempt_is_delivered() {
        let scheduler = BackoffScheduler::new();
        let (transport, seen) = scripted(vec![Code::NotFound]);
        let service = RetryLayer::new(RetryConfig::default(), scheduler.acquire()).layer(transport);

        let outcome = service.oneshot(call()).await.unwrap();

        assert_eq!(outcome.code(), Code::NotFound);
        assert_eq!(attempt_index(&outcome), "0");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_delivers_final_attempt() {
        let scheduler = BackoffScheduler::new();
        let config = RetryConfig::default().with_max_retries(3);
        let (transport, seen) = scripted(vec![Code::Unavailable; 10]);
        let service = RetryLayer::new(config, scheduler.acquire()).layer(transport);

        let outcome = service.oneshot(call()).await.unwrap();

        assert_eq!(outcome.code(), Code::Unavailable);
        assert_eq!(attempt_index(&outcome), "3");
        assert_eq!(seen.lock().unwrap().len(), 4);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_after_retryable_delivers_earlier_failure() {
        let scheduler = BackoffScheduler::new();
        let (transport, seen) = scripted(vec![Code::Unavailable, Code::PermissionDenied]);
        let service = RetryLayer::new(RetryConfig::default(), scheduler.acquire()).layer(transport);

        let outcome = service.oneshot(call()).await.unwrap();

        assert_eq!(outcome.code(), Code::Unavailable);
        assert_eq!(attempt_index(&outcome), "0");
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_further_attempts() {
        let scheduler = BackoffScheduler::new();
        let (transport, seen) = scripted(vec![Code::Unavailable; 5]);
        let service = RetryLayer::new(RetryConfig::default(), scheduler.acquire()).layer(transport);

        let token = CancellationToken::new();
        let request = call().with_options(CallOptions::new().with_cancellation(token.clone()));
        let handle = tokio::spawn(service.oneshot(request));

        // First backoff is 300ms
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.code(), Code::Cancelled);
        assert_eq!(seen.lock().unwrap().len(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_attempt_returns_without_waiting() {
        let scheduler = BackoffScheduler::new();
        let hanging = tower::service_fn(|_call: UnaryCall| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, Infallible>(CallOutcome::ok(MetadataMap::new(), Bytes::new()))
        });
        let service = RetryLayer::new(RetryConfig::default(), scheduler.acquire()).layer(hanging);

        let token = CancellationToken::new();
        let request = call().with_options(CallOptions::new().with_cancellation(token.clone()));
        let handle = tokio::spawn(service.oneshot(request));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let cancelled_at = Instant::now();
        token.cancel();

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.code(), Code::Cancelled);
        assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_sends_nothing() {
        let scheduler = BackoffScheduler::new();
        let (transport, seen) = scripted(vec![]);
        let service = RetryLayer::new(RetryConfig::default(), scheduler.acquire()).layer(transport);

        let token = CancellationToken::new();
        token.cancel();
        let request = call().with_options(CallOptions::new().with_cancellation(token));

        let outcome = service.oneshot(request).await.unwrap();
        assert_eq!(outcome.code(), Code::Cancelled);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_replay_buffered_call_with_fresh_deadlines() {
        let scheduler = BackoffScheduler::new();
        let config = RetryConfig::default().with_deadline(Duration::from_secs(2));
        let (transport, seen) = scripted(vec![Code::DeadlineExceeded]);
        let service = RetryLayer::new(config, scheduler.acquire()).layer(transport);

        let request = call()
            .with_options(CallOptions::new().with_compression(CompressionEncoding::Zstd));
        let start = Instant::now();
        service.oneshot(request).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for attempt in seen.iter() {
            assert_eq!(attempt.message, Bytes::from_static(b"job-1"));
            assert_eq!(attempt.metadata.get("x-request").unwrap(), "abc");
            assert_eq!(attempt.options.compression, Some(CompressionEncoding::Zstd));
        }
        assert_eq!(seen[0].deadline, Some(start + Duration::from_secs(2)));
        let second = seen[1].deadline.unwrap();
        assert!(second >= start + Duration::from_millis(300) + Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_scheduler_delivers_last_failure() {
        let scheduler = BackoffScheduler::new();
        let (transport, seen) = scripted(vec![Code::Unavailable; 5]);
        let service = RetryLayer::new(RetryConfig::default(), scheduler.acquire()).layer(transport);

        let handle = tokio::spawn(service.oneshot(call()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.shutdown().await;

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.code(), Code::Unavailable);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_backoff_doubles_without_ceiling() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff_for(1), Duration::from_millis(300));
        assert_eq!(config.backoff_for(2), Duration::from_millis(600));
        assert_eq!(config.backoff_for(12), Duration::from_millis(150 * 4096));
    }

    #[test]
    fn test_state_tracks_attempts() {
        let config = Arc::new(RetryConfig::default().with_max_retries(1));
        let mut state = RetryState::new(config, call());

        state.start_attempt();
        let decision = state.on_close(CallOutcome::from_status(Status::unavailable("down")));
        assert!(matches!(
            decision,
            Decision::Retry { backoff } if backoff == Duration::from_millis(300)
        ));
        assert_eq!(state.retries(), 1);

        state.start_attempt();
        assert_eq!(state.newest().unwrap().state, AttemptState::Open);
        state.cancel_all();

        let states: Vec<_> = state.attempts().iter().map(|a| a.state).collect();
        assert_eq!(states, vec![AttemptState::Closed, AttemptState::Cancelled]);
        assert_eq!(state.attempts()[1].number, 1);
    }

    #[test]
    fn test_retry_cap_overrides_retryable_status() {
        let config = Arc::new(RetryConfig::default().with_max_retries(0));
        let mut state = RetryState::new(config, call());

        state.start_attempt();
        let decision = state.on_close(CallOutcome::from_status(Status::unavailable("down")));
        assert!(matches!(decision, Decision::Deliver(o) if o.code() == Code::Unavailable));
        assert_eq!(state.retries(), 0);
    }
}
