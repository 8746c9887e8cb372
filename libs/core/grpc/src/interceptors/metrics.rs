//! Per-attempt call metrics.
//!
//! The layer sits below the retry layer, so every physical attempt produces
//! exactly one [`CallRecord`], including attempts that are cancelled or
//! dropped mid-flight.

use crate::call::{
    CallOutcome, MetricsContext, UnaryCall, into_outcome, short_method_name, status_code_name,
};
use futures::future::BoxFuture;
use metrics::{Label, counter, histogram};
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tonic::Code;
use tower::{Layer, Service, ServiceExt};

pub const REQUESTS_TOTAL: &str = "grpc_client_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "grpc_client_request_duration_seconds";

/// Fixed tags describing where calls go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTags {
    pub account: String,
    pub region: String,
    pub api_version: String,
}

impl DestinationTags {
    pub fn new(
        account: impl Into<String>,
        region: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            api_version: api_version.into(),
        }
    }
}

/// Timing and outcome of one physical attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub account: String,
    pub region: String,
    /// Short method name, e.g. `FindJobs`.
    pub method: String,
    pub api_version: String,
    pub success: bool,
    pub status_code: i32,
    /// Status message when the server sent one, else the code name.
    pub status_message: String,
    pub elapsed: Duration,
}

/// Sink for [`CallRecord`]s.
pub trait CallRecorder: Send + Sync {
    fn record(&self, record: &CallRecord);
}

/// Default recorder: emits through the `metrics` facade.
///
/// Records:
/// - `grpc_client_requests_total` - Counter with destination, method and status labels
/// - `grpc_client_request_duration_seconds` - Histogram with the same labels
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsFacadeRecorder;

impl CallRecorder for MetricsFacadeRecorder {
    fn record(&self, record: &CallRecord) {
        let labels = vec![
            Label::new("account", record.account.clone()),
            Label::new("region", record.region.clone()),
            Label::new("method", record.method.clone()),
            Label::new("api_version", record.api_version.clone()),
            Label::new("success", record.success.to_string()),
            Label::new("status_code", record.status_code.to_string()),
            Label::new("status", record.status_message.clone()),
        ];

        counter!(REQUESTS_TOTAL, labels.clone()).increment(1);
        histogram!(REQUEST_DURATION_SECONDS, labels).record(record.elapsed.as_secs_f64());
    }
}

/// [`Layer`] that applies [`MetricsService`].
///
/// # Example
/// ```ignore
/// use grpc_client::interceptors::metrics::{DestinationTags, MetricsLayer};
///
/// let tags = DestinationTags::new("titusprod", "us-east-1", "v3");
/// let service = ServiceBuilder::new()
///     .layer(MetricsLayer::new(tags))
///     .service(transport);
/// ```
#[derive(Clone)]
pub struct MetricsLayer {
    tags: Arc<DestinationTags>,
    recorder: Arc<dyn CallRecorder>,
}

impl MetricsLayer {
    pub fn new(tags: DestinationTags) -> Self {
        Self::with_recorder(tags, Arc::new(MetricsFacadeRecorder))
    }

    pub fn with_recorder(tags: DestinationTags, recorder: Arc<dyn CallRecorder>) -> Self {
        Self {
            tags: Arc::new(tags),
            recorder,
        }
    }

    pub fn tags(&self) -> &DestinationTags {
        &self.tags
    }
}

impl std::fmt::Debug for MetricsLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsLayer")
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            tags: self.tags.clone(),
            recorder: self.recorder.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    tags: Arc<DestinationTags>,
    recorder: Arc<dyn CallRecorder>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for MetricsService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsService")
            .field("inner", &self.inner)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl<S> Service<UnaryCall> for MetricsService<S>
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
        if let Some(context) = &call.options.metrics_context {
            tag_context(context, &self.tags);
        }

        let timer = AttemptTimer {
            tags: self.tags.clone(),
            recorder: self.recorder.clone(),
            method: short_method_name(&call.method.full_name()).to_string(),
            start: Instant::now(),
            finished: false,
        };
        let inner = self.inner.clone();

        Box::pin(async move {
            let mut timer = timer;
            let outcome = into_outcome(inner.oneshot(call).await);
            timer.finish(outcome.code(), outcome.status.message());
            Ok(outcome)
        })
    }
}

fn tag_context(context: &MetricsContext, tags: &DestinationTags) {
    context.tag("account", tags.account.clone());
    context.tag("region", tags.region.clone());
}

/// Stopwatch for one attempt. Dropping it unfinished records a cancellation.
struct AttemptTimer {
    tags: Arc<DestinationTags>,
    recorder: Arc<dyn CallRecorder>,
    method: String,
    start: Instant,
    finished: bool,
}

impl AttemptTimer {
    fn finish(&mut self, code: Code, message: &str) {
        self.finished = true;

        let status_message = if message.is_empty() {
            status_code_name(code).to_string()
        } else {
            message.to_string()
        };
        let record = CallRecord {
            account: self.tags.account.clone(),
            region: self.tags.region.clone(),
            method: self.method.clone(),
            api_version: self.tags.api_version.clone(),
            success: code == Code::Ok,
            status_code: i32::from(code),
            status_message,
            elapsed: self.start.elapsed(),
        };

        tracing::trace!(
            target: "grpc_client",
            method = %record.method,
            status_code = record.status_code,
            elapsed_ms = record.elapsed.as_millis() as u64,
            "Recorded call attempt"
        );

        self.recorder.record(&record);
    }
}

impl Drop for AttemptTimer {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(Code::Cancelled, "");
        }
    }
}
