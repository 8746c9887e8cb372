//! Assembly of the unary call pipeline.
//!
//! ```text
//! RetryService          one logical call, N physical attempts
//!   MetricsService      one record per attempt
//!     GrpcTransport     one HTTP/2 exchange
//!       InterceptedService<Channel, CallerIdInterceptor>
//! ```

use crate::call::{CallOutcome, UnaryCall};
use crate::error::GrpcResult;
use crate::identity::{CallerIdInterceptor, with_caller_id};
use crate::interceptors::metrics::{MetricsLayer, MetricsService};
use crate::retry::{RetryConfig, RetryLayer, RetryService};
use crate::scheduler::SchedulerLease;
use crate::transport::GrpcTransport;
use std::convert::Infallible;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tower::{Service, ServiceBuilder};

/// Transport bound to a caller identity.
pub type CallerTransport = GrpcTransport<InterceptedService<Channel, CallerIdInterceptor>>;

/// The full stack over a tonic channel.
pub type UnaryPipeline = RetryService<MetricsService<CallerTransport>>;

/// Wrap any attempt-level service with metrics and retry.
pub fn layered<S>(
    inner: S,
    retry: RetryLayer,
    metrics: MetricsLayer,
) -> RetryService<MetricsService<S>>
where
    S: Service<UnaryCall, Response = CallOutcome, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send,
{
    ServiceBuilder::new().layer(retry).layer(metrics).service(inner)
}

/// Build the pipeline over `channel`, stamping `caller_id` on every attempt.
///
/// # Example
/// ```ignore
/// let channel = create_channel_lazy_with_config(endpoint, config)?;
/// let pipeline = unary_pipeline(
///     channel,
///     "spinnaker",
///     RetryConfig::default(),
///     MetricsLayer::new(DestinationTags::new("titusprod", "us-east-1", "v3")),
///     scheduler.acquire(),
/// )?;
/// ```
pub fn unary_pipeline(
    channel: Channel,
    caller_id: impl Into<String>,
    retry: RetryConfig,
    metrics: MetricsLayer,
    lease: SchedulerLease,
) -> GrpcResult<UnaryPipeline> {
    let transport = GrpcTransport::new(with_caller_id(channel, caller_id)?);

    tracing::debug!(
        target: "grpc_client",
        max_retries = retry.max_retries,
        deadline_ms = retry.deadline.as_millis() as u64,
        account = %metrics.tags().account,
        region = %metrics.tags().region,
        "Building unary call pipeline"
    );

    Ok(layered(transport, RetryLayer::new(retry, lease), metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::create_channel_lazy;
    use crate::interceptors::metrics::DestinationTags;
    use crate::scheduler::BackoffScheduler;

    #[tokio::test]
    async fn test_pipeline_rejects_invalid_caller_id() {
        let scheduler = BackoffScheduler::new();
        let channel = create_channel_lazy("http://127.0.0.1:1").unwrap();

        let result = unary_pipeline(
            channel,
            "caller\u{1f680}",
            RetryConfig::default(),
            MetricsLayer::new(DestinationTags::new("titustest", "us-east-1", "v3")),
            scheduler.acquire(),
        );

        assert!(result.is_err());
        assert_eq!(scheduler.active_leases(), 0);
    }

    #[tokio::test]
    async fn test_pipeline_holds_scheduler_lease() {
        let scheduler = BackoffScheduler::new();
        let channel = create_channel_lazy("http://127.0.0.1:1").unwrap();

        let pipeline = unary_pipeline(
            channel,
            "spinnaker",
            RetryConfig::default(),
            MetricsLayer::new(DestinationTags::new("titustest", "us-east-1", "v3")),
            scheduler.acquire(),
        )
        .unwrap();
        let clone = pipeline.clone();
        assert_eq!(scheduler.active_leases(), 1);

        drop(pipeline);
        drop(clone);
        assert!(scheduler.is_closed());
    }
}
