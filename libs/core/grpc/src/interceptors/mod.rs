/// Re-export tonic's Interceptor trait for convenience
pub use tonic::service::Interceptor;

pub mod metrics;

pub use metrics::{CallRecord, CallRecorder, DestinationTags, MetricsFacadeRecorder, MetricsLayer};
