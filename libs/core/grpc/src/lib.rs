//! # gRPC Client Library
//!
//! Unary call pipeline for control-plane clients: lazy HTTP/2 channels with
//! mutual TLS, a caller-id header on every request, per-attempt metrics and
//! bounded exponential-backoff retries.
//!
//! ## Features
//!
//! - **Channel Creation**: HTTP/2 keep-alive and window tuning, optional mTLS
//! - **Identity**: application-scoped client certificates and the
//!   `x-titus-callerid` header
//! - **Retry**: buffered request replay with a fresh deadline per attempt
//! - **Metrics**: one timer per physical attempt through the `metrics` facade
//! - **Backoff Scheduler**: shared, lease-counted pool for retry timers
//!
//! ## Quick Start
//!
//! ```ignore
//! use grpc_client::*;
//! use grpc_client::interceptors::metrics::{DestinationTags, MetricsLayer};
//!
//! let scheduler = BackoffScheduler::new();
//! let channel = create_channel_lazy("http://titus-api.us-east-1:7104")?;
//! let pipeline = unary_pipeline(
//!     channel,
//!     "spinnaker",
//!     RetryConfig::default(),
//!     MetricsLayer::new(DestinationTags::new("titusprod", "us-east-1", "v3")),
//!     scheduler.acquire(),
//! )?;
//!
//! let method = MethodDescriptor::new("com.netflix.titus.JobManagementService", "FindJob");
//! let outcome = pipeline.oneshot(UnaryCall::new(method, payload)).await?;
//! ```

pub mod call;
pub mod channel;
pub mod error;
pub mod identity;
pub mod interceptors;
pub mod pipeline;
pub mod retry;
pub mod scheduler;
pub mod transport;

// Re-export main types and functions for convenience
pub use call::{
    CallOptions, CallOutcome, MethodDescriptor, MetricsContext, UnaryCall, short_method_name,
    status_code_name,
};
pub use channel::{ChannelConfig, create_channel_lazy, create_channel_lazy_with_config};
pub use error::{GrpcError, GrpcResult};
pub use identity::{
    CALLER_ID_HEADER, CallerIdInterceptor, KeyManagerFactory, MtlsCredentials, PemDirectory,
    TrustManagerFactory, with_caller_id,
};
pub use pipeline::{CallerTransport, UnaryPipeline, layered, unary_pipeline};
pub use retry::{RetryConfig, RetryLayer, RetryService};
pub use scheduler::{BackoffOutcome, BackoffScheduler, SchedulerLease};
pub use transport::{BytesCodec, GrpcTransport};
