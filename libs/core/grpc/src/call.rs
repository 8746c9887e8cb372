//! Request/response types for a unary call travelling through the client
//! pipeline.
//!
//! Every layer of the pipeline (retry, metrics, transport) is a
//! `tower::Service<UnaryCall, Response = CallOutcome, Error = Infallible>`.
//! Failures are never surfaced as `Err`: the caller always gets a
//! [`CallOutcome`] carrying a standard gRPC [`Status`] and its trailers.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::codec::CompressionEncoding;
use tonic::metadata::MetadataMap;
use tonic::{Code, Status};

/// Fully-qualified unary method (`/<service>/<method>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    service: &'static str,
    method: &'static str,
}

impl MethodDescriptor {
    pub const fn new(service: &'static str, method: &'static str) -> Self {
        Self { service, method }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    /// `<service>/<method>`, the name gRPC uses in logs and stats.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.service, self.method)
    }

    /// HTTP/2 `:path` for the call.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

/// Substring after the last `/` of a fully-qualified method name.
pub fn short_method_name(full_name: &str) -> &str {
    full_name.rsplit('/').next().unwrap_or(full_name)
}

/// Caller-supplied bag of tags shared with the metrics layer.
///
/// Cloning is cheap and every clone sees the same tags, so a collector can
/// keep one handle while the call carries another.
#[derive(Debug, Clone, Default)]
pub struct MetricsContext {
    tags: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MetricsContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut tags = self.tags.lock().unwrap_or_else(|e| e.into_inner());
        tags.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let tags = self.tags.lock().unwrap_or_else(|e| e.into_inner());
        tags.get(key).cloned()
    }

    pub fn tags(&self) -> BTreeMap<String, String> {
        self.tags.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Per-call options that follow the call into every physical attempt.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Compress the outbound message of whichever attempt is live.
    pub compression: Option<CompressionEncoding>,
    /// Optional tag sink for cross-cutting aggregation.
    pub metrics_context: Option<MetricsContext>,
    /// Cancels the logical call, its live attempt and any pending backoff.
    pub cancellation: CancellationToken,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(mut self, encoding: CompressionEncoding) -> Self {
        self.compression = Some(encoding);
        self
    }

    pub fn with_metrics_context(mut self, context: MetricsContext) -> Self {
        self.metrics_context = Some(context);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// One unary request: method, outbound headers, the single encoded message.
///
/// `deadline` is absolute and is set per physical attempt by the retry layer.
#[derive(Debug, Clone)]
pub struct UnaryCall {
    pub method: MethodDescriptor,
    pub metadata: MetadataMap,
    pub message: Bytes,
    pub options: CallOptions,
    pub deadline: Option<Instant>,
}

impl UnaryCall {
    pub fn new(method: MethodDescriptor, message: impl Into<Bytes>) -> Self {
        Self {
            method,
            metadata: MetadataMap::new(),
            message: message.into(),
            options: CallOptions::default(),
            deadline: None,
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.options.cancellation
    }
}

/// Terminal result of a call: inbound headers, at most one message, the
/// final status and its trailers.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub headers: MetadataMap,
    pub message: Option<Bytes>,
    pub status: Status,
    pub trailers: MetadataMap,
}

impl CallOutcome {
    pub fn ok(headers: MetadataMap, message: Bytes) -> Self {
        Self {
            headers,
            message: Some(message),
            status: Status::new(Code::Ok, ""),
            trailers: MetadataMap::new(),
        }
    }

    /// Failed call. Trailers are the metadata the server attached to the status.
    pub fn from_status(status: Status) -> Self {
        Self {
            headers: MetadataMap::new(),
            message: None,
            trailers: status.metadata().clone(),
            status,
        }
    }

    pub fn cancelled() -> Self {
        Self::from_status(Status::cancelled("call cancelled by caller"))
    }

    pub fn code(&self) -> Code {
        self.status.code()
    }

    pub fn is_ok(&self) -> bool {
        self.status.code() == Code::Ok
    }

    /// The response message of a successful call, or its status.
    pub fn into_result(self) -> Result<Bytes, Status> {
        match (self.status.code(), self.message) {
            (Code::Ok, Some(message)) => Ok(message),
            (Code::Ok, None) => Err(Status::internal("call completed without a response message")),
            _ => Err(self.status),
        }
    }
}

/// Canonical upper-case gRPC name of a status code (`UNAVAILABLE`, ...).
pub fn status_code_name(code: Code) -> &'static str {
    #[allow(unreachable_patterns)]
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "CANCELLED",
        Code::Unknown => "UNKNOWN",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Code::NotFound => "NOT_FOUND",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Aborted => "ABORTED",
        Code::OutOfRange => "OUT_OF_RANGE",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::Internal => "INTERNAL",
        Code::Unavailable => "UNAVAILABLE",
        Code::DataLoss => "DATA_LOSS",
        Code::Unauthenticated => "UNAUTHENTICATED",
        _ => "UNKNOWN",
    }
}

pub(crate) fn into_outcome(result: Result<CallOutcome, Infallible>) -> CallOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(never) => match never {},
    }
}
