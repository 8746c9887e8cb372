//! Terminal layer of the pipeline: one physical unary attempt over tonic.
//!
//! Messages arrive already encoded, so the transport ships bytes through a
//! pass-through codec. Decoding into typed responses is left to the caller,
//! which keeps every layer above this one independent of the message types.

use crate::call::{CallOutcome, UnaryCall};
use bytes::{Buf, BufMut, Bytes};
use futures::future::BoxFuture;
use std::convert::Infallible;
use std::task::{Context, Poll};
use tonic::client::{Grpc, GrpcService};
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::codegen::{Body, StdError};
use tonic::{Extensions, Request, Status};

/// Codec that forwards already-encoded protobuf payloads untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec for BytesCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = BytesCodec;
    type Decoder = BytesCodec;

    fn encoder(&mut self) -> Self::Encoder {
        BytesCodec
    }

    fn decoder(&mut self) -> Self::Decoder {
        BytesCodec
    }
}

impl Encoder for BytesCodec {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put_slice(&item);
        Ok(())
    }
}

impl Decoder for BytesCodec {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let remaining = src.remaining();
        Ok(Some(src.copy_to_bytes(remaining)))
    }
}

/// Issues one physical attempt per `call` on the wrapped gRPC service.
///
/// `T` is usually a `Channel` wrapped with the caller-id interceptor, see
/// [`crate::identity::with_caller_id`].
#[derive(Debug, Clone)]
pub struct GrpcTransport<T> {
    inner: Grpc<T>,
}

impl<T> GrpcTransport<T>
where
    T: GrpcService<tonic::body::Body>,
    T::Error: Into<StdError>,
    T::ResponseBody: Body<Data = Bytes> + Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + Send,
{
    pub fn new(inner: T) -> Self {
        Self {
            inner: Grpc::new(inner),
        }
    }
}

impl<T> tower::Service<UnaryCall> for GrpcTransport<T>
where
    T: GrpcService<tonic::body::Body> + Clone + Send + 'static,
    T::Error: Into<StdError> + Send,
    T::Future: Send,
    T::ResponseBody: Body<Data = Bytes> + Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + Send,
{
    type Response = CallOutcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<CallOutcome, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: UnaryCall) -> Self::Future {
        let grpc = self.inner.clone();
        Box::pin(async move { Ok(attempt(grpc, call).await) })
    }
}

async fn attempt<T>(mut grpc: Grpc<T>, call: UnaryCall) -> CallOutcome
where
    T: GrpcService<tonic::body::Body> + Send,
    T::Error: Into<StdError> + Send,
    T::Future: Send,
    T::ResponseBody: Body<Data = Bytes> + Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + Send,
{
    let token = call.options.cancellation.clone();
    let deadline = call.deadline;

    if let Some(encoding) = call.options.compression {
        grpc = grpc.send_compressed(encoding);
    }

    let exchange = async move {
        grpc.ready().await.map_err(|e| {
            let e: StdError = e.into();
            Status::unknown(format!("Service was not ready: {e}"))
        })?;

        let path = PathAndQuery::try_from(call.method.path())
            .map_err(|e| Status::internal(format!("Invalid method path: {e}")))?;

        let mut request = Request::from_parts(call.metadata, Extensions::new(), call.message);
        if let Some(deadline) = deadline {
            request.set_timeout(deadline.saturating_duration_since(tokio::time::Instant::now()));
        }

        grpc.unary(request, path, BytesCodec).await
    };

    let bounded = async move {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, exchange)
                .await
                .unwrap_or_else(|_| Err(Status::deadline_exceeded("attempt deadline exceeded"))),
            None => exchange.await,
        }
    };

    let result = tokio::select! {
        biased;
        _ = token.cancelled() => return CallOutcome::cancelled(),
        result = bounded => result,
    };

    match result {
        Ok(response) => {
            let (headers, message, _extensions) = response.into_parts();
            CallOutcome::ok(headers, message)
        }
        Err(status) => CallOutcome::from_status(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{CallOptions, MethodDescriptor};
    use crate::channel::create_channel_lazy;
    use tokio_util::sync::CancellationToken;
    use tonic::Code;
    use tower::ServiceExt;

    const PING: MethodDescriptor = MethodDescriptor::new("test.Probe", "Ping");

    #[tokio::test]
    async fn test_cancelled_call_never_reaches_the_wire() {
        let channel = create_channel_lazy("http://127.0.0.1:1").unwrap();
        let transport = GrpcTransport::new(channel);

        let token = CancellationToken::new();
        token.cancel();
        let call = UnaryCall::new(PING, Bytes::new())
            .with_options(CallOptions::new().with_cancellation(token));

        let outcome = transport.oneshot(call).await.unwrap();
        assert_eq!(outcome.code(), Code::Cancelled);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_failed_outcome() {
        let channel = create_channel_lazy("http://127.0.0.1:1").unwrap();
        let transport = GrpcTransport::new(channel);

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        let call = UnaryCall::new(PING, Bytes::new()).with_deadline(deadline);

        let outcome = transport.oneshot(call).await.unwrap();
        assert!(!outcome.is_ok());
        assert!(outcome.message.is_none());
    }
}
