use crate::error::{GrpcError, GrpcResult};
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;
use tonic::service::interceptor::InterceptedService;
use tonic::{Request, Status};

/// Metadata key identifying the calling application.
pub const CALLER_ID_HEADER: &str = "x-titus-callerid";

/// Interceptor that attaches the caller identity to every outbound request
///
/// The value is validated once at construction, so the per-request path
/// cannot fail.
///
/// # Example
/// ```ignore
/// use grpc_client::identity::CallerIdInterceptor;
///
/// let caller = CallerIdInterceptor::new("spinnaker-clouddriver")?;
/// let client = JobManagementServiceClient::with_interceptor(channel, caller);
/// ```
#[derive(Clone, Debug)]
pub struct CallerIdInterceptor {
    caller_id: MetadataValue<Ascii>,
}

impl CallerIdInterceptor {
    pub fn new(caller_id: impl Into<String>) -> GrpcResult<Self> {
        let caller_id = caller_id.into();
        if caller_id.is_empty() || !caller_id.is_ascii() {
            return Err(GrpcError::InvalidCallerId(caller_id));
        }
        let value = MetadataValue::try_from(caller_id.as_str())
            .map_err(|_| GrpcError::InvalidCallerId(caller_id.clone()))?;
        Ok(Self { caller_id: value })
    }

    pub fn caller_id(&self) -> &str {
        self.caller_id.to_str().unwrap_or_default()
    }
}

impl Interceptor for CallerIdInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        request
            .metadata_mut()
            .insert(CALLER_ID_HEADER, self.caller_id.clone());
        Ok(request)
    }
}

/// Bind a caller identity to any channel or client service.
///
/// Every RPC issued through the returned service carries
/// `x-titus-callerid: <caller_id>`.
///
/// # Example
/// ```ignore
/// let channel = create_channel_lazy_with_config(endpoint, config)?;
/// let transport = GrpcTransport::new(with_caller_id(channel, "spinnaker")?);
/// ```
pub fn with_caller_id<T>(
    inner: T,
    caller_id: impl Into<String>,
) -> GrpcResult<InterceptedService<T, CallerIdInterceptor>> {
    let interceptor = CallerIdInterceptor::new(caller_id)?;
    tracing::debug!(
        target: "grpc_client",
        caller_id = interceptor.caller_id(),
        "Binding caller identity"
    );
    Ok(InterceptedService::new(inner, interceptor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_id_header_is_added() {
        let mut interceptor = CallerIdInterceptor::new("spinnaker-clouddriver").unwrap();
        let request = interceptor.call(Request::new(())).unwrap();
        let header = request.metadata().get(CALLER_ID_HEADER).unwrap();
        assert_eq!(header, "spinnaker-clouddriver");
    }

    #[test]
    fn test_caller_id_replaces_existing_value() {
        let mut interceptor = CallerIdInterceptor::new("spinnaker").unwrap();
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(CALLER_ID_HEADER, "spoofed".parse().unwrap());

        let request = interceptor.call(request).unwrap();
        let values: Vec<_> = request.metadata().get_all(CALLER_ID_HEADER).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "spinnaker");
    }

    #[test]
    fn test_rejects_non_ascii_and_empty_identity() {
        assert!(matches!(
            CallerIdInterceptor::new("d\u{e9}ploiement"),
            Err(GrpcError::InvalidCallerId(_))
        ));
        assert!(matches!(
            CallerIdInterceptor::new(""),
            Err(GrpcError::InvalidCallerId(_))
        ));
        assert!(matches!(
            CallerIdInterceptor::new("line\nbreak"),
            Err(GrpcError::InvalidCallerId(_))
        ));
    }

    #[tokio::test]
    async fn test_with_caller_id_wraps_channel() {
        let channel = crate::channel::create_channel_lazy("http://127.0.0.1:1").unwrap();
        assert!(with_caller_id(channel.clone(), "spinnaker").is_ok());
        assert!(with_caller_id(channel, "").is_err());
    }
}
