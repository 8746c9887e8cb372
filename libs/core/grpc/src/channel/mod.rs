pub mod config;

pub use config::ChannelConfig;

use crate::error::{GrpcError, GrpcResult};
use tonic::transport::{Channel, Endpoint};

/// Creates a lazy gRPC channel with default settings
///
/// The connection (and TLS handshake) happens on the first RPC, so
/// construction only fails on configuration errors. Transient connection
/// failures surface later as `UNAVAILABLE` and go through the retry layer.
///
/// ## Example
/// ```ignore
/// use grpc_client::create_channel_lazy;
///
/// let channel = create_channel_lazy("http://titus-api.us-east-1:7104")?;
/// ```
pub fn create_channel_lazy(addr: impl Into<String>) -> GrpcResult<Channel> {
    create_channel_lazy_with_config(addr, ChannelConfig::default())
}

/// Creates a lazy gRPC channel with custom configuration
///
/// ## Example
/// ```ignore
/// use grpc_client::{create_channel_lazy_with_config, ChannelConfig};
///
/// let config = ChannelConfig::default().with_tls(tls);
/// let channel = create_channel_lazy_with_config("https://titus-api.us-east-1:7104", config)?;
/// ```
pub fn create_channel_lazy_with_config(
    addr: impl Into<String>,
    config: ChannelConfig,
) -> GrpcResult<Channel> {
    let addr_string = addr.into();

    let endpoint = Endpoint::from_shared(addr_string.clone()).map_err(|e| {
        tracing::error!(target: "grpc_client", addr = %addr_string, error = ?e, "Invalid URI");
        GrpcError::InvalidUri(e)
    })?;

    let tls = config.is_tls();
    let endpoint = config.apply_to_endpoint(endpoint).map_err(|e| {
        tracing::error!(
            target: "grpc_client",
            addr = %addr_string,
            error = %e,
            "Invalid channel configuration"
        );
        e
    })?;

    tracing::debug!(
        target: "grpc_client",
        addr = %addr_string,
        tls,
        "Creating lazy gRPC channel (connects on first request)"
    );

    Ok(endpoint.connect_lazy())
}
