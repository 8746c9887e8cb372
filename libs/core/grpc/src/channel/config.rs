use crate::error::{GrpcError, GrpcResult};
use std::time::Duration;
use tonic::transport::{ClientTlsConfig, Endpoint};

/// Configuration for gRPC channel creation
///
/// HTTP/2 and TCP tuning for long-lived control-plane channels, plus the
/// optional mutual-TLS settings produced by
/// [`MtlsCredentials`](crate::identity::MtlsCredentials).
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    // HTTP/2 Keep-Alive
    pub http2_keep_alive_interval: Option<Duration>,
    pub keep_alive_timeout: Duration,
    pub keep_alive_while_idle: bool,

    // Connection settings
    pub connect_timeout: Duration,
    pub timeout: Option<Duration>,

    // Window sizes (HTTP/2 flow control)
    pub initial_connection_window_size: Option<u32>,
    pub initial_stream_window_size: Option<u32>,
    pub http2_adaptive_window: bool,

    // TCP settings
    pub tcp_nodelay: bool,
    pub tcp_keepalive: Option<Duration>,

    pub user_agent: Option<String>,

    /// Client certificate and trust roots; `None` means plaintext.
    pub tls: Option<ClientTlsConfig>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            http2_keep_alive_interval: Some(Duration::from_secs(30)),
            keep_alive_timeout: Duration::from_secs(10),
            keep_alive_while_idle: true,
            connect_timeout: Duration::from_secs(5),
            // Per-attempt deadlines come from the retry layer
            timeout: None,
            initial_connection_window_size: Some(1024 * 1024), // 1MB
            initial_stream_window_size: Some(1024 * 1024),     // 1MB
            http2_adaptive_window: true,
            tcp_nodelay: true,
            tcp_keepalive: Some(Duration::from_secs(30)),
            user_agent: None,
            tls: None,
        }
    }
}

impl ChannelConfig {
    /// Create a new configuration with production defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set a channel-wide request timeout on top of per-attempt deadlines
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the HTTP/2 keep-alive interval
    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.http2_keep_alive_interval = Some(interval);
        self
    }

    /// Disable HTTP/2 keep-alive
    pub fn without_keep_alive(mut self) -> Self {
        self.http2_keep_alive_interval = None;
        self
    }

    /// Set both connection and stream window sizes to the same value
    pub fn with_window_size(mut self, size: u32) -> Self {
        self.initial_connection_window_size = Some(size);
        self.initial_stream_window_size = Some(size);
        self
    }

    /// Advertise the calling application in the `user-agent` header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Negotiate mutual TLS with the given client configuration
    ///
    /// # Example
    /// ```ignore
    /// let tls = MtlsCredentials::new("spinnaker", pem.clone(), pem).client_tls_config()?;
    /// let config = ChannelConfig::new().with_tls(tls);
    /// ```
    pub fn with_tls(mut self, tls: ClientTlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Apply this configuration to a tonic Endpoint
    pub(crate) fn apply_to_endpoint(self, mut endpoint: Endpoint) -> GrpcResult<Endpoint> {
        // HTTP/2 keep-alive
        if let Some(interval) = self.http2_keep_alive_interval {
            endpoint = endpoint.http2_keep_alive_interval(interval);
        }
        endpoint = endpoint
            .keep_alive_timeout(self.keep_alive_timeout)
            .keep_alive_while_idle(self.keep_alive_while_idle)
            .connect_timeout(self.connect_timeout);

        if let Some(timeout) = self.timeout {
            endpoint = endpoint.timeout(timeout);
        }

        // Window sizes
        if let Some(size) = self.initial_connection_window_size {
            endpoint = endpoint.initial_connection_window_size(size);
        }
        if let Some(size) = self.initial_stream_window_size {
            endpoint = endpoint.initial_stream_window_size(size);
        }
        endpoint = endpoint.http2_adaptive_window(self.http2_adaptive_window);

        // TCP settings
        endpoint = endpoint.tcp_nodelay(self.tcp_nodelay);
        if let Some(keepalive) = self.tcp_keepalive {
            endpoint = endpoint.tcp_keepalive(Some(keepalive));
        }

        if let Some(user_agent) = self.user_agent {
            endpoint = endpoint
                .user_agent(user_agent.clone())
                .map_err(|_| {
                    GrpcError::InvalidConfig(format!("invalid user agent '{user_agent}'"))
                })?;
        }

        if let Some(tls) = self.tls {
            endpoint = endpoint.tls_config(tls).map_err(GrpcError::Tls)?;
        }

        Ok(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChannelConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.timeout, None);
        assert_eq!(config.initial_connection_window_size, Some(1024 * 1024));
        assert!(config.tcp_nodelay);
        assert!(!config.is_tls());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ChannelConfig::new()
            .with_connect_timeout(Duration::from_secs(10))
            .with_request_timeout(Duration::from_secs(120))
            .with_window_size(2 * 1024 * 1024)
            .with_user_agent("spinnaker/clouddriver")
            .with_tls(ClientTlsConfig::new().domain_name("titus.example.net"));

        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.initial_stream_window_size, Some(2 * 1024 * 1024));
        assert_eq!(config.user_agent.as_deref(), Some("spinnaker/clouddriver"));
        assert!(config.is_tls());
    }

    #[test]
    fn test_disable_keep_alive() {
        let config = ChannelConfig::new().without_keep_alive();
        assert_eq!(config.http2_keep_alive_interval, None);
    }

    #[test]
    fn test_invalid_user_agent_is_rejected() {
        let endpoint = Endpoint::from_static("http://127.0.0.1:7104");
        let result = ChannelConfig::new()
            .with_user_agent("bad\nagent")
            .apply_to_endpoint(endpoint);
        assert!(matches!(result, Err(GrpcError::InvalidConfig(_))));
    }
}
