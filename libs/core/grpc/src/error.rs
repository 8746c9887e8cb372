use std::path::PathBuf;
use thiserror::Error;

pub type GrpcResult<T> = Result<T, GrpcError>;

/// Errors raised while building a channel, its credentials or its interceptors.
///
/// None of these are retried: a client that cannot be constructed is a
/// configuration problem, not a transient one.
#[derive(Error, Debug)]
pub enum GrpcError {
    /// Invalid URI provided for connection
    #[error("Invalid URI: {0}")]
    InvalidUri(#[source] tonic::transport::Error),

    /// TLS settings were rejected by the endpoint
    #[error("TLS configuration rejected: {0}")]
    Tls(#[source] tonic::transport::Error),

    /// Key or trust material could not be loaded
    #[error("Failed to load credential material from {path}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Caller identity cannot be carried in an ASCII metadata value
    #[error("Invalid caller id '{0}': must be visible ASCII")]
    InvalidCallerId(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<GrpcError> for tonic::Status {
    fn from(err: GrpcError) -> Self {
        match err {
            GrpcError::InvalidUri(_)
            | GrpcError::InvalidConfig(_)
            | GrpcError::InvalidCallerId(_) => {
                tonic::Status::invalid_argument(err.to_string())
            }
            GrpcError::Tls(_) | GrpcError::Credentials { .. } => {
                tonic::Status::unauthenticated(err.to_string())
            }
        }
    }
}
