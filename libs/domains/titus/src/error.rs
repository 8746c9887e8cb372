use core_config::ConfigError;
use grpc_client::GrpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TitusError {
    /// The scheduler answered with a non-OK status (after retries)
    #[error(
        "{method} failed: {} ({})",
        .status.message(),
        grpc_client::status_code_name(.status.code())
    )]
    Rpc {
        method: &'static str,
        status: tonic::Status,
    },

    #[error("Failed to decode {method} response: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: prost::DecodeError,
    },

    #[error("Invalid job description: {0}")]
    InvalidDescription(String),

    #[error(transparent)]
    Grpc(#[from] GrpcError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type TitusResult<T> = Result<T, TitusError>;

impl TitusError {
    /// gRPC status code, when the failure came from the scheduler
    pub fn code(&self) -> Option<tonic::Code> {
        match self {
            TitusError::Rpc { status, .. } => Some(status.code()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(tonic::Code::NotFound)
    }
}
