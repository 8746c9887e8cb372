//! Titus Domain
//!
//! Client facade for the Titus job scheduler: job submission with provenance
//! labels, lookups, paginated sweeps and capacity/status mutations over the
//! `grpc-client` call pipeline.
//!
//! ## Architecture
//!
//! ```text
//! TitusClient (facade) -> JobManagementApi (typed RPCs) -> UnaryPipeline
//!                                                          (retry, metrics, caller id, mTLS)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use core_config::FromEnv;
//! use domain_titus::{TitusClient, TitusClientConfig};
//! use grpc_client::BackoffScheduler;
//!
//! let config = TitusClientConfig::from_env()?;
//! let scheduler = BackoffScheduler::new();
//! let client = TitusClient::connect(&config, &scheduler, config.credentials())?;
//!
//! let job_id = client.submit_job(description, &config.account).await?;
//! let jobs = client.get_all_jobs().await?;
//!
//! drop(client);
//! scheduler.shutdown().await;
//! ```

pub mod api;
pub mod config;
pub mod customizer;
pub mod descriptor;
pub mod error;
pub mod models;
pub mod naming;
pub mod service;

// Re-export commonly used types
pub use api::{GrpcJobManagementApi, JobManagementApi};
pub use config::TitusClientConfig;
pub use customizer::{ContainerAttribute, JobDescriptorCustomizer};
pub use descriptor::{LABEL_ACCOUNT, LABEL_NAME, LABEL_SOURCE, apply_provenance_labels};
pub use error::{TitusError, TitusResult};
pub use models::{Job, JobDescription, JobState, JobType, Task, TaskState};
pub use naming::push_sequence;
pub use service::TitusClient;
