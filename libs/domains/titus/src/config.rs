use core_config::{ConfigError, Environment, FromEnv, env_optional, env_or_default, env_parse, env_required};
use grpc_client::interceptors::metrics::DestinationTags;
use grpc_client::{ChannelConfig, GrpcResult, MtlsCredentials, PemDirectory, RetryConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_APPLICATION: &str = "spinnaker";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_API_VERSION: &str = "v3";

/// Connection and call settings for one Titus region/account.
#[derive(Debug, Clone, PartialEq)]
pub struct TitusClientConfig {
    /// Scheduler URI, e.g. `https://titus-api.us-east-1.example.net:7104`
    pub endpoint: String,
    pub account: String,
    pub region: String,
    /// Calling application; scopes key and trust material
    pub application: String,
    /// Value of the `x-titus-callerid` header
    pub caller_id: String,
    /// PEM directory; plaintext when unset (development only)
    pub credentials_dir: Option<PathBuf>,
    pub tls_domain: Option<String>,
    /// Per-attempt deadline
    pub deadline: Duration,
    pub base_backoff: Duration,
    pub max_retries: u32,
    pub page_size: u32,
    pub api_version: String,
}

impl TitusClientConfig {
    pub fn new(
        endpoint: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        let retry = RetryConfig::default();
        Self {
            endpoint: endpoint.into(),
            account: account.into(),
            region: region.into(),
            application: DEFAULT_APPLICATION.to_string(),
            caller_id: DEFAULT_APPLICATION.to_string(),
            credentials_dir: None,
            tls_domain: None,
            deadline: retry.deadline,
            base_backoff: retry.base_backoff,
            max_retries: retry.max_retries,
            page_size: DEFAULT_PAGE_SIZE,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_credentials_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.credentials_dir = Some(dir.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .with_deadline(self.deadline)
            .with_base_backoff(self.base_backoff)
            .with_max_retries(self.max_retries)
    }

    pub fn destination_tags(&self) -> DestinationTags {
        DestinationTags::new(&self.account, &self.region, &self.api_version)
    }

    /// mTLS credentials read from `credentials_dir`, if configured
    pub fn credentials(&self) -> Option<MtlsCredentials> {
        let dir = self.credentials_dir.as_ref()?;
        let pem = Arc::new(PemDirectory::new(dir));
        let credentials = MtlsCredentials::new(&self.application, pem.clone(), pem);
        Some(match &self.tls_domain {
            Some(domain) => credentials.with_domain(domain),
            None => credentials,
        })
    }

    /// Channel settings, with TLS built from `credentials` when given
    pub fn channel_config(&self, credentials: Option<&MtlsCredentials>) -> GrpcResult<ChannelConfig> {
        let config = ChannelConfig::new()
            .with_user_agent(format!("{}/titus-client", self.application));
        match credentials {
            Some(credentials) => Ok(config.with_tls(credentials.client_tls_config()?)),
            None => Ok(config),
        }
    }
}

impl FromEnv for TitusClientConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let application = env_or_default("TITUS_APPLICATION", DEFAULT_APPLICATION);
        let caller_id = env_optional("TITUS_CALLER_ID").unwrap_or_else(|| application.clone());
        let credentials_dir = env_optional("TITUS_CREDENTIALS_DIR").map(PathBuf::from);

        if credentials_dir.is_none() && Environment::from_env().is_production() {
            return Err(ConfigError::MissingEnvVar("TITUS_CREDENTIALS_DIR".to_string()));
        }

        let defaults = RetryConfig::default();
        let page_size = env_parse("TITUS_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::ParseError {
                key: "TITUS_PAGE_SIZE".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            endpoint: env_required("TITUS_ENDPOINT")?,
            account: env_required("TITUS_ACCOUNT")?,
            region: env_required("TITUS_REGION")?,
            application,
            caller_id,
            credentials_dir,
            tls_domain: env_optional("TITUS_TLS_DOMAIN"),
            deadline: Duration::from_millis(env_parse(
                "TITUS_DEADLINE_MS",
                defaults.deadline.as_millis() as u64,
            )?),
            base_backoff: Duration::from_millis(env_parse(
                "TITUS_RETRY_BASE_BACKOFF_MS",
                defaults.base_backoff.as_millis() as u64,
            )?),
            max_retries: env_parse("TITUS_MAX_RETRIES", defaults.max_retries)?,
            page_size,
            api_version: env_or_default("TITUS_API_VERSION", DEFAULT_API_VERSION),
        })
    }
}
