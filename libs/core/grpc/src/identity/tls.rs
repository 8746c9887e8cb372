//! Mutual-TLS client credentials scoped to the calling application.

use crate::error::{GrpcError, GrpcResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tonic::transport::{Certificate, ClientTlsConfig, Identity};

/// Supplies the client certificate chain and private key for an application.
pub trait KeyManagerFactory: Send + Sync {
    fn identity(&self, application: &str) -> GrpcResult<Identity>;
}

/// Supplies the roots used to validate the server certificate.
pub trait TrustManagerFactory: Send + Sync {
    fn trust_roots(&self, application: &str) -> GrpcResult<Vec<Certificate>>;
}

/// PEM files on disk, one certificate/key pair per application.
///
/// Layout: `<root>/<application>.crt`, `<root>/<application>.key` and a
/// shared CA bundle (`<root>/ca.crt` unless overridden).
#[derive(Debug, Clone)]
pub struct PemDirectory {
    root: PathBuf,
    ca_file: String,
}

impl PemDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ca_file: "ca.crt".to_string(),
        }
    }

    pub fn with_ca_file(mut self, file_name: impl Into<String>) -> Self {
        self.ca_file = file_name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, file_name: &str) -> GrpcResult<Vec<u8>> {
        let path = self.root.join(file_name);
        std::fs::read(&path).map_err(|source| GrpcError::Credentials { path, source })
    }
}

impl KeyManagerFactory for PemDirectory {
    fn identity(&self, application: &str) -> GrpcResult<Identity> {
        let cert = self.read(&format!("{application}.crt"))?;
        let key = self.read(&format!("{application}.key"))?;
        Ok(Identity::from_pem(cert, key))
    }
}

impl TrustManagerFactory for PemDirectory {
    fn trust_roots(&self, _application: &str) -> GrpcResult<Vec<Certificate>> {
        let bundle = self.read(&self.ca_file)?;
        Ok(vec![Certificate::from_pem(bundle)])
    }
}

/// Builds the client TLS configuration for one application identity.
///
/// # Example
/// ```ignore
/// let pem = Arc::new(PemDirectory::new("/etc/titus/certs"));
/// let tls = MtlsCredentials::new("spinnaker", pem.clone(), pem)
///     .with_domain("titus-api.us-east-1.example.net")
///     .client_tls_config()?;
/// let config = ChannelConfig::new().with_tls(tls);
/// ```
#[derive(Clone)]
pub struct MtlsCredentials {
    application: String,
    keys: Arc<dyn KeyManagerFactory>,
    trust: Arc<dyn TrustManagerFactory>,
    domain: Option<String>,
}

impl MtlsCredentials {
    pub fn new(
        application: impl Into<String>,
        keys: Arc<dyn KeyManagerFactory>,
        trust: Arc<dyn TrustManagerFactory>,
    ) -> Self {
        Self {
            application: application.into(),
            keys,
            trust,
            domain: None,
        }
    }

    /// Override the server name checked against the server certificate
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn client_tls_config(&self) -> GrpcResult<ClientTlsConfig> {
        let identity = self.keys.identity(&self.application)?;
        let roots = self.trust.trust_roots(&self.application)?;
        if roots.is_empty() {
            return Err(GrpcError::InvalidConfig(format!(
                "no trust roots available for application '{}'",
                self.application
            )));
        }

        let mut tls = ClientTlsConfig::new().identity(identity);
        for root in roots {
            tls = tls.ca_certificate(root);
        }
        if let Some(domain) = &self.domain {
            tls = tls.domain_name(domain.clone());
        }

        tracing::debug!(
            target: "grpc_client",
            application = %self.application,
            domain = ?self.domain,
            "Built mutual TLS credentials"
        );

        Ok(tls)
    }
}

impl std::fmt::Debug for MtlsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MtlsCredentials")
            .field("application", &self.application)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAKE_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    fn pem_dir(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            std::fs::write(dir.path().join(file), FAKE_PEM).unwrap();
        }
        dir
    }

    struct NoRoots;

    impl TrustManagerFactory for NoRoots {
        fn trust_roots(&self, _application: &str) -> GrpcResult<Vec<Certificate>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_builds_config_from_pem_directory() {
        let dir = pem_dir(&["spinnaker.crt", "spinnaker.key", "ca.crt"]);
        let pem = Arc::new(PemDirectory::new(dir.path()));

        let credentials =
            MtlsCredentials::new("spinnaker", pem.clone(), pem).with_domain("titus.test");
        assert!(credentials.client_tls_config().is_ok());
    }

    #[test]
    fn test_material_is_scoped_to_application() {
        let dir = pem_dir(&["spinnaker.crt", "spinnaker.key", "ca.crt"]);
        let pem = Arc::new(PemDirectory::new(dir.path()));

        let result = MtlsCredentials::new("keel", pem.clone(), pem).client_tls_config();
        match result {
            Err(GrpcError::Credentials { path, .. }) => assert!(path.ends_with("keel.crt")),
            other => panic!("expected credentials error, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_ca_file_name() {
        let dir = pem_dir(&["spinnaker.crt", "spinnaker.key", "titus-ca.pem"]);
        let default = Arc::new(PemDirectory::new(dir.path()));
        assert!(
            MtlsCredentials::new("spinnaker", default.clone(), default)
                .client_tls_config()
                .is_err()
        );

        let custom = Arc::new(PemDirectory::new(dir.path()).with_ca_file("titus-ca.pem"));
        assert!(
            MtlsCredentials::new("spinnaker", custom.clone(), custom)
                .client_tls_config()
                .is_ok()
        );
    }

    #[test]
    fn test_empty_trust_roots_are_rejected() {
        let dir = pem_dir(&["spinnaker.crt", "spinnaker.key"]);
        let keys = Arc::new(PemDirectory::new(dir.path()));

        let result = MtlsCredentials::new("spinnaker", keys, Arc::new(NoRoots)).client_tls_config();
        assert!(matches!(result, Err(GrpcError::InvalidConfig(_))));
    }
}
