//! Caller identity and transport credentials.
//!
//! - [`CallerIdInterceptor`] stamps `x-titus-callerid` on every request.
//! - [`MtlsCredentials`] builds the mutual-TLS client configuration from
//!   key and trust material scoped to the calling application.

pub mod caller_id;
pub mod tls;

pub use caller_id::{CALLER_ID_HEADER, CallerIdInterceptor, with_caller_id};
pub use tls::{KeyManagerFactory, MtlsCredentials, PemDirectory, TrustManagerFactory};
