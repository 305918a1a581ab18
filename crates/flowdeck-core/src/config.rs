// ── Runtime connection configuration ──
//
// These types describe how to reach a flows server. They carry
// credential data and tuning, but never touch disk: front ends build a
// `ControllerConfig` and hand it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::model::FlowColumn;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for one flows server.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Server root (e.g. `http://127.0.0.1:8081`).
    pub url: Url,
    /// Bearer token, when the server requires one.
    pub auth_token: Option<SecretString>,
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Filter applied before the first fetch.
    pub filter: Option<String>,
    /// Sort applied before the first fetch.
    pub sort: Option<FlowColumn>,
    pub descending: bool,
}

impl ControllerConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            auth_token: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            filter: None,
            sort: None,
            descending: false,
        }
    }
}
