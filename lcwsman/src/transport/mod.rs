//! Transport layer.
//!
//! A [`Transport`] posts one serialized envelope and returns the raw response
//! body. Retries live in [`send_with_retry`], which rebuilds the envelope for
//! each attempt so that every send carries its own MessageID.

pub mod http;
pub mod mock;

use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::errors::WsmanError;
use crate::soap::Envelope;

pub use http::HttpTransport;
pub use mock::MockTransport;

/// One request/response exchange with a WS-Management endpoint.
pub trait Transport {
    /// Posts `payload` once. No retry.
    fn post(&self, payload: &str) -> Result<Vec<u8>, WsmanError>;

    /// URL written in the `wsa:To` header.
    fn url(&self) -> &str;

    /// Extra attempts allowed for retryable connection failures.
    fn max_retries(&self) -> u32 {
        0
    }
}

/// Builds and posts an envelope, re-sending on retryable connection failures.
///
/// `build` is called once per attempt. HTTP status errors, authentication
/// failures and everything that is not [`WsmanError::is_retryable`] are
/// returned immediately.
pub fn send_with_retry<T, F>(transport: &T, mut build: F) -> Result<Vec<u8>, WsmanError>
where
    T: Transport + ?Sized,
    F: FnMut() -> Result<Envelope, WsmanError>,
{
    let retries = transport.max_retries();
    let mut attempt = 0;

    loop {
        let envelope = build()?;
        match transport.post(&envelope.document) {
            Ok(body) => return Ok(body),
            Err(e) if e.is_retryable() && attempt < retries => {
                attempt += 1;
                warn!(
                    url = transport.url(),
                    message_id = envelope.message_id.as_deref().unwrap_or("-"),
                    attempt,
                    retries,
                    error = %e,
                    "Connection failed, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// HTTP settings of an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub connection_timeout: Duration,
    pub read_timeout: Duration,
    pub max_retries: u32,
    pub verify_ssl_cert: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_millis(12_100),
            read_timeout: Duration::from_secs(120),
            max_retries: 3,
            verify_ssl_cert: false,
        }
    }
}

pub const DEFAULT_PORT: u16 = 443;

/// Where and how to reach one Lifecycle Controller.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub auth: BasicAuth,
    pub http: HttpConfig,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, auth: BasicAuth) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            auth,
            http: HttpConfig::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// `https://host:port/wsman`, with raw IPv6 hosts bracketed.
    pub fn url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("https://[{}]:{}/wsman", self.host, self.port)
        } else {
            format!("https://{}:{}/wsman", self.host, self.port)
        }
    }
}
