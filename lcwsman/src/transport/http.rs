//! Blocking HTTPS transport built on `ureq`.

use std::io::ErrorKind;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, error};
use ureq::Agent;
use ureq::tls::TlsConfig;

use super::{Endpoint, Transport};
use crate::errors::WsmanError;

const CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";

pub struct HttpTransport {
    agent: Agent,
    url: String,
    authorization: String,
    max_retries: u32,
}

impl HttpTransport {
    pub fn new(endpoint: &Endpoint) -> Self {
        // Les statuts 4xx/5xx ne sont pas des erreurs ureq : on lit le corps
        // pour les classer nous-mêmes.
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(endpoint.http.connection_timeout))
            .timeout_recv_response(Some(endpoint.http.read_timeout))
            .timeout_recv_body(Some(endpoint.http.read_timeout))
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(!endpoint.http.verify_ssl_cert)
                    .build(),
            )
            .build();

        let credentials = format!("{}:{}", endpoint.auth.username, endpoint.auth.password);

        Self {
            agent: config.into(),
            url: endpoint.url(),
            authorization: format!("Basic {}", STANDARD.encode(credentials)),
            max_retries: endpoint.http.max_retries,
        }
    }
}

/// Only failures raised before the request reached the device are retryable.
///
/// Once the request is written, a timeout or a broken connection may hide an
/// action the firmware has already started.
fn classify(err: ureq::Error) -> WsmanError {
    let retryable = match &err {
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => true,
        ureq::Error::Timeout(timeout) => {
            matches!(timeout, ureq::Timeout::Resolve | ureq::Timeout::Connect)
        }
        ureq::Error::Io(e) => e.kind() == ErrorKind::ConnectionRefused,
        _ => false,
    };
    WsmanError::connection(err.to_string(), retryable)
}

/// Failure while reading the response body: the request was delivered.
fn body_error(err: ureq::Error) -> WsmanError {
    WsmanError::connection(format!("Failed to read WSMAN response: {}", err), false)
}

/// Error for a non-2xx status. 401 means the credentials were refused.
fn status_error(status: u16, reason: String) -> WsmanError {
    if status == 401 {
        WsmanError::Auth { status, reason }
    } else {
        WsmanError::Http { status, reason }
    }
}

impl Transport for HttpTransport {
    fn post(&self, payload: &str) -> Result<Vec<u8>, WsmanError> {
        debug!(url = %self.url, bytes = payload.len(), "POST WSMAN request");

        let mut response = self
            .agent
            .post(&self.url)
            .header("Content-Type", CONTENT_TYPE)
            .header("Authorization", &self.authorization)
            .send(payload.to_string())
            .map_err(|e| {
                error!(url = %self.url, error = %e, "WSMAN request failed");
                classify(e)
            })?;

        let status = response.status();
        let body = response.body_mut().read_to_vec().map_err(|e| {
            error!(url = %self.url, error = %e, "WSMAN response could not be read");
            body_error(e)
        })?;

        debug!(
            url = %self.url,
            status = status.as_u16(),
            bytes = body.len(),
            "WSMAN response received"
        );

        if status.is_success() {
            return Ok(body);
        }

        let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
        error!(url = %self.url, status = status.as_u16(), %reason, "WSMAN endpoint returned an error status");
        Err(status_error(status.as_u16(), reason))
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{BasicAuth, HttpConfig};

    #[test]
    fn basic_auth_header_and_url() {
        let endpoint = Endpoint::new("fe80::2", BasicAuth::new("root", "calvin")).with_http(
            HttpConfig {
                max_retries: 5,
                ..HttpConfig::default()
            },
        );
        let transport = HttpTransport::new(&endpoint);

        assert_eq!(transport.url(), "https://[fe80::2]:443/wsman");
        assert_eq!(transport.authorization, "Basic cm9vdDpjYWx2aW4=");
        assert_eq!(transport.max_retries(), 5);
    }

    #[test]
    fn status_401_is_an_auth_failure() {
        assert!(matches!(
            status_error(401, "Unauthorized".into()),
            WsmanError::Auth { status: 401, .. }
        ));
        assert!(matches!(
            status_error(500, "Internal Server Error".into()),
            WsmanError::Http { status: 500, .. }
        ));
        assert!(!status_error(401, "Unauthorized".into()).is_retryable());
    }

    #[test]
    fn connection_errors_are_retryable() {
        assert!(classify(ureq::Error::ConnectionFailed).is_retryable());
        assert!(classify(ureq::Error::HostNotFound).is_retryable());
        assert!(classify(ureq::Error::Timeout(ureq::Timeout::Connect)).is_retryable());
        assert!(classify(ureq::Error::Timeout(ureq::Timeout::Resolve)).is_retryable());
        assert!(
            classify(ureq::Error::Io(std::io::Error::from(ErrorKind::ConnectionRefused)))
                .is_retryable()
        );
        assert!(!classify(ureq::Error::StatusCode(500)).is_retryable());
    }

    #[test]
    fn delivered_requests_are_not_retried() {
        // La requête est partie : la rejouer pourrait relancer l'action
        for timeout in [
            ureq::Timeout::SendBody,
            ureq::Timeout::RecvResponse,
            ureq::Timeout::RecvBody,
            ureq::Timeout::Global,
        ] {
            assert!(!classify(ureq::Error::Timeout(timeout)).is_retryable());
        }
        assert!(
            !classify(ureq::Error::Io(std::io::Error::from(ErrorKind::ConnectionReset)))
                .is_retryable()
        );
        assert!(!body_error(ureq::Error::Timeout(ureq::Timeout::RecvBody)).is_retryable());
        assert!(
            !body_error(ureq::Error::Io(std::io::Error::from(ErrorKind::ConnectionRefused)))
                .is_retryable()
        );
    }
}
