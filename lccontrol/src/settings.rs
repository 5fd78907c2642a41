//! Conversion de la configuration en paramètres du client

use anyhow::{Result, anyhow};
use lcconfig::Config;
use lcwsman::{BasicAuth, Endpoint, HttpConfig};
use tracing::level_filters::LevelFilter;
use tracing::warn;

use crate::lifecycle::PollSettings;

pub fn http_config(config: &Config) -> HttpConfig {
    HttpConfig {
        connection_timeout: config.get_connection_timeout(),
        read_timeout: config.get_read_timeout(),
        max_retries: u32::try_from(config.get_max_retries()).unwrap_or(u32::MAX),
        verify_ssl_cert: config.get_verify_ssl_cert(),
    }
}

/// Identifiants, mot de passe déchiffré.
pub fn basic_auth(config: &Config) -> Result<BasicAuth> {
    Ok(BasicAuth::new(config.get_username(), config.get_password()?))
}

pub fn poll_settings(config: &Config) -> PollSettings {
    PollSettings {
        ready_timeout: config.get_ready_timeout(),
        ready_interval: config.get_ready_interval(),
        job_timeout: config.get_job_timeout(),
        job_interval: config.get_job_interval(),
        graceful_reboot: config.get_graceful_reboot(),
    }
}

/// Point d'accès complet pour `host`.
pub fn endpoint(config: &Config, host: &str) -> Result<Endpoint> {
    Ok(Endpoint::new(host, basic_auth(config)?)
        .with_port(config.get_port())
        .with_http(http_config(config)))
}

/// Niveau `logger.min_level` ; INFO s'il n'est pas reconnu.
pub fn log_level(config: &Config) -> LevelFilter {
    let level = config.get_log_min_level();
    level.parse().unwrap_or_else(|_| {
        warn!(level = %level, "Unknown log level, using INFO");
        LevelFilter::INFO
    })
}

/// Installe un subscriber console filtré par [`log_level`].
pub fn init_logging(config: &Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(log_level(config))
        .try_init()
        .map_err(|e| anyhow!("Cannot install the log subscriber: {}", e))
}
