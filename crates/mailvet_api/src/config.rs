//! Configuration management for the mailvet API
//!
//! This module handles loading configuration from environment variables
//! and configuration files using the figment crate.

use mailvet_core::VerifierConfig;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub verifier: VerifierSettings,
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable graceful shutdown
    pub graceful_shutdown: bool,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            graceful_shutdown: true,
            shutdown_timeout_secs: 30,
        }
    }
}

/// Verification pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierSettings {
    /// DNS resolver timeout in milliseconds
    pub dns_timeout_ms: u64,
    /// Maximum number of DNS lookup attempts
    pub dns_attempts: usize,
    /// Wall-clock budget for one SMTP probe in milliseconds
    pub smtp_timeout_ms: u64,
    /// Port SMTP probes connect to
    pub smtp_port: u16,
    /// Name announced in the HELO command
    pub helo_name: String,
    /// Envelope sender announced in MAIL FROM
    pub mail_from: String,
    /// Addresses verified concurrently within one batch group
    pub concurrent_limit: usize,
    /// Pause between batch groups in milliseconds
    pub rate_limit_delay_ms: u64,
    /// Stop trying further MX hosts once one answers 550/551
    pub stop_on_first_rejection: bool,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        let core = VerifierConfig::default();
        Self {
            dns_timeout_ms: core.dns_timeout_ms,
            dns_attempts: core.dns_attempts,
            smtp_timeout_ms: core.smtp_timeout_ms,
            smtp_port: core.smtp_port,
            helo_name: core.helo_name,
            mail_from: core.mail_from,
            concurrent_limit: core.concurrent_limit,
            rate_limit_delay_ms: core.rate_limit_delay_ms,
            stop_on_first_rejection: core.stop_on_first_rejection,
        }
    }
}

impl VerifierSettings {
    /// Convert into the core pipeline configuration.
    pub fn to_core(&self) -> VerifierConfig {
        VerifierConfig {
            dns_timeout_ms: self.dns_timeout_ms,
            dns_attempts: self.dns_attempts,
            smtp_timeout_ms: self.smtp_timeout_ms,
            smtp_port: self.smtp_port,
            helo_name: self.helo_name.clone(),
            mail_from: self.mail_from.clone(),
            concurrent_limit: self.concurrent_limit,
            rate_limit_delay_ms: self.rate_limit_delay_ms,
            stop_on_first_rejection: self.stop_on_first_rejection,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable JSON structured logging
    pub json_logs: bool,
    /// Log level filter
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_level: "info".to_string(),
        }
    }
}

/// Prefix stripped from configuration environment variables
/// (e.g. `MAILVET_SERVER_PORT` sets `server.port`).
pub const ENV_PREFIX: &str = "MAILVET_";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.verifier.concurrent_limit, 5);
        assert_eq!(config.verifier.rate_limit_delay_ms, 200);
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_verifier_settings_round_trip_to_core() {
        let settings = VerifierSettings::default();
        let core = settings.to_core();
        assert_eq!(core.smtp_timeout_ms, 15_000);
        assert_eq!(core.smtp_port, 25);
        assert_eq!(core.helo_name, "email-validator.com");
        assert_eq!(core.mail_from, "check@email-validator.com");
        assert!(!core.stop_on_first_rejection);
    }
}
