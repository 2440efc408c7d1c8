//! # mailvet_core
//!
//! Email deliverability verification pipeline: format screening, DNS MX
//! resolution and a live SMTP dialogue against the recipient's mail
//! exchangers, driven by a batched, rate-limited scheduler.
//!
//! ## Features
//!
//! - **Strict format screening** with an anchored acceptance rule
//! - **MX resolution** via hickory-resolver, priority-sorted host lists
//! - **SMTP probing** over raw TCP with a single wall-clock deadline per probe
//! - **Batch scheduling** with bounded concurrency, inter-group pacing and
//!   progress/statistics callbacks
//! - **Aggregate statistics** with per-category and per-domain breakdowns
//!
//! ## Example
//!
//! ```rust,no_run
//! use mailvet_core::{AddressVerifier, VerifierConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let verifier = AddressVerifier::new(VerifierConfig::default())?;
//!
//!     let verdict = verifier.verify("user@example.com").await;
//!     println!("deliverable: {}", verdict.is_valid);
//!
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod dns;
pub mod format;
pub mod smtp;
pub mod stats;
pub mod verifier;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard ceiling on the number of addresses accepted in one batch.
pub const MAX_BATCH_SIZE: usize = 50_000;

/// Configuration for the verification pipeline
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// DNS resolver timeout in milliseconds
    pub dns_timeout_ms: u64,
    /// Maximum number of DNS lookup attempts
    pub dns_attempts: usize,
    /// Wall-clock budget for one SMTP probe, connect to resolution, in milliseconds
    pub smtp_timeout_ms: u64,
    /// Port the SMTP dialogue connects to
    pub smtp_port: u16,
    /// Name announced in the HELO command
    pub helo_name: String,
    /// Envelope sender announced in MAIL FROM
    pub mail_from: String,
    /// Number of addresses verified concurrently within one batch group
    pub concurrent_limit: usize,
    /// Pause between batch groups in milliseconds
    pub rate_limit_delay_ms: u64,
    /// Stop trying further MX hosts once one answers 550/551
    pub stop_on_first_rejection: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            dns_timeout_ms: 5_000,
            dns_attempts: 2,
            smtp_timeout_ms: 15_000,
            smtp_port: 25,
            helo_name: "email-validator.com".to_string(),
            mail_from: "check@email-validator.com".to_string(),
            concurrent_limit: 5,
            rate_limit_delay_ms: 200,
            stop_on_first_rejection: false,
        }
    }
}

/// Deliverability classification for a single address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictCategory {
    /// The mail exchanger accepted the recipient
    Valid,
    /// The address failed the format screen
    InvalidFormat,
    /// The domain has no MX records
    NoMxRecords,
    /// The MX lookup itself failed
    DnsError,
    /// The server answered 550/551: mailbox does not exist
    NotExisting,
    /// The server answered 552/553: mailbox problem
    MailboxError,
    /// The server answered 421/450: try again later
    TemporaryError,
    /// Some other permanent 5xx reply
    SmtpError,
    /// No decisive reply within the probe deadline
    SmtpTimeout,
    /// The TCP connection failed or dropped mid-dialogue
    ConnectionError,
    /// The verification task itself failed; batch safety net
    ProcessingError,
}

impl VerdictCategory {
    /// Every category, in declaration order. Statistics seed their histogram
    /// from this so zero counts are always present.
    pub const ALL: [VerdictCategory; 11] = [
        VerdictCategory::Valid,
        VerdictCategory::InvalidFormat,
        VerdictCategory::NoMxRecords,
        VerdictCategory::DnsError,
        VerdictCategory::NotExisting,
        VerdictCategory::MailboxError,
        VerdictCategory::TemporaryError,
        VerdictCategory::SmtpError,
        VerdictCategory::SmtpTimeout,
        VerdictCategory::ConnectionError,
        VerdictCategory::ProcessingError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictCategory::Valid => "valid",
            VerdictCategory::InvalidFormat => "invalid_format",
            VerdictCategory::NoMxRecords => "no_mx_records",
            VerdictCategory::DnsError => "dns_error",
            VerdictCategory::NotExisting => "not_existing",
            VerdictCategory::MailboxError => "mailbox_error",
            VerdictCategory::TemporaryError => "temporary_error",
            VerdictCategory::SmtpError => "smtp_error",
            VerdictCategory::SmtpTimeout => "smtp_timeout",
            VerdictCategory::ConnectionError => "connection_error",
            VerdictCategory::ProcessingError => "processing_error",
        }
    }
}

impl std::fmt::Display for VerdictCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supporting detail attached to a verdict
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictDetails {
    /// MX hosts for the domain, priority order, when the lookup succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mx_records: Option<Vec<String>>,
    /// The MX host that produced the decisive (last evaluated) response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_server: Option<String>,
}

impl VerdictDetails {
    pub fn is_empty(&self) -> bool {
        self.mx_records.is_none() && self.smtp_server.is_none()
    }
}

/// Classified outcome for a single address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// The address as submitted
    pub address: String,
    /// True iff `category` is [`VerdictCategory::Valid`]
    pub is_valid: bool,
    pub category: VerdictCategory,
    /// Human-readable explanation
    pub message: String,
    #[serde(default, skip_serializing_if = "VerdictDetails::is_empty")]
    pub details: VerdictDetails,
}

impl Verdict {
    /// Build a verdict; `is_valid` is derived from the category, never set
    /// independently.
    pub fn new(
        address: impl Into<String>,
        category: VerdictCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            is_valid: category == VerdictCategory::Valid,
            category,
            message: message.into(),
            details: VerdictDetails::default(),
        }
    }

    pub fn with_details(mut self, details: VerdictDetails) -> Self {
        self.details = details;
        self
    }
}

/// Errors that can occur outside per-address classification
#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("resolver initialization failed: {0}")]
    ResolverInit(#[from] hickory_resolver::error::ResolveError),
    #[error("batch of {0} addresses exceeds the limit of {MAX_BATCH_SIZE}")]
    BatchTooLarge(usize),
    #[error("batch input is empty")]
    EmptyBatch,
}

pub type Result<T> = std::result::Result<T, VerifierError>;

// Re-export main types
pub use batch::{BatchHooks, BatchReport, BatchScheduler};
pub use stats::{BatchStatistics, DomainStat, StatsAggregator, TopDomain};
pub use verifier::AddressVerifier;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_carries_contract_values() {
        let config = VerifierConfig::default();
        assert_eq!(config.concurrent_limit, 5);
        assert_eq!(config.rate_limit_delay_ms, 200);
        assert_eq!(config.smtp_timeout_ms, 15_000);
        assert_eq!(config.smtp_port, 25);
        assert_eq!(config.helo_name, "email-validator.com");
        assert_eq!(config.mail_from, "check@email-validator.com");
        assert!(!config.stop_on_first_rejection);
    }

    #[test]
    fn test_verdict_validity_follows_category() {
        for category in VerdictCategory::ALL {
            let verdict = Verdict::new("user@example.com", category, "test");
            assert_eq!(verdict.is_valid, category == VerdictCategory::Valid);
        }
    }

    #[test]
    fn test_category_serializes_snake_case() {
        for category in VerdictCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
    }

    #[test]
    fn test_empty_details_skipped_in_json() {
        let verdict = Verdict::new("no-at-sign", VerdictCategory::InvalidFormat, "bad");
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(!json.contains("details"));
    }
}
