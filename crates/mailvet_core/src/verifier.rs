//! Address verification pipeline
//!
//! Composes the format screen, the MX lookup and the SMTP probe into a
//! single classified verdict per address, falling back through the MX hosts
//! in priority order.

use tracing::{debug, instrument, warn};

use crate::dns::MxResolver;
use crate::smtp::SmtpProber;
use crate::{format, Result, Verdict, VerdictCategory, VerdictDetails, VerifierConfig};

/// Verifier coordinating all checks for one address
pub struct AddressVerifier {
    config: VerifierConfig,
    resolver: MxResolver,
    prober: SmtpProber,
}

impl AddressVerifier {
    /// Create a verifier with the given configuration.
    ///
    /// # Returns
    /// * `Ok(AddressVerifier)` on success
    /// * `Err(VerifierError)` if the resolver cannot be constructed
    pub fn new(config: VerifierConfig) -> Result<Self> {
        let resolver = MxResolver::new(config.dns_timeout_ms, config.dns_attempts)?;
        let prober = SmtpProber::from_config(&config);

        Ok(Self {
            config,
            resolver,
            prober,
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Classify the deliverability of one address.
    ///
    /// Never fails: every path resolves to a [`Verdict`].
    #[instrument(skip(self), fields(address = %address))]
    pub async fn verify(&self, address: &str) -> Verdict {
        if !format::is_valid_address(address) {
            debug!("address failed the format screen");
            return Verdict::new(
                address,
                VerdictCategory::InvalidFormat,
                "address does not match the accepted format",
            );
        }

        // Format acceptance guarantees a splittable address.
        let Some((_, domain)) = format::split_address(address) else {
            return Verdict::new(
                address,
                VerdictCategory::InvalidFormat,
                "address does not match the accepted format",
            );
        };

        let hosts = match self.resolver.lookup_mx(domain).await {
            Ok(hosts) if hosts.is_empty() => {
                debug!(domain, "domain has no MX records");
                return Verdict::new(
                    address,
                    VerdictCategory::NoMxRecords,
                    format!("no MX records found for {domain}"),
                );
            }
            Ok(hosts) => hosts,
            Err(err) => {
                warn!(domain, error = %err, "MX lookup failed");
                return Verdict::new(
                    address,
                    VerdictCategory::DnsError,
                    format!("MX lookup failed for {domain}: {err}"),
                );
            }
        };

        self.probe_hosts(address, &hosts).await
    }

    /// Probe the exchangers in priority order. The first `valid` wins
    /// immediately; otherwise the latest non-valid outcome carries, and hosts
    /// whose names will not even resolve are skipped. A 550/551 does not end
    /// the fallback unless `stop_on_first_rejection` is set, since some
    /// front-line exchangers over-reject.
    pub(crate) async fn probe_hosts(&self, address: &str, hosts: &[String]) -> Verdict {
        let mut last: Option<(VerdictCategory, String, String)> = None;

        for host in hosts {
            match self.prober.probe(host, address).await {
                Ok(outcome) => {
                    if outcome.category == VerdictCategory::Valid {
                        return Verdict::new(address, VerdictCategory::Valid, outcome.message)
                            .with_details(VerdictDetails {
                                mx_records: Some(hosts.to_vec()),
                                smtp_server: Some(host.clone()),
                            });
                    }
                    debug!(%host, category = %outcome.category, "exchanger did not accept, trying next");
                    let stop = self.config.stop_on_first_rejection
                        && outcome.category == VerdictCategory::NotExisting;
                    last = Some((outcome.category, outcome.message, host.clone()));
                    if stop {
                        break;
                    }
                }
                Err(err) => {
                    warn!(%host, error = %err, "skipping unreachable exchanger");
                }
            }
        }

        match last {
            Some((category, message, host)) => Verdict::new(address, category, message)
                .with_details(VerdictDetails {
                    mx_records: Some(hosts.to_vec()),
                    smtp_server: Some(host),
                }),
            None => Verdict::new(
                address,
                VerdictCategory::SmtpTimeout,
                "All SMTP servers unreachable",
            )
            .with_details(VerdictDetails {
                mx_records: Some(hosts.to_vec()),
                smtp_server: None,
            }),
        }
    }
}
