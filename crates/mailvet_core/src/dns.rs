//! MX resolution using hickory-resolver
//!
//! One lookup per domain: the exchanger hostnames sorted ascending by
//! preference, ties left in resolver order. Missing records and NXDOMAIN are
//! an empty list; only transport-level resolver failures surface as errors.

use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::{system_conf, AsyncResolver, TokioAsyncResolver};
use std::time::Duration;
use tracing::debug;

/// MX resolver wrapper over the system resolver configuration
pub struct MxResolver {
    resolver: TokioAsyncResolver,
}

impl MxResolver {
    /// Create a resolver from the system configuration.
    ///
    /// # Arguments
    /// * `timeout_ms` - DNS query timeout in milliseconds
    /// * `attempts` - Maximum number of retry attempts
    pub fn new(timeout_ms: u64, attempts: usize) -> Result<Self, ResolveError> {
        let (config, mut opts) = system_conf::read_system_conf()?;
        opts.timeout = Duration::from_millis(timeout_ms);
        opts.attempts = attempts;

        let resolver = AsyncResolver::tokio(config, opts);

        debug!(timeout_ms, attempts, "MX resolver initialized");

        Ok(Self { resolver })
    }

    /// Look up the mail exchangers for a domain.
    ///
    /// # Returns
    /// * `Ok(hosts)` - exchanger hostnames sorted by preference ascending;
    ///   empty when the domain has no MX records or does not exist
    /// * `Err(_)` - the lookup itself failed (transport, server failure)
    pub async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>, ResolveError> {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => {
                let records: Vec<(u16, String)> = lookup
                    .iter()
                    .map(|mx| {
                        let host = mx.exchange().to_utf8();
                        (mx.preference(), host.trim_end_matches('.').to_string())
                    })
                    .collect();
                let hosts = sort_by_preference(records);
                debug!(domain, count = hosts.len(), "MX lookup complete");
                Ok(hosts)
            }
            Err(err) => match err.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => {
                    debug!(domain, "no MX records");
                    Ok(Vec::new())
                }
                _ => Err(err),
            },
        }
    }
}

/// Order exchangers ascending by preference; the sort is stable so equal
/// preferences keep the order the resolver returned them in.
fn sort_by_preference(mut records: Vec<(u16, String)>) -> Vec<String> {
    records.sort_by_key(|(preference, _)| *preference);
    records.into_iter().map(|(_, host)| host).collect()
}
