//! Aggregate statistics over verdicts
//!
//! Folds a stream of verdicts into totals, a category histogram, per-domain
//! counts and a top-ten domain list. Snapshots are materialised copies so
//! callback observers never hold a live reference into the running fold.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::{Verdict, VerdictCategory};

/// Per-domain verdict counts; `valid + invalid == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DomainStat {
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
}

/// One entry of the top-domains list
#[derive(Debug, Clone, Serialize)]
pub struct TopDomain {
    pub domain: String,
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
    /// Percentage of valid verdicts, one decimal place
    pub validity_rate: String,
}

/// Materialised statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct BatchStatistics {
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
    /// Every category is present, zero included
    pub categories: BTreeMap<VerdictCategory, u64>,
    pub domains: BTreeMap<String, DomainStat>,
    /// Up to ten domains with the highest totals, descending; ties keep
    /// first-seen order
    pub top_domains: Vec<TopDomain>,
}

/// Incremental fold over verdicts
#[derive(Debug, Default)]
pub struct StatsAggregator {
    total: u64,
    valid: u64,
    invalid: u64,
    categories: BTreeMap<VerdictCategory, u64>,
    domain_index: HashMap<String, usize>,
    // first-seen order, which decides top-domain ties
    domain_entries: Vec<(String, DomainStat)>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        let mut categories = BTreeMap::new();
        for category in VerdictCategory::ALL {
            categories.insert(category, 0);
        }
        Self {
            categories,
            ..Self::default()
        }
    }

    /// Fold one verdict in. Addresses without an `@` count toward the totals
    /// and the histogram but carry no domain.
    pub fn record(&mut self, verdict: &Verdict) {
        self.total += 1;
        if verdict.is_valid {
            self.valid += 1;
        } else {
            self.invalid += 1;
        }
        *self.categories.entry(verdict.category).or_insert(0) += 1;

        let Some(at) = verdict.address.rfind('@') else {
            return;
        };
        let domain = &verdict.address[at + 1..];
        let index = match self.domain_index.get(domain) {
            Some(&index) => index,
            None => {
                self.domain_entries
                    .push((domain.to_string(), DomainStat::default()));
                let index = self.domain_entries.len() - 1;
                self.domain_index.insert(domain.to_string(), index);
                index
            }
        };
        let stat = &mut self.domain_entries[index].1;
        stat.total += 1;
        if verdict.is_valid {
            stat.valid += 1;
        } else {
            stat.invalid += 1;
        }
    }

    /// Materialise the current state.
    pub fn snapshot(&self) -> BatchStatistics {
        let mut order: Vec<usize> = (0..self.domain_entries.len()).collect();
        order.sort_by(|&a, &b| {
            self.domain_entries[b]
                .1
                .total
                .cmp(&self.domain_entries[a].1.total)
                .then(a.cmp(&b))
        });

        let top_domains = order
            .into_iter()
            .take(10)
            .map(|index| {
                let (domain, stat) = &self.domain_entries[index];
                TopDomain {
                    domain: domain.clone(),
                    total: stat.total,
                    valid: stat.valid,
                    invalid: stat.invalid,
                    validity_rate: format!(
                        "{:.1}",
                        (stat.valid as f64 / stat.total as f64) * 100.0
                    ),
                }
            })
            .collect();

        BatchStatistics {
            total: self.total,
            valid: self.valid,
            invalid: self.invalid,
            categories: self.categories.clone(),
            domains: self
                .domain_entries
                .iter()
                .map(|(domain, stat)| (domain.clone(), *stat))
                .collect(),
            top_domains,
        }
    }
}
