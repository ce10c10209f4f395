//! Sequential audit of networks against the DNSBL.

use crate::classify::{classify, usable_hosts, ReportRow};
use crate::config::Config;
use crate::providers::dnsbl::{DnsblLookup, LookupResult};
use crate::providers::{Hit, LookupOutcome, Resolver};
use chrono::{Local, NaiveDateTime, SubsecRound};
use ipnet::Ipv4Net;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lookup counters for a network or a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Addresses checked.
    pub addresses: u64,
    /// Queries sent to the DNSBL.
    pub queries: u64,
    /// Answers served from the cache.
    pub cache_hits: u64,
    /// Addresses with at least one recognized listing.
    pub listed: u64,
    /// Lookups that failed and were reported as not listed.
    pub failed: u64,
}

impl ScanStats {
    fn record(&mut self, result: &LookupResult) {
        self.addresses += 1;
        if result.cached {
            self.cache_hits += 1;
        } else {
            self.queries += 1;
        }
        match result.outcome {
            LookupOutcome::Listed(_) => self.listed += 1,
            LookupOutcome::Failed(_) => self.failed += 1,
            LookupOutcome::NotListed => {}
        }
    }

    fn merge(&mut self, other: &ScanStats) {
        self.addresses += other.addresses;
        self.queries += other.queries;
        self.cache_hits += other.cache_hits;
        self.listed += other.listed;
        self.failed += other.failed;
    }
}

/// Hits gathered for one network, in address order.
#[derive(Debug, Clone)]
pub struct NetworkScan {
    pub network: Ipv4Net,
    pub hits: Vec<Hit>,
    pub stats: ScanStats,
}

/// Run-level statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditStats {
    /// Networks scanned.
    pub networks: u64,
    /// Networks with at least one hit.
    pub networks_listed: u64,
    /// Rows reporting a whole network.
    pub network_rows: u64,
    /// Total rows.
    pub rows: u64,
    pub lookups: ScanStats,
}

/// Rows of a complete run, in network order.
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub rows: Vec<ReportRow>,
    pub stats: AuditStats,
}

/// Drives lookups and classification over a list of networks.
///
/// Addresses are checked one at a time with a fixed pause after every query
/// sent, which caps the query rate seen by the blocklist operator.
pub struct Auditor {
    lookup: DnsblLookup,
    provider_name: String,
    query_delay: Duration,
}

impl Auditor {
    /// Create an auditor from configuration.
    pub fn new(config: &Config, resolver: Arc<dyn Resolver>) -> Self {
        Self::with_lookup(
            DnsblLookup::from_config(config, resolver),
            &config.settings.provider_name,
            config.settings.query_delay(),
        )
    }

    /// Create an auditor around an existing lookup.
    pub fn with_lookup(lookup: DnsblLookup, provider_name: &str, query_delay: Duration) -> Self {
        Self {
            lookup,
            provider_name: provider_name.to_string(),
            query_delay,
        }
    }

    /// Check every host address of `network` and collect its hits.
    pub async fn scan_network(&self, network: Ipv4Net) -> NetworkScan {
        let mut hits = Vec::new();
        let mut stats = ScanStats::default();

        for ip in network.hosts() {
            let result = self.lookup.check(ip).await;
            stats.record(&result);

            let cached = result.cached;
            hits.extend(
                result
                    .outcome
                    .into_listings()
                    .into_iter()
                    .map(|listing| Hit::new(ip, listing)),
            );

            if !cached && !self.query_delay.is_zero() {
                tokio::time::sleep(self.query_delay).await;
            }
        }

        NetworkScan {
            network,
            hits,
            stats,
        }
    }

    /// Scan and classify one network.
    pub async fn audit_network(&self, network: Ipv4Net) -> (Vec<ReportRow>, ScanStats) {
        info!(
            network = %network,
            hosts = ?usable_hosts(&network),
            zone = %self.lookup.zone(),
            "Checking network"
        );

        let scan = self.scan_network(network).await;

        if scan.stats.failed > 0 {
            warn!(
                network = %network,
                failed = scan.stats.failed,
                addresses = scan.stats.addresses,
                "Some lookups failed and were treated as not listed"
            );
        }

        let rows = classify(&network, &scan.hits, &self.provider_name, now());

        for row in &rows {
            if row.is_network() {
                info!(network = %row.target, list = %row.list_label, "Entire network listed");
            } else {
                info!(address = %row.target, list = %row.list_label, details = %row.details, "Address listed");
            }
        }

        debug!(
            network = %network,
            hits = scan.hits.len(),
            rows = rows.len(),
            queries = scan.stats.queries,
            cache_hits = scan.stats.cache_hits,
            "Network checked"
        );

        (rows, scan.stats)
    }

    /// Audit all networks in order and collect the report.
    pub async fn run(&self, networks: &[Ipv4Net]) -> AuditReport {
        let mut report = AuditReport::default();

        for network in networks {
            let (rows, stats) = self.audit_network(*network).await;

            report.stats.networks += 1;
            report.stats.lookups.merge(&stats);
            if !rows.is_empty() {
                report.stats.networks_listed += 1;
            }
            report.stats.network_rows += rows.iter().filter(|r| r.is_network()).count() as u64;
            report.stats.rows += rows.len() as u64;

            report.rows.extend(rows);
        }

        info!(
            networks = report.stats.networks,
            networks_listed = report.stats.networks_listed,
            addresses = report.stats.lookups.addresses,
            queries = report.stats.lookups.queries,
            failed = report.stats.lookups.failed,
            rows = report.stats.rows,
            "Audit complete"
        );

        report
    }
}

/// Local wall clock, truncated to whole seconds.
fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}
