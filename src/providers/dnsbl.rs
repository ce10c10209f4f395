//! DNSBL lookup: reversed-address queries and answer interpretation.

use super::{Listing, LookupError, LookupOutcome, Resolver};
use crate::cache::LookupCache;
use crate::codes::{is_refusal_code, ReasonTable};
use crate::config::Config;
use hickory_resolver::proto::rr::RecordType;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Result of checking one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    pub address: Ipv4Addr,
    pub outcome: LookupOutcome,
    /// Served from cache; no query was sent.
    pub cached: bool,
}

/// Queries a single DNSBL zone and maps its answers to listings.
pub struct DnsblLookup {
    zone: String,
    codes: ReasonTable,
    resolver: Arc<dyn Resolver>,
    timeout: Duration,
    cache: Option<Arc<LookupCache>>,
}

impl DnsblLookup {
    /// Create a lookup against `zone` with no cache.
    pub fn new(
        zone: &str,
        codes: ReasonTable,
        resolver: Arc<dyn Resolver>,
        timeout: Duration,
    ) -> Self {
        Self {
            zone: zone.trim_matches('.').to_string(),
            codes,
            resolver,
            timeout,
            cache: None,
        }
    }

    /// Create a lookup from configuration, including the cache when enabled.
    pub fn from_config(config: &Config, resolver: Arc<dyn Resolver>) -> Self {
        let lookup = Self::new(
            &config.settings.zone,
            config.reason_table(),
            resolver,
            config.settings.timeout(),
        );

        if config.cache.enabled {
            lookup.with_cache(Arc::new(LookupCache::new(
                config.cache.ttl_seconds,
                config.cache.max_entries,
            )))
        } else {
            lookup
        }
    }

    /// Attach a shared cache.
    pub fn with_cache(mut self, cache: Arc<LookupCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Query name for an address: `4.3.2.1.<zone>` for `1.2.3.4`.
    pub fn query_name(&self, ip: Ipv4Addr) -> String {
        format!("{}.{}", reverse_dotted(&ip.to_string()), self.zone)
    }

    /// Map a DNSBL answer to an outcome.
    ///
    /// Recognized codes are kept in answer order; unknown codes are dropped.
    pub fn interpret(&self, answers: &[String]) -> LookupOutcome {
        if answers.is_empty() {
            return LookupOutcome::Failed(LookupError::InvalidResponse(
                "empty answer".to_string(),
            ));
        }

        let listings: Vec<Listing> = answers
            .iter()
            .filter_map(|answer| self.codes.get(answer).cloned())
            .collect();

        if !listings.is_empty() {
            return LookupOutcome::Listed(listings);
        }

        match answers.iter().find(|answer| is_refusal_code(answer)) {
            Some(code) => LookupOutcome::Failed(LookupError::Refused(code.trim().to_string())),
            None => LookupOutcome::NotListed,
        }
    }

    /// Send one query for `ip`, bypassing the cache.
    pub async fn query(&self, ip: Ipv4Addr) -> LookupOutcome {
        let name = self.query_name(ip);
        debug!(ip = %ip, query = %name, "Querying DNSBL");

        let answer =
            tokio::time::timeout(self.timeout, self.resolver.resolve(&name, RecordType::A)).await;

        let outcome = match answer {
            Ok(Ok(answers)) => self.interpret(&answers),
            Ok(Err(LookupError::NxDomain)) => LookupOutcome::NotListed,
            Ok(Err(e)) => LookupOutcome::Failed(e),
            Err(_) => LookupOutcome::Failed(LookupError::Timeout),
        };

        match &outcome {
            LookupOutcome::Listed(listings) => {
                debug!(ip = %ip, listings = listings.len(), "Address listed");
            }
            LookupOutcome::Failed(e) => {
                debug!(ip = %ip, error = %e, "DNSBL lookup failed");
            }
            LookupOutcome::NotListed => {}
        }

        outcome
    }

    /// Check `ip`, answering from the cache when possible.
    pub async fn check(&self, ip: Ipv4Addr) -> LookupResult {
        if let Some(outcome) = self.cache.as_ref().and_then(|c| c.get(&ip)) {
            debug!(ip = %ip, "DNSBL cache hit");
            return LookupResult {
                address: ip,
                outcome,
                cached: true,
            };
        }

        let outcome = self.query(ip).await;

        if let Some(cache) = &self.cache {
            cache.insert(ip, &outcome);
        }

        LookupResult {
            address: ip,
            outcome,
            cached: false,
        }
    }

    /// Listings for `ip`. Any query failure reads as "not listed".
    pub async fn lookup(&self, ip: Ipv4Addr) -> Vec<Listing> {
        self.check(ip).await.outcome.into_listings()
    }
}

/// Reverse the dot-separated labels of an address string.
pub fn reverse_dotted(address: &str) -> String {
    address.split('.').rev().collect::<Vec<_>>().join(".")
}
