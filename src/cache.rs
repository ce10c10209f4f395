//! TTL-based cache for DNSBL lookups.
//!
//! Networks in one run may overlap; cached answers keep each address to a
//! single query against the blocklist.

use crate::providers::LookupOutcome;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Cached lookup outcome.
#[derive(Debug, Clone)]
pub struct CachedLookup {
    /// Outcome of the query that filled this entry. Never `Failed`.
    pub outcome: LookupOutcome,
    /// When this entry was cached.
    pub cached_at: Instant,
    /// TTL for this entry.
    pub ttl: Duration,
}

impl CachedLookup {
    /// Check if this cache entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Thread-safe TTL cache of lookup outcomes.
pub struct LookupCache {
    cache: RwLock<HashMap<Ipv4Addr, CachedLookup>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl LookupCache {
    /// Create a new lookup cache.
    pub fn new(default_ttl_seconds: u64, max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_seconds),
            max_entries,
        }
    }

    /// Get a cached outcome if available and not expired.
    pub fn get(&self, ip: &Ipv4Addr) -> Option<LookupOutcome> {
        let cache = self.cache.read().ok()?;
        let entry = cache.get(ip)?;

        if entry.is_expired() {
            None
        } else {
            Some(entry.outcome.clone())
        }
    }

    /// Store an outcome. Failed lookups are not cached.
    pub fn insert(&self, ip: Ipv4Addr, outcome: &LookupOutcome) {
        self.insert_with_ttl(ip, outcome, self.default_ttl);
    }

    /// Store an outcome with a custom TTL.
    pub fn insert_with_ttl(&self, ip: Ipv4Addr, outcome: &LookupOutcome, ttl: Duration) {
        if outcome.is_failed() || self.max_entries == 0 {
            return;
        }

        let entry = CachedLookup {
            outcome: outcome.clone(),
            cached_at: Instant::now(),
            ttl,
        };

        if let Ok(mut cache) = self.cache.write() {
            if cache.len() >= self.max_entries && !cache.contains_key(&ip) {
                evict_expired_entries(&mut cache);

                // Still full: drop the oldest entry
                if cache.len() >= self.max_entries {
                    if let Some(oldest_ip) = cache
                        .iter()
                        .min_by_key(|(_, v)| v.cached_at)
                        .map(|(k, _)| *k)
                    {
                        cache.remove(&oldest_ip);
                    }
                }
            }

            cache.insert(ip, entry);
        }
    }

    /// Remove expired entries from the cache.
    pub fn cleanup(&self) {
        if let Ok(mut cache) = self.cache.write() {
            evict_expired_entries(&mut cache);
        }
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }
}

fn evict_expired_entries(cache: &mut HashMap<Ipv4Addr, CachedLookup>) {
    cache.retain(|_, v| !v.is_expired());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Listing, LookupError};
    use std::thread;

    fn listed() -> LookupOutcome {
        LookupOutcome::Listed(vec![Listing::new("SBL", "Direct spam sources")])
    }

    #[test]
    fn test_cache_insert_and_get() {
        let cache = LookupCache::new(3600, 1000);
        let ip: Ipv4Addr = "198.51.100.1".parse().unwrap();

        cache.insert(ip, &listed());

        assert_eq!(cache.get(&ip), Some(listed()));
    }

    #[test]
    fn test_cache_not_listed() {
        let cache = LookupCache::new(3600, 1000);
        let ip: Ipv4Addr = "198.51.100.2".parse().unwrap();

        cache.insert(ip, &LookupOutcome::NotListed);
        assert_eq!(cache.get(&ip), Some(LookupOutcome::NotListed));
    }

    #[test]
    fn test_cache_miss() {
        let cache = LookupCache::new(3600, 1000);
        let ip: Ipv4Addr = "198.51.100.1".parse().unwrap();

        assert!(cache.get(&ip).is_none());
    }

    #[test]
    fn test_failures_not_cached() {
        let cache = LookupCache::new(3600, 1000);
        let ip: Ipv4Addr = "198.51.100.1".parse().unwrap();

        cache.insert(ip, &LookupOutcome::Failed(LookupError::Timeout));
        assert!(cache.get(&ip).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_expiration() {
        let cache = LookupCache::new(0, 1000);
        let ip: Ipv4Addr = "198.51.100.1".parse().unwrap();

        cache.insert(ip, &listed());

        thread::sleep(Duration::from_millis(10));
        assert!(cache.get(&ip).is_none());
    }

    #[test]
    fn test_cache_custom_ttl() {
        let cache = LookupCache::new(3600, 1000);
        let ip: Ipv4Addr = "198.51.100.1".parse().unwrap();

        cache.insert_with_ttl(ip, &listed(), Duration::from_millis(1));

        thread::sleep(Duration::from_millis(10));
        assert!(cache.get(&ip).is_none());
    }

    #[test]
    fn test_cache_max_entries() {
        let cache = LookupCache::new(3600, 2);

        let ip1: Ipv4Addr = "198.51.100.1".parse().unwrap();
        let ip2: Ipv4Addr = "198.51.100.2".parse().unwrap();
        let ip3: Ipv4Addr = "198.51.100.3".parse().unwrap();

        cache.insert(ip1, &listed());
        thread::sleep(Duration::from_millis(1));
        cache.insert(ip2, &LookupOutcome::NotListed);
        thread::sleep(Duration::from_millis(1));
        cache.insert(ip3, &listed());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&ip1).is_none());
        assert!(cache.get(&ip3).is_some());
    }

    #[test]
    fn test_cache_cleanup() {
        let cache = LookupCache::new(0, 1000);

        cache.insert("198.51.100.1".parse().unwrap(), &listed());
        cache.insert("198.51.100.2".parse().unwrap(), &LookupOutcome::NotListed);

        thread::sleep(Duration::from_millis(10));
        cache.cleanup();

        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cache_clear() {
        let cache = LookupCache::new(3600, 1000);

        cache.insert("198.51.100.1".parse().unwrap(), &listed());
        cache.insert("198.51.100.2".parse().unwrap(), &listed());
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
