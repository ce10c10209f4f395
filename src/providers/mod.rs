//! DNSBL lookup providers.

pub mod dnsbl;
pub mod hickory;

use async_trait::async_trait;
use hickory_resolver::proto::rr::RecordType;
use std::net::Ipv4Addr;

/// A single recognized blocklist reason for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Sub-list tag (e.g. "SBL", "XBL").
    pub tag: String,
    /// Human readable reason.
    pub description: String,
}

impl Listing {
    pub fn new(tag: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            description: description.into(),
        }
    }
}

/// A listing observed for one address of a scanned network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub address: Ipv4Addr,
    pub listing: Listing,
}

impl Hit {
    pub fn new(address: Ipv4Addr, listing: Listing) -> Self {
        Self { address, listing }
    }

    pub fn tag(&self) -> &str {
        &self.listing.tag
    }

    pub fn description(&self) -> &str {
        &self.listing.description
    }
}

/// Outcome of a single DNSBL check.
///
/// Failures are kept distinct here so they can be counted and logged; callers
/// that only need the report use [`LookupOutcome::into_listings`], which
/// treats a failure exactly like an unlisted address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// At least one recognized reason code was returned.
    Listed(Vec<Listing>),
    /// No record, or only unrecognized codes.
    NotListed,
    /// The query did not produce a usable answer.
    Failed(LookupError),
}

impl LookupOutcome {
    pub fn is_listed(&self) -> bool {
        matches!(self, LookupOutcome::Listed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LookupOutcome::Failed(_))
    }

    /// Collapse the outcome into the listings it carries.
    pub fn into_listings(self) -> Vec<Listing> {
        match self {
            LookupOutcome::Listed(listings) => listings,
            LookupOutcome::NotListed | LookupOutcome::Failed(_) => Vec::new(),
        }
    }
}

/// Error from a resolver query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The name does not exist (address not listed).
    NxDomain,
    /// The query exceeded the per-query timeout.
    Timeout,
    /// The blocklist refused to answer (e.g. query via a public resolver).
    Refused(String),
    /// The query name could not be built.
    InvalidName(String),
    /// The response could not be used.
    InvalidResponse(String),
    /// Network or resolver failure.
    Transport(String),
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::NxDomain => write!(f, "No such domain"),
            LookupError::Timeout => write!(f, "Query timed out"),
            LookupError::Refused(code) => write!(f, "Query refused by blocklist: {}", code),
            LookupError::InvalidName(msg) => write!(f, "Invalid query name: {}", msg),
            LookupError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            LookupError::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for LookupError {}

/// Name resolution capability used by the DNSBL lookup.
///
/// Returns the literal text of every record in the answer, in answer order.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, name: &str, record_type: RecordType)
        -> Result<Vec<String>, LookupError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory resolver answering from a fixed table.
    ///
    /// Names missing from the table answer with NXDOMAIN.
    #[derive(Default)]
    pub struct FakeResolver {
        answers: Mutex<HashMap<String, Result<Vec<String>, LookupError>>>,
        queries: Mutex<Vec<String>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl FakeResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_delay(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        pub fn answer(self, name: &str, codes: &[&str]) -> Self {
            self.answers.lock().unwrap().insert(
                name.to_string(),
                Ok(codes.iter().map(|c| c.to_string()).collect()),
            );
            self
        }

        pub fn fail(self, name: &str, error: LookupError) -> Self {
            self.answers
                .lock()
                .unwrap()
                .insert(name.to_string(), Err(error));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Resolver for FakeResolver {
        async fn resolve(
            &self,
            name: &str,
            record_type: RecordType,
        ) -> Result<Vec<String>, LookupError> {
            assert_eq!(record_type, RecordType::A);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(name.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.answers
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .unwrap_or(Err(LookupError::NxDomain))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_into_listings() {
        let listed = LookupOutcome::Listed(vec![Listing::new("SBL", "Direct spam sources")]);
        assert!(listed.is_listed());
        assert_eq!(listed.into_listings().len(), 1);

        assert!(LookupOutcome::NotListed.into_listings().is_empty());

        let failed = LookupOutcome::Failed(LookupError::Timeout);
        assert!(failed.is_failed());
        assert!(!failed.is_listed());
        assert!(failed.into_listings().is_empty());
    }

    #[test]
    fn test_hit_accessors() {
        let hit = Hit::new(
            "198.51.100.1".parse().unwrap(),
            Listing::new("XBL", "Infected system"),
        );
        assert_eq!(hit.tag(), "XBL");
        assert_eq!(hit.description(), "Infected system");
    }

    #[test]
    fn test_lookup_error_display() {
        assert_eq!(LookupError::Timeout.to_string(), "Query timed out");
        assert_eq!(
            LookupError::Refused("127.255.255.254".to_string()).to_string(),
            "Query refused by blocklist: 127.255.255.254"
        );
    }
}
