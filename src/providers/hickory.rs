//! Resolver backed by hickory-resolver.

use super::{LookupError, Resolver};
use crate::config::ResolverConfig;
use async_trait::async_trait;
use hickory_resolver::config::{
    NameServerConfigGroup, ResolverConfig as HickoryConfig, ResolverOpts,
};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{Name, RecordType};
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

const DNS_PORT: u16 = 53;

/// System or explicitly configured DNS resolver.
pub struct HickoryResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryResolver {
    /// Build a resolver that sends each query once, to one nameserver, bounded by `timeout`.
    pub fn new(config: &ResolverConfig, timeout: Duration) -> Self {
        let nameservers = config.nameserver_addrs();
        if nameservers.is_empty() {
            let (resolver_config, opts) = match hickory_resolver::system_conf::read_system_conf() {
                Ok(system) => system,
                Err(e) => {
                    warn!(error = %e, "Failed to read system resolver configuration, using defaults");
                    (HickoryConfig::default(), ResolverOpts::default())
                }
            };
            Self::build(resolver_config, opts, timeout)
        } else {
            debug!(nameservers = ?nameservers, "Using configured nameservers");
            Self::with_nameservers(&nameservers, DNS_PORT, timeout)
        }
    }

    fn with_nameservers(nameservers: &[IpAddr], port: u16, timeout: Duration) -> Self {
        let group = NameServerConfigGroup::from_ips_clear(nameservers, port, true);
        Self::build(
            HickoryConfig::from_parts(None, vec![], group),
            ResolverOpts::default(),
            timeout,
        )
    }

    fn build(resolver_config: HickoryConfig, opts: ResolverOpts, timeout: Duration) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(resolver_config, single_query_opts(opts, timeout)),
        }
    }
}

/// Pin options so each lookup is one datagram to one nameserver.
///
/// `attempts` counts retries after a failure, and `num_concurrent_reqs`
/// fans a query out to several nameservers at once.
fn single_query_opts(mut opts: ResolverOpts, timeout: Duration) -> ResolverOpts {
    opts.timeout = timeout;
    opts.attempts = 0;
    opts.num_concurrent_reqs = 1;
    opts
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn resolve(
        &self,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<String>, LookupError> {
        // Absolute name, so search domains never trigger extra queries
        let fqdn = Name::from_ascii(format!("{}.", name.trim_end_matches('.')))
            .map_err(|e| LookupError::InvalidName(e.to_string()))?;

        let lookup = self
            .resolver
            .lookup(fqdn, record_type)
            .await
            .map_err(map_resolve_error)?;

        Ok(lookup
            .iter()
            .filter(|rdata| rdata.record_type() == record_type)
            .map(|rdata| rdata.to_string())
            .collect())
    }
}

fn map_resolve_error(e: ResolveError) -> LookupError {
    match e.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            if *response_code == ResponseCode::NXDomain {
                LookupError::NxDomain
            } else {
                LookupError::InvalidResponse(format!("no records ({})", response_code))
            }
        }
        ResolveErrorKind::Timeout => LookupError::Timeout,
        _ => LookupError::Transport(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_resolver::proto::op::Query;
    use tokio::net::UdpSocket;

    #[test]
    fn test_map_timeout() {
        let err = ResolveError::from(ResolveErrorKind::Timeout);
        assert_eq!(map_resolve_error(err), LookupError::Timeout);
    }

    fn no_records(response_code: ResponseCode) -> ResolveError {
        let name = Name::from_ascii("1.100.51.198.zen.spamhaus.org.").unwrap();
        ResolveError::from(ResolveErrorKind::NoRecordsFound {
            query: Box::new(Query::query(name, RecordType::A)),
            soa: None,
            negative_ttl: None,
            response_code,
            trusted: true,
        })
    }

    #[test]
    fn test_map_nxdomain_is_not_listed() {
        let err = no_records(ResponseCode::NXDomain);
        assert_eq!(map_resolve_error(err), LookupError::NxDomain);
    }

    #[test]
    fn test_map_empty_noerror_is_invalid_response() {
        let err = no_records(ResponseCode::NoError);
        assert!(matches!(
            map_resolve_error(err),
            LookupError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_single_query_opts() {
        let mut defaults = ResolverOpts::default();
        defaults.attempts = 2;
        defaults.num_concurrent_reqs = 2;

        let opts = single_query_opts(defaults, Duration::from_millis(750));
        assert_eq!(opts.attempts, 0);
        assert_eq!(opts.num_concurrent_reqs, 1);
        assert_eq!(opts.timeout, Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_one_datagram_per_lookup() {
        // Silent nameserver: every lookup times out
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        let resolver = HickoryResolver::with_nameservers(&[ip], port, Duration::from_millis(200));
        let result = resolver
            .resolve("1.100.51.198.zen.spamhaus.org", RecordType::A)
            .await;
        assert!(result.is_err());

        let mut buf = [0u8; 512];
        let mut received = 0;
        while let Ok(Ok(_)) =
            tokio::time::timeout(Duration::from_millis(300), server.recv_from(&mut buf)).await
        {
            received += 1;
        }
        assert_eq!(received, 1);
    }

    #[test]
    fn test_map_other_errors() {
        let err = ResolveError::from("connection reset");
        assert!(matches!(map_resolve_error(err), LookupError::Transport(_)));
    }

    #[tokio::test]
    async fn test_build_with_nameservers() {
        let config = ResolverConfig {
            nameservers: vec!["127.0.0.1".to_string()],
        };
        let _resolver = HickoryResolver::new(&config, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_rejects_invalid_name() {
        let config = ResolverConfig {
            nameservers: vec!["127.0.0.1".to_string()],
        };
        let resolver = HickoryResolver::new(&config, Duration::from_millis(100));

        let label = "a".repeat(70);
        let result = resolver
            .resolve(&format!("{}.zen.spamhaus.org", label), RecordType::A)
            .await;
        assert!(matches!(result, Err(LookupError::InvalidName(_))));
    }
}
