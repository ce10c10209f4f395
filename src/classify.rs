//! Network classification: whole-network or per-address report rows.

use crate::providers::Hit;
use chrono::NaiveDateTime;
use ipnet::Ipv4Net;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::net::Ipv4Addr;

/// Details text for a network reported as a single unit.
pub const ENTIRE_NETWORK_LISTED: &str = "Entire network listed";

/// Timestamp format used in reports (local time, seconds resolution).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// What a report row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Address(Ipv4Addr),
    Network(Ipv4Net),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Address(ip) => write!(f, "{}", ip),
            Target::Network(net) => write!(f, "{}", net),
        }
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One line of the audit report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    pub target: Target,
    /// Provider name followed by the list tag, e.g. "Spamhaus SBL".
    #[serde(rename = "list")]
    pub list_label: String,
    pub details: String,
}

impl ReportRow {
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn is_network(&self) -> bool {
        matches!(self.target, Target::Network(_))
    }
}

fn serialize_timestamp<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

/// Number of host addresses excluding network and broadcast.
///
/// `None` for /31 and /32, which have no reserved addresses; such networks
/// are never reported as a unit.
pub fn usable_hosts(network: &Ipv4Net) -> Option<u64> {
    let prefix = network.prefix_len();
    if prefix > 30 {
        return None;
    }
    Some((1u64 << (32 - prefix)) - 2)
}

/// Decide how the hits of one network are reported.
///
/// A single network row is produced only when every usable address is hit,
/// the hit count equals the usable-address count and all hits carry the same
/// tag. Otherwise every hit becomes its own row, in the order given.
pub fn classify(
    network: &Ipv4Net,
    hits: &[Hit],
    provider: &str,
    timestamp: NaiveDateTime,
) -> Vec<ReportRow> {
    if hits.is_empty() {
        return Vec::new();
    }

    let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
    for hit in hits {
        *tally.entry(hit.tag()).or_insert(0) += 1;
    }

    if let Some(tag) = uniform_tag(network, hits, &tally) {
        return vec![ReportRow {
            timestamp,
            target: Target::Network(*network),
            list_label: list_label(provider, tag),
            details: ENTIRE_NETWORK_LISTED.to_string(),
        }];
    }

    hits.iter()
        .map(|hit| ReportRow {
            timestamp,
            target: Target::Address(hit.address),
            list_label: list_label(provider, hit.tag()),
            details: hit.description().to_string(),
        })
        .collect()
}

fn uniform_tag<'a>(
    network: &Ipv4Net,
    hits: &[Hit],
    tally: &BTreeMap<&'a str, usize>,
) -> Option<&'a str> {
    let usable = usable_hosts(network)?;

    if tally.len() != 1 || hits.len() as u64 != usable {
        return None;
    }

    let covered: HashSet<Ipv4Addr> = hits.iter().map(|h| h.address).collect();
    if covered.len() as u64 != usable {
        return None;
    }

    tally.keys().next().copied()
}

fn list_label(provider: &str, tag: &str) -> String {
    format!("{} {}", provider, tag)
}
