//! Network list loading.

use crate::config::NetworksFormat;
use anyhow::Context;
use ipnet::{IpNet, Ipv4Net};
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load the networks to audit from a file.
///
/// Input order is preserved; duplicates and entries that cannot be audited
/// are skipped with a warning.
pub fn load_networks(path: &Path, format: NetworksFormat) -> anyhow::Result<Vec<Ipv4Net>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read network list {}", path.display()))?;

    let networks = parse_networks(&content, format)?;

    info!(
        path = %path.display(),
        networks = networks.len(),
        "Network list loaded"
    );

    Ok(networks)
}

/// Parse a network list in the given format.
pub fn parse_networks(content: &str, format: NetworksFormat) -> anyhow::Result<Vec<Ipv4Net>> {
    let entries: Vec<String> = match format {
        NetworksFormat::Plain => plain_entries(content),
        NetworksFormat::Csv => csv_entries(content)?,
        NetworksFormat::Json => json_entries(content)?,
    };

    let mut seen = HashSet::new();
    let networks = entries
        .iter()
        .filter_map(|entry| parse_entry(entry))
        .filter(|net| {
            let fresh = seen.insert(*net);
            if !fresh {
                debug!(network = %net, "Skipping duplicate network");
            }
            fresh
        })
        .collect();

    Ok(networks)
}

/// One CIDR or address per line.
fn plain_entries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// First column of each record. Quoted fields may contain commas.
fn csv_entries(content: &str) -> anyhow::Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to parse CSV network list")?;
        if let Some(column) = record.get(0).filter(|column| !column.is_empty()) {
            entries.push(column.to_string());
        }
    }

    Ok(entries)
}

/// JSON array of strings.
fn json_entries(content: &str) -> anyhow::Result<Vec<String>> {
    let entries: Vec<String> =
        serde_json::from_str(content).context("Invalid JSON network list")?;
    Ok(entries.into_iter().map(|e| e.trim().to_string()).collect())
}

/// Parse a single entry into an IPv4 network.
fn parse_entry(s: &str) -> Option<Ipv4Net> {
    if let Ok(ip) = s.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => Ipv4Net::new(v4, 32).ok(),
            IpAddr::V6(_) => {
                warn!(entry = %s, "Skipping IPv6 address");
                None
            }
        };
    }

    match s.parse::<IpNet>() {
        Ok(IpNet::V4(net)) => {
            let trunc = net.trunc();
            if trunc != net {
                warn!(entry = %s, network = %trunc, "Host bits set, using network address");
            }
            Some(trunc)
        }
        Ok(IpNet::V6(_)) => {
            warn!(entry = %s, "Skipping IPv6 network");
            None
        }
        Err(_) => {
            warn!(entry = %s, "Skipping invalid network entry");
            None
        }
    }
}
