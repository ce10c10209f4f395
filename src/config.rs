//! Configuration types for the DNSBL audit.

use crate::codes::{ReasonTable, SPAMHAUS_ZEN};
use crate::providers::Listing;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for a DNSBL audit run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Blocklist and pacing settings.
    #[serde(default)]
    pub settings: Settings,

    /// Resolver configuration.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Lookup cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Input network list.
    #[serde(default)]
    pub networks: NetworksConfig,

    /// Report output.
    #[serde(default)]
    pub report: ReportConfig,

    /// Answer code to listing table.
    #[serde(default = "default_reason_codes")]
    pub reason_codes: Vec<ReasonCodeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            resolver: ResolverConfig::default(),
            cache: CacheConfig::default(),
            networks: NetworksConfig::default(),
            report: ReportConfig::default(),
            reason_codes: default_reason_codes(),
        }
    }
}

/// Blocklist and pacing settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Provider name, prefixed to every list label in the report.
    #[serde(default = "default_provider_name")]
    pub provider_name: String,

    /// DNSBL zone appended to reversed addresses.
    #[serde(default = "default_zone")]
    pub zone: String,

    /// Per-query timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Pause after every query sent, in milliseconds.
    #[serde(default = "default_query_delay")]
    pub query_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider_name: default_provider_name(),
            zone: default_zone(),
            timeout_ms: default_timeout(),
            query_delay_ms: default_query_delay(),
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn query_delay(&self) -> Duration {
        Duration::from_millis(self.query_delay_ms)
    }
}

fn default_provider_name() -> String {
    "Spamhaus".to_string()
}

fn default_zone() -> String {
    "zen.spamhaus.org".to_string()
}

fn default_timeout() -> u64 {
    2000
}

fn default_query_delay() -> u64 {
    250
}

/// Resolver configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Nameserver addresses. Empty uses the system configuration.
    #[serde(default)]
    pub nameservers: Vec<String>,
}

impl ResolverConfig {
    /// Parse nameserver entries into addresses.
    pub fn nameserver_addrs(&self) -> Vec<IpAddr> {
        self.nameservers
            .iter()
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }
}

/// Lookup cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Reuse answers for addresses seen earlier in the run.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache TTL in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,

    /// Maximum cached addresses.
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_cache_entries() -> usize {
    10000
}

/// Input network list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworksConfig {
    /// Path to the network list.
    #[serde(default = "default_networks_path")]
    pub path: PathBuf,

    /// File format.
    #[serde(default)]
    pub format: NetworksFormat,
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self {
            path: default_networks_path(),
            format: NetworksFormat::default(),
        }
    }
}

fn default_networks_path() -> PathBuf {
    PathBuf::from("networks.txt")
}

/// Network list file format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NetworksFormat {
    /// Plain text, one CIDR per line.
    #[default]
    Plain,
    /// CSV with the CIDR in the first column.
    Csv,
    /// JSON array of CIDR strings.
    Json,
}

/// Report output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Output path.
    #[serde(default = "default_report_path")]
    pub path: PathBuf,

    /// Output format.
    #[serde(default)]
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
            format: ReportFormat::default(),
        }
    }
}

fn default_report_path() -> PathBuf {
    PathBuf::from("dnsbl_report.csv")
}

/// Report output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

/// One entry of the reason code table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReasonCodeConfig {
    /// Answer address returned by the blocklist.
    pub code: String,
    /// Sub-list tag.
    pub tag: String,
    /// Reason reported for addresses with this code.
    pub description: String,
}

fn default_reason_codes() -> Vec<ReasonCodeConfig> {
    SPAMHAUS_ZEN
        .iter()
        .map(|(code, tag, description)| ReasonCodeConfig {
            code: Ipv4Addr::from(*code).to_string(),
            tag: tag.to_string(),
            description: description.to_string(),
        })
        .collect()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content)?;
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.settings.provider_name.trim().is_empty() {
            anyhow::bail!("provider_name must not be empty");
        }

        let zone = self.settings.zone.trim_matches('.');
        if zone.is_empty() || zone.split('.').any(|label| label.is_empty()) {
            anyhow::bail!("Invalid DNSBL zone: '{}'", self.settings.zone);
        }

        if self.settings.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than 0");
        }

        if self.cache.enabled && self.cache.max_entries == 0 {
            anyhow::bail!("cache max_entries must be greater than 0 when the cache is enabled");
        }

        for ns in &self.resolver.nameservers {
            if ns.trim().parse::<IpAddr>().is_err() {
                anyhow::bail!("Invalid nameserver address: {}", ns);
            }
        }

        if self.reason_codes.is_empty() {
            anyhow::bail!("reason_codes must contain at least one entry");
        }

        let mut seen = HashSet::new();
        for entry in &self.reason_codes {
            let code: Ipv4Addr = entry
                .code
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid reason code: {}", entry.code))?;

            if code.octets()[0] != 127 {
                anyhow::bail!("Reason code {} is outside 127.0.0.0/8", code);
            }

            if !seen.insert(code) {
                anyhow::bail!("Duplicate reason code: {}", code);
            }

            if entry.tag.trim().is_empty() {
                anyhow::bail!("Reason code {} has an empty tag", code);
            }
        }

        Ok(())
    }

    /// Build the reason code lookup table.
    ///
    /// Entries that do not parse are skipped; `validate` rejects them first.
    pub fn reason_table(&self) -> ReasonTable {
        ReasonTable::new(self.reason_codes.iter().filter_map(|entry| {
            let code: Ipv4Addr = entry.code.trim().parse().ok()?;
            Some((code, Listing::new(&entry.tag, &entry.description)))
        }))
    }

    /// Generate example configuration YAML.
    pub fn example() -> String {
        r#"# DNSBL Audit Configuration

settings:
  provider_name: "Spamhaus"    # Prefix of the "list" column
  zone: "zen.spamhaus.org"
  timeout_ms: 2000             # Per-query timeout, no retries
  query_delay_ms: 250          # Pause after each query (rate limit)

# Resolver (optional)
resolver:
  nameservers: []              # Empty = system resolver configuration

# Lookup cache for overlapping networks
cache:
  enabled: true
  ttl_seconds: 3600
  max_entries: 10000

# Networks to audit
networks:
  path: "networks.txt"
  format: plain                # plain, csv, or json

# Report output
report:
  path: "dnsbl_report.csv"
  format: csv                  # csv or json

# Answer codes (defaults to the Spamhaus ZEN table when omitted)
reason_codes:
  - { code: "127.0.0.2", tag: "SBL", description: "Direct spam sources" }
  - { code: "127.0.0.3", tag: "SBL-CSS", description: "Snowshoe spam" }
  - { code: "127.0.0.4", tag: "XBL", description: "Infected system" }
  - { code: "127.0.0.5", tag: "XBL", description: "Infected system" }
  - { code: "127.0.0.6", tag: "XBL", description: "Infected system" }
  - { code: "127.0.0.7", tag: "XBL", description: "Infected system" }
  - { code: "127.0.0.10", tag: "PBL", description: "Policy block list" }
  - { code: "127.0.0.11", tag: "PBL", description: "Policy block list" }
"#
        .to_string()
    }
}

/// Expand environment variables in the format ${VAR_NAME}.
fn expand_env_vars(content: &str) -> anyhow::Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")?;
    let expanded = re.replace_all(content, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_default()
    });
    Ok(expanded.into_owned())
}
