//! DNSBL network audit.
//!
//! Checks every host address of a list of IPv4 networks against a DNS
//! blocklist (Spamhaus ZEN by default) and reports what is listed.
//!
//! # Features
//!
//! - **Reason codes** - Map blocklist answer codes to list tags and reasons
//! - **Block detection** - Report a network once when all of its hosts share one listing
//! - **Rate limiting** - Strictly sequential queries with a fixed pause between them
//! - **Fail-open lookups** - Timeouts and resolver errors read as "not listed" and are counted
//! - **Caching** - Overlapping networks reuse earlier answers
//! - **Reports** - CSV or JSON output
//!
//! # Example Configuration
//!
//! ```yaml
//! settings:
//!   provider_name: "Spamhaus"
//!   zone: "zen.spamhaus.org"
//!   timeout_ms: 2000
//!   query_delay_ms: 250
//!
//! networks:
//!   path: "networks.txt"
//!
//! report:
//!   path: "dnsbl_report.csv"
//!   format: csv
//! ```

pub mod audit;
pub mod cache;
pub mod classify;
pub mod codes;
pub mod config;
pub mod networks;
pub mod providers;
pub mod report;

pub use audit::{AuditReport, Auditor};
pub use classify::{classify, ReportRow, Target};
pub use config::Config;
pub use providers::dnsbl::DnsblLookup;
pub use providers::hickory::HickoryResolver;
pub use providers::{Hit, Listing, LookupOutcome, Resolver};
