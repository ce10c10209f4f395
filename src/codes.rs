//! Blocklist reason code table.

use crate::providers::Listing;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Static mapping from DNSBL answer codes to listings.
#[derive(Debug, Clone)]
pub struct ReasonTable {
    codes: HashMap<Ipv4Addr, Listing>,
}

impl ReasonTable {
    /// Build a table from `(code, tag, description)` entries.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Ipv4Addr, Listing)>,
    {
        Self {
            codes: entries.into_iter().collect(),
        }
    }

    /// Spamhaus ZEN return codes.
    pub fn spamhaus_zen() -> Self {
        Self::new(SPAMHAUS_ZEN.iter().map(|(code, tag, description)| {
            (
                Ipv4Addr::from(*code),
                Listing::new(*tag, *description),
            )
        }))
    }

    /// Look up an answer literal. Anything that is not a known code yields `None`.
    pub fn get(&self, answer: &str) -> Option<&Listing> {
        let code: Ipv4Addr = answer.trim().parse().ok()?;
        self.codes.get(&code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for ReasonTable {
    fn default() -> Self {
        Self::spamhaus_zen()
    }
}

pub(crate) const SPAMHAUS_ZEN: [([u8; 4], &str, &str); 8] = [
    ([127, 0, 0, 2], "SBL", "Direct spam sources"),
    ([127, 0, 0, 3], "SBL-CSS", "Snowshoe spam"),
    ([127, 0, 0, 4], "XBL", "Infected system"),
    ([127, 0, 0, 5], "XBL", "Infected system"),
    ([127, 0, 0, 6], "XBL", "Infected system"),
    ([127, 0, 0, 7], "XBL", "Infected system"),
    ([127, 0, 0, 10], "PBL", "Policy block list"),
    ([127, 0, 0, 11], "PBL", "Policy block list"),
];

/// Whether an answer is one of Spamhaus' error return codes (127.255.255.0/24).
///
/// These are sent instead of a listing when the query is refused, for example
/// because it came through a public resolver or exceeded the free-use limit.
pub fn is_refusal_code(answer: &str) -> bool {
    match answer.trim().parse::<Ipv4Addr>() {
        Ok(ip) => {
            let o = ip.octets();
            o[0] == 127 && o[1] == 255 && o[2] == 255
        }
        Err(_) => false,
    }
}
