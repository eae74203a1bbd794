//! Source-address predicate for filter activation
//!
//! The `source` parameter restricts the hint filter to clients connecting
//! from a given IPv4 address. Up to three trailing octets may be the
//! wildcard `%`, which widens the match to a /24, /16 or /8 prefix.

use crate::config::ConfigError;
use std::net::Ipv4Addr;
use tracing::info;

/// A configured source address with its derived prefix length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHost {
    /// The parameter as configured, for diagnostics
    address: String,
    /// Configured address with wildcard octets zeroed
    base: Ipv4Addr,
    /// 32, 24, 16 or 8
    netmask: u8,
}

impl SourceHost {
    /// Parse a `source` parameter.
    ///
    /// Accepts a dotted IPv4 address where trailing octets may be `%`.
    /// A bare `%`, a leading wildcard, or non-trailing wildcards are
    /// rejected: they would match everything or nothing useful.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidSource(input.to_string());

        if input.is_empty() || input.starts_with('%') || input.starts_with('.') || input.len() > 15
        {
            return Err(invalid());
        }
        if !input
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '%')
        {
            return Err(invalid());
        }

        let octets: Vec<&str> = input.split('.').collect();
        if octets.len() != 4 {
            return Err(invalid());
        }

        let mut parsed = [0u8; 4];
        let mut wildcards = 0u8;
        for (i, part) in octets.iter().enumerate() {
            if *part == "%" {
                wildcards += 1;
                parsed[i] = 0;
            } else {
                if wildcards > 0 {
                    // Wildcards must be a trailing run
                    return Err(invalid());
                }
                parsed[i] = part.parse::<u8>().map_err(|_| invalid())?;
            }
        }

        let netmask = 32 - 8 * wildcards;
        let host = SourceHost {
            address: input.to_string(),
            base: Ipv4Addr::from(parsed),
            netmask,
        };
        info!("Source '{}' is valid with netmask {}", input, netmask);
        Ok(host)
    }

    /// The parameter as configured
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub const fn netmask(&self) -> u8 {
        self.netmask
    }

    /// Whether a client address falls inside the configured prefix
    #[must_use]
    pub fn matches(&self, client: Ipv4Addr) -> bool {
        if self.netmask == 32 {
            return client == self.base;
        }
        let mask = u32::MAX << (32 - u32::from(self.netmask));
        u32::from(client) & mask == u32::from(self.base) & mask
    }
}
