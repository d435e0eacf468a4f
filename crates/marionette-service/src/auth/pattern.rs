//! Allow/deny patterns and the ordered access list built from them.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use ipnetwork::{IpNetwork, Ipv4Network};

use crate::error::AclError;

/// A single pattern from an `allow` or `deny` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `*`
    Everyone,
    /// A fully qualified host name, stored lowercase.
    Name(String),
    /// `*.example.com`, stored as the lowercase suffix without the wildcard.
    Domain(String),
    /// A single address.
    Ip(IpAddr),
    /// A CIDR network, or an IPv4 octet wildcard such as `192.168.*`.
    Network(IpNetwork),
}

impl Pattern {
    /// ## Summary
    /// Returns whether the requester is covered by this pattern.
    ///
    /// Name patterns are compared against the identity, address patterns
    /// against the requester address.
    #[must_use]
    pub fn matches(&self, identity: &str, address: IpAddr) -> bool {
        match self {
            Self::Everyone => true,
            Self::Name(name) => identity.eq_ignore_ascii_case(name),
            Self::Domain(suffix) => {
                let identity = identity.to_ascii_lowercase();
                identity == *suffix
                    || identity
                        .strip_suffix(suffix.as_str())
                        .is_some_and(|head| head.ends_with('.'))
            }
            Self::Ip(ip) => *ip == address,
            Self::Network(network) => network.contains(address),
        }
    }

    /// Higher values are evaluated first.
    #[must_use]
    pub fn specificity(&self) -> u32 {
        match self {
            Self::Everyone => 0,
            Self::Domain(suffix) => 50 + u32::try_from(suffix.split('.').count()).unwrap_or(0),
            Self::Network(network) => 100 + u32::from(network.prefix()),
            Self::Name(_) | Self::Ip(_) => 300,
        }
    }
}

fn is_host_name(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

/// `10.*`, `172.16.*` or `192.168.0.*` as a network.
fn octet_wildcard(value: &str) -> Option<IpNetwork> {
    let prefix = value.strip_suffix(".*")?;
    let octets = prefix
        .split('.')
        .map(str::parse::<u8>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    if octets.is_empty() || octets.len() > 3 {
        return None;
    }

    let mut address = [0_u8; 4];
    address[..octets.len()].copy_from_slice(&octets);
    let prefix_len = u8::try_from(octets.len() * 8).ok()?;
    Ipv4Network::new(Ipv4Addr::from(address), prefix_len)
        .ok()
        .map(IpNetwork::V4)
}

impl FromStr for Pattern {
    type Err = AclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let invalid = || AclError::InvalidPattern(value.to_string());

        if value == "*" {
            return Ok(Self::Everyone);
        }
        if let Some(domain) = value.strip_prefix("*.") {
            return if is_host_name(domain) {
                Ok(Self::Domain(domain.to_ascii_lowercase()))
            } else {
                Err(invalid())
            };
        }
        if value.contains('/') {
            return value
                .parse::<IpNetwork>()
                .map(Self::Network)
                .map_err(|_err| invalid());
        }
        if let Ok(ip) = value.parse::<IpAddr>() {
            return Ok(Self::Ip(ip));
        }
        if value.ends_with(".*") {
            return octet_wildcard(value).map(Self::Network).ok_or_else(invalid);
        }
        if is_host_name(value) {
            return Ok(Self::Name(value.to_ascii_lowercase()));
        }

        Err(invalid())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEntry {
    pub access: Access,
    pub pattern: Pattern,
}

/// Ordered allow/deny entries of one right.
///
/// Entries stay sorted by descending specificity, deny first on ties; the
/// first matching entry decides and an empty list denies everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList {
    entries: Vec<AccessEntry>,
}

impl AccessList {
    /// ## Errors
    /// Returns `InvalidPattern` if any comma-separated pattern is malformed.
    pub fn allow(&mut self, patterns: &str) -> Result<(), AclError> {
        self.push(Access::Allow, patterns)
    }

    /// ## Errors
    /// Returns `InvalidPattern` if any comma-separated pattern is malformed.
    pub fn deny(&mut self, patterns: &str) -> Result<(), AclError> {
        self.push(Access::Deny, patterns)
    }

    fn push(&mut self, access: Access, patterns: &str) -> Result<(), AclError> {
        let parsed = patterns
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Pattern::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if parsed.is_empty() {
            return Err(AclError::InvalidPattern(patterns.to_string()));
        }

        self.entries.extend(
            parsed
                .into_iter()
                .map(|pattern| AccessEntry { access, pattern }),
        );
        self.entries.sort_by(|a, b| {
            b.pattern
                .specificity()
                .cmp(&a.pattern.specificity())
                .then_with(|| deny_first(a.access).cmp(&deny_first(b.access)))
        });
        Ok(())
    }

    #[must_use]
    pub fn is_allowed(&self, identity: &str, address: IpAddr) -> bool {
        let decision = self
            .entries
            .iter()
            .find(|entry| entry.pattern.matches(identity, address));

        tracing::trace!(
            identity,
            %address,
            matched = ?decision.map(|entry| &entry.pattern),
            "Evaluated access list"
        );

        decision.is_some_and(|entry| entry.access == Access::Allow)
    }

    #[must_use]
    pub fn entries(&self) -> &[AccessEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const fn deny_first(access: Access) -> u8 {
    match access {
        Access::Deny => 0,
        Access::Allow => 1,
    }
}
