//! IPv4 address ranges and local range detection.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use ipnet::Ipv4Net;

use crate::error::{DiscoverError, Result};

/// Range scanned when the local address cannot be determined.
const FALLBACK_RANGE: &str = "192.168.1.0/24";

/// A contiguous block of IPv4 host addresses.
///
/// For prefixes shorter than /31 the network and broadcast addresses are
/// excluded from [`AddressRange::hosts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    net: Ipv4Net,
}

impl AddressRange {
    /// Parse a CIDR (`10.0.0.0/24`) or a bare address (treated as /32).
    ///
    /// Host bits are truncated. Ranges with more than `max_hosts` host
    /// addresses are rejected.
    pub fn parse(input: &str, max_hosts: usize) -> Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(DiscoverError::invalid_range(input, "empty range"));
        }

        let net = if raw.contains('/') {
            raw.parse::<Ipv4Net>()
                .map_err(|e| reject(input, raw, &e.to_string()))?
                .trunc()
        } else {
            let addr = raw
                .parse::<Ipv4Addr>()
                .map_err(|e| reject(input, raw, &e.to_string()))?;
            Ipv4Net::from(addr)
        };

        let range = Self { net };
        let count = range.host_count();
        if count > max_hosts as u64 {
            return Err(DiscoverError::invalid_range(
                input,
                format!("{count} hosts exceeds the limit of {max_hosts}"),
            ));
        }
        Ok(range)
    }

    pub fn network(&self) -> Ipv4Net {
        self.net
    }

    /// Every probe-worthy address in the range, in ascending order.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        self.net.hosts()
    }

    pub fn host_count(&self) -> u64 {
        let size = 1u64 << (32 - u32::from(self.net.prefix_len()));
        if self.net.prefix_len() < 31 {
            size - 2
        } else {
            size
        }
    }

    /// True if `addr` is one of [`AddressRange::hosts`].
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        if !self.net.contains(&addr) {
            return false;
        }
        self.net.prefix_len() >= 31 || (addr != self.net.network() && addr != self.net.broadcast())
    }

    /// The /24 around this machine's primary IPv4 address.
    pub fn local() -> Self {
        match local_ipv4() {
            Some(ip) => Self {
                net: Ipv4Net::new(ip, 24).map(|n| n.trunc()).unwrap_or_else(|_| fallback()),
            },
            None => {
                tracing::warn!(fallback = FALLBACK_RANGE, "Could not determine local address");
                Self { net: fallback() }
            }
        }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}

/// The source address the OS would use for outbound traffic.
///
/// Connecting a UDP socket only selects a route; no packet is sent.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

fn fallback() -> Ipv4Net {
    FALLBACK_RANGE
        .parse()
        .unwrap_or_else(|_| Ipv4Net::from(Ipv4Addr::new(192, 168, 1, 0)))
}

fn reject(input: &str, raw: &str, detail: &str) -> DiscoverError {
    let without_prefix = raw.split('/').next().unwrap_or(raw);
    if without_prefix.parse::<std::net::Ipv6Addr>().is_ok() {
        DiscoverError::invalid_range(input, "IPv6 ranges are not supported")
    } else {
        DiscoverError::invalid_range(input, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 65_536;

    #[test]
    fn test_parse_cidr() {
        let range = AddressRange::parse("192.168.1.0/24", LIMIT).unwrap();
        assert_eq!(range.host_count(), 254);
        assert_eq!(range.hosts().count(), 254);
        assert_eq!(range.hosts().next(), Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(range.hosts().last(), Some(Ipv4Addr::new(192, 168, 1, 254)));
    }

    #[test]
    fn test_parse_truncates_host_bits() {
        let range = AddressRange::parse("10.0.0.77/24", LIMIT).unwrap();
        assert_eq!(range.to_string(), "10.0.0.0/24");
    }

    #[test]
    fn test_slash_30_has_two_hosts() {
        let range = AddressRange::parse("10.0.0.0/30", LIMIT).unwrap();
        let hosts: Vec<_> = range.hosts().collect();
        assert_eq!(hosts, vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]);
        assert_eq!(range.host_count(), 2);
    }

    #[test]
    fn test_slash_31_and_32_keep_all_addresses() {
        let range = AddressRange::parse("10.0.0.0/31", LIMIT).unwrap();
        assert_eq!(range.hosts().count(), 2);
        assert_eq!(range.host_count(), 2);

        let single = AddressRange::parse("10.0.0.9", LIMIT).unwrap();
        assert_eq!(single.hosts().collect::<Vec<_>>(), vec![Ipv4Addr::new(10, 0, 0, 9)]);
        assert_eq!(single.host_count(), 1);
    }

    #[test]
    fn test_contains_excludes_network_and_broadcast() {
        let range = AddressRange::parse("10.0.0.0/24", LIMIT).unwrap();
        assert!(range.contains(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(!range.contains(Ipv4Addr::new(10, 0, 0, 0)));
        assert!(!range.contains(Ipv4Addr::new(10, 0, 0, 255)));
        assert!(!range.contains(Ipv4Addr::new(10, 0, 1, 1)));
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "not-a-range", "10.0.0.0/33", "300.1.1.1", "10.0.0/24"] {
            let err = AddressRange::parse(bad, LIMIT).unwrap_err();
            assert!(matches!(err, DiscoverError::InvalidRange { .. }), "{bad}");
        }
    }

    #[test]
    fn test_rejects_ipv6() {
        let err = AddressRange::parse("fe80::/64", LIMIT).unwrap_err();
        assert!(err.to_string().contains("IPv6"));
    }

    #[test]
    fn test_rejects_oversized() {
        assert!(AddressRange::parse("10.0.0.0/8", LIMIT).is_err());
        assert!(AddressRange::parse("10.0.0.0/16", LIMIT).is_ok());
        assert!(AddressRange::parse("10.0.0.0/24", 100).is_err());
    }

    #[test]
    fn test_local_range_is_slash_24() {
        let range = AddressRange::local();
        assert_eq!(range.network().prefix_len(), 24);
    }
}
