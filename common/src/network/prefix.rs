//! # Network Prefixes
//!
//! A [`NetworkPrefix`] is an address plus a prefix length, backed by
//! [`IpNetwork`]. Its masked form identifies the block, and [`AddressRange`]
//! walks every address inside it without materializing the block, so a `/8`
//! costs no more memory than a `/30`.

use std::fmt;
use std::iter::FusedIterator;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use pnet::ipnetwork::{IpNetwork, IpNetworkError, Ipv4Network, Ipv6Network};
use thiserror::Error;

use crate::network::target::ProtocolFamily;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrefixError {
    #[error("invalid prefix length in '{0}'")]
    InvalidLength(String),
    #[error("'{input}' is not a valid address or CIDR block: {reason}")]
    Malformed { input: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkPrefix {
    net: IpNetwork,
}

impl NetworkPrefix {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, PrefixError> {
        IpNetwork::new(addr, prefix)
            .map(|net| Self { net })
            .map_err(|_| PrefixError::InvalidLength(format!("{addr}/{prefix}")))
    }

    /// A prefix covering exactly one address (`/32` or `/128`).
    pub fn host(addr: IpAddr) -> Self {
        Self {
            net: IpNetwork::from(addr),
        }
    }

    pub fn addr(&self) -> IpAddr {
        self.net.ip()
    }

    pub fn prefix_len(&self) -> u8 {
        self.net.prefix()
    }

    pub fn family(&self) -> ProtocolFamily {
        ProtocolFamily::of(&self.net.ip())
    }

    pub fn network(&self) -> IpNetwork {
        self.net
    }

    /// The same prefix with all host bits cleared.
    pub fn masked(&self) -> Self {
        IpNetwork::new(self.net.network(), self.net.prefix())
            .map(|net| Self { net })
            .unwrap_or(*self)
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.net.contains(ip)
    }

    /// Number of addresses in the block. Saturates at `u128::MAX` for `::/0`.
    pub fn size(&self) -> u128 {
        let host_bits = u32::from(self.family().bits() - self.prefix_len());
        1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
    }

    /// Every address from the network address up to the broadcast (or last)
    /// address, in ascending order.
    pub fn iter(&self) -> AddressRange {
        AddressRange {
            family: self.family(),
            next: Some(to_bits(self.net.network())),
            last: to_bits(self.net.broadcast()),
        }
    }
}

impl From<IpNetwork> for NetworkPrefix {
    fn from(net: IpNetwork) -> Self {
        Self { net }
    }
}

impl FromStr for NetworkPrefix {
    type Err = PrefixError;

    /// Accepts `addr/len` as well as a bare address, which becomes a host prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let parsed = if input.contains(':') {
            input.parse::<Ipv6Network>().map(IpNetwork::V6)
        } else {
            input.parse::<Ipv4Network>().map(IpNetwork::V4)
        };
        parsed.map(|net| Self { net }).map_err(|e| match e {
            IpNetworkError::InvalidPrefix => PrefixError::InvalidLength(input.to_string()),
            other => PrefixError::Malformed {
                input: input.to_string(),
                reason: other.to_string(),
            },
        })
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}

/// Lazy, ascending walk over a contiguous block of addresses.
#[derive(Debug, Clone)]
pub struct AddressRange {
    family: ProtocolFamily,
    next: Option<u128>,
    last: u128,
}

impl Iterator for AddressRange {
    type Item = IpAddr;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = (current < self.last).then(|| current + 1);
        Some(from_bits(self.family, current))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let Some(current) = self.next else {
            return (0, Some(0));
        };
        match usize::try_from(self.last - current)
            .ok()
            .and_then(|n| n.checked_add(1))
        {
            Some(remaining) => (remaining, Some(remaining)),
            None => (usize::MAX, None),
        }
    }
}

impl FusedIterator for AddressRange {}

fn to_bits(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

fn from_bits(family: ProtocolFamily, bits: u128) -> IpAddr {
    match family {
        ProtocolFamily::V4 => IpAddr::V4(Ipv4Addr::from(bits as u32)),
        ProtocolFamily::V6 => IpAddr::V6(Ipv6Addr::from(bits)),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
