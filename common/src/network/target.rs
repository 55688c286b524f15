//! # Probe Targets
//!
//! A [`ProbeTarget`] is everything one discovery run needs to know about
//! *where* it probes: the block, the interface and the interface address
//! used as the probe source. It is built once per run and never mutated.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use pnet::ipnetwork::IpNetwork;

use crate::error::DiscoveryError;
use crate::network::interface::InterfaceDescriptor;
use crate::network::prefix::NetworkPrefix;

/// The address family probed in a run. IPv4 uses ARP, IPv6 uses Neighbor Discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolFamily {
    #[default]
    V4,
    V6,
}

impl ProtocolFamily {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    pub fn matches(&self, addr: &IpAddr) -> bool {
        Self::of(addr) == *self
    }

    pub fn bits(&self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }

    /// Name of the discovery protocol used for this family.
    pub fn protocol_name(&self) -> &'static str {
        match self {
            Self::V4 => "ARP",
            Self::V6 => "NDP",
        }
    }
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub prefix: NetworkPrefix,
    pub interface: InterfaceDescriptor,
    /// Interface address the probes are sent from.
    pub local: IpNetwork,
    pub family: ProtocolFamily,
    pub timeout: Duration,
}

impl ProbeTarget {
    pub fn local_addr(&self) -> IpAddr {
        self.local.ip()
    }

    /// Whether the probing interface's own address lies inside the target block.
    pub fn includes_local(&self) -> bool {
        self.prefix.contains(self.local.ip())
    }
}

/// Rejects targets whose family does not match the requested protocol.
pub fn ensure_family(prefix: &NetworkPrefix, family: ProtocolFamily) -> Result<(), DiscoveryError> {
    match (family, prefix.family()) {
        (ProtocolFamily::V6, ProtocolFamily::V4) => Err(DiscoveryError::Configuration(
            "the given IP address is not IPv6".to_string(),
        )),
        (ProtocolFamily::V4, ProtocolFamily::V6) => Err(DiscoveryError::Configuration(
            "arp can only be used with IPv4 addresses".to_string(),
        )),
        _ => Ok(()),
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
