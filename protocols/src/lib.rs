//! Wire codecs for the neighbor discovery probes `gscn` sends and the
//! replies it listens for: ARP over Ethernet for IPv4 and ICMPv6
//! Neighbor Discovery for IPv6.

pub mod arp;
pub mod ethernet;
pub mod ndp;

use std::net::IpAddr;

use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::util::MacAddr;
use tracing::trace;

pub const MIN_ETH_FRAME_NO_FCS: usize = 60;
pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;
pub const IP_V6_HDR_LEN: usize = 40;
/// Solicitation/advertisement body plus one 8-byte link-layer address option.
pub const NDP_MSG_LEN: usize = 32;

/// An address-to-hardware binding announced by a neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborReply {
    pub ip: IpAddr,
    pub mac: MacAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeProtocol {
    Arp,
    Ndp,
}

impl ProbeProtocol {
    /// Cheap header check used as the capture filter.
    pub fn matches(&self, frame: &[u8]) -> bool {
        let Some(eth) = EthernetPacket::new(frame) else {
            return false;
        };
        match self {
            Self::Arp => eth.get_ethertype() == EtherTypes::Arp,
            Self::Ndp => {
                eth.get_ethertype() == EtherTypes::Ipv6
                    && Ipv6Packet::new(eth.payload())
                        .is_some_and(|ip| ip.get_next_header() == IpNextHeaderProtocols::Icmpv6)
            }
        }
    }

    /// Extracts the responder of an ARP reply or Neighbor Advertisement.
    ///
    /// `Ok(None)` means the frame is well formed but not a reply of this protocol.
    pub fn parse_reply(&self, frame: &[u8]) -> anyhow::Result<Option<NeighborReply>> {
        let eth = EthernetPacket::new(frame)
            .with_context(|| format!("truncated Ethernet frame (len {})", frame.len()))?;
        let ethertype = eth.get_ethertype();
        if *self == Self::Arp && ethertype == EtherTypes::Arp {
            arp::parse_reply(&eth)
        } else if *self == Self::Ndp && ethertype == EtherTypes::Ipv6 {
            ndp::parse_advertisement(&eth)
        } else {
            trace!(?ethertype, protocol = ?self, "frame of another protocol");
            Ok(None)
        }
    }
}

pub(crate) fn mac_from_slice(data: &[u8]) -> Option<MacAddr> {
    match data {
        [a, b, c, d, e, f, ..] => Some(MacAddr::new(*a, *b, *c, *d, *e, *f)),
        _ => None,
    }
}

pub(crate) fn mac_octets(mac: MacAddr) -> Vec<u8> {
    vec![mac.0, mac.1, mac.2, mac.3, mac.4, mac.5]
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
