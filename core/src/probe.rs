use std::net::IpAddr;

use gscn_common::error::DiscoveryError;
use gscn_common::network::target::ProtocolFamily;
use gscn_protocols::{ProbeProtocol, arp, ndp};
use pnet::util::MacAddr;

pub fn protocol_for(family: ProtocolFamily) -> ProbeProtocol {
    match family {
        ProtocolFamily::V4 => ProbeProtocol::Arp,
        ProtocolFamily::V6 => ProbeProtocol::Ndp,
    }
}

/// Builds discovery requests from a fixed source identity.
#[derive(Debug, Clone, Copy)]
pub struct ProbeBuilder {
    src_mac: MacAddr,
    src_addr: IpAddr,
}

impl ProbeBuilder {
    pub fn new(src_mac: MacAddr, src_addr: IpAddr) -> Self {
        Self { src_mac, src_addr }
    }

    /// ARP request for IPv4 targets, Neighbor Solicitation for IPv6 ones.
    pub fn build(&self, target: IpAddr) -> Result<Vec<u8>, DiscoveryError> {
        let frame = match (self.src_addr, target) {
            (IpAddr::V4(src), IpAddr::V4(dst)) => arp::create_request(self.src_mac, src, dst),
            (IpAddr::V6(src), IpAddr::V6(dst)) => ndp::create_solicitation(self.src_mac, src, dst),
            (src, _) => {
                return Err(DiscoveryError::Serialization {
                    target,
                    reason: format!("source address {src} is of a different family"),
                });
            }
        };
        frame.map_err(|e| DiscoveryError::Serialization {
            target,
            reason: format!("{e:#}"),
        })
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
