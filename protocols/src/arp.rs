use std::net::{IpAddr, Ipv4Addr};

use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperation, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::util::MacAddr;

use crate::{ARP_LEN, ETH_HDR_LEN, MIN_ETH_FRAME_NO_FCS, NeighborReply, ethernet};

/// Broadcast "who-has `dst_addr`" request, padded to the Ethernet minimum.
pub fn create_request(src_mac: MacAddr, src_addr: Ipv4Addr, dst_addr: Ipv4Addr) -> anyhow::Result<Vec<u8>> {
    create_packet(
        ArpOperations::Request,
        (src_mac, src_addr),
        (MacAddr::broadcast(), MacAddr::zero(), dst_addr),
    )
}

/// Unicast "`src_addr` is-at `src_mac`" answer to `dst_addr`.
pub fn create_reply(
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    dst_mac: MacAddr,
    dst_addr: Ipv4Addr,
) -> anyhow::Result<Vec<u8>> {
    create_packet(ArpOperations::Reply, (src_mac, src_addr), (dst_mac, dst_mac, dst_addr))
}

fn create_packet(
    operation: ArpOperation,
    (src_mac, src_addr): (MacAddr, Ipv4Addr),
    (eth_dst, target_mac, target_addr): (MacAddr, MacAddr, Ipv4Addr),
) -> anyhow::Result<Vec<u8>> {
    let mut buffer = [0u8; MIN_ETH_FRAME_NO_FCS];
    ethernet::write_header(&mut buffer, src_mac, eth_dst, EtherTypes::Arp)?;
    let mut arp_packet = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .context("failed to create mutable ARP packet")?;
    arp_packet.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp_packet.set_protocol_type(EtherTypes::Ipv4);
    arp_packet.set_hw_addr_len(6);
    arp_packet.set_proto_addr_len(4);
    arp_packet.set_operation(operation);
    arp_packet.set_sender_hw_addr(src_mac);
    arp_packet.set_sender_proto_addr(src_addr);
    arp_packet.set_target_hw_addr(target_mac);
    arp_packet.set_target_proto_addr(target_addr);
    Ok(Vec::from(buffer))
}

/// Sender of an ARP reply. Requests and other operations yield `Ok(None)`.
pub fn parse_reply(ethernet_packet: &EthernetPacket) -> anyhow::Result<Option<NeighborReply>> {
    let arp_packet = ArpPacket::new(ethernet_packet.payload()).with_context(|| {
        format!(
            "truncated or invalid ARP packet (payload len {})",
            ethernet_packet.payload().len()
        )
    })?;
    if arp_packet.get_operation() != ArpOperations::Reply {
        return Ok(None);
    }
    Ok(Some(NeighborReply {
        ip: IpAddr::V4(arp_packet.get_sender_proto_addr()),
        mac: arp_packet.get_sender_hw_addr(),
    }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
