//! ICMPv6 Neighbor Discovery (RFC 4861) solicitations and advertisements.

use std::net::{IpAddr, Ipv6Addr};

use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::icmpv6::ndp::{
    MutableNeighborAdvertPacket, MutableNeighborSolicitPacket, NdpOption, NdpOptionType,
    NdpOptionTypes, NeighborAdvertPacket,
};
use pnet::packet::icmpv6::{Icmpv6Code, Icmpv6Packet, Icmpv6Types, checksum};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv6::{Ipv6Packet, MutableIpv6Packet};
use pnet::util::MacAddr;

use crate::{ETH_HDR_LEN, IP_V6_HDR_LEN, NDP_MSG_LEN, NeighborReply, ethernet, mac_from_slice, mac_octets};

/// Neighbor Discovery packets are dropped by receivers unless sent with this hop limit.
const NDP_HOP_LIMIT: u8 = 255;
const ICMP_START: usize = ETH_HDR_LEN + IP_V6_HDR_LEN;
const FRAME_LEN: usize = ICMP_START + NDP_MSG_LEN;
/// Solicited + override.
const ADVERT_FLAGS: u8 = 0b0110_0000;
/// Type, code, checksum, flags and target address; options follow.
const ADVERT_BODY_LEN: usize = 24;

/// `ff02::1:ffXX:XXXX`, built from the low 24 bits of `target`.
pub fn solicited_node(target: Ipv6Addr) -> Ipv6Addr {
    let o = target.octets();
    Ipv6Addr::new(
        0xff02,
        0,
        0,
        0,
        0,
        1,
        0xff00 | u16::from(o[13]),
        u16::from(o[14]) << 8 | u16::from(o[15]),
    )
}

/// Ethernet group address of an IPv6 multicast address (`33:33` + low 32 bits).
pub fn multicast_mac(group: Ipv6Addr) -> MacAddr {
    let o = group.octets();
    MacAddr::new(0x33, 0x33, o[12], o[13], o[14], o[15])
}

/// Solicitation for `target`, sent to its solicited-node group and carrying
/// our hardware address as the source link-layer option.
pub fn create_solicitation(src_mac: MacAddr, src_addr: Ipv6Addr, target: Ipv6Addr) -> anyhow::Result<Vec<u8>> {
    let dst_addr = solicited_node(target);
    let mut pkt = [0u8; FRAME_LEN];
    ethernet::write_header(&mut pkt, src_mac, multicast_mac(dst_addr), EtherTypes::Ipv6)?;
    create_ipv6_header(&mut pkt, src_addr, dst_addr)?;

    let mut ns = MutableNeighborSolicitPacket::new(&mut pkt[ICMP_START..])
        .context("failed to create neighbor solicitation packet")?;
    ns.set_icmpv6_type(Icmpv6Types::NeighborSolicit);
    ns.set_icmpv6_code(Icmpv6Code(0));
    ns.set_reserved(0);
    ns.set_target_addr(target);
    ns.set_options(&[link_layer_option(NdpOptionTypes::SourceLLAddr, src_mac)]);

    ns.set_checksum(0);
    let ns_imm = ns.to_immutable();
    let icmp_pkt = Icmpv6Packet::new(ns_imm.packet()).context("failed to create ICMPv6 packet")?;
    let csm = checksum(&icmp_pkt, &src_addr, &dst_addr);
    ns.set_checksum(csm);
    Ok(Vec::from(pkt))
}

/// Solicited advertisement for `target` from `src_mac`, unicast back to the solicitor.
pub fn create_advertisement(
    src_mac: MacAddr,
    target: Ipv6Addr,
    dst_mac: MacAddr,
    dst_addr: Ipv6Addr,
) -> anyhow::Result<Vec<u8>> {
    let mut pkt = [0u8; FRAME_LEN];
    ethernet::write_header(&mut pkt, src_mac, dst_mac, EtherTypes::Ipv6)?;
    create_ipv6_header(&mut pkt, target, dst_addr)?;

    let mut na = MutableNeighborAdvertPacket::new(&mut pkt[ICMP_START..])
        .context("failed to create neighbor advertisement packet")?;
    na.set_icmpv6_type(Icmpv6Types::NeighborAdvert);
    na.set_icmpv6_code(Icmpv6Code(0));
    na.set_flags(ADVERT_FLAGS);
    na.set_reserved(0);
    na.set_target_addr(target);
    na.set_options(&[link_layer_option(NdpOptionTypes::TargetLLAddr, src_mac)]);

    na.set_checksum(0);
    let na_imm = na.to_immutable();
    let icmp_pkt = Icmpv6Packet::new(na_imm.packet()).context("failed to create ICMPv6 packet")?;
    let csm = checksum(&icmp_pkt, &target, &dst_addr);
    na.set_checksum(csm);
    Ok(Vec::from(pkt))
}

/// Target of a Neighbor Advertisement with its hardware address, taken from
/// the target link-layer option or, failing that, the Ethernet source.
pub fn parse_advertisement(eth_packet: &EthernetPacket) -> anyhow::Result<Option<NeighborReply>> {
    let ipv6_packet = Ipv6Packet::new(eth_packet.payload()).with_context(|| {
        format!(
            "truncated or invalid IPv6 packet (payload len {})",
            eth_packet.payload().len()
        )
    })?;
    if ipv6_packet.get_next_header() != IpNextHeaderProtocols::Icmpv6 {
        return Ok(None);
    }
    let icmp = Icmpv6Packet::new(ipv6_packet.payload()).context("truncated ICMPv6 message")?;
    if icmp.get_icmpv6_type() != Icmpv6Types::NeighborAdvert {
        return Ok(None);
    }
    let advert = NeighborAdvertPacket::new(ipv6_packet.payload())
        .context("truncated neighbor advertisement")?;

    let options = advert.packet().get(ADVERT_BODY_LEN..).unwrap_or_default();
    let mac = target_link_layer(options).unwrap_or_else(|| eth_packet.get_source());

    Ok(Some(NeighborReply {
        ip: IpAddr::V6(advert.get_target_addr()),
        mac,
    }))
}

/// Walks raw NDP options for a target link-layer address. Stops at the
/// first option whose length is zero or runs past the buffer.
fn target_link_layer(mut options: &[u8]) -> Option<MacAddr> {
    while let [kind, units, ..] = *options {
        let len = usize::from(units) * 8;
        if len == 0 || len > options.len() {
            return None;
        }
        if kind == NdpOptionTypes::TargetLLAddr.0 {
            if let Some(mac) = mac_from_slice(&options[2..len]) {
                return Some(mac);
            }
        }
        options = &options[len..];
    }
    None
}

fn create_ipv6_header(buf: &mut [u8], src_addr: Ipv6Addr, dst_addr: Ipv6Addr) -> anyhow::Result<()> {
    let mut pkt = MutableIpv6Packet::new(&mut buf[ETH_HDR_LEN..ICMP_START])
        .context("creating ipv6 packet")?;
    pkt.set_version(6);
    pkt.set_traffic_class(0);
    pkt.set_flow_label(rand::random::<u32>() & 0x000f_ffff);
    pkt.set_payload_length(NDP_MSG_LEN as u16);
    pkt.set_next_header(IpNextHeaderProtocols::Icmpv6);
    pkt.set_hop_limit(NDP_HOP_LIMIT);
    pkt.set_source(src_addr);
    pkt.set_destination(dst_addr);
    Ok(())
}

fn link_layer_option(option_type: NdpOptionType, mac: MacAddr) -> NdpOption {
    NdpOption {
        option_type,
        // In units of 8 octets: type, length and six address bytes.
        length: 1,
        data: mac_octets(mac),
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
