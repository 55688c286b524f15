use anyhow::Context;
use pnet::packet::ethernet::{EtherType, MutableEthernetPacket};
use pnet::util::MacAddr;

/// Fills in the 14-byte Ethernet header at the start of `frame`.
pub fn write_header(frame: &mut [u8], src_mac: MacAddr, dst_mac: MacAddr, ethertype: EtherType) -> anyhow::Result<()> {
    let len = frame.len();
    let mut header = MutableEthernetPacket::new(frame)
        .with_context(|| format!("frame too short for an Ethernet header (len {len})"))?;
    header.set_destination(dst_mac);
    header.set_source(src_mac);
    header.set_ethertype(ethertype);
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
