//! # Interface Resolution
//!
//! Picks the interface a run probes from and the interface address the
//! probes carry as their source. Everything here works on a slice of
//! [`NetworkInterface`] handed in by the caller, so resolution is a pure
//! function of the system snapshot and easy to test.

use std::net::IpAddr;

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;
use pnet::util::MacAddr;
use tracing::debug;

use crate::error::InterfaceError;
use crate::network::target::ProtocolFamily;

/// Snapshot of an interface taken once at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub index: u32,
    pub mac: Option<MacAddr>,
    pub ips: Vec<IpNetwork>,
    /// Raw OS flags, kept so the descriptor converts back losslessly.
    pub flags: u32,
    pub up: bool,
    pub running: bool,
    pub loopback: bool,
}

impl InterfaceDescriptor {
    pub fn is_up(&self) -> bool {
        self.up
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_loopback(&self) -> bool {
        self.loopback
    }

    pub fn hardware_addr(&self) -> Result<MacAddr, InterfaceError> {
        self.mac
            .ok_or_else(|| InterfaceError::NoHardwareAddress(self.name.clone()))
    }

    /// First assigned network of the given family, used when only an
    /// interface and no explicit target was requested.
    pub fn first_network(&self, family: ProtocolFamily) -> Option<IpNetwork> {
        self.ips
            .iter()
            .find(|net| family.matches(&net.ip()))
            .copied()
    }
}

impl From<&NetworkInterface> for InterfaceDescriptor {
    fn from(intf: &NetworkInterface) -> Self {
        Self {
            name: intf.name.clone(),
            index: intf.index,
            mac: intf.mac,
            ips: intf.ips.clone(),
            flags: intf.flags,
            up: intf.is_up(),
            running: is_running(intf),
            loopback: intf.is_loopback(),
        }
    }
}

#[cfg(unix)]
fn is_running(intf: &NetworkInterface) -> bool {
    intf.is_running()
}

#[cfg(not(unix))]
fn is_running(intf: &NetworkInterface) -> bool {
    intf.is_up()
}

impl From<&InterfaceDescriptor> for NetworkInterface {
    fn from(desc: &InterfaceDescriptor) -> Self {
        NetworkInterface {
            name: desc.name.clone(),
            description: String::new(),
            index: desc.index,
            mac: desc.mac,
            ips: desc.ips.clone(),
            flags: desc.flags,
        }
    }
}

/// First interface whose own network contains `target`.
pub fn resolve_by_target(
    interfaces: &[NetworkInterface],
    target: IpAddr,
) -> Result<InterfaceDescriptor, InterfaceError> {
    let idx = find_local_index(interfaces, target).ok_or(InterfaceError::NoRoute(target))?;
    debug!(interface = %interfaces[idx].name, %target, "interface selected by target");
    Ok(InterfaceDescriptor::from(&interfaces[idx]))
}

pub fn resolve_by_name(
    interfaces: &[NetworkInterface],
    name: &str,
) -> Result<InterfaceDescriptor, InterfaceError> {
    interfaces
        .iter()
        .find(|intf| intf.name == name)
        .map(InterfaceDescriptor::from)
        .ok_or_else(|| InterfaceError::NotFound(name.to_string()))
}

/// Only up, running, non-loopback interfaces with a hardware address can
/// put link-layer probes on the wire.
pub fn validate(intf: &InterfaceDescriptor) -> Result<(), InterfaceError> {
    if intf.is_loopback() {
        return Err(InterfaceError::Loopback(intf.name.clone()));
    }
    if !intf.is_up() {
        return Err(InterfaceError::Down(intf.name.clone()));
    }
    if !intf.is_running() {
        return Err(InterfaceError::NotRunning(intf.name.clone()));
    }
    intf.hardware_addr()?;
    Ok(())
}

/// The interface address whose network contains `target`, else the first
/// address of the target's family.
pub fn select_address_for_target(
    intf: &InterfaceDescriptor,
    target: IpAddr,
) -> Result<IpNetwork, InterfaceError> {
    let family = ProtocolFamily::of(&target);
    intf.ips
        .iter()
        .find(|net| family.matches(&net.ip()) && net.contains(target))
        .copied()
        .or_else(|| intf.first_network(family))
        .ok_or_else(|| InterfaceError::MissingAddressFamily {
            name: intf.name.clone(),
            family,
        })
}

fn find_local_index(interfaces: &[NetworkInterface], target: IpAddr) -> Option<usize> {
    interfaces.iter().position(|iface| {
        iface.ips.iter().any(|ip_net| match (target, ip_net.ip()) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                ip_net.contains(target)
            }
            _ => false,
        })
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
