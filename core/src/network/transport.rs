//! # Link-Layer Capabilities
//!
//! The engine never opens sockets itself. Probes go out through a
//! [`LinkLayerTransport`], replies come back through a [`PacketSource`], and
//! both are handed out by a [`NetworkBackend`] together with the system's
//! interface list. [`PnetBackend`](crate::network::channel::PnetBackend) is
//! the production implementation; tests plug in an in-memory network.

use std::io;
use std::time::Duration;

use gscn_common::network::interface::InterfaceDescriptor;
use gscn_protocols::ProbeProtocol;
use pnet::datalink::NetworkInterface;

/// A raw socket able to put complete Ethernet frames on the wire.
pub trait LinkLayerTransport: Send {
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// A live capture filtered to one probe protocol.
pub trait PacketSource: Send {
    /// Waits at most one read timeout for the next frame passing the filter.
    ///
    /// `Ok(None)` means nothing usable arrived in time. The caller is expected
    /// to check for cancellation and poll again.
    fn next_frame(&mut self) -> io::Result<Option<&[u8]>>;
}

pub trait NetworkBackend: Send + Sync {
    fn interfaces(&self) -> Vec<NetworkInterface>;

    fn open_transport(&self, intf: &InterfaceDescriptor) -> io::Result<Box<dyn LinkLayerTransport>>;

    fn open_source(
        &self,
        intf: &InterfaceDescriptor,
        protocol: ProbeProtocol,
        read_timeout: Duration,
    ) -> io::Result<Box<dyn PacketSource>>;
}
