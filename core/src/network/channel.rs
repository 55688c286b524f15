use std::io;
use std::time::Duration;

use gscn_common::network::interface::InterfaceDescriptor;
use gscn_protocols::ProbeProtocol;
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use tracing::debug;

use crate::network::transport::{LinkLayerTransport, NetworkBackend, PacketSource};

pub type ChannelOpener = fn(&NetworkInterface, Config) -> io::Result<Channel>;

/// [`NetworkBackend`] over `pnet` datalink channels.
///
/// Transport and capture each get their own channel, so the sending side
/// never competes with the capture for received frames.
pub struct PnetBackend {
    opener: ChannelOpener,
}

impl Default for PnetBackend {
    fn default() -> Self {
        Self {
            opener: datalink::channel,
        }
    }
}

impl PnetBackend {
    pub fn with_opener(opener: ChannelOpener) -> Self {
        Self { opener }
    }
}

impl NetworkBackend for PnetBackend {
    fn interfaces(&self) -> Vec<NetworkInterface> {
        datalink::interfaces()
    }

    fn open_transport(&self, intf: &InterfaceDescriptor) -> io::Result<Box<dyn LinkLayerTransport>> {
        let (tx, _rx) = open_eth_channel(&NetworkInterface::from(intf), &Config::default(), self.opener)?;
        Ok(Box::new(EthernetTransport { tx }))
    }

    fn open_source(
        &self,
        intf: &InterfaceDescriptor,
        protocol: ProbeProtocol,
        read_timeout: Duration,
    ) -> io::Result<Box<dyn PacketSource>> {
        let (_tx, rx) = open_eth_channel(&NetworkInterface::from(intf), &get_config(read_timeout), self.opener)?;
        Ok(Box::new(EthernetSource { rx, protocol }))
    }
}

pub struct EthernetTransport {
    tx: Box<dyn DataLinkSender>,
}

impl LinkLayerTransport for EthernetTransport {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.tx.send_to(frame, None).unwrap_or_else(|| {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "link-layer send not supported by this channel",
            ))
        })
    }
}

/// Receiver side of a channel with the protocol filter applied in userspace.
pub struct EthernetSource {
    rx: Box<dyn DataLinkReceiver>,
    protocol: ProbeProtocol,
}

impl PacketSource for EthernetSource {
    fn next_frame(&mut self) -> io::Result<Option<&[u8]>> {
        let protocol = self.protocol;
        match self.rx.next() {
            Ok(frame) => Ok(protocol.matches(frame).then_some(frame)),
            Err(e) if is_read_timeout(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn is_read_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

fn open_eth_channel(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: ChannelOpener,
) -> io::Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)> {
    match channel_opener(intf, *cfg)? {
        Channel::Ethernet(tx, rx) => {
            debug!(interface = %intf.name, "datalink channel opened");
            Ok((tx, rx))
        }
        _ => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("non-ethernet channel for {}", intf.name),
        )),
    }
}

fn get_config(read_timeout: Duration) -> Config {
    Config {
        read_timeout: Some(read_timeout),
        promiscuous: false,
        ..Default::default()
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
