//! An in-memory link layer for driving whole discovery runs.
//!
//! Frames handed to the transport are inspected like a switch would: ARP
//! requests and Neighbor Solicitations for a configured neighbor are answered
//! by pushing a reply onto the shared wire, which the capture side drains.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gscn_common::error::DiscoveryError;
use gscn_common::network::interface::InterfaceDescriptor;
use gscn_common::network::target::ProbeTarget;
use gscn_core::DiscoveryObserver;
use gscn_core::DiscoveryState;
use gscn_core::network::transport::{LinkLayerTransport, NetworkBackend, PacketSource};
use gscn_core::resolver::HostnameResolver;
use gscn_protocols::{ProbeProtocol, arp, ndp};
use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;
use pnet::packet::Packet;
use pnet::packet::arp::{ArpOperations, ArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::icmpv6::Icmpv6Types;
use pnet::packet::icmpv6::ndp::NeighborSolicitPacket;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::util::MacAddr;

const IFF_UP: u32 = 1;
const IFF_LOOPBACK: u32 = 1 << 3;
const IFF_RUNNING: u32 = 1 << 6;

pub const OWN_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0x01);
pub const OWN_V4: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
pub const OWN_V6: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 0x10);

pub fn v4(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
}

pub fn v6(last: u16) -> IpAddr {
    IpAddr::V6(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, last))
}

pub fn mac(tail: u8) -> MacAddr {
    MacAddr::new(0x02, 0xaa, 0, 0, 0, tail)
}

pub fn ethernet_interface() -> NetworkInterface {
    NetworkInterface {
        name: "eth0".to_string(),
        description: "Mock ethernet".to_string(),
        index: 2,
        mac: Some(OWN_MAC),
        ips: vec![
            IpNetwork::new(IpAddr::V4(OWN_V4), 24).unwrap(),
            IpNetwork::new(IpAddr::V6(OWN_V6), 120).unwrap(),
        ],
        flags: IFF_UP | IFF_RUNNING,
    }
}

pub fn loopback_interface() -> NetworkInterface {
    NetworkInterface {
        name: "lo".to_string(),
        description: "Mock loopback".to_string(),
        index: 1,
        mac: Some(MacAddr::zero()),
        ips: vec![IpNetwork::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8).unwrap()],
        flags: IFF_UP | IFF_RUNNING | IFF_LOOPBACK,
    }
}

/// Answer for an ARP request, addressed back to this host.
pub fn arp_reply(from: IpAddr, from_mac: MacAddr) -> Vec<u8> {
    let IpAddr::V4(from) = from else {
        panic!("ARP replies need an IPv4 sender");
    };
    arp::create_reply(from_mac, from, OWN_MAC, OWN_V4).unwrap()
}

pub fn neighbor_advert(from: IpAddr, from_mac: MacAddr) -> Vec<u8> {
    let IpAddr::V6(from) = from else {
        panic!("advertisements need an IPv6 target");
    };
    ndp::create_advertisement(from_mac, from, OWN_MAC, OWN_V6).unwrap()
}

type Wire = Arc<Mutex<VecDeque<Vec<u8>>>>;

#[derive(Default)]
pub struct MockNetwork {
    interfaces: Vec<NetworkInterface>,
    neighbors: HashMap<IpAddr, MacAddr>,
    wire: Wire,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    fail_capture: bool,
    fail_sends: usize,
    echo_twice: bool,
    sources_opened: AtomicUsize,
}

impl MockNetwork {
    pub fn new(interfaces: Vec<NetworkInterface>) -> Self {
        Self {
            interfaces,
            ..Self::default()
        }
    }

    pub fn with_neighbor(mut self, ip: IpAddr, mac: MacAddr) -> Self {
        self.neighbors.insert(ip, mac);
        self
    }

    /// Frames already on the wire when the capture opens.
    pub fn with_pending(self, frames: Vec<Vec<u8>>) -> Self {
        self.wire.lock().unwrap().extend(frames);
        self
    }

    /// Every neighbor answers each probe twice.
    pub fn answering_twice(mut self) -> Self {
        self.echo_twice = true;
        self
    }

    pub fn failing_capture(mut self) -> Self {
        self.fail_capture = true;
        self
    }

    /// The first `count` writes fail.
    pub fn failing_sends(mut self, count: usize) -> Self {
        self.fail_sends = count;
        self
    }

    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    /// Addresses probed, in transmission order.
    pub fn probed(&self) -> Vec<IpAddr> {
        self.sent_frames()
            .iter()
            .filter_map(|frame| probed_addr(frame))
            .collect()
    }

    pub fn sources_opened(&self) -> usize {
        self.sources_opened.load(Ordering::SeqCst)
    }
}

fn probed_addr(frame: &[u8]) -> Option<IpAddr> {
    let eth = EthernetPacket::new(frame)?;
    match eth.get_ethertype() {
        EtherTypes::Arp => {
            let arp = ArpPacket::new(eth.payload())?;
            (arp.get_operation() == ArpOperations::Request)
                .then(|| IpAddr::V4(arp.get_target_proto_addr()))
        }
        EtherTypes::Ipv6 => {
            let ip = Ipv6Packet::new(eth.payload())?;
            let ns = NeighborSolicitPacket::new(ip.payload())?;
            (ns.get_icmpv6_type() == Icmpv6Types::NeighborSolicit).then(|| IpAddr::V6(ns.get_target_addr()))
        }
        _ => None,
    }
}

impl NetworkBackend for MockNetwork {
    fn interfaces(&self) -> Vec<NetworkInterface> {
        self.interfaces.clone()
    }

    fn open_transport(&self, _intf: &InterfaceDescriptor) -> io::Result<Box<dyn LinkLayerTransport>> {
        Ok(Box::new(MockTransport {
            neighbors: self.neighbors.clone(),
            wire: Arc::clone(&self.wire),
            sent: Arc::clone(&self.sent),
            failures_left: self.fail_sends,
            echo_twice: self.echo_twice,
        }))
    }

    fn open_source(
        &self,
        _intf: &InterfaceDescriptor,
        protocol: ProbeProtocol,
        read_timeout: Duration,
    ) -> io::Result<Box<dyn PacketSource>> {
        if self.fail_capture {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "Operation not permitted"));
        }
        self.sources_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSource {
            protocol,
            wire: Arc::clone(&self.wire),
            current: Vec::new(),
            read_timeout,
        }))
    }
}

struct MockTransport {
    neighbors: HashMap<IpAddr, MacAddr>,
    wire: Wire,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    failures_left: usize,
    echo_twice: bool,
}

impl LinkLayerTransport for MockTransport {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(io::Error::new(io::ErrorKind::NetworkDown, "Network is down"));
        }
        self.sent.lock().unwrap().push(frame.to_vec());

        let Some(addr) = probed_addr(frame) else {
            return Ok(());
        };
        if let Some(&neighbor_mac) = self.neighbors.get(&addr) {
            let reply = match addr {
                IpAddr::V4(_) => arp_reply(addr, neighbor_mac),
                IpAddr::V6(_) => neighbor_advert(addr, neighbor_mac),
            };
            let mut wire = self.wire.lock().unwrap();
            if self.echo_twice {
                wire.push_back(reply.clone());
            }
            wire.push_back(reply);
        }
        Ok(())
    }
}

struct MockSource {
    protocol: ProbeProtocol,
    wire: Wire,
    current: Vec<u8>,
    read_timeout: Duration,
}

impl PacketSource for MockSource {
    fn next_frame(&mut self) -> io::Result<Option<&[u8]>> {
        let next = self.wire.lock().unwrap().pop_front();
        match next {
            Some(frame) if self.protocol.matches(&frame) => {
                self.current = frame;
                Ok(Some(&self.current))
            }
            Some(_) => Ok(None),
            None => {
                std::thread::sleep(self.read_timeout);
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    State(DiscoveryState),
    SendingStarted(u128),
    AddressDone(IpAddr),
    SendingFinished(u64),
    WaitStarted(Duration),
    WaitFinished,
    Resolving(usize),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl DiscoveryObserver for RecordingObserver {
    fn on_state(&self, state: DiscoveryState) {
        self.push(Event::State(state));
    }

    fn on_sending_started(&self, _target: &ProbeTarget, total: u128) {
        self.push(Event::SendingStarted(total));
    }

    fn on_address_done(&self, addr: IpAddr) {
        self.push(Event::AddressDone(addr));
    }

    fn on_sending_finished(&self, sent: u64) {
        self.push(Event::SendingFinished(sent));
    }

    fn on_wait_started(&self, timeout: Duration) {
        self.push(Event::WaitStarted(timeout));
    }

    fn on_wait_finished(&self) {
        self.push(Event::WaitFinished);
    }

    fn on_resolving(&self, count: usize) {
        self.push(Event::Resolving(count));
    }
}

#[derive(Default)]
pub struct MockResolver {
    names: HashMap<IpAddr, String>,
    failing: HashSet<IpAddr>,
}

impl MockResolver {
    pub fn with_name(mut self, addr: IpAddr, name: &str) -> Self {
        self.names.insert(addr, name.to_string());
        self
    }

    pub fn failing_for(mut self, addr: IpAddr) -> Self {
        self.failing.insert(addr);
        self
    }
}

#[async_trait]
impl HostnameResolver for MockResolver {
    async fn lookup(&self, addr: IpAddr) -> Result<Option<String>, DiscoveryError> {
        if self.failing.contains(&addr) {
            return Err(DiscoveryError::Lookup {
                addr,
                reason: "Temporary failure in name resolution".to_string(),
            });
        }
        Ok(self.names.get(&addr).cloned())
    }
}
