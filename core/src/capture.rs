//! # Capture Listener
//!
//! The listener owns the capture for one run. It lives on a blocking
//! thread and talks to the coordinator through three one-shot channels:
//!
//! * **ready**: sent once the filtered capture is open, or carrying the
//!   error that prevented opening it. Probing must not start before this.
//! * **cancel**: tells the listener to stop. It is polled between reads,
//!   so shutdown takes at most one read timeout.
//! * **result**: the deduplicated hosts and the reply counter, handed over
//!   exactly once when the listener exits.
//!
//! Until that hand-off the collected hosts belong to the listener thread
//! alone.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use gscn_common::error::{DiscoveryError, SocketKind};
use gscn_common::network::host::DiscoveredHost;
use gscn_common::network::interface::InterfaceDescriptor;
use gscn_common::network::prefix::NetworkPrefix;
use gscn_common::network::target::ProbeTarget;
use gscn_protocols::ProbeProtocol;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, trace, warn};

use crate::network::transport::{NetworkBackend, PacketSource};
use crate::probe::protocol_for;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// Responders in first-seen order.
    pub hosts: Vec<DiscoveredHost>,
    /// Replies that passed the range and self checks, duplicates included.
    pub received: u64,
}

/// Turns captured frames into an ordered, deduplicated host list.
#[derive(Debug)]
pub struct ReplyCollector {
    protocol: ProbeProtocol,
    expected: NetworkPrefix,
    local_addr: IpAddr,
    seen: HashSet<IpAddr>,
    outcome: CaptureOutcome,
}

impl ReplyCollector {
    pub fn new(protocol: ProbeProtocol, expected: NetworkPrefix, local_addr: IpAddr) -> Self {
        Self {
            protocol,
            expected,
            local_addr,
            seen: HashSet::new(),
            outcome: CaptureOutcome::default(),
        }
    }

    /// Returns `true` when `frame` introduced a new host.
    pub fn process(&mut self, frame: &[u8]) -> bool {
        let reply = match self.protocol.parse_reply(frame) {
            Ok(Some(reply)) => reply,
            Ok(None) => return false,
            Err(e) => {
                trace!("dropping frame: {e:#}");
                return false;
            }
        };
        if !self.expected.contains(reply.ip) {
            trace!(ip = %reply.ip, "reply from outside the target range");
            return false;
        }
        if reply.ip == self.local_addr {
            return false;
        }

        self.outcome.received += 1;
        if !self.seen.insert(reply.ip) {
            return false;
        }

        debug!(ip = %reply.ip, mac = %reply.mac, "host discovered");
        self.outcome.hosts.push(DiscoveredHost::new(reply.ip, reply.mac));
        true
    }

    pub fn finish(self) -> CaptureOutcome {
        self.outcome
    }
}

pub struct CaptureListener {
    backend: Arc<dyn NetworkBackend>,
    interface: InterfaceDescriptor,
    read_timeout: Duration,
    collector: ReplyCollector,
}

impl CaptureListener {
    pub fn new(backend: Arc<dyn NetworkBackend>, target: &ProbeTarget, read_timeout: Duration) -> Self {
        Self {
            backend,
            interface: target.interface.clone(),
            read_timeout,
            collector: ReplyCollector::new(protocol_for(target.family), target.prefix, target.local_addr()),
        }
    }

    /// Spawns the listener and returns once its capture is armed.
    pub async fn start(self) -> Result<CaptureHandle, DiscoveryError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        let interface = self.interface.name.clone();

        tokio::task::spawn_blocking(move || self.run(ready_tx, cancel_rx, result_tx));

        match ready_rx.await {
            Ok(Ok(())) => Ok(CaptureHandle {
                interface,
                cancel_tx,
                result_rx,
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DiscoveryError::Socket {
                kind: SocketKind::Capture,
                interface,
                source: std::io::Error::other("capture task exited before it was ready"),
            }),
        }
    }

    fn run(
        mut self,
        ready: oneshot::Sender<Result<(), DiscoveryError>>,
        mut cancel: oneshot::Receiver<()>,
        result: oneshot::Sender<CaptureOutcome>,
    ) {
        let mut source: Box<dyn PacketSource> =
            match self.backend.open_source(&self.interface, self.collector.protocol, self.read_timeout) {
                Ok(source) => source,
                Err(source) => {
                    let _ = ready.send(Err(DiscoveryError::Socket {
                        kind: SocketKind::Capture,
                        interface: self.interface.name.clone(),
                        source,
                    }));
                    return;
                }
            };

        if ready.send(Ok(())).is_err() {
            return;
        }
        debug!(interface = %self.interface.name, "capture armed");

        while let Err(TryRecvError::Empty) = cancel.try_recv() {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    self.collector.process(frame);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(interface = %self.interface.name, "capture stopped early: {e}");
                    break;
                }
            }
        }

        drop(source);
        let _ = result.send(self.collector.finish());
    }
}

/// Coordinator side of a running [`CaptureListener`].
pub struct CaptureHandle {
    interface: String,
    cancel_tx: oneshot::Sender<()>,
    result_rx: oneshot::Receiver<CaptureOutcome>,
}

impl CaptureHandle {
    /// Cancels the capture and waits for its results. A listener that died
    /// before the hand-off is a capture failure, not an empty run.
    pub async fn finish(self) -> Result<CaptureOutcome, DiscoveryError> {
        let _ = self.cancel_tx.send(());
        self.result_rx.await.map_err(|_| DiscoveryError::Socket {
            kind: SocketKind::Capture,
            interface: self.interface,
            source: std::io::Error::other("capture task ended without handing over its results"),
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
