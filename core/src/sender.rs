use std::net::IpAddr;

use gscn_common::error::DiscoveryError;
use tracing::warn;

use crate::network::transport::LinkLayerTransport;

/// Owns the raw send socket for one run and counts what actually left it.
pub struct Transmitter {
    transport: Box<dyn LinkLayerTransport>,
    sent: u64,
}

impl Transmitter {
    pub fn new(transport: Box<dyn LinkLayerTransport>) -> Self {
        Self { transport, sent: 0 }
    }

    /// Fire-and-forget write. A failed send is logged and never retried.
    pub fn send(&mut self, target: IpAddr, frame: &[u8]) -> bool {
        match self.transport.send(frame) {
            Ok(()) => {
                self.sent += 1;
                true
            }
            Err(source) => {
                warn!("{}", DiscoveryError::Transmit { target, source });
                false
            }
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
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
