use std::io;
use std::net::IpAddr;

use thiserror::Error;

use crate::network::target::ProtocolFamily;

/// Everything a discovery run can fail with.
///
/// Only the configuration, interface and socket classes abort a run. The
/// remaining ones are reported per probe or per lookup and contained where
/// they happen.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No usable target or interface could be determined.
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    /// A raw socket or capture handle could not be created.
    #[error("failed to open {kind} on {interface}: {source}")]
    Socket {
        kind: SocketKind,
        interface: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to build probe for {target}: {reason}")]
    Serialization { target: IpAddr, reason: String },
    #[error("failed to send probe to {target}: {source}")]
    Transmit {
        target: IpAddr,
        #[source]
        source: io::Error,
    },
    #[error("reverse lookup for {addr} failed: {reason}")]
    Lookup { addr: IpAddr, reason: String },
}

impl DiscoveryError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Interface(_) | Self::Socket { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    Transport,
    Capture,
}

impl std::fmt::Display for SocketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "raw socket"),
            Self::Capture => write!(f, "capture"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterfaceError {
    /// No interface carries the requested name.
    #[error("no interface named {0}")]
    NotFound(String),
    /// No interface's own network contains the target address.
    #[error("no interface connected to that network ({0})")]
    NoRoute(IpAddr),
    #[error("cannot scan on a loopback interface ({0})")]
    Loopback(String),
    #[error("interface {0} is administratively down")]
    Down(String),
    #[error("interface {0} is not running")]
    NotRunning(String),
    #[error("interface {0} has no hardware address")]
    NoHardwareAddress(String),
    #[error("interface {name} has no {family} addresses")]
    MissingAddressFamily {
        name: String,
        family: ProtocolFamily,
    },
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
