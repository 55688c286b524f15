use std::net::IpAddr;

use pnet::util::MacAddr;

/// One responder found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredHost {
    pub ip: IpAddr,
    pub mac: MacAddr,
    pub hostname: Option<String>,
    /// Set for the probing interface itself, which is never probed.
    pub is_local: bool,
}

impl DiscoveredHost {
    pub fn new(ip: IpAddr, mac: MacAddr) -> Self {
        Self {
            ip,
            mac,
            hostname: None,
            is_local: false,
        }
    }

    pub fn local(ip: IpAddr, mac: MacAddr) -> Self {
        Self {
            is_local: true,
            ..Self::new(ip, mac)
        }
    }
}
