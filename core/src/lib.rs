//! The discovery engine: probe construction, transmission, capture and
//! their coordination over a single interface.

pub mod capture;
pub mod discovery;
pub mod network;
pub mod probe;
pub mod resolver;
pub mod sender;

pub use discovery::{
    DiscoveryObserver, DiscoveryReport, DiscoveryRequest, DiscoveryService, DiscoveryState, discover_hosts,
};
