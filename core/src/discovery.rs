//! # Discovery Service
//!
//! Runs one discovery from a request to a finished report:
//!
//! 1. **Resolving**: pick and validate the interface, choose the source address.
//! 2. **CaptureStarting**: arm the [`CaptureListener`] and wait until it is ready.
//! 3. **Sending**: one probe per address of the target block, own address skipped.
//! 4. **WaitingForTimeout**: a single sleep for late replies.
//! 5. **Draining**: cancel the capture and take over its results.
//! 6. **Enriching**: optional reverse DNS under its own budget.
//!
//! Failures before sending starts abort the run. After that, problems with
//! single probes or lookups are logged and the run carries on.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use gscn_common::config::Config;
use gscn_common::error::{DiscoveryError, InterfaceError, SocketKind};
use gscn_common::network::host::DiscoveredHost;
use gscn_common::network::interface;
use gscn_common::network::prefix::NetworkPrefix;
use gscn_common::network::target::{self, ProbeTarget};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info, warn};

use crate::capture::{CaptureListener, CaptureOutcome};
use crate::network::channel::PnetBackend;
use crate::network::transport::NetworkBackend;
use crate::probe::ProbeBuilder;
use crate::resolver::{self, HostnameResolver, SystemResolver};
use crate::sender::Transmitter;

/// Ranges above this size get a warning before probing starts.
const LARGE_RANGE: u128 = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Idle,
    Resolving,
    CaptureStarting,
    Sending,
    WaitingForTimeout,
    Draining,
    Enriching,
    Done,
    Failed,
}

impl fmt::Display for DiscoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::CaptureStarting => "capture-starting",
            Self::Sending => "sending",
            Self::WaitingForTimeout => "waiting-for-timeout",
            Self::Draining => "draining",
            Self::Enriching => "enriching",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryRequest {
    /// Block to probe. Without one, the interface's own network is used.
    pub target: Option<NetworkPrefix>,
    pub interface: Option<String>,
    pub config: Config,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Responders in first-seen order, the probing interface last if it is in range.
    pub hosts: Vec<DiscoveredHost>,
    pub packets_sent: u64,
    pub packets_received: u64,
}

/// Progress hooks for frontends. None of them can influence the run.
#[allow(unused_variables)]
pub trait DiscoveryObserver: Send + Sync {
    fn on_state(&self, state: DiscoveryState) {}
    fn on_sending_started(&self, target: &ProbeTarget, total: u128) {}
    fn on_address_done(&self, addr: IpAddr) {}
    fn on_sending_finished(&self, sent: u64) {}
    fn on_wait_started(&self, timeout: Duration) {}
    fn on_wait_finished(&self) {}
    fn on_resolving(&self, count: usize) {}
}

struct SilentObserver;

impl DiscoveryObserver for SilentObserver {}

pub struct DiscoveryService {
    backend: Arc<dyn NetworkBackend>,
    resolver: Arc<dyn HostnameResolver>,
    observer: Arc<dyn DiscoveryObserver>,
}

impl DiscoveryService {
    pub fn new(backend: Arc<dyn NetworkBackend>, resolver: Arc<dyn HostnameResolver>) -> Self {
        Self {
            backend,
            resolver,
            observer: Arc::new(SilentObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DiscoveryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn run(&self, request: &DiscoveryRequest) -> Result<DiscoveryReport, DiscoveryError> {
        self.enter(DiscoveryState::Idle);
        match self.execute(request).await {
            Ok(report) => {
                self.enter(DiscoveryState::Done);
                Ok(report)
            }
            Err(e) => {
                debug!(error = %e, "discovery aborted");
                self.enter(DiscoveryState::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&self, request: &DiscoveryRequest) -> Result<DiscoveryReport, DiscoveryError> {
        self.enter(DiscoveryState::Resolving);
        let target = self.resolve(request)?;
        let mac = target.interface.hardware_addr()?;
        let builder = ProbeBuilder::new(mac, target.local_addr());
        let transport = self
            .backend
            .open_transport(&target.interface)
            .map_err(|source| DiscoveryError::Socket {
                kind: SocketKind::Transport,
                interface: target.interface.name.clone(),
                source,
            })?;
        let mut transmitter = Transmitter::new(transport);

        self.enter(DiscoveryState::CaptureStarting);
        let capture = CaptureListener::new(Arc::clone(&self.backend), &target, request.config.read_timeout)
            .start()
            .await?;

        self.enter(DiscoveryState::Sending);
        off_reactor(|| self.send_probes(&target, &builder, &mut transmitter));

        self.enter(DiscoveryState::WaitingForTimeout);
        self.wait(target.timeout).await;

        self.enter(DiscoveryState::Draining);
        let CaptureOutcome { mut hosts, received } = capture.finish().await?;
        if target.includes_local() {
            hosts.push(DiscoveredHost::local(target.local_addr(), mac));
        }

        if request.config.reverse_lookup && !hosts.is_empty() {
            self.enter(DiscoveryState::Enriching);
            self.observer.on_resolving(hosts.len());
            resolver::resolve_hostnames(&mut hosts, Arc::clone(&self.resolver), request.config.lookup_budget())
                .await;
        }

        info!(
            hosts = hosts.len(),
            sent = transmitter.sent(),
            received,
            "discovery finished on {}",
            target.interface.name
        );
        Ok(DiscoveryReport {
            hosts,
            packets_sent: transmitter.sent(),
            packets_received: received,
        })
    }

    fn resolve(&self, request: &DiscoveryRequest) -> Result<ProbeTarget, DiscoveryError> {
        let family = request.config.family;
        if let Some(prefix) = &request.target {
            target::ensure_family(prefix, family)?;
        }

        let interfaces = self.backend.interfaces();
        let (intf, prefix) = match (request.target, request.interface.as_deref()) {
            (Some(prefix), Some(name)) => (interface::resolve_by_name(&interfaces, name)?, prefix),
            (Some(prefix), None) => (interface::resolve_by_target(&interfaces, prefix.addr())?, prefix),
            (None, Some(name)) => {
                let intf = interface::resolve_by_name(&interfaces, name)?;
                let net = intf
                    .first_network(family)
                    .ok_or_else(|| InterfaceError::MissingAddressFamily {
                        name: intf.name.clone(),
                        family,
                    })?;
                (intf, NetworkPrefix::from(net))
            }
            (None, None) => {
                return Err(DiscoveryError::Configuration(
                    "could not determine which interface to use".to_string(),
                ));
            }
        };

        interface::validate(&intf)?;
        let local = interface::select_address_for_target(&intf, prefix.addr())?;
        debug!(interface = %intf.name, %prefix, source = %local.ip(), "target resolved");

        Ok(ProbeTarget {
            prefix,
            interface: intf,
            local,
            family,
            timeout: request.config.response_timeout(),
        })
    }

    fn send_probes(&self, target: &ProbeTarget, builder: &ProbeBuilder, transmitter: &mut Transmitter) {
        let total = target.prefix.size();
        if total > LARGE_RANGE {
            warn!("Probing {total} addresses in {}, this will take a while", target.prefix.masked());
        }
        self.observer.on_sending_started(target, total);

        let local = target.local_addr();
        for addr in target.prefix.iter() {
            if addr != local {
                match builder.build(addr) {
                    Ok(frame) => {
                        transmitter.send(addr, &frame);
                    }
                    Err(e) => warn!("{e}"),
                }
            }
            self.observer.on_address_done(addr);
        }

        self.observer.on_sending_finished(transmitter.sent());
    }

    async fn wait(&self, timeout: Duration) {
        if timeout.is_zero() {
            return;
        }
        self.observer.on_wait_started(timeout);
        tokio::time::sleep(timeout).await;
        self.observer.on_wait_finished();
    }

    fn enter(&self, state: DiscoveryState) {
        debug!(%state, "discovery state");
        self.observer.on_state(state);
    }
}

/// Runs blocking link-layer writes without stalling the other tasks on this
/// worker. A current-thread runtime has nowhere to move them, so they run inline.
fn off_reactor<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => tokio::task::block_in_place(f),
        _ => f(),
    }
}

/// Discovers hosts through the system's datalink layer and resolver,
/// reporting progress to `observer`.
pub async fn discover_hosts(
    target: Option<NetworkPrefix>,
    interface: Option<String>,
    config: Config,
    observer: Arc<dyn DiscoveryObserver>,
) -> Result<DiscoveryReport, DiscoveryError> {
    let request = DiscoveryRequest {
        target,
        interface,
        config,
    };
    DiscoveryService::new(Arc::new(PnetBackend::default()), Arc::new(SystemResolver))
        .with_observer(observer)
        .run(&request)
        .await
}
