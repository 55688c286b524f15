//! Reverse DNS enrichment for discovered hosts.
//!
//! Lookups for a batch run concurrently but share one deadline. Whatever
//! has not answered by then is left without a name, and results are written
//! back in discovery order regardless of which lookup finished first.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gscn_common::error::DiscoveryError;
use gscn_common::network::host::DiscoveredHost;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info};

const MAX_CONCURRENT_LOOKUPS: usize = 16;

#[async_trait]
pub trait HostnameResolver: Send + Sync {
    /// First name registered for `addr`, `None` if it has none.
    async fn lookup(&self, addr: IpAddr) -> Result<Option<String>, DiscoveryError>;
}

/// Resolver backed by the system's `getnameinfo`.
pub struct SystemResolver;

#[async_trait]
impl HostnameResolver for SystemResolver {
    async fn lookup(&self, addr: IpAddr) -> Result<Option<String>, DiscoveryError> {
        let name = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr))
            .await
            .map_err(|e| DiscoveryError::Lookup {
                addr,
                reason: e.to_string(),
            })?
            .map_err(|e| DiscoveryError::Lookup {
                addr,
                reason: e.to_string(),
            })?;

        // getnameinfo hands back the numeric form when there is no PTR record.
        Ok((name != addr.to_string()).then_some(name))
    }
}

/// Fills in `hostname` for as many hosts as answer within `budget`.
///
/// Returns the number of hosts that received a name.
pub async fn resolve_hostnames(
    hosts: &mut [DiscoveredHost],
    resolver: Arc<dyn HostnameResolver>,
    budget: Duration,
) -> usize {
    let deadline = Instant::now() + budget;
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_LOOKUPS));

    let handles: Vec<_> = hosts
        .iter()
        .map(|host| {
            let addr = host.ip;
            let resolver = Arc::clone(&resolver);
            let semaphore = Arc::clone(&semaphore);
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                match resolver.lookup(addr).await {
                    Ok(name) => name,
                    Err(e) => {
                        debug!("{e}");
                        None
                    }
                }
            })
        })
        .collect();

    let mut named = 0;
    for (host, mut handle) in hosts.iter_mut().zip(handles) {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(Some(name))) => {
                host.hostname = Some(name);
                named += 1;
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => debug!(ip = %host.ip, "lookup task failed: {e}"),
            Err(_) => {
                debug!(ip = %host.ip, "lookup budget exhausted");
                handle.abort();
            }
        }
    }

    info!("Resolved {named} of {} host names", hosts.len());
    named
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
