use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use gscn_common::config::Config;
use gscn_common::error::{DiscoveryError, InterfaceError, SocketKind};
use gscn_common::network::host::DiscoveredHost;
use gscn_common::network::target::ProtocolFamily;
use gscn_core::resolver::HostnameResolver;
use gscn_core::{DiscoveryReport, DiscoveryRequest, DiscoveryService, DiscoveryState, discover_hosts};

use crate::utils::*;

fn config(timeout: u64, family: ProtocolFamily) -> Config {
    Config {
        timeout,
        family,
        read_timeout: Duration::from_millis(5),
        ..Config::default()
    }
}

fn request(target: &str, timeout: u64) -> DiscoveryRequest {
    let target: gscn_common::network::prefix::NetworkPrefix = target.parse().unwrap();
    DiscoveryRequest {
        target: Some(target),
        interface: None,
        config: config(timeout, target.family()),
    }
}

async fn run_with(
    network: Arc<MockNetwork>,
    resolver: MockResolver,
    request: &DiscoveryRequest,
) -> (Result<DiscoveryReport, DiscoveryError>, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let resolver: Arc<dyn HostnameResolver> = Arc::new(resolver);
    let service = DiscoveryService::new(network, resolver).with_observer(observer.clone());
    (service.run(request).await, observer)
}

async fn run(network: Arc<MockNetwork>, request: &DiscoveryRequest) -> (DiscoveryReport, Arc<RecordingObserver>) {
    let (result, observer) = run_with(network, MockResolver::default(), request).await;
    (result.expect("discovery should succeed"), observer)
}

fn ips(hosts: &[DiscoveredHost]) -> Vec<IpAddr> {
    hosts.iter().map(|h| h.ip).collect()
}

#[tokio::test]
async fn hosts_keep_arrival_order_with_self_last() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]).with_pending(vec![
        arp_reply(v4(5), mac(5)),
        arp_reply(v4(2), mac(2)),
        arp_reply(v4(9), mac(9)),
    ]));

    let (report, _) = run(network.clone(), &request("192.168.1.0/28", 1)).await;

    assert_eq!(ips(&report.hosts), vec![v4(5), v4(2), v4(9), v4(10)]);
    assert_eq!(report.hosts[1].mac, mac(2));
    assert_eq!(report.packets_received, 3);
    assert_eq!(report.packets_sent, 15);

    let own = report.hosts.last().unwrap();
    assert!(own.is_local);
    assert_eq!(own.mac, OWN_MAC);
    assert!(!network.probed().contains(&v4(10)), "no probe for our own address");
}

#[tokio::test]
async fn answering_neighbors_are_found_over_arp() {
    let network = Arc::new(
        MockNetwork::new(vec![ethernet_interface()])
            .with_neighbor(v4(1), mac(1))
            .with_neighbor(v4(3), mac(3)),
    );

    let (report, _) = run(network.clone(), &request("192.168.1.0/30", 1)).await;

    assert_eq!(ips(&report.hosts), vec![v4(1), v4(3)]);
    assert!(report.hosts.iter().all(|h| !h.is_local && h.hostname.is_none()));
    assert_eq!(network.probed(), vec![v4(0), v4(1), v4(2), v4(3)]);
}

#[tokio::test]
async fn duplicate_replies_are_counted_but_listed_once() {
    let network = Arc::new(
        MockNetwork::new(vec![ethernet_interface()])
            .with_neighbor(v4(2), mac(2))
            .answering_twice(),
    );

    let (report, _) = run(network, &request("192.168.1.0/30", 1)).await;

    assert_eq!(ips(&report.hosts), vec![v4(2)]);
    assert_eq!(report.packets_received, 2);
    assert_eq!(report.packets_sent, 4);
}

#[tokio::test]
async fn replies_from_outside_the_range_are_dropped() {
    let network = Arc::new(
        MockNetwork::new(vec![ethernet_interface()]).with_pending(vec![arp_reply(v4(200), mac(200))]),
    );

    let (report, _) = run(network, &request("192.168.1.0/30", 1)).await;

    assert!(report.hosts.is_empty());
    assert_eq!(report.packets_received, 0);
}

#[tokio::test]
async fn every_probe_goes_out_before_the_wait() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]));

    let (report, observer) = run(network, &request("192.168.1.0/30", 1)).await;
    assert_eq!(report.packets_sent, 4);

    let wait = observer
        .position(&Event::WaitStarted(Duration::from_secs(1)))
        .expect("a non-zero timeout waits");
    for last in 0..4 {
        let done = observer.position(&Event::AddressDone(v4(last))).unwrap();
        assert!(done < wait);
    }
    assert!(observer.position(&Event::SendingFinished(4)).unwrap() < wait);
    assert!(observer.position(&Event::WaitFinished).unwrap() > wait);

    let states: Vec<Event> = observer
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::State(_)))
        .collect();
    assert_eq!(
        states,
        vec![
            Event::State(DiscoveryState::Idle),
            Event::State(DiscoveryState::Resolving),
            Event::State(DiscoveryState::CaptureStarting),
            Event::State(DiscoveryState::Sending),
            Event::State(DiscoveryState::WaitingForTimeout),
            Event::State(DiscoveryState::Draining),
            Event::State(DiscoveryState::Done),
        ]
    );
}

#[tokio::test]
async fn zero_timeout_skips_the_wait() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]));

    let (report, observer) = run(network, &request("192.168.1.0/30", 0)).await;

    assert_eq!(report.packets_sent, 4);
    assert!(!observer
        .events()
        .iter()
        .any(|e| matches!(e, Event::WaitStarted(_) | Event::WaitFinished)));
}

#[tokio::test]
async fn failed_sends_are_not_counted() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]).failing_sends(2));

    let (report, observer) = run(network.clone(), &request("192.168.1.0/30", 0)).await;

    assert_eq!(report.packets_sent, 2);
    assert_eq!(network.probed(), vec![v4(2), v4(3)]);
    assert_eq!(
        observer.events().iter().filter(|e| matches!(e, Event::AddressDone(_))).count(),
        4
    );
}

#[tokio::test]
async fn loopback_only_host_fails_before_capturing() {
    let network = Arc::new(MockNetwork::new(vec![loopback_interface()]));

    let (result, observer) = run_with(network.clone(), MockResolver::default(), &request("127.0.0.0/30", 1)).await;

    let err = result.unwrap_err();
    assert!(matches!(err, DiscoveryError::Interface(InterfaceError::Loopback(ref name)) if name == "lo"));
    assert!(err.is_fatal());
    assert_eq!(network.sources_opened(), 0);
    assert!(network.sent_frames().is_empty());
    assert_eq!(observer.events().last(), Some(&Event::State(DiscoveryState::Failed)));
}

#[tokio::test]
async fn unknown_network_has_no_route() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]));

    let (result, _) = run_with(network, MockResolver::default(), &request("10.9.9.0/30", 1)).await;

    assert!(matches!(result, Err(DiscoveryError::Interface(InterfaceError::NoRoute(_)))));
}

#[tokio::test]
async fn capture_failure_aborts_before_sending() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]).failing_capture());

    let (result, _) = run_with(network.clone(), MockResolver::default(), &request("192.168.1.0/30", 1)).await;

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        DiscoveryError::Socket { kind: SocketKind::Capture, ref interface, .. } if interface == "eth0"
    ));
    assert!(network.sent_frames().is_empty());
}

#[tokio::test]
async fn failed_reverse_lookup_keeps_the_host() {
    let network = Arc::new(
        MockNetwork::new(vec![ethernet_interface()])
            .with_neighbor(v4(1), mac(1))
            .with_neighbor(v4(2), mac(2)),
    );
    let resolver = MockResolver::default()
        .with_name(v4(1), "router.lan")
        .failing_for(v4(2));
    let mut request = request("192.168.1.0/30", 1);
    request.config.reverse_lookup = true;

    let (result, observer) = run_with(network, resolver, &request).await;
    let report = result.unwrap();

    assert_eq!(ips(&report.hosts), vec![v4(1), v4(2)]);
    assert_eq!(report.hosts[0].hostname.as_deref(), Some("router.lan"));
    assert_eq!(report.hosts[1].hostname, None);
    assert!(observer.position(&Event::Resolving(2)).is_some());
}

#[tokio::test]
async fn reverse_lookup_is_skipped_without_hosts() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]));
    let mut request = request("192.168.1.0/30", 0);
    request.config.reverse_lookup = true;

    let (result, observer) = run_with(network, MockResolver::default(), &request).await;

    assert!(result.unwrap().hosts.is_empty());
    assert!(observer.position(&Event::State(DiscoveryState::Enriching)).is_none());
}

#[tokio::test]
async fn neighbor_discovery_over_ipv6() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]).with_neighbor(v6(2), mac(0x62)));

    let (report, _) = run(network.clone(), &request("fd00::/126", 1)).await;

    assert_eq!(ips(&report.hosts), vec![v6(2)]);
    assert_eq!(report.hosts[0].mac, mac(0x62));
    assert_eq!(report.packets_sent, 4);
    assert_eq!(network.probed(), vec![v6(0), v6(1), v6(2), v6(3)]);
}

#[tokio::test]
async fn interface_alone_probes_its_network() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]).with_neighbor(v4(20), mac(20)));
    let request = DiscoveryRequest {
        target: None,
        interface: Some("eth0".to_string()),
        config: config(1, ProtocolFamily::V4),
    };

    let (report, observer) = run(network, &request).await;

    assert!(observer.position(&Event::SendingStarted(256)).is_some());
    assert_eq!(report.packets_sent, 255);
    assert_eq!(ips(&report.hosts), vec![v4(20), v4(10)]);
}

#[tokio::test]
async fn missing_target_and_interface_is_a_configuration_error() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]));

    let (result, _) = run_with(network, MockResolver::default(), &DiscoveryRequest::default()).await;

    assert!(matches!(
        result,
        Err(DiscoveryError::Configuration(ref m)) if m == "could not determine which interface to use"
    ));
}

#[tokio::test]
async fn unknown_interface_name_is_reported() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]));
    let mut request = request("192.168.1.0/30", 1);
    request.interface = Some("wlan9".to_string());

    let (result, _) = run_with(network, MockResolver::default(), &request).await;

    assert!(matches!(result, Err(DiscoveryError::Interface(InterfaceError::NotFound(ref n))) if n == "wlan9"));
}

#[tokio::test]
async fn family_mismatch_is_rejected() {
    let network = Arc::new(MockNetwork::new(vec![ethernet_interface()]));

    let mut v6_over_arp = request("fd00::/126", 1);
    v6_over_arp.config.family = ProtocolFamily::V4;
    let (result, _) = run_with(network.clone(), MockResolver::default(), &v6_over_arp).await;
    assert!(matches!(
        result,
        Err(DiscoveryError::Configuration(ref m)) if m == "arp can only be used with IPv4 addresses"
    ));

    let mut v4_over_ndp = request("192.168.1.0/30", 1);
    v4_over_ndp.config.family = ProtocolFamily::V6;
    let (result, _) = run_with(network.clone(), MockResolver::default(), &v4_over_ndp).await;
    assert!(matches!(
        result,
        Err(DiscoveryError::Configuration(ref m)) if m == "the given IP address is not IPv6"
    ));

    assert!(network.sent_frames().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn probing_on_a_multi_threaded_runtime() {
    let network = Arc::new(
        MockNetwork::new(vec![ethernet_interface()])
            .with_neighbor(v4(1), mac(1))
            .with_neighbor(v4(2), mac(2)),
    );

    let (report, observer) = run(network.clone(), &request("192.168.1.0/30", 1)).await;

    assert_eq!(ips(&report.hosts), vec![v4(1), v4(2)]);
    assert_eq!(report.packets_sent, 4);
    assert_eq!(network.probed(), vec![v4(0), v4(1), v4(2), v4(3)]);
    assert!(observer.position(&Event::State(DiscoveryState::Done)).is_some());
}

#[tokio::test]
async fn system_entry_point_reports_to_the_observer() {
    let observer = Arc::new(RecordingObserver::default());
    let target = "fd00::/126".parse().unwrap();

    let result = discover_hosts(Some(target), None, config(0, ProtocolFamily::V4), observer.clone()).await;

    assert!(matches!(
        result,
        Err(DiscoveryError::Configuration(ref m)) if m == "arp can only be used with IPv4 addresses"
    ));
    assert_eq!(
        observer.events(),
        vec![
            Event::State(DiscoveryState::Idle),
            Event::State(DiscoveryState::Resolving),
            Event::State(DiscoveryState::Failed),
        ]
    );
}
