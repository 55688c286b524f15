use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;

use crate::commands::DiscoverArgs;
use crate::terminal::{colors, print, progress::TerminalProgress};
use gscn_common::config::Config;
use gscn_common::network::host::DiscoveredHost;
use gscn_common::network::target::ProtocolFamily;
use gscn_core::{DiscoveryReport, discover_hosts};

pub async fn discover(args: DiscoverArgs, quiet: u8) -> anyhow::Result<()> {
    let cfg = Config {
        timeout: args.timeout,
        family: if args.six {
            ProtocolFamily::V6
        } else {
            ProtocolFamily::V4
        },
        reverse_lookup: args.reverse,
        quiet,
        ..Config::default()
    };

    let progress = Arc::new(TerminalProgress::new(quiet));

    let start_time: Instant = Instant::now();
    let result = discover_hosts(args.target(), args.iface.clone(), cfg.clone(), progress.clone()).await;
    progress.clear();

    discovery_ends(&result?, start_time.elapsed(), &cfg);
    Ok(())
}

fn discovery_ends(report: &DiscoveryReport, total_time: Duration, cfg: &Config) {
    if report.hosts.is_empty() {
        print::header("zero hosts detected", cfg.quiet);
        print::print_status("Host(s) not found on that network.");
    } else {
        print::header("network discovery", cfg.quiet);
        print_hosts(&report.hosts, cfg.reverse_lookup);
    }
    print_summary(report, total_time, cfg);
}

fn print_hosts(hosts: &[DiscoveredHost], with_names: bool) {
    let mut headers = vec!["IP Address", "Mac Address"];
    if with_names {
        headers.push("Host Name");
    }

    let rows: Vec<Vec<String>> = hosts.iter().map(|host| host_row(host, with_names)).collect();
    print::table(&headers, &rows);
}

fn host_row(host: &DiscoveredHost, with_names: bool) -> Vec<String> {
    let ip_color = if host.ip.is_ipv4() {
        colors::IPV4_ADDR
    } else {
        colors::IPV6_ADDR
    };
    let mut ip = host.ip.to_string().color(ip_color).to_string();
    if host.is_local {
        ip = format!("{ip} {}", "(this host)".italic().color(colors::SEPARATOR));
    }

    let mut row = vec![ip, host.mac.to_string().color(colors::MAC_ADDR).to_string()];
    if with_names {
        let name = host.hostname.as_deref().unwrap_or_default();
        row.push(name.color(colors::HOSTNAME).to_string());
    }
    row
}

fn print_summary(report: &DiscoveryReport, total_time: Duration, cfg: &Config) {
    if cfg.quiet > 1 {
        return;
    }

    print::fat_separator();
    print::aligned_line("Packets Sent", report.packets_sent);
    print::aligned_line("Packets Received", report.packets_received);
    print::aligned_line("Hosts Found", report.hosts.len());

    let active_hosts: ColoredString = format!("{} active hosts", report.hosts.len()).bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: String = format!("Discovery Complete: {active_hosts} identified in {total_time}");

    print::fat_separator();
    print::centerln(&output);
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
