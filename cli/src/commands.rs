pub mod discover;
pub mod scan;

use std::net::IpAddr;

use clap::{ArgAction, Args, Parser, Subcommand};
use gscn_common::config::DEFAULT_TIMEOUT_SECS;
use gscn_common::network::prefix::NetworkPrefix;

#[derive(Parser)]
#[command(name = "gscn")]
#[command(about = "Find live hosts on the local network with ARP and Neighbor Discovery.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Less output: -q drops headers, -qq prints only results
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover hosts in a given network
    #[command(alias = "d")]
    Discover(DiscoverArgs),
    /// Scan one or more hosts
    #[command(alias = "s")]
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Network to probe, e.g. 192.168.1.0/24 or fd00::/120
    #[arg(short, long, conflicts_with = "host")]
    pub network: Option<NetworkPrefix>,

    /// Single address to probe
    #[arg(short = 'H', long)]
    pub host: Option<IpAddr>,

    /// Interface to send from (picked from the target otherwise)
    #[arg(short, long)]
    pub iface: Option<String>,

    /// Seconds to keep listening after the last probe
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Look up host names of the hosts found
    #[arg(short, long)]
    pub reverse: bool,

    /// Use IPv6 Neighbor Discovery instead of ARP
    #[arg(short = '6', long)]
    pub six: bool,
}

impl DiscoverArgs {
    pub fn target(&self) -> Option<NetworkPrefix> {
        self.host.map(NetworkPrefix::host).or(self.network)
    }
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    pub target: NetworkPrefix,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
