mod commands;
mod terminal;

use commands::{CommandLine, Commands, discover, scan};
use terminal::{logging, print};
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging();

    if !is_root::is_root() {
        warn!("Not running as root, opening the link layer will most likely fail");
    }

    match commands.command {
        Commands::Discover(args) => {
            print::header("getting ready for discovery", commands.quiet);
            discover::discover(args, commands.quiet).await
        }
        Commands::Scan(args) => {
            print::header("starting scanner", commands.quiet);
            scan::scan(args)
        }
    }
}
