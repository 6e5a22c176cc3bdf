mod cli;
mod platform;

use clap::Parser;

use cli::Cli;
use platform::logging::{self, LogDestination};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(LogDestination::from_flag(cli.log_file), cli.verbose);
    platform::app::run(cli)
}
