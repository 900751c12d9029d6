use clap::Parser;

use cardpress::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cardpress::logging::init(cli.log_level);
    run(cli)
}
