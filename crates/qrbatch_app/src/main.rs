use std::process::ExitCode;

use clap::Parser;

mod cli;
mod platform;

fn main() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();
    platform::logging::initialize(cli.log);
    platform::run(cli)
}
