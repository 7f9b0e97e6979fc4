use std::path::PathBuf;

use clap::Parser;

use crate::commands::Command;

#[derive(Debug, Parser)]
#[clap(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Options {
    #[command(flatten)]
    pub global: Global,

    /// The command to run. Defaults to `fetch`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Parser)]
pub struct Global {
    /// A TOML file overriding the built-in member list, identifier ranges,
    /// paths and limits. Anything it leaves out keeps its default.
    #[clap(long, global(true))]
    pub config: Option<PathBuf>,

    /// Sets verbosity level. Can be specified multiple times to increase the verbosity
    /// of this program.
    #[clap(long = "verbose", short, global(true), action(clap::ArgAction::Count))]
    pub verbosity: u8,
}
