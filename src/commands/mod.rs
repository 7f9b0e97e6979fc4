mod extract;
mod fetch;
mod list;

use clap::Subcommand;
pub use extract::*;
pub use fetch::*;
pub use list::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download every candidate asset that is not on disk yet, extracting and
    /// resizing the texture of each new download. This is the default.
    Fetch(FetchOptions),

    /// Print the URL of every candidate asset, one per line.
    List(ListOptions),

    /// Extract and resize the texture of asset containers that are already
    /// on disk. Useful to retry containers whose extraction failed.
    Extract(ExtractOptions),
}

impl Default for Command {
    fn default() -> Self {
        Command::Fetch(FetchOptions::default())
    }
}
