use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use fs_err as fs;

use crate::{candidate::candidates_for, config::Config, ledger::FailureLedger, options::Global};

#[derive(Debug, Args)]
pub struct ListOptions {
    /// Only list candidates that are neither on disk nor recorded as missing.
    #[clap(long)]
    pub pending: bool,

    /// A path to a file to put the URL list. Defaults to stdout.
    #[clap(long = "output")]
    pub output: Option<PathBuf>,
}

pub async fn list(global: Global, options: ListOptions) -> Result<()> {
    let config = Config::load(global.config.as_deref())?;

    let ledger = if options.pending {
        Some(FailureLedger::load(&config.ledger_path)?)
    } else {
        None
    };

    let writer: Box<dyn Write> = match &options.output {
        Some(path) => Box::new(fs::File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);

    write_urls(&config, ledger.as_ref(), &mut writer)?;
    writer.flush()?;

    Ok(())
}

fn write_urls(
    config: &Config,
    ledger: Option<&FailureLedger>,
    writer: &mut impl Write,
) -> Result<usize> {
    let mut written = 0;

    for member in &config.members {
        let member_dir = config.output_dir.join(member.folder_name());

        for candidate in candidates_for(config, member) {
            let url = candidate.url(&config.base_url);

            if let Some(ledger) = ledger {
                if ledger.contains(&url) || member_dir.join(candidate.file_name()).exists() {
                    continue;
                }
            }

            writeln!(writer, "{}", url)?;
            written += 1;
        }
    }

    Ok(written)
}
