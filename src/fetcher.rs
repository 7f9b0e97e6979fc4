use std::path::{Path, PathBuf};

use anyhow::Result;
use fs_err::tokio as fs;
use indicatif::ProgressBar;
use log::{debug, error};
use reqwest::{Client, StatusCode};

use crate::{
    config::TargetSize,
    extractor::{self, TextureExtractor},
    ledger::FailureLedger,
};

/// What happened to a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Already on disk or known to be missing; nothing was requested.
    Skipped,

    /// Downloaded and extracted (or the container held no texture).
    Downloaded,

    /// Downloaded, but extraction failed. The container is kept on disk.
    ExtractionFailed,

    /// The server answered with something other than 200.
    Missing(StatusCode),
}

impl FetchOutcome {
    pub fn is_new_download(self) -> bool {
        matches!(self, FetchOutcome::Downloaded)
    }

    pub fn is_new_failure(self) -> bool {
        matches!(
            self,
            FetchOutcome::ExtractionFailed | FetchOutcome::Missing(_)
        )
    }
}

pub struct AssetFetcher {
    client: Client,
    ledger: FailureLedger,
    extractor: Box<dyn TextureExtractor>,
    progress: ProgressBar,
    target_size: TargetSize,
}

impl AssetFetcher {
    pub fn new(
        client: Client,
        ledger: FailureLedger,
        extractor: Box<dyn TextureExtractor>,
        progress: ProgressBar,
        target_size: TargetSize,
    ) -> Self {
        Self {
            client,
            ledger,
            extractor,
            progress,
            target_size,
        }
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    /// Downloads `url` to `destination` unless it is already resolved, then
    /// extracts its texture. Transport and filesystem errors are returned;
    /// everything else is folded into the outcome.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<FetchOutcome> {
        if destination.exists() || self.ledger.contains(url) {
            return Ok(FetchOutcome::Skipped);
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            debug!("{} returned {}", url, status);
            self.ledger.record(url).await?;
            self.progress.inc(1);
            return Ok(FetchOutcome::Missing(status));
        }

        let body = response.bytes().await?;

        // Each candidate stages under its own name, so card and photo
        // downloads of the same asset id never share a file.
        let staging = staging_path(destination);
        fs::write(&staging, &body).await?;
        fs::rename(&staging, destination).await?;

        self.progress
            .set_message(format!("Downloading {}", destination.display()));
        self.progress.inc(1);

        match extractor::extract_and_normalize(&*self.extractor, destination, self.target_size)
            .await
        {
            Ok(_) => Ok(FetchOutcome::Downloaded),
            Err(err) => {
                error!(
                    "Error extracting image from {}: {:#}",
                    destination.display(),
                    err
                );
                Ok(FetchOutcome::ExtractionFailed)
            }
        }
    }
}

pub fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    destination.with_file_name(name)
}
