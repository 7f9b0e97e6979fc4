//! Persistent record of URLs that are known not to exist.
//!
//! The file is plain text with one URL per line. It is read once when the run
//! starts and only ever appended to afterwards.

use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use fs_err as fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug)]
pub struct FailureLedger {
    path: PathBuf,
    known: Mutex<HashSet<String>>,

    // Held across the whole append so concurrent writers never interleave
    // lines. `known` is never held across an await.
    writer: tokio::sync::Mutex<()>,
}

impl FailureLedger {
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();

        let known = match fs::read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(err) => return Err(err),
        };

        log::debug!(
            "loaded {} known failures from {}",
            known.len(),
            path.display()
        );

        Ok(Self {
            path,
            known: Mutex::new(known),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `url` to the ledger file and remembers it for the rest of the
    /// run.
    pub async fn record(&self, url: &str) -> io::Result<()> {
        let _writer = self.writer.lock().await;

        let mut file = fs::tokio::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", url).as_bytes()).await?;
        file.flush().await?;

        self.lock().insert(url.to_owned());
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.known.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
