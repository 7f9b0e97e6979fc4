use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;
use log::{error, info, warn};
use walkdir::WalkDir;

use crate::{
    config::{Config, TargetSize},
    extractor::{
        extract_and_normalize, extracted_path, is_extracted_image, is_scratch_image,
        CommandExtractor, TextureExtractor,
    },
    options::Global,
};

#[derive(Debug, Args)]
pub struct ExtractOptions {
    /// Asset containers, or directories to search for them.
    #[clap(required = true)]
    pub paths: Vec<PathBuf>,

    /// Extract again even if an extracted image already exists.
    #[clap(long)]
    pub force: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ExtractReport {
    extracted: usize,
    empty: usize,
    skipped: usize,
    failed: usize,
}

pub async fn extract(global: Global, options: ExtractOptions) -> Result<()> {
    let config = Config::load(global.config.as_deref())?;
    let extractor = CommandExtractor::new(&config.extractor);

    let containers = find_containers(&options.paths)?;
    info!("found {} asset containers", containers.len());

    let report = extract_all(&extractor, &containers, config.target_size, options.force).await;

    info!(
        "extracted {} images ({} without a texture, {} already extracted, {} failed)",
        report.extracted, report.empty, report.skipped, report.failed
    );

    if report.failed > 0 {
        bail!("{} containers could not be extracted", report.failed);
    }

    Ok(())
}

/// Downloaded containers under `paths`: PNG-named files that are not
/// themselves extracted images.
fn find_containers(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut containers = Vec::new();

    for path in paths {
        if !path.exists() {
            bail!("{} does not exist", path.display());
        }

        for entry in WalkDir::new(path).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
            let entry = entry?;
            if entry.file_type().is_file() && is_container(entry.path()) {
                containers.push(entry.into_path());
            }
        }
    }

    Ok(containers)
}

fn is_container(path: &Path) -> bool {
    let is_png = path
        .extension()
        .map(|extension| extension.eq_ignore_ascii_case("png"))
        .unwrap_or(false);

    is_png && !is_extracted_image(path) && !is_scratch_image(path)
}

async fn extract_all(
    extractor: &dyn TextureExtractor,
    containers: &[PathBuf],
    size: TargetSize,
    force: bool,
) -> ExtractReport {
    let mut report = ExtractReport::default();

    for container in containers {
        if !force && extracted_path(container).exists() {
            report.skipped += 1;
            continue;
        }

        match extract_and_normalize(extractor, container, size).await {
            Ok(Some(_)) => report.extracted += 1,
            Ok(None) => {
                warn!("no texture found in {}", container.display());
                report.empty += 1;
            }
            Err(err) => {
                error!(
                    "Error extracting image from {}: {:#}",
                    container.display(),
                    err
                );
                report.failed += 1;
            }
        }
    }

    report
}
