//! Pulling a texture out of a downloaded asset container.
//!
//! The container format is not parsed here. [`TextureExtractor`] is the seam,
//! and [`CommandExtractor`] fills it by shelling out to an external tool.

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use fs_err as fs;
use image::DynamicImage;
use log::{debug, info};
use thiserror::Error;
use tokio::{process::Command, task};

use crate::{
    config::{ExtractorCommand, TargetSize},
    normalize,
};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("texture extractor {program:?} could not be found")]
    ToolNotFound { program: String },

    #[error("failed to run texture extractor {program:?}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("texture extractor exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },

    #[error("texture extractor produced an unreadable image")]
    Decode(#[from] image::ImageError),

    #[error("texture extractor I/O error")]
    Io(#[from] io::Error),

    #[error("texture decode task failed")]
    Task(#[from] task::JoinError),
}

#[async_trait]
pub trait TextureExtractor: Send + Sync {
    /// Returns the first 2D texture stored in the container at `asset`, or
    /// `None` if it does not hold one.
    async fn extract_first_texture(
        &self,
        asset: &Path,
    ) -> Result<Option<DynamicImage>, ExtractError>;
}

#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(command: &ExtractorCommand) -> Self {
        Self {
            program: command.program.clone(),
            args: command.args.clone(),
        }
    }
}

#[async_trait]
impl TextureExtractor for CommandExtractor {
    async fn extract_first_texture(
        &self,
        asset: &Path,
    ) -> Result<Option<DynamicImage>, ExtractError> {
        let scratch = scratch_path(asset);

        debug!("running {} on {}", self.program, asset.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(asset)
            .arg(&scratch)
            .output()
            .await
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => ExtractError::ToolNotFound {
                    program: self.program.clone(),
                },
                _ => ExtractError::Spawn {
                    program: self.program.clone(),
                    source,
                },
            })?;

        if !output.status.success() {
            let _ = fs::remove_file(&scratch);

            return Err(ExtractError::ToolFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        if !scratch.exists() {
            return Ok(None);
        }

        let image = task::spawn_blocking(move || {
            let image = image::io::Reader::open(&scratch)?
                .with_guessed_format()?
                .decode();
            fs::remove_file(&scratch)?;
            Ok::<_, ExtractError>(image?)
        })
        .await??;

        Ok(Some(image))
    }
}

/// Where the extracted texture of `asset` is saved.
pub fn extracted_path(asset: &Path) -> PathBuf {
    let stem = asset
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    asset.with_file_name(format!("{}_extracted.png", stem))
}

pub fn is_extracted_image(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().ends_with("_extracted"))
        .unwrap_or(false)
}

/// Where the external tool is asked to write its PNG. The name keeps a `.png`
/// extension so tools that pick the format from it write a PNG.
fn scratch_path(asset: &Path) -> PathBuf {
    let stem = asset
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    asset.with_file_name(format!("{}{}", stem, SCRATCH_SUFFIX))
}

const SCRATCH_SUFFIX: &str = ".texture.png";

/// Leftover tool output from an interrupted extraction.
pub fn is_scratch_image(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(SCRATCH_SUFFIX))
        .unwrap_or(false)
}

/// Extracts the first texture of `asset`, saves it next to it and resizes it
/// to `size`. Returns the path of the saved image, or `None` if the container
/// had no texture.
pub async fn extract_and_normalize(
    extractor: &dyn TextureExtractor,
    asset: &Path,
    size: TargetSize,
) -> anyhow::Result<Option<PathBuf>> {
    let Some(image) = extractor.extract_first_texture(asset).await? else {
        debug!("no texture found in {}", asset.display());
        return Ok(None);
    };

    let output = extracted_path(asset);
    let saved = output.clone();

    task::spawn_blocking(move || -> image::ImageResult<()> {
        image.save(&saved)?;
        normalize::resize_in_place(&saved, size)
    })
    .await??;

    info!("Extracted image saved to {}", output.display());
    Ok(Some(output))
}
