use std::path::Path;

use image::{imageops::FilterType, GenericImageView};
use log::debug;

use crate::config::TargetSize;

/// Resamples the image at `path` to exactly `size` and writes it back to the
/// same path.
pub fn resize_in_place(path: &Path, size: TargetSize) -> image::ImageResult<()> {
    let img = image::open(path)?;

    debug!(
        "read image with dimensions {:?}, resizing to {:?}",
        img.dimensions(),
        (size.width, size.height)
    );

    let img = img.resize_exact(size.width, size.height, FilterType::Lanczos3);
    img.save(path)
}
