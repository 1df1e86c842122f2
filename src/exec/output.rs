use std::path::Path;

use anyhow::Context as _;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::{
    foundation::error::{BatchError, BatchResult},
    host::RenderedFrame,
    plan::model::{ColorMode, FileFormat, RenderSettings},
};

/// Encode `frame` to `path` using the file format and color mode in `settings`.
///
/// Creates the parent directory if needed. Alpha is dropped for JPEG regardless of color mode.
pub fn write_frame(frame: &RenderedFrame, path: &Path, settings: &RenderSettings) -> BatchResult<()> {
    let rgba = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(|| {
        BatchError::render(format!(
            "frame buffer has {} bytes, expected {}x{}x4",
            frame.data.len(),
            frame.width,
            frame.height
        ))
    })?;
    let image = convert(DynamicImage::ImageRgba8(rgba), settings);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))
            .map_err(|e| BatchError::render(format!("{e:#}")))?;
    }

    image
        .save_with_format(path, image_format(settings.file_format))
        .with_context(|| format!("write {:?} '{}'", settings.file_format, path.display()))
        .map_err(|e| BatchError::render(format!("{e:#}")))
}

fn image_format(format: FileFormat) -> ImageFormat {
    match format {
        FileFormat::Png => ImageFormat::Png,
        FileFormat::Jpeg => ImageFormat::Jpeg,
        FileFormat::Tiff => ImageFormat::Tiff,
        FileFormat::OpenExr => ImageFormat::OpenExr,
    }
}

fn convert(image: DynamicImage, settings: &RenderSettings) -> DynamicImage {
    let mode = match (settings.file_format, settings.color_mode) {
        (FileFormat::Jpeg, ColorMode::Rgba) => ColorMode::Rgb,
        (_, mode) => mode,
    };
    // The EXR encoder only takes 32-bit float RGB(A).
    if settings.file_format == FileFormat::OpenExr {
        return match mode {
            ColorMode::Rgba => DynamicImage::ImageRgba32F(image.to_rgba32f()),
            ColorMode::Rgb => DynamicImage::ImageRgb32F(image.to_rgb32f()),
            ColorMode::Bw => {
                DynamicImage::ImageRgb32F(DynamicImage::ImageLuma8(image.to_luma8()).to_rgb32f())
            }
        };
    }
    match mode {
        ColorMode::Rgba => image,
        ColorMode::Rgb => DynamicImage::ImageRgb8(image.to_rgb8()),
        ColorMode::Bw => DynamicImage::ImageLuma8(image.to_luma8()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/exec/output.rs"]
mod tests;
