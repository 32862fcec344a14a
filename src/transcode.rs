//! Resize and re-encode.
//!
//! Output is either png (lossless) or jpeg. Every other input format is
//! normalized to jpeg, which changes the file extension.

use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{self, CompressionType, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageResult};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

/// Lowercase extensions (without dot) picked up by the scanner.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "avif", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Png,
    Jpeg,
}

impl TargetFormat {
    /// png stays png, everything else becomes jpeg.
    pub fn for_extension(ext: &str) -> Self {
        if ext.eq_ignore_ascii_case("png") {
            TargetFormat::Png
        } else {
            TargetFormat::Jpeg
        }
    }

    /// Extension of the output file. jpg and jpeg inputs keep theirs.
    pub fn output_extension(self, input_ext: &str) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpeg if input_ext.eq_ignore_ascii_case("jpg") => "jpg",
            TargetFormat::Jpeg if input_ext.eq_ignore_ascii_case("jpeg") => "jpeg",
            TargetFormat::Jpeg => "jpg",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpeg",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityParams {
    /// 0-100, clamped to the encoder's 1-100.
    pub jpeg_quality: u8,
    /// 0-9 effort level.
    pub png_compression: u8,
}

impl From<&Config> for QualityParams {
    fn from(config: &Config) -> Self {
        QualityParams {
            jpeg_quality: config.jpeg_quality,
            png_compression: config.png_compression,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transcoded {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decodes `source`, shrinks it to at most `target_width` pixels wide and
/// encodes it as `format`. Never upscales.
pub fn transcode(
    source: &[u8],
    format: TargetFormat,
    target_width: u32,
    quality: QualityParams,
) -> ImageResult<Transcoded> {
    let img = fit_width(image::load_from_memory(source)?, target_width);
    let (width, height) = (img.width(), img.height());

    let mut bytes = Vec::new();
    match format {
        TargetFormat::Png => {
            let encoder = PngEncoder::new_with_quality(
                Cursor::new(&mut bytes),
                png_compression(quality.png_compression),
                png::FilterType::Adaptive,
            );
            img.write_with_encoder(encoder)?;
        }
        TargetFormat::Jpeg => {
            // jpeg has no alpha channel and only 8-bit samples
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(
                Cursor::new(&mut bytes),
                quality.jpeg_quality.clamp(1, 100),
            );
            rgb.write_with_encoder(encoder)?;
        }
    }

    Ok(Transcoded {
        bytes,
        width,
        height,
    })
}

/// Reads `path` and transcodes it, attaching the path to any failure.
pub fn transcode_file(
    path: &Path,
    format: TargetFormat,
    target_width: u32,
    quality: QualityParams,
) -> Result<Transcoded> {
    let source = fs::read(path).map_err(|e| Error::io(path, e))?;
    transcode(&source, format, target_width, quality).map_err(|source| Error::Codec {
        path: path.to_path_buf(),
        source,
    })
}

fn fit_width(img: DynamicImage, target_width: u32) -> DynamicImage {
    if img.width() <= target_width {
        return img;
    }
    let (w, h) = (u64::from(img.width()), u64::from(img.height()));
    let height = ((h * u64::from(target_width) + w / 2) / w).max(1);
    img.resize_exact(target_width, height as u32, FilterType::Lanczos3)
}

fn png_compression(level: u8) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}
