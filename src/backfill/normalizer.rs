//! Image normalizer
//!
//! Re-encodes scratch files to the configured target format. The MIME type is
//! sniffed from the file's magic bytes (falling back to its extension), never
//! taken from HTTP headers.
//!
//! Conversion is best effort: when the image cannot be decoded or re-encoded
//! the original file is kept and a warning note is attached, so a conversion
//! problem never stops the upload.

use crate::backfill::scratch::ScratchAsset;
use crate::config::{target_format, NormalizerConfig};
use crate::state::Note;
use crate::ConfigError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;

/// MIME type reported when the content is not a recognized image
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// Errors raised while normalizing an image
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Image codec unavailable: {0}")]
    PreconditionMissing(String),

    #[error("Could not open image: {0}")]
    Decode(ImageError),

    #[error("Could not encode image: {0}")]
    Encode(ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of normalizing one scratch asset
#[derive(Debug)]
pub struct Normalized {
    /// The file to upload: converted, or the original on fallback
    pub asset: ScratchAsset,

    /// Sniffed MIME type of the input
    pub source_mime: String,

    /// True if a new file in the target format was produced
    pub converted: bool,

    /// Info or warning annotations for the report
    pub notes: Vec<Note>,
}

/// Converts scratch assets to the target format
#[derive(Debug, Clone)]
pub struct Normalizer {
    target: ImageFormat,
    jpeg_quality: u8,
}

impl Normalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            target: target_format(&config.target_mime)?,
            jpeg_quality: config.jpeg_quality,
        })
    }

    pub fn target_mime(&self) -> &'static str {
        self.target.to_mime_type()
    }

    /// Preferred file extension of the target format (`jpg` for JPEG)
    pub fn target_extension(&self) -> &'static str {
        self.target
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("img")
    }

    /// Verifies the codec can both read and write the target format
    ///
    /// Run once before a scan; a missing codec is fatal for the whole run.
    pub fn check_codec(&self) -> Result<(), NormalizeError> {
        if !self.target.reading_enabled() || !self.target.writing_enabled() {
            return Err(NormalizeError::PreconditionMissing(format!(
                "{} support is not compiled into this build",
                self.target_mime()
            )));
        }
        Ok(())
    }

    /// Normalizes a scratch asset
    ///
    /// - Already in the target format: bytes untouched; the filename extension
    ///   is rewritten if it does not name the target format.
    /// - Converted: the original file is deleted and the returned asset points
    ///   at `<original path>.<target ext>` with the filename extension rewritten.
    /// - Decode or encode failure: the original is returned with a warning note.
    pub fn normalize(&self, mut asset: ScratchAsset) -> Normalized {
        let source_mime = sniff_mime(asset.path());

        if source_mime == self.target_mime() {
            if ImageFormat::from_path(&asset.filename).ok() != Some(self.target) {
                asset.filename = replace_extension(&asset.filename, self.target_extension());
            }
            return Normalized {
                asset,
                source_mime,
                converted: false,
                notes: Vec::new(),
            };
        }

        match self.convert(&asset) {
            Ok(converted_path) => {
                let filename = replace_extension(&asset.filename, self.target_extension());
                tracing::debug!(
                    "Converted {} from {} to {}",
                    asset.filename,
                    source_mime,
                    self.target_mime()
                );
                asset.discard();

                let note = Note::info(format!(
                    "Converted image from {} to {}.",
                    source_mime,
                    self.target_label()
                ));

                Normalized {
                    asset: ScratchAsset::adopt(converted_path, filename),
                    source_mime,
                    converted: true,
                    notes: vec![note],
                }
            }
            Err(e) => {
                tracing::warn!("Conversion of {} failed: {}", asset.filename, e);
                let note = Note::warning(format!(
                    "Could not convert image ({}). Will try to upload original.",
                    e
                ));

                Normalized {
                    asset,
                    source_mime,
                    converted: false,
                    notes: vec![note],
                }
            }
        }
    }

    /// Decodes the scratch file and writes the target encoding next to it
    fn convert(&self, asset: &ScratchAsset) -> Result<TempPath, NormalizeError> {
        let image = ImageReader::open(asset.path())?
            .with_guessed_format()?
            .decode()
            .map_err(NormalizeError::Decode)?;

        let output_path = converted_path(asset.path(), self.target_extension());
        let file = File::create(&output_path)?;
        // Owned from here on: on error `output` drops and removes the partial file
        let output = TempPath::try_from_path(output_path)?;
        self.encode(image, file)?;
        Ok(output)
    }

    fn encode(&self, image: DynamicImage, file: File) -> Result<(), NormalizeError> {
        let mut writer = BufWriter::new(file);

        match self.target {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = image.to_rgb8();
                let mut encoder = JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
                encoder.encode_image(&rgb).map_err(NormalizeError::Encode)?;
            }
            ImageFormat::WebP => {
                DynamicImage::ImageRgba8(image.to_rgba8())
                    .write_to(&mut writer, ImageFormat::WebP)
                    .map_err(NormalizeError::Encode)?;
            }
            format => {
                image
                    .write_to(&mut writer, format)
                    .map_err(NormalizeError::Encode)?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    fn target_label(&self) -> &'static str {
        match self.target {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::WebP => "WebP",
            _ => self.target_mime(),
        }
    }
}

/// Sniffs a file's MIME type from its content, then its extension
pub fn sniff_mime(path: &Path) -> String {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .ok()
        .and_then(|reader| reader.format())
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| UNKNOWN_MIME.to_string())
}

/// `photo.png` -> `photo.jpg`, `photo` -> `photo.jpg`
fn replace_extension(filename: &str, extension: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    format!("{}.{}", stem, extension)
}

/// Appends the extension to the full path: `/tmp/x-photo.png` -> `/tmp/x-photo.png.jpg`
fn converted_path(path: &Path, extension: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(extension);
    PathBuf::from(raw)
}
