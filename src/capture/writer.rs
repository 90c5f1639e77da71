//! Encoding captured pixels to numbered image files.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::counter::CaptureCounter;
use super::CaptureError;
use crate::options::CaptureOptions;

/// Tightly packed RGBA8 pixels read back from the offscreen target.
///
/// Rows are stored top to bottom as the GPU wrote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    frame_index: u64,
}

impl CapturedFrame {
    /// Wrap `pixels` as a `width` x `height` RGBA8 frame.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidFrame`] if the buffer length is not
    /// `width * height * 4`.
    pub fn new(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        frame_index: u64,
    ) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(CaptureError::InvalidFrame {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            frame_index,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 pixel data.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Renderer frame number the pixels came from.
    #[must_use]
    pub const fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

/// Persists captured frames.
pub trait FrameWriter: Send {
    /// Encode and store `frame`, returning where it was written.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError`] if encoding or storage fails.
    fn write(&mut self, frame: &CapturedFrame) -> Result<PathBuf, CaptureError>;
}

/// Still-image file format for captures.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// Lossless PNG.
    #[default]
    Png,
    /// Baseline JPEG (alpha dropped).
    Jpeg,
}

impl CaptureFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Png => f.write_str("PNG"),
            Self::Jpeg => f.write_str("JPEG"),
        }
    }
}

/// Writes `{prefix}{NNNNN}.{ext}` files into a capture directory.
///
/// The index comes from a [`CaptureCounter`] and advances after every
/// successful write. Names that already exist are skipped, never
/// overwritten.
#[derive(Debug, Clone)]
pub struct ImageFrameWriter {
    directory: PathBuf,
    prefix: String,
    format: CaptureFormat,
    quality: u8,
    counter: CaptureCounter,
}

impl ImageFrameWriter {
    /// Writer for `directory`, PNG, prefix `capture`, quality 90, counter
    /// stored in `directory/index.toml`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let counter = CaptureCounter::new(directory.join("index.toml"));
        Self {
            directory,
            prefix: "capture".to_owned(),
            format: CaptureFormat::Png,
            quality: 90,
            counter,
        }
    }

    /// Writer configured from the `[capture]` options section.
    ///
    /// A relative `counter_file` is resolved against the capture
    /// directory.
    #[must_use]
    pub fn from_options(options: &CaptureOptions) -> Self {
        let counter_path = if options.counter_file.is_absolute() {
            options.counter_file.clone()
        } else {
            options.directory.join(&options.counter_file)
        };
        Self {
            directory: options.directory.clone(),
            prefix: options.file_prefix.clone(),
            format: options.format,
            quality: options.quality,
            counter: CaptureCounter::new(counter_path),
        }
    }

    /// Use `prefix` for file names.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Encode as `format`.
    #[must_use]
    pub const fn with_format(mut self, format: CaptureFormat) -> Self {
        self.format = format;
        self
    }

    /// Encoder quality, 1-100. Only JPEG honors it.
    #[must_use]
    pub const fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// File name for capture number `index`.
    #[must_use]
    pub fn file_name(&self, index: u32) -> String {
        format!("{}{index:05}.{}", self.prefix, self.format.extension())
    }

    /// Create the next unused capture file, returning its index and path.
    fn create_next(&self) -> Result<(u32, PathBuf, File), CaptureError> {
        let mut index = self.counter.load()?;
        loop {
            let path = self.directory.join(self.file_name(index));
            match File::create_new(&path) {
                Ok(file) => return Ok((index, path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    log::debug!("{} exists, skipping", path.display());
                    index = index.checked_add(1).ok_or_else(|| {
                        CaptureError::Counter("capture index exhausted".into())
                    })?;
                }
                Err(e) => return Err(CaptureError::Io(e)),
            }
        }
    }

    fn encode(
        &self,
        frame: &CapturedFrame,
        file: File,
    ) -> Result<(), CaptureError> {
        let mut out = BufWriter::new(file);
        match self.format {
            CaptureFormat::Png => {
                PngEncoder::new_with_quality(
                    &mut out,
                    CompressionType::Default,
                    FilterType::Adaptive,
                )
                .write_image(
                    frame.pixels(),
                    frame.width(),
                    frame.height(),
                    ExtendedColorType::Rgba8,
                )?;
            }
            CaptureFormat::Jpeg => {
                let rgb: Vec<u8> = frame
                    .pixels()
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect();
                JpegEncoder::new_with_quality(&mut out, self.quality.clamp(1, 100))
                    .write_image(
                        &rgb,
                        frame.width(),
                        frame.height(),
                        ExtendedColorType::Rgb8,
                    )?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

impl FrameWriter for ImageFrameWriter {
    fn write(&mut self, frame: &CapturedFrame) -> Result<PathBuf, CaptureError> {
        fs::create_dir_all(&self.directory)?;
        let (index, path, file) = self.create_next()?;

        if let Err(e) = self.encode(frame, file) {
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        let next = index.saturating_add(1);
        if let Err(e) = self.counter.store(next) {
            log::warn!("capture saved but counter not advanced: {e}");
        }
        log::info!(
            "saved {} ({}x{}, {})",
            path.display(),
            frame.width(),
            frame.height(),
            self.format
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("arpass-writer-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn solid(width: u32, height: u32, index: u64) -> CapturedFrame {
        let pixels = [10u8, 200, 30, 255]
            .repeat(width as usize * height as usize);
        CapturedFrame::new(width, height, pixels, index).unwrap()
    }

    #[test]
    fn frame_rejects_wrong_length() {
        let err = CapturedFrame::new(4, 4, vec![0; 10], 0).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InvalidFrame {
                expected: 64,
                actual: 10
            }
        ));
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let dir = scratch("png");
        let mut writer = ImageFrameWriter::new(&dir);
        let frame = solid(8, 6, 1);
        let path = writer.write(&frame).unwrap();
        assert_eq!(path, dir.join("capture00000.png"));

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 6));
        assert_eq!(decoded.as_raw().as_slice(), frame.pixels());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn index_advances_and_persists() {
        let dir = scratch("advance");
        let mut writer = ImageFrameWriter::new(&dir).with_prefix("tango");
        let first = writer.write(&solid(2, 2, 0)).unwrap();
        let second = writer.write(&solid(2, 2, 1)).unwrap();
        assert_eq!(first.file_name().unwrap(), "tango00000.png");
        assert_eq!(second.file_name().unwrap(), "tango00001.png");

        let mut reopened = ImageFrameWriter::new(&dir).with_prefix("tango");
        let third = reopened.write(&solid(2, 2, 2)).unwrap();
        assert_eq!(third.file_name().unwrap(), "tango00002.png");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn existing_files_are_skipped() {
        let dir = scratch("skip");
        fs::create_dir_all(&dir).unwrap();
        let squatter = dir.join("capture00000.png");
        fs::write(&squatter, b"not an image").unwrap();

        let mut writer = ImageFrameWriter::new(&dir);
        let path = writer.write(&solid(2, 2, 0)).unwrap();
        assert_eq!(path.file_name().unwrap(), "capture00001.png");
        assert_eq!(fs::read(&squatter).unwrap(), b"not an image");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn jpeg_uses_jpg_extension() {
        let dir = scratch("jpeg");
        let mut writer = ImageFrameWriter::new(&dir)
            .with_format(CaptureFormat::Jpeg)
            .with_quality(90);
        let path = writer.write(&solid(16, 16, 0)).unwrap();
        assert_eq!(path.extension().unwrap(), "jpg");
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_directory_is_an_error() {
        let dir = scratch("blocked");
        fs::create_dir_all(dir.parent().unwrap()).unwrap();
        fs::write(&dir, b"a file where the directory should be").unwrap();
        let mut writer = ImageFrameWriter::new(&dir);
        assert!(writer.write(&solid(2, 2, 0)).is_err());
        let _ = fs::remove_file(&dir);
    }
}
