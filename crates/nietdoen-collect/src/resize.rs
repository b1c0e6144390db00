//! Client-side reduction of the selected image before upload.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use thiserror::Error;
use tracing::debug;

pub const MAX_WIDTH: u32 = 800;
pub const MAX_HEIGHT: u32 = 600;
pub const JPEG_QUALITY: u8 = 75;

#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("unsupported image type: {0}")]
    Unsupported(String),

    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// The image the user picked, as raw bytes plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Read an image file, taking the MIME type from its extension.
    pub fn from_path(path: &Path) -> Result<Self, ResizeError> {
        let format = ImageFormat::from_path(path)?;
        let mime_type = supported(format)?.to_mime_type().to_string();
        let bytes = std::fs::read(path).map_err(|source| ResizeError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, bytes, mime_type))
    }

    /// Reduced copy of the image, in the same MIME type.
    pub fn reduced(&self) -> Result<Vec<u8>, ResizeError> {
        reduce(&self.bytes, &self.mime_type)
    }
}

fn supported(format: ImageFormat) -> Result<ImageFormat, ResizeError> {
    match format {
        ImageFormat::Png | ImageFormat::Jpeg => Ok(format),
        other => Err(ResizeError::Unsupported(other.to_mime_type().to_string())),
    }
}

/// Scale down to fit within [`MAX_WIDTH`] x [`MAX_HEIGHT`], keeping the aspect
/// ratio, and re-encode in the original format. JPEG output uses [`JPEG_QUALITY`].
pub fn reduce(bytes: &[u8], mime_type: &str) -> Result<Vec<u8>, ResizeError> {
    let format = ImageFormat::from_mime_type(mime_type)
        .ok_or_else(|| ResizeError::Unsupported(mime_type.to_string()))
        .and_then(supported)?;
    let img = image::load_from_memory_with_format(bytes, format)?;

    let (width, height) = img.dimensions();
    let img = if width > MAX_WIDTH || height > MAX_HEIGHT {
        img.resize(MAX_WIDTH, MAX_HEIGHT, FilterType::Triangle)
    } else {
        img
    };
    debug!(
        from = %format!("{width}x{height}"),
        to = %format!("{}x{}", img.width(), img.height()),
        mime_type,
        "image reduced"
    );

    encode(&img, format)
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ResizeError> {
    let mut out = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            encoder.encode_image(&rgb)?;
        }
        _ => img.write_to(&mut Cursor::new(&mut out), format)?,
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 20, 20]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    fn dimensions(bytes: &[u8]) -> (u32, u32) {
        image::load_from_memory(bytes).unwrap().dimensions()
    }

    #[test]
    fn wide_png_scaled_to_max_width() {
        let reduced = reduce(&png(1600, 400), "image/png").unwrap();
        assert_eq!(image::guess_format(&reduced).unwrap(), ImageFormat::Png);
        assert_eq!(dimensions(&reduced), (800, 200));
    }

    #[test]
    fn tall_image_height_is_bounded() {
        let reduced = reduce(&png(600, 4000), "image/png").unwrap();
        assert_eq!(dimensions(&reduced), (90, 600));
    }

    #[test]
    fn small_image_keeps_size() {
        let reduced = reduce(&png(320, 240), "image/png").unwrap();
        assert_eq!(dimensions(&reduced), (320, 240));
    }

    #[test]
    fn jpeg_stays_jpeg() {
        let img = RgbaImage::from_pixel(1000, 500, Rgba([10, 120, 200, 255]));
        let mut jpeg = Vec::new();
        DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let reduced = reduce(&jpeg, "image/jpeg").unwrap();
        assert_eq!(image::guess_format(&reduced).unwrap(), ImageFormat::Jpeg);
        assert_eq!(dimensions(&reduced), (800, 400));
    }

    #[test]
    fn unsupported_mime_type() {
        assert!(matches!(
            reduce(&png(10, 10), "image/gif"),
            Err(ResizeError::Unsupported(_))
        ));
        assert!(matches!(
            reduce(&png(10, 10), "text/plain"),
            Err(ResizeError::Unsupported(_))
        ));
    }

    #[test]
    fn corrupt_bytes_fail() {
        assert!(matches!(
            reduce(b"not an image", "image/png"),
            Err(ResizeError::Image(_))
        ));
    }
}
