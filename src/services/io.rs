//! Image I/O operations service
//!
//! File and byte handling lives here so the processor only sees decoded pixels.

use crate::error::{MatteError, Result};
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::{io::Cursor, path::Path};
use tracing::debug;

/// A decoded image plus what decoding learned about it
#[derive(Debug)]
pub struct DecodedImage {
    pub image: DynamicImage,
    /// Container format detected from the bytes
    pub format: Option<ImageFormat>,
    /// Dimensions as stored, before any orientation is applied
    pub stored_dimensions: (u32, u32),
}

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Input file extensions the decoder accepts, lower case
    pub const SUPPORTED_EXTENSIONS: [&'static str; 7] =
        ["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif"];

    /// Read the raw bytes of an image file
    ///
    /// # Errors
    /// Returns [`MatteError::Io`] with the path in the message.
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();
        std::fs::read(path_ref)
            .map_err(|e| MatteError::file_io_error("read image file", path_ref, &e))
    }

    /// Decode image bytes, sniffing the format from content
    ///
    /// When `auto_orient` is set, the EXIF orientation tag (if any) is applied
    /// so the returned pixels are upright.
    ///
    /// ```rust
    /// use product_matte::services::ImageIOService;
    ///
    /// assert!(ImageIOService::decode(&[], true).is_err());
    /// ```
    pub fn decode(bytes: &[u8], auto_orient: bool) -> Result<DecodedImage> {
        if bytes.is_empty() {
            return Err(MatteError::EmptyInput);
        }

        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader.format();
        let mut decoder = reader.into_decoder()?;
        let orientation = if auto_orient {
            Some(decoder.orientation()?)
        } else {
            None
        };

        let mut image = DynamicImage::from_decoder(decoder)?;
        let stored_dimensions = (image.width(), image.height());
        if let Some(orientation) = orientation {
            debug!(?orientation, "Applying stored orientation");
            image.apply_orientation(orientation);
        }

        Ok(DecodedImage {
            image,
            format,
            stored_dimensions,
        })
    }

    /// Write bytes to a file, creating parent directories as needed
    pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();
        Self::ensure_parent_dir(path_ref)?;
        std::fs::write(path_ref, bytes)
            .map_err(|e| MatteError::file_io_error("write output", path_ref, &e))
    }

    /// Create the parent directory of `path` if it is missing
    pub fn ensure_parent_dir(path: &Path) -> Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
                .map_err(|e| MatteError::file_io_error("create output directory", parent, &e)),
            _ => Ok(()),
        }
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                Self::SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
            })
    }

    /// Sniff a container format from magic bytes
    #[must_use]
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_is_supported_format() {
        assert!(ImageIOService::is_supported_format("photo.JPG"));
        assert!(ImageIOService::is_supported_format("dir/shot.webp"));
        assert!(ImageIOService::is_supported_format("dir/b.tif"));
        assert!(!ImageIOService::is_supported_format("c.gif"));
        assert!(!ImageIOService::is_supported_format("notes.txt"));
        assert!(!ImageIOService::is_supported_format("no_extension"));
    }

    #[test]
    fn test_decode_empty_is_rejected() {
        assert!(matches!(
            ImageIOService::decode(&[], true),
            Err(MatteError::EmptyInput)
        ));
    }

    #[test]
    fn test_decode_garbage_is_image_error() {
        let err = ImageIOService::decode(b"definitely not an image", false).unwrap_err();
        assert!(matches!(err, MatteError::Image(_)));
    }

    #[test]
    fn test_decode_png() {
        let source = RgbaImage::from_pixel(5, 3, Rgba([1, 2, 3, 4]));
        let decoded = ImageIOService::decode(&png_bytes(&source), true).unwrap();
        assert_eq!(decoded.format, Some(ImageFormat::Png));
        assert_eq!(decoded.stored_dimensions, (5, 3));
        assert_eq!(decoded.image.to_rgba8(), source);
    }

    #[test]
    fn test_write_bytes_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/deeper/out.bin");
        ImageIOService::write_bytes(&path, b"abc").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let err = ImageIOService::read_bytes("/definitely/missing/file.png").unwrap_err();
        assert!(err.to_string().contains("/definitely/missing/file.png"));
    }

    #[test]
    fn test_detect_format() {
        let bytes = png_bytes(&RgbaImage::new(1, 1));
        assert_eq!(ImageIOService::detect_format(&bytes), Some(ImageFormat::Png));
        assert_eq!(ImageIOService::detect_format(b"xx"), None);
    }
}
