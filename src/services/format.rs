//! Output format handling service
//!
//! Keeps encoding decisions (extension, transparency, JPEG flattening)
//! out of the processor.

use crate::{
    config::OutputFormat,
    error::{MatteError, Result},
};
use image::{codecs::jpeg::JpegEncoder, ImageFormat, Rgb, RgbImage, RgbaImage};
use std::io::Cursor;
use tracing::warn;

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Composite an RGBA image over an opaque white backdrop
    ///
    /// JPEG has no alpha, so transparent areas become white rather than
    /// revealing whatever color was left under them.
    ///
    /// # Examples
    /// ```rust
    /// use product_matte::services::OutputFormatHandler;
    /// use image::{Rgba, RgbaImage};
    ///
    /// let clear = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
    /// let flat = OutputFormatHandler::flatten_over_white(&clear);
    /// assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    /// ```
    #[must_use]
    pub fn flatten_over_white(rgba_image: &RgbaImage) -> RgbImage {
        let (width, height) = rgba_image.dimensions();
        let mut rgb_image = RgbImage::new(width, height);

        for (src, dst) in rgba_image.pixels().zip(rgb_image.pixels_mut()) {
            let alpha = f32::from(src[3]) / 255.0;
            let blend = |c: u8| (f32::from(c) * alpha + 255.0 * (1.0 - alpha)).round() as u8;
            *dst = Rgb([blend(src[0]), blend(src[1]), blend(src[2])]);
        }

        rgb_image
    }

    /// Encode an RGBA image into the bytes of the requested format
    ///
    /// `quality` only affects JPEG; WebP is written lossless.
    ///
    /// # Errors
    /// Returns [`MatteError::UnsupportedFormat`] for WebP when built without
    /// `webp-support`, and [`MatteError::Image`] when the encoder fails.
    pub fn encode(rgba_image: &RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        match format {
            OutputFormat::Rgba8 => bytes.extend_from_slice(rgba_image.as_raw()),
            OutputFormat::Jpeg => {
                let rgb = Self::flatten_over_white(rgba_image);
                let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.min(100));
                rgb.write_with_encoder(encoder)?;
            },
            OutputFormat::Png => {
                rgba_image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
            },
            OutputFormat::Tiff => {
                rgba_image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Tiff)?;
            },
            OutputFormat::WebP => {
                if !cfg!(feature = "webp-support") {
                    return Err(MatteError::unsupported_format(
                        "WebP output requires the webp-support feature",
                    ));
                }
                rgba_image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::WebP)?;
            },
        }
        Ok(bytes)
    }

    /// Get the appropriate file extension for a given output format
    ///
    /// ```rust
    /// use product_matte::{services::OutputFormatHandler, config::OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Rgba8 => "raw",
        }
    }

    /// Guess an output format from a file extension
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<OutputFormat> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::WebP),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            "raw" | "rgba" => Some(OutputFormat::Rgba8),
            _ => None,
        }
    }

    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        !matches!(format, OutputFormat::Jpeg)
    }

    /// Warn when the chosen format will lose the carved transparency
    pub fn validate_for_background_removal(format: OutputFormat) {
        if !Self::supports_transparency(format) {
            warn!(
                %format,
                "Output format does not support transparency; removed background will be flattened to white"
            );
        }
    }
}
