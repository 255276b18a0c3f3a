//! Image preparation ahead of matting
//!
//! Bounds the working size and settles on an RGBA8 layout so every
//! decoder output reaches the passes in the same shape.

use crate::{error::Result, types::PixelBuffer};
use image::{imageops::FilterType, DynamicImage};
use tracing::debug;

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Dimensions after fitting inside `max_dimension x max_dimension`
    ///
    /// Never enlarges; aspect ratio is kept and each side is at least 1.
    /// A bound of 0 is treated as 1.
    ///
    /// ```rust
    /// use product_matte::utils::ImagePreprocessor;
    ///
    /// assert_eq!(ImagePreprocessor::fitted_dimensions(3200, 1600, 1600), (1600, 800));
    /// assert_eq!(ImagePreprocessor::fitted_dimensions(800, 600, 1600), (800, 600));
    /// ```
    #[must_use]
    pub fn fitted_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
        let max_dimension = max_dimension.max(1);
        if width <= max_dimension && height <= max_dimension {
            return (width, height);
        }
        let scale = f64::from(max_dimension) / f64::from(width.max(height));
        let fit = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, max_dimension);
        (fit(width), fit(height))
    }

    /// Downscale with Lanczos3 when either side exceeds `max_dimension`
    #[must_use]
    pub fn fit_within(image: DynamicImage, max_dimension: Option<u32>) -> DynamicImage {
        let Some(max_dimension) = max_dimension else {
            return image;
        };
        let (width, height) = (image.width(), image.height());
        let (target_w, target_h) = Self::fitted_dimensions(width, height, max_dimension);
        if (target_w, target_h) == (width, height) {
            return image;
        }

        debug!(
            from_width = width,
            from_height = height,
            to_width = target_w,
            to_height = target_h,
            "Downscaling oversized input"
        );
        image.resize_exact(target_w, target_h, FilterType::Lanczos3)
    }

    /// Bound the size and convert to an RGBA pixel buffer
    #[must_use]
    pub fn prepare(image: DynamicImage, max_dimension: Option<u32>) -> PixelBuffer {
        PixelBuffer::from(Self::fit_within(image, max_dimension).into_rgba8())
    }

    /// Bound the size of an already decoded pixel buffer
    ///
    /// # Errors
    /// Only fails if the buffer's length invariant was broken.
    pub fn fit_buffer(buffer: PixelBuffer, max_dimension: Option<u32>) -> Result<PixelBuffer> {
        let (width, height) = buffer.dimensions();
        let fits = max_dimension.map_or(true, |max| {
            Self::fitted_dimensions(width, height, max) == (width, height)
        });
        if fits {
            return Ok(buffer);
        }
        let image = DynamicImage::ImageRgba8(buffer.into_rgba_image()?);
        Ok(Self::prepare(image, max_dimension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_fitted_dimensions() {
        assert_eq!(ImagePreprocessor::fitted_dimensions(1600, 1600, 1600), (1600, 1600));
        assert_eq!(ImagePreprocessor::fitted_dimensions(1000, 4000, 1600), (400, 1600));
        assert_eq!(ImagePreprocessor::fitted_dimensions(5000, 1, 100), (100, 1));
    }

    #[test]
    fn test_fit_within_never_enlarges() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(40, 20));
        let out = ImagePreprocessor::fit_within(image, Some(100));
        assert_eq!((out.width(), out.height()), (40, 20));
    }

    #[test]
    fn test_zero_bound_does_not_panic() {
        assert_eq!(ImagePreprocessor::fitted_dimensions(40, 20, 0), (1, 1));
    }

    #[test]
    fn test_fit_buffer() {
        let small = PixelBuffer::from_pixel(30, 10, [1, 2, 3, 200]);
        let same = ImagePreprocessor::fit_buffer(small.clone(), Some(30)).unwrap();
        assert_eq!(same, small);

        let bounded = ImagePreprocessor::fit_buffer(small, Some(15)).unwrap();
        assert_eq!(bounded.dimensions(), (15, 5));
        assert_eq!(bounded.pixel(7, 2)[3], 200);
    }

    #[test]
    fn test_fit_within_disabled() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(400, 200));
        let out = ImagePreprocessor::fit_within(image, None);
        assert_eq!((out.width(), out.height()), (400, 200));
    }

    #[test]
    fn test_prepare_adds_opaque_alpha() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(60, 30, Rgb([9, 8, 7])));
        let buffer = ImagePreprocessor::prepare(image, Some(20));
        assert_eq!(buffer.dimensions(), (20, 10));
        assert!(buffer.pixels().all(|px| px[3] == 255));
    }
}
