//! Bounding-box cropping around visible content

use crate::{
    error::{MatteError, Result},
    types::{BoundingBox, PixelBuffer},
};

/// Pixels with alpha above this count as visible
pub const VISIBILITY_THRESHOLD: u8 = 8;

/// Tightest box around pixels with alpha > [`VISIBILITY_THRESHOLD`]
#[must_use]
pub fn content_bounds(buffer: &PixelBuffer) -> Option<BoundingBox> {
    let width = buffer.width() as usize;
    if width == 0 {
        return None;
    }

    let mut bounds: Option<BoundingBox> = None;
    for (index, pixel) in buffer.pixels().enumerate() {
        if pixel[3] <= VISIBILITY_THRESHOLD {
            continue;
        }
        let x = (index % width) as u32;
        let y = (index / width) as u32;
        bounds = Some(match bounds {
            None => BoundingBox {
                left: x,
                top: y,
                right: x,
                bottom: y,
            },
            Some(b) => BoundingBox {
                left: b.left.min(x),
                top: b.top.min(y),
                right: b.right.max(x),
                bottom: b.bottom.max(y),
            },
        });
    }
    bounds
}

/// Padded crop box, or `None` when nothing is visible
#[must_use]
pub fn padded_content_bounds(buffer: &PixelBuffer, padding: u32) -> Option<BoundingBox> {
    content_bounds(buffer).map(|b| b.expand(padding, buffer.width(), buffer.height()))
}

/// Copy the pixels inside `region` into a new buffer
///
/// # Errors
/// Returns [`MatteError::InvalidRegion`] when `region` is inverted or does
/// not lie within the buffer.
pub fn crop_region(buffer: &PixelBuffer, region: BoundingBox) -> Result<PixelBuffer> {
    let (width, height) = buffer.dimensions();
    if !region.fits_within(width, height) {
        return Err(MatteError::InvalidRegion {
            left: region.left,
            top: region.top,
            right: region.right,
            bottom: region.bottom,
            width,
            height,
        });
    }
    Ok(crop_region_unchecked(buffer, region))
}

/// Caller guarantees `region` fits within `buffer`
pub(crate) fn crop_region_unchecked(buffer: &PixelBuffer, region: BoundingBox) -> PixelBuffer {
    let stride = buffer.width() as usize * PixelBuffer::CHANNELS;
    let row_start = region.left as usize * PixelBuffer::CHANNELS;
    let row_end = (region.right as usize + 1) * PixelBuffer::CHANNELS;

    let mut data = Vec::with_capacity(region.width() as usize * region.height() as usize * 4);
    for row in buffer
        .as_raw()
        .chunks_exact(stride)
        .skip(region.top as usize)
        .take(region.height() as usize)
    {
        data.extend_from_slice(&row[row_start..row_end]);
    }

    PixelBuffer::from_raw_parts_unchecked(region.width(), region.height(), data)
}

/// Trim to visible content plus `padding`, clamped to the image
///
/// A buffer with no visible pixels comes back unchanged.
#[must_use]
pub fn crop_to_content(buffer: PixelBuffer, padding: u32) -> PixelBuffer {
    match padded_content_bounds(&buffer, padding) {
        Some(region) => crop_region_unchecked(&buffer, region),
        None => buffer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_dot(width: u32, height: u32, x: u32, y: u32, alpha: u8) -> PixelBuffer {
        let mut buffer = PixelBuffer::from_pixel(width, height, [255, 255, 255, 0]);
        let index = (y * width + x) as usize;
        buffer.set_alpha(index, alpha);
        buffer
    }

    #[test]
    fn test_bounds_ignore_faint_pixels() {
        assert_eq!(content_bounds(&with_dot(5, 5, 2, 2, 8)), None);
        assert_eq!(
            content_bounds(&with_dot(5, 5, 2, 3, 9)),
            Some(BoundingBox {
                left: 2,
                top: 3,
                right: 2,
                bottom: 3
            })
        );
    }

    #[test]
    fn test_crop_with_padding_clamps() {
        let cropped = crop_to_content(with_dot(10, 10, 1, 8, 255), 3);
        // x: 0..=4, y: 5..=9
        assert_eq!(cropped.dimensions(), (5, 5));
        assert_eq!(cropped.alpha_at(3 * 5 + 1), 255);
    }

    #[test]
    fn test_crop_zero_padding_is_tight() {
        let mut buffer = with_dot(6, 4, 1, 1, 200);
        buffer.set_alpha(2 * 6 + 4, 100);
        let cropped = crop_to_content(buffer, 0);
        assert_eq!(cropped.dimensions(), (4, 2));
        assert_eq!(cropped.alpha_at(0), 200);
        assert_eq!(cropped.alpha_at(7), 100);
    }

    #[test]
    fn test_invisible_buffer_unchanged() {
        let buffer = PixelBuffer::from_pixel(4, 3, [255, 255, 255, 0]);
        let cropped = crop_to_content(buffer.clone(), 6);
        assert_eq!(cropped, buffer);
    }

    #[test]
    fn test_crop_region_copies_rows() {
        let mut buffer = PixelBuffer::from_pixel(4, 4, [0, 0, 0, 0]);
        buffer.set_alpha(2 * 4 + 2, 77);
        let region = BoundingBox {
            left: 1,
            top: 1,
            right: 3,
            bottom: 2,
        };
        let cropped = crop_region(&buffer, region).unwrap();
        assert_eq!(cropped.dimensions(), (3, 2));
        assert_eq!(cropped.as_raw().len(), 3 * 2 * 4);
        assert_eq!(cropped.alpha_at(3 + 1), 77);
    }

    #[test]
    fn test_crop_region_rejects_out_of_bounds() {
        let buffer = PixelBuffer::from_pixel(4, 4, [0, 0, 0, 255]);
        let region = BoundingBox {
            left: 1,
            top: 2,
            right: 3,
            bottom: 6,
        };
        assert!(matches!(
            crop_region(&buffer, region),
            Err(MatteError::InvalidRegion {
                bottom: 6,
                height: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_full_coverage_keeps_size() {
        let buffer = PixelBuffer::from_pixel(4, 3, [1, 2, 3, 255]);
        assert_eq!(crop_to_content(buffer.clone(), 2), buffer);
    }
}
