//! Edge feathering for near-background pixels touching the carved region

use super::classify::is_feather_candidate;
use crate::{
    config::LevelProfile,
    error::Result,
    types::{PixelBuffer, SegmentationMask},
};

/// Cap the alpha of light, neutral interior pixels that border the mask
///
/// The outermost ring is never examined. Only the mask is read, so the
/// result does not depend on scan order. Returns how many pixels were capped.
///
/// # Errors
/// Returns [`crate::MatteError::DimensionMismatch`] when the mask was built
/// for a different raster.
pub fn feather_edges(
    buffer: &mut PixelBuffer,
    mask: &SegmentationMask,
    profile: &LevelProfile,
) -> Result<usize> {
    mask.ensure_matches(buffer)?;
    Ok(feather_edges_unchecked(buffer, mask, profile))
}

/// Caller guarantees `mask` matches `buffer`
pub(crate) fn feather_edges_unchecked(
    buffer: &mut PixelBuffer,
    mask: &SegmentationMask,
    profile: &LevelProfile,
) -> usize {
    let (width, height) = buffer.dimensions();
    let w = width as usize;
    let h = height as usize;
    if w < 3 || h < 3 {
        return 0;
    }

    let mut feathered = 0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let index = y * w + x;
            if mask.is_background(index) || buffer.alpha_at(index) == 0 {
                continue;
            }

            let touches_background = mask.is_background(index + 1)
                || mask.is_background(index - 1)
                || mask.is_background(index + w)
                || mask.is_background(index - w);
            if !touches_background {
                continue;
            }

            let pixel = buffer.pixel_at(index);
            if is_feather_candidate(pixel, profile) {
                buffer.set_alpha(index, pixel[3].min(profile.feather_alpha));
                feathered += 1;
            }
        }
    }
    feathered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Level;

    fn three_by_three(center: [u8; 4]) -> PixelBuffer {
        let mut buffer = PixelBuffer::from_pixel(3, 3, [0, 0, 0, 255]);
        buffer.as_raw_mut()[16..20].copy_from_slice(&center);
        buffer
    }

    #[test]
    fn test_feathers_light_neighbor_of_mask() {
        let profile = Level::Medium.profile();
        let mut buffer = three_by_three([225, 225, 225, 255]);
        let mut mask = SegmentationMask::empty(3, 3);
        mask.mark(1);

        assert_eq!(feather_edges(&mut buffer, &mask, profile).unwrap(), 1);
        assert_eq!(buffer.alpha_at(4), profile.feather_alpha);
    }

    #[test]
    fn test_never_raises_alpha() {
        let profile = Level::Medium.profile();
        let mut buffer = three_by_three([225, 225, 225, 40]);
        let mut mask = SegmentationMask::empty(3, 3);
        mask.mark(3);

        feather_edges(&mut buffer, &mask, profile).unwrap();
        assert_eq!(buffer.alpha_at(4), 40);
    }

    #[test]
    fn test_ignores_pixels_away_from_mask() {
        let profile = Level::High.profile();
        let mut buffer = three_by_three([230, 230, 230, 255]);
        let mask = SegmentationMask::empty(3, 3);

        assert_eq!(feather_edges(&mut buffer, &mask, profile).unwrap(), 0);
        assert_eq!(buffer.alpha_at(4), 255);
    }

    #[test]
    fn test_skips_saturated_and_transparent() {
        let profile = Level::High.profile();
        let mut mask = SegmentationMask::empty(3, 3);
        mask.mark(5);

        let mut saturated = three_by_three([230, 120, 120, 255]);
        feather_edges(&mut saturated, &mask, profile).unwrap();
        assert_eq!(saturated.alpha_at(4), 255);

        let mut clear = three_by_three([230, 230, 230, 0]);
        assert_eq!(feather_edges(&mut clear, &mask, profile).unwrap(), 0);
    }

    #[test]
    fn test_border_ring_untouched() {
        let profile = Level::Medium.profile();
        let mut buffer = PixelBuffer::from_pixel(2, 2, [225, 225, 225, 255]);
        let mut mask = SegmentationMask::empty(2, 2);
        mask.mark(0);

        assert_eq!(feather_edges(&mut buffer, &mask, profile).unwrap(), 0);
        assert_eq!(buffer.alpha_channel(), vec![255; 4]);
    }

    #[test]
    fn test_rejects_mismatched_mask() {
        let profile = Level::Medium.profile();
        let mut buffer = PixelBuffer::from_pixel(5, 5, [255, 255, 255, 255]);
        let mask = SegmentationMask::new(vec![0; 4], (2, 2));
        assert!(matches!(
            feather_edges(&mut buffer, &mask, profile),
            Err(crate::MatteError::DimensionMismatch {
                buffer: (5, 5),
                mask: (2, 2)
            })
        ));
        assert_eq!(buffer.alpha_channel(), vec![255; 25]);
    }
}
