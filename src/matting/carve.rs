//! Alpha carving: masked pixels become fully transparent

use crate::{error::Result, types::PixelBuffer, types::SegmentationMask};

/// Zero the alpha of every masked pixel, leaving color channels untouched
///
/// # Errors
/// Returns [`crate::MatteError::DimensionMismatch`] when the mask was built
/// for a different raster.
pub fn carve_alpha(buffer: &mut PixelBuffer, mask: &SegmentationMask) -> Result<usize> {
    mask.ensure_matches(buffer)?;
    Ok(carve_alpha_unchecked(buffer, mask))
}

/// Caller guarantees `mask` matches `buffer`
pub(crate) fn carve_alpha_unchecked(buffer: &mut PixelBuffer, mask: &SegmentationMask) -> usize {
    let mut carved = 0;
    for (index, &value) in mask.data.iter().enumerate() {
        if value != 0 {
            buffer.set_alpha(index, 0);
            carved += 1;
        }
    }
    carved
}
