//! White-background matting passes
//!
//! The passes run in a fixed order on one owned buffer:
//!
//! 1. [`segment::segment_background`] floods the border-connected backdrop into a mask
//! 2. [`carve::carve_alpha`] zeroes alpha under the mask
//! 3. [`feather::feather_edges`] caps alpha of light pixels touching the mask
//! 4. [`decontaminate::decontaminate`] un-mixes white from partially transparent pixels
//!
//! [`crop::crop_to_content`] is independent and may run on any buffer.
//!
//! Nothing here touches files, codecs or host types, so the batch processor
//! and the browser preview both call into this module and produce identical pixels.

pub mod carve;
pub mod classify;
pub mod crop;
pub mod decontaminate;
pub mod feather;
pub mod segment;

pub use crop::crop_to_content;

use crate::{
    config::Level,
    types::{PixelBuffer, SegmentationMask},
};
use serde::Serialize;
use tracing::debug;

/// One step of [`remove_background_with_report`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MattingPass {
    Segmentation,
    AlphaCarving,
    Feathering,
    Decontamination,
}

impl MattingPass {
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Segmentation => "Finding border-connected background",
            Self::AlphaCarving => "Carving background to transparent",
            Self::Feathering => "Feathering edges",
            Self::Decontamination => "Removing white fringe",
        }
    }
}

/// Pixel counts gathered while matting one buffer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MattingReport {
    pub total_pixels: usize,
    pub masked_pixels: usize,
    pub feathered_pixels: usize,
    pub decontaminated_pixels: usize,
}

impl MattingReport {
    /// Every pixel was classified as background
    ///
    /// Not an error: the caller decides whether to warn about it.
    #[must_use]
    pub fn is_fully_background(&self) -> bool {
        self.total_pixels > 0 && self.masked_pixels == self.total_pixels
    }

    #[must_use]
    pub fn masked_ratio(&self) -> f64 {
        if self.total_pixels == 0 {
            0.0
        } else {
            self.masked_pixels as f64 / self.total_pixels as f64
        }
    }
}

/// Strip the light backdrop from `buffer`; dimensions are preserved
#[must_use]
pub fn remove_background(buffer: PixelBuffer, level: Level) -> PixelBuffer {
    remove_background_with_report(buffer, level, |_| {}).0
}

/// [`remove_background`] that also returns the mask and pixel counts
///
/// `on_pass` is called before each pass starts.
pub fn remove_background_with_report<F>(
    mut buffer: PixelBuffer,
    level: Level,
    mut on_pass: F,
) -> (PixelBuffer, SegmentationMask, MattingReport)
where
    F: FnMut(MattingPass),
{
    let profile = level.profile();
    let mut report = MattingReport {
        total_pixels: buffer.pixel_count(),
        ..MattingReport::default()
    };

    on_pass(MattingPass::Segmentation);
    let mask = segment::segment_background(&buffer, profile);

    on_pass(MattingPass::AlphaCarving);
    report.masked_pixels = carve::carve_alpha_unchecked(&mut buffer, &mask);

    on_pass(MattingPass::Feathering);
    report.feathered_pixels = feather::feather_edges_unchecked(&mut buffer, &mask, profile);

    on_pass(MattingPass::Decontamination);
    report.decontaminated_pixels = decontaminate::decontaminate(&mut buffer);

    debug!(
        %level,
        width = buffer.width(),
        height = buffer.height(),
        masked = report.masked_pixels,
        feathered = report.feathered_pixels,
        decontaminated = report.decontaminated_pixels,
        "Matting passes complete"
    );

    (buffer, mask, report)
}
