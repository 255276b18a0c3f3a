//! Core types for background removal operations

use crate::{
    config::{Level, OutputFormat},
    error::{MatteError, Result},
    services::{ImageIOService, OutputFormatHandler},
};
use chrono::{DateTime, Utc};
use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Row-major RGBA8 raster whose length always equals `width * height * 4`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Bytes per pixel
    pub const CHANNELS: usize = 4;

    /// Wrap raw RGBA bytes, rejecting data that does not match the dimensions
    ///
    /// # Errors
    /// Returns [`MatteError::InvalidDimensions`] when `data.len() != width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        match Self::expected_len(width, height) {
            Some(expected) if expected == data.len() => Ok(Self {
                width,
                height,
                data,
            }),
            expected => Err(MatteError::InvalidDimensions {
                width,
                height,
                expected: expected.unwrap_or(usize::MAX),
                actual: data.len(),
            }),
        }
    }

    /// A buffer filled with one color
    #[must_use]
    pub fn from_pixel(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            data: rgba.repeat(pixels),
        }
    }

    /// Caller guarantees `data.len() == width * height * 4`
    pub(crate) fn from_raw_parts_unchecked(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(Self::expected_len(width, height), Some(data.len()));
        Self {
            width,
            height,
            data,
        }
    }

    fn expected_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(Self::CHANNELS)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.data.len() / Self::CHANNELS
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at a linear (row-major) pixel index
    #[must_use]
    pub fn pixel_at(&self, index: usize) -> [u8; 4] {
        let i = index * Self::CHANNELS;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Pixel at `(x, y)`
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixel_at(y as usize * self.width as usize + x as usize)
    }

    #[must_use]
    pub fn alpha_at(&self, index: usize) -> u8 {
        self.data[index * Self::CHANNELS + 3]
    }

    pub(crate) fn set_alpha(&mut self, index: usize, alpha: u8) {
        self.data[index * Self::CHANNELS + 3] = alpha;
    }

    /// Iterate pixels as 4-byte slices in row-major order
    pub fn pixels(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(Self::CHANNELS)
    }

    /// Copy of the alpha channel, one byte per pixel
    #[must_use]
    pub fn alpha_channel(&self) -> Vec<u8> {
        self.pixels().map(|px| px[3]).collect()
    }

    /// Convert into an `image` crate buffer
    ///
    /// # Errors
    /// Only fails if the length invariant was broken, which construction prevents.
    pub fn into_rgba_image(self) -> Result<RgbaImage> {
        let (width, height) = (self.width, self.height);
        RgbaImage::from_raw(width, height, self.data).ok_or_else(|| {
            MatteError::processing(format!("Failed to build {width}x{height} RGBA image"))
        })
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

/// Per-pixel background mask
///
/// One byte per pixel: [`SegmentationMask::BACKGROUND`] where the pixel was
/// classified as removable background, `0` elsewhere. Stored this way so it
/// can be viewed directly as a grayscale image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationMask {
    /// Mask data, row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Value stored for background pixels
    pub const BACKGROUND: u8 = 255;

    /// Create a new segmentation mask
    #[must_use]
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// A mask with nothing marked
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(vec![0; width as usize * height as usize], (width, height))
    }

    #[must_use]
    pub fn is_background(&self, index: usize) -> bool {
        self.data[index] != 0
    }

    #[must_use]
    pub fn is_background_at(&self, x: u32, y: u32) -> bool {
        self.is_background(y as usize * self.dimensions.0 as usize + x as usize)
    }

    pub(crate) fn mark(&mut self, index: usize) {
        self.data[index] = Self::BACKGROUND;
    }

    /// Number of pixels marked as background
    #[must_use]
    pub fn background_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Whether this mask describes the same raster as `buffer`
    #[must_use]
    pub fn matches(&self, buffer: &PixelBuffer) -> bool {
        self.dimensions == buffer.dimensions() && self.data.len() == buffer.pixel_count()
    }

    /// Fail with [`MatteError::DimensionMismatch`] unless the mask matches `buffer`
    pub(crate) fn ensure_matches(&self, buffer: &PixelBuffer) -> Result<()> {
        if self.matches(buffer) {
            Ok(())
        } else {
            Err(MatteError::DimensionMismatch {
                buffer: buffer.dimensions(),
                mask: self.dimensions,
            })
        }
    }

    /// Convert mask to a grayscale image
    pub fn to_image(&self) -> Result<GrayImage> {
        let (width, height) = self.dimensions;
        GrayImage::from_raw(width, height, self.data.clone())
            .ok_or_else(|| MatteError::processing("Failed to create image from mask data"))
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let background_pixels = self.background_count();
        let foreground_pixels = total_pixels - background_pixels;
        let ratio = |count: usize| {
            if total_pixels == 0 {
                0.0
            } else {
                count as f32 / total_pixels as f32
            }
        };

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels,
            foreground_ratio: ratio(foreground_pixels),
            background_ratio: ratio(background_pixels),
        }
    }

    /// Save mask as PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let image = self.to_image()?;
        ImageIOService::ensure_parent_dir(path.as_ref())?;
        image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}

/// Inclusive pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    /// Columns covered, `0` for an inverted box
    #[must_use]
    pub fn width(&self) -> u32 {
        self.right
            .checked_sub(self.left)
            .map_or(0, |span| span.saturating_add(1))
    }

    /// Rows covered, `0` for an inverted box
    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom
            .checked_sub(self.top)
            .map_or(0, |span| span.saturating_add(1))
    }

    /// Non-inverted and inside a `width x height` raster
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.left <= self.right
            && self.top <= self.bottom
            && self.right < width
            && self.bottom < height
    }

    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.left..=self.right).contains(&x) && (self.top..=self.bottom).contains(&y)
    }

    /// Grow by `padding` on every side, clamped to a `width x height` raster
    #[must_use]
    pub fn expand(&self, padding: u32, width: u32, height: u32) -> Self {
        Self {
            left: self.left.saturating_sub(padding),
            top: self.top.saturating_sub(padding),
            right: self
                .right
                .saturating_add(padding)
                .min(width.saturating_sub(1)),
            bottom: self
                .bottom
                .saturating_add(padding)
                .min(height.saturating_sub(1)),
        }
    }
}

/// Detailed timing breakdown for one image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image decoding from bytes or file
    pub image_decode_ms: u64,

    /// Orientation, resizing and RGBA conversion
    pub preprocessing_ms: u64,

    /// Segmentation, carving, feathering and decontamination
    pub matting_ms: u64,

    /// Bounding-box crop
    pub crop_ms: u64,

    /// Final image encoding (if saving to file)
    pub image_encode_ms: Option<u64>,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time not attributed to any measured stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.image_decode_ms
            + self.preprocessing_ms
            + self.matting_ms
            + self.crop_ms
            + self.image_encode_ms.unwrap_or(0);
        self.total_ms.saturating_sub(measured)
    }

    /// Get breakdown percentages
    #[must_use]
    pub fn breakdown_percentages(&self) -> TimingBreakdown {
        if self.total_ms == 0 {
            return TimingBreakdown::default();
        }

        let total = self.total_ms as f64;
        let pct = |ms: u64| (ms as f64 / total) * 100.0;

        TimingBreakdown {
            decode_pct: pct(self.image_decode_ms),
            preprocessing_pct: pct(self.preprocessing_ms),
            matting_pct: pct(self.matting_ms),
            crop_pct: pct(self.crop_ms),
            encode_pct: pct(self.image_encode_ms.unwrap_or(0)),
            other_pct: pct(self.other_overhead_ms()),
        }
    }
}

/// Percentage breakdown of processing time
#[derive(Debug, Clone, Default)]
pub struct TimingBreakdown {
    pub decode_pct: f64,
    pub preprocessing_pct: f64,
    pub matting_pct: f64,
    pub crop_pct: f64,
    pub encode_pct: f64,
    pub other_pct: f64,
}

/// Metadata recorded alongside a processed image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Level used, or `None` when background removal was disabled
    pub level: Option<Level>,

    /// Pixels carved away as background
    pub masked_pixels: usize,

    /// Pixels in the matted raster (before cropping)
    pub total_pixels: usize,

    /// Crop rectangle in matted-raster coordinates, when cropping changed the image
    pub crop: Option<BoundingBox>,

    /// Stage timings
    pub timings: ProcessingTimings,

    /// When processing finished
    pub processed_at: DateTime<Utc>,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new(level: Option<Level>) -> Self {
        Self {
            level,
            masked_pixels: 0,
            total_pixels: 0,
            crop: None,
            timings: ProcessingTimings::new(),
            processed_at: Utc::now(),
        }
    }

    /// Share of pixels removed as background
    #[must_use]
    pub fn masked_ratio(&self) -> f64 {
        if self.total_pixels == 0 {
            0.0
        } else {
            self.masked_pixels as f64 / self.total_pixels as f64
        }
    }
}

/// Result of a background removal operation
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// The processed RGBA image
    pub image: RgbaImage,

    /// The segmentation mask, when background removal ran
    pub mask: Option<SegmentationMask>,

    /// Dimensions of the decoded input, before orientation and resizing
    pub original_dimensions: (u32, u32),

    /// Processing metadata
    pub metadata: ProcessingMetadata,

    /// Original input path (for logging purposes)
    pub input_path: Option<String>,
}

impl RemovalResult {
    /// Create a new removal result
    #[must_use]
    pub fn new(
        image: RgbaImage,
        mask: Option<SegmentationMask>,
        original_dimensions: (u32, u32),
        metadata: ProcessingMetadata,
    ) -> Self {
        Self {
            image,
            mask,
            original_dimensions,
            metadata,
            input_path: None,
        }
    }

    /// Attach the path the image was read from
    #[must_use]
    pub fn with_input_path<S: Into<String>>(mut self, input_path: S) -> Self {
        self.input_path = Some(input_path.into());
        self
    }

    /// Get image dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Get the image as raw RGBA bytes
    #[must_use]
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.image.as_raw().clone()
    }

    /// True when nothing survived matting
    #[must_use]
    pub fn is_fully_transparent(&self) -> bool {
        self.image.pixels().all(|p| p[3] == 0)
    }

    /// Get detailed timing breakdown
    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }

    /// Get the image as encoded bytes in the specified format
    pub fn to_bytes(&self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        OutputFormatHandler::encode(&self.image, format, quality)
    }

    /// Save in the specified format
    pub fn save<P: AsRef<Path>>(&self, path: P, format: OutputFormat, quality: u8) -> Result<()> {
        let bytes = self.to_bytes(format, quality)?;
        ImageIOService::write_bytes(path, &bytes)
    }

    /// Save the result as PNG with alpha channel
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save(path, OutputFormat::Png, 100)
    }

    /// Save and record the encoding time in the metadata
    pub fn save_timed<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let path_str = path.as_ref().display().to_string();
        let encode_start = instant::Instant::now();
        self.save(&path, format, quality)?;
        let encode_ms = encode_start.elapsed().as_millis() as u64;

        self.metadata.timings.image_encode_ms = Some(encode_ms);
        self.metadata.timings.total_ms += encode_ms;

        let input_path = self.input_path.as_deref().unwrap_or("input");
        info!(
            encode_ms,
            "Processed: {} -> {} in {:.2}s",
            input_path,
            path_str,
            self.metadata.timings.total_ms as f64 / 1000.0
        );

        Ok(())
    }
}
