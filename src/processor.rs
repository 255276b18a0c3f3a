//! Production background removal processor
//!
//! `BackgroundRemovalProcessor` owns the decode, orient, resize, matte and
//! crop sequence. The CLI drives it per file; library users can drive it
//! with bytes, decoded images or raw pixel buffers.

use crate::{
    config::RemovalConfig,
    error::Result,
    matting::{self, MattingReport},
    services::{
        ImageIOService, NoOpProgressReporter, ProcessingStage, ProgressReporter, ProgressTracker,
    },
    types::{
        BoundingBox, PixelBuffer, ProcessingMetadata, ProcessingTimings, RemovalResult,
        SegmentationMask,
    },
    utils::ImagePreprocessor,
};
use image::DynamicImage;
use instant::Instant;
use std::{path::Path, sync::Arc};
use tracing::{debug, info, instrument, warn};

/// Output of the matting and cropping steps on one buffer
struct MattedBuffer {
    buffer: PixelBuffer,
    mask: Option<SegmentationMask>,
    report: MattingReport,
    crop: Option<BoundingBox>,
}

/// Unified processor shared by every front end
///
/// Processing methods take `&self`, so one processor can be wrapped in an
/// `Arc` and used from several worker threads at once.
pub struct BackgroundRemovalProcessor {
    config: RemovalConfig,
    reporter: Arc<dyn ProgressReporter>,
}

impl BackgroundRemovalProcessor {
    /// Create a processor after validating `config`
    ///
    /// # Errors
    /// Returns [`crate::MatteError::InvalidConfig`] for out-of-range settings.
    pub fn new(config: RemovalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            reporter: Arc::new(NoOpProgressReporter),
        })
    }

    /// Route stage updates to `reporter`
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Read, decode and process an image file
    ///
    /// # Examples
    /// ```rust,no_run
    /// use product_matte::{BackgroundRemovalProcessor, Level, RemovalConfig};
    ///
    /// let config = RemovalConfig::builder().level(Level::High).crop(true).build()?;
    /// let processor = BackgroundRemovalProcessor::new(config)?;
    /// let result = processor.process_file("shoe.jpg")?;
    /// result.save_png("shoe_matte.png")?;
    /// # Ok::<(), product_matte::MatteError>(())
    /// ```
    #[instrument(skip(self, input_path), fields(path = %input_path.as_ref().display()))]
    pub fn process_file<P: AsRef<Path>>(&self, input_path: P) -> Result<RemovalResult> {
        let path = input_path.as_ref();
        let mut tracker = ProgressTracker::new(Arc::clone(&self.reporter));
        let total_start = Instant::now();

        tracker.report_stage(ProcessingStage::ImageLoading);
        let outcome = ImageIOService::read_bytes(path)
            .and_then(|bytes| self.run_bytes(&bytes, &mut tracker, total_start));
        Self::report_failure(&tracker, &outcome);

        outcome.map(|result| result.with_input_path(path.display().to_string()))
    }

    /// Decode and process encoded image bytes (PNG, JPEG, WebP, TIFF, BMP)
    ///
    /// # Errors
    /// - [`crate::MatteError::EmptyInput`] for an empty slice
    /// - [`crate::MatteError::Image`] when the bytes cannot be decoded
    #[instrument(skip(self, image_bytes), fields(bytes = image_bytes.len()))]
    pub fn process_bytes(&self, image_bytes: &[u8]) -> Result<RemovalResult> {
        let mut tracker = ProgressTracker::new(Arc::clone(&self.reporter));
        let total_start = Instant::now();

        tracker.report_stage(ProcessingStage::ImageLoading);
        let outcome = self.run_bytes(image_bytes, &mut tracker, total_start);
        Self::report_failure(&tracker, &outcome);
        outcome
    }

    /// Process an already decoded image
    ///
    /// Orientation is the caller's concern here since no EXIF data is available.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn process_image(&self, image: DynamicImage) -> Result<RemovalResult> {
        let mut tracker = ProgressTracker::new(Arc::clone(&self.reporter));
        let original_dimensions = (image.width(), image.height());
        let outcome = self.run_decoded(
            image,
            original_dimensions,
            ProcessingTimings::new(),
            &mut tracker,
            Instant::now(),
        );
        Self::report_failure(&tracker, &outcome);
        outcome
    }

    /// Run only the matting and optional crop on a raw buffer
    ///
    /// This is the path the browser preview takes, so for the same buffer
    /// and level both produce the same pixels.
    #[must_use]
    pub fn process_buffer(&self, buffer: PixelBuffer) -> (PixelBuffer, MattingReport) {
        let mut tracker = ProgressTracker::new(Arc::clone(&self.reporter));
        let matted = self.matte(buffer, &mut tracker, &mut ProcessingTimings::new());
        (matted.buffer, matted.report)
    }

    /// Read an async stream to the end, then process it like [`Self::process_bytes`]
    #[cfg(feature = "async")]
    pub async fn process_reader<R>(&self, mut reader: R) -> Result<RemovalResult>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        use tokio::io::AsyncReadExt;

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        self.process_bytes(&bytes)
    }

    fn report_failure<T>(tracker: &ProgressTracker, outcome: &Result<T>) {
        if let Err(e) = outcome {
            tracker.report_error(&e.to_string());
        }
    }

    fn run_bytes(
        &self,
        image_bytes: &[u8],
        tracker: &mut ProgressTracker,
        total_start: Instant,
    ) -> Result<RemovalResult> {
        let decode_start = Instant::now();
        let decoded = ImageIOService::decode(image_bytes, self.config.auto_orient)?;
        let timings = ProcessingTimings {
            image_decode_ms: decode_start.elapsed().as_millis() as u64,
            ..ProcessingTimings::new()
        };

        debug!(
            format = ?decoded.format,
            width = decoded.stored_dimensions.0,
            height = decoded.stored_dimensions.1,
            "Decoded input image"
        );

        self.run_decoded(
            decoded.image,
            decoded.stored_dimensions,
            timings,
            tracker,
            total_start,
        )
    }

    fn run_decoded(
        &self,
        image: DynamicImage,
        original_dimensions: (u32, u32),
        mut timings: ProcessingTimings,
        tracker: &mut ProgressTracker,
        total_start: Instant,
    ) -> Result<RemovalResult> {
        tracker.report_stage(ProcessingStage::Preprocessing);
        let preprocess_start = Instant::now();
        let buffer = ImagePreprocessor::prepare(image, self.config.max_dimension);
        timings.preprocessing_ms = preprocess_start.elapsed().as_millis() as u64;

        let matted = self.matte(buffer, tracker, &mut timings);

        tracker.report_stage(ProcessingStage::FormatConversion);
        let image = matted.buffer.into_rgba_image()?;
        timings.total_ms = total_start.elapsed().as_millis() as u64;

        let mut metadata = ProcessingMetadata::new(
            self.config
                .remove_background
                .then_some(self.config.level),
        );
        metadata.total_pixels = matted.report.total_pixels;
        metadata.masked_pixels = matted.report.masked_pixels;
        metadata.crop = matted.crop;
        metadata.timings = timings;

        info!(
            level = ?metadata.level,
            width = image.width(),
            height = image.height(),
            masked_ratio = metadata.masked_ratio(),
            total_ms = metadata.timings.total_ms,
            "Image processed"
        );

        tracker.report_stage(ProcessingStage::Completed);
        tracker.report_completion(&metadata.timings);

        Ok(RemovalResult::new(
            image,
            matted.mask,
            original_dimensions,
            metadata,
        ))
    }

    fn matte(
        &self,
        buffer: PixelBuffer,
        tracker: &mut ProgressTracker,
        timings: &mut ProcessingTimings,
    ) -> MattedBuffer {
        let matte_start = Instant::now();
        let mut matted = self.strip(buffer, tracker);
        timings.matting_ms = matte_start.elapsed().as_millis() as u64;

        if self.config.crop {
            let crop_start = Instant::now();
            matted = self.crop(matted, tracker);
            timings.crop_ms = crop_start.elapsed().as_millis() as u64;
        }
        matted
    }

    fn strip(&self, buffer: PixelBuffer, tracker: &mut ProgressTracker) -> MattedBuffer {
        if !self.config.remove_background {
            debug!("Background removal disabled, passing pixels through");
            return MattedBuffer {
                report: MattingReport {
                    total_pixels: buffer.pixel_count(),
                    ..MattingReport::default()
                },
                buffer,
                mask: None,
                crop: None,
            };
        }

        let (buffer, mask, report) =
            matting::remove_background_with_report(buffer, self.config.level, |pass| {
                tracker.report_stage(pass.into());
            });

        if report.is_fully_background() {
            warn!(
                level = %self.config.level,
                "No foreground detected: every pixel was classified as background"
            );
        }

        MattedBuffer {
            buffer,
            mask: Some(mask),
            report,
            crop: None,
        }
    }

    fn crop(&self, matted: MattedBuffer, tracker: &mut ProgressTracker) -> MattedBuffer {
        tracker.report_stage(ProcessingStage::Cropping);
        let (width, height) = matted.buffer.dimensions();

        match matting::crop::padded_content_bounds(&matted.buffer, self.config.crop_padding) {
            Some(region) if (region.width(), region.height()) != (width, height) => {
                debug!(?region, "Cropping to visible content");
                MattedBuffer {
                    buffer: matting::crop::crop_region_unchecked(&matted.buffer, region),
                    crop: Some(region),
                    ..matted
                }
            },
            Some(_) => matted,
            None => {
                debug!("Nothing visible to crop around, keeping full frame");
                matted
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Level, MatteError};
    use image::{Rgba, RgbaImage};

    fn product_shot() -> DynamicImage {
        let mut image = RgbaImage::from_pixel(20, 16, Rgba([255, 255, 255, 255]));
        for y in 5..11 {
            for x in 6..14 {
                image.put_pixel(x, y, Rgba([30, 90, 200, 255]));
            }
        }
        DynamicImage::ImageRgba8(image)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RemovalConfig {
            max_dimension: Some(0),
            ..RemovalConfig::default()
        };
        assert!(matches!(
            BackgroundRemovalProcessor::new(config),
            Err(MatteError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_process_image_strips_background() {
        let processor = BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap();
        let result = processor.process_image(product_shot()).unwrap();

        assert_eq!(result.dimensions(), (20, 16));
        assert_eq!(result.image.get_pixel(0, 0)[3], 0);
        assert_eq!(result.image.get_pixel(8, 8)[3], 255);
        assert_eq!(result.metadata.level, Some(Level::Medium));
        assert_eq!(result.metadata.masked_pixels, 20 * 16 - 8 * 6);
        assert!(result.mask.is_some());
        assert!(result.metadata.crop.is_none());
    }

    #[test]
    fn test_process_image_with_crop() {
        let config = RemovalConfig::builder()
            .crop(true)
            .crop_padding(1)
            .build()
            .unwrap();
        let processor = BackgroundRemovalProcessor::new(config).unwrap();
        let result = processor.process_image(product_shot()).unwrap();

        assert_eq!(result.dimensions(), (10, 8));
        assert_eq!(
            result.metadata.crop,
            Some(BoundingBox {
                left: 5,
                top: 4,
                right: 14,
                bottom: 11
            })
        );
        assert_eq!(result.original_dimensions, (20, 16));
    }

    #[test]
    fn test_keep_background_passes_pixels_through() {
        let config = RemovalConfig::builder()
            .remove_background(false)
            .build()
            .unwrap();
        let processor = BackgroundRemovalProcessor::new(config).unwrap();
        let result = processor.process_image(product_shot()).unwrap();

        assert!(result.mask.is_none());
        assert_eq!(result.metadata.level, None);
        assert_eq!(result.image, product_shot().to_rgba8());
    }

    #[test]
    fn test_process_buffer_reports_counts() {
        let processor = BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap();
        let buffer = PixelBuffer::from(product_shot().to_rgba8());
        let (out, report) = processor.process_buffer(buffer);

        assert_eq!(out.dimensions(), (20, 16));
        assert_eq!(report.total_pixels, 320);
        assert_eq!(report.masked_pixels, 320 - 48);
        assert!(!report.is_fully_background());
    }

    #[test]
    fn test_resize_bounds_working_size() {
        let config = RemovalConfig::builder()
            .max_dimension(Some(10))
            .build()
            .unwrap();
        let processor = BackgroundRemovalProcessor::new(config).unwrap();
        let result = processor.process_image(product_shot()).unwrap();
        assert_eq!(result.dimensions(), (10, 8));
        assert_eq!(result.original_dimensions, (20, 16));
    }
}
