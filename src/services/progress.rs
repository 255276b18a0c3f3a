//! Progress reporting service
//!
//! Front ends plug in their own [`ProgressReporter`]; the processor only
//! announces stages.

use crate::{matting::MattingPass, types::ProcessingTimings};
use instant::Instant;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Progress stages during background removal processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Loading and decoding input image
    ImageLoading,
    /// Orientation, resizing and RGBA conversion
    Preprocessing,
    /// Flood-filling the border-connected background
    Segmentation,
    /// Zeroing alpha under the mask
    AlphaCarving,
    /// Softening the cutout edge
    Feathering,
    /// Removing the white fringe from partial alpha
    Decontamination,
    /// Trimming to visible content
    Cropping,
    /// Converting to output format
    FormatConversion,
    /// Processing completed
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::ImageLoading => "Loading input image",
            Self::Preprocessing => "Preprocessing image",
            Self::Segmentation => MattingPass::Segmentation.description(),
            Self::AlphaCarving => MattingPass::AlphaCarving.description(),
            Self::Feathering => MattingPass::Feathering.description(),
            Self::Decontamination => MattingPass::Decontamination.description(),
            Self::Cropping => "Cropping to content",
            Self::FormatConversion => "Converting output format",
            Self::Completed => "Processing completed",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            Self::ImageLoading => 10,
            Self::Preprocessing => 25,
            Self::Segmentation => 40,
            Self::AlphaCarving => 60,
            Self::Feathering => 70,
            Self::Decontamination => 80,
            Self::Cropping => 90,
            Self::FormatConversion => 95,
            Self::Completed => 100,
        }
    }
}

impl From<MattingPass> for ProcessingStage {
    fn from(pass: MattingPass) -> Self {
        match pass {
            MattingPass::Segmentation => Self::Segmentation,
            MattingPass::AlphaCarving => Self::AlphaCarving,
            MattingPass::Feathering => Self::Feathering,
            MattingPass::Decontamination => Self::Decontamination,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self::with_description(stage, stage.description().to_string(), start_time)
    }

    /// Create a progress update with custom description
    #[must_use]
    pub fn with_description(
        stage: ProcessingStage,
        description: String,
        start_time: Instant,
    ) -> Self {
        Self {
            progress: stage.progress_percentage(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
            description,
        }
    }
}

/// Statistics for batch processing operations
#[derive(Debug, Clone)]
pub struct BatchProcessingStats {
    pub items_completed: usize,
    pub items_total: usize,
    pub items_failed: usize,
    /// Name/path of the item that just finished
    pub current_item_name: String,
    /// Items per second
    pub processing_rate: f64,
}

impl BatchProcessingStats {
    /// Estimated seconds left at the current rate
    #[must_use]
    pub fn eta_seconds(&self) -> Option<u64> {
        if self.processing_rate <= 0.0 {
            return None;
        }
        let remaining = self.items_total.saturating_sub(self.items_completed);
        Some((remaining as f64 / self.processing_rate).ceil() as u64)
    }
}

/// Trait for reporting progress during background removal operations
pub trait ProgressReporter: Send + Sync {
    fn report_progress(&self, update: ProgressUpdate);

    fn report_completion(&self, timings: &ProcessingTimings);

    fn report_error(&self, stage: ProcessingStage, error: &str);

    /// Report batch-level progress; ignored unless a front end cares
    fn report_batch_progress(&self, stats: &BatchProcessingStats) {
        let _ = stats;
    }
}

/// No-op progress reporter that discards all progress updates
#[derive(Debug, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: &ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Reporter that turns progress into `tracing` events
#[derive(Debug, Default)]
pub struct TracingProgressReporter {
    verbose: bool,
}

impl TracingProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for TracingProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        debug!(
            stage = ?update.stage,
            progress = update.progress,
            elapsed_ms = update.elapsed_ms,
            "{}",
            update.description
        );
    }

    fn report_completion(&self, timings: &ProcessingTimings) {
        info!(total_ms = timings.total_ms, "Background removal completed");

        if self.verbose {
            debug!(
                decode_ms = timings.image_decode_ms,
                preprocessing_ms = timings.preprocessing_ms,
                matting_ms = timings.matting_ms,
                crop_ms = timings.crop_ms,
                "Detailed timings"
            );
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        error!(stage = ?stage, "Error during {}: {}", stage.description(), error);
    }

    fn report_batch_progress(&self, stats: &BatchProcessingStats) {
        info!(
            completed = stats.items_completed,
            total = stats.items_total,
            failed = stats.items_failed,
            eta_s = stats.eta_seconds(),
            "Finished {} ({:.1} files/sec)",
            stats.current_item_name,
            stats.processing_rate
        );
    }
}

/// Progress tracker that manages timing and progress reporting for one image
pub struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    pub fn report_completion(&self, timings: &ProcessingTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report an error against the last announced stage
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(ProcessingStage::ImageLoading);
        self.reporter.report_error(stage, error);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }
}
