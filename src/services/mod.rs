//! Services separating I/O, encoding and progress reporting from matting logic

pub mod format;
pub mod io;
pub mod progress;

pub use format::OutputFormatHandler;
pub use io::{DecodedImage, ImageIOService};
pub use progress::{
    BatchProcessingStats, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate, TracingProgressReporter,
};
