#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Product Matte
//!
//! Removes white and light-gray studio backdrops from product photos,
//! feathers and decontaminates the edges, and optionally crops to the subject.
//!
//! The matting passes in [`matting`] work on plain RGBA buffers and have no
//! I/O, so the browser preview and the batch processor share them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use product_matte::{remove_background_from_bytes, Level, OutputFormat, RemovalConfig};
//!
//! # fn example(upload: &[u8]) -> anyhow::Result<()> {
//! let config = RemovalConfig::builder()
//!     .level(Level::High)
//!     .crop(true)
//!     .build()?;
//! let result = remove_background_from_bytes(upload, &config)?;
//! let png = result.to_bytes(OutputFormat::Png, 90)?;
//! # let _ = png;
//! # Ok(())
//! # }
//! ```
//!
//! ## Working on raw pixels
//!
//! ```rust
//! use product_matte::{remove_background, Level, PixelBuffer};
//!
//! let white = PixelBuffer::from_pixel(4, 4, [255, 255, 255, 255]);
//! let stripped = remove_background(white, Level::Medium);
//! assert!(stripped.alpha_channel().iter().all(|&a| a == 0));
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bars and tracing setup
//! - `webp-support` (default): WebP input and lossless WebP output
//! - `async`: [`remove_background_from_reader`] for tokio readers
//! - `tracing-json`, `tracing-files`: extra log sinks for the CLI

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod matting;
pub mod processor;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

pub use config::{Level, LevelProfile, OutputFormat, RemovalConfig, RemovalConfigBuilder};
pub use error::{MatteError, Result};
pub use matting::{
    crop_to_content, remove_background, remove_background_with_report, MattingPass,
    MattingReport,
};
pub use processor::BackgroundRemovalProcessor;
pub use services::{
    ImageIOService, NoOpProgressReporter, OutputFormatHandler, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate, TracingProgressReporter,
};
pub use types::{
    BoundingBox, PixelBuffer, ProcessingMetadata, ProcessingTimings, RemovalResult,
    SegmentationMask,
};
pub use utils::{ConfigValidator, ImagePreprocessor};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, spans, TracingConfig, TracingFormat, TracingOutput};

/// Remove the background from encoded image bytes
///
/// Suitable for upload handlers and other in-memory sources.
///
/// # Errors
/// - [`MatteError::InvalidConfig`] when `config` is out of range
/// - [`MatteError::EmptyInput`] or [`MatteError::Image`] for bad bytes
pub fn remove_background_from_bytes(
    image_bytes: &[u8],
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    BackgroundRemovalProcessor::new(config.clone())?.process_bytes(image_bytes)
}

/// Remove the background from a `DynamicImage`
///
/// ```rust
/// use image::{DynamicImage, Rgba, RgbaImage};
/// use product_matte::{remove_background_from_image, RemovalConfig};
///
/// let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255])));
/// let result = remove_background_from_image(img, &RemovalConfig::default()).unwrap();
/// assert!(result.is_fully_transparent());
/// ```
pub fn remove_background_from_image(
    image: image::DynamicImage,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    BackgroundRemovalProcessor::new(config.clone())?.process_image(image)
}

/// Remove the background from an async reader stream
///
/// The stream is read to the end before decoding.
///
/// ```rust,no_run
/// use product_matte::{remove_background_from_reader, RemovalConfig};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let file = File::open("shoe.jpg").await?;
/// let result = remove_background_from_reader(file, &RemovalConfig::default()).await?;
/// result.save_png("shoe_matte.png")?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "async")]
pub async fn remove_background_from_reader<R: tokio::io::AsyncRead + Unpin>(
    reader: R,
    config: &RemovalConfig,
) -> Result<RemovalResult> {
    BackgroundRemovalProcessor::new(config.clone())?
        .process_reader(reader)
        .await
}
