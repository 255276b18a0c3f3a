//! Product matte CLI tool
//!
//! Strips light studio backdrops from product photos in batches.

use super::config::CliConfigBuilder;
use crate::{
    config::{Level, OutputFormat, RemovalConfig},
    processor::BackgroundRemovalProcessor,
    services::{
        BatchProcessingStats, ImageIOService, OutputFormatHandler, ProgressReporter,
        TracingProgressReporter,
    },
    tracing_config::{init_cli_tracing, spans},
    types::RemovalResult,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, error, info, warn};

/// Remove white and light-gray backdrops from product photos
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "product-matte")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image files or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output file (single input) or directory (batch processing). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Output format [default: from the output extension, else png]
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// How aggressively light pixels count as background
    #[arg(short, long, value_enum, default_value_t = Level::Medium)]
    pub level: Level,

    /// Skip background removal (useful with --crop on already transparent images)
    #[arg(long)]
    pub keep_background: bool,

    /// Crop to the visible content
    #[arg(long)]
    pub crop: bool,

    /// Padding kept around content when cropping, in pixels
    #[arg(long, default_value_t = crate::config::DEFAULT_CROP_PADDING)]
    pub padding: u32,

    /// Downscale inputs whose longer side exceeds this many pixels
    #[arg(long, default_value_t = crate::config::DEFAULT_MAX_DIMENSION, conflicts_with = "no_resize")]
    pub max_dimension: u32,

    /// Never downscale inputs
    #[arg(long)]
    pub no_resize: bool,

    /// Ignore EXIF orientation
    #[arg(long)]
    pub no_orient: bool,

    /// JPEG quality (0-100)
    #[arg(long, default_value_t = 90)]
    pub jpeg_quality: u8,

    /// Images processed at once (0 = one per CPU)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// File name pattern for directory inputs (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Also write the background mask as <stem>_mask.png
    #[arg(long)]
    pub save_mask: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
    Webp,
    Tiff,
    Rgba8,
}

/// Where one result goes
#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputTarget {
    Stdout,
    File(PathBuf),
}

/// Counts for a finished run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchSummary {
    pub(crate) processed: usize,
    pub(crate) failed: usize,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _tracing_guard = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    info!("Starting product matte CLI");
    debug!(?config, "Resolved configuration");
    if config.remove_background {
        OutputFormatHandler::validate_for_background_removal(config.output_format);
    }

    let reporter: Arc<dyn ProgressReporter> = Arc::new(TracingProgressReporter::new(cli.verbose > 0));
    let processor = Arc::new(
        BackgroundRemovalProcessor::new(config)
            .context("Failed to create processor")?
            .with_progress_reporter(Arc::clone(&reporter)),
    );

    let summary = process_inputs(&cli, processor, reporter).await?;

    if summary.processed == 0 && summary.failed > 0 {
        anyhow::bail!("All {} input(s) failed to process", summary.failed);
    }

    Ok(())
}

/// Expand inputs, then process every image on bounded blocking workers
async fn process_inputs(
    cli: &Cli,
    processor: Arc<BackgroundRemovalProcessor>,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<BatchSummary> {
    if cli.input.len() == 1 && cli.input.first().is_some_and(|s| s == "-") {
        return process_stdin(cli.output.as_deref(), processor).await;
    }

    let all_files = collect_input_files(cli)?;
    if all_files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(BatchSummary::default());
    }

    let file_count = all_files.len();
    info!("Found {} image file(s) to process", file_count);

    let output_format = processor.config().output_format;
    let output_dir = prepare_output_dir(cli, file_count)?;
    let targets: Vec<OutputTarget> = all_files
        .iter()
        .map(|input| match (&output_dir, cli.output.as_deref()) {
            (Some(dir), _) => {
                OutputTarget::File(generate_output_path_with_dir(input, dir, output_format))
            },
            (None, Some("-")) => OutputTarget::Stdout,
            (None, Some(path)) => OutputTarget::File(PathBuf::from(path)),
            (None, None) => OutputTarget::File(generate_output_path(input, output_format)),
        })
        .collect();
    ensure_unique_outputs(&all_files, &targets)?;

    let jobs = resolve_jobs(cli.jobs).min(file_count);
    let _batch_span = spans::batch_processing(file_count, jobs).entered();

    let progress_bar = (file_count > 1).then(|| create_progress_bar(file_count as u64));
    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = JoinSet::new();

    for (input, target) in all_files.into_iter().zip(targets) {
        let semaphore = Arc::clone(&semaphore);
        let processor = Arc::clone(&processor);
        let save_mask = cli.save_mask;

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let worker_input = input.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                process_single_file(&processor, &worker_input, &target, save_mask)
            })
            .await
            .context("Worker thread panicked")?;
            anyhow::Ok((input, outcome))
        });
    }

    let mut summary = BatchSummary::default();
    let batch_start_time = Instant::now();

    while let Some(joined) = tasks.join_next().await {
        let (input, outcome) = joined.context("Batch task was cancelled")??;
        match outcome {
            Ok(()) => summary.processed += 1,
            Err(e) => {
                error!("Failed to process {}: {:#}", input.display(), e);
                summary.failed += 1;
            },
        }

        if let Some(pb) = &progress_bar {
            pb.set_message(input.display().to_string());
            pb.inc(1);
        }

        if cli.verbose > 0 {
            let elapsed = batch_start_time.elapsed().as_secs_f64();
            let done = summary.processed + summary.failed;
            reporter.report_batch_progress(&BatchProcessingStats {
                items_completed: done,
                items_total: file_count,
                items_failed: summary.failed,
                current_item_name: input.display().to_string(),
                processing_rate: if elapsed > 0.0 { done as f64 / elapsed } else { 0.0 },
            });
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!(
            "Completed! Processed: {}, Failed: {}",
            summary.processed, summary.failed
        ));
    }

    if summary.failed > 0 {
        warn!(
            "Some files failed to process. Processed: {}, Failed: {}",
            summary.processed, summary.failed
        );
    }

    if file_count > 1 {
        let total = batch_start_time.elapsed().as_secs_f64();
        info!("Batch processing summary:");
        info!("  Files processed: {}", summary.processed);
        info!("  Files failed: {}", summary.failed);
        info!("  Total time: {:.2}s", total);
        info!(
            "  Average per file: {:.2}s",
            if summary.processed > 0 {
                total / summary.processed as f64
            } else {
                0.0
            }
        );
    }

    Ok(summary)
}

/// Process image bytes from stdin; the result goes to stdout unless `-o` names a file
async fn process_stdin(
    output_target: Option<&str>,
    processor: Arc<BackgroundRemovalProcessor>,
) -> Result<BatchSummary> {
    info!("Reading image from stdin");
    let image_data = read_stdin()?;

    match ImageIOService::detect_format(&image_data) {
        Some(format) => info!("Detected image format: {:?}", format),
        None => warn!("Could not detect image format from stdin data"),
    }

    let target = match output_target {
        Some(path) if path != "-" => OutputTarget::File(PathBuf::from(path)),
        _ => OutputTarget::Stdout,
    };

    let start_time = Instant::now();
    let result = tokio::task::spawn_blocking(move || {
        let mut result = processor
            .process_bytes(&image_data)
            .context("Failed to remove background from stdin data")?;
        write_result(&mut result, &target, processor.config())?;
        anyhow::Ok(())
    })
    .await
    .context("Worker thread panicked")?;

    result?;
    info!(
        "Processed stdin image in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(BatchSummary {
        processed: 1,
        failed: 0,
    })
}

/// Process one image file end to end; runs on a blocking worker
fn process_single_file(
    processor: &BackgroundRemovalProcessor,
    input_path: &Path,
    target: &OutputTarget,
    save_mask: bool,
) -> Result<()> {
    let config = processor.config();
    let _span = spans::file_processing(input_path, config.level.as_str()).entered();

    let mut result = processor
        .process_file(input_path)
        .context("Failed to remove background")?;

    if result.is_fully_transparent() {
        warn!(
            "No foreground found in {}; output is fully transparent",
            input_path.display()
        );
    }

    write_result(&mut result, target, config)?;
    log_timing_breakdown(input_path, &result);

    if save_mask {
        match (&result.mask, target) {
            (Some(mask), OutputTarget::File(output)) => {
                let mask_path = generate_mask_path(input_path, output);
                mask.save_png(&mask_path)
                    .with_context(|| format!("Failed to save mask: {}", mask_path.display()))?;
                debug!("Mask saved to {}", mask_path.display());
            },
            (None, _) => debug!("No mask to save, background removal was disabled"),
            (_, OutputTarget::Stdout) => warn!("--save-mask is ignored when writing to stdout"),
        }
    }

    Ok(())
}

fn write_result(
    result: &mut RemovalResult,
    target: &OutputTarget,
    config: &RemovalConfig,
) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            let output_data = result.to_bytes(config.output_format, config.jpeg_quality)?;
            write_stdout(&output_data)?;
            info!("Image written to stdout");
        },
        OutputTarget::File(path) => {
            result
                .save_timed(path, config.output_format, config.jpeg_quality)
                .with_context(|| format!("Failed to save result: {}", path.display()))?;
        },
    }
    Ok(())
}

fn log_timing_breakdown(input_path: &Path, result: &RemovalResult) {
    let timings = result.timings();
    let breakdown = timings.breakdown_percentages();

    info!("Processing breakdown for {}:", input_path.display());
    info!(
        "  Image Decode: {}ms ({:.1}%)",
        timings.image_decode_ms, breakdown.decode_pct
    );
    info!(
        "  Preprocessing: {}ms ({:.1}%)",
        timings.preprocessing_ms, breakdown.preprocessing_pct
    );
    info!(
        "  Matting: {}ms ({:.1}%)",
        timings.matting_ms, breakdown.matting_pct
    );
    if timings.crop_ms > 0 {
        info!("  Crop: {}ms ({:.1}%)", timings.crop_ms, breakdown.crop_pct);
    }
    if let Some(encode_ms) = timings.image_encode_ms {
        info!(
            "  Image Encode: {}ms ({:.1}%)",
            encode_ms, breakdown.encode_pct
        );
    }
    info!(
        "  Total: {}ms ({:.2}s), {:.1}% background",
        timings.total_ms,
        timings.total_ms as f64 / 1000.0,
        result.metadata.masked_ratio() * 100.0
    );
}

fn create_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Files from every input, sorted for a deterministic order
fn collect_input_files(cli: &Cli) -> Result<Vec<PathBuf>> {
    let mut all_files = Vec::new();

    for input in &cli.input {
        let path = PathBuf::from(input);

        if path.is_file() {
            if ImageIOService::is_supported_format(&path) {
                all_files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            all_files.extend(find_image_files(
                &path,
                cli.recursive,
                cli.pattern.as_deref(),
            )?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    all_files.sort();
    all_files.dedup();
    Ok(all_files)
}

/// Output directory for batches; `None` means "write beside each input"
fn prepare_output_dir(cli: &Cli, file_count: usize) -> Result<Option<PathBuf>> {
    let Some(output) = cli.output.as_deref() else {
        return Ok(None);
    };
    if file_count <= 1 {
        return Ok(None);
    }
    if output == "-" {
        anyhow::bail!("Cannot use stdout (-) as output when processing multiple files");
    }

    let output_path = PathBuf::from(output);
    if output_path.is_file() {
        anyhow::bail!(
            "Output path exists and is a file, not a directory: {}",
            output_path.display()
        );
    }
    std::fs::create_dir_all(&output_path).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;
    Ok(Some(output_path))
}

/// Refuse to start when two inputs would be written to the same file
fn ensure_unique_outputs(inputs: &[PathBuf], targets: &[OutputTarget]) -> Result<()> {
    let mut claimed: HashMap<&Path, &Path> = HashMap::new();
    for (input, target) in inputs.iter().zip(targets) {
        let OutputTarget::File(output) = target else {
            continue;
        };
        if let Some(previous) = claimed.insert(output.as_path(), input.as_path()) {
            anyhow::bail!(
                "{} and {} would both be written to {}; rename one or process them separately",
                previous.display(),
                input.display(),
                output.display()
            );
        }
    }
    Ok(())
}

fn resolve_jobs(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Read image data from stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read image data from stdin")?;

    if buffer.is_empty() {
        anyhow::bail!("No data received from stdin");
    }

    Ok(buffer)
}

/// Write image data to stdout
fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Find image files in a directory
fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if recursive {
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let path = entry.path();
                if ImageIOService::is_supported_format(path) && matches_pattern(path, pattern) {
                    files.push(path.to_path_buf());
                }
            }
        }
    } else {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if ImageIOService::is_supported_format(&path) && matches_pattern(&path, pattern) {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Check if the file name matches the given glob pattern
fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    match pattern {
        Some(pat) => path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|filename| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(filename))
                    .unwrap_or(false)
            }),
        None => true,
    }
}

fn output_file_name(input_path: &Path, format: OutputFormat) -> String {
    let stem = input_path.file_stem().unwrap_or_default();
    format!(
        "{}_matte.{}",
        stem.to_string_lossy(),
        OutputFormatHandler::get_extension(format)
    )
}

/// `<stem>_matte.<ext>` beside the input
fn generate_output_path(input_path: &Path, format: OutputFormat) -> PathBuf {
    let dir = input_path.parent().unwrap_or(Path::new("."));
    dir.join(output_file_name(input_path, format))
}

/// `<stem>_matte.<ext>` inside `output_dir`
fn generate_output_path_with_dir(
    input_path: &Path,
    output_dir: &Path,
    format: OutputFormat,
) -> PathBuf {
    output_dir.join(output_file_name(input_path, format))
}

/// `<input stem>_mask.png` beside the output file
fn generate_mask_path(input_path: &Path, output_path: &Path) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    let dir = output_path.parent().unwrap_or(Path::new("."));
    dir.join(format!("{}_mask.png", stem.to_string_lossy()))
}
