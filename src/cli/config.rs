//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliOutputFormat};
use crate::{
    config::{OutputFormat, RemovalConfig},
    services::OutputFormatHandler,
    utils::ConfigValidator,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Convert CLI arguments to a `RemovalConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `RemovalConfig` from CLI arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<RemovalConfig> {
        let max_dimension = if cli.no_resize {
            None
        } else {
            Some(cli.max_dimension)
        };

        RemovalConfig::builder()
            .level(cli.level)
            .remove_background(!cli.keep_background)
            .crop(cli.crop)
            .crop_padding(cli.padding)
            .max_dimension(max_dimension)
            .auto_orient(!cli.no_orient)
            .output_format(Self::resolve_output_format(cli))
            .jpeg_quality(cli.jpeg_quality)
            .build()
            .context("Invalid configuration")
    }

    /// Explicit `--format`, else the extension of a single output file, else PNG
    pub(crate) fn resolve_output_format(cli: &Cli) -> OutputFormat {
        if let Some(format) = cli.format {
            return format.into();
        }

        cli.output
            .as_deref()
            .filter(|target| *target != "-" && cli.input.len() == 1)
            .and_then(|target| Path::new(target).extension())
            .and_then(|ext| ext.to_str())
            .and_then(OutputFormatHandler::from_extension)
            .unwrap_or_default()
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        ConfigValidator::validate_jpeg_quality(cli.jpeg_quality)
            .context("Invalid quality settings")?;
        ConfigValidator::validate_crop_padding(cli.padding).context("Invalid crop padding")?;
        if !cli.no_resize {
            ConfigValidator::validate_max_dimension(cli.max_dimension)
                .context("Invalid resize bound")?;
        }

        if let Some(pattern) = &cli.pattern {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid file pattern: {pattern}"))?;
        }

        Ok(())
    }
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
            CliOutputFormat::Webp => OutputFormat::WebP,
            CliOutputFormat::Tiff => OutputFormat::Tiff,
            CliOutputFormat::Rgba8 => OutputFormat::Rgba8,
        }
    }
}
