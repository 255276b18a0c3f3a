//! Configuration types for background removal operations

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Aggressiveness of white-background detection
///
/// This is a closed set: front ends select one of the three presets and
/// never inject their own thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Only near-pure white is removed
    Low,
    /// Balanced preset used when nothing else is requested
    #[default]
    Medium,
    /// Removes off-white and lightly tinted backdrops too
    High,
}

impl Level {
    /// All levels, least to most permissive
    pub const ALL: [Level; 3] = [Level::Low, Level::Medium, Level::High];

    /// The threshold profile backing this level
    #[must_use]
    pub fn profile(self) -> &'static LevelProfile {
        match self {
            Self::Low => &LevelProfile::LOW,
            Self::Medium => &LevelProfile::MEDIUM,
            Self::High => &LevelProfile::HIGH,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = crate::error::MatteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(crate::error::MatteError::config_value_error(
                "level",
                other.to_string(),
                "low, medium, high",
                Some("medium".to_string()),
            )),
        }
    }
}

/// Brightness/saturation thresholds for one [`Level`]
///
/// Brightness is `max(r, g, b)` and saturation is `max(r, g, b) - min(r, g, b)`.
/// The feather thresholds are always looser than the background ones.
/// Only the three canonical instances exist; obtain them via [`Level::profile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct LevelProfile {
    /// Minimum brightness for a pixel to count as background
    pub bg_min_brightness: u8,
    /// Maximum saturation for a pixel to count as background
    pub bg_max_saturation: u8,
    /// Minimum brightness for an edge pixel to be feathered
    pub feather_min_brightness: u8,
    /// Maximum saturation for an edge pixel to be feathered
    pub feather_max_saturation: u8,
    /// Alpha ceiling applied to feathered edge pixels
    pub feather_alpha: u8,
}

impl LevelProfile {
    pub const LOW: Self = Self {
        bg_min_brightness: 252,
        bg_max_saturation: 8,
        feather_min_brightness: 248,
        feather_max_saturation: 12,
        feather_alpha: 210,
    };

    pub const MEDIUM: Self = Self {
        bg_min_brightness: 232,
        bg_max_saturation: 28,
        feather_min_brightness: 220,
        feather_max_saturation: 35,
        feather_alpha: 120,
    };

    pub const HIGH: Self = Self {
        bg_min_brightness: 222,
        bg_max_saturation: 36,
        feather_min_brightness: 210,
        feather_max_saturation: 48,
        feather_alpha: 95,
    };
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// JPEG (no transparency, flattened over white)
    Jpeg,
    /// Lossless WebP with alpha channel transparency
    WebP,
    /// TIFF with alpha channel transparency
    Tiff,
    /// Raw RGBA8 pixel data (4 bytes per pixel)
    Rgba8,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
            Self::WebP => write!(f, "webp"),
            Self::Tiff => write!(f, "tiff"),
            Self::Rgba8 => write!(f, "rgba8"),
        }
    }
}

/// Longest side the production path keeps before matting
pub const DEFAULT_MAX_DIMENSION: u32 = 1600;

/// Padding used when cropping batch output to its content
pub const DEFAULT_CROP_PADDING: u32 = 6;

/// Largest crop padding accepted by [`RemovalConfig::validate`]
pub const MAX_CROP_PADDING: u32 = 4096;

/// Configuration for the production processing path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Background detection preset
    pub level: Level,

    /// Run the matting passes (when false, pixels pass through untouched)
    pub remove_background: bool,

    /// Crop the result to its visible content
    pub crop: bool,

    /// Padding kept around the visible content when cropping
    pub crop_padding: u32,

    /// Downscale so neither side exceeds this (never enlarges)
    pub max_dimension: Option<u32>,

    /// Apply EXIF orientation before processing
    pub auto_orient: bool,

    /// Output format
    pub output_format: OutputFormat,

    /// JPEG quality (0-100, only used for JPEG output)
    pub jpeg_quality: u8,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            level: Level::default(),
            remove_background: true,
            crop: false,
            crop_padding: DEFAULT_CROP_PADDING,
            max_dimension: Some(DEFAULT_MAX_DIMENSION),
            auto_orient: true,
            output_format: OutputFormat::default(),
            jpeg_quality: 90,
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use product_matte::{Level, OutputFormat, RemovalConfig};
    ///
    /// let config = RemovalConfig::builder()
    ///     .level(Level::High)
    ///     .crop(true)
    ///     .output_format(OutputFormat::WebP)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.crop_padding, 6);
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - JPEG quality above 100
    /// - `max_dimension` of zero
    /// - `crop_padding` above [`MAX_CROP_PADDING`]
    pub fn validate(&self) -> crate::Result<()> {
        if self.jpeg_quality > 100 {
            return Err(crate::error::MatteError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "0-100",
                Some(90),
            ));
        }

        if self.max_dimension == Some(0) {
            return Err(crate::error::MatteError::config_value_error(
                "max dimension",
                0,
                "1 or more",
                Some(DEFAULT_MAX_DIMENSION),
            ));
        }

        if self.crop_padding > MAX_CROP_PADDING {
            return Err(crate::error::MatteError::config_value_error(
                "crop padding",
                self.crop_padding,
                "0-4096",
                Some(DEFAULT_CROP_PADDING),
            ));
        }

        Ok(())
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    #[must_use]
    pub fn level(mut self, level: Level) -> Self {
        self.config.level = level;
        self
    }

    #[must_use]
    pub fn remove_background(mut self, enabled: bool) -> Self {
        self.config.remove_background = enabled;
        self
    }

    #[must_use]
    pub fn crop(mut self, enabled: bool) -> Self {
        self.config.crop = enabled;
        self
    }

    #[must_use]
    pub fn crop_padding(mut self, padding: u32) -> Self {
        self.config.crop_padding = padding;
        self
    }

    /// Set the size bound; `None` keeps the decoded size
    #[must_use]
    pub fn max_dimension(mut self, max_dimension: Option<u32>) -> Self {
        self.config.max_dimension = max_dimension;
        self
    }

    #[must_use]
    pub fn auto_orient(mut self, enabled: bool) -> Self {
        self.config.auto_orient = enabled;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set JPEG quality (clamped to 100)
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.min(100);
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns `MatteError::InvalidConfig` when [`RemovalConfig::validate`] fails.
    pub fn build(self) -> crate::Result<RemovalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
