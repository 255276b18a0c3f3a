//! Configuration validation utilities
//!
//! Range checks applied to CLI arguments before a config is built.

use crate::{
    config::MAX_CROP_PADDING,
    error::{MatteError, Result},
};

/// Utility for validating configuration parameters
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate JPEG quality parameter (0-100)
    pub fn validate_jpeg_quality(quality: u8) -> Result<u8> {
        if quality > 100 {
            return Err(MatteError::config_value_error(
                "JPEG quality",
                quality,
                "0-100",
                Some(90),
            ));
        }
        Ok(quality)
    }

    /// Validate crop padding
    pub fn validate_crop_padding(padding: u32) -> Result<u32> {
        if padding > MAX_CROP_PADDING {
            return Err(MatteError::config_value_error(
                "crop padding",
                padding,
                "0-4096",
                None,
            ));
        }
        Ok(padding)
    }

    /// Validate that a dimension bound is usable
    pub fn validate_max_dimension(max_dimension: u32) -> Result<u32> {
        if max_dimension == 0 {
            return Err(MatteError::invalid_config(
                "max dimension must be at least 1 (use --no-resize to disable resizing)",
            ));
        }
        Ok(max_dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_and_padding_ranges() {
        assert_eq!(ConfigValidator::validate_jpeg_quality(100).unwrap(), 100);
        assert!(ConfigValidator::validate_jpeg_quality(101).is_err());
        assert_eq!(ConfigValidator::validate_crop_padding(4096).unwrap(), 4096);
        assert!(ConfigValidator::validate_crop_padding(4097).is_err());
    }

    #[test]
    fn test_max_dimension() {
        assert!(ConfigValidator::validate_max_dimension(0).is_err());
        assert_eq!(ConfigValidator::validate_max_dimension(1).unwrap(), 1);
    }
}
