//! Configuration validation.

use crate::config::Config;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_unit_range("thresholds.classification", config.thresholds.classification)?;
    validate_unit_range("thresholds.detection_floor", config.thresholds.detection_floor)?;
    validate_unit_range(
        "detector.min_confidence",
        f64::from(config.detector.min_confidence),
    )?;

    if config.detector.input_size == 0 {
        return Err(Error::ConfigValidation {
            message: "detector.input_size must be at least 1".to_string(),
        });
    }

    if config.classifier.input_size == 0 {
        return Err(Error::ConfigValidation {
            message: "classifier.input_size must be at least 1".to_string(),
        });
    }

    if config.visualize.label_scale <= 0.0 {
        return Err(Error::ConfigValidation {
            message: format!(
                "visualize.label_scale must be positive, got {}",
                config.visualize.label_scale
            ),
        });
    }

    Ok(())
}

fn validate_unit_range(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::ConfigValidation {
            message: format!("{name} must be between 0.0 and 1.0, got {value}"),
        });
    }
    Ok(())
}
