//! CLI argument validators.
//!
//! Shared value parsers for clap.

use crate::pipeline::Stage;
use crate::store::ColumnOrder;

/// Parse and validate a value in 0.0-1.0.
pub fn parse_unit(s: &str) -> Result<f64, String> {
    parse_bounded_float(s, 0.0, 1.0, "threshold")
}

/// Parse and validate a bounded float value.
///
/// # Arguments
///
/// * `s` - The string to parse
/// * `min` - Minimum allowed value (inclusive)
/// * `max` - Maximum allowed value (inclusive)
/// * `name` - Name of the parameter for error messages
pub fn parse_bounded_float(s: &str, min: f64, max: f64, name: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(min..=max).contains(&value) {
        return Err(format!(
            "{name} must be between {min} and {max}, got {value}"
        ));
    }

    Ok(value)
}

/// Parse a comma-separated column order.
pub fn parse_column_order(s: &str) -> Result<ColumnOrder, String> {
    ColumnOrder::parse(s).map_err(|e| e.to_string())
}

/// Parse a pipeline step name.
pub fn parse_stage(s: &str) -> Result<Stage, String> {
    s.parse()
}
