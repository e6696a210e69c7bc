//! Pipeline stage names.

use std::fmt;
use std::str::FromStr;

/// One step of the `run` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Create the detection log.
    Detect,
    /// Fill image dimensions and capture times.
    Metadata,
    /// Classify animal detections.
    Classify,
    /// Copy images into `empty/` and `non-empty/`.
    Sort,
    /// Write annotated images and species crops.
    Visualize,
    /// Export the JSON document.
    Json,
}

impl Stage {
    /// Every stage in default execution order.
    pub const ALL: [Self; 6] = [
        Self::Detect,
        Self::Metadata,
        Self::Classify,
        Self::Sort,
        Self::Visualize,
        Self::Json,
    ];

    /// Stage name as accepted by `--steps`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Detect => "detect",
            Self::Metadata => "metadata",
            Self::Classify => "classify",
            Self::Sort => "sort",
            Self::Visualize => "visualize",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "detect" => Ok(Self::Detect),
            "metadata" => Ok(Self::Metadata),
            "classify" => Ok(Self::Classify),
            "sort" => Ok(Self::Sort),
            "visualize" => Ok(Self::Visualize),
            "json" | "export" => Ok(Self::Json),
            other => Err(format!(
                "unknown step '{other}' (expected one of: detect, metadata, classify, sort, visualize, json)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_names() {
        for stage in Stage::ALL {
            assert_eq!(stage.name().parse::<Stage>().ok(), Some(stage));
        }
    }

    #[test]
    fn test_export_alias() {
        assert_eq!("export".parse::<Stage>().ok(), Some(Stage::Json));
        assert_eq!("JSON".parse::<Stage>().ok(), Some(Stage::Json));
    }

    #[test]
    fn test_unknown_stage() {
        assert!("annotate".parse::<Stage>().is_err());
    }
}
