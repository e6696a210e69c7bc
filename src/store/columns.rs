//! Column schema and the column-order contract.

use crate::constants::columns;
use crate::error::{Error, Result};
use crate::store::{DetectionRecord, DetectorClass};
use std::fmt;

/// A column of the detection log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// `Image_Filename`
    ImageFilename,
    /// `Detection_Index`
    DetectionIndex,
    /// `Image_Width`
    ImageWidth,
    /// `Image_Height`
    ImageHeight,
    /// `Timestamp`
    Timestamp,
    /// `MD_Class_ID`
    ClassId,
    /// `MD_Confidence`
    DetectionConfidence,
    /// `X_min`
    XMin,
    /// `Y_min`
    YMin,
    /// `X_max`
    XMax,
    /// `Y_max`
    YMax,
    /// `Predicted_Species`
    PredictedSpecies,
    /// `Classification_Confidence`
    ClassificationConfidence,
}

impl Column {
    /// Every column, in the master order.
    pub const ALL: [Self; 13] = [
        Self::ImageFilename,
        Self::DetectionIndex,
        Self::ImageWidth,
        Self::ImageHeight,
        Self::Timestamp,
        Self::ClassId,
        Self::DetectionConfidence,
        Self::XMin,
        Self::YMin,
        Self::XMax,
        Self::YMax,
        Self::PredictedSpecies,
        Self::ClassificationConfidence,
    ];

    /// Header name in the persisted table.
    pub const fn header(self) -> &'static str {
        match self {
            Self::ImageFilename => columns::IMAGE_FILENAME,
            Self::DetectionIndex => columns::DETECTION_INDEX,
            Self::ImageWidth => columns::IMAGE_WIDTH,
            Self::ImageHeight => columns::IMAGE_HEIGHT,
            Self::Timestamp => columns::TIMESTAMP,
            Self::ClassId => columns::CLASS_ID,
            Self::DetectionConfidence => columns::DETECTION_CONFIDENCE,
            Self::XMin => columns::X_MIN,
            Self::YMin => columns::Y_MIN,
            Self::XMax => columns::X_MAX,
            Self::YMax => columns::Y_MAX,
            Self::PredictedSpecies => columns::PREDICTED_SPECIES,
            Self::ClassificationConfidence => columns::CLASSIFICATION_CONFIDENCE,
        }
    }

    /// Look up a column by header name.
    pub fn from_header(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.header() == name)
    }

    /// Encode this column of `record` as a table cell.
    pub fn encode(self, record: &DetectionRecord) -> String {
        match self {
            Self::ImageFilename => record.image_filename.clone(),
            Self::DetectionIndex => record.detection_index.to_string(),
            Self::ImageWidth => encode_optional(record.image_width),
            Self::ImageHeight => encode_optional(record.image_height),
            Self::Timestamp => record.timestamp.clone().unwrap_or_default(),
            Self::ClassId => record.class.id().to_string(),
            Self::DetectionConfidence => format_float(record.detection_confidence),
            Self::XMin => record.bbox.x_min.to_string(),
            Self::YMin => record.bbox.y_min.to_string(),
            Self::XMax => record.bbox.x_max.to_string(),
            Self::YMax => record.bbox.y_max.to_string(),
            Self::PredictedSpecies => record.predicted_species.clone().unwrap_or_default(),
            Self::ClassificationConfidence => format_float(record.classification_confidence),
        }
    }

    /// Decode a table cell into this column of `record`.
    ///
    /// Returns a description of the problem when the cell is malformed.
    pub fn decode(self, record: &mut DetectionRecord, raw: &str) -> std::result::Result<(), String> {
        match self {
            Self::ImageFilename => {
                if raw.is_empty() {
                    return Err(format!("{} is empty", self.header()));
                }
                record.image_filename = raw.to_string();
            }
            Self::DetectionIndex => record.detection_index = parse_number(self, raw)?,
            Self::ImageWidth => record.image_width = parse_optional(self, raw)?,
            Self::ImageHeight => record.image_height = parse_optional(self, raw)?,
            Self::Timestamp => record.timestamp = non_empty(raw),
            Self::ClassId => record.class = DetectorClass::from_id(parse_number(self, raw)?),
            Self::DetectionConfidence => record.detection_confidence = parse_number(self, raw)?,
            Self::XMin => record.bbox.x_min = parse_number(self, raw)?,
            Self::YMin => record.bbox.y_min = parse_number(self, raw)?,
            Self::XMax => record.bbox.x_max = parse_number(self, raw)?,
            Self::YMax => record.bbox.y_max = parse_number(self, raw)?,
            Self::PredictedSpecies => record.predicted_species = non_empty(raw),
            Self::ClassificationConfidence => {
                record.classification_confidence = if raw.is_empty() {
                    0.0
                } else {
                    parse_number(self, raw)?
                };
            }
        }
        Ok(())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Float cell format: shortest round-trip digits, always with a decimal point.
pub(crate) fn format_float(value: f64) -> String {
    format!("{value:?}")
}

fn encode_optional(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn non_empty(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_string())
}

fn parse_number<T: std::str::FromStr>(column: Column, raw: &str) -> std::result::Result<T, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("{column}: '{raw}' is not a valid number"))
}

fn parse_optional(column: Column, raw: &str) -> std::result::Result<Option<u32>, String> {
    if raw.is_empty() {
        Ok(None)
    } else {
        parse_number(column, raw).map(Some)
    }
}

/// The authoritative column order shared by every pass that writes the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder(Vec<Column>);

impl ColumnOrder {
    /// The default order used by the `run` command.
    pub fn master() -> Self {
        Self(Column::ALL.to_vec())
    }

    /// Parse a comma-separated list of header names.
    ///
    /// Every known column must appear exactly once; unknown names are
    /// rejected instead of silently dropping data.
    pub fn parse(list: &str) -> Result<Self> {
        let mut order = Vec::with_capacity(Column::ALL.len());

        for name in list.split(',').map(str::trim) {
            let column = Column::from_header(name).ok_or_else(|| Error::InvalidColumnOrder {
                message: format!("unknown column '{name}'"),
            })?;
            if order.contains(&column) {
                return Err(Error::InvalidColumnOrder {
                    message: format!("column '{name}' listed more than once"),
                });
            }
            order.push(column);
        }

        let missing: Vec<&str> = Column::ALL
            .iter()
            .filter(|c| !order.contains(c))
            .map(|c| c.header())
            .collect();
        if !missing.is_empty() {
            return Err(Error::InvalidColumnOrder {
                message: format!("missing column(s): {}", missing.join(", ")),
            });
        }

        Ok(Self(order))
    }

    /// Columns in persisted order.
    pub fn columns(&self) -> &[Column] {
        &self.0
    }

    /// Header row.
    pub fn headers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|c| c.header())
    }

    /// Encode one record as a row in this order.
    pub fn encode(&self, record: &DetectionRecord) -> Vec<String> {
        self.0.iter().map(|c| c.encode(record)).collect()
    }
}

impl Default for ColumnOrder {
    fn default() -> Self {
        Self::master()
    }
}

impl fmt::Display for ColumnOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<&str> = self.headers().collect();
        f.write_str(&headers.join(","))
    }
}

impl std::str::FromStr for ColumnOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const MASTER: &str = "Image_Filename,Detection_Index,Image_Width,Image_Height,Timestamp,MD_Class_ID,MD_Confidence,X_min,Y_min,X_max,Y_max,Predicted_Species,Classification_Confidence";

    #[test]
    fn test_master_order_matches_string() {
        assert_eq!(ColumnOrder::master().to_string(), MASTER);
        assert_eq!(ColumnOrder::parse(MASTER).unwrap(), ColumnOrder::master());
    }

    #[test]
    fn test_parse_custom_order() {
        let reordered = MASTER.replace("Image_Filename,Detection_Index", "Detection_Index,Image_Filename");
        let order = ColumnOrder::parse(&reordered).unwrap();
        assert_eq!(order.columns()[0], Column::DetectionIndex);
        assert_eq!(order.columns()[1], Column::ImageFilename);
    }

    #[test]
    fn test_parse_rejects_unknown_column() {
        let list = format!("{MASTER},Extra");
        assert!(matches!(
            ColumnOrder::parse(&list),
            Err(Error::InvalidColumnOrder { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_duplicate_column() {
        let list = format!("{MASTER},Timestamp");
        assert!(ColumnOrder::parse(&list).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_column() {
        let list = MASTER.replace(",Timestamp", "");
        let err = ColumnOrder::parse(&list).unwrap_err();
        assert!(err.to_string().contains("Timestamp"));
    }

    #[test]
    fn test_float_format_keeps_decimal_point() {
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(0.95), "0.95");
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(f64::from(0.9_f32)), "0.8999999761581421");
    }

    #[test]
    fn test_decode_blank_optionals() {
        let mut record = DetectionRecord::blank();
        Column::ImageWidth.decode(&mut record, "").unwrap();
        Column::Timestamp.decode(&mut record, "").unwrap();
        Column::ClassificationConfidence.decode(&mut record, "").unwrap();
        assert_eq!(record.image_width, None);
        assert_eq!(record.timestamp, None);
        assert_eq!(record.classification_confidence, 0.0);
    }

    #[test]
    fn test_decode_rejects_bad_number() {
        let mut record = DetectionRecord::blank();
        let err = Column::XMin.decode(&mut record, "ten").unwrap_err();
        assert!(err.contains("X_min"));
        assert!(Column::DetectionConfidence.decode(&mut record, "").is_err());
    }
}
