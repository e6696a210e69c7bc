//! Loading and rewriting the master detection log.
//!
//! The whole table is the unit of consistency: a load reads every row,
//! a save rewrites every row through a temporary file that is renamed
//! over the target, so readers never observe a partial table.

use crate::constants::STORE_TEMP_EXTENSION;
use crate::error::{Error, Result};
use crate::store::{Column, ColumnOrder, DetectionRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A row that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// 1-based line number in the file.
    pub line: u64,
    /// Why the row was rejected.
    pub reason: String,
}

/// Contents of a detection log.
#[derive(Debug, Clone)]
pub struct LoadedStore {
    /// Path the store was read from.
    pub path: PathBuf,
    /// Decoded records in file order.
    pub records: Vec<DetectionRecord>,
    /// Rows that failed to decode.
    pub rejected: Vec<RejectedRow>,
}

impl LoadedStore {
    /// Fail with [`Error::EmptyStore`] when there are no usable records.
    pub fn require_records(self) -> Result<Self> {
        if self.records.is_empty() {
            return Err(Error::EmptyStore { path: self.path });
        }
        Ok(self)
    }

    /// Fail with [`Error::MalformedStore`] when any row was rejected.
    ///
    /// Passes that rewrite the log call this so a rewrite cannot drop rows.
    pub fn require_clean(&self) -> Result<()> {
        match self.rejected.first() {
            None => Ok(()),
            Some(first) => Err(Error::MalformedStore {
                path: self.path.clone(),
                count: self.rejected.len(),
                first_line: first.line,
                reason: first.reason.clone(),
            }),
        }
    }

    /// Log every rejected row; used by the read-only passes, which skip them.
    pub fn warn_rejected(&self) {
        for row in &self.rejected {
            warn!(
                "Skipping malformed row at {}:{}: {}",
                self.path.display(),
                row.line,
                row.reason
            );
        }
    }
}

/// Load the detection log at `path`.
///
/// Header names are matched by name, so a table written in any column
/// order loads. An empty file yields an empty store.
pub fn load(path: &Path) -> Result<LoadedStore> {
    if !path.is_file() {
        return Err(Error::StoreNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| Error::StoreRead {
            path: path.to_path_buf(),
            source: e,
        })?;

    let headers = reader
        .headers()
        .map_err(|e| Error::StoreRead {
            path: path.to_path_buf(),
            source: e,
        })?
        .clone();

    // An empty file has an empty header row and no records.
    let header_columns = if headers.iter().all(str::is_empty) {
        Vec::new()
    } else {
        headers
            .iter()
            .map(|name| {
                Column::from_header(name).ok_or_else(|| Error::UnknownColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?
    };

    let mut records = Vec::new();
    let mut rejected = Vec::new();

    // Lines are 1-based with the header on line 1.
    for (index, result) in reader.records().enumerate() {
        let line = index as u64 + 2;
        match result {
            Ok(row) => match decode_row(&header_columns, &row) {
                Ok(record) => records.push(record),
                Err(reason) => rejected.push(RejectedRow { line, reason }),
            },
            Err(e) => {
                rejected.push(RejectedRow {
                    line,
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        "Loaded {} record(s) ({} rejected) from {}",
        records.len(),
        rejected.len(),
        path.display()
    );

    Ok(LoadedStore {
        path: path.to_path_buf(),
        records,
        rejected,
    })
}

fn decode_row(
    columns: &[Column],
    row: &csv::StringRecord,
) -> std::result::Result<DetectionRecord, String> {
    let mut record = DetectionRecord::blank();
    let mut has_filename = false;

    for (column, raw) in columns.iter().zip(row.iter()) {
        column.decode(&mut record, raw)?;
        has_filename |= *column == Column::ImageFilename;
    }

    if !has_filename {
        return Err("row has no Image_Filename".to_string());
    }

    Ok(record)
}

/// Rewrite the detection log with `records` in `order`.
///
/// The table is written to a sibling temporary file and renamed over
/// `path`; parent directories are created as needed.
pub fn save(path: &Path, records: &[DetectionRecord], order: &ColumnOrder) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::OutputDirCreateFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp_path = temp_path_for(path);

    if let Err(e) = write_table(&temp_path, records, order) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path)?;

    debug!("Wrote {} record(s) to {}", records.len(), path.display());
    Ok(())
}

fn write_table(path: &Path, records: &[DetectionRecord], order: &ColumnOrder) -> Result<()> {
    let csv_error = |e: csv::Error| Error::StoreWrite {
        path: path.to_path_buf(),
        source: e,
    };

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_path(path)
        .map_err(csv_error)?;

    writer.write_record(order.headers()).map_err(csv_error)?;
    for record in records {
        writer.write_record(order.encode(record)).map_err(csv_error)?;
    }

    let file = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

/// Temporary file a rewrite of `path` goes through.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "store".into(), |n| n.to_string_lossy());
    path.with_file_name(format!("{name}{STORE_TEMP_EXTENSION}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{BoundingBox, DetectorClass};
    use tempfile::TempDir;

    fn sample_records() -> Vec<DetectionRecord> {
        vec![
            DetectionRecord::detection(
                "a.jpg",
                0,
                DetectorClass::Animal,
                0.93,
                BoundingBox {
                    x_min: 10,
                    y_min: 20,
                    x_max: 50,
                    y_max: 80,
                },
            ),
            DetectionRecord::sentinel("b.jpg"),
        ]
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load(&dir.path().join("absent.csv"));
        assert!(matches!(result, Err(Error::StoreNotFound { .. })));
    }

    #[test]
    fn test_load_empty_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        fs::write(&path, "").unwrap();

        let store = load(&path).unwrap();
        assert!(store.records.is_empty());
        assert!(matches!(
            store.require_records(),
            Err(Error::EmptyStore { .. })
        ));
    }

    #[test]
    fn test_save_writes_header_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/log.csv");
        save(&path, &sample_records(), &ColumnOrder::master()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), ColumnOrder::master().to_string());
        assert_eq!(
            lines.next().unwrap(),
            "a.jpg,0,,,,0,0.93,10,20,50,80,,0.0"
        );
        assert_eq!(lines.next().unwrap(), "b.jpg,0,,,,-1,0.0,0,0,0,0,empty,0.0");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_malformed_row_is_rejected_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let header = ColumnOrder::master().to_string();
        fs::write(
            &path,
            format!(
                "{header}\r\na.jpg,0,,,,0,0.9,1,2,3,4,,0.0\r\nb.jpg,0,,,,0,0.9,x,2,3,4,,0.0\r\n"
            ),
        )
        .unwrap();

        let store = load(&path).unwrap();
        assert_eq!(store.records.len(), 1);
        assert_eq!(store.rejected.len(), 1);
        assert_eq!(store.rejected[0].line, 3);
        assert!(matches!(
            store.require_clean(),
            Err(Error::MalformedStore { count: 1, .. })
        ));
    }

    #[test]
    fn test_rejected_line_counts_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        let header = ColumnOrder::master().to_string();
        fs::write(
            &path,
            format!("{header}\nb.jpg,0,,,,0,0.9,x,2,3,4,,0.0\na.jpg,0,,,,0,0.9,1,2,3,4,,0.0\nc.jpg,0,,,,0,bad,1,2,3,4,,0.0\n"),
        )
        .unwrap();

        let store = load(&path).unwrap();
        let lines: Vec<u64> = store.rejected.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 4]);
    }

    #[test]
    fn test_unknown_header_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        fs::write(&path, "Image_Filename,Bogus\r\na.jpg,1\r\n").unwrap();

        assert!(matches!(load(&path), Err(Error::UnknownColumn { .. })));
    }
}
