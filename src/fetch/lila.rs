//! Snapshot Serengeti sample selection from the LILA metadata CSVs.

use crate::constants::fetch::{BASE_URL, CAPTURE_ID_COLUMN, PATH_COLUMN};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An image to fetch for a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Capture the image belongs to.
    pub capture_id: String,
    /// Path relative to the dataset root.
    pub path_rel: String,
}

impl ImageRef {
    /// Download URL.
    pub fn url(&self) -> String {
        format!("{BASE_URL}{}", self.path_rel)
    }

    /// Local destination: the file's base name inside `output_dir`.
    pub fn destination(&self, output_dir: &Path) -> PathBuf {
        let name = self.path_rel.rsplit('/').next().unwrap_or(&self.path_rel);
        output_dir.join(name)
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::DatasetRead {
            path: path.to_path_buf(),
            source: e,
        })
}

fn column_index(reader: &mut csv::Reader<std::fs::File>, path: &Path, name: &str) -> Result<usize> {
    let headers = reader.headers().map_err(|e| Error::DatasetRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| Error::ConfigValidation {
            message: format!("{} has no '{name}' column", path.display()),
        })
}

/// Distinct capture ids containing `season`, in file order, up to `limit`.
///
/// A negative `limit` means no limit.
pub fn collect_captures(annotations: &Path, season: &str, limit: i64) -> Result<Vec<String>> {
    let max = usize::try_from(limit).ok();
    let mut reader = open_reader(annotations)?;
    let capture_col = column_index(&mut reader, annotations, CAPTURE_ID_COLUMN)?;

    let mut seen = HashSet::new();
    let mut captures = Vec::new();

    for row in reader.records() {
        if max.is_some_and(|m| captures.len() >= m) {
            break;
        }
        let row = row.map_err(|e| Error::DatasetRead {
            path: annotations.to_path_buf(),
            source: e,
        })?;
        let Some(capture_id) = row.get(capture_col) else {
            continue;
        };
        if capture_id.contains(season) && seen.insert(capture_id.to_string()) {
            captures.push(capture_id.to_string());
        }
    }

    debug!("Collected {} capture(s) for {season}", captures.len());
    Ok(captures)
}

/// Iterate image rows whose capture id is in `targets`.
pub fn image_refs<'a>(
    images: &'a Path,
    targets: &'a HashSet<String>,
) -> Result<impl Iterator<Item = Result<ImageRef>> + 'a> {
    let mut reader = open_reader(images)?;
    let capture_col = column_index(&mut reader, images, CAPTURE_ID_COLUMN)?;
    let path_col = column_index(&mut reader, images, PATH_COLUMN)?;

    Ok(reader.into_records().filter_map(move |row| {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                return Some(Err(Error::DatasetRead {
                    path: images.to_path_buf(),
                    source: e,
                }));
            }
        };
        let capture_id = row.get(capture_col)?;
        let path_rel = row.get(path_col)?;
        (targets.contains(capture_id) && !path_rel.is_empty()).then(|| {
            Ok(ImageRef {
                capture_id: capture_id.to_string(),
                path_rel: path_rel.to_string(),
            })
        })
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ANNOTATIONS: &str = "capture_id,season,question__species\n\
        SER_S5#B01#1#1,S5,zebra\n\
        SER_S5#B01#1#1,S5,wildebeest\n\
        SER_S4#B01#1#1,S4,lion\n\
        SER_S5#B01#1#2,S5,empty\n\
        SER_S5#B02#1#3,S5,gazelle\n";

    #[test]
    fn test_collect_captures_distinct_and_limited() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annotations.csv");
        fs::write(&path, ANNOTATIONS).unwrap();

        let all = collect_captures(&path, "SER_S5#", -1).unwrap();
        assert_eq!(all, vec!["SER_S5#B01#1#1", "SER_S5#B01#1#2", "SER_S5#B02#1#3"]);

        let limited = collect_captures(&path, "SER_S5#", 2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annotations.csv");
        fs::write(&path, "id,season\n1,S5\n").unwrap();
        assert!(collect_captures(&path, "SER_S5#", -1).is_err());
    }

    #[test]
    fn test_image_refs_filters_targets() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("images.csv");
        fs::write(
            &path,
            "capture_id,image_path_rel\n\
             SER_S5#B01#1#1,S5/B01/B01_R1/S5_B01_R1_IMAG0001.JPG\n\
             SER_S4#B01#1#1,S4/B01/B01_R1/S4_B01_R1_IMAG0001.JPG\n\
             SER_S5#B01#1#1,S5/B01/B01_R1/S5_B01_R1_IMAG0002.JPG\n",
        )
        .unwrap();

        let targets: HashSet<String> = ["SER_S5#B01#1#1".to_string()].into_iter().collect();
        let refs: Vec<ImageRef> = image_refs(&path, &targets)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(
            refs[0].url(),
            "https://lilawildlife.blob.core.windows.net/lila-wildlife/snapshotserengeti-unzipped/S5/B01/B01_R1/S5_B01_R1_IMAG0001.JPG"
        );
        assert_eq!(
            refs[0].destination(Path::new("raw")),
            PathBuf::from("raw/S5_B01_R1_IMAG0001.JPG")
        );
    }
}
