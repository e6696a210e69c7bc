//! Grouping rows by image.

use crate::store::DetectionRecord;
use std::collections::HashMap;

/// Rows belonging to one image, as indices into the record slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGroup {
    /// The shared image file name.
    pub image_filename: String,
    /// Row indices in original order.
    pub rows: Vec<usize>,
}

impl ImageGroup {
    /// Iterate over this group's records.
    pub fn records<'a>(
        &'a self,
        records: &'a [DetectionRecord],
    ) -> impl Iterator<Item = &'a DetectionRecord> + 'a {
        self.rows.iter().map(move |&i| &records[i])
    }

    /// First record of the group.
    pub fn first<'a>(&self, records: &'a [DetectionRecord]) -> Option<&'a DetectionRecord> {
        self.rows.first().map(|&i| &records[i])
    }
}

/// Group records by image file name, in order of first appearance.
pub fn group_by_image(records: &[DetectionRecord]) -> Vec<ImageGroup> {
    let mut groups: Vec<ImageGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for (row, record) in records.iter().enumerate() {
        let slot = *index
            .entry(record.image_filename.as_str())
            .or_insert_with(|| {
                groups.push(ImageGroup {
                    image_filename: record.image_filename.clone(),
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
        groups[slot].rows.push(row);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BoundingBox, DetectorClass};

    fn row(name: &str, index: u32) -> DetectionRecord {
        DetectionRecord::detection(name, index, DetectorClass::Animal, 0.5, BoundingBox::default())
    }

    #[test]
    fn test_groups_in_first_appearance_order() {
        let records = vec![row("b.jpg", 0), row("a.jpg", 0), row("b.jpg", 1)];
        let groups = group_by_image(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].image_filename, "b.jpg");
        assert_eq!(groups[0].rows, vec![0, 2]);
        assert_eq!(groups[1].image_filename, "a.jpg");
        assert_eq!(groups[1].rows, vec![1]);
    }

    #[test]
    fn test_records_iterates_group_rows() {
        let records = vec![row("a.jpg", 0), row("a.jpg", 1)];
        let groups = group_by_image(&records);
        let indices: Vec<u32> = groups[0]
            .records(&records)
            .map(|r| r.detection_index)
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_image(&[]).is_empty());
    }
}
