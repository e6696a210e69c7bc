//! The master detection log: record model, column contract, load/save.

mod columns;
mod group;
mod record;
mod table;

pub use columns::{Column, ColumnOrder};
pub use group::{ImageGroup, group_by_image};
pub use record::{BoundingBox, DetectionRecord, DetectorClass};
pub use table::{LoadedStore, RejectedRow, load, save, temp_path_for};
