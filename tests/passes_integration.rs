//! End-to-end tests for the individual passes on a temporary workspace.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

mod common;

use camtrap::Error;
use camtrap::config::Thresholds;
use camtrap::imaging::{Annotator, DrawStyle};
use camtrap::locking::{LockInfo, StoreLock};
use camtrap::passes::{self, visualize::VisualizeTargets};
use camtrap::store::{self, BoundingBox, ColumnOrder, DetectionRecord, DetectorClass};
use common::{FixedClassifier, ScriptedDetector, detection, write_jpeg};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    images: PathBuf,
    store: PathBuf,
    root: PathBuf,
}

fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let root = dir.path().to_path_buf();
    let images = root.join("images");
    fs::create_dir_all(&images).unwrap();
    Workspace {
        store: root.join("data/main_detection_log.csv"),
        images,
        root,
        _dir: dir,
    }
}

fn annotator() -> Annotator {
    Annotator::new(
        None,
        DrawStyle {
            box_thickness: 2,
            label_scale: 16.0,
        },
    )
}

fn run_detect(ws: &Workspace, detector: &mut ScriptedDetector) {
    passes::detect::run(&ws.images, &ws.store, &ColumnOrder::master(), detector, false).unwrap();
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .split("\r\n")
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[test]
fn test_detect_writes_rows_and_sentinels() {
    let ws = workspace();
    write_jpeg(&ws.images, "b.jpg", 64, 48);
    write_jpeg(&ws.images, "a.JPG", 64, 48);
    write_jpeg(&ws.images, "c.jpg", 64, 48);
    fs::write(ws.images.join("notes.txt"), "not an image").unwrap();

    let mut detector = ScriptedDetector::default()
        .with(
            "b.jpg",
            vec![
                detection([1.0, 2.0, 30.4, 40.6], 0, 0.9),
                detection([5.0, 5.0, 20.0, 20.0], 1, 0.4),
            ],
        )
        .failing_on("c.jpg");

    let summary =
        passes::detect::run(&ws.images, &ws.store, &ColumnOrder::master(), &mut detector, false)
            .unwrap();

    // Images are visited in name order; the text file is ignored.
    assert_eq!(detector.calls, vec!["a.JPG", "b.jpg", "c.jpg"]);
    assert_eq!(summary.images_processed, 2);
    assert_eq!(summary.images_skipped, 1);

    let records = store::load(&ws.store).unwrap().records;
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].image_filename, "a.JPG");
    assert_eq!(records[0].class, DetectorClass::Empty);
    assert_eq!(records[0].bbox, BoundingBox::default());
    assert_eq!(records[0].predicted_species.as_deref(), Some("empty"));

    assert_eq!(records[1].key(), ("b.jpg", 0));
    assert_eq!(records[1].class, DetectorClass::Animal);
    assert_eq!(records[2].key(), ("b.jpg", 1));
    assert_eq!(records[2].class, DetectorClass::Person);
    assert!(!records.iter().any(|r| r.image_filename == "c.jpg"));
    assert!(!StoreLock::is_locked(&ws.store));
}

#[test]
fn test_detect_without_images_fails() {
    let ws = workspace();
    let mut detector = ScriptedDetector::default();
    let result =
        passes::detect::run(&ws.images, &ws.store, &ColumnOrder::master(), &mut detector, false);
    assert!(matches!(result, Err(Error::NoImagesFound { .. })));
    assert!(!ws.store.exists());
}

#[test]
fn test_metadata_fills_dimensions_and_is_idempotent() {
    let ws = workspace();
    write_jpeg(&ws.images, "a.jpg", 64, 48);
    write_jpeg(&ws.images, "b.jpg", 32, 16);
    let mut detector = ScriptedDetector::default()
        .with("a.jpg", vec![detection([1.0, 1.0, 10.0, 10.0], 0, 0.8)]);
    run_detect(&ws, &mut detector);

    let order = ColumnOrder::master();
    passes::metadata::run(&ws.images, &ws.store, &order, false).unwrap();
    let first = fs::read(&ws.store).unwrap();

    let records = store::load(&ws.store).unwrap().records;
    assert!(records.iter().all(DetectionRecord::has_metadata));
    assert_eq!((records[0].image_width, records[0].image_height), (Some(64), Some(48)));
    assert_eq!((records[1].image_width, records[1].image_height), (Some(32), Some(16)));
    assert_eq!(records[0].timestamp, None);

    passes::metadata::run(&ws.images, &ws.store, &order, false).unwrap();
    assert_eq!(fs::read(&ws.store).unwrap(), first);
}

#[test]
fn test_metadata_on_missing_store() {
    let ws = workspace();
    let result = passes::metadata::run(&ws.images, &ws.store, &ColumnOrder::master(), false);
    assert!(matches!(result, Err(Error::StoreNotFound { .. })));
    assert!(!StoreLock::lock_path_for(&ws.store).exists());
}

#[test]
fn test_classify_only_touches_animals() {
    let ws = workspace();
    write_jpeg(&ws.images, "a.jpg", 64, 64);
    write_jpeg(&ws.images, "b.jpg", 64, 64);
    let mut detector = ScriptedDetector::default().with(
        "a.jpg",
        vec![
            detection([4.0, 4.0, 40.0, 40.0], 0, 0.9),
            detection([10.0, 10.0, 30.0, 50.0], 1, 0.7),
            detection([0.0, 0.0, 60.0, 20.0], 2, 0.6),
        ],
    );
    run_detect(&ws, &mut detector);
    let before = lines(&ws.store);

    let mut classifier = FixedClassifier::new("Zebra", 0.9);
    let summary = passes::classify::run(
        &ws.images,
        &ws.store,
        &ColumnOrder::master(),
        &mut classifier,
        false,
    )
    .unwrap();

    assert_eq!(classifier.calls, 1);
    assert_eq!(summary.rows_affected, 1);

    let after = lines(&ws.store);
    assert_eq!(before.len(), after.len());
    // Header, person, vehicle and sentinel rows are unchanged.
    for i in [0, 2, 3, 4] {
        assert_eq!(before[i], after[i]);
    }
    assert!(after[1].ends_with(",Zebra,0.8999999761581421"));
}

#[test]
fn test_classify_skips_missing_image() {
    let ws = workspace();
    write_jpeg(&ws.images, "a.jpg", 64, 64);
    let mut detector = ScriptedDetector::default()
        .with("a.jpg", vec![detection([4.0, 4.0, 40.0, 40.0], 0, 0.9)]);
    run_detect(&ws, &mut detector);
    fs::remove_file(ws.images.join("a.jpg")).unwrap();

    let mut classifier = FixedClassifier::new("Zebra", 0.9);
    let summary = passes::classify::run(
        &ws.images,
        &ws.store,
        &ColumnOrder::master(),
        &mut classifier,
        false,
    )
    .unwrap();

    assert_eq!(classifier.calls, 0);
    assert_eq!(summary.images_skipped, 1);
    assert_eq!(store::load(&ws.store).unwrap().records[0].predicted_species, None);
}

#[test]
fn test_sort_copies_into_partition() {
    let ws = workspace();
    for name in ["busy.jpg", "faint.jpg", "blank.jpg"] {
        write_jpeg(&ws.images, name, 16, 16);
    }
    let mut detector = ScriptedDetector::default()
        .with("busy.jpg", vec![detection([1.0, 1.0, 8.0, 8.0], 0, 0.5)])
        .with("faint.jpg", vec![detection([1.0, 1.0, 8.0, 8.0], 0, 0.05)]);
    run_detect(&ws, &mut detector);

    let sorted = ws.root.join("sorted");
    let report =
        passes::sort::run(&ws.images, &ws.store, &sorted, &Thresholds::default(), false).unwrap();

    assert_eq!(report.partition.non_empty, vec!["busy.jpg"]);
    assert_eq!(report.partition.empty, vec!["blank.jpg", "faint.jpg"]);
    assert!(sorted.join("non-empty/busy.jpg").is_file());
    assert!(sorted.join("empty/faint.jpg").is_file());
    assert!(sorted.join("empty/blank.jpg").is_file());
    assert!(!sorted.join("empty/busy.jpg").exists());
}

#[test]
fn test_visualize_writes_annotations_and_crops() {
    let ws = workspace();
    write_jpeg(&ws.images, "herd.jpg", 96, 96);
    write_jpeg(&ws.images, "blank.jpg", 96, 96);

    let records = vec![
        {
            let mut r = DetectionRecord::detection(
                "herd.jpg",
                0,
                DetectorClass::Animal,
                0.9,
                BoundingBox { x_min: 10, y_min: 10, x_max: 40, y_max: 50 },
            );
            r.predicted_species = Some("Zebra".to_string());
            r.classification_confidence = 0.95;
            r
        },
        {
            let mut r = DetectionRecord::detection(
                "herd.jpg",
                1,
                DetectorClass::Animal,
                0.8,
                BoundingBox { x_min: 50, y_min: 50, x_max: 90, y_max: 90 },
            );
            r.predicted_species = Some("Grant's gazelle".to_string());
            r.classification_confidence = 0.5;
            r
        },
        DetectionRecord::detection(
            "herd.jpg",
            2,
            DetectorClass::Person,
            0.7,
            BoundingBox { x_min: 0, y_min: 0, x_max: 20, y_max: 20 },
        ),
        DetectionRecord::sentinel("blank.jpg"),
    ];
    store::save(&ws.store, &records, &ColumnOrder::master()).unwrap();

    let annotated = ws.root.join("annotated");
    let crops = ws.root.join("crops");
    let summary = passes::visualize::run(
        &ws.images,
        &ws.store,
        VisualizeTargets {
            annotated_dir: &annotated,
            crop_dir: &crops,
        },
        &Thresholds::default(),
        &annotator(),
        false,
    )
    .unwrap();

    assert_eq!(summary.images_processed, 1);
    assert!(annotated.join("herd.jpg").is_file());
    assert!(!annotated.join("blank.jpg").exists());

    assert!(crops.join("zebra/herd_crop_0.jpg").is_file());
    assert!(crops.join("unknown/herd_crop_1.jpg").is_file());
    assert!(!crops.join("person").exists());

    let crop = image::open(crops.join("zebra/herd_crop_0.jpg")).unwrap();
    assert_eq!((crop.width(), crop.height()), (30, 40));
}

#[test]
fn test_export_filters_species() {
    let ws = workspace();
    let mut zebra = DetectionRecord::detection(
        "a.jpg",
        0,
        DetectorClass::Animal,
        0.9,
        BoundingBox { x_min: 10, y_min: 20, x_max: 50, y_max: 80 },
    );
    zebra.predicted_species = Some("Zebra".to_string());
    zebra.timestamp = Some("2016:07:11 06:32:10".to_string());
    zebra.image_width = Some(1920);
    zebra.image_height = Some(1080);
    let mut unknown = zebra.clone();
    unknown.image_filename = "b.jpg".to_string();
    unknown.predicted_species = Some("Unknown".to_string());
    store::save(
        &ws.store,
        &[zebra, unknown, DetectionRecord::sentinel("c.jpg")],
        &ColumnOrder::master(),
    )
    .unwrap();

    let output = ws.root.join("data/analyzed_data.json");
    passes::export::run(&ws.store, &output).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["file_name"], "a.jpg");
    assert_eq!(entries[0]["width"], 1920);
    assert_eq!(entries[0]["datetime_original"], "2016:07:11 06:32:10");
    assert_eq!(entries[0]["annotations"][0]["category"], "Zebra");
    assert_eq!(entries[0]["annotations"][0]["bbox"], serde_json::json!([10, 20, 40, 60]));
}

#[test]
fn test_metadata_leaves_rows_of_missing_image_unchanged() {
    let ws = workspace();
    write_jpeg(&ws.images, "here.jpg", 24, 12);
    let mut gone = DetectionRecord::sentinel("gone.jpg");
    gone.image_width = Some(10);
    gone.image_height = Some(20);
    gone.timestamp = Some("2016:01:01 00:00:00".to_string());
    let order = ColumnOrder::master();
    store::save(&ws.store, &[gone.clone(), DetectionRecord::sentinel("here.jpg")], &order)
        .unwrap();

    let summary = passes::metadata::run(&ws.images, &ws.store, &order, false).unwrap();

    assert_eq!(summary.images_skipped, 1);
    assert_eq!(summary.images_processed, 1);
    let records = store::load(&ws.store).unwrap().records;
    assert_eq!(records[0], gone);
    assert_eq!((records[1].image_width, records[1].image_height), (Some(24), Some(12)));
}

#[test]
fn test_visualize_skips_missing_image() {
    let ws = workspace();
    let records = vec![DetectionRecord::detection(
        "gone.jpg",
        0,
        DetectorClass::Animal,
        0.9,
        BoundingBox { x_min: 1, y_min: 1, x_max: 8, y_max: 8 },
    )];
    store::save(&ws.store, &records, &ColumnOrder::master()).unwrap();

    let annotated = ws.root.join("annotated");
    let crops = ws.root.join("crops");
    let summary = passes::visualize::run(
        &ws.images,
        &ws.store,
        VisualizeTargets {
            annotated_dir: &annotated,
            crop_dir: &crops,
        },
        &Thresholds::default(),
        &annotator(),
        false,
    )
    .unwrap();

    assert_eq!(summary.images_skipped, 1);
    assert_eq!(summary.images_processed, 0);
    assert!(!annotated.join("gone.jpg").exists());
    assert!(!crops.exists() || fs::read_dir(&crops).unwrap().next().is_none());
}

#[test]
fn test_sort_skips_missing_source_and_overwrites_on_rerun() {
    let ws = workspace();
    write_jpeg(&ws.images, "here.jpg", 16, 16);
    store::save(
        &ws.store,
        &[DetectionRecord::sentinel("gone.jpg"), DetectionRecord::sentinel("here.jpg")],
        &ColumnOrder::master(),
    )
    .unwrap();

    let sorted = ws.root.join("sorted");
    let report =
        passes::sort::run(&ws.images, &ws.store, &sorted, &Thresholds::default(), false).unwrap();

    assert_eq!(report.summary.images_skipped, 1);
    assert!(!sorted.join("empty/gone.jpg").exists());
    assert!(sorted.join("empty/here.jpg").is_file());

    write_jpeg(&ws.images, "here.jpg", 32, 8);
    passes::sort::run(&ws.images, &ws.store, &sorted, &Thresholds::default(), false).unwrap();
    assert_eq!(
        fs::read(sorted.join("empty/here.jpg")).unwrap(),
        fs::read(ws.images.join("here.jpg")).unwrap()
    );
}

#[test]
fn test_export_skips_malformed_row_only() {
    let ws = workspace();
    let header = ColumnOrder::master().to_string();
    fs::create_dir_all(ws.store.parent().unwrap()).unwrap();
    fs::write(
        &ws.store,
        format!(
            "{header}\r\n\
             a.jpg,0,640,480,,0,0.9,bad,2,30,40,Zebra,0.8\r\n\
             a.jpg,1,640,480,,0,0.9,10,20,50,80,Zebra,0.95\r\n"
        ),
    )
    .unwrap();

    let output = ws.root.join("out.json");
    passes::export::run(&ws.store, &output).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["file_name"], "a.jpg");
    assert_eq!(entries[0]["width"], 640);
    let annotations = entries[0]["annotations"].as_array().unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0]["detection_id"], 1);
    assert_eq!(annotations[0]["bbox"], serde_json::json!([10, 20, 40, 60]));
}

#[test]
#[serial]
fn test_second_writer_is_rejected() {
    let ws = workspace();
    write_jpeg(&ws.images, "a.jpg", 16, 16);
    let mut detector = ScriptedDetector::default();
    run_detect(&ws, &mut detector);

    let _held = StoreLock::acquire(&ws.store).unwrap();
    let result = passes::metadata::run(&ws.images, &ws.store, &ColumnOrder::master(), false);
    assert!(matches!(result, Err(Error::StoreLocked { .. })));

    // Readers are not blocked.
    let output = ws.root.join("out.json");
    assert!(passes::export::run(&ws.store, &output).is_ok());
}

#[test]
#[serial]
#[cfg(target_os = "linux")]
fn test_lock_left_by_killed_run_does_not_block() {
    let ws = workspace();
    write_jpeg(&ws.images, "a.jpg", 16, 16);
    let mut detector = ScriptedDetector::default();
    run_detect(&ws, &mut detector);

    let info = LockInfo {
        pid: u32::MAX,
        hostname: hostname::get().unwrap().to_string_lossy().into_owned(),
        started: chrono::Utc::now(),
        store: ws.store.clone(),
    };
    let lock_path = StoreLock::lock_path_for(&ws.store);
    fs::write(&lock_path, serde_json::to_string(&info).unwrap()).unwrap();

    passes::metadata::run(&ws.images, &ws.store, &ColumnOrder::master(), false).unwrap();
    assert!(!lock_path.exists());
}
