use std::fs;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use ndarray::Array3;
use redlight_track::evidence::{SubmitOutcome, WorkerStats};
use redlight_track::{EvidenceJob, EvidenceQueue, EvidenceStore, FileEvidenceStore, Frame, Rect};

fn frame(index: u64) -> Arc<Frame> {
    let mut pixels = Array3::<u8>::zeros((48, 64, 3));
    pixels.slice_mut(ndarray::s![10..30, 20..40, ..]).fill(180);
    Arc::new(Frame::new(pixels, index))
}

fn job(identifier: &str, window: usize) -> EvidenceJob {
    let full = frame(7);
    let bbox = Rect::from_tlbr(20.0, 10.0, 40.0, 30.0);
    EvidenceJob {
        vehicle_id: 3,
        identifier: identifier.to_owned(),
        violation_type: "Red Light".into(),
        class_id: 2,
        proof_crop: full.crop(&bbox, 4),
        frame: Arc::clone(&full),
        bbox,
        frame_window: (0..window as u64).map(frame).collect(),
        fps: 10.0,
        timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
    }
}

#[test]
fn test_file_store_writes_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileEvidenceStore::new(dir.path()).unwrap();

    store.persist(&job("51F12345", 3)).unwrap();

    let proofs = store.proofs_dir();
    let stem = "Red_Light_51F12345_1700000000";
    assert!(proofs.join(format!("{stem}.jpg")).is_file());
    assert!(proofs.join(format!("{stem}_labeled.jpg")).is_file());
    for i in 0..3 {
        assert!(proofs.join(stem).join(format!("frame_{i:04}.jpg")).is_file());
    }

    let retraining = store.retraining_dir();
    assert!(retraining.join("train_3_1700000000.jpg").is_file());
    let label = fs::read_to_string(retraining.join("train_3_1700000000.txt")).unwrap();
    assert_eq!(label, "2 0.468750 0.416667 0.312500 0.416667");

    let crop = image::open(proofs.join(format!("{stem}.jpg"))).unwrap();
    assert_eq!((crop.width(), crop.height()), (28, 28));
}

#[test]
fn test_duplicate_delivery_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileEvidenceStore::new(dir.path()).unwrap();
    store.persist(&job("51F12345", 1)).unwrap();
    store.persist(&job("51F12345", 1)).unwrap();
}

#[test]
fn test_plate_text_cannot_escape_proofs_dir() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    let mut store = FileEvidenceStore::new(&root).unwrap();

    store.persist(&job("51F/12345", 2)).unwrap();
    store.persist(&job("../../outside", 0)).unwrap();

    let proofs = store.proofs_dir();
    assert!(proofs.join("Red_Light_51F_12345_1700000000.jpg").is_file());
    assert!(proofs.join("Red_Light_51F_12345_1700000000").join("frame_0001.jpg").is_file());
    assert!(proofs.join("Red_Light_______outside_1700000000.jpg").is_file());

    let siblings: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(siblings.len(), 1);
}

#[test]
fn test_worker_persists_until_stop() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileEvidenceStore::new(dir.path()).unwrap();
    let proofs = store.proofs_dir().to_path_buf();

    let queue = EvidenceQueue::bounded(4);
    let worker = queue.spawn_worker(store);
    assert_eq!(queue.submit(job("A1234", 0)), SubmitOutcome::Queued);
    assert_eq!(queue.submit(job("B5678", 2)), SubmitOutcome::Queued);
    queue.stop();

    assert_eq!(worker.join(), WorkerStats { persisted: 2, failed: 0 });
    assert!(proofs.join("Red_Light_A1234_1700000000.jpg").is_file());
    assert!(proofs.join("Red_Light_B5678_1700000000").is_dir());
    // An empty frame window writes no clip directory.
    assert!(!proofs.join("Red_Light_A1234_1700000000").exists());
}

#[test]
fn test_worker_survives_storage_failure() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileEvidenceStore::new(dir.path()).unwrap();

    let mut bad = job("C9999", 0);
    let pixels = Array3::<u8>::zeros((8, 8, 4));
    bad.frame = Arc::new(Frame::new(pixels, 0));
    bad.proof_crop = None;

    let queue = EvidenceQueue::bounded(4);
    let worker = queue.spawn_worker(store);
    queue.submit(bad);
    queue.submit(job("D0000", 0));
    queue.stop();

    assert_eq!(worker.join(), WorkerStats { persisted: 1, failed: 1 });
}
