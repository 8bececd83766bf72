use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use redlight_track::evidence::WorkerStats;
use redlight_track::tracker::KalmanFilter;
use redlight_track::violation::{RED_LIGHT, RED_LIGHT_TURNING, VehicleParams};
use redlight_track::{
    AppConfig, CostFunction, Detection, DetectionSource, EvidenceJob, EvidenceStore, Frame,
    LightColor, LightState, PlateRecognizer, Rect, TrackedObject, TrackerSettings, TrafficPipeline,
    Vehicle, ViolationSettings, ViolationStatus, ZoneConfig,
};
use rstest::rstest;

/// Replays one detection list per frame index.
struct Scripted(Vec<Vec<Detection>>);

impl DetectionSource for Scripted {
    type Error = Infallible;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Infallible> {
        Ok(self.0.get(frame.index() as usize).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Persisted {
    vehicle_id: u64,
    identifier: String,
    violation_type: String,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Persisted>>>);

impl EvidenceStore for Recorder {
    fn persist(&mut self, job: &EvidenceJob) -> redlight_track::Result<()> {
        self.0.lock().unwrap().push(Persisted {
            vehicle_id: job.vehicle_id,
            identifier: job.identifier.clone(),
            violation_type: job.violation_type.clone(),
        });
        Ok(())
    }
}

fn config(plate_wait_frames: u32) -> AppConfig {
    AppConfig {
        tracking: TrackerSettings::Sort {
            cost_function: CostFunction::Iou,
            max_age: 3,
            min_hits: 1,
            iou_threshold: 0.1,
            conf_threshold: 0.25,
        },
        violation: ViolationSettings {
            fps: 10.0,
            video_proof_duration: 1.0,
            padding: 2,
            plate_wait_frames,
            ..ViolationSettings::default()
        },
    }
}

/// A recognizer that never gets a read.
fn unreadable() -> Box<dyn PlateRecognizer> {
    Box::new(|_: &Rect, _: &Frame| None::<String>)
}

fn red_straight() -> LightState {
    LightState::new(None, Some(LightColor::Red), None)
}

/// A 4x2 box at x 3..7 whose center moves down one pixel per frame from
/// y=2 until it has left the 10x10 ROI.
fn straight_run() -> Vec<Detection> {
    (2..20)
        .map(|cy| Detection::new(3.0, cy as f32 - 1.0, 7.0, cy as f32 + 1.0, 0.9))
        .collect()
}

fn square_zone() -> ZoneConfig {
    ZoneConfig::from_json(
        r#"{
            "polygon": [[0,0],[10,0],[10,10],[0,10]],
            "lines_config": {"violation_lines": [[0,5],[10,5]]}
        }"#,
    )
    .unwrap()
}

fn frames(
    count: usize,
    size: u32,
    lights: LightState,
) -> impl Iterator<Item = (Arc<Frame>, LightState)> {
    (0..count as u64).map(move |i| (Arc::new(Frame::blank(size, size, i)), lights))
}

/// Pipeline over `size`x`size` frames replaying one detection per frame.
fn replay(
    path: &[Detection],
    recognizer: Option<Box<dyn PlateRecognizer>>,
    plate_wait_frames: u32,
    zone: &ZoneConfig,
    size: u32,
    store: Recorder,
) -> TrafficPipeline<Scripted> {
    let detector = Scripted(path.iter().map(|d| vec![d.clone()]).collect());
    let config = config(plate_wait_frames);
    TrafficPipeline::from_config(detector, recognizer, &config, zone, size, size, store).unwrap()
}

#[test]
fn test_red_light_run_emits_one_job_with_plate() {
    let path = straight_run();
    let recognizer: Box<dyn PlateRecognizer> =
        Box::new(|_: &Rect, _: &Frame| Some(" 51F12345 ".to_owned()));
    let store = Recorder::default();
    let zone = square_zone();
    let mut pipeline = replay(&path, Some(recognizer), 100, &zone, 20, store.clone());

    let mut notices = Vec::new();
    let mut saw_pending = false;
    pipeline.run(frames(path.len(), 20, red_straight()), |report| {
        saw_pending |= report
            .vehicles
            .iter()
            .any(|v| v.status == ViolationStatus::Pending);
        notices.extend(report.violations);
    });
    assert!(saw_pending);
    assert_eq!(pipeline.manager().total(), 1);

    let stats = pipeline.shutdown();
    assert_eq!(stats, WorkerStats { persisted: 1, failed: 0 });

    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].violation_type, RED_LIGHT);
    assert_eq!(notices[0].identifier, "51F12345");

    let persisted = store.0.lock().unwrap().clone();
    assert_eq!(
        persisted,
        vec![Persisted {
            vehicle_id: 1,
            identifier: "51F12345".into(),
            violation_type: RED_LIGHT.into(),
        }]
    );
}

#[test]
fn test_unresolved_plate_waits_then_uses_track_id() {
    let path = straight_run();
    let zone = square_zone();
    let mut pipeline = replay(&path, Some(unreadable()), 3, &zone, 20, Recorder::default());

    let mut outside_frames = 0;
    let mut notices = Vec::new();
    pipeline.run(frames(path.len(), 20, red_straight()), |report| {
        let outside = report.vehicles.iter().any(|v| v.bbox.center().1 > 10.0);
        if outside {
            outside_frames += 1;
        }
        if !report.violations.is_empty() {
            // The wait is counted in frames spent outside the ROI.
            assert!(outside_frames > 3);
        }
        notices.extend(report.violations);
    });

    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].identifier, "1");
    assert_eq!(notices[0].violation_type, RED_LIGHT);
}

#[test]
fn test_green_light_run_is_not_a_violation() {
    let path = straight_run();
    let zone = square_zone();
    let mut pipeline = replay(&path, None, 0, &zone, 20, Recorder::default());

    let mut notices = Vec::new();
    let green = LightState::uniform(LightColor::Green);
    pipeline.run(frames(path.len(), 20, green), |report| {
        notices.extend(report.violations)
    });
    assert!(notices.is_empty());
}

#[rstest]
#[case::without_recognizer(false)]
#[case::with_unreadable_plate(true)]
fn test_vehicle_lost_soon_after_exit_is_still_reported(#[case] with_recognizer: bool) {
    // Two or three frames outside the ROI, then the detector loses it.
    let path: Vec<Detection> = straight_run().into_iter().take(12).collect();
    let recognizer = with_recognizer.then(unreadable);
    let store = Recorder::default();
    let zone = square_zone();
    let mut pipeline = replay(&path, recognizer, 100, &zone, 20, store.clone());

    let mut notices = Vec::new();
    pipeline.run(frames(path.len() + 6, 20, red_straight()), |report| {
        let index = report.frame_index;
        notices.extend(report.violations.into_iter().map(|n| (index, n)));
    });
    assert_eq!(pipeline.manager().total(), 1);
    assert_eq!(pipeline.shutdown(), WorkerStats { persisted: 1, failed: 0 });

    assert_eq!(notices.len(), 1);
    let (frame_index, notice) = &notices[0];
    assert_eq!(notice.identifier, "1");
    assert_eq!(notice.violation_type, RED_LIGHT);
    if with_recognizer {
        // Still waiting for a plate when the track was deleted.
        assert!(*frame_index >= path.len() as u64);
    } else {
        assert!(*frame_index < path.len() as u64);
    }
    assert_eq!(store.0.lock().unwrap().len(), 1);
}

/// 10x10 box centered on `(cx, cy)`.
fn boxed(cx: f32, cy: f32) -> Detection {
    Detection::new(cx - 5.0, cy - 5.0, cx + 5.0, cy + 5.0, 0.9)
}

/// 10x10 box: down through the stop line at y=50, then left through the
/// exception line at x=20 and out of the 100x100 ROI.
fn left_turn() -> Vec<Detection> {
    let mut path: Vec<Detection> = (0..9).map(|i| boxed(50.0, 30.0 + 4.0 * i as f32)).collect();
    path.extend((1..19).map(|i| boxed(50.0 - 4.0 * i as f32, 62.0)));
    path
}

#[rstest]
#[case(LightColor::Green, None)]
#[case(LightColor::Red, Some(RED_LIGHT_TURNING))]
fn test_left_exception_depends_on_left_light(
    #[case] left: LightColor,
    #[case] expected: Option<&str>,
) {
    let zone = ZoneConfig::from_json(
        r#"{
            "polygon": [[0,0],[100,0],[100,100],[0,100]],
            "lines_config": {
                "violation_lines": [[0,50],[100,50]],
                "left_exception_lines": [[20,40],[20,100]]
            }
        }"#,
    )
    .unwrap();
    let path = left_turn();
    let mut pipeline = replay(&path, None, 0, &zone, 120, Recorder::default());

    let lights = LightState::new(Some(left), Some(LightColor::Red), None);
    let mut saw_pending = false;
    let mut notices = Vec::new();
    pipeline.run(frames(path.len(), 120, lights), |report| {
        saw_pending |= report
            .vehicles
            .iter()
            .any(|v| v.status == ViolationStatus::Pending);
        notices.extend(report.violations);
    });

    assert!(saw_pending);
    let labels: Vec<&str> = notices.iter().map(|n| n.violation_type.as_str()).collect();
    assert_eq!(labels, expected.into_iter().collect::<Vec<_>>());
}

#[derive(Debug, Clone, Copy)]
enum Route {
    /// Straight down and out of the bottom of the ROI.
    Down,
    /// Down past y=50, then right and out.
    DownThenRight,
    /// Along y=30 to the left and out, never reaching y=50.
    WestAbove,
}

impl Route {
    fn path(self) -> Vec<Detection> {
        match self {
            Route::Down => (0..23).map(|i| boxed(50.0, 30.0 + 4.0 * i as f32)).collect(),
            Route::DownThenRight => {
                let mut path: Vec<Detection> =
                    (0..9).map(|i| boxed(50.0, 30.0 + 4.0 * i as f32)).collect();
                path.extend((1..19).map(|i| boxed(50.0 + 4.0 * i as f32, 62.0)));
                path
            }
            Route::WestAbove => (0..19).map(|i| boxed(50.0 - 4.0 * i as f32, 30.0)).collect(),
        }
    }
}

const STOP_LINE: &str = r#""violation_lines": [[0,50],[100,50]]"#;

#[rstest]
#[case::special_line_on_green(
    r#""special_violation_lines": [[0,50],[100,50]]"#,
    Route::Down,
    LightState::uniform(LightColor::Green),
    Some(RED_LIGHT_TURNING)
)]
#[case::right_light_missing_means_green(
    r#""right_exception_lines": [[80,40],[80,100]]"#,
    Route::DownThenRight,
    LightState::new(None, Some(LightColor::Red), None),
    None
)]
#[case::right_arrow_red(
    r#""right_exception_lines": [[80,40],[80,100]]"#,
    Route::DownThenRight,
    LightState::new(None, Some(LightColor::Red), Some(LightColor::Red)),
    Some(RED_LIGHT_TURNING)
)]
#[case::left_arrow_red_without_stop_line(
    r#""left_exception_lines": [[20,0],[20,60]]"#,
    Route::WestAbove,
    LightState::new(Some(LightColor::Red), Some(LightColor::Green), None),
    Some(RED_LIGHT_TURNING)
)]
#[case::other_exception_always_clears(
    r#""other_exception_lines": [[80,40],[80,100]]"#,
    Route::DownThenRight,
    LightState::uniform(LightColor::Red),
    None
)]
fn test_lines_and_lights(
    #[case] extra_lines: &str,
    #[case] route: Route,
    #[case] lights: LightState,
    #[case] expected: Option<&str>,
) {
    let zone = ZoneConfig::from_json(&format!(
        r#"{{
            "polygon": [[0,0],[100,0],[100,100],[0,100]],
            "lines_config": {{ {STOP_LINE}, {extra_lines} }}
        }}"#
    ))
    .unwrap();
    let path = route.path();
    let mut pipeline = replay(&path, None, 0, &zone, 120, Recorder::default());

    let mut saw_pending = false;
    let mut notices = Vec::new();
    pipeline.run(frames(path.len(), 120, lights), |report| {
        saw_pending |= report
            .vehicles
            .iter()
            .any(|v| v.status == ViolationStatus::Pending);
        notices.extend(report.violations);
    });

    assert!(saw_pending);
    let labels: Vec<&str> = notices.iter().map(|n| n.violation_type.as_str()).collect();
    assert_eq!(labels, expected.into_iter().collect::<Vec<_>>());
}

fn lone_vehicle() -> Vehicle {
    let kf = KalmanFilter::new();
    Vehicle::spawn(
        4,
        &Detection::new(2.0, 2.0, 8.0, 8.0, 0.9),
        &kf,
        &VehicleParams { vote_threshold: 3 },
    )
}

#[test]
fn test_plate_votes_resolve_on_fourth_read() {
    let mut vehicle = lone_vehicle();
    let resolved: Vec<Option<String>> = ["A", "A", "B", "A"]
        .into_iter()
        .map(|c| vehicle.update_plate(Some(c)).map(str::to_owned))
        .collect();
    assert_eq!(resolved, vec![None, None, None, Some("A".to_owned())]);
}

#[test]
fn test_second_mark_violation_is_ignored() {
    let mut vehicle = lone_vehicle();
    let frame = Arc::new(Frame::blank(16, 16, 0));
    let bbox = vehicle.rect();

    let first = vehicle.mark_violation(RED_LIGHT, &frame, bbox, vec![Arc::clone(&frame)], 10.0, 2);
    let second = vehicle.mark_violation(RED_LIGHT, &frame, bbox, vec![Arc::clone(&frame)], 10.0, 2);

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(vehicle.status(), ViolationStatus::Confirmed);
    assert_eq!(vehicle.history().count(), 1);
}
