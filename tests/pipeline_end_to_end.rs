use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{json, Value};

use table_cards::card::STANDARD_LABELS;
use table_cards::{
    ArtifactNames, CardIndex, CardPipeline, FileConfig, FileSource, FrameRenderer, IconSet,
    ImageSequenceSink, PipelineError, RawDetection, ReplayBackend, Roi, SessionLog, StubBackend,
    VideoJob,
};

const ROI: Roi = Roi::new(20, 10, 80, 40);

fn raw(label: &str, x0: f32, conf: f32) -> RawDetection {
    RawDetection::new([x0, 4.0, x0 + 12.0, 20.0], conf, label)
}

fn pipeline() -> CardPipeline {
    CardPipeline::new(CardIndex::standard(), 0.8, ROI)
}

fn write_icons(dir: &Path) {
    for label in STANDARD_LABELS {
        RgbaImage::from_pixel(6, 6, Rgba([250, 250, 0, 255]))
            .save(dir.join(format!("{label}.png")))
            .expect("write icon");
    }
}

fn write_frames(dir: &Path, count: usize) {
    for i in 1..=count {
        RgbImage::from_pixel(120, 100, Rgb([0, 80, 0]))
            .save(dir.join(format!("frame_{i:03}.png")))
            .expect("write frame");
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).expect("read json")).expect("parse json")
}

#[test]
fn two_corner_card_survives_threshold() {
    let mut pipeline = pipeline();
    pipeline
        .process_detections(
            1,
            0.0,
            &[
                raw("AS", 60.0, 0.95),
                raw("KD", 10.0, 0.9),
                raw("AS", 64.0, 0.9),
                raw("KD", 14.0, 0.85),
            ],
        )
        .expect("frame 1");
    for frame_id in 2..=3 {
        pipeline
            .process_detections(
                frame_id,
                40.0 * (frame_id - 1) as f64,
                &[raw("AS", 60.0, 0.95), raw("AS", 64.0, 0.9)],
            )
            .expect("frame");
    }
    pipeline.finish_video("table.mp4");
    let log = pipeline.into_log();

    let out = tempfile::tempdir().expect("output dir");
    let paths = log
        .write_artifacts(out.path(), &ArtifactNames::default(), 2)
        .expect("write artifacts");

    assert_eq!(
        std::fs::read_to_string(&paths.text).expect("read text"),
        "Karty na stole: AS."
    );
    let json = read_json(&paths.json);
    assert_eq!(json["frames"].as_array().map(Vec::len), Some(3));
    assert_eq!(
        json["frames"][0]["cards_detected_two_corners"],
        json!(["KD", "AS"])
    );
    assert_eq!(json["frames"][0]["cards_detected_one_corner"], json!([]));
    assert_eq!(json["frames"][0]["cards_info"][1]["name"], json!("KD"));
    assert_eq!(json["frames"][0]["cards_info"][1]["card_id"], json!(46));
    assert_eq!(json["frames"][0]["cards_info"][1]["x_coord"], json!(30.0));
    assert_eq!(json["frames"][2]["timestamp"], json!(0.08));
    assert_eq!(
        json["video_data"],
        json!([{
            "video": "table.mp4",
            "card_frequency": {"AS": 3, "KD": 1},
            "total_frames": 3
        }])
    );

    // Stricter threshold drops the list to nothing.
    assert!(log.final_cards(4).is_empty());
}

#[test]
fn empty_video_yields_empty_report() {
    let mut pipeline = pipeline();
    pipeline.finish_video("empty.mp4");
    let log = pipeline.into_log();

    let out = tempfile::tempdir().expect("output dir");
    let paths = log
        .write_artifacts(out.path(), &ArtifactNames::default(), 20)
        .expect("write artifacts");

    assert_eq!(
        read_json(&paths.json),
        json!({
            "frames": [],
            "video_data": [{"video": "empty.mp4", "card_frequency": {}, "total_frames": 0}]
        })
    );
    assert_eq!(
        std::fs::read_to_string(&paths.text).expect("read text"),
        "Karty na stole: ."
    );
}

#[test]
fn json_log_round_trips() {
    let mut pipeline = pipeline();
    pipeline
        .process_detections(1, 33.3, &[raw("10C", 0.456, 0.876), raw("QH", 3.0, 0.99)])
        .expect("frame");
    pipeline.finish_video("a.mp4");
    let log = pipeline.into_log();

    let bytes = log.to_json_pretty().expect("serialize");
    let text = String::from_utf8(bytes).expect("utf8");
    assert!(text.contains("\n    \"frames\""));
    let parsed = SessionLog::from_json(&text).expect("parse");
    assert_eq!(parsed, log);
    assert_eq!(parsed.frames[0].cards_info[0].x, 20.46);
    assert_eq!(parsed.frames[0].cards_info[0].confidence, 0.88);
}

#[test]
fn unknown_label_aborts_the_run() {
    let mut pipeline = pipeline();
    let err = pipeline
        .process_detections(1, 0.0, &[raw("1X", 10.0, 0.99)])
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::UnknownLabel(label)) if label == "1X"
    ));
}

#[test]
fn processes_image_sequence_end_to_end() {
    let work = tempfile::tempdir().expect("work dir");
    let frames_dir = work.path().join("table_frames");
    let icons_dir = work.path().join("icons");
    let out_dir = work.path().join("out");
    std::fs::create_dir_all(&frames_dir).expect("frames dir");
    std::fs::create_dir_all(&icons_dir).expect("icons dir");
    write_frames(&frames_dir, 3);
    write_icons(&icons_dir);

    let detections = work.path().join("detections.json");
    let replay = json!([
        [
            {"box": [40.0, 4.0, 52.0, 20.0], "confidence": 0.93, "label": "AS"},
            {"box": [44.0, 6.0, 56.0, 22.0], "confidence": 0.91, "label": "AS"},
            {"box": [5.0, 4.0, 17.0, 20.0], "confidence": 0.97, "label": "2H"}
        ],
        [
            {"box": [40.0, 4.0, 52.0, 20.0], "confidence": 0.93, "label": "AS"},
            {"box": [44.0, 6.0, 56.0, 22.0], "confidence": 0.91, "label": "AS"}
        ],
        [
            {"box": [40.0, 4.0, 52.0, 20.0], "confidence": 0.93, "label": "AS"},
            {"box": [44.0, 6.0, 56.0, 22.0], "confidence": 0.40, "label": "AS"},
            {"box": [5.0, 4.0, 17.0, 20.0], "confidence": 0.97, "label": "2H"},
            {"box": [8.0, 4.0, 20.0, 20.0], "confidence": 0.97, "label": "2H"}
        ]
    ]);
    std::fs::write(&detections, replay.to_string()).expect("write detections");

    let mut pipeline = pipeline();
    let renderer = FrameRenderer::new(
        IconSet::load(&icons_dir, pipeline.index()).expect("load icons"),
    );
    let mut backend = ReplayBackend::open(&detections).expect("open replay");
    let mut source = FileSource::new(FileConfig {
        path: frames_dir.display().to_string(),
        fps: 25.0,
    })
    .expect("open source");
    let sink = ImageSequenceSink::create(out_dir.join("table_frames")).expect("open sink");
    let abort = AtomicBool::new(false);

    let mut seen = Vec::new();
    let mut on_frame = |record: &table_cards::FrameRecord| seen.push(record.frame_id);
    let outcome = pipeline
        .process_video(VideoJob {
            source: &mut source,
            backend: &mut backend,
            renderer: &renderer,
            sink: Box::new(sink),
            abort: &abort,
            on_frame: Some(&mut on_frame),
        })
        .expect("process video");
    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(outcome.frames, 3);
    assert_eq!(outcome.video, "table_frames");

    // Icons were drawn onto the published frames.
    let first = image::open(outcome.output.join("frame_000001.png"))
        .expect("open output frame")
        .to_rgb8();
    assert_eq!(first.dimensions(), (120, 100));
    assert_eq!(first.get_pixel(10, 70), &Rgb([250, 250, 0]));

    let log = pipeline.into_log();
    let paths = log
        .write_artifacts(&out_dir, &ArtifactNames::default(), 2)
        .expect("write artifacts");
    // AS is two-corner in frames 1 and 2 only; 2H is two-corner in frame 3 only.
    assert_eq!(
        std::fs::read_to_string(&paths.text).expect("read text"),
        "Karty na stole: AS."
    );
    let json = read_json(&paths.json);
    assert_eq!(
        json["video_data"][0]["card_frequency"],
        json!({"2H": 1, "AS": 2})
    );
    assert_eq!(json["frames"][2]["cards_detected_one_corner"], json!(["AS"]));
    assert_eq!(json["frames"][2]["cards_detected_two_corners"], json!(["2H"]));
}

#[test]
fn aborted_run_leaves_no_output() {
    let work = tempfile::tempdir().expect("work dir");
    let out_dir = work.path().join("out");
    let mut pipeline = pipeline();
    let renderer = FrameRenderer::new(IconSet::from_icons(Vec::<(table_cards::Card, RgbaImage)>::new()));
    let mut backend = StubBackend::new();
    let mut source = FileSource::new(FileConfig {
        path: "stub://5".into(),
        fps: 25.0,
    })
    .expect("open source");
    let sink = ImageSequenceSink::create(out_dir.join("stub_5")).expect("open sink");
    let abort = AtomicBool::new(true);

    let err = pipeline
        .process_video(VideoJob {
            source: &mut source,
            backend: &mut backend,
            renderer: &renderer,
            sink: Box::new(sink),
            abort: &abort,
            on_frame: None,
        })
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Aborted { .. })
    ));
    let leftovers: Vec<_> = std::fs::read_dir(&out_dir)
        .expect("list output")
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn abort_mid_video_leaves_no_partial_log() {
    let work = tempfile::tempdir().expect("work dir");
    let out_dir = work.path().join("out");
    let mut pipeline = pipeline();
    let renderer = FrameRenderer::new(IconSet::from_icons(Vec::<(table_cards::Card, RgbaImage)>::new()));
    let mut backend = StubBackend::new();
    let mut source = FileSource::new(FileConfig {
        path: "stub://5".into(),
        fps: 25.0,
    })
    .expect("open source");
    let sink = ImageSequenceSink::create(out_dir.join("stub_5")).expect("open sink");
    let abort = AtomicBool::new(false);
    let mut on_frame = |record: &table_cards::FrameRecord| {
        if record.frame_id == 2 {
            abort.store(true, Ordering::SeqCst);
        }
    };

    let err = pipeline
        .process_video(VideoJob {
            source: &mut source,
            backend: &mut backend,
            renderer: &renderer,
            sink: Box::new(sink),
            abort: &abort,
            on_frame: Some(&mut on_frame),
        })
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Aborted { frames: 2 })
    ));
    assert!(!out_dir.join("stub_5").exists());

    let log = pipeline.into_log();
    assert!(log.frames.is_empty());
    assert!(log.video_data.is_empty());
}

#[test]
fn card_seen_three_times_is_ambiguous() {
    let work = tempfile::tempdir().expect("work dir");
    let icons_dir = work.path().join("icons");
    let out_dir = work.path().join("out");
    std::fs::create_dir_all(&icons_dir).expect("icons dir");
    write_icons(&icons_dir);

    let mut pipeline = pipeline();
    let renderer = FrameRenderer::new(
        IconSet::load(&icons_dir, pipeline.index()).expect("load icons"),
    );
    let mut backend = StubBackend::with_frames(vec![vec![
        raw("AS", 40.0, 0.95),
        raw("AS", 44.0, 0.92),
        raw("AS", 48.0, 0.9),
        raw("KD", 5.0, 0.9),
    ]]);
    let mut source = FileSource::new(FileConfig {
        path: "stub://1".into(),
        fps: 25.0,
    })
    .expect("open source");
    let sink = ImageSequenceSink::create(out_dir.join("stub_1")).expect("open sink");
    let abort = AtomicBool::new(false);

    let outcome = pipeline
        .process_video(VideoJob {
            source: &mut source,
            backend: &mut backend,
            renderer: &renderer,
            sink: Box::new(sink),
            abort: &abort,
            on_frame: None,
        })
        .expect("process video");

    // One icon each for KD and AS, nothing in the third slot.
    let frame = image::open(outcome.output.join("frame_000001.png"))
        .expect("open output frame")
        .to_rgb8();
    assert_eq!(frame.get_pixel(10, 70), &Rgb([250, 250, 0]));
    assert_eq!(frame.get_pixel(26, 70), &Rgb([250, 250, 0]));
    assert_ne!(frame.get_pixel(42, 70), &Rgb([250, 250, 0]));

    let log = pipeline.into_log();
    let paths = log
        .write_artifacts(&out_dir, &ArtifactNames::default(), 1)
        .expect("write artifacts");
    let json = read_json(&paths.json);
    let record = &json["frames"][0];
    assert_eq!(record["cards_detected_ambiguous"], json!(["AS"]));
    assert_eq!(record["cards_detected_two_corners"], json!([]));
    assert_eq!(record["cards_detected_one_corner"], json!(["KD"]));
    assert_eq!(record["cards_info"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["video_data"][0]["card_frequency"], json!({}));
    assert_eq!(
        std::fs::read_to_string(&paths.text).expect("read text"),
        "Karty na stole: ."
    );
}
