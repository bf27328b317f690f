use image::{Rgb, RgbImage};
use shiftwatch::{
    FrameSource, ImageSequenceSource, MonitorConfig, MonitorPipeline, MonotonicClock, NoopObserver, Rating, StopSignal,
    run_session,
};

const WIDTH: u32 = 160;
const HEIGHT: u32 = 140;
const FPS: f64 = 30.0;
const BACKDROP: u8 = 40;
const SUBJECT: u8 = 230;

fn backdrop() -> RgbImage {
    RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([BACKDROP; 3]))
}

fn fill(frame: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            frame.put_pixel(x, y, Rgb([SUBJECT; 3]));
        }
    }
}

/// A solid figure: dense motion, classified active.
fn busy_frame() -> RgbImage {
    let mut frame = backdrop();
    fill(&mut frame, 40, 40, 45, 45);
    frame
}

/// A thin outline: large region, sparse motion, classified idle.
fn still_frame() -> RgbImage {
    let mut frame = backdrop();
    let (x0, y0, size, t) = (20, 20, 100, 5);
    fill(&mut frame, x0, y0, size, t);
    fill(&mut frame, x0, y0 + size - t, size, t);
    fill(&mut frame, x0, y0, t, size);
    fill(&mut frame, x0 + size - t, y0, t, size);
    frame
}

#[test]
fn busy_then_still_worker_is_reported() {
    let mut config = MonitorConfig::default();
    config.timing.idle_threshold_secs = 0.9;
    let mut pipeline = MonitorPipeline::new(config);
    pipeline.begin_session(0.0);

    let mut index = 0u32;
    let mut feed = |pipeline: &mut MonitorPipeline, frame: &RgbImage| {
        let analysis = pipeline.process_frame(frame, index as f64 / FPS);
        index += 1;
        analysis
    };

    let empty = backdrop();
    for _ in 0..30 {
        assert!(feed(&mut pipeline, &empty).blobs.is_empty());
    }

    // Twelve cycles of nine empty frames plus one frame with the subject:
    // four busy appearances, then eight still ones.
    for cycle in 0..12 {
        for _ in 0..9 {
            feed(&mut pipeline, &empty);
        }
        let (frame, expect_active) = if cycle < 4 { (busy_frame(), true) } else { (still_frame(), false) };
        let analysis = feed(&mut pipeline, &frame);
        assert_eq!(analysis.blobs.len(), 1, "cycle {cycle}");
        assert_eq!(analysis.blobs[0].slot_id, "worker_0");
        assert_eq!(analysis.blobs[0].is_active, expect_active, "cycle {cycle}");
    }

    let acc = &pipeline.accumulators()[0];
    assert!((acc.active_time_accum - 4.0 / FPS).abs() < 1e-9);
    // Still appearances 1.0s..2.67s after the last busy one exceed the 0.9s threshold.
    assert!((acc.idle_time_accum - 6.0 / FPS).abs() < 1e-9);
    assert!((acc.total_elapsed - 149.0 / FPS).abs() < 1e-9);

    let report = pipeline.report("2025-03-01 09:00:00", 5.0);
    assert_eq!(report.session_info.total_frames_processed, 150);
    assert_eq!(report.session_info.total_workers, 1);
    assert_eq!(report.workers.len(), 1);

    let worker = &report.workers[0];
    assert_eq!(worker.worker_id, "worker_0");
    assert_eq!(worker.productivity_rate, 2.68);
    assert_eq!(worker.idle_rate, 4.03);
    assert_eq!(worker.performance_score, 3.22);
    assert_eq!(worker.rating, Rating::NeedsImprovement);

    let stats = report.aggregate_statistics.expect("one worker means aggregates");
    assert_eq!(stats.average_productivity_rate, 2.68);
}

#[test]
fn image_directory_session_produces_a_report() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..10 {
        backdrop().save(dir.path().join(format!("frame_{i:02}.png"))).unwrap();
    }
    busy_frame().save(dir.path().join("frame_10.png")).unwrap();

    let mut config = MonitorConfig::default();
    config.session.duration_secs = 3;
    let mut pipeline = MonitorPipeline::new(config);
    let mut source = ImageSequenceSource::new(dir.path());
    assert_eq!(source.name(), dir.path().display().to_string());

    let report = run_session(
        &mut source,
        &mut pipeline,
        &MonotonicClock::new(),
        &StopSignal::new(),
        &mut NoopObserver,
    )
    .unwrap();

    assert!(report.session_info.duration_seconds >= 3.0);
    assert_eq!(report.session_info.total_frames_processed, pipeline.frame_count());
    assert!(report.session_info.total_frames_processed >= 11);
    assert_eq!(report.workers[0].worker_id, "worker_0");
    assert!(report.workers[0].productivity_rate > 0.0);

    let json = report.to_json_pretty().unwrap();
    assert!(json.contains("\"session_info\""));
}
