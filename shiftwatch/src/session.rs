// THEORY:
// The session runner is the frame loop around one `MonitorPipeline`. It owns
// no analysis logic: it pulls frames from a `FrameSource`, stamps them with a
// `Clock`, hands them to the pipeline and an optional `FrameObserver`, and
// stops at the configured wall-clock deadline or when a `StopSignal` is raised.
//
// Cancellation is cooperative and checked once per frame boundary. A frame is
// never abandoned half-way through the pipeline.
//
// Observers are best-effort. The first error an observer returns is logged
// and the observer is detached for the rest of the session; the report is
// never lost to a side consumer.
//
// File-backed sources replay forever: end-of-stream rewinds the source. A
// source that reaches end-of-stream without ever producing a frame is an
// error, otherwise the loop would spin until the deadline doing nothing.

use crate::error::{MonitorError, Result};
use crate::ingest::{FrameRead, FrameSource};
use crate::pipeline::{FrameAnalysis, MonitorPipeline, Report};
use image::RgbImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const PROGRESS_EVERY_FRAMES: u64 = 300;

/// Monotonic seconds. Only differences between readings are meaningful.
pub trait Clock {
    fn now(&self) -> f64;
}

pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Shared early-exit flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Side consumer of per-frame results, e.g. an overlay renderer.
pub trait FrameObserver {
    fn on_frame(&mut self, frame: &RgbImage, analysis: &FrameAnalysis, elapsed_secs: f64) -> Result<()>;
}

/// Observer that ignores every frame.
pub struct NoopObserver;

impl FrameObserver for NoopObserver {
    fn on_frame(&mut self, _frame: &RgbImage, _analysis: &FrameAnalysis, _elapsed_secs: f64) -> Result<()> {
        Ok(())
    }
}

/// Runs one monitoring session to completion and returns its report.
pub fn run_session<S, C, O>(
    source: &mut S,
    pipeline: &mut MonitorPipeline,
    clock: &C,
    stop: &StopSignal,
    observer: &mut O,
) -> Result<Report>
where
    S: FrameSource + ?Sized,
    C: Clock + ?Sized,
    O: FrameObserver + ?Sized,
{
    let source_name = source.name();
    source.open()?;

    let duration = pipeline.config().session_duration().as_secs_f64();
    let start_time = chrono::Local::now().format(START_TIME_FORMAT).to_string();
    let session_start = clock.now();
    pipeline.begin_session(session_start);
    log::info!("session started on {source_name} at {start_time} for {duration:.0}s");

    let mut frames_seen = 0u64;
    let mut skipped = 0u64;
    let mut rewinds = 0u64;
    let mut observer_attached = true;

    while clock.now() - session_start < duration {
        if stop.is_stop_requested() {
            log::info!("stop requested for {source_name}");
            break;
        }

        match source.read()? {
            FrameRead::Frame(frame) => {
                let now = clock.now();
                let analysis = pipeline.process_frame(&frame, now);
                if observer_attached {
                    if let Err(e) = observer.on_frame(&frame, &analysis, now - session_start) {
                        log::warn!(
                            "{source_name}: frame observer failed on frame {}, detaching it: {e}",
                            analysis.frame_index
                        );
                        observer_attached = false;
                    }
                }
                frames_seen += 1;

                if frames_seen % PROGRESS_EVERY_FRAMES == 0 {
                    log::debug!(
                        "{source_name}: {frames_seen} frames, {} slots, {:.1}s elapsed",
                        pipeline.accumulators().len(),
                        now - session_start
                    );
                }
            }
            FrameRead::Skipped => skipped += 1,
            FrameRead::EndOfStream => {
                if frames_seen == 0 {
                    return Err(MonitorError::EmptySource(source_name));
                }
                source.rewind()?;
                rewinds += 1;
            }
        }
    }

    let elapsed = clock.now() - session_start;
    let report = pipeline.report(&start_time, elapsed);
    log::info!(
        "session on {source_name} finished: {} frames, {} workers reported, {skipped} skipped, {rewinds} rewinds, {elapsed:.2}s",
        pipeline.frame_count(),
        report.workers.len(),
    );
    Ok(report)
}
