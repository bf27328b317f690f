// THEORY:
// The `pipeline` module is the top-level API for one video source. It wires the
// stages together in their only valid order and owns all per-source state:
//
//   frame -> BackgroundModel -> mask -> BlobExtractor -> blobs
//         -> TemporalAggregator (running totals) -> ... -> Report
//
// A `MonitorPipeline` must be fed frames strictly in order from a single
// thread. Independent sources get independent pipelines (see
// `parallel_pipeline`).

use crate::config::MonitorConfig;
use crate::core_modules::aggregator::TemporalAggregator;
use crate::core_modules::background_model::BackgroundModel;
use crate::core_modules::blob_extractor::BlobExtractor;
use crate::core_modules::report;
use image::{GrayImage, RgbImage};

// Re-export key data structures for the public API.
pub use crate::core_modules::aggregator::EntityAccumulator;
pub use crate::core_modules::blob::{Blob, BoundingBox};
pub use crate::core_modules::metrics::{Rating, WorkerMetrics};
pub use crate::core_modules::report::{AggregateStatistics, Report, SessionInfo};

/// What the pipeline saw in one frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// 1-based index of the frame within the session.
    pub frame_index: u64,
    /// Timestamp the frame was processed at, in seconds.
    pub timestamp: f64,
    pub blobs: Vec<Blob>,
}

impl FrameAnalysis {
    pub fn active_count(&self) -> usize {
        self.blobs.iter().filter(|b| b.is_active).count()
    }
}

pub struct MonitorPipeline {
    config: MonitorConfig,
    background: BackgroundModel,
    extractor: BlobExtractor,
    aggregator: TemporalAggregator,
    session_start: f64,
    frame_count: u64,
    last_mask: Option<GrayImage>,
}

impl MonitorPipeline {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            background: BackgroundModel::new(&config.background),
            extractor: BlobExtractor::new(&config.detection),
            aggregator: TemporalAggregator::new(&config.timing),
            config,
            session_start: 0.0,
            frame_count: 0,
            last_mask: None,
        }
    }

    /// Sets the timestamp that elapsed times are measured from.
    pub fn begin_session(&mut self, session_start: f64) {
        self.session_start = session_start;
    }

    /// Runs one frame through every stage. `now` is on the same monotonic
    /// clock as the session start.
    pub fn process_frame(&mut self, frame: &RgbImage, now: f64) -> FrameAnalysis {
        self.frame_count += 1;

        // Stage 1: Temporal analysis (the model learns from every frame).
        let mask = self.background.apply(frame);

        // Stage 2: Spatial grouping and activity classification.
        let cleaned = self.extractor.clean(&mask);
        let blobs = self.extractor.extract_cleaned(&cleaned);

        // Stage 3: Time accounting.
        self.aggregator.observe(&blobs, now, self.session_start);

        log::trace!(
            "frame {} at {:.3}s: {} blobs",
            self.frame_count,
            now - self.session_start,
            blobs.len()
        );
        self.last_mask = Some(cleaned);

        FrameAnalysis {
            frame_index: self.frame_count,
            timestamp: now,
            blobs,
        }
    }

    /// Builds the end-of-session report from the current running totals.
    pub fn report(&self, start_time: &str, duration_seconds: f64) -> Report {
        report::assemble(
            start_time,
            duration_seconds,
            self.frame_count,
            self.aggregator.accumulators(),
        )
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn accumulators(&self) -> &[EntityAccumulator] {
        self.aggregator.accumulators()
    }

    /// The cleaned foreground mask of the most recent frame.
    pub fn last_mask(&self) -> Option<&GrayImage> {
        self.last_mask.as_ref()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn scene(width: u32, height: u32, square: Option<(u32, u32, u32)>) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| match square {
            Some((x0, y0, size)) if x >= x0 && x < x0 + size && y >= y0 && y < y0 + size => Rgb([230, 230, 230]),
            _ => Rgb([40, 40, 40]),
        })
    }

    #[test]
    fn empty_scene_produces_no_workers() {
        let mut pipeline = MonitorPipeline::new(MonitorConfig::default());
        for i in 0..20 {
            let analysis = pipeline.process_frame(&scene(80, 60, None), i as f64 / 30.0);
            assert_eq!(analysis.frame_index, i + 1);
            assert!(analysis.blobs.is_empty());
        }

        let report = pipeline.report("2025-01-01 08:00:00", 1.0);
        assert_eq!(report.session_info.total_frames_processed, 20);
        assert_eq!(report.session_info.total_workers, 0);
        assert!(report.aggregate_statistics.is_none());
        assert!(pipeline.last_mask().is_some());
    }

    #[test]
    fn new_object_becomes_an_active_worker() {
        let mut pipeline = MonitorPipeline::new(MonitorConfig::default());
        pipeline.begin_session(10.0);
        for i in 0..30 {
            pipeline.process_frame(&scene(120, 90, None), 10.0 + i as f64 / 30.0);
        }

        let analysis = pipeline.process_frame(&scene(120, 90, Some((30, 20, 45))), 11.0);
        assert_eq!(analysis.blobs.len(), 1);
        assert_eq!(analysis.active_count(), 1);

        let acc = &pipeline.accumulators()[0];
        assert_eq!(acc.slot_id, analysis.blobs[0].slot_id);
        assert!((acc.total_elapsed - 1.0).abs() < 1e-9);
        assert!((acc.active_time_accum - 1.0 / 30.0).abs() < 1e-12);
    }
}
