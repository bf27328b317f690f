// THEORY:
// This file is the main entry point for the `shiftwatch` library crate. It
// measures how long each person in a fixed camera view is active or idle and
// turns those totals into a productivity report.
//
// The public surface is deliberately small: build a `MonitorConfig`, wrap a
// frame source, and either drive a `MonitorPipeline` yourself or let
// `run_session` / `MultiSourceMonitor` run the frame loop. The per-stage
// algorithms (`core_modules`) are public for testing and reuse, but callers
// normally only see `Report`.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod ingest;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod session;

pub use config::MonitorConfig;
pub use core_modules::alerts::{PerformanceAlerts, alerts};
pub use error::{MonitorError, Result};
pub use ingest::{FrameRead, FrameSource, ImageSequenceSource};
pub use parallel_pipeline::{MultiSourceMonitor, SessionJob};
pub use pipeline::{Blob, BoundingBox, FrameAnalysis, MonitorPipeline, Rating, Report, WorkerMetrics};
pub use session::{Clock, FrameObserver, MonotonicClock, NoopObserver, StopSignal, run_session};
