// THEORY:
// Frames of one source must be processed strictly in order, so parallelism
// only exists *between* sources. `MultiSourceMonitor` gives every source its
// own `MonitorPipeline` and runs each session on tokio's blocking pool (the
// frame loop is synchronous and CPU bound). A semaphore sized to the number of
// cores bounds how many sessions run at once; the rest wait for a permit.
//
// All sessions share one `StopSignal`, so a single Ctrl-C winds every source
// down at its next frame boundary. Results come back in input order, one per
// source, and a failing source never takes the others with it.

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::ingest::FrameSource;
use crate::pipeline::{MonitorPipeline, Report};
use crate::session::{FrameObserver, MonotonicClock, NoopObserver, StopSignal, run_session};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One source plus whatever watches its frames.
pub struct SessionJob {
    source: Box<dyn FrameSource + Send>,
    observer: Box<dyn FrameObserver + Send>,
}

impl SessionJob {
    pub fn new(source: Box<dyn FrameSource + Send>) -> Self {
        Self {
            source,
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn FrameObserver + Send>) -> Self {
        self.observer = observer;
        self
    }

    pub fn name(&self) -> String {
        self.source.name()
    }

    fn run(mut self, config: MonitorConfig, stop: &StopSignal) -> Result<Report> {
        let mut pipeline = MonitorPipeline::new(config);
        let clock = MonotonicClock::new();
        run_session(&mut *self.source, &mut pipeline, &clock, stop, &mut *self.observer)
    }
}

pub struct MultiSourceMonitor {
    config: MonitorConfig,
    max_concurrent: usize,
    stop: StopSignal,
}

impl MultiSourceMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            max_concurrent: num_cpus::get().max(1),
            stop: StopSignal::new(),
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Handle for requesting early exit of every running session.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Runs every job to completion. Output order matches input order.
    pub async fn run(&self, jobs: Vec<SessionJob>) -> Vec<(String, Result<Report>)> {
        log::info!(
            "MultiSourceMonitor: {} sources, up to {} at once",
            jobs.len(),
            self.max_concurrent
        );
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let sessions = jobs.into_iter().map(|job| {
            let semaphore = Arc::clone(&semaphore);
            let config = self.config.clone();
            let stop = self.stop.clone();

            async move {
                let name = job.name();
                // The semaphore is never closed, so this only waits.
                let permit = semaphore.acquire_owned().await.ok();
                log::debug!("starting session for {name}");

                let result = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    job.run(config, &stop)
                })
                .await
                .map_err(MonitorError::from)
                .and_then(|report| report);

                if let Err(e) = &result {
                    log::warn!("session for {name} failed: {e}");
                }
                (name, result)
            }
        });

        join_all(sessions).await
    }
}
