// THEORY:
// The end-of-session summary. The assembler runs every accumulator through the
// metrics calculator, drops slots without data, and adds cross-worker
// statistics only when at least one worker row exists. An absent
// `aggregate_statistics` section means "no data"; it is never zero-filled.

use crate::core_modules::aggregator::EntityAccumulator;
use crate::core_modules::metrics::{self, WorkerMetrics, round2};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Session metadata supplied by the driving loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Local wall-clock start, `%Y-%m-%d %H:%M:%S`.
    pub start_time: String,
    pub duration_seconds: f64,
    /// Every slot ever observed, including ones dropped for lack of data.
    pub total_workers: usize,
    pub total_frames_processed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStatistics {
    pub average_performance_score: f64,
    pub average_productivity_rate: f64,
    pub total_effective_working_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub session_info: SessionInfo,
    pub workers: Vec<WorkerMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_statistics: Option<AggregateStatistics>,
}

impl Report {
    pub fn has_workers(&self) -> bool {
        !self.workers.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report as pretty JSON, replacing any existing file.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json)?;
        log::info!("report written to {}", path.display());
        Ok(())
    }

    /// One CSV row per worker, with a header row.
    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut rows = csv::Writer::from_writer(writer);
        for worker in &self.workers {
            rows.serialize(CsvRow::from(worker))?;
        }
        if self.workers.is_empty() {
            rows.write_record(CSV_HEADER)?;
        }
        rows.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv_to(file)?;
        log::info!("CSV export written to {}", path.display());
        Ok(())
    }
}

const CSV_HEADER: [&str; 7] = [
    "Worker ID",
    "Effective Hours",
    "Active Time (min)",
    "Idle Time (min)",
    "Productivity Rate",
    "Performance Score",
    "Rating",
];

/// Column layout of the CSV export. Field order is column order.
#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Worker ID")]
    worker_id: &'a str,
    #[serde(rename = "Effective Hours")]
    effective_working_hours: f64,
    #[serde(rename = "Active Time (min)")]
    active_time_minutes: f64,
    #[serde(rename = "Idle Time (min)")]
    idle_time_minutes: f64,
    #[serde(rename = "Productivity Rate")]
    productivity_rate: f64,
    #[serde(rename = "Performance Score")]
    performance_score: f64,
    #[serde(rename = "Rating")]
    rating: &'static str,
}

impl<'a> From<&'a WorkerMetrics> for CsvRow<'a> {
    fn from(worker: &'a WorkerMetrics) -> Self {
        Self {
            worker_id: &worker.worker_id,
            effective_working_hours: worker.effective_working_hours,
            active_time_minutes: worker.active_time_minutes,
            idle_time_minutes: worker.idle_time_minutes,
            productivity_rate: worker.productivity_rate,
            performance_score: worker.performance_score,
            rating: worker.rating.as_str(),
        }
    }
}

/// Builds the final report. Worker rows keep the accumulators' order.
pub fn assemble(
    start_time: impl Into<String>,
    duration_seconds: f64,
    total_frames_processed: u64,
    accumulators: &[EntityAccumulator],
) -> Report {
    let workers: Vec<WorkerMetrics> = accumulators
        .iter()
        .filter_map(|acc| {
            metrics::compute(&acc.slot_id, acc.active_time_accum, acc.idle_time_accum, acc.total_elapsed)
        })
        .collect();

    let aggregate_statistics = aggregate(&workers);

    Report {
        session_info: SessionInfo {
            start_time: start_time.into(),
            duration_seconds: round2(duration_seconds),
            total_workers: accumulators.len(),
            total_frames_processed,
        },
        workers,
        aggregate_statistics,
    }
}

/// Means and sums over the already-rounded worker rows.
fn aggregate(workers: &[WorkerMetrics]) -> Option<AggregateStatistics> {
    if workers.is_empty() {
        return None;
    }
    let n = workers.len() as f64;
    let score_sum: f64 = workers.iter().map(|w| w.performance_score).sum();
    let rate_sum: f64 = workers.iter().map(|w| w.productivity_rate).sum();
    let hours_sum: f64 = workers.iter().map(|w| w.effective_working_hours).sum();

    Some(AggregateStatistics {
        average_performance_score: round2(score_sum / n),
        average_productivity_rate: round2(rate_sum / n),
        total_effective_working_hours: round2(hours_sum),
    })
}
