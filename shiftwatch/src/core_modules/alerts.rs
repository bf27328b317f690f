// THEORY:
// Threshold checks over a finished report. Pure reads of the already-rounded
// worker rows; a worker can appear in more than one list (an excellent score
// and heavy idle time are not exclusive).

use crate::core_modules::report::Report;
use serde::Serialize;

pub const LOW_PRODUCTIVITY_SCORE: f64 = 60.0;
pub const EXCESSIVE_IDLE_RATE: f64 = 30.0;
pub const EXCELLENT_SCORE: f64 = 90.0;

/// Worker ids flagged by each check, in report order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceAlerts {
    /// `performance_score < 60`.
    pub low_productivity: Vec<String>,
    /// `idle_rate > 30`.
    pub excessive_idle: Vec<String>,
    /// `performance_score >= 90`.
    pub excellent_performance: Vec<String>,
}

impl PerformanceAlerts {
    pub fn is_empty(&self) -> bool {
        self.low_productivity.is_empty() && self.excessive_idle.is_empty() && self.excellent_performance.is_empty()
    }
}

pub fn alerts(report: &Report) -> PerformanceAlerts {
    let mut out = PerformanceAlerts::default();
    for worker in &report.workers {
        if worker.performance_score < LOW_PRODUCTIVITY_SCORE {
            out.low_productivity.push(worker.worker_id.clone());
        }
        if worker.idle_rate > EXCESSIVE_IDLE_RATE {
            out.excessive_idle.push(worker.worker_id.clone());
        }
        if worker.performance_score >= EXCELLENT_SCORE {
            out.excellent_performance.push(worker.worker_id.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::aggregator::EntityAccumulator;
    use crate::core_modules::report::assemble;

    fn acc(slot: &str, active: f64, idle: f64) -> EntityAccumulator {
        EntityAccumulator {
            slot_id: slot.to_string(),
            active_time_accum: active,
            idle_time_accum: idle,
            total_elapsed: 100.0,
            last_active_timestamp: 0.0,
        }
    }

    #[test]
    fn empty_report_raises_nothing() {
        let report = assemble("t", 1.0, 0, &[]);
        assert!(alerts(&report).is_empty());
    }

    #[test]
    fn each_threshold_is_applied() {
        let report = assemble(
            "t",
            100.0,
            3000,
            &[
                // score 36: low productivity, idle 40%: excessive idle
                acc("worker_0", 30.0, 40.0),
                // score 100: excellent
                acc("worker_1", 95.0, 0.0),
                // score 60 exactly: not low; idle exactly 30: not excessive
                acc("worker_2", 50.0, 30.0),
                // score 90 exactly (75 * 1.2): excellent, idle 31%: excessive
                acc("worker_3", 75.0, 31.0),
            ],
        );
        let flagged = alerts(&report);

        assert_eq!(flagged.low_productivity, ["worker_0"]);
        assert_eq!(flagged.excessive_idle, ["worker_0", "worker_3"]);
        assert_eq!(flagged.excellent_performance, ["worker_1", "worker_3"]);
        assert!(!flagged.is_empty());
    }
}
