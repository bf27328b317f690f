// THEORY:
// Pure conversion from one slot's accumulated seconds into reportable numbers.
// No state, no I/O. Accumulators stay at full precision; rounding happens here
// and only for the emitted values.
//
// The performance score is the productivity rate boosted by a flat 1.2 and
// capped at 100: `min(100, productivity_rate * 1.2)`. The boost means a slot
// that is active 83.3% of the session already scores 100. The rating bands
// are applied to the unrounded score.

use serde::{Deserialize, Serialize};
use std::fmt;

const PERFORMANCE_BOOST: f64 = 1.2;
const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Excellent,
    Good,
    Average,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl Rating {
    /// Step function with inclusive lower bounds at 85, 70 and 50.
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Rating::Excellent
        } else if score >= 70.0 {
            Rating::Good
        } else if score >= 50.0 {
            Rating::Average
        } else {
            Rating::NeedsImprovement
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Excellent => "Excellent",
            Rating::Good => "Good",
            Rating::Average => "Average",
            Rating::NeedsImprovement => "Needs Improvement",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One worker row of the report. Every number is rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerMetrics {
    pub worker_id: String,
    pub total_time_minutes: f64,
    pub active_time_minutes: f64,
    pub idle_time_minutes: f64,
    pub productivity_rate: f64,
    pub idle_rate: f64,
    pub performance_score: f64,
    pub rating: Rating,
    pub effective_working_hours: f64,
}

/// Computes the report row for one slot. `None` means there is not enough data
/// (`total_time == 0`); it is not an error.
pub fn compute(entity_id: &str, active_time: f64, idle_time: f64, total_time: f64) -> Option<WorkerMetrics> {
    if total_time == 0.0 {
        return None;
    }

    let productivity = productivity_rate(active_time, total_time);
    let idle = idle_rate(idle_time, total_time);
    let score = performance_score(productivity);

    Some(WorkerMetrics {
        worker_id: entity_id.to_string(),
        total_time_minutes: round2(total_time / 60.0),
        active_time_minutes: round2(active_time / 60.0),
        idle_time_minutes: round2(idle_time / 60.0),
        productivity_rate: round2(productivity),
        idle_rate: round2(idle),
        performance_score: round2(score),
        rating: Rating::from_score(score),
        effective_working_hours: round2(active_time / 3600.0),
    })
}

/// Percentage of the session the slot was active. `0.0` for an empty session.
pub fn productivity_rate(active_time: f64, total_time: f64) -> f64 {
    if total_time == 0.0 {
        return 0.0;
    }
    active_time / total_time * 100.0
}

/// Percentage of the session credited as idle. Need not add up to 100 with
/// the productivity rate.
pub fn idle_rate(idle_time: f64, total_time: f64) -> f64 {
    if total_time == 0.0 {
        return 0.0;
    }
    idle_time / total_time * 100.0
}

pub fn performance_score(productivity_rate: f64) -> f64 {
    (productivity_rate * PERFORMANCE_BOOST).min(MAX_SCORE)
}

/// Rounds to 2 decimals, ties to even (`0.125 -> 0.12`, `0.875 -> 0.88`).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
