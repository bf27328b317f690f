// THEORY:
// The `TemporalAggregator` is the memory of the monitor. It takes the
// stateless blob list of each frame and folds it into per-slot running totals
// that live for the whole session.
//
// Key architectural principles:
// 1.  **Lazy Birth, No Death**: An `EntityAccumulator` is created the first time
//     a slot id is seen and is never removed. Slots missing from a frame are
//     left exactly as they were (no decay).
// 2.  **Fixed Time Quantum**: Every observed frame credits a fixed
//     `frame_interval` of active or idle time, independent of how long the
//     frame actually took to process.
// 3.  **Idle Debounce**: Idle time only accrues once a slot has gone strictly
//     longer than `idle_threshold` without an active frame. Shorter idle spans
//     count towards neither bucket, so `active + idle <= elapsed`.
// 4.  **Weak Identity**: Slots are keyed by the extractor's per-frame rank, not
//     by a tracked identity. Two people swapping detection order swap totals.
//     This is kept as-is; there is no cross-frame matching.

use crate::config::TimingConfig;
use crate::core_modules::blob::Blob;
use serde::Serialize;
use std::collections::HashMap;

/// Running totals for one slot id. Times are seconds at full precision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityAccumulator {
    pub slot_id: String,
    /// Never decreases.
    pub active_time_accum: f64,
    /// Never decreases.
    pub idle_time_accum: f64,
    /// `current_time - session_start` of the last frame this slot appeared in.
    pub total_elapsed: f64,
    pub last_active_timestamp: f64,
}

impl EntityAccumulator {
    /// A fresh slot first seen at `now`. It counts as "last active" at birth,
    /// so a slot that starts idle still waits out the debounce.
    fn new(slot_id: String, now: f64) -> Self {
        Self {
            slot_id,
            active_time_accum: 0.0,
            idle_time_accum: 0.0,
            total_elapsed: 0.0,
            last_active_timestamp: now,
        }
    }
}

pub struct TemporalAggregator {
    idle_threshold: f64,
    frame_interval: f64,
    /// In first-observation order.
    accumulators: Vec<EntityAccumulator>,
    index: HashMap<String, usize>,
}

impl TemporalAggregator {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            idle_threshold: config.idle_threshold_secs,
            frame_interval: config.frame_interval_secs,
            accumulators: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Folds one frame's blobs into the running totals. Call exactly once
    /// per processed frame, in frame order.
    pub fn observe(&mut self, blobs: &[Blob], now: f64, session_start: f64) {
        for blob in blobs {
            let idle_threshold = self.idle_threshold;
            let frame_interval = self.frame_interval;
            let entity = self.entry(&blob.slot_id, now);

            if blob.is_active {
                entity.active_time_accum += frame_interval;
                entity.last_active_timestamp = now;
            } else {
                let idle_duration = now - entity.last_active_timestamp;
                if idle_duration > idle_threshold {
                    entity.idle_time_accum += frame_interval;
                }
            }

            entity.total_elapsed = now - session_start;
        }
    }

    pub fn accumulators(&self) -> &[EntityAccumulator] {
        &self.accumulators
    }

    pub fn get(&self, slot_id: &str) -> Option<&EntityAccumulator> {
        self.index.get(slot_id).map(|&i| &self.accumulators[i])
    }

    pub fn len(&self) -> usize {
        self.accumulators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulators.is_empty()
    }

    fn entry(&mut self, slot_id: &str, now: f64) -> &mut EntityAccumulator {
        let i = match self.index.get(slot_id) {
            Some(&i) => i,
            None => {
                log::debug!("new slot {slot_id} at t={now:.3}s");
                self.accumulators.push(EntityAccumulator::new(slot_id.to_string(), now));
                let i = self.accumulators.len() - 1;
                self.index.insert(slot_id.to_string(), i);
                i
            }
        };
        &mut self.accumulators[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::blob::BoundingBox;

    const DT: f64 = 1.0 / 30.0;

    fn blob(slot: &str, is_active: bool) -> Blob {
        Blob {
            slot_id: slot.to_string(),
            bbox: BoundingBox { x: 0, y: 0, width: 50, height: 50 },
            area: 2401.0,
            motion_density: if is_active { 0.8 } else { 0.1 },
            is_active,
        }
    }

    fn aggregator() -> TemporalAggregator {
        TemporalAggregator::new(&TimingConfig::default())
    }

    #[test]
    fn active_frames_credit_fixed_interval() {
        let mut agg = aggregator();
        for frame in 1..=1800 {
            let now = frame as f64 * DT;
            agg.observe(&[blob("worker_0", true)], now, 0.0);
        }

        let entity = agg.get("worker_0").unwrap();
        assert!((entity.active_time_accum - 60.0).abs() < 1e-9);
        assert_eq!(entity.idle_time_accum, 0.0);
        assert!((entity.total_elapsed - 60.0).abs() < 1e-9);
    }

    #[test]
    fn idle_exactly_at_threshold_accrues_nothing() {
        let mut agg = aggregator();
        agg.observe(&[blob("worker_0", true)], 10.0, 0.0);
        agg.observe(&[blob("worker_0", false)], 15.0, 0.0);
        agg.observe(&[blob("worker_0", true)], 15.5, 0.0);

        let entity = agg.get("worker_0").unwrap();
        assert_eq!(entity.idle_time_accum, 0.0);
        assert!((entity.active_time_accum - 2.0 * DT).abs() < 1e-12);
    }

    #[test]
    fn idle_past_threshold_accrues_per_frame() {
        let mut agg = aggregator();
        agg.observe(&[blob("worker_0", true)], 1.0, 0.0);
        agg.observe(&[blob("worker_0", false)], 3.0, 0.0);
        agg.observe(&[blob("worker_0", false)], 6.01, 0.0);
        agg.observe(&[blob("worker_0", false)], 7.0, 0.0);

        let entity = agg.get("worker_0").unwrap();
        assert!((entity.idle_time_accum - 2.0 * DT).abs() < 1e-12);
        assert_eq!(entity.total_elapsed, 7.0);
    }

    #[test]
    fn slot_born_idle_waits_out_the_debounce() {
        let mut agg = aggregator();
        agg.observe(&[blob("worker_0", false)], 2.0, 0.0);
        agg.observe(&[blob("worker_0", false)], 6.0, 0.0);
        assert_eq!(agg.get("worker_0").unwrap().idle_time_accum, 0.0);

        agg.observe(&[blob("worker_0", false)], 7.5, 0.0);
        assert!((agg.get("worker_0").unwrap().idle_time_accum - DT).abs() < 1e-12);
    }

    #[test]
    fn absent_slots_are_untouched() {
        let mut agg = aggregator();
        agg.observe(&[blob("worker_0", true), blob("worker_1", true)], 1.0, 0.0);
        agg.observe(&[blob("worker_0", true)], 2.0, 0.0);

        let missing = agg.get("worker_1").unwrap();
        assert_eq!(missing.total_elapsed, 1.0);
        assert!((missing.active_time_accum - DT).abs() < 1e-12);

        let present = agg.get("worker_0").unwrap();
        assert_eq!(present.total_elapsed, 2.0);
    }

    #[test]
    fn slots_keep_first_observation_order() {
        let mut agg = aggregator();
        agg.observe(&[blob("worker_2", true)], 1.0, 0.0);
        agg.observe(&[blob("worker_0", true), blob("worker_2", false)], 2.0, 0.0);
        agg.observe(&[], 3.0, 0.0);

        let order: Vec<&str> = agg.accumulators().iter().map(|a| a.slot_id.as_str()).collect();
        assert_eq!(order, vec!["worker_2", "worker_0"]);
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn elapsed_is_measured_from_session_start() {
        let mut agg = aggregator();
        agg.observe(&[blob("worker_0", true)], 105.0, 100.0);
        assert_eq!(agg.get("worker_0").unwrap().total_elapsed, 5.0);
    }
}
