//! Per-plan execution statistics.
//!
//! The interpreter reports whether a selected plan's body succeeded or
//! failed; the counters feed [`PlanRanking::SuccessRatio`](super::PlanRanking).
//! Counters are lock-free, so agents running on different threads can
//! share one table.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::PlanId;

#[derive(Debug, Default)]
struct Counters {
    success: AtomicU64,
    fail: AtomicU64,
}

/// Snapshot of one plan's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStat {
    pub success: u64,
    pub fail: u64,
}

impl PlanStat {
    pub fn count(&self) -> u64 {
        self.success + self.fail
    }

    /// Successes over executions, 0 for a plan that never ran.
    pub fn success_ratio(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.success as f64 / n as f64,
        }
    }

    /// Failures over executions, 0 for a plan that never ran.
    pub fn fail_ratio(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.fail as f64 / n as f64,
        }
    }
}

/// Concurrent table of plan counters.
#[derive(Debug, Default)]
pub struct PlanStatistics {
    counters: DashMap<PlanId, Counters>,
}

impl PlanStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, plan: PlanId) {
        self.counters
            .entry(plan)
            .or_default()
            .success
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, plan: PlanId) {
        self.counters
            .entry(plan)
            .or_default()
            .fail
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, plan: PlanId) -> PlanStat {
        self.counters
            .get(&plan)
            .map(|c| PlanStat {
                success: c.success.load(Ordering::Relaxed),
                fail: c.fail.load(Ordering::Relaxed),
            })
            .unwrap_or_default()
    }

    pub fn reset(&self, plan: PlanId) {
        self.counters.remove(&plan);
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
