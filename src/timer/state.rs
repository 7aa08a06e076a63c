use serde::{Deserialize, Serialize};

use crate::metabolism;
use crate::models::ActiveFast;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FastStatus {
    #[default]
    Idle,
    Running,
}

/// In-memory fast state. Only the absolute start timestamp is kept; elapsed
/// time is recomputed from it on every read, never accumulated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FastState {
    pub status: FastStatus,
    pub start_time: Option<i64>,
    pub target_hours: Option<f64>,
}

impl FastState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn running(start_time: i64, target_hours: f64) -> Self {
        Self {
            status: FastStatus::Running,
            start_time: Some(start_time),
            target_hours: Some(target_hours),
        }
    }

    /// Rebuilds state from `active-fast.json`. Anything short of a complete
    /// running record is Idle.
    pub fn from_document(doc: &ActiveFast) -> Self {
        match doc.running_parts() {
            Some((start, target)) => Self::running(start, target),
            None => Self::idle(),
        }
    }

    pub fn to_document(&self) -> ActiveFast {
        match (self.status, self.start_time, self.target_hours) {
            (FastStatus::Running, Some(start), Some(target)) => ActiveFast::running(start, target),
            _ => ActiveFast::idle(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == FastStatus::Running
    }

    /// Whole seconds since the start, clamped at zero for clocks that moved
    /// backwards.
    pub fn elapsed_secs(&self, now_ms: i64) -> u64 {
        match (self.status, self.start_time) {
            (FastStatus::Running, Some(start)) => (now_ms.saturating_sub(start).max(0) / 1000) as u64,
            _ => 0,
        }
    }

    pub fn progress(&self, now_ms: i64, tmb: f64) -> FastProgress {
        FastProgress::compute(self, now_ms, tmb)
    }
}

/// Everything the timer view shows, derived from a [`FastState`] at one
/// instant.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FastProgress {
    pub status: FastStatus,
    pub start_time: Option<i64>,
    pub target_hours: Option<f64>,
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    /// 0.0 ..= 1.0
    pub progress: f64,
    /// Estimated fat lost so far, kg.
    pub weight_loss: f64,
}

impl FastProgress {
    pub fn compute(state: &FastState, now_ms: i64, tmb: f64) -> Self {
        let elapsed = state.elapsed_secs(now_ms);
        let target_secs = state
            .target_hours
            .filter(|_| state.is_running())
            .map(|hours| (hours * 3600.0).max(0.0))
            .unwrap_or(0.0);

        let remaining = (target_secs - elapsed as f64).max(0.0);
        let progress = if target_secs > 0.0 {
            (elapsed as f64 / target_secs).min(1.0)
        } else {
            0.0
        };

        Self {
            status: state.status,
            start_time: state.start_time,
            target_hours: state.target_hours,
            elapsed_secs: elapsed,
            remaining_secs: remaining.ceil() as u64,
            progress,
            weight_loss: metabolism::weight_loss_kg(elapsed as f64, tmb),
        }
    }

    pub fn elapsed_hms(&self) -> (u64, u64, u64) {
        split_hms(self.elapsed_secs)
    }

    pub fn remaining_hms(&self) -> (u64, u64, u64) {
        split_hms(self.remaining_secs)
    }

    pub fn elapsed_hours(&self) -> f64 {
        self.elapsed_secs as f64 / 3600.0
    }

    pub fn target_reached(&self) -> bool {
        self.status == FastStatus::Running && self.progress >= 1.0
    }
}

fn split_hms(total: u64) -> (u64, u64, u64) {
    (total / 3600, (total % 3600) / 60, total % 60)
}
