// SPDX-License-Identifier: GPL-3.0-only

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress of the long-running daemon job acting on a device, if any.
///
/// Delivered with job-changed events and stored on the device record; the
/// rest of the record is left untouched when only the job moves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub in_progress: bool,

    /// Operation identifier reported by the daemon (e.g. "format-mkfs")
    pub id: String,

    /// Uid of the user that started the job
    pub initiated_by_uid: u32,

    pub is_cancellable: bool,
    pub num_tasks: u32,
    pub cur_task: u32,
    pub cur_task_id: String,

    /// Completion of the current task in percent, negative when unknown
    pub cur_task_percentage: f64,

    pub started_at: Option<DateTime<Utc>>,
}

impl JobState {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Fraction in `[0, 1]` when the daemon reports progress.
    pub fn progress(&self) -> Option<f64> {
        if !self.in_progress || self.cur_task_percentage < 0.0 {
            return None;
        }
        Some((self.cur_task_percentage / 100.0).clamp(0.0, 1.0))
    }
}
