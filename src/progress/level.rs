//! Level arithmetic. Levels are 0-based: 0..=99 XP is level 0.

use serde::{Deserialize, Serialize};

pub const XP_PER_LEVEL: u64 = 100;

pub fn calculate_level(xp: u64) -> u64 {
    xp / XP_PER_LEVEL
}

/// Total XP at which the next level starts.
pub fn xp_for_next_level(xp: u64) -> u64 {
    (calculate_level(xp) + 1).saturating_mul(XP_PER_LEVEL)
}

/// Progress through the current level, in `[0, 100)`.
pub fn xp_progress_percent(xp: u64) -> f64 {
    (xp % XP_PER_LEVEL) as f64 * 100.0 / XP_PER_LEVEL as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub xp: u64,
    pub level: u64,
    pub xp_for_next_level: u64,
    pub progress_percent: f64,
}

impl LevelSummary {
    pub fn for_xp(xp: u64) -> Self {
        Self {
            xp,
            level: calculate_level(xp),
            xp_for_next_level: xp_for_next_level(xp),
            progress_percent: xp_progress_percent(xp),
        }
    }
}
