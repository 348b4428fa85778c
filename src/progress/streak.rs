use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const VISIT_DATE_FORMAT: &str = "%Y-%m-%d";
// Older profiles stored the browser's `Date.toDateString()` form.
const LEGACY_VISIT_DATE_FORMAT: &str = "%a %b %d %Y";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakState {
    pub count: u64,
    pub last_active: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakTransition {
    pub state: StreakState,
    pub is_new_day: bool,
    pub bonus_xp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub streak: u64,
    pub is_new_day: bool,
    pub bonus_xp: u64,
}

impl From<StreakTransition> for StreakUpdate {
    fn from(transition: StreakTransition) -> Self {
        Self {
            streak: transition.state.count,
            is_new_day: transition.is_new_day,
            bonus_xp: transition.bonus_xp,
        }
    }
}

/// Bonus XP paid when a streak reaches `count` days.
pub fn streak_bonus(count: u64) -> u64 {
    match count {
        3 => 25,
        7 => 50,
        30 => 150,
        n if n > 7 && n % 7 == 0 => 30,
        _ => 0,
    }
}

pub fn advance_streak(state: StreakState, today: NaiveDate) -> StreakTransition {
    let restart = StreakTransition {
        state: StreakState {
            count: 1,
            last_active: Some(today),
        },
        is_new_day: true,
        bonus_xp: 0,
    };

    let Some(last_active) = state.last_active else {
        return restart;
    };

    match (today - last_active).num_days() {
        0 => StreakTransition {
            state,
            is_new_day: false,
            bonus_xp: 0,
        },
        1 => {
            let count = state.count.saturating_add(1);
            StreakTransition {
                state: StreakState {
                    count,
                    last_active: Some(today),
                },
                is_new_day: true,
                bonus_xp: streak_bonus(count),
            }
        }
        // A gap, or a last visit in the future after the clock moved back.
        _ => restart,
    }
}

pub fn parse_visit_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, VISIT_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, LEGACY_VISIT_DATE_FORMAT))
        .ok()
}

pub fn format_visit_date(date: NaiveDate) -> String {
    date.format(VISIT_DATE_FORMAT).to_string()
}
