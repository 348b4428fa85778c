use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HEATMAP_WEEKS: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDay {
    pub date: String,
    pub count: u64,
    pub level: u8,
}

pub fn activity_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Heatmap intensity bucket for a day's activity count.
pub fn intensity(count: u64) -> u8 {
    match count {
        0 => 0,
        1..=2 => 1,
        3..=5 => 2,
        6..=10 => 3,
        _ => 4,
    }
}

/// The last `weeks * 7` days ending at `today`, oldest first.
pub fn activity_window(
    log: &BTreeMap<String, u64>,
    today: NaiveDate,
    weeks: u32,
) -> Vec<ActivityDay> {
    let span = u64::from(weeks) * 7;

    (0..span)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|date| {
            let key = activity_key(date);
            let count = log.get(&key).copied().unwrap_or(0);
            ActivityDay {
                date: key,
                count,
                level: intensity(count),
            }
        })
        .collect()
}
