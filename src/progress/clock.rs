use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of the current instant and of the learner's calendar day.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    // Day boundaries follow the host's local calendar, not UTC.
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
