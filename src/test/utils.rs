#[cfg(test)]
pub mod test_utils {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex, Once, PoisonError};

    use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
    use rocket::local::asynchronous::Client;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};

    use crate::error::AppError;
    use crate::init_rocket;
    use crate::models::CompletionCategory;
    use crate::progress::{Clock, ProgressEngine, format_visit_date};
    use crate::store::{DEFAULT_NAMESPACE, StorageKey, Store, apply_schema};

    static INIT: Once = Once::new();

    fn init_test_logging() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("debug")
                .with_test_writer()
                .try_init();
        });
    }

    /// A clock the test moves by hand. Starts at noon UTC on the given day.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn on(date: NaiveDate) -> Arc<Self> {
            let noon = date.and_hms_opt(12, 0, 0).expect("valid time");
            Arc::new(Self {
                now: Mutex::new(Utc.from_utc_datetime(&noon)),
            })
        }

        pub fn advance_days(&self, days: u64) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now = now.checked_add_days(Days::new(days)).unwrap_or(*now);
        }

        pub fn rewind_days(&self, days: u64) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now = now.checked_sub_days(Days::new(days)).unwrap_or(*now);
        }

        pub fn advance_millis(&self, millis: i64) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now += chrono::Duration::milliseconds(millis);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn today(&self) -> NaiveDate {
            self.now().date_naive()
        }
    }

    pub fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    /// A single-connection in-memory database. More than one connection
    /// would give each its own empty database.
    pub async fn memory_pool() -> Result<Pool<Sqlite>, AppError> {
        init_test_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        apply_schema(&pool).await?;
        Ok(pool)
    }

    #[derive(Default)]
    pub struct TestProfileBuilder {
        namespace: Option<String>,
        today: Option<NaiveDate>,
        xp: Option<u64>,
        streak: Option<u64>,
        last_visit: Option<String>,
        completions: Vec<(CompletionCategory, String)>,
        bookmarks: Vec<String>,
        achievements: Vec<String>,
        activity: BTreeMap<String, u64>,
        raw: Vec<(StorageKey, String)>,
    }

    impl TestProfileBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn namespace(mut self, namespace: &str) -> Self {
            self.namespace = Some(namespace.to_string());
            self
        }

        pub fn today(mut self, date: NaiveDate) -> Self {
            self.today = Some(date);
            self
        }

        pub fn xp(mut self, xp: u64) -> Self {
            self.xp = Some(xp);
            self
        }

        /// A streak of `count` days whose last visit was `days_ago` days
        /// before the profile's today.
        pub fn streak(mut self, count: u64, days_ago: u64) -> Self {
            let today = self.today.unwrap_or_else(test_date);
            self.streak = Some(count);
            self.last_visit = today
                .checked_sub_days(Days::new(days_ago))
                .map(format_visit_date);
            self
        }

        pub fn completed(mut self, category: CompletionCategory, id: &str) -> Self {
            self.completions.push((category, id.to_string()));
            self
        }

        pub fn lessons(mut self, count: usize) -> Self {
            for n in 1..=count {
                self.completions
                    .push((CompletionCategory::Lesson, format!("lesson-{}", n)));
            }
            self
        }

        pub fn bookmark(mut self, id: &str) -> Self {
            self.bookmarks.push(id.to_string());
            self
        }

        pub fn achievement(mut self, id: &str) -> Self {
            self.achievements.push(id.to_string());
            self
        }

        pub fn activity(mut self, date: &str, count: u64) -> Self {
            self.activity.insert(date.to_string(), count);
            self
        }

        /// Stores a value verbatim, bypassing all encoding.
        pub fn raw(mut self, key: StorageKey, value: &str) -> Self {
            self.raw.push((key, value.to_string()));
            self
        }

        pub async fn build(self) -> Result<TestProfile, AppError> {
            let pool = memory_pool().await?;
            let namespace = self
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
            let clock = ManualClock::on(self.today.unwrap_or_else(test_date));
            let store = Store::new(pool, namespace);

            if let Some(xp) = self.xp {
                store.set_counter(StorageKey::Xp, xp).await;
            }
            if let Some(streak) = self.streak {
                store.set_counter(StorageKey::Streak, streak).await;
            }
            if let Some(last_visit) = &self.last_visit {
                store.set_raw(StorageKey::LastVisit, last_visit).await;
            }

            for category in CompletionCategory::ALL {
                let ids: Vec<&String> = self
                    .completions
                    .iter()
                    .filter(|(c, _)| *c == category)
                    .map(|(_, id)| id)
                    .collect();
                if !ids.is_empty() {
                    store.set_json(category.storage_key(), &ids).await;
                }
            }

            if !self.bookmarks.is_empty() {
                store.set_json(StorageKey::Bookmarks, &self.bookmarks).await;
            }
            if !self.achievements.is_empty() {
                store
                    .set_json(StorageKey::Achievements, &self.achievements)
                    .await;
            }
            if !self.activity.is_empty() {
                store.set_json(StorageKey::ActivityLog, &self.activity).await;
            }
            for (key, value) in &self.raw {
                store.set_raw(*key, value).await;
            }

            Ok(TestProfile {
                engine: ProgressEngine::new(store, clock.clone()),
                clock,
            })
        }
    }

    pub struct TestProfile {
        pub engine: ProgressEngine,
        pub clock: Arc<ManualClock>,
    }

    pub async fn empty_profile() -> TestProfile {
        TestProfileBuilder::new()
            .build()
            .await
            .expect("Failed to build test profile")
    }

    pub async fn setup_test_client(profile: TestProfile) -> (Client, Arc<ManualClock>) {
        let TestProfile { engine, clock } = profile;
        let client = Client::tracked(init_rocket(engine))
            .await
            .expect("valid rocket instance");

        (client, clock)
    }
}
