use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::StorageKey;

pub const DEFAULT_NAMESPACE: &str = "codeWithLaasya_";

/// Namespaced key-value access for the progress profile.
///
/// Reads never fail: absent keys and values that do not parse come back as
/// the type default. Writes never fail either; when the backend rejects a
/// write the value is held in a session overlay so later reads in this
/// process still observe it.
pub struct Store {
    pool: Pool<Sqlite>,
    namespace: String,
    // `None` records a removal that the backend did not accept.
    overlay: Mutex<HashMap<String, Option<String>>>,
}

impl Store {
    pub fn new(pool: Pool<Sqlite>, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
            overlay: Mutex::new(HashMap::new()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    fn namespaced(&self, key: StorageKey) -> String {
        format!("{}{}", self.namespace, key.as_str())
    }

    fn overlay_lookup(&self, full_key: &str) -> Option<Option<String>> {
        self.overlay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(full_key)
            .cloned()
    }

    fn overlay_put(&self, full_key: String, value: Option<String>) {
        self.overlay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(full_key, value);
    }

    fn overlay_forget(&self, full_key: &str) {
        self.overlay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(full_key);
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn get_raw(&self, key: StorageKey) -> Option<String> {
        let full_key = self.namespaced(key);

        if let Some(pending) = self.overlay_lookup(&full_key) {
            debug!("Serving value from session overlay");
            return pending;
        }

        let row = sqlx::query_scalar::<_, String>("SELECT value FROM local_storage WHERE key = ?")
            .bind(&full_key)
            .fetch_optional(&self.pool)
            .await;

        match row {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Storage read failed, using default");
                None
            }
        }
    }

    #[instrument(skip(self, value), fields(namespace = %self.namespace))]
    pub async fn set_raw(&self, key: StorageKey, value: &str) {
        let full_key = self.namespaced(key);

        let result = sqlx::query(
            "INSERT INTO local_storage (key, value, updated_at)
             VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(&full_key)
        .bind(value)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => self.overlay_forget(&full_key),
            Err(e) => {
                warn!(error = %e, "Storage write failed, keeping value for this session");
                self.overlay_put(full_key, Some(value.to_string()));
            }
        }
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn remove(&self, key: StorageKey) {
        let full_key = self.namespaced(key);

        let result = sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(&full_key)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => self.overlay_forget(&full_key),
            Err(e) => {
                warn!(error = %e, "Storage delete failed, hiding value for this session");
                self.overlay_put(full_key, None);
            }
        }
    }

    pub async fn get_counter(&self, key: StorageKey) -> u64 {
        match self.get_raw(key).await {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                warn!(key = %key, value = %raw, "Stored counter is not a non-negative integer");
                0
            }),
            None => 0,
        }
    }

    pub async fn set_counter(&self, key: StorageKey, value: u64) {
        self.set_raw(key, &value.to_string()).await;
    }

    pub async fn get_text(&self, key: StorageKey) -> String {
        self.get_raw(key).await.unwrap_or_default()
    }

    pub async fn get_json<T>(&self, key: StorageKey) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.get_raw(key).await {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "Stored JSON is corrupt, using default");
                T::default()
            }),
            None => T::default(),
        }
    }

    pub async fn set_json<T>(&self, key: StorageKey, value: &T)
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_string(value) {
            Ok(encoded) => self.set_raw(key, &encoded).await,
            Err(e) => warn!(key = %key, error = %e, "Could not encode value, write skipped"),
        }
    }

    /// Removes every key under this namespace and nothing else.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn clear_all(&self) {
        info!("Clearing all progress keys");

        // Literal prefix comparison, the namespace may contain `_` or `%`.
        let result = sqlx::query("DELETE FROM local_storage WHERE substr(key, 1, length(?)) = ?")
            .bind(&self.namespace)
            .bind(&self.namespace)
            .execute(&self.pool)
            .await;

        let mut overlay = self.overlay.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(done) => {
                debug!(removed = done.rows_affected(), "Cleared progress keys");
                overlay.retain(|k, _| !k.starts_with(&self.namespace));
            }
            Err(e) => {
                warn!(error = %e, "Storage clear failed, hiding values for this session");
                for key in StorageKey::ALL {
                    overlay.insert(self.namespaced(key), None);
                }
            }
        }
    }
}
