use serde::{Deserialize, Serialize};

use crate::utils::constants::{
    DEFAULT_FIRESTORE_PROJECT_ID, DEFAULT_GOOGLE_SCRIPT_URL, LOCAL_BACKUP_KEY, PENDING_QUEUE_KEY,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub google_script_url: String,
    pub enable_logging: bool,
    pub firestore: FirestoreConfig,
    pub sync: SyncConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_script_url: DEFAULT_GOOGLE_SCRIPT_URL.to_string(),
            enable_logging: true,
            firestore: FirestoreConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: Option<String>,
    /// Collection holding one document per data collection
    pub cache_collection: String,
    pub status_collection: String,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_FIRESTORE_PROJECT_ID.to_string(),
            api_key: None,
            cache_collection: "app_cache".to_string(),
            status_collection: "cache_status".to_string(),
        }
    }
}

impl FirestoreConfig {
    /// Base URL of the documents resource for this project
    pub fn documents_url(&self) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            self.project_id
        )
    }
}

/// Timings and thresholds of the sync controller, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub read_sync_interval_ms: u32,
    pub queue_drain_interval_ms: u32,
    pub reconcile_delay_ms: u32,
    pub cache_write_back_delay_ms: u32,
    pub local_snapshot_max_age_ms: i64,
    /// Consecutive cache errors before fallback mode is entered
    pub cache_error_threshold: u32,
    pub local_backup_key: String,
    pub pending_queue_key: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            read_sync_interval_ms: 5 * 60 * 1000,
            queue_drain_interval_ms: 5_000,
            reconcile_delay_ms: 1_000,
            cache_write_back_delay_ms: 2_000,
            local_snapshot_max_age_ms: 1_800_000,
            cache_error_threshold: 3,
            local_backup_key: LOCAL_BACKUP_KEY.to_string(),
            pending_queue_key: PENDING_QUEUE_KEY.to_string(),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from compile-time environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match key {
            "GOOGLE_SCRIPT_URL" => option_env!("GOOGLE_SCRIPT_URL"),
            "ENABLE_LOGGING" => option_env!("ENABLE_LOGGING"),
            "FIRESTORE_PROJECT_ID" => option_env!("FIRESTORE_PROJECT_ID"),
            "FIRESTORE_API_KEY" => option_env!("FIRESTORE_API_KEY"),
            "READ_SYNC_INTERVAL_MS" => option_env!("READ_SYNC_INTERVAL_MS"),
            "QUEUE_DRAIN_INTERVAL_MS" => option_env!("QUEUE_DRAIN_INTERVAL_MS"),
            "RECONCILE_DELAY_MS" => option_env!("RECONCILE_DELAY_MS"),
            "CACHE_WRITE_BACK_DELAY_MS" => option_env!("CACHE_WRITE_BACK_DELAY_MS"),
            "LOCAL_SNAPSHOT_MAX_AGE_MS" => option_env!("LOCAL_SNAPSHOT_MAX_AGE_MS"),
            "CACHE_ERROR_THRESHOLD" => option_env!("CACHE_ERROR_THRESHOLD"),
            _ => None,
        })
    }

    /// Blank values (`KEY=` in `.env`) count as unset
    pub fn from_lookup<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let var = |key: &str| non_empty(lookup(key));
        let defaults = SyncConfig::default();
        Self {
            google_script_url: var("GOOGLE_SCRIPT_URL")
                .unwrap_or(DEFAULT_GOOGLE_SCRIPT_URL)
                .to_string(),
            enable_logging: parse_or(var("ENABLE_LOGGING"), true),
            firestore: FirestoreConfig {
                project_id: var("FIRESTORE_PROJECT_ID")
                    .unwrap_or(DEFAULT_FIRESTORE_PROJECT_ID)
                    .to_string(),
                api_key: var("FIRESTORE_API_KEY").map(|s| s.to_string()),
                ..FirestoreConfig::default()
            },
            sync: SyncConfig {
                read_sync_interval_ms: parse_or(
                    var("READ_SYNC_INTERVAL_MS"),
                    defaults.read_sync_interval_ms,
                ),
                queue_drain_interval_ms: parse_or(
                    var("QUEUE_DRAIN_INTERVAL_MS"),
                    defaults.queue_drain_interval_ms,
                ),
                reconcile_delay_ms: parse_or(var("RECONCILE_DELAY_MS"), defaults.reconcile_delay_ms),
                cache_write_back_delay_ms: parse_or(
                    var("CACHE_WRITE_BACK_DELAY_MS"),
                    defaults.cache_write_back_delay_ms,
                ),
                local_snapshot_max_age_ms: parse_or(
                    var("LOCAL_SNAPSHOT_MAX_AGE_MS"),
                    defaults.local_snapshot_max_age_ms,
                ),
                cache_error_threshold: parse_or(
                    var("CACHE_ERROR_THRESHOLD"),
                    defaults.cache_error_threshold,
                ),
                ..defaults
            },
        }
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.enable_logging
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|value| value.parse().ok()).unwrap_or(default)
}

lazy_static::lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}
