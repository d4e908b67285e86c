use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

use crate::models::DataState;
use crate::utils::constants::LOGIN_ACTION;

/// Color tag handed to the status reporter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Yellow,
    Red,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    Syncing,
    /// Served from the Firestore cache
    OnlineCache,
    Online,
    Offline,
}

impl SyncStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Syncing => "Syncing...",
            SyncStatus::OnlineCache => "Online (Cache)",
            SyncStatus::Online => "Online",
            SyncStatus::Offline => "Offline",
        }
    }

    pub fn color(&self) -> StatusColor {
        match self {
            SyncStatus::Syncing => StatusColor::Yellow,
            SyncStatus::OnlineCache | SyncStatus::Online => StatusColor::Green,
            SyncStatus::Offline => StatusColor::Red,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncStatus::Syncing)
    }
}

/// What a call to `SyncController::sync` ended up doing
#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome {
    /// State replaced from the cache, reconciliation scheduled
    CacheHit,
    /// State replaced from the System-of-Record
    Authoritative,
    /// System-of-Record answered with an unknown shape, nothing changed
    Unchanged,
    /// Both remotes failed; `restored` tells whether a fresh local backup was loaded
    Offline { restored: bool },
    /// Pending writes were drained instead of reading
    QueueDrained(DrainReport),
    /// Another read-sync was still running
    AlreadyRunning,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub sent: usize,
    pub dropped: usize,
    pub remaining: usize,
}

/// Local Snapshot Record as persisted in localStorage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalBackup {
    /// Epoch milliseconds of the save
    pub timestamp: i64,
    pub data: DataState,
}

impl LocalBackup {
    /// `None` when the stored timestamp is too far off to subtract
    pub fn age_ms(&self, now_ms: i64) -> Option<i64> {
        now_ms.checked_sub(self.timestamp)
    }

    /// Fresh while `0 <= age < max_age_ms`. A backup stamped in the future
    /// (clock moved backwards) is not trusted.
    pub fn is_fresh(&self, now_ms: i64, max_age_ms: i64) -> bool {
        self.age_ms(now_ms)
            .map_or(false, |age| (0..max_age_ms).contains(&age))
    }
}

// ============================================================================
// PENDING WRITES
// ============================================================================

/// The `action` a write carries to the Apps Script endpoint
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WriteKind {
    Login,
    Action(String),
}

impl WriteKind {
    pub fn is_login(&self) -> bool {
        matches!(self, WriteKind::Login)
    }

    pub fn as_str(&self) -> &str {
        match self {
            WriteKind::Login => LOGIN_ACTION,
            WriteKind::Action(action) => action,
        }
    }
}

impl From<String> for WriteKind {
    fn from(action: String) -> Self {
        if action == LOGIN_ACTION {
            WriteKind::Login
        } else {
            WriteKind::Action(action)
        }
    }
}

impl From<&str> for WriteKind {
    fn from(action: &str) -> Self {
        WriteKind::from(action.to_string())
    }
}

impl From<WriteKind> for String {
    fn from(kind: WriteKind) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub id: String,
    pub kind: WriteKind,
    pub payload: Value,
    pub queued_at: i64,
    #[serde(default)]
    pub attempts: u32,
}

impl PendingWrite {
    pub fn new(kind: impl Into<WriteKind>, payload: Value, queued_at: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.into(),
            payload,
            queued_at,
            attempts: 0,
        }
    }

    /// Request body: the payload object with `action` set to the kind
    pub fn to_request_body(&self) -> Value {
        let mut body = match &self.payload {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other.clone());
                map
            }
        };
        body.insert("action".to_string(), Value::String(self.kind.as_str().to_string()));
        Value::Object(body)
    }
}

/// Persisted form of the queue
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingWritesQueue {
    pub writes: VecDeque<PendingWrite>,
}

/// Result of `SyncController::submit`
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Login sent immediately; the endpoint's JSON answer
    Sent(Value),
    /// Appended to the queue at this 1-based position
    Queued { position: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_labels_and_colors() {
        assert_eq!(SyncStatus::OnlineCache.label(), "Online (Cache)");
        assert_eq!(SyncStatus::Offline.color(), StatusColor::Red);
        assert_eq!(SyncStatus::Syncing.color(), StatusColor::Yellow);
        assert!(!SyncStatus::Syncing.is_terminal());
        assert!(SyncStatus::Online.is_terminal());
    }

    #[test]
    fn freshness_window_is_half_open() {
        let max_age = 1_800_000;
        let now = 10_000_000;
        let backup = |ts| LocalBackup { timestamp: ts, data: DataState::new() };

        assert!(backup(now - 1_799_999).is_fresh(now, max_age));
        assert!(!backup(now - 1_800_000).is_fresh(now, max_age));
        assert!(!backup(now - 1_800_001).is_fresh(now, max_age));
        assert!(backup(now).is_fresh(now, max_age));
        assert!(!backup(now + 5_000).is_fresh(now, max_age));
    }

    #[test]
    fn absurd_timestamp_is_not_fresh() {
        let backup: LocalBackup =
            serde_json::from_str(r#"{"timestamp":-9223372036854775808,"data":{}}"#).unwrap();
        assert_eq!(backup.age_ms(10_000_000), None);
        assert!(!backup.is_fresh(10_000_000, 1_800_000));
    }

    #[test]
    fn write_kind_round_trips_through_action_string() {
        let login: WriteKind = serde_json::from_value(json!("login")).unwrap();
        assert!(login.is_login());

        let save: WriteKind = "saveScore".into();
        assert_eq!(serde_json::to_value(&save).unwrap(), json!("saveScore"));
        assert!(!save.is_login());
    }

    #[test]
    fn request_body_carries_action() {
        let write = PendingWrite::new("saveAttendance", json!({"studentId": "s-1", "status": "present"}), 0);
        let body = write.to_request_body();
        assert_eq!(body["action"], "saveAttendance");
        assert_eq!(body["studentId"], "s-1");

        let bare = PendingWrite::new("ping", Value::Null, 0);
        assert_eq!(bare.to_request_body(), json!({"action": "ping"}));
    }
}
