use std::rc::Rc;

use crate::errors::SyncError;
use crate::models::{DataState, LocalBackup, PendingWritesQueue};
use crate::utils::clock::Clock;
use crate::utils::storage::{load_from_storage, save_to_storage, KeyValueStorage};

/// Local Snapshot Store plus persistence of the pending write queue.
/// Both live in localStorage under their own key.
#[derive(Clone)]
pub struct OfflineService {
    storage: Rc<dyn KeyValueStorage>,
    clock: Rc<dyn Clock>,
    backup_key: String,
    queue_key: String,
    max_age_ms: i64,
}

impl OfflineService {
    pub fn new(
        storage: Rc<dyn KeyValueStorage>,
        clock: Rc<dyn Clock>,
        backup_key: &str,
        queue_key: &str,
        max_age_ms: i64,
    ) -> Self {
        Self {
            storage,
            clock,
            backup_key: backup_key.to_string(),
            queue_key: queue_key.to_string(),
            max_age_ms,
        }
    }

    /// Overwrites the backup with `data` stamped now (last writer wins)
    pub fn save_backup(&self, data: &DataState) -> Result<(), SyncError> {
        let backup = LocalBackup {
            timestamp: self.clock.now_ms(),
            data: data.clone(),
        };
        save_to_storage(self.storage.as_ref(), &self.backup_key, &backup)?;
        log::info!("💾 Local backup saved ({} collections)", data.len());
        Ok(())
    }

    /// The backup's data if it is still fresh. Stale or unreadable backups
    /// behave as absent and are left in place.
    pub fn load_backup(&self) -> Option<DataState> {
        let backup = match load_from_storage::<LocalBackup>(self.storage.as_ref(), &self.backup_key) {
            Ok(Some(backup)) => backup,
            Ok(None) => {
                log::info!("📭 No local backup");
                return None;
            }
            Err(e) => {
                log::warn!("⚠️ Local backup unreadable, ignoring it: {}", e);
                return None;
            }
        };

        let now = self.clock.now_ms();
        match backup.age_ms(now) {
            Some(age) if backup.is_fresh(now, self.max_age_ms) => {
                log::info!("📋 Local backup loaded ({}s old)", age / 1000);
                Some(backup.data)
            }
            Some(age) => {
                log::info!(
                    "⌛ Local backup ignored, {}ms old (limit {}ms)",
                    age,
                    self.max_age_ms
                );
                None
            }
            None => {
                log::warn!("⚠️ Local backup has an invalid timestamp ({}), ignoring it", backup.timestamp);
                None
            }
        }
    }

    pub fn clear_backup(&self) -> Result<(), SyncError> {
        self.storage.remove_item(&self.backup_key)?;
        log::info!("🗑️ Local backup removed");
        Ok(())
    }

    pub fn save_queue(&self, queue: &PendingWritesQueue) -> Result<(), SyncError> {
        if queue.writes.is_empty() {
            return self.storage.remove_item(&self.queue_key);
        }
        save_to_storage(self.storage.as_ref(), &self.queue_key, queue)?;
        log::debug!("💾 Pending queue saved: {} writes", queue.writes.len());
        Ok(())
    }

    pub fn load_queue(&self) -> Result<Option<PendingWritesQueue>, SyncError> {
        load_from_storage(self.storage.as_ref(), &self.queue_key)
    }
}
