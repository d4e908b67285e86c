// ============================================================================
// APP - Browser wiring of the sync controller
// ============================================================================

use std::rc::Rc;

use gloo_timers::callback::Interval;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::config::CONFIG;
use crate::services::network_monitor::NetworkMonitor;
use crate::services::{
    BrowserScheduler, DomStatusReporter, FirestoreCache, OfflineService, SheetClient,
    SyncBackends, SyncController,
};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::storage::{KeyValueStorage, LocalStorage, MemoryStorage};

pub struct App {
    controller: SyncController,
    network: NetworkMonitor,
    // Intervals stop when dropped
    timers: Vec<Interval>,
}

impl App {
    pub fn new() -> Self {
        let config = &*CONFIG;
        let clock: Rc<dyn Clock> = Rc::new(SystemClock);

        let storage: Rc<dyn KeyValueStorage> = match LocalStorage::open() {
            Some(storage) => Rc::new(storage),
            None => {
                log::warn!("⚠️ localStorage unavailable, backups will not survive a reload");
                Rc::new(MemoryStorage::new())
            }
        };
        let offline = OfflineService::new(
            storage,
            clock.clone(),
            &config.sync.local_backup_key,
            &config.sync.pending_queue_key,
            config.sync.local_snapshot_max_age_ms,
        );

        let backends = SyncBackends {
            cache: Rc::new(FirestoreCache::new(config.firestore.clone())),
            record_source: Rc::new(SheetClient::new(&config.google_script_url, clock.clone())),
            status: Rc::new(DomStatusReporter),
            scheduler: Rc::new(BrowserScheduler),
            clock,
            offline,
        };

        Self {
            controller: SyncController::new(config.sync.clone(), backends),
            network: NetworkMonitor::new(),
            timers: Vec::new(),
        }
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    /// Restores the local backup, runs the first sync and drain, then starts
    /// the read-sync and queue-drain timers and the reconnect listener
    pub fn start(&mut self) -> Result<(), JsValue> {
        let sync_config = &CONFIG.sync;

        if self.controller.restore_local_backup() {
            log::info!("💾 [APP] Showing local backup until the first sync");
        }

        spawn_sync(self.controller.clone());
        spawn_drain(self.controller.clone());

        let controller = self.controller.clone();
        self.timers.push(Interval::new(sync_config.read_sync_interval_ms, move || {
            spawn_sync(controller.clone());
        }));

        let controller = self.controller.clone();
        self.timers.push(Interval::new(sync_config.queue_drain_interval_ms, move || {
            spawn_drain(controller.clone());
        }));

        let controller = self.controller.clone();
        self.network.start(move || {
            let controller = controller.clone();
            spawn_local(async move {
                log::info!("🌐 Connection restored, flushing queue");
                controller.process_queue().await;
                controller.sync().await;
            });
        })?;

        log::info!(
            "🚀 [APP] Sync every {}s, queue drain every {}s (online: {})",
            sync_config.read_sync_interval_ms / 1000,
            sync_config.queue_drain_interval_ms / 1000,
            self.network.is_online()
        );
        Ok(())
    }
}

fn spawn_sync(controller: SyncController) {
    spawn_local(async move {
        let outcome = controller.sync().await;
        log::debug!("🔄 Sync outcome: {:?}", outcome);
    });
}

fn spawn_drain(controller: SyncController) {
    if controller.pending_writes() == 0 {
        return;
    }
    spawn_local(async move {
        controller.process_queue().await;
    });
}
