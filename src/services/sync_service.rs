// ============================================================================
// SYNC CONTROLLER - cache → System-of-Record → local backup
// ============================================================================
// Decides which source the app trusts, writes results through to the cache
// and the local backup, owns the pending write queue and reports status.
// Runs on one thread: state only changes between await points.
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;

use crate::config::SyncConfig;
use crate::errors::{CacheError, SyncError};
use crate::models::{
    DataState, DrainReport, PendingWrite, SheetPayload, StatusColor, SubmitOutcome, SyncOutcome,
    SyncStatus, WriteKind,
};
use crate::services::cache_service::{CacheBackend, CacheStatus};
use crate::services::fallback_policy::FallbackPolicy;
use crate::services::offline_service::OfflineService;
use crate::services::scheduler::{Scheduler, TaskKind};
use crate::services::sheet_client::RecordSource;
use crate::services::status_reporter::StatusReporter;
use crate::services::write_queue::WriteQueue;
use crate::state::{DataSource, SyncStateWrapper};
use crate::utils::clock::Clock;

/// Everything the controller talks to, each replaceable in tests
#[derive(Clone)]
pub struct SyncBackends {
    pub cache: Rc<dyn CacheBackend>,
    pub record_source: Rc<dyn RecordSource>,
    pub status: Rc<dyn StatusReporter>,
    pub scheduler: Rc<dyn Scheduler>,
    pub clock: Rc<dyn Clock>,
    pub offline: OfflineService,
}

/// Sets a flag for as long as it lives
struct FlagGuard<'a>(&'a Cell<bool>);

impl<'a> FlagGuard<'a> {
    fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct CounterGuard<'a>(&'a Cell<u32>);

impl<'a> CounterGuard<'a> {
    fn enter(counter: &'a Cell<u32>) -> Self {
        counter.set(counter.get() + 1);
        Self(counter)
    }
}

impl Drop for CounterGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

struct Inner {
    config: SyncConfig,
    backends: SyncBackends,
    state: SyncStateWrapper,
    fallback: FallbackPolicy,
    queue: WriteQueue,
    read_in_flight: Cell<bool>,
    draining: Cell<bool>,
    logins_in_flight: Cell<u32>,
}

/// Handle to the session's sync controller; clones share the same state
#[derive(Clone)]
pub struct SyncController {
    inner: Rc<Inner>,
}

impl SyncController {
    pub fn new(config: SyncConfig, backends: SyncBackends) -> Self {
        let queue = WriteQueue::restore(backends.offline.clone());
        let fallback = FallbackPolicy::new(config.cache_error_threshold);
        Self {
            inner: Rc::new(Inner {
                config,
                backends,
                state: SyncStateWrapper::new(),
                fallback,
                queue,
                read_in_flight: Cell::new(false),
                draining: Cell::new(false),
                logins_in_flight: Cell::new(0),
            }),
        }
    }

    pub fn state(&self) -> &SyncStateWrapper {
        &self.inner.state
    }

    pub fn data(&self) -> Rc<DataState> {
        self.inner.state.data()
    }

    pub fn fallback(&self) -> &FallbackPolicy {
        &self.inner.fallback
    }

    pub fn pending_writes(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn pending_snapshot(&self) -> Vec<PendingWrite> {
        self.inner.queue.snapshot()
    }

    /// Boot-time load of a fresh local backup, before the first sync
    pub fn restore_local_backup(&self) -> bool {
        match self.inner.backends.offline.load_backup() {
            Some(data) => {
                self.inner.state.replace_data(data, DataSource::LocalBackup);
                true
            }
            None => false,
        }
    }

    // ==========================================
    // READ SYNC
    // ==========================================

    /// One read-sync pass. Pending writes go first: while the queue is not
    /// empty this drains it and reads nothing.
    pub async fn sync(&self) -> SyncOutcome {
        let inner = &self.inner;

        if !inner.queue.is_empty() {
            log::info!("📤 {} pending writes, draining queue instead of reading", inner.queue.len());
            return SyncOutcome::QueueDrained(self.process_queue().await);
        }

        if inner.read_in_flight.get() {
            log::info!("🔄 Sync already in progress, skipping");
            return SyncOutcome::AlreadyRunning;
        }
        let _reading = FlagGuard::raise(&inner.read_in_flight);

        self.report(SyncStatus::Syncing);

        if let Some(outcome) = self.try_cache().await {
            return outcome;
        }

        match self.sync_from_record_source().await {
            Ok(SyncOutcome::Unchanged) => {
                self.report(SyncStatus::Online);
                SyncOutcome::Unchanged
            }
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("❌ Sync failed (offline/error): {}", e);
                let restored = match inner.backends.offline.load_backup() {
                    Some(data) => {
                        inner.state.replace_data(data, DataSource::LocalBackup);
                        true
                    }
                    None => false,
                };
                self.report(SyncStatus::Offline);
                SyncOutcome::Offline { restored }
            }
        }
    }

    /// Cache step. `Some` on a hit, `None` to fall through to the sheet.
    async fn try_cache(&self) -> Option<SyncOutcome> {
        let inner = &self.inner;
        let cache = &inner.backends.cache;

        if !inner.fallback.should_use_cache() {
            log::debug!("⏭️ Fallback mode, cache skipped");
            return None;
        }
        if !cache.is_available() {
            log::debug!("⏭️ Cache not available");
            return None;
        }

        match cache.load_all_data().await {
            Ok(Some(data)) if !data.is_empty() => {
                inner.fallback.record_cache_success();
                log::info!("⚡ Loaded {} collections from cache", data.len());
                inner.state.replace_data(data, DataSource::Cache);
                self.report(SyncStatus::OnlineCache);
                self.schedule_reconciliation();
                Some(SyncOutcome::CacheHit)
            }
            Ok(_) => {
                inner.fallback.record_cache_success();
                log::info!("📭 Cache empty, reading Google Sheet");
                None
            }
            Err(e) => {
                log::warn!("⚠️ Cache load failed: {}", e);
                inner.fallback.record_cache_error(&e);
                None
            }
        }
    }

    /// Authoritative read. On data: replace state, schedule the cache
    /// write-back, save the local backup, report "Online", leave fallback mode.
    /// An unknown answer changes nothing and reports nothing.
    pub async fn sync_from_record_source(&self) -> Result<SyncOutcome, SyncError> {
        let inner = &self.inner;
        let payload = inner.backends.record_source.fetch_data().await?;

        let data = match payload {
            SheetPayload::Data(data) => data,
            SheetPayload::Unrecognized => {
                log::warn!("⚠️ Google Sheet answered with an unknown shape, ignored");
                return Ok(SyncOutcome::Unchanged);
            }
        };

        let write_back = inner.fallback.should_use_cache() && inner.backends.cache.is_available();
        let data = inner.state.replace_data(data, DataSource::SystemOfRecord);
        inner
            .state
            .set_last_authoritative_sync(inner.backends.clock.now_ms());

        if write_back {
            self.schedule_cache_write_back();
        }
        if let Err(e) = inner.backends.offline.save_backup(&data) {
            log::warn!("⚠️ Local backup not saved: {}", e);
        }

        self.report(SyncStatus::Online);
        inner.fallback.handle_success();
        log::info!("✅ Synced {} records from Google Sheet", data.record_count());
        Ok(SyncOutcome::Authoritative)
    }

    fn schedule_reconciliation(&self) {
        let this = self.clone();
        let delay = Duration::from_millis(self.inner.config.reconcile_delay_ms as u64);
        self.inner.backends.scheduler.schedule(
            TaskKind::Reconciliation,
            delay,
            Box::pin(async move {
                match this.sync_from_record_source().await {
                    Ok(outcome) => log::debug!("🔁 Background sync finished: {:?}", outcome),
                    Err(e) => log::warn!("⚠️ Background sync failed: {}", e),
                }
            }),
        );
    }

    fn schedule_cache_write_back(&self) {
        let this = self.clone();
        let delay = Duration::from_millis(self.inner.config.cache_write_back_delay_ms as u64);
        self.inner.backends.scheduler.schedule(
            TaskKind::CacheWriteBack,
            delay,
            Box::pin(async move { this.write_back_to_cache().await }),
        );
    }

    async fn write_back_to_cache(&self) {
        let inner = &self.inner;
        if !inner.fallback.should_use_cache() {
            log::debug!("⏭️ Fallback mode entered meanwhile, cache write-back skipped");
            return;
        }
        let data = inner.state.data();
        match inner.backends.cache.save_all_data(&data).await {
            Ok(()) => inner.fallback.record_cache_success(),
            Err(e) => {
                log::warn!("⚠️ Failed to save to cache (non-critical): {}", e);
                inner.fallback.record_cache_error(&e);
            }
        }
    }

    fn report(&self, status: SyncStatus) {
        let fallback = &self.inner.fallback;
        let text = fallback.annotate(status.label());
        let color = match status {
            SyncStatus::Online | SyncStatus::OnlineCache if fallback.is_fallback_mode() => {
                StatusColor::Yellow
            }
            _ => status.color(),
        };
        self.inner.state.set_status(status);
        self.inner.backends.status.report(&text, color);
    }

    // ==========================================
    // WRITES
    // ==========================================

    /// Login goes out at once; every other write is queued for the drain timer
    pub async fn submit(
        &self,
        kind: impl Into<WriteKind>,
        payload: Value,
    ) -> Result<SubmitOutcome, SyncError> {
        let inner = &self.inner;
        let write = PendingWrite::new(kind, payload, inner.backends.clock.now_ms());

        if write.kind.is_login() {
            let _login = CounterGuard::enter(&inner.logins_in_flight);
            log::info!("🔐 Sending login immediately");
            let answer = inner.backends.record_source.send_write(&write).await?;
            return Ok(SubmitOutcome::Sent(answer));
        }

        let position = inner.queue.push(write);
        log::info!("📝 Write queued at position {}", position);
        Ok(SubmitOutcome::Queued { position })
    }

    /// Sends queued writes in order until one fails. Postponed while a login
    /// is in flight. A drain that empties the queue schedules a read-sync.
    pub async fn process_queue(&self) -> DrainReport {
        let inner = &self.inner;
        let mut report = DrainReport::default();

        if inner.logins_in_flight.get() > 0 {
            log::debug!("⏳ Login in flight, queue drain postponed");
            report.remaining = inner.queue.len();
            return report;
        }
        if inner.draining.get() {
            report.remaining = inner.queue.len();
            return report;
        }
        let _draining = FlagGuard::raise(&inner.draining);

        let had_writes = !inner.queue.is_empty();
        while let Some(write) = inner.queue.front() {
            match inner.backends.record_source.send_write(&write).await {
                Ok(_) => {
                    inner.queue.pop_if(&write.id);
                    report.sent += 1;
                }
                Err(SyncError::Rejected(message)) => {
                    log::warn!(
                        "⚠️ '{}' rejected by server, dropped: {}",
                        write.kind.as_str(),
                        message
                    );
                    inner.queue.pop_if(&write.id);
                    report.dropped += 1;
                }
                Err(e) => {
                    log::warn!("⚠️ Queue drain stopped, retrying later: {}", e);
                    inner.queue.record_attempt(&write.id);
                    break;
                }
            }

            if inner.logins_in_flight.get() > 0 {
                log::debug!("⏳ Login started, yielding the queue");
                break;
            }
        }

        report.remaining = inner.queue.len();
        if report.sent + report.dropped > 0 {
            log::info!(
                "✅ Queue drain: {} sent, {} dropped, {} remaining",
                report.sent,
                report.dropped,
                report.remaining
            );
        }
        if had_writes && report.remaining == 0 {
            let this = self.clone();
            inner.backends.scheduler.schedule(
                TaskKind::ReadSync,
                Duration::ZERO,
                Box::pin(async move {
                    this.sync().await;
                }),
            );
        }
        report
    }

    // ==========================================
    // MAINTENANCE
    // ==========================================

    /// Empties the cache, then reloads from the Google Sheet
    pub async fn force_refresh_cache(&self) -> Result<SyncOutcome, SyncError> {
        log::info!("🧹 Forcing cache refresh");
        self.inner.backends.cache.clear_cache().await?;
        self.sync_from_record_source().await
    }

    /// Time of the last cache write-back, `None` when never written
    pub async fn cache_status(&self) -> Result<Option<CacheStatus>, CacheError> {
        let cache = &self.inner.backends.cache;
        if !cache.is_available() {
            return Ok(None);
        }
        cache.cache_status().await
    }

    /// Logout: the backup must not outlive the session
    pub fn clear_local_backup(&self) -> Result<(), SyncError> {
        self.inner.backends.offline.clear_backup()
    }
}
