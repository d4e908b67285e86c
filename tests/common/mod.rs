// Test doubles for the sync controller collaborators
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use classroom_pwa::config::SyncConfig;
use classroom_pwa::errors::{CacheError, SyncError};
use classroom_pwa::models::{
    DataState, LocalBackup, PendingWrite, SheetPayload, StatusColor,
};
use classroom_pwa::services::{
    CacheBackend, LocalTask, OfflineService, RecordSource, Scheduler, StatusReporter,
    SyncBackends, SyncController, TaskKind,
};
use classroom_pwa::utils::clock::ManualClock;
use classroom_pwa::utils::storage::{save_to_storage, KeyValueStorage, MemoryStorage};

pub const NOW_MS: i64 = 1_760_000_000_000;
pub const MINUTE_MS: i64 = 60_000;

pub fn roster(codes: &[&str]) -> DataState {
    let students = codes
        .iter()
        .map(|code| json!({ "code": code, "name": format!("Student {}", code) }))
        .collect();
    DataState::new()
        .with_collection("students", students)
        .with_collection("subjects", vec![json!({ "id": "math" })])
}

// ==========================================
// CACHE
// ==========================================

pub struct MockCache {
    pub available: Cell<bool>,
    pub loads: RefCell<VecDeque<Result<Option<DataState>, CacheError>>>,
    pub saves: RefCell<VecDeque<Result<(), CacheError>>>,
    pub saved: RefCell<Vec<DataState>>,
    pub load_calls: Cell<usize>,
    pub clear_calls: Cell<usize>,
    /// Makes `load_all_data` suspend once, so a second sync can start meanwhile
    pub yield_on_load: Cell<bool>,
}

impl MockCache {
    pub fn new() -> Self {
        Self {
            available: Cell::new(true),
            loads: RefCell::new(VecDeque::new()),
            saves: RefCell::new(VecDeque::new()),
            saved: RefCell::new(Vec::new()),
            load_calls: Cell::new(0),
            clear_calls: Cell::new(0),
            yield_on_load: Cell::new(false),
        }
    }

    pub fn push_load(&self, result: Result<Option<DataState>, CacheError>) {
        self.loads.borrow_mut().push_back(result);
    }

    pub fn push_save(&self, result: Result<(), CacheError>) {
        self.saves.borrow_mut().push_back(result);
    }
}

#[async_trait(?Send)]
impl CacheBackend for MockCache {
    fn is_available(&self) -> bool {
        self.available.get()
    }

    async fn load_all_data(&self) -> Result<Option<DataState>, CacheError> {
        self.load_calls.set(self.load_calls.get() + 1);
        if self.yield_on_load.get() {
            tokio::task::yield_now().await;
        }
        self.loads.borrow_mut().pop_front().unwrap_or(Ok(None))
    }

    async fn save_all_data(&self, data: &DataState) -> Result<(), CacheError> {
        let result = self.saves.borrow_mut().pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.saved.borrow_mut().push(data.clone());
        }
        result
    }

    async fn clear_cache(&self) -> Result<(), CacheError> {
        self.clear_calls.set(self.clear_calls.get() + 1);
        Ok(())
    }
}

// ==========================================
// GOOGLE SHEET
// ==========================================

pub struct MockRecordSource {
    pub fetches: RefCell<VecDeque<Result<SheetPayload, SyncError>>>,
    pub write_results: RefCell<VecDeque<Result<Value, SyncError>>>,
    pub fetch_calls: Cell<usize>,
    pub sent: RefCell<Vec<PendingWrite>>,
    /// Times a login send suspends before answering
    pub login_yields: Cell<u32>,
    /// Times any other send suspends before answering
    pub write_yields: Cell<u32>,
}

impl MockRecordSource {
    pub fn new() -> Self {
        Self {
            fetches: RefCell::new(VecDeque::new()),
            write_results: RefCell::new(VecDeque::new()),
            fetch_calls: Cell::new(0),
            sent: RefCell::new(Vec::new()),
            login_yields: Cell::new(0),
            write_yields: Cell::new(0),
        }
    }

    pub fn push_fetch(&self, result: Result<SheetPayload, SyncError>) {
        self.fetches.borrow_mut().push_back(result);
    }

    pub fn push_write(&self, result: Result<Value, SyncError>) {
        self.write_results.borrow_mut().push_back(result);
    }

    pub fn sent_actions(&self) -> Vec<String> {
        self.sent
            .borrow()
            .iter()
            .map(|write| write.kind.as_str().to_string())
            .collect()
    }
}

#[async_trait(?Send)]
impl RecordSource for MockRecordSource {
    async fn fetch_data(&self) -> Result<SheetPayload, SyncError> {
        self.fetch_calls.set(self.fetch_calls.get() + 1);
        self.fetches
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::Network("Failed to fetch".to_string())))
    }

    async fn send_write(&self, write: &PendingWrite) -> Result<Value, SyncError> {
        self.sent.borrow_mut().push(write.clone());
        let yields = if write.kind.is_login() {
            self.login_yields.get()
        } else {
            self.write_yields.get()
        };
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
        self.write_results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "status": "success" })))
    }
}

// ==========================================
// STATUS + SCHEDULER
// ==========================================

#[derive(Default)]
pub struct RecordingReporter {
    pub reports: RefCell<Vec<(String, StatusColor)>>,
}

impl RecordingReporter {
    pub fn texts(&self) -> Vec<String> {
        self.reports.borrow().iter().map(|(text, _)| text.clone()).collect()
    }

    pub fn last(&self) -> Option<(String, StatusColor)> {
        self.reports.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.reports.borrow_mut().clear();
    }
}

impl StatusReporter for RecordingReporter {
    fn report(&self, text: &str, color: StatusColor) {
        self.reports.borrow_mut().push((text.to_string(), color));
    }
}

/// Holds scheduled tasks until the test runs them
#[derive(Default)]
pub struct ManualScheduler {
    pending: RefCell<Vec<(TaskKind, Duration, LocalTask)>>,
    history: RefCell<Vec<(TaskKind, Duration)>>,
}

impl ManualScheduler {
    pub fn scheduled(&self) -> Vec<TaskKind> {
        self.history.borrow().iter().map(|(kind, _)| *kind).collect()
    }

    pub fn delay_of(&self, kind: TaskKind) -> Option<Duration> {
        self.history
            .borrow()
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, delay)| *delay)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Runs pending tasks, including the ones they schedule, in FIFO order
    pub async fn run_all(&self) {
        for _ in 0..16 {
            let batch: Vec<_> = self.pending.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                return;
            }
            for (_, _, task) in batch {
                task.await;
            }
        }
        panic!("scheduled tasks keep rescheduling");
    }

    /// Drops pending tasks without running them
    pub fn discard_all(&self) {
        self.pending.borrow_mut().clear();
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, kind: TaskKind, delay: Duration, task: LocalTask) {
        self.history.borrow_mut().push((kind, delay));
        self.pending.borrow_mut().push((kind, delay, task));
    }
}

// ==========================================
// HARNESS
// ==========================================

pub struct Harness {
    pub cache: Rc<MockCache>,
    pub source: Rc<MockRecordSource>,
    pub reporter: Rc<RecordingReporter>,
    pub scheduler: Rc<ManualScheduler>,
    pub clock: Rc<ManualClock>,
    pub storage: Rc<MemoryStorage>,
    pub config: SyncConfig,
    pub controller: SyncController,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(Rc::new(MemoryStorage::new()))
    }

    /// A fresh controller over existing storage, as after a page reload
    pub fn with_storage(storage: Rc<MemoryStorage>) -> Self {
        let config = SyncConfig::default();
        let cache = Rc::new(MockCache::new());
        let source = Rc::new(MockRecordSource::new());
        let reporter = Rc::new(RecordingReporter::default());
        let scheduler = Rc::new(ManualScheduler::default());
        let clock = Rc::new(ManualClock::new(NOW_MS));

        let offline = OfflineService::new(
            storage.clone(),
            clock.clone(),
            &config.local_backup_key,
            &config.pending_queue_key,
            config.local_snapshot_max_age_ms,
        );
        let backends = SyncBackends {
            cache: cache.clone(),
            record_source: source.clone(),
            status: reporter.clone(),
            scheduler: scheduler.clone(),
            clock: clock.clone(),
            offline,
        };
        let controller = SyncController::new(config.clone(), backends);

        Self {
            cache,
            source,
            reporter,
            scheduler,
            clock,
            storage,
            config,
            controller,
        }
    }

    /// Writes a backup that is `age_ms` old at the current clock time
    pub fn seed_backup(&self, data: &DataState, age_ms: i64) {
        let backup = LocalBackup {
            timestamp: NOW_MS - age_ms,
            data: data.clone(),
        };
        let storage: &dyn KeyValueStorage = self.storage.as_ref();
        save_to_storage(storage, &self.config.local_backup_key, &backup)
            .expect("seed backup");
    }

    pub fn stored_backup(&self) -> Option<LocalBackup> {
        let raw = self
            .storage
            .get_item(&self.config.local_backup_key)
            .expect("read backup")?;
        Some(serde_json::from_str(&raw).expect("decode backup"))
    }

    /// Terminal status reports only (everything except "Syncing...")
    pub fn terminal_reports(&self) -> Vec<String> {
        self.reporter
            .texts()
            .into_iter()
            .filter(|text| text != "Syncing...")
            .collect()
    }
}
