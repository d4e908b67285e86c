// ============================================================================
// SYNC STATE - Current snapshot + sync status
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::models::{DataState, SyncStatus};

type DataSubscriber = Rc<dyn Fn(&DataState)>;

/// Where the current snapshot came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataSource {
    Cache,
    SystemOfRecord,
    LocalBackup,
}

/// Shared sync state. Only the sync controller writes it; the snapshot is
/// swapped as a whole so readers hold either the old or the new one.
#[derive(Clone)]
pub struct SyncStateWrapper {
    data: Rc<RefCell<Rc<DataState>>>,
    source: Rc<RefCell<Option<DataSource>>>,
    status: Rc<RefCell<Option<SyncStatus>>>,
    last_authoritative_sync: Rc<RefCell<Option<i64>>>,
    subscribers: Rc<RefCell<Vec<DataSubscriber>>>,
}

impl SyncStateWrapper {
    pub fn new() -> Self {
        Self {
            data: Rc::new(RefCell::new(Rc::new(DataState::new()))),
            source: Rc::new(RefCell::new(None)),
            status: Rc::new(RefCell::new(None)),
            last_authoritative_sync: Rc::new(RefCell::new(None)),
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Current snapshot; stays valid even if a sync replaces it afterwards
    pub fn data(&self) -> Rc<DataState> {
        self.data.borrow().clone()
    }

    pub fn source(&self) -> Option<DataSource> {
        *self.source.borrow()
    }

    pub fn status(&self) -> Option<SyncStatus> {
        *self.status.borrow()
    }

    pub fn last_authoritative_sync(&self) -> Option<i64> {
        *self.last_authoritative_sync.borrow()
    }

    pub(crate) fn replace_data(&self, data: DataState, source: DataSource) -> Rc<DataState> {
        let data = Rc::new(data);
        *self.data.borrow_mut() = data.clone();
        *self.source.borrow_mut() = Some(source);
        self.notify(&data);
        data
    }

    pub(crate) fn set_status(&self, status: SyncStatus) {
        *self.status.borrow_mut() = Some(status);
    }

    pub(crate) fn set_last_authoritative_sync(&self, at_ms: i64) {
        *self.last_authoritative_sync.borrow_mut() = Some(at_ms);
    }

    /// Called after every snapshot replacement (UI refresh)
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&DataState) + 'static,
    {
        self.subscribers.borrow_mut().push(Rc::new(callback));
    }

    fn notify(&self, data: &DataState) {
        // Clone the list so a subscriber may subscribe again without a borrow panic
        let subscribers: Vec<DataSubscriber> = self.subscribers.borrow().clone();
        for callback in subscribers {
            callback(data);
        }
    }
}

impl Default for SyncStateWrapper {
    fn default() -> Self {
        Self::new()
    }
}
