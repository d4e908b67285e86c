use std::cell::RefCell;

use crate::models::{PendingWrite, PendingWritesQueue};
use crate::services::offline_service::OfflineService;

/// FIFO of writes waiting to be sent to the System-of-Record, mirrored to
/// localStorage after every mutation so it survives a reload.
pub struct WriteQueue {
    queue: RefCell<PendingWritesQueue>,
    offline: OfflineService,
}

impl WriteQueue {
    /// Restores whatever a previous page left behind
    pub fn restore(offline: OfflineService) -> Self {
        let queue = match offline.load_queue() {
            Ok(Some(queue)) => {
                if !queue.writes.is_empty() {
                    log::info!("📋 Restored {} pending writes", queue.writes.len());
                }
                queue
            }
            Ok(None) => PendingWritesQueue::default(),
            Err(e) => {
                log::error!("❌ Pending queue unreadable, starting empty: {}", e);
                PendingWritesQueue::default()
            }
        };
        Self {
            queue: RefCell::new(queue),
            offline,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().writes.is_empty()
    }

    /// Appends `write`, returns its 1-based position
    pub fn push(&self, write: PendingWrite) -> usize {
        let position = {
            let mut queue = self.queue.borrow_mut();
            queue.writes.push_back(write);
            queue.writes.len()
        };
        self.persist();
        position
    }

    pub fn front(&self) -> Option<PendingWrite> {
        self.queue.borrow().writes.front().cloned()
    }

    /// Removes the head if it is still the write with `id`
    pub fn pop_if(&self, id: &str) -> Option<PendingWrite> {
        let popped = {
            let mut queue = self.queue.borrow_mut();
            match queue.writes.front() {
                Some(head) if head.id == id => queue.writes.pop_front(),
                _ => None,
            }
        };
        if popped.is_some() {
            self.persist();
        }
        popped
    }

    pub fn record_attempt(&self, id: &str) {
        {
            let mut queue = self.queue.borrow_mut();
            if let Some(write) = queue.writes.iter_mut().find(|w| w.id == id) {
                write.attempts += 1;
            }
        }
        self.persist();
    }

    pub fn snapshot(&self) -> Vec<PendingWrite> {
        self.queue.borrow().writes.iter().cloned().collect()
    }

    fn persist(&self) {
        let queue = self.queue.borrow().clone();
        if let Err(e) = self.offline.save_queue(&queue) {
            log::error!("❌ Could not persist pending queue: {}", e);
        }
    }
}
