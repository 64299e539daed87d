//! A region key's work queue and the permit held by its driver.

use crate::sync::OwnedSemaphorePermit;
use crate::types::RegionKey;
use crossbeam_queue::SegQueue;
use parking_lot::{Mutex, RwLock};

/// A queued unit of executor work.
pub(crate) type Item = Box<dyn FnOnce() + Send>;

/// Per-key FIFO drained by exactly one driver.
///
/// Producers push under the read side of `sealed`; the driver seals under
/// the write side only when the queue is empty, so no item can land in a
/// lane after its driver is gone.
pub(crate) struct Lane {
    key: RegionKey,
    items: SegQueue<Item>,
    sealed: RwLock<bool>,
    permit: Mutex<Option<OwnedSemaphorePermit>>,
}

impl Lane {
    pub(crate) fn new(key: RegionKey, permit: OwnedSemaphorePermit) -> Self {
        Self {
            key,
            items: SegQueue::new(),
            sealed: RwLock::new(false),
            permit: Mutex::new(Some(permit)),
        }
    }

    pub(crate) fn key(&self) -> &RegionKey {
        &self.key
    }

    /// Appends `item`, handing it back if the lane is sealed.
    pub(crate) fn push(&self, item: Item) -> Result<(), Item> {
        let sealed = self.sealed.read();
        if *sealed {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    pub(crate) fn pop(&self) -> Option<Item> {
        self.items.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Seals the lane if it is empty, returning its permit.
    ///
    /// Returns `None` if items are still queued or the lane was already
    /// sealed.
    pub(crate) fn seal_if_empty(&self) -> Option<OwnedSemaphorePermit> {
        let mut sealed = self.sealed.write();
        if *sealed || !self.items.is_empty() {
            return None;
        }
        *sealed = true;
        self.permit.lock().take()
    }

    #[cfg(test)]
    pub(crate) fn is_sealed(&self) -> bool {
        *self.sealed.read()
    }
}
