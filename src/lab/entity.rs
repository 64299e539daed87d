//! A controllable entity for lab scenarios.

use crate::host::Entity;
use crate::types::RegionKey;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// An entity whose validity and owning region are set by the test.
#[derive(Debug)]
pub struct LabEntity {
    name: String,
    valid: AtomicBool,
    region: Mutex<Option<RegionKey>>,
}

impl LabEntity {
    /// Creates a live entity, optionally inside a region.
    #[must_use]
    pub fn new(name: impl Into<String>, region: Option<RegionKey>) -> Self {
        Self {
            name: name.into(),
            valid: AtomicBool::new(true),
            region: Mutex::new(region),
        }
    }

    /// The entity's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Removes the entity. Tasks bound to it retire instead of firing.
    pub fn remove(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    /// Moves the entity to another region.
    pub fn move_to(&self, region: RegionKey) {
        *self.region.lock() = Some(region);
    }
}

impl Entity for LabEntity {
    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn region(&self) -> Option<RegionKey> {
        self.region.lock().clone()
    }
}
