//! Capability registry - the single store of capability state.
//!
//! The registry holds exactly one [`CapabilityEntry`] per canonical name.
//! Readers get cloned snapshots; only the resolver mutates entries.
//!
//! Each entry also carries an async resolution guard. The resolver holds it
//! for the duration of a resolution so two tasks never drive the same entry
//! at once, while different entries resolve independently.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex as AsyncMutex;

use crate::core::entry::CapabilityEntry;
use crate::core::implementation::Implementation;
use crate::core::name::CapabilityName;
use crate::core::status::CapabilityStatus;

struct Slot {
    entry: CapabilityEntry,
    guard: Arc<AsyncMutex<()>>,
}

/// Process-wide view of which capabilities are real and which are degraded.
#[derive(Default)]
pub struct Registry {
    slots: RwLock<BTreeMap<CapabilityName, Slot>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Registry {
            slots: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<CapabilityName, Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<CapabilityName, Slot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of one entry, if it was ever requested.
    pub fn entry(&self, name: &CapabilityName) -> Option<CapabilityEntry> {
        self.read().get(name).map(|slot| slot.entry.clone())
    }

    /// Status of a capability; never-requested names are `Unresolved`.
    pub fn status(&self, name: &CapabilityName) -> CapabilityStatus {
        self.read()
            .get(name)
            .map(|slot| slot.entry.status)
            .unwrap_or(CapabilityStatus::Unresolved)
    }

    /// Current best-known implementation, real or stand-in.
    pub fn implementation(&self, name: &CapabilityName) -> Option<Implementation> {
        self.read()
            .get(name)
            .and_then(|slot| slot.entry.implementation.clone())
    }

    /// Names of all entries, sorted.
    pub fn names(&self) -> Vec<CapabilityName> {
        self.read().keys().cloned().collect()
    }

    /// Status of every entry at call time.
    pub fn snapshot(&self) -> BTreeMap<CapabilityName, CapabilityStatus> {
        self.read()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.entry.status))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Create the entry if missing and return its resolution guard.
    pub(crate) fn ensure(&self, name: &CapabilityName) -> Arc<AsyncMutex<()>> {
        if let Some(slot) = self.read().get(name) {
            return Arc::clone(&slot.guard);
        }

        let mut slots = self.write();
        let slot = slots.entry(name.clone()).or_insert_with(|| Slot {
            entry: CapabilityEntry::new(name.clone()),
            guard: Arc::new(AsyncMutex::new(())),
        });
        Arc::clone(&slot.guard)
    }

    /// Mutate an entry under the write lock, creating it if missing.
    pub(crate) fn update<R>(
        &self,
        name: &CapabilityName,
        f: impl FnOnce(&mut CapabilityEntry) -> R,
    ) -> R {
        let mut slots = self.write();
        let slot = slots.entry(name.clone()).or_insert_with(|| Slot {
            entry: CapabilityEntry::new(name.clone()),
            guard: Arc::new(AsyncMutex::new(())),
        });
        f(&mut slot.entry)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}
