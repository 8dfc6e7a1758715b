//! Status-change notifications.
//!
//! Handlers are invoked synchronously, after the registry lock is released,
//! in the order transitions happen for a given capability.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::core::{CapabilityName, CapabilityStatus, Transition};

/// A capability moved between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub name: CapabilityName,
    pub from: CapabilityStatus,
    pub to: CapabilityStatus,
}

impl StatusChange {
    pub fn new(name: CapabilityName, (from, to): Transition) -> Self {
        StatusChange { name, from, to }
    }
}

/// Handler signature.
pub type StatusHandler = Arc<dyn Fn(&StatusChange) + Send + Sync>;

/// Subscriber table.
#[derive(Default)]
pub struct Subscribers {
    by_name: Mutex<HashMap<CapabilityName, Vec<StatusHandler>>>,
    any: Mutex<Vec<StatusHandler>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one capability.
    pub fn subscribe(&self, name: CapabilityName, handler: StatusHandler) {
        self.by_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name)
            .or_default()
            .push(handler);
    }

    /// Subscribe to every capability.
    pub fn subscribe_all(&self, handler: StatusHandler) {
        self.any
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Deliver a change to its subscribers.
    pub fn notify(&self, change: &StatusChange) {
        // Clone out so handlers may subscribe without deadlocking.
        let mut handlers: Vec<StatusHandler> = self
            .by_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&change.name)
            .cloned()
            .unwrap_or_default();
        handlers.extend(
            self.any
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .cloned(),
        );

        for handler in handlers {
            handler(change);
        }
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers").finish_non_exhaustive()
    }
}
