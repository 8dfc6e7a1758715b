//! Implementation handles.
//!
//! An `Implementation` is what a capability resolves to: either the exports
//! of a genuinely loaded resource or a caller-supplied stand-in. Handles are
//! cheap to clone and compare by identity via [`Implementation::ptr_eq`].

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use toml::{Table, Value};

/// Where an implementation came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum ImplementationSource {
    /// Loaded from the given location.
    Location(String),
    /// Stand-in installed after every candidate failed.
    Fallback,
}

impl fmt::Display for ImplementationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImplementationSource::Location(location) => write!(f, "{}", location),
            ImplementationSource::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug)]
struct Inner {
    source: ImplementationSource,
    exports: Table,
}

/// Opaque, shareable handle to an active implementation.
#[derive(Clone)]
pub struct Implementation {
    inner: Arc<Inner>,
}

impl Implementation {
    /// Handle for a resource loaded from `location`.
    pub fn loaded(location: impl Into<String>, exports: Table) -> Self {
        Implementation {
            inner: Arc::new(Inner {
                source: ImplementationSource::Location(location.into()),
                exports,
            }),
        }
    }

    /// Stand-in handle.
    pub fn fallback(exports: Table) -> Self {
        Implementation {
            inner: Arc::new(Inner {
                source: ImplementationSource::Fallback,
                exports,
            }),
        }
    }

    pub fn source(&self) -> &ImplementationSource {
        &self.inner.source
    }

    pub fn is_fallback(&self) -> bool {
        self.inner.source == ImplementationSource::Fallback
    }

    pub fn exports(&self) -> &Table {
        &self.inner.exports
    }

    /// Top-level export keys, sorted.
    pub fn export_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.inner.exports.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Look up a dotted key path, e.g. `app.name`.
    ///
    /// An empty path yields `None`; intermediate non-table values end the walk.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.').filter(|p| !p.is_empty());
        let first = parts.next()?;
        let mut current = self.inner.exports.get(first)?;

        for part in parts {
            current = current.as_table()?.get(part)?;
        }

        Some(current)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Implementation) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("source", &self.inner.source)
            .field("exports", &self.export_keys())
            .finish()
    }
}
