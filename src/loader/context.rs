//! Execution context shared by the built-in loaders.
//!
//! Loading a module installs the globals it defines into the context, the
//! way a script sets properties on the page's global object. Probing then
//! asks the context whether the requested capability exists.
//!
//! Module file format (TOML):
//!
//! ```toml
//! defines = ["config"]
//! # error = "init failed"     # simulate a throw during initialization
//!
//! [exports.config]
//! app = { name = "Dashboard" }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use toml::Table;

use crate::core::{CapabilityName, Implementation};
use crate::loader::{LoadFailure, LoadRequest};

/// Parsed module manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleManifest {
    /// Globals the module installs
    pub defines: Vec<CapabilityName>,

    /// Initialization error raised when executed
    pub error: Option<String>,

    /// Export table per defined global
    pub exports: BTreeMap<CapabilityName, Table>,
}

impl ModuleManifest {
    /// Parse a manifest from TOML text.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Globals installed so far, and the order resources were executed in.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    globals: Mutex<HashMap<CapabilityName, Implementation>>,
    executed: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and execute module text loaded from `location`, then probe.
    pub fn run(&self, request: &LoadRequest<'_>, text: &str) -> Result<Implementation, LoadFailure> {
        lock(&self.executed).push(request.location.to_string());

        let manifest = ModuleManifest::parse(text).map_err(|e| {
            LoadFailure::execution(format!("failed to parse `{}`: {}", request.location, e))
        })?;

        self.install(request.location, &manifest)?;
        self.probe(request)
    }

    fn install(&self, location: &str, manifest: &ModuleManifest) -> Result<(), LoadFailure> {
        if let Some(message) = &manifest.error {
            return Err(LoadFailure::execution(format!(
                "`{}` threw during initialization: {}",
                location, message
            )));
        }

        let mut globals = lock(&self.globals);
        for name in &manifest.defines {
            let exports = manifest.exports.get(name).cloned().unwrap_or_default();
            tracing::trace!("{} defines `{}`", location, name);
            globals.insert(name.clone(), Implementation::loaded(location, exports));
        }
        Ok(())
    }

    /// Check whether the requested capability is defined.
    pub fn probe(&self, request: &LoadRequest<'_>) -> Result<Implementation, LoadFailure> {
        lock(&self.globals)
            .get(request.capability)
            .cloned()
            .ok_or_else(|| {
                LoadFailure::not_found(format!(
                    "`{}` ran but did not define `{}`",
                    request.location, request.capability
                ))
            })
    }

    /// Locations executed so far, in request order.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.executed).clone()
    }

    /// Whether `location` was executed at least once.
    pub fn is_executed(&self, location: &str) -> bool {
        lock(&self.executed).iter().any(|l| l == location)
    }

    /// Names of all installed globals, sorted.
    pub fn globals(&self) -> Vec<CapabilityName> {
        let mut names: Vec<_> = lock(&self.globals).keys().cloned().collect();
        names.sort();
        names
    }
}
