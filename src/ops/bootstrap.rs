//! Dependency-ordered resolution of a whole catalog.
//!
//! The prerequisite (normally `config`) goes first, on its own. Everything
//! else is split into waves: a wave holds every capability whose declared
//! dependencies sit in earlier waves, and the members of one wave resolve
//! concurrently.

use std::collections::{BTreeMap, BTreeSet};

use futures::future::join_all;

use crate::core::{CapabilityName, CapabilityStatus};
use crate::resolver::{Catalog, ResolveError, ResolveOptions, Resolver};

/// Options for [`bootstrap`].
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Resolved before anything else when the catalog declares it
    pub prerequisite: Option<CapabilityName>,

    /// Restrict to these names (all catalog entries when empty)
    pub only: Vec<CapabilityName>,

    /// Re-resolve entries that already reached a terminal state
    pub force_reload: bool,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        BootstrapOptions {
            prerequisite: Some(CapabilityName::new("config")),
            only: Vec::new(),
            force_reload: false,
        }
    }
}

/// Outcome of a bootstrap run.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    /// Final status of every requested capability
    pub statuses: BTreeMap<CapabilityName, CapabilityStatus>,

    /// Errors for the capabilities that ended up `Failed`
    pub errors: Vec<ResolveError>,

    /// Names that could not be provided at all
    pub missing: Vec<CapabilityName>,

    /// Names with an active implementation, real or stand-in
    pub existing: Vec<CapabilityName>,
}

impl BootstrapReport {
    /// Whether any capability had to degrade to its fallback.
    pub fn fixes_applied(&self) -> bool {
        self.statuses
            .values()
            .any(|status| *status == CapabilityStatus::Fallback)
    }

    pub fn has_failures(&self) -> bool {
        !self.missing.is_empty()
    }

    fn record(&mut self, name: CapabilityName, result: Result<CapabilityStatus, ResolveError>) {
        let status = match result {
            Ok(status) => status,
            Err(e) => {
                self.errors.push(e);
                CapabilityStatus::Failed
            }
        };

        if status.has_implementation() {
            self.existing.push(name.clone());
        } else if status == CapabilityStatus::Failed {
            self.missing.push(name.clone());
        }
        self.statuses.insert(name, status);
    }
}

/// Split `targets` into dependency waves.
///
/// Dependencies outside `targets` are ignored here; the resolver still
/// resolves them first when a dependent is requested.
pub fn dependency_waves(catalog: &Catalog, targets: &[CapabilityName]) -> Vec<Vec<CapabilityName>> {
    let mut remaining: BTreeSet<CapabilityName> = targets.iter().cloned().collect();
    let mut placed: BTreeSet<CapabilityName> = BTreeSet::new();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
        let wave: Vec<CapabilityName> = remaining
            .iter()
            .filter(|name| {
                catalog
                    .dependencies(name)
                    .iter()
                    .all(|dep| placed.contains(dep) || !remaining.contains(dep))
            })
            .cloned()
            .collect();

        // Validated catalogs are acyclic, so this only guards malformed input.
        if wave.is_empty() {
            waves.push(remaining.into_iter().collect());
            break;
        }

        for name in &wave {
            remaining.remove(name);
            placed.insert(name.clone());
        }
        waves.push(wave);
    }

    waves
}

/// Resolve the prerequisite, then the requested capabilities wave by wave.
pub async fn bootstrap(resolver: &Resolver, options: &BootstrapOptions) -> BootstrapReport {
    let catalog = resolver.catalog();
    let resolve_options = ResolveOptions {
        force_reload: options.force_reload,
    };

    let mut targets: Vec<CapabilityName> = if options.only.is_empty() {
        catalog.names().cloned().collect()
    } else {
        options.only.clone()
    };

    let mut report = BootstrapReport::default();

    if let Some(prerequisite) = &options.prerequisite {
        if catalog.contains(prerequisite) || targets.contains(prerequisite) {
            tracing::debug!("resolving prerequisite `{}`", prerequisite);
            let result = resolver
                .resolve_with(prerequisite.clone(), None, resolve_options)
                .await;
            report.record(prerequisite.clone(), result);
            targets.retain(|name| name != prerequisite);
        }
    }

    let waves = dependency_waves(catalog, &targets);
    for (index, wave) in waves.into_iter().enumerate() {
        tracing::debug!(
            "wave {}: {}",
            index + 1,
            wave.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", ")
        );

        let results = join_all(
            wave.iter()
                .map(|name| resolver.resolve_with(name.clone(), None, resolve_options)),
        )
        .await;

        for (name, result) in wave.into_iter().zip(results) {
            report.record(name, result);
        }
    }

    if report.fixes_applied() {
        tracing::info!(
            "{} capabilities running on fallbacks",
            report
                .statuses
                .values()
                .filter(|s| **s == CapabilityStatus::Fallback)
                .count()
        );
    }
    if report.has_failures() {
        tracing::warn!(
            "missing capabilities: {}",
            report
                .missing
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    report
}
