//! Resolver - the capability state machine.
//!
//! For a requested capability the resolver:
//!
//! 1. resolves its declared dependencies to a terminal state,
//! 2. returns immediately if it is already `Loaded` or `Fallback`,
//! 3. walks the normalizer's candidates in order, one load at a time,
//!    stopping at the first success,
//! 4. otherwise installs the fallback (and schedules one background retry)
//!    or marks the capability `Failed`.
//!
//! Load failures never escape: they are recorded in the attempt log and the
//! next candidate is tried. The worst a caller sees is `Failed`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::core::{
    AttemptRecord, CapabilityEntry, CapabilityName, CapabilityStatus, FailureReason,
    Implementation, Registry, Transition,
};
use crate::loader::{LoadFailure, LoadRequest, Loader};
use crate::resolver::catalog::Catalog;
use crate::resolver::errors::ResolveError;
use crate::resolver::events::{StatusChange, Subscribers};
use crate::resolver::normalize::{rebase, PathNormalizer};

/// Resolver tuning.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Upper bound for one load attempt
    pub load_timeout: Duration,

    /// Pause after a successful load before the implementation is accepted
    pub settle_delay: Duration,

    /// Schedule one background retry when degrading to a fallback
    pub background_retry: bool,

    /// Location of the hosting document; background retries are resolved
    /// relative to it
    pub document_base: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            load_timeout: Duration::from_secs(5),
            settle_delay: Duration::from_millis(100),
            background_retry: true,
            document_base: String::new(),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Discard the current state and attempt log and start over
    pub force_reload: bool,
}

impl ResolveOptions {
    pub fn force() -> Self {
        ResolveOptions { force_reload: true }
    }
}

struct Shared {
    registry: Registry,
    catalog: Catalog,
    normalizer: PathNormalizer,
    loader: Arc<dyn Loader>,
    config: ResolverConfig,
    subscribers: Subscribers,
    background: Mutex<Vec<JoinHandle<()>>>,
}

/// Builder for [`Resolver`].
pub struct ResolverBuilder {
    loader: Arc<dyn Loader>,
    catalog: Catalog,
    normalizer: PathNormalizer,
    config: ResolverConfig,
}

impl ResolverBuilder {
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn normalizer(mut self, normalizer: PathNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the catalog and build the resolver.
    pub fn build(self) -> Result<Resolver, ResolveError> {
        self.catalog.validate()?;

        Ok(Resolver {
            shared: Arc::new(Shared {
                registry: Registry::new(),
                catalog: self.catalog,
                normalizer: self.normalizer,
                loader: self.loader,
                config: self.config,
                subscribers: Subscribers::new(),
                background: Mutex::new(Vec::new()),
            }),
        })
    }
}

/// Resolves capabilities through an injected [`Loader`].
///
/// Cloning is cheap; clones share the registry, subscribers and pending
/// background work.
#[derive(Clone)]
pub struct Resolver {
    shared: Arc<Shared>,
}

impl Resolver {
    /// Start building a resolver around `loader`.
    pub fn builder(loader: Arc<dyn Loader>) -> ResolverBuilder {
        ResolverBuilder {
            loader,
            catalog: Catalog::new(),
            normalizer: PathNormalizer::default(),
            config: ResolverConfig::default(),
        }
    }

    /// Resolver with default normalizer and config.
    pub fn new(loader: Arc<dyn Loader>, catalog: Catalog) -> Result<Self, ResolveError> {
        Self::builder(loader).catalog(catalog).build()
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    pub fn catalog(&self) -> &Catalog {
        &self.shared.catalog
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        &self.shared.normalizer
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.shared.config
    }

    pub fn loader_name(&self) -> &str {
        self.shared.loader.name()
    }

    /// Resolve with the catalog's fallback and default options.
    pub async fn resolve(
        &self,
        name: impl Into<CapabilityName>,
    ) -> Result<CapabilityStatus, ResolveError> {
        self.resolve_with(name, None, ResolveOptions::default())
            .await
    }

    /// Resolve a capability.
    ///
    /// A caller-supplied `fallback` takes precedence over the catalog's.
    /// Returns the terminal status; `Err(NoFallbackAvailable)` means the
    /// capability is `Failed`.
    pub async fn resolve_with(
        &self,
        name: impl Into<CapabilityName>,
        fallback: Option<Implementation>,
        options: ResolveOptions,
    ) -> Result<CapabilityStatus, ResolveError> {
        self.resolve_inner(name.into(), fallback, options).await
    }

    fn resolve_inner(
        &self,
        name: CapabilityName,
        fallback: Option<Implementation>,
        options: ResolveOptions,
    ) -> BoxFuture<'_, Result<CapabilityStatus, ResolveError>> {
        async move {
            // Dependencies first. A failed dependency is still terminal, so the
            // dependent goes ahead and copes on its own.
            for dep in self.catalog().dependencies(&name).to_vec() {
                if let Err(e) = self
                    .resolve_inner(dep.clone(), None, ResolveOptions::default())
                    .await
                {
                    tracing::debug!("dependency `{}` of `{}` failed: {}", dep, name, e);
                }
            }

            let guard = self.shared.registry.ensure(&name);
            let _resolving = guard.lock().await;

            let current = self.shared.registry.status(&name);
            if options.force_reload {
                tracing::debug!("forcing re-resolution of `{}`", name);
                self.transition(&name, |entry| Ok(entry.reset()))?;
            } else {
                match current {
                    CapabilityStatus::Loaded | CapabilityStatus::Fallback => return Ok(current),
                    CapabilityStatus::Failed => return Err(self.no_fallback(&name)),
                    CapabilityStatus::Resolving => {
                        // Only reachable if an earlier resolution was dropped mid-flight.
                        tracing::warn!("`{}` was left resolving, starting over", name);
                        self.transition(&name, |entry| Ok(entry.reset()))?;
                    }
                    CapabilityStatus::Unresolved => {}
                }
            }

            self.transition(&name, CapabilityEntry::begin)?;

            let base = self.catalog().location_for(&name);
            let candidates = self.normalizer().candidates(&base);
            tracing::debug!(
                "resolving `{}` from {} candidate(s) of `{}`",
                name,
                candidates.len(),
                base
            );

            for candidate in &candidates {
                match self.attempt(&name, candidate).await {
                    Ok(implementation) => {
                        self.shared.registry.update(&name, |entry| {
                            entry.record_attempt(AttemptRecord::success(candidate))
                        })?;
                        self.transition(&name, |entry| entry.finish_loaded(implementation))?;
                        tracing::info!("loaded `{}` from {}", name, candidate);
                        return Ok(CapabilityStatus::Loaded);
                    }
                    Err(failure) => {
                        tracing::debug!("`{}` not available at {}: {}", name, candidate, failure);
                        self.shared.registry.update(&name, |entry| {
                            entry.record_attempt(AttemptRecord::failure(
                                candidate,
                                failure.reason,
                                failure.detail,
                            ))
                        })?;
                    }
                }
            }

            let fallback = fallback.or_else(|| self.catalog().fallback_for(&name));
            match fallback {
                Some(fallback) => {
                    let exhausted = ResolveError::ExhaustedCandidates {
                        capability: name.to_string(),
                        attempts: self.attempts(&name),
                    };
                    self.transition(&name, |entry| entry.finish_fallback(fallback))?;
                    tracing::warn!("{}", exhausted.to_diagnostic().format(false).trim_end());

                    if self.config().background_retry {
                        if let Some(first) = candidates.first() {
                            self.schedule_retry(&name, first);
                        }
                    }
                    Ok(CapabilityStatus::Fallback)
                }
                None => {
                    self.transition(&name, CapabilityEntry::finish_failed)?;
                    let err = self.no_fallback(&name);
                    tracing::warn!("{}", err);
                    Err(err)
                }
            }
        }
        .boxed()
    }

    /// One bounded load attempt.
    async fn attempt(
        &self,
        name: &CapabilityName,
        location: &str,
    ) -> Result<Implementation, LoadFailure> {
        let request = LoadRequest::new(name, location);
        let timeout = self.config().load_timeout;

        match tokio::time::timeout(timeout, self.shared.loader.load(&request)).await {
            Ok(Ok(implementation)) => {
                let settle = self.config().settle_delay;
                if !settle.is_zero() {
                    tokio::time::sleep(settle).await;
                }
                Ok(implementation)
            }
            Ok(Err(failure)) => Err(failure),
            Err(_) => Err(LoadFailure::new(
                FailureReason::TimedOut,
                format!("no response within {}ms", timeout.as_millis()),
            )),
        }
    }

    /// Spawn the single background retry for a degraded capability.
    fn schedule_retry(&self, name: &CapabilityName, first_candidate: &str) {
        let location = rebase(&self.config().document_base, first_candidate);
        let generation = self.shared.registry.update(name, |entry| {
            entry
                .schedule_retry(location.clone())
                .then_some(entry.generation())
        });
        let Some(generation) = generation else {
            return;
        };

        tracing::debug!("scheduling background retry of `{}` at {}", name, location);

        let resolver = self.clone();
        let name = name.clone();
        let handle = tokio::spawn(async move {
            let outcome = resolver.attempt(&name, &location).await;
            match &outcome {
                Ok(_) => tracing::info!("background retry loaded `{}` from {}", name, location),
                Err(failure) => {
                    tracing::debug!("background retry of `{}` failed: {}", name, failure)
                }
            }

            let transition = resolver
                .shared
                .registry
                .update(&name, |entry| entry.complete_retry(generation, outcome));
            if let Some(transition) = transition {
                resolver.notify(&name, transition);
            }
        });

        let mut background = self
            .shared
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        background.retain(|handle| !handle.is_finished());
        background.push(handle);
    }

    /// Wait for all scheduled background retries to finish.
    pub async fn settle(&self) {
        loop {
            let handles: Vec<_> = std::mem::take(
                &mut *self
                    .shared
                    .background
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!("background retry task ended abnormally: {}", e);
                }
            }
        }
    }

    /// Number of background retries not yet joined by [`Resolver::settle`].
    pub fn pending_retries(&self) -> usize {
        self.shared
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    fn transition(
        &self,
        name: &CapabilityName,
        f: impl FnOnce(&mut CapabilityEntry) -> Result<Transition, ResolveError>,
    ) -> Result<(), ResolveError> {
        let transition = self.shared.registry.update(name, f)?;
        self.notify(name, transition);
        Ok(())
    }

    fn notify(&self, name: &CapabilityName, transition: Transition) {
        if transition.0 == transition.1 {
            return;
        }
        tracing::trace!("`{}`: {} -> {}", name, transition.0, transition.1);
        self.shared
            .subscribers
            .notify(&StatusChange::new(name.clone(), transition));
    }

    fn attempts(&self, name: &CapabilityName) -> Vec<AttemptRecord> {
        self.shared
            .registry
            .entry(name)
            .map(|entry| entry.attempts().to_vec())
            .unwrap_or_default()
    }

    fn no_fallback(&self, name: &CapabilityName) -> ResolveError {
        ResolveError::NoFallbackAvailable {
            capability: name.to_string(),
            attempts: self.attempts(name),
        }
    }

    /// Current best-known implementation, real or stand-in.
    pub fn get(&self, name: impl Into<CapabilityName>) -> Option<Implementation> {
        self.shared.registry.implementation(&name.into())
    }

    /// Status of one capability; never-requested names are `Unresolved`.
    pub fn status(&self, name: impl Into<CapabilityName>) -> CapabilityStatus {
        self.shared.registry.status(&name.into())
    }

    /// Snapshot of one entry.
    pub fn entry(&self, name: impl Into<CapabilityName>) -> Option<CapabilityEntry> {
        self.shared.registry.entry(&name.into())
    }

    /// Status of every declared or requested capability.
    pub fn snapshot(&self) -> BTreeMap<CapabilityName, CapabilityStatus> {
        let mut snapshot: BTreeMap<_, _> = self
            .catalog()
            .names()
            .map(|name| (name.clone(), CapabilityStatus::Unresolved))
            .collect();
        snapshot.extend(self.shared.registry.snapshot());
        snapshot
    }

    /// Call `handler` whenever `name` changes state.
    pub fn on_status_change(
        &self,
        name: impl Into<CapabilityName>,
        handler: impl Fn(&StatusChange) + Send + Sync + 'static,
    ) {
        self.shared
            .subscribers
            .subscribe(name.into(), Arc::new(handler));
    }

    /// Call `handler` whenever any capability changes state.
    pub fn on_any_status_change(&self, handler: impl Fn(&StatusChange) + Send + Sync + 'static) {
        self.shared.subscribers.subscribe_all(Arc::new(handler));
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("loader", &self.loader_name())
            .field("registry", &self.shared.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttemptOutcome, BackgroundRetry};
    use crate::resolver::catalog::CapabilitySpec;
    use crate::test_support::{config_fallback, fast_config, MockLoader};

    fn resolver(loader: &Arc<MockLoader>, catalog: Catalog) -> Resolver {
        Resolver::builder(Arc::clone(loader) as Arc<dyn Loader>)
            .catalog(catalog)
            .normalizer(PathNormalizer::exact())
            .config(fast_config())
            .build()
            .unwrap()
    }

    fn recorder(resolver: &Resolver, name: &str) -> Arc<Mutex<Vec<(CapabilityStatus, CapabilityStatus)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        resolver.on_status_change(name, move |change| {
            sink.lock().unwrap().push((change.from, change.to));
        });
        seen
    }

    #[tokio::test]
    async fn test_never_requested_is_unresolved() {
        let loader = Arc::new(MockLoader::new());
        let catalog = Catalog::new().with("ui", CapabilitySpec::at("js/modules/ui.js"));
        let resolver = resolver(&loader, catalog);

        assert_eq!(resolver.status("ui"), CapabilityStatus::Unresolved);
        assert_eq!(resolver.status("planning"), CapabilityStatus::Unresolved);
        assert_eq!(
            resolver.snapshot().get("ui"),
            Some(&CapabilityStatus::Unresolved)
        );
        assert!(resolver.get("ui").is_none());
        assert_eq!(loader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_first_candidate_success() {
        let loader = Arc::new(MockLoader::new().succeed("js/modules/ui.js"));
        let catalog = Catalog::new().with("ui", CapabilitySpec::at("js/modules/ui.js"));
        let resolver = resolver(&loader, catalog);

        let status = resolver.resolve("ui").await.unwrap();
        assert_eq!(status, CapabilityStatus::Loaded);

        let entry = resolver.entry("ui").unwrap();
        assert_eq!(entry.attempts().len(), 1);
        assert!(entry.attempts()[0].outcome.is_success());
        assert!(!resolver.get("ui").unwrap().is_fallback());
    }

    #[tokio::test]
    async fn test_first_success_wins_after_failures() {
        let loader = Arc::new(
            MockLoader::new()
                .fail("Modules/OrgChart.js", FailureReason::NetworkError)
                .fail("modules/orgChart.js", FailureReason::NotFound)
                .succeed("modules/OrgChart.js")
                .succeed("Modules/orgChart.js"),
        );
        let catalog =
            Catalog::new().with("orgChart", CapabilitySpec::at("Modules/OrgChart.js"));
        let resolver = Resolver::builder(Arc::clone(&loader) as Arc<dyn Loader>)
            .catalog(catalog)
            .config(fast_config())
            .build()
            .unwrap();

        let status = resolver.resolve("orgChart").await.unwrap();
        assert_eq!(status, CapabilityStatus::Loaded);

        let entry = resolver.entry("orgchart").unwrap();
        let log: Vec<_> = entry.attempts().iter().map(|a| a.pair()).collect();
        assert_eq!(
            log,
            vec![
                (
                    "Modules/OrgChart.js",
                    AttemptOutcome::Failure(FailureReason::NetworkError)
                ),
                (
                    "modules/orgChart.js",
                    AttemptOutcome::Failure(FailureReason::NotFound)
                ),
                ("modules/OrgChart.js", AttemptOutcome::Success),
            ]
        );
        assert_eq!(
            loader.calls(),
            vec!["Modules/OrgChart.js", "modules/orgChart.js", "modules/OrgChart.js"]
        );
    }

    #[tokio::test]
    async fn test_fallback_installed_and_retried_once() {
        let loader = Arc::new(MockLoader::new().fail("core/config.js", FailureReason::NotFound));
        let fallback = config_fallback();
        let catalog = Catalog::new().with(
            "config",
            CapabilitySpec::at("core/config.js").with_fallback(fallback.clone()),
        );
        let resolver = resolver(&loader, catalog);

        let status = resolver.resolve("config").await.unwrap();
        assert_eq!(status, CapabilityStatus::Fallback);
        assert!(resolver.get("config").unwrap().ptr_eq(&fallback));

        // A second request is a no-op and schedules nothing new.
        resolver.resolve("config").await.unwrap();
        resolver.settle().await;

        let entry = resolver.entry("config").unwrap();
        let log: Vec<_> = entry.attempts().iter().map(|a| a.pair()).collect();
        assert_eq!(
            log,
            vec![("core/config.js", AttemptOutcome::Failure(FailureReason::NotFound))]
        );
        assert!(matches!(
            entry.background_retry(),
            BackgroundRetry::Failed { location, reason: FailureReason::NotFound }
                if location == "core/config.js"
        ));
        // One regular attempt plus exactly one background retry.
        assert_eq!(loader.calls(), vec!["core/config.js", "core/config.js"]);
        assert_eq!(resolver.status("config"), CapabilityStatus::Fallback);
    }

    #[tokio::test]
    async fn test_background_retry_swaps_in_real_implementation() {
        let loader = Arc::new(
            MockLoader::new()
                .fail("core/config.js", FailureReason::NetworkError)
                .succeed("public/core/config.js"),
        );
        let catalog = Catalog::new().with(
            "config",
            CapabilitySpec::at("core/config.js").with_fallback(config_fallback()),
        );
        let mut config = fast_config();
        config.document_base = "public/index.html".to_string();
        let resolver = Resolver::builder(Arc::clone(&loader) as Arc<dyn Loader>)
            .catalog(catalog)
            .normalizer(PathNormalizer::exact())
            .config(config)
            .build()
            .unwrap();
        let seen = recorder(&resolver, "config");

        assert_eq!(
            resolver.resolve("config").await.unwrap(),
            CapabilityStatus::Fallback
        );
        resolver.settle().await;

        assert_eq!(resolver.status("config"), CapabilityStatus::Loaded);
        let imp = resolver.get("config").unwrap();
        assert!(!imp.is_fallback());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (CapabilityStatus::Unresolved, CapabilityStatus::Resolving),
                (CapabilityStatus::Resolving, CapabilityStatus::Fallback),
                (CapabilityStatus::Fallback, CapabilityStatus::Loaded),
            ]
        );
        // The retry is not part of the candidate log.
        assert_eq!(resolver.entry("config").unwrap().attempts().len(), 1);
    }

    #[tokio::test]
    async fn test_finished_retries_are_pruned() {
        let loader = Arc::new(MockLoader::new());
        let catalog = Catalog::new()
            .with("config", CapabilitySpec::at("core/config.js").with_fallback(config_fallback()))
            .with("ui", CapabilitySpec::at("js/modules/ui.js").with_fallback(config_fallback()));
        let resolver = resolver(&loader, catalog);
        let held = || resolver.shared.background.lock().unwrap().len();

        resolver.resolve("config").await.unwrap();
        while resolver.pending_retries() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(held(), 1);

        // Scheduling the next retry drops the finished handle.
        resolver.resolve("ui").await.unwrap();
        assert_eq!(held(), 1);

        resolver.settle().await;
        assert_eq!(held(), 0);
        assert_eq!(loader.call_count(), 4);
    }

    #[tokio::test]
    async fn test_no_fallback_fails() {
        let loader = Arc::new(MockLoader::new());
        let catalog = Catalog::new().with("ui", CapabilitySpec::at("js/modules/ui.js"));
        let resolver = resolver(&loader, catalog);

        let err = resolver.resolve("ui").await.unwrap_err();
        assert!(matches!(err, ResolveError::NoFallbackAvailable { .. }));
        assert_eq!(resolver.status("ui"), CapabilityStatus::Failed);
        assert!(resolver.get("ui").is_none());

        // Failed is terminal: asking again reports the same error without loading.
        let again = resolver.resolve("ui").await.unwrap_err();
        assert!(matches!(again, ResolveError::NoFallbackAvailable { ref attempts, .. } if attempts.len() == 1));
        assert_eq!(loader.call_count(), 1);
        assert_eq!(resolver.pending_retries(), 0);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let loader = Arc::new(MockLoader::new().succeed("js/modules/ui.js"));
        let catalog = Catalog::new().with("ui", CapabilitySpec::at("js/modules/ui.js"));
        let resolver = resolver(&loader, catalog);

        resolver.resolve("ui").await.unwrap();
        resolver.resolve("UI").await.unwrap();

        assert_eq!(loader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_force_reload_restarts() {
        let loader = Arc::new(MockLoader::new().succeed("js/modules/ui.js"));
        let catalog = Catalog::new().with("ui", CapabilitySpec::at("js/modules/ui.js"));
        let resolver = resolver(&loader, catalog);
        let seen = recorder(&resolver, "ui");

        resolver.resolve("ui").await.unwrap();
        let before = resolver.get("ui").unwrap();
        let status = resolver
            .resolve_with("ui", None, ResolveOptions::force())
            .await
            .unwrap();

        assert_eq!(status, CapabilityStatus::Loaded);
        assert_eq!(loader.call_count(), 2);
        let entry = resolver.entry("ui").unwrap();
        assert_eq!(entry.attempts().len(), 1);
        assert_eq!(entry.generation(), 1);
        assert!(!before.ptr_eq(&resolver.get("ui").unwrap()));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (CapabilityStatus::Unresolved, CapabilityStatus::Resolving),
                (CapabilityStatus::Resolving, CapabilityStatus::Loaded),
                (CapabilityStatus::Loaded, CapabilityStatus::Unresolved),
                (CapabilityStatus::Unresolved, CapabilityStatus::Resolving),
                (CapabilityStatus::Resolving, CapabilityStatus::Loaded),
            ]
        );
    }

    #[tokio::test]
    async fn test_dependency_resolves_first() {
        let loader = Arc::new(
            MockLoader::new()
                .succeed("js/core/config.js")
                .succeed("js/modules/ui.js")
                .with_delay(Duration::from_millis(20)),
        );
        let catalog = Catalog::new()
            .with("config", CapabilitySpec::at("js/core/config.js"))
            .with("ui", CapabilitySpec::at("js/modules/ui.js").depends_on("config"));
        let resolver = resolver(&loader, catalog);

        let config_status = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&config_status);
        let observer = resolver.clone();
        resolver.on_status_change("ui", move |change| {
            if change.to == CapabilityStatus::Resolving {
                *sink.lock().unwrap() = Some(observer.status("config"));
            }
        });

        let (ui, config) = tokio::join!(resolver.resolve("ui"), resolver.resolve("config"));
        assert_eq!(ui.unwrap(), CapabilityStatus::Loaded);
        assert_eq!(config.unwrap(), CapabilityStatus::Loaded);

        assert_eq!(loader.calls(), vec!["js/core/config.js", "js/modules/ui.js"]);
        assert_eq!(*config_status.lock().unwrap(), Some(CapabilityStatus::Loaded));
    }

    #[tokio::test]
    async fn test_failed_dependency_does_not_block_dependent() {
        let loader = Arc::new(MockLoader::new().succeed("js/modules/ui.js"));
        let catalog = Catalog::new()
            .with("config", CapabilitySpec::at("js/core/config.js"))
            .with("ui", CapabilitySpec::at("js/modules/ui.js").depends_on("config"));
        let resolver = resolver(&loader, catalog);

        assert_eq!(resolver.resolve("ui").await.unwrap(), CapabilityStatus::Loaded);
        assert_eq!(resolver.status("config"), CapabilityStatus::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_requests_load_once() {
        let loader = Arc::new(
            MockLoader::new()
                .succeed("js/modules/ui.js")
                .with_delay(Duration::from_millis(20)),
        );
        let catalog = Catalog::new().with("ui", CapabilitySpec::at("js/modules/ui.js"));
        let resolver = resolver(&loader, catalog);

        let (a, b) = tokio::join!(resolver.resolve("ui"), resolver.resolve("ui"));
        assert_eq!(a.unwrap(), CapabilityStatus::Loaded);
        assert_eq!(b.unwrap(), CapabilityStatus::Loaded);
        assert_eq!(loader.call_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_load_times_out() {
        let loader = Arc::new(
            MockLoader::new()
                .hang("js/modules/ui.js")
                .succeed("/js/modules/ui.js"),
        );
        let catalog = Catalog::new().with("ui", CapabilitySpec::at("js/modules/ui.js"));
        let mut config = fast_config();
        config.load_timeout = Duration::from_millis(50);
        let resolver = Resolver::builder(Arc::clone(&loader) as Arc<dyn Loader>)
            .catalog(catalog)
            .normalizer(PathNormalizer::default().with_cache_bust(None))
            .config(config)
            .build()
            .unwrap();

        assert_eq!(resolver.resolve("ui").await.unwrap(), CapabilityStatus::Loaded);
        let entry = resolver.entry("ui").unwrap();
        let log: Vec<_> = entry.attempts().iter().map(|a| a.pair()).collect();
        assert_eq!(
            log,
            vec![
                ("js/modules/ui.js", AttemptOutcome::Failure(FailureReason::TimedOut)),
                ("modules/ui.js", AttemptOutcome::Failure(FailureReason::NetworkError)),
                ("/js/modules/ui.js", AttemptOutcome::Success),
            ]
        );
    }

    #[tokio::test]
    async fn test_caller_fallback_overrides_catalog() {
        let loader = Arc::new(MockLoader::new());
        let catalog = Catalog::new().with(
            "config",
            CapabilitySpec::at("core/config.js").with_fallback(config_fallback()),
        );
        let resolver = resolver(&loader, catalog);
        let mine = Implementation::fallback(toml::Table::new());

        resolver
            .resolve_with("config", Some(mine.clone()), ResolveOptions::default())
            .await
            .unwrap();
        assert!(resolver.get("config").unwrap().ptr_eq(&mine));
    }

    #[tokio::test]
    async fn test_undeclared_name_uses_name_as_location() {
        let loader = Arc::new(MockLoader::new().succeed("planning"));
        let resolver = resolver(&loader, Catalog::new());

        assert_eq!(
            resolver.resolve("planning").await.unwrap(),
            CapabilityStatus::Loaded
        );
        assert_eq!(loader.calls(), vec!["planning"]);
    }

    #[tokio::test]
    async fn test_undeclared_name_keeps_caller_spelling() {
        let loader = Arc::new(MockLoader::new().succeed("orgChart"));
        let resolver = Resolver::builder(Arc::clone(&loader) as Arc<dyn Loader>)
            .config(fast_config())
            .build()
            .unwrap();

        assert_eq!(
            resolver.resolve("orgChart").await.unwrap(),
            CapabilityStatus::Loaded
        );
        assert_eq!(loader.calls(), vec!["orgChart"]);
        assert_eq!(resolver.status("orgchart"), CapabilityStatus::Loaded);
    }

    #[tokio::test]
    async fn test_static_modules_end_to_end() {
        use crate::loader::StaticLoader;
        use crate::test_support::module_defining;

        let loader = Arc::new(
            StaticLoader::new()
                .with_module("Modules/OrgChart.js", module_defining("orgChartView"))
                .with_module("modules/orgChart.js", module_defining("orgChart")),
        );
        let catalog =
            Catalog::new().with("orgChart", CapabilitySpec::at("Modules/OrgChart.js"));
        let resolver = Resolver::builder(Arc::clone(&loader) as Arc<dyn Loader>)
            .catalog(catalog)
            .config(fast_config())
            .build()
            .unwrap();

        assert_eq!(
            resolver.resolve("orgChart").await.unwrap(),
            CapabilityStatus::Loaded
        );

        let entry = resolver.entry("orgChart").unwrap();
        let log: Vec<_> = entry.attempts().iter().map(|a| a.pair()).collect();
        assert_eq!(
            log,
            vec![
                ("Modules/OrgChart.js", AttemptOutcome::Failure(FailureReason::NotFound)),
                ("modules/orgChart.js", AttemptOutcome::Success),
            ]
        );
        let imp = resolver.get("orgchart").unwrap();
        assert_eq!(imp.lookup("label").and_then(|v| v.as_str()), Some("orgChart"));
        assert_eq!(
            loader.executed(),
            vec!["Modules/OrgChart.js", "modules/orgChart.js"]
        );
    }

    #[test]
    fn test_invalid_catalog_rejected() {
        let loader: Arc<dyn Loader> = Arc::new(MockLoader::new());
        let catalog = Catalog::new().with("ui", CapabilitySpec::default().depends_on("config"));

        assert!(matches!(
            Resolver::new(loader, catalog),
            Err(ResolveError::UnknownDependency { .. })
        ));
    }
}
