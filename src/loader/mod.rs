//! Resource loaders.
//!
//! A loader fetches one resource, executes it in the shared execution
//! context, and reports whether the requested capability is now defined.
//! Loaders never deduplicate: every call executes the resource again.
//! Callers that care about repeats track their own attempts.

pub mod context;
pub mod manifest;
pub mod memory;

pub use context::{ExecutionContext, ModuleManifest};
pub use manifest::ManifestLoader;
pub use memory::StaticLoader;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{CapabilityName, FailureReason, Implementation};

/// A single load request.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Capability expected to be defined by the resource
    pub capability: &'a CapabilityName,
    /// Resource identifier to fetch
    pub location: &'a str,
}

impl<'a> LoadRequest<'a> {
    pub fn new(capability: &'a CapabilityName, location: &'a str) -> Self {
        LoadRequest {
            capability,
            location,
        }
    }
}

/// A failed load, normalized into a reason code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {detail}")]
pub struct LoadFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl LoadFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        LoadFailure {
            reason,
            detail: detail.into(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::NetworkError, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::NotFound, detail)
    }

    pub fn execution(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::ExecutionError, detail)
    }
}

/// Something that can fetch and execute a resource.
///
/// Implementations must not panic on bad input: unreachable resources,
/// malformed content and initialization errors are all reported as a
/// [`LoadFailure`].
#[async_trait]
pub trait Loader: Send + Sync {
    /// Loader name for display.
    fn name(&self) -> &str;

    /// Fetch and execute `request.location`, then probe for `request.capability`.
    async fn load(&self, request: &LoadRequest<'_>) -> Result<Implementation, LoadFailure>;
}

/// Key a location maps to: query/fragment and leading slashes removed.
///
/// `/js/core/config.js?v=retry` and `js/core/config.js` name the same resource.
pub fn resource_key(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    location[..end].trim_start_matches('/')
}
