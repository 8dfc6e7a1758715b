//! Capstan - a capability resolver with path repair and fallbacks
//!
//! Given a capability name, capstan tries the locations it may live at,
//! repairs common path mistakes, installs a stand-in when nothing works and
//! keeps a registry of which capabilities are real and which are degraded.

pub mod core;
pub mod loader;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities and mocks for capstan unit tests.
///
/// Only compiled for tests. Provides a scripted loader and dashboard
/// fixtures.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{CapabilityName, CapabilityStatus, Implementation, Registry};
pub use crate::loader::{Loader, ManifestLoader, StaticLoader};
pub use crate::resolver::{Catalog, CapabilitySpec, PathNormalizer, ResolveError, Resolver};
