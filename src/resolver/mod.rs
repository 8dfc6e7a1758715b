//! Capability resolution.
//!
//! The resolver turns a capability name into a terminal status: it walks the
//! normalizer's candidate locations through a [`Loader`](crate::loader::Loader),
//! degrades to a fallback when none works, and records every attempt.
//! Resolution never panics and never propagates a load failure.

pub mod catalog;
pub mod errors;
pub mod events;
pub mod normalize;
pub mod resolve;

pub use catalog::{CapabilitySpec, Catalog};
pub use errors::ResolveError;
pub use events::{StatusChange, StatusHandler, Subscribers};
pub use normalize::{canonical_name, rebase, AliasRule, PathNormalizer};
pub use resolve::{ResolveOptions, Resolver, ResolverBuilder, ResolverConfig};
