//! Core data structures for Capstan.
//!
//! This module contains the capability data model:
//! - Canonical capability names
//! - Status, attempt log and background-retry bookkeeping
//! - Implementation handles
//! - Registry entries and the registry itself

pub mod entry;
pub mod implementation;
pub mod name;
pub mod registry;
pub mod status;

pub use entry::{CapabilityEntry, Transition};
pub use implementation::{Implementation, ImplementationSource};
pub use name::CapabilityName;
pub use registry::Registry;
pub use status::{AttemptOutcome, AttemptRecord, BackgroundRetry, CapabilityStatus, FailureReason};
