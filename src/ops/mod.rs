//! High-level operations.
//!
//! This module contains the implementation of capstan commands.

pub mod bootstrap;
pub mod diagnose;

pub use bootstrap::{bootstrap, dependency_waves, BootstrapOptions, BootstrapReport};
pub use diagnose::{format_report, CapabilityDetail, Diagnostics, DiagnosticsReport, StatusCounts};
