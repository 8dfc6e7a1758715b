//! Per-capability registry entries.

use serde::Serialize;

use crate::core::implementation::Implementation;
use crate::core::name::CapabilityName;
use crate::core::status::{AttemptRecord, BackgroundRetry, CapabilityStatus};
use crate::resolver::errors::ResolveError;

/// Everything the registry knows about one capability.
///
/// Invariants held by every mutation:
/// - `Loaded`/`Fallback` have an implementation, `Unresolved`/`Failed` do not.
/// - `attempts` only grows until `reset`.
/// - status moves `Unresolved -> Resolving -> terminal`, never backwards
///   except through `reset`.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityEntry {
    pub(crate) name: CapabilityName,
    pub(crate) status: CapabilityStatus,
    #[serde(skip)]
    pub(crate) implementation: Option<Implementation>,
    pub(crate) attempts: Vec<AttemptRecord>,
    pub(crate) background_retry: BackgroundRetry,
    /// Bumped on every reset so stale background work can be discarded.
    pub(crate) generation: u64,
}

/// A `(from, to)` status change.
pub type Transition = (CapabilityStatus, CapabilityStatus);

impl CapabilityEntry {
    pub(crate) fn new(name: CapabilityName) -> Self {
        CapabilityEntry {
            name,
            status: CapabilityStatus::Unresolved,
            implementation: None,
            attempts: Vec::new(),
            background_retry: BackgroundRetry::NotScheduled,
            generation: 0,
        }
    }

    pub fn name(&self) -> &CapabilityName {
        &self.name
    }

    pub fn status(&self) -> CapabilityStatus {
        self.status
    }

    pub fn implementation(&self) -> Option<&Implementation> {
        self.implementation.as_ref()
    }

    /// Attempt log of the current resolution session, in order.
    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    pub fn background_retry(&self) -> &BackgroundRetry {
        &self.background_retry
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn check(&self, allowed: &[CapabilityStatus], to: CapabilityStatus) -> Result<(), ResolveError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(ResolveError::InvalidTransition {
                capability: self.name.to_string(),
                from: self.status,
                to,
            })
        }
    }

    pub(crate) fn begin(&mut self) -> Result<Transition, ResolveError> {
        self.check(&[CapabilityStatus::Unresolved], CapabilityStatus::Resolving)?;
        self.status = CapabilityStatus::Resolving;
        Ok((CapabilityStatus::Unresolved, CapabilityStatus::Resolving))
    }

    pub(crate) fn record_attempt(&mut self, record: AttemptRecord) -> Result<(), ResolveError> {
        self.check(&[CapabilityStatus::Resolving], CapabilityStatus::Resolving)?;
        self.attempts.push(record);
        Ok(())
    }

    pub(crate) fn finish_loaded(
        &mut self,
        implementation: Implementation,
    ) -> Result<Transition, ResolveError> {
        self.finish(CapabilityStatus::Loaded, Some(implementation))
    }

    pub(crate) fn finish_fallback(
        &mut self,
        implementation: Implementation,
    ) -> Result<Transition, ResolveError> {
        self.finish(CapabilityStatus::Fallback, Some(implementation))
    }

    pub(crate) fn finish_failed(&mut self) -> Result<Transition, ResolveError> {
        self.finish(CapabilityStatus::Failed, None)
    }

    fn finish(
        &mut self,
        to: CapabilityStatus,
        implementation: Option<Implementation>,
    ) -> Result<Transition, ResolveError> {
        self.check(&[CapabilityStatus::Resolving], to)?;
        self.status = to;
        self.implementation = implementation;
        Ok((CapabilityStatus::Resolving, to))
    }

    /// Explicit re-resolution: back to `Unresolved` with an empty log.
    pub(crate) fn reset(&mut self) -> Transition {
        let from = self.status;
        self.status = CapabilityStatus::Unresolved;
        self.implementation = None;
        self.attempts.clear();
        self.background_retry = BackgroundRetry::NotScheduled;
        self.generation += 1;
        (from, CapabilityStatus::Unresolved)
    }

    /// Mark the one background retry as scheduled. Returns false if one
    /// already was, or if the entry is not degraded.
    pub(crate) fn schedule_retry(&mut self, location: impl Into<String>) -> bool {
        if self.status != CapabilityStatus::Fallback || self.background_retry.is_scheduled() {
            return false;
        }
        self.background_retry = BackgroundRetry::Scheduled {
            location: location.into(),
        };
        true
    }

    /// Apply the background retry's outcome.
    ///
    /// Ignored when the entry has been reset since the retry was scheduled.
    /// On success the stand-in is swapped for the real implementation.
    pub(crate) fn complete_retry(
        &mut self,
        generation: u64,
        outcome: Result<Implementation, crate::loader::LoadFailure>,
    ) -> Option<Transition> {
        if generation != self.generation {
            return None;
        }
        let location = match &self.background_retry {
            BackgroundRetry::Scheduled { location } => location.clone(),
            _ => return None,
        };

        match outcome {
            Ok(implementation) if self.status == CapabilityStatus::Fallback => {
                self.implementation = Some(implementation);
                self.status = CapabilityStatus::Loaded;
                self.background_retry = BackgroundRetry::Succeeded { location };
                Some((CapabilityStatus::Fallback, CapabilityStatus::Loaded))
            }
            Ok(_) => {
                self.background_retry = BackgroundRetry::Succeeded { location };
                None
            }
            Err(failure) => {
                self.background_retry = BackgroundRetry::Failed {
                    location,
                    reason: failure.reason,
                };
                None
            }
        }
    }
}
