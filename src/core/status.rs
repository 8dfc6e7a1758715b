//! Capability status and attempt bookkeeping.

use std::fmt;

use serde::Serialize;

/// Lifecycle state of a capability.
///
/// Transitions are strictly `Unresolved -> Resolving -> {Loaded | Fallback | Failed}`.
/// Only an explicit reset returns an entry to `Unresolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityStatus {
    /// Never attempted.
    Unresolved,
    /// An attempt is in flight.
    Resolving,
    /// A genuine implementation is active.
    Loaded,
    /// A stand-in is active because every real candidate failed.
    Fallback,
    /// Nothing could be installed.
    Failed,
}

impl CapabilityStatus {
    /// Terminal states accept no automatic transition.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CapabilityStatus::Loaded | CapabilityStatus::Fallback | CapabilityStatus::Failed
        )
    }

    /// Whether an implementation must be present in this state.
    pub fn has_implementation(self) -> bool {
        matches!(self, CapabilityStatus::Loaded | CapabilityStatus::Fallback)
    }

    /// Badge text shown to users.
    pub fn label(self) -> &'static str {
        match self {
            CapabilityStatus::Unresolved => "Not Checked",
            CapabilityStatus::Resolving => "Checking...",
            CapabilityStatus::Loaded => "Loaded",
            CapabilityStatus::Fallback => "Using Fallback",
            CapabilityStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for CapabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityStatus::Unresolved => write!(f, "unresolved"),
            CapabilityStatus::Resolving => write!(f, "resolving"),
            CapabilityStatus::Loaded => write!(f, "loaded"),
            CapabilityStatus::Fallback => write!(f, "fallback"),
            CapabilityStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Why a single load attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureReason {
    /// The resource could not be reached.
    NetworkError,
    /// The resource ran but did not define the capability.
    NotFound,
    /// The resource threw during initialization.
    ExecutionError,
    /// The attempt exceeded the per-attempt timeout.
    TimedOut,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NetworkError => write!(f, "NetworkError"),
            FailureReason::NotFound => write!(f, "NotFound"),
            FailureReason::ExecutionError => write!(f, "ExecutionError"),
            FailureReason::TimedOut => write!(f, "TimedOut"),
        }
    }
}

/// Outcome of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success,
    Failure(FailureReason),
}

impl AttemptOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success => write!(f, "Success"),
            AttemptOutcome::Failure(reason) => write!(f, "{}", reason),
        }
    }
}

/// One entry of a capability's attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// Location that was tried
    pub location: String,
    /// What happened
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    /// Loader-provided detail for failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AttemptRecord {
    pub fn success(location: impl Into<String>) -> Self {
        AttemptRecord {
            location: location.into(),
            outcome: AttemptOutcome::Success,
            detail: None,
        }
    }

    pub fn failure(
        location: impl Into<String>,
        reason: FailureReason,
        detail: impl Into<String>,
    ) -> Self {
        AttemptRecord {
            location: location.into(),
            outcome: AttemptOutcome::Failure(reason),
            detail: Some(detail.into()),
        }
    }

    /// `(location, outcome)` view used when comparing logs.
    pub fn pair(&self) -> (&str, AttemptOutcome) {
        (self.location.as_str(), self.outcome)
    }
}

/// State of the single background retry a degraded capability gets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum BackgroundRetry {
    #[default]
    NotScheduled,
    Scheduled {
        location: String,
    },
    Succeeded {
        location: String,
    },
    Failed {
        location: String,
        reason: FailureReason,
    },
}

impl BackgroundRetry {
    pub fn is_scheduled(&self) -> bool {
        !matches!(self, BackgroundRetry::NotScheduled)
    }
}
