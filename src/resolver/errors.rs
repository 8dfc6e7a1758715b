//! Resolution error types and diagnostics.
//!
//! Load failures (`NetworkError`, `NotFound`, `ExecutionError`, `TimedOut`)
//! never show up here: the resolver recovers from them by moving on to the
//! next candidate. What remains is what a caller has to act on.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::{AttemptRecord, CapabilityStatus};
use crate::util::diagnostic::Diagnostic;

/// Error surfaced by the resolver.
#[derive(Debug, Clone, Error, MietteDiagnostic)]
pub enum ResolveError {
    /// Every candidate failed. Recovered locally when a fallback exists.
    #[error("every candidate for `{capability}` failed")]
    #[diagnostic(code(capstan::resolve::exhausted))]
    ExhaustedCandidates {
        capability: String,
        attempts: Vec<AttemptRecord>,
    },

    /// Every candidate failed and there was no stand-in to install.
    #[error("`{capability}` could not be loaded and has no fallback")]
    #[diagnostic(
        code(capstan::resolve::no_fallback),
        help("register a fallback for `{capability}` or fix one of its locations")
    )]
    NoFallbackAvailable {
        capability: String,
        attempts: Vec<AttemptRecord>,
    },

    #[error("invalid transition for `{capability}`: {from} -> {to}")]
    #[diagnostic(code(capstan::resolve::invalid_transition))]
    InvalidTransition {
        capability: String,
        from: CapabilityStatus,
        to: CapabilityStatus,
    },

    #[error("`{capability}` depends on unknown capability `{dependency}`")]
    #[diagnostic(code(capstan::catalog::unknown_dependency))]
    UnknownDependency {
        capability: String,
        dependency: String,
    },

    #[error("cycle detected in capability dependencies")]
    #[diagnostic(code(capstan::catalog::cycle))]
    DependencyCycle { capabilities: Vec<String> },
}

impl ResolveError {
    /// Capability the error is about, if any.
    pub fn capability(&self) -> Option<&str> {
        match self {
            ResolveError::ExhaustedCandidates { capability, .. }
            | ResolveError::NoFallbackAvailable { capability, .. }
            | ResolveError::InvalidTransition { capability, .. }
            | ResolveError::UnknownDependency { capability, .. } => Some(capability),
            ResolveError::DependencyCycle { .. } => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::ExhaustedCandidates {
                capability,
                attempts,
            } => {
                let mut diag = Diagnostic::warning(format!(
                    "no location for `{}` worked, using its fallback",
                    capability
                ));
                for attempt in attempts {
                    diag = diag.with_context(format!("{} ({})", attempt.location, attempt.outcome));
                }
                diag
            }

            ResolveError::NoFallbackAvailable {
                capability,
                attempts,
            } => {
                let mut diag =
                    Diagnostic::error(format!("could not load `{}`", capability));

                if attempts.is_empty() {
                    diag = diag.with_context("no candidate locations were produced");
                }
                for attempt in attempts {
                    let detail = attempt.detail.as_deref().unwrap_or("");
                    diag = diag.with_context(format!(
                        "{} ({}) {}",
                        attempt.location, attempt.outcome, detail
                    ).trim_end().to_string());
                }

                diag.with_suggestion(format!(
                    "Declare a fallback under [capabilities.{}.fallback]",
                    capability
                ))
                .with_suggestion("Check that the module file exists and defines the capability")
            }

            ResolveError::InvalidTransition {
                capability,
                from,
                to,
            } => Diagnostic::error(format!(
                "`{}` cannot move from {} to {}",
                capability, from, to
            ))
            .with_suggestion("Reset the capability with a forced reload"),

            ResolveError::UnknownDependency {
                capability,
                dependency,
            } => Diagnostic::error(format!(
                "`{}` depends on `{}`, which is not declared",
                capability, dependency
            ))
            .with_suggestion(format!(
                "Add a [capabilities.{}] section or remove the dependency",
                dependency
            )),

            ResolveError::DependencyCycle { capabilities } => {
                Diagnostic::error("cycle detected in capability dependencies")
                    .with_context(format!("cycle: {}", capabilities.join(" -> ")))
                    .with_suggestion("Break the cycle by removing one `depends_on` edge")
            }
        }
    }
}
