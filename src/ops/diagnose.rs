//! Capability diagnostics.
//!
//! Read-only view over a resolver: which capabilities are real, which run
//! on stand-ins, which are missing, and what was tried for each.
//!
//! ## Output
//!
//! ```text
//! Capability Status
//! =================
//!
//!   [OK] config     Loaded
//!   [~~] orgchart   Using Fallback
//!   [!!] ui         Failed
//!
//! Summary: 1 loaded, 1 using fallback, 1 failed, 0 not checked
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::{
    AttemptOutcome, AttemptRecord, BackgroundRetry, CapabilityName, CapabilityStatus,
};
use crate::resolver::Resolver;

/// Everything known about one capability.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityDetail {
    pub name: CapabilityName,
    pub status: CapabilityStatus,

    /// Badge text
    pub label: &'static str,

    /// Base location the candidates were derived from
    pub location: String,

    /// Attempt log, in order
    pub attempts: Vec<AttemptRecord>,

    pub background_retry: BackgroundRetry,

    /// Where the active implementation came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Top-level export keys of the active implementation
    pub exports: Vec<String>,
}

/// Number of capabilities per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub unresolved: usize,
    pub resolving: usize,
    pub loaded: usize,
    pub fallback: usize,
    pub failed: usize,
}

impl StatusCounts {
    fn add(&mut self, status: CapabilityStatus) {
        match status {
            CapabilityStatus::Unresolved => self.unresolved += 1,
            CapabilityStatus::Resolving => self.resolving += 1,
            CapabilityStatus::Loaded => self.loaded += 1,
            CapabilityStatus::Fallback => self.fallback += 1,
            CapabilityStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.unresolved + self.resolving + self.loaded + self.fallback + self.failed
    }
}

/// Full diagnostics report.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    /// Loader the resolver was built with
    pub loader: String,

    pub counts: StatusCounts,

    /// One entry per capability, sorted by name
    pub capabilities: Vec<CapabilityDetail>,
}

impl DiagnosticsReport {
    pub fn has_failures(&self) -> bool {
        self.counts.failed > 0
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityDetail> {
        let name = CapabilityName::new(name);
        self.capabilities.iter().find(|detail| detail.name == name)
    }
}

/// Diagnostics over a resolver.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostics<'a> {
    resolver: &'a Resolver,
}

impl<'a> Diagnostics<'a> {
    pub fn new(resolver: &'a Resolver) -> Self {
        Diagnostics { resolver }
    }

    /// Status of every declared or requested capability.
    pub fn snapshot(&self) -> BTreeMap<CapabilityName, CapabilityStatus> {
        self.resolver.snapshot()
    }

    /// Status of one capability; unknown names are `Unresolved`.
    pub fn status(&self, name: impl Into<CapabilityName>) -> CapabilityStatus {
        self.resolver.status(name)
    }

    /// Detail for one capability.
    pub fn describe(&self, name: impl Into<CapabilityName>) -> CapabilityDetail {
        let name = name.into();
        let location = self.resolver.catalog().location_for(&name);

        match self.resolver.entry(name.clone()) {
            Some(entry) => {
                let implementation = entry.implementation();
                CapabilityDetail {
                    name,
                    status: entry.status(),
                    label: entry.status().label(),
                    location,
                    attempts: entry.attempts().to_vec(),
                    background_retry: entry.background_retry().clone(),
                    source: implementation.map(|imp| imp.source().to_string()),
                    exports: implementation
                        .map(|imp| imp.export_keys())
                        .unwrap_or_default(),
                }
            }
            None => CapabilityDetail {
                name,
                status: CapabilityStatus::Unresolved,
                label: CapabilityStatus::Unresolved.label(),
                location,
                attempts: Vec::new(),
                background_retry: BackgroundRetry::NotScheduled,
                source: None,
                exports: Vec::new(),
            },
        }
    }

    /// Report over every capability in the snapshot.
    pub fn report(&self) -> DiagnosticsReport {
        let mut counts = StatusCounts::default();
        let capabilities: Vec<CapabilityDetail> = self
            .snapshot()
            .into_keys()
            .map(|name| self.describe(name))
            .collect();

        for detail in &capabilities {
            counts.add(detail.status);
        }

        DiagnosticsReport {
            loader: self.resolver.loader_name().to_string(),
            counts,
            capabilities,
        }
    }
}

fn badge(status: CapabilityStatus) -> &'static str {
    match status {
        CapabilityStatus::Loaded => "[OK]",
        CapabilityStatus::Fallback => "[~~]",
        CapabilityStatus::Failed => "[!!]",
        CapabilityStatus::Unresolved | CapabilityStatus::Resolving => "[..]",
    }
}

fn describe_attempt(attempt: &AttemptRecord) -> String {
    match (&attempt.outcome, attempt.detail.as_deref()) {
        (AttemptOutcome::Success, _) => format!("{}: ok", attempt.location),
        (AttemptOutcome::Failure(reason), Some(detail)) if !detail.is_empty() => {
            format!("{}: {} ({})", attempt.location, reason, detail)
        }
        (AttemptOutcome::Failure(reason), _) => format!("{}: {}", attempt.location, reason),
    }
}

fn describe_retry(retry: &BackgroundRetry) -> Option<String> {
    match retry {
        BackgroundRetry::NotScheduled => None,
        BackgroundRetry::Scheduled { location } => Some(format!("pending ({})", location)),
        BackgroundRetry::Succeeded { location } => Some(format!("loaded from {}", location)),
        BackgroundRetry::Failed { location, reason } => {
            Some(format!("{} ({})", reason, location))
        }
    }
}

/// Render a report as text.
pub fn format_report(report: &DiagnosticsReport, verbose: bool) -> String {
    let mut lines: Vec<String> = vec![
        "Capability Status".to_string(),
        "=================".to_string(),
        String::new(),
    ];

    let width = report
        .capabilities
        .iter()
        .map(|detail| detail.name.as_str().len())
        .max()
        .unwrap_or(0);

    if report.capabilities.is_empty() {
        lines.push("  (no capabilities declared)".to_string());
    }

    for detail in &report.capabilities {
        lines.push(format!(
            "  {} {:<width$}  {}",
            badge(detail.status),
            detail.name.as_str(),
            detail.label,
            width = width
        ));

        if !verbose {
            continue;
        }

        lines.push(format!("      Location: {}", detail.location));
        for attempt in &detail.attempts {
            lines.push(format!("      Tried: {}", describe_attempt(attempt)));
        }
        if let Some(source) = &detail.source {
            lines.push(format!("      Source: {}", source));
        }
        if !detail.exports.is_empty() {
            lines.push(format!("      Properties: {}", detail.exports.join(", ")));
        }
        if let Some(retry) = describe_retry(&detail.background_retry) {
            lines.push(format!("      Background retry: {}", retry));
        }
    }

    let counts = &report.counts;
    lines.push(String::new());
    lines.push(format!(
        "Summary: {} loaded, {} using fallback, {} failed, {} not checked",
        counts.loaded,
        counts.fallback,
        counts.failed,
        counts.unresolved + counts.resolving
    ));

    if counts.failed > 0 {
        lines.push(String::new());
        lines.push(format!(
            "Warning: {} capability(ies) could not be loaded.",
            counts.failed
        ));
    } else if counts.fallback > 0 {
        lines.push(String::new());
        lines.push(format!(
            "All capabilities available. {} running on fallbacks.",
            counts.fallback
        ));
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}
