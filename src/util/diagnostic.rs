//! User-facing diagnostic messages.
//!
//! Every error shown to a user carries what went wrong, the locations that
//! were tried, and what to change.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages.
pub mod suggestions {
    /// No catalog entries were configured.
    pub const EMPTY_CATALOG: &str =
        "help: Declare capabilities under [capabilities.<name>] in .capstan/config.toml";

    /// Some capability ended up `Failed`.
    pub const RESOLVE_FAILED: &str = "help: Run `capstan diagnose` to see every attempted location";

    /// A module path looks wrong.
    pub const CHECK_CANDIDATES: &str =
        "help: Run `capstan candidates <location>` to see which paths are tried";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl Severity {
    fn label(self, color: bool) -> &'static str {
        match (self, color) {
            (Severity::Error, true) => "\x1b[1;31merror\x1b[0m",
            (Severity::Warning, true) => "\x1b[1;33mwarning\x1b[0m",
            (Severity::Note, true) => "\x1b[1;36mnote\x1b[0m",
            (Severity::Error, false) => "error",
            (Severity::Warning, false) => "warning",
            (Severity::Note, false) => "note",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label(false))
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related file
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    fn with_severity(message: impl Into<String>, severity: Severity) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Error)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Warning)
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::with_severity(message, Severity::Note)
    }

    /// Add a context line.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggested fix.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Attach the file the diagnostic is about.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = format!("{}: {}\n", self.severity.label(color), self.message);

        if let Some(path) = &self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  -> {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            let help = if color { "\x1b[1;32mhelp\x1b[0m" } else { "help" };
            output.push_str(&format!("\n{}: consider:\n", help));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
