//! Path normalization - candidate locations for a resource identifier.
//!
//! Given the location a capability is expected at, the normalizer produces
//! the ordered list of alternates worth trying. It is driven by a fixed
//! rule table, never by scanning what happens to be loaded:
//!
//! 1. The original identifier.
//! 2. Directory-prefix corrections (`Modules/` -> `modules/`), longest
//!    matched prefix first, each with and without file-name casing fixes.
//! 3. File-name casing fixes on the original (`orgchart.js` -> `orgChart.js`).
//! 4. Generic fallbacks: `src/` and `js/` stripped, leading slash toggled,
//!    and a cache-busted variant.
//!
//! The output never contains duplicates and its length is bounded by the
//! rule table.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::CapabilityName;
use crate::loader::resource_key;

/// Base used to resolve document-relative references.
const DOCUMENT_ORIGIN: &str = "http://document.invalid/";

/// Default cache-busting token.
pub const DEFAULT_CACHE_BUST: &str = "retry";

/// A directory-prefix correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    /// Prefix as it may appear (matched case-sensitively)
    pub from: String,
    /// Prefix it should be
    pub to: String,
}

impl AliasRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        AliasRule {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Known directory-prefix corrections.
pub fn default_rules() -> Vec<AliasRule> {
    vec![
        AliasRule::new("Modules/", "modules/"),
        AliasRule::new("Core/", "core/"),
        AliasRule::new("JS/", "js/"),
        AliasRule::new("src/js/", "js/"),
        AliasRule::new("src/css/", "css/"),
        AliasRule::new("src/img/", "img/"),
    ]
}

/// File names whose casing is known.
pub fn default_known_names() -> Vec<String> {
    [
        "config.js",
        "app.js",
        "data.js",
        "ui.js",
        "orgChart.js",
        "raciMatrix.js",
        "skillsMatrix.js",
        "teamBuilder.js",
        "personnel.js",
        "gapAnalysis.js",
        "planning.js",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Maps a resource identifier to the ordered candidates to try.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    rules: Vec<AliasRule>,
    known_names: Vec<String>,
    cache_bust: Option<String>,
    generic_fallbacks: bool,
}

impl Default for PathNormalizer {
    fn default() -> Self {
        PathNormalizer {
            rules: default_rules(),
            known_names: default_known_names(),
            cache_bust: Some(DEFAULT_CACHE_BUST.to_string()),
            generic_fallbacks: true,
        }
    }
}

/// Order-preserving, duplicate-free candidate list.
#[derive(Default)]
struct CandidateList {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl CandidateList {
    fn push(&mut self, candidate: impl Into<String>) {
        let candidate = candidate.into();
        if candidate.is_empty() || self.seen.contains(&candidate) {
            return;
        }
        self.seen.insert(candidate.clone());
        self.items.push(candidate);
    }
}

impl PathNormalizer {
    /// Normalizer with explicit tables.
    pub fn new(rules: Vec<AliasRule>, known_names: Vec<String>, cache_bust: Option<String>) -> Self {
        PathNormalizer {
            rules,
            known_names,
            cache_bust,
            generic_fallbacks: true,
        }
    }

    /// Normalizer that only ever yields the identifier it is given.
    pub fn exact() -> Self {
        PathNormalizer {
            rules: Vec::new(),
            known_names: Vec::new(),
            cache_bust: None,
            generic_fallbacks: false,
        }
    }

    /// Enable or disable the generic fallback variants (step 4).
    pub fn with_generic_fallbacks(mut self, enabled: bool) -> Self {
        self.generic_fallbacks = enabled;
        self
    }

    /// Add a prefix rule.
    pub fn with_rule(mut self, rule: AliasRule) -> Self {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
        self
    }

    /// Add a known file name.
    pub fn with_known_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.known_names.contains(&name) {
            self.known_names.push(name);
        }
        self
    }

    /// Set or clear the cache-busting token.
    pub fn with_cache_bust(mut self, token: Option<String>) -> Self {
        self.cache_bust = token;
        self
    }

    pub fn rules(&self) -> &[AliasRule] {
        &self.rules
    }

    /// Ordered, de-duplicated candidates for `base`.
    pub fn candidates(&self, base: &str) -> Vec<String> {
        let base = base.trim();
        let mut list = CandidateList::default();
        if base.is_empty() {
            return list.items;
        }

        list.push(base);

        // Longest matched prefix first; ties keep table order.
        let mut matching: Vec<&AliasRule> = self
            .rules
            .iter()
            .filter(|rule| !rule.from.is_empty() && base.starts_with(rule.from.as_str()))
            .collect();
        matching.sort_by(|a, b| b.from.len().cmp(&a.from.len()));

        for rule in matching {
            let corrected = format!("{}{}", rule.to, &base[rule.from.len()..]);
            if let Some(fixed) = self.fix_file_name(&corrected) {
                list.push(fixed);
            }
            list.push(corrected);
        }

        if let Some(fixed) = self.fix_file_name(base) {
            list.push(fixed);
        }

        if !self.generic_fallbacks {
            return list.items;
        }

        if let Some(rest) = base.strip_prefix("src/") {
            list.push(rest);
        }
        if let Some(rest) = base.strip_prefix("js/") {
            list.push(rest);
        }
        match base.strip_prefix('/') {
            Some(rest) => list.push(rest),
            None => list.push(format!("/{}", base)),
        }
        if let Some(token) = &self.cache_bust {
            let separator = if base.contains('?') { '&' } else { '?' };
            list.push(format!("{}{}v={}", base, separator, token));
        }

        list.items
    }

    /// Rewrite the last path segment to its known casing, if it differs.
    fn fix_file_name(&self, path: &str) -> Option<String> {
        let (dir, file) = match path.rfind('/') {
            Some(idx) => path.split_at(idx + 1),
            None => ("", path),
        };

        self.known_names
            .iter()
            .find(|known| known.eq_ignore_ascii_case(file) && known.as_str() != file)
            .map(|known| format!("{}{}", dir, known))
    }
}

/// Resolve `location` relative to the directory of `document`.
///
/// `rebase("public/index.html", "core/config.js") == "public/core/config.js"`.
/// Absolute URLs pass through unchanged; anything unparsable is returned as is.
pub fn rebase(document: &str, location: &str) -> String {
    let resolved = Url::parse(DOCUMENT_ORIGIN)
        .and_then(|origin| origin.join(document))
        .and_then(|doc| doc.join(location));

    let url = match resolved {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("cannot rebase `{}` on `{}`: {}", location, document, e);
            return location.to_string();
        }
    };

    if url.host_str() != Some("document.invalid") {
        return url.to_string();
    }

    let mut out = url.path().trim_start_matches('/').to_string();
    if let Some(query) = url.query() {
        out.push('?');
        out.push_str(query);
    }
    out
}

/// Capability name implied by a location's file stem.
///
/// `js/modules/orgChart.js` -> `orgchart`.
pub fn canonical_name(location: &str) -> CapabilityName {
    let key = resource_key(location);
    let file = key.rsplit('/').next().unwrap_or(key);
    let stem = file.split('.').next().unwrap_or(file);
    CapabilityName::new(stem)
}
