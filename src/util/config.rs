//! Configuration file support for capstan.
//!
//! Two locations are read:
//! - Global: `~/.capstan/config.toml` - user-wide defaults
//! - Project: `.capstan/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config.
//!
//! ```toml
//! [resolver]
//! load_timeout_ms = 5000
//! settle_delay_ms = 100
//! document_base = "index.html"
//!
//! [normalizer]
//! cache_bust = "retry"
//! extra_rules = [{ from = "Lib/", to = "lib/" }]
//!
//! [capabilities.config]
//! location = "js/core/config.js"
//! [capabilities.config.fallback]
//! app = { name = "Dashboard" }
//! ```

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::{CapabilityName, Implementation};
use crate::resolver::normalize::{AliasRule, PathNormalizer, DEFAULT_CACHE_BUST};
use crate::resolver::{CapabilitySpec, Catalog, ResolverConfig};

/// Capstan configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolver tuning
    pub resolver: ResolverSettings,

    /// Candidate generation
    pub normalizer: NormalizerSettings,

    /// Declared capabilities by name
    #[serde(deserialize_with = "capabilities_by_name")]
    pub capabilities: BTreeMap<CapabilityName, CapabilityConfig>,
}

/// `[capabilities.*]` keyed case-insensitively. Two spellings of the same
/// name in one file are rejected.
fn capabilities_by_name<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<CapabilityName, CapabilityConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, CapabilityConfig>::deserialize(deserializer)?;
    let mut capabilities = BTreeMap::new();

    for (key, capability) in raw {
        match capabilities.entry(CapabilityName::new(&key)) {
            Entry::Occupied(existing) => {
                return Err(D::Error::custom(format!(
                    "capability `{}` is declared more than once (`{}` and `{}`)",
                    existing.key(),
                    existing.key().original(),
                    key
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(capability);
            }
        }
    }

    Ok(capabilities)
}

/// `[resolver]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Per-attempt timeout in milliseconds
    pub load_timeout_ms: Option<u64>,

    /// Delay after a successful load, in milliseconds
    pub settle_delay_ms: Option<u64>,

    /// Schedule one background retry for degraded capabilities
    pub background_retry: Option<bool>,

    /// Location of the hosting document
    pub document_base: Option<String>,

    /// Capability resolved before everything else ("" disables)
    pub prerequisite: Option<String>,
}

/// `[normalizer]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSettings {
    /// Cache-busting token ("" disables the variant)
    pub cache_bust: Option<String>,

    /// Emit the generic `src/`/`js/`/slash/cache-bust variants
    pub generic_fallbacks: Option<bool>,

    /// Prefix corrections added to the built-in table
    pub extra_rules: Vec<AliasRule>,

    /// File names added to the known-casing table
    pub extra_names: Vec<String>,
}

/// `[capabilities.<name>]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Base location (defaults to the capability name)
    pub location: Option<String>,

    /// Capabilities that must be resolved first
    pub depends_on: Vec<String>,

    /// Export table of the stand-in implementation
    pub fallback: Option<toml::Table>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Capabilities are replaced per name; extra rules and names accumulate.
    pub fn merge(&mut self, other: Config) {
        let Config {
            resolver,
            normalizer,
            capabilities,
        } = other;

        if resolver.load_timeout_ms.is_some() {
            self.resolver.load_timeout_ms = resolver.load_timeout_ms;
        }
        if resolver.settle_delay_ms.is_some() {
            self.resolver.settle_delay_ms = resolver.settle_delay_ms;
        }
        if resolver.background_retry.is_some() {
            self.resolver.background_retry = resolver.background_retry;
        }
        if resolver.document_base.is_some() {
            self.resolver.document_base = resolver.document_base;
        }
        if resolver.prerequisite.is_some() {
            self.resolver.prerequisite = resolver.prerequisite;
        }

        if normalizer.cache_bust.is_some() {
            self.normalizer.cache_bust = normalizer.cache_bust;
        }
        if normalizer.generic_fallbacks.is_some() {
            self.normalizer.generic_fallbacks = normalizer.generic_fallbacks;
        }
        self.normalizer.extra_rules.extend(normalizer.extra_rules);
        self.normalizer.extra_names.extend(normalizer.extra_names);

        self.capabilities.extend(capabilities);
    }

    /// Resolver tuning with defaults filled in.
    pub fn resolver_config(&self) -> ResolverConfig {
        let defaults = ResolverConfig::default();
        let settings = &self.resolver;

        ResolverConfig {
            load_timeout: settings
                .load_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.load_timeout),
            settle_delay: settings
                .settle_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            background_retry: settings
                .background_retry
                .unwrap_or(defaults.background_retry),
            document_base: settings
                .document_base
                .clone()
                .unwrap_or(defaults.document_base),
        }
    }

    /// Capability resolved first; `config` unless overridden.
    pub fn prerequisite(&self) -> Option<CapabilityName> {
        match self.resolver.prerequisite.as_deref() {
            None => Some(CapabilityName::new("config")),
            Some(name) if name.trim().is_empty() => None,
            Some(name) => Some(CapabilityName::new(name)),
        }
    }

    /// Built-in normalizer extended with the configured tables.
    pub fn normalizer(&self) -> PathNormalizer {
        let settings = &self.normalizer;
        let cache_bust = match settings.cache_bust.as_deref() {
            None => Some(DEFAULT_CACHE_BUST.to_string()),
            Some("") => None,
            Some(token) => Some(token.to_string()),
        };

        let mut normalizer = PathNormalizer::default()
            .with_cache_bust(cache_bust)
            .with_generic_fallbacks(settings.generic_fallbacks.unwrap_or(true));
        for rule in &settings.extra_rules {
            normalizer = normalizer.with_rule(rule.clone());
        }
        for name in &settings.extra_names {
            normalizer = normalizer.with_known_name(name.clone());
        }
        normalizer
    }

    /// Catalog of the declared capabilities.
    pub fn catalog(&self) -> Catalog {
        let mut catalog = Catalog::new();

        for (name, capability) in &self.capabilities {
            let mut spec = CapabilitySpec {
                location: capability.location.clone(),
                ..Default::default()
            };
            for dep in &capability.depends_on {
                spec = spec.depends_on(dep.as_str());
            }
            if let Some(fallback) = &capability.fallback {
                spec = spec.with_fallback(Implementation::fallback(fallback.clone()));
            }
            catalog.insert(name.clone(), spec);
        }

        catalog
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.capstan/config.toml)
/// 2. Global config (~/.capstan/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global capstan config directory (~/.capstan).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".capstan"))
}

/// Get the global config path (~/.capstan/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.capstan/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".capstan").join("config.toml")
}
