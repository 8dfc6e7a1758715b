//! Test fixtures for common resolution scenarios.
//!
//! The dashboard fixture mirrors a small single-page app: a `config` core
//! module, a `ui` module that needs it, and a handful of feature modules.

use std::path::Path;
use std::time::Duration;

use crate::core::Implementation;
use crate::resolver::catalog::{Catalog, CapabilitySpec};
use crate::resolver::ResolverConfig;

/// Resolver config without settle delay and with a short timeout.
pub fn fast_config() -> ResolverConfig {
    ResolverConfig {
        load_timeout: Duration::from_millis(500),
        settle_delay: Duration::ZERO,
        background_retry: true,
        document_base: String::new(),
    }
}

/// Built-in stand-in for `config`.
pub fn config_fallback() -> Implementation {
    let mut exports = toml::Table::new();
    let mut app = toml::Table::new();
    app.insert("name".into(), toml::Value::String("Dashboard".into()));
    app.insert("version".into(), toml::Value::String("fallback".into()));
    exports.insert("app".into(), toml::Value::Table(app));
    Implementation::fallback(exports)
}

/// The dashboard catalog: `config` (with fallback) <- `ui` <- `orgChart`.
pub fn dashboard_catalog() -> Catalog {
    Catalog::new()
        .with(
            "config",
            CapabilitySpec::at("js/core/config.js").with_fallback(config_fallback()),
        )
        .with("ui", CapabilitySpec::at("js/modules/ui.js").depends_on("config"))
        .with(
            "orgChart",
            CapabilitySpec::at("Modules/OrgChart.js")
                .depends_on("ui")
                .depends_on("config"),
        )
}

/// Module text defining a single global with one string export.
pub fn module_defining(name: &str) -> String {
    format!(
        r#"defines = ["{name}"]

[exports.{name}]
label = "{name}"
"#
    )
}

/// Module text that throws on initialization.
pub fn module_throwing(message: &str) -> String {
    format!("defines = []\nerror = \"{message}\"\n")
}

/// Write a module file under `root`, creating parent directories.
pub fn write_module(root: &Path, location: &str, text: &str) {
    let path = root.join(location);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

/// Write the dashboard's module files, with `orgChart` at its lower-case path.
pub fn write_dashboard(root: &Path) {
    write_module(root, "js/core/config.js", &module_defining("config"));
    write_module(root, "js/modules/ui.js", &module_defining("ui"));
    write_module(root, "modules/orgChart.js", &module_defining("orgChart"));
}
