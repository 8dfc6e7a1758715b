//! Command implementations

pub mod candidates;
pub mod completions;
pub mod diagnose;
pub mod resolve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use capstan::core::CapabilityName;
use capstan::loader::{Loader, ManifestLoader};
use capstan::ops::{bootstrap, BootstrapOptions, Diagnostics, DiagnosticsReport};
use capstan::resolver::Resolver;
use capstan::util::config::{global_config_path, load_config, project_config_path, Config};
use capstan::util::diagnostic::{emit, suggestions, Diagnostic};

use crate::cli::SourceArgs;

/// Explicit `--config` file, or the merged global and project configs.
pub fn load_settings(root: &Path, explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path);
    }

    let project = project_config_path(root);
    let config = match global_config_path() {
        Some(global) => load_config(&global, &project),
        None => Config::load_or_default(&project),
    };
    Ok(config)
}

/// The config file a user should edit: `--config`, else the project file.
pub fn config_file(source: &SourceArgs) -> PathBuf {
    source
        .config
        .clone()
        .unwrap_or_else(|| project_config_path(&source.root))
}

/// Build a resolver over the modules under `source.root`.
pub fn build_resolver(source: &SourceArgs) -> Result<(Resolver, Config)> {
    let config = load_settings(&source.root, source.config.as_deref())?;
    let loader: Arc<dyn Loader> = Arc::new(ManifestLoader::new(&source.root));

    let resolver = Resolver::builder(loader)
        .catalog(config.catalog())
        .normalizer(config.normalizer())
        .config(config.resolver_config())
        .build()
        .context("invalid capability catalog")?;

    Ok((resolver, config))
}

/// Resolve `names` (or the whole catalog), wait for background retries and
/// collect the diagnostics.
pub fn resolve_and_report(
    source: &SourceArgs,
    names: &[String],
    force_reload: bool,
    color: bool,
) -> Result<DiagnosticsReport> {
    let (resolver, config) = build_resolver(source)?;

    if names.is_empty() && resolver.catalog().is_empty() {
        emit(
            &Diagnostic::note("no capabilities declared")
                .with_location(config_file(source))
                .with_suggestion(suggestions::EMPTY_CATALOG),
            color,
        );
    }

    let options = BootstrapOptions {
        prerequisite: config.prerequisite(),
        only: names.iter().map(CapabilityName::new).collect(),
        force_reload,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async {
        let report = bootstrap(&resolver, &options).await;
        resolver.settle().await;

        for error in &report.errors {
            tracing::debug!("{}", error);
        }
    });

    Ok(Diagnostics::new(&resolver).report())
}

/// Print a report, as JSON or text.
pub fn print_report(report: &DiagnosticsReport, json: bool, verbose: bool) -> Result<()> {
    if json {
        let text =
            serde_json::to_string_pretty(report).context("failed to serialize report")?;
        println!("{}", text);
    } else {
        print!("{}", capstan::ops::format_report(report, verbose));
    }
    Ok(())
}
