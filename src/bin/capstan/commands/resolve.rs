//! `capstan resolve` command

use anyhow::Result;

use capstan::core::CapabilityStatus;
use capstan::util::diagnostic::{emit, suggestions, Diagnostic};

use crate::cli::ResolveArgs;
use crate::commands::{config_file, print_report, resolve_and_report};

pub fn execute(args: ResolveArgs, verbose: bool, color: bool) -> Result<()> {
    let report = resolve_and_report(&args.source, &args.names, args.force, color)?;

    print_report(&report, args.json, verbose)?;

    if report.has_failures() {
        if !args.json {
            let failed: Vec<_> = report
                .capabilities
                .iter()
                .filter(|detail| detail.status == CapabilityStatus::Failed)
                .collect();
            let names: Vec<&str> = failed.iter().map(|detail| detail.name.as_str()).collect();

            let mut diagnostic =
                Diagnostic::error(format!("could not load: {}", names.join(", ")))
                    .with_location(config_file(&args.source));
            for detail in &failed {
                diagnostic = diagnostic.with_context(format!(
                    "{} (location `{}`)",
                    detail.name, detail.location
                ));
            }
            emit(
                &diagnostic
                    .with_suggestion(suggestions::RESOLVE_FAILED)
                    .with_suggestion(suggestions::CHECK_CANDIDATES),
                color,
            );
        }
        std::process::exit(1);
    }

    Ok(())
}
