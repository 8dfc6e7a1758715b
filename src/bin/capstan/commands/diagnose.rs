//! `capstan diagnose` command

use anyhow::Result;

use crate::cli::DiagnoseArgs;
use crate::commands::{print_report, resolve_and_report};

pub fn execute(args: DiagnoseArgs, color: bool) -> Result<()> {
    let report = resolve_and_report(&args.source, &[], false, color)?;

    // Attempt logs are the point of this command, so always verbose.
    print_report(&report, args.json, true)?;

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}
