//! `capstan candidates` command
//!
//! Prints the locations a resource would be looked up at, in order.

use anyhow::Result;

use capstan::resolver::rebase;

use crate::cli::CandidatesArgs;
use crate::commands::load_settings;

pub fn execute(args: CandidatesArgs, verbose: bool) -> Result<()> {
    let config = load_settings(&args.root, args.config.as_deref())?;
    let normalizer = config.normalizer();

    let candidates = normalizer.candidates(&args.location);
    for candidate in &candidates {
        println!("{}", candidate);
    }

    if verbose {
        let document_base = config.resolver_config().document_base;
        if let Some(first) = candidates.first() {
            eprintln!("background retry: {}", rebase(&document_base, first));
        }
    }

    Ok(())
}
