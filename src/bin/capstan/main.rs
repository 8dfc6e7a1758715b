//! Capstan CLI - resolve named capabilities with path repair and fallbacks

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use capstan::resolver::ResolveError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<ResolveError>() {
            Some(resolve_error) => {
                eprintln!("{:?}", miette::Report::new(resolve_error.clone()));
            }
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("capstan=debug")
    } else {
        EnvFilter::new("capstan=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let color = !cli.no_color && std::io::stderr().is_terminal();

    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args, cli.verbose, color),
        Commands::Diagnose(args) => commands::diagnose::execute(args, color),
        Commands::Candidates(args) => commands::candidates::execute(args, cli.verbose),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
