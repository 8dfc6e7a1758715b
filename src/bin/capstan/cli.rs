//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Capstan - resolve named capabilities with path repair and fallbacks
#[derive(Parser)]
#[command(name = "capstan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve capabilities and print their status
    Resolve(ResolveArgs),

    /// Resolve everything and print attempt logs and exports
    Diagnose(DiagnoseArgs),

    /// Show the candidate locations tried for a resource
    Candidates(CandidatesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where modules and configuration come from.
#[derive(Args, Clone)]
pub struct SourceArgs {
    /// Directory module locations are resolved against
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Config file to use instead of the global and project configs
    #[arg(long, env = "CAPSTAN_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Capabilities to resolve (defaults to every declared capability)
    pub names: Vec<String>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Re-resolve even if already resolved
    #[arg(long)]
    pub force: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DiagnoseArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CandidatesArgs {
    /// Resource location as it is referenced
    pub location: String,

    /// Project directory whose config extends the rule tables
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Config file to use instead of the global and project configs
    #[arg(long, env = "CAPSTAN_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
