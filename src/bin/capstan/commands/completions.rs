//! `capstan completions` command

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::{Cli, CompletionsArgs};

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let mut stdout = std::io::stdout().lock();

    generate(args.shell, &mut cmd, "capstan", &mut stdout);

    Ok(())
}
