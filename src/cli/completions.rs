//! Completion scripts for the depthframe binary.

use std::io::Write;

use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use super::Cli;
use crate::error::Result;

/// Print a shell completion script
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    write_script(args.shell, &mut std::io::stdout().lock());
    Ok(())
}

/// Script covering every subcommand and the global `--config`/`-v` flags.
fn write_script(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin, out);
}
