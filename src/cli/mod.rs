//! Command-line interface layer.

use anyhow::Result;

mod args;
mod commands;
mod exit_status;
mod report;

pub use args::{Arguments, Command, Transport};
pub use exit_status::ExitStatus;

/// Dispatch the parsed command. `serve` blocks until the server shuts down.
pub fn run_cli(args: Arguments) -> Result<ExitStatus> {
    let Some(Arguments { command }) = args.with_command_or_help() else {
        return Ok(ExitStatus::Success);
    };

    match command {
        Some(Command::Describe(cmd)) => commands::describe::describe(cmd),
        Some(Command::Validate(cmd)) => commands::validate::validate(cmd),
        Some(Command::Init) => commands::init::init(),
        Some(Command::Serve(args)) => {
            commands::serve::serve(args)?;
            Ok(ExitStatus::Success)
        }
        None => anyhow::bail!("No command provided. Use --help to see available commands."),
    }
}
