//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `serve`: Start the MCP server over HTTP or stdio
//! - `describe`: Browse the metamodel tree
//! - `validate`: Check a value against an indicator
//! - `init`: Initialize twin configuration file

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Transport {
    #[default]
    Http,
    Stdio,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Http => "http",
            Transport::Stdio => "stdio",
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Transport to serve MCP over
    #[arg(long, value_enum, default_value_t = Transport::Http)]
    pub transport: Transport,

    /// Address to listen on (overrides config file)
    #[arg(long, env = "TWIN_BIND")]
    pub bind: Option<String>,

    /// Directory holding twin documents; implies file storage (overrides config file)
    #[arg(long, env = "TWIN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file to use instead of searching for .twinrc.json
    #[arg(long, env = "TWIN_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DescribeCommand {
    /// Metamodel path, e.g. "1_declarative/1_2_goals" (default: root)
    pub path: Option<String>,
}

#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Indicator code, e.g. "IND.1.3.1"
    pub indicator: String,

    /// Value as JSON, e.g. 3, "\"text\"" or '{"energy": 4}'
    pub value: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the MCP server for AI agents
    Serve(ServeArgs),
    /// Print the metamodel tree or an indicator card
    Describe(DescribeCommand),
    /// Validate a JSON value against an indicator definition
    Validate(ValidateCommand),
    /// Initialize a new .twinrc.json configuration file
    Init,
}
