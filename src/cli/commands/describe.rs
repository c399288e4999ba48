use anyhow::Result;

use super::super::args::DescribeCommand;
use super::super::exit_status::ExitStatus;
use super::{current_config, load_metamodel};

pub fn describe(cmd: DescribeCommand) -> Result<ExitStatus> {
    let config = current_config()?;
    let metamodel = load_metamodel(&config)?;

    let description = metamodel.describe(cmd.path.as_deref());
    if !description.is_found() {
        eprintln!("{}", description);
        return Ok(ExitStatus::Failure);
    }

    println!("{}", description);
    Ok(ExitStatus::Success)
}
