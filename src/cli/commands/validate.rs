use anyhow::Result;
use serde_json::Value;

use super::super::args::ValidateCommand;
use super::super::exit_status::ExitStatus;
use super::super::report::print_validation;
use super::{current_config, load_metamodel};

pub fn validate(cmd: ValidateCommand) -> Result<ExitStatus> {
    let config = current_config()?;
    let metamodel = load_metamodel(&config)?;

    let value = parse_value(&cmd.value);
    let report = metamodel.validate(&cmd.indicator, &value);
    print_validation(&report);

    Ok(if report.valid {
        ExitStatus::Success
    } else {
        ExitStatus::Failure
    })
}

/// Arguments that are not valid JSON are taken as plain strings, so
/// `twin validate IND.1.4.4 09:30` works without shell quoting.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
