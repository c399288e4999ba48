pub mod describe;
pub mod init;
pub mod serve;
pub mod validate;

use std::env;

use anyhow::{Context, Result};

use crate::config::{Config, load_config};
use crate::metamodel::Metamodel;

/// Config from the nearest `.twinrc.json`, or defaults.
pub(crate) fn current_config() -> Result<Config> {
    let cwd = env::current_dir().context("Failed to read current directory")?;
    Ok(load_config(&cwd)?.config)
}

/// The configured metamodel file, or the built-in one.
pub(crate) fn load_metamodel(config: &Config) -> Result<Metamodel> {
    match &config.metamodel_path {
        Some(path) => Metamodel::from_path(path)
            .with_context(|| format!("Failed to load metamodel: {}", path.display())),
        None => Metamodel::embedded().context("Built-in metamodel is invalid"),
    }
}
