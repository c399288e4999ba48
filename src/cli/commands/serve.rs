use std::{env, sync::Arc};

use anyhow::{Context, Result};

use super::super::args::{ServeArgs, Transport};
use super::load_metamodel;
use crate::auth::Authenticator;
use crate::config::{Config, ConfigLoadResult, StorageKind, load_config, load_config_file};
use crate::logging::init_logging;
use crate::mcp::{AppState, TwinMcpServer, serve_http, serve_stdio};
use crate::twin::{
    Caller, TwinService,
    store::{FileStore, MemoryStore, TwinStore},
};

/// Load config, then block on the chosen transport until shutdown.
pub fn serve(args: ServeArgs) -> Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(args))
}

async fn run(args: ServeArgs) -> Result<()> {
    let loaded = match &args.config {
        Some(path) => load_config_file(path)?,
        None => load_config(&env::current_dir().context("Failed to read current directory")?)?,
    };
    let ConfigLoadResult { mut config, source } = loaded;
    apply_overrides(&mut config, &args);
    config.validate()?;

    init_logging(&config.log_filter)?;
    match &source {
        Some(path) => tracing::info!(config = %path.display(), "loaded configuration"),
        None => tracing::info!("no {} found, using defaults", crate::config::CONFIG_FILE_NAME),
    }

    let metamodel = Arc::new(load_metamodel(&config)?);
    tracing::info!(
        transport = args.transport.as_str(),
        version = %metamodel.version,
        indicators = metamodel.indicator_count(),
        "metamodel loaded"
    );

    let twin = Arc::new(TwinService::new(build_store(&config)));
    let caller = Caller::new(config.stdio_user.clone(), config.stdio_role);
    let server = TwinMcpServer::new(twin, metamodel, caller);

    match args.transport {
        Transport::Stdio => serve_stdio(server).await,
        Transport::Http => {
            let auth = Authenticator::from_config(&config.auth)?;
            if matches!(auth, Authenticator::Disabled(_)) {
                tracing::warn!("authentication disabled; every request runs as the configured development user");
            }
            serve_http(AppState::new(server, auth), config.bind_addr()?).await
        }
    }
}

fn apply_overrides(config: &mut Config, args: &ServeArgs) {
    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    if let Some(dir) = &args.data_dir {
        config.storage.kind = StorageKind::File;
        config.storage.dir = dir.clone();
    }
}

fn build_store(config: &Config) -> Arc<dyn TwinStore> {
    match config.storage.kind {
        StorageKind::Memory => {
            tracing::warn!("memory storage: twin documents are lost on restart");
            Arc::new(MemoryStore::new())
        }
        StorageKind::File => {
            tracing::info!(dir = %config.storage.dir.display(), "file storage");
            Arc::new(FileStore::new(config.storage.dir.clone()))
        }
    }
}
