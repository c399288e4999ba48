use std::{
    collections::HashSet,
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::twin::{access::Role, store::validate_user_id};

pub const CONFIG_FILE_NAME: &str = ".twinrc.json";

/// User the development auth mode runs every request as.
pub const DEV_USER_ID: &str = "learner_001";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Alternative metamodel JSON; the built-in one is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metamodel_path: Option<PathBuf>,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Identity used by the stdio transport, which carries no credentials.
    #[serde(default = "default_stdio_user")]
    pub stdio_user: String,
    #[serde(default)]
    pub stdio_role: Role,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    #[default]
    File,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(default)]
    pub kind: StorageKind,
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AuthConfig {
    /// No credentials; every request runs as one fixed user.
    None {
        #[serde(default = "default_dev_user")]
        user_id: String,
        #[serde(default)]
        role: Role,
    },
    ApiKey {
        keys: Vec<ApiKeyConfig>,
    },
    Jwt(JwtConfig),
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig::None {
            user_id: default_dev_user(),
            role: Role::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyConfig {
    pub key: String,
    pub user_id: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtConfig {
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Defaults to `<issuer>/.well-known/jwks.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_url: Option<String>,
    #[serde(default = "default_role_claim")]
    pub role_claim: String,
    /// Role for tokens that carry no role claim.
    #[serde(default)]
    pub default_role: Role,
}

impl JwtConfig {
    pub fn jwks_url(&self) -> String {
        self.jwks_url
            .clone()
            .unwrap_or_else(|| format!("{}/.well-known/jwks.json", self.issuer.trim_end_matches('/')))
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./twin-data")
}

fn default_dev_user() -> String {
    DEV_USER_ID.to_string()
}

fn default_stdio_user() -> String {
    DEV_USER_ID.to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_role_claim() -> String {
    "role".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            storage: StorageConfig::default(),
            metamodel_path: None,
            auth: AuthConfig::default(),
            stdio_user: default_stdio_user(),
            stdio_role: Role::User,
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Returns an error for an unparsable bind address, user ids that could
    /// not name a twin document, or incomplete auth settings.
    pub fn validate(&self) -> Result<()> {
        self.bind
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid 'bind' address: \"{}\"", self.bind))?;

        validate_user_id(&self.stdio_user).context("Invalid 'stdioUser'")?;

        match &self.auth {
            AuthConfig::None { user_id, .. } => {
                validate_user_id(user_id).context("Invalid 'auth.userId'")?;
            }
            AuthConfig::ApiKey { keys } => {
                if keys.is_empty() {
                    bail!("'auth.keys' must list at least one key in apiKey mode");
                }
                let mut seen = HashSet::new();
                for entry in keys {
                    if entry.key.trim().is_empty() {
                        bail!("API key for user '{}' is empty", entry.user_id);
                    }
                    if !seen.insert(entry.key.as_str()) {
                        bail!("API key for user '{}' is listed twice", entry.user_id);
                    }
                    validate_user_id(&entry.user_id).context("Invalid 'auth.keys[].userId'")?;
                }
            }
            AuthConfig::Jwt(jwt) => {
                if !(jwt.issuer.starts_with("https://") || jwt.issuer.starts_with("http://")) {
                    bail!("'auth.issuer' must be an http(s) URL, got \"{}\"", jwt.issuer);
                }
                if jwt.role_claim.trim().is_empty() {
                    bail!("'auth.roleClaim' must not be empty");
                }
            }
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("Invalid bind address: \"{}\"", self.bind))
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
    /// Path of the file the config came from, `None` when using defaults.
    pub source: Option<PathBuf>,
}

impl ConfigLoadResult {
    pub fn from_file(&self) -> bool {
        self.source.is_some()
    }
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => load_config_file(&path),
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            source: None,
        }),
    }
}

pub fn load_config_file(path: &Path) -> Result<ConfigLoadResult> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.validate()?;
    Ok(ConfigLoadResult {
        config,
        source: Some(path.to_path_buf()),
    })
}
