//! Per-user twin document storage.
//!
//! Each store holds one JSON document per user id. The server performs one
//! load/save round trip per tool call without locking across the pair, so
//! two concurrent writers for the same user can overwrite each other.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid user id '{0}': only letters, numbers, '-', '_', '.', '@' and '|' are allowed")]
    InvalidUserId(String),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse twin document {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize twin document: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("twin store lock poisoned")]
    Poisoned,
}

pub trait TwinStore: Send + Sync {
    /// Load the document for `user_id`, or `None` if the user has none yet.
    fn load(&self, user_id: &str) -> Result<Option<Value>, StoreError>;

    fn save(&self, user_id: &str, document: &Value) -> Result<(), StoreError>;

    /// Short label reported by the server info endpoint.
    fn kind(&self) -> &'static str;

    /// Whether saved documents survive a restart.
    fn persistent(&self) -> bool {
        true
    }
}

/// Process-local store; documents vanish on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            documents: RwLock::new(documents.into_iter().collect()),
        }
    }
}

impl TwinStore for MemoryStore {
    fn load(&self, user_id: &str) -> Result<Option<Value>, StoreError> {
        let documents = self.documents.read().map_err(|_| StoreError::Poisoned)?;
        Ok(documents.get(user_id).cloned())
    }

    fn save(&self, user_id: &str, document: &Value) -> Result<(), StoreError> {
        let mut documents = self.documents.write().map_err(|_| StoreError::Poisoned)?;
        documents.insert(user_id.to_string(), document.clone());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }

    fn persistent(&self) -> bool {
        false
    }
}

/// One pretty-printed `<user_id>.json` file per user under `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        validate_user_id(user_id)?;
        Ok(self.root.join(format!("{}.json", user_id)))
    }
}

impl TwinStore for FileStore {
    fn load(&self, user_id: &str) -> Result<Option<Value>, StoreError> {
        let path = self.document_path(user_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Parse { path, source })
    }

    fn save(&self, user_id: &str, document: &Value) -> Result<(), StoreError> {
        let path = self.document_path(user_id)?;
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            path: self.root.clone(),
            source,
        })?;

        let mut content = serde_json::to_string_pretty(document)?;
        if !content.ends_with('\n') {
            content.push('\n');
        }

        fs::write(&path, content).map_err(|source| StoreError::Write { path, source })
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}

/// Validate a user id before it is used as a file name.
///
/// Identity providers issue ids such as `auth0|abc` or UUIDs, so the
/// allowlist covers those while rejecting separators and `..`.
pub fn validate_user_id(user_id: &str) -> Result<(), StoreError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '|');
    if user_id.is_empty()
        || user_id.len() > 128
        || user_id.starts_with('.')
        || !user_id.chars().all(allowed)
    {
        return Err(StoreError::InvalidUserId(user_id.to_string()));
    }
    Ok(())
}
