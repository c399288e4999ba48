//! The per-user twin document: path addressing, access control and storage.
//!
//! ## Module Structure
//!
//! - `access`: role/category permission table
//! - `path`: path normalization and get/set over JSON
//! - `store`: `TwinStore` trait with memory and file implementations

pub mod access;
pub mod path;
pub mod store;

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use access::{AccessDenied, Category, Operation, Role, authorize};
use path::{KeyAction, Lookup, PathError, TwinPath};
use store::{StoreError, TwinStore};

/// The authenticated party a tool call runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

#[derive(Debug, Error)]
pub enum TwinError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, PartialEq)]
pub enum ReadOutcome {
    Found(Value),
    NotFound,
}

#[derive(Debug, PartialEq)]
pub struct WriteOutcome {
    pub path: TwinPath,
    pub category: Category,
    pub action: KeyAction,
}

pub struct TwinService {
    store: Arc<dyn TwinStore>,
}

impl TwinService {
    pub fn new(store: Arc<dyn TwinStore>) -> Self {
        Self { store }
    }

    pub fn store_kind(&self) -> &'static str {
        self.store.kind()
    }

    pub fn is_persistent(&self) -> bool {
        self.store.persistent()
    }

    /// Read the value at `raw_path` for `caller`.
    ///
    /// The root path returns the document restricted to the categories the
    /// caller's role may read.
    pub fn read(&self, caller: &Caller, raw_path: &str) -> Result<ReadOutcome, TwinError> {
        let path = TwinPath::parse(raw_path)?;
        let document = self.document(&caller.user_id)?;

        if path.is_root() {
            return Ok(ReadOutcome::Found(readable_view(&document, caller.role)));
        }

        authorize(&path, caller.role, Operation::Read)?;
        let outcome = match path::get(&document, &path) {
            Lookup::Found(value) => ReadOutcome::Found(value.clone()),
            Lookup::NotFound => ReadOutcome::NotFound,
        };

        tracing::debug!(
            user = %caller.user_id,
            path = %path,
            found = matches!(outcome, ReadOutcome::Found(_)),
            "twin read"
        );
        Ok(outcome)
    }

    /// Write `value` at `raw_path` after checking the caller's permissions.
    pub fn write(&self, caller: &Caller, raw_path: &str, value: Value) -> Result<WriteOutcome, TwinError> {
        let path = TwinPath::parse(raw_path)?;
        if path.is_root() {
            return Err(PathError::RootWrite.into());
        }

        let category = authorize(&path, caller.role, Operation::Write).inspect_err(|denied| {
            tracing::warn!(user = %caller.user_id, "{}", denied);
        })?;

        let mut document = self.document(&caller.user_id)?;
        let action = path::set(&mut document, &path, value)?;
        self.store.save(&caller.user_id, &document)?;

        tracing::info!(
            user = %caller.user_id,
            path = %path,
            action = action.as_str(),
            "twin write"
        );
        Ok(WriteOutcome {
            path,
            category,
            action,
        })
    }

    /// Stored document for `user_id`, or an empty object for a new user.
    pub fn document(&self, user_id: &str) -> Result<Value, TwinError> {
        Ok(self
            .store
            .load(user_id)?
            .unwrap_or_else(|| Value::Object(Map::new())))
    }
}

fn readable_view(document: &Value, role: Role) -> Value {
    let Some(obj) = document.as_object() else {
        return Value::Object(Map::new());
    };

    let filtered = obj
        .iter()
        .filter(|(key, _)| {
            Category::from_code(key).is_some_and(|c| c.allows(role, Operation::Read))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Value::Object(filtered)
}
