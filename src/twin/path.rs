//! Path addressing over the twin document.
//!
//! Paths accept both `.` and `/` as separators, so `1_declarative/1_2_goals`
//! and `1_declarative.1_2_goals` name the same location.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),
    #[error("the document root cannot be written")]
    RootWrite,
}

/// Whether a write created a new key or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Added,
    Updated,
}

impl KeyAction {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyAction::Added => "added",
            KeyAction::Updated => "updated",
        }
    }
}

/// Result of a path lookup.
#[derive(Debug, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a Value),
    NotFound,
}

impl<'a> Lookup<'a> {
    pub fn found(self) -> Option<&'a Value> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

/// A parsed, normalized path. An empty segment list is the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwinPath {
    segments: Vec<String>,
}

impl TwinPath {
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let normalized = normalize_path(raw);
        if normalized.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = normalized.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(PathError::EmptySegment(raw.to_string()));
        }

        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First segment, which names the category.
    pub fn head(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Same path with the segment at `index` replaced.
    pub fn with_segment(mut self, index: usize, segment: &str) -> Self {
        if let Some(slot) = self.segments.get_mut(index) {
            *slot = segment.to_string();
        }
        self
    }
}

impl fmt::Display for TwinPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Replace `/` with `.` and trim separators from both ends.
pub fn normalize_path(raw: &str) -> String {
    raw.trim()
        .replace('/', ".")
        .trim_matches('.')
        .to_string()
}

pub fn get<'a>(root: &'a Value, path: &TwinPath) -> Lookup<'a> {
    let mut current = root;
    for segment in path.segments() {
        match current.as_object().and_then(|obj| obj.get(segment)) {
            Some(next) => current = next,
            None => return Lookup::NotFound,
        }
    }
    Lookup::Found(current)
}

/// Set `value` at `path`, creating intermediate objects on the way.
///
/// Intermediate values that are not objects are replaced by empty objects.
pub fn set(root: &mut Value, path: &TwinPath, value: Value) -> Result<KeyAction, PathError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(PathError::RootWrite);
    };

    let mut current = root;
    for segment in parents {
        current = ensure_object(current)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let obj = ensure_object(current);
    let action = if obj.contains_key(last) {
        KeyAction::Updated
    } else {
        KeyAction::Added
    };
    obj.insert(last.clone(), value);
    Ok(action)
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            ensure_object(other)
        }
    }
}
