//! Read-only metamodel: categories, indicator groups, indicators, degrees
//! and stages.
//!
//! The metamodel is a pre-generated JSON document. The default one is
//! compiled into the binary; a different file can be named in the config.
//! It is validated once at load time and never mutated afterwards.
//!
//! ## Module Structure
//!
//! - `model`: serde types mirroring the JSON document
//! - `query`: listing, filtering and threshold lookups
//! - `describe`: tree browsing by path
//! - `validate`: value validation against an indicator's declared format

mod describe;
pub mod model;
pub mod query;
pub mod validate;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::twin::access::Category;
use crate::twin::path::TwinPath;

pub use describe::{DescribeEntry, Description};
pub use model::{CategoryDef, Degree, Format, Group, Indicator, IndicatorType, Metamodel, Stage, Threshold};

/// Metamodel shipped with the server.
pub const EMBEDDED_METAMODEL: &str = include_str!("../../metamodel/metamodel.json");

#[derive(Debug, Error)]
pub enum MetamodelError {
    #[error("failed to read metamodel {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse metamodel: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown category '{0}' in metamodel")]
    UnknownCategory(String),
    #[error("duplicate indicator code '{0}'")]
    DuplicateCode(String),
    #[error("indicator '{indicator}' has a threshold for unknown stage '{stage}'")]
    UnknownStage { indicator: String, stage: String },
}

/// An indicator together with the category and group it is declared in.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorRef<'a> {
    pub category: &'a CategoryDef,
    pub group: &'a Group,
    pub indicator: &'a Indicator,
}

impl IndicatorRef<'_> {
    /// `category/group`, e.g. `1_declarative/1_2_goals`.
    pub fn group_path(&self) -> String {
        format!("{}/{}", self.category.code, self.group.code)
    }
}

impl Metamodel {
    pub fn embedded() -> Result<Self, MetamodelError> {
        Self::from_json(EMBEDDED_METAMODEL)
    }

    pub fn from_path(path: &Path) -> Result<Self, MetamodelError> {
        let content = fs::read_to_string(path).map_err(|source| MetamodelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, MetamodelError> {
        let metamodel: Metamodel = serde_json::from_str(content)?;
        metamodel.check()?;
        Ok(metamodel)
    }

    /// Every category maps to a known access category, indicator codes are
    /// unique, and thresholds only name declared stages.
    fn check(&self) -> Result<(), MetamodelError> {
        for category in &self.categories {
            if Category::from_code(&category.code).is_none() {
                return Err(MetamodelError::UnknownCategory(category.code.clone()));
            }
        }

        let mut seen = HashSet::new();
        for entry in self.indicators() {
            let indicator = entry.indicator;
            if !seen.insert(indicator.code.as_str()) {
                return Err(MetamodelError::DuplicateCode(indicator.code.clone()));
            }
            for stage in indicator.thresholds.iter().flat_map(|t| t.keys()) {
                if self.stage(stage).is_none() {
                    return Err(MetamodelError::UnknownStage {
                        indicator: indicator.code.clone(),
                        stage: stage.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn indicators(&self) -> impl Iterator<Item = IndicatorRef<'_>> {
        self.categories.iter().flat_map(|category| {
            category.groups.iter().flat_map(move |group| {
                group.indicators.iter().map(move |indicator| IndicatorRef {
                    category,
                    group,
                    indicator,
                })
            })
        })
    }

    pub fn indicator_count(&self) -> usize {
        self.indicators().count()
    }

    pub fn group_count(&self) -> usize {
        self.categories.iter().map(|c| c.groups.len()).sum()
    }

    pub fn category(&self, code: &str) -> Option<&CategoryDef> {
        self.categories.iter().find(|c| c.code == code)
    }

    pub fn stage(&self, code: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.code == code)
    }

    /// Find an indicator by code, falling back to its document key.
    pub fn find(&self, code: &str) -> Option<IndicatorRef<'_>> {
        let code = code.trim();
        self.indicators()
            .find(|entry| entry.indicator.code == code)
            .or_else(|| self.indicators().find(|entry| key_matches(&entry.indicator.key, code)))
    }

    /// Resolve a twin path of the form `category.group.indicator_key`.
    pub fn resolve(&self, path: &TwinPath) -> Option<IndicatorRef<'_>> {
        match path.segments() {
            segments @ [_, _, _] => self.resolve_segments(segments),
            _ => None,
        }
    }

    /// Rewrite the indicator segment of `path` to the indicator's declared
    /// key, so every spelling of an indicator addresses the same document
    /// slot. Paths below an indicator keep their tail.
    pub fn canonical_path(&self, path: TwinPath) -> TwinPath {
        let key = path
            .segments()
            .get(..3)
            .and_then(|head| self.resolve_segments(head))
            .map(|entry| entry.indicator.key.clone());
        match key {
            Some(key) => path.with_segment(2, &key),
            None => path,
        }
    }

    fn resolve_segments(&self, segments: &[String]) -> Option<IndicatorRef<'_>> {
        let [category, group, key] = segments else {
            return None;
        };
        self.indicators().find(|entry| {
            entry.category.code == *category
                && entry.group.code == *group
                && key_matches(&entry.indicator.key, key)
        })
    }
}

/// Keys contain spaces; paths may spell them with underscores instead.
pub(crate) fn key_matches(key: &str, segment: &str) -> bool {
    key == segment || key.replace(' ', "_") == segment.replace(' ', "_")
}
