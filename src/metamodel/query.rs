//! Listing and lookup queries over the metamodel.
//!
//! Every query returns a serializable view; "not found" is expressed in the
//! returned data rather than as an error.

use std::collections::BTreeMap;

use serde::Serialize;

use super::model::{Degree, Indicator, Metamodel, Stage, Threshold};
use super::IndicatorRef;
use crate::twin::access::{Access, Category, Role};

// ============================================================
// Categories and groups
// ============================================================

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub code: String,
    pub title: String,
    pub description: String,
    pub group_count: usize,
    pub indicator_count: usize,
    /// Permission flags per role, keyed by role name.
    pub access: BTreeMap<Role, Access>,
}

#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub code: String,
    pub category: String,
    pub path: String,
    pub description: String,
    pub indicator_count: usize,
}

#[derive(Debug, Serialize)]
pub struct GroupList {
    pub count: usize,
    pub groups: Vec<GroupSummary>,
}

impl Metamodel {
    pub fn category_summaries(&self) -> Vec<CategorySummary> {
        self.categories
            .iter()
            .map(|category| {
                let access = Category::from_code(&category.code)
                    .map(|c| Role::ALL.into_iter().map(|role| (role, c.access(role))).collect())
                    .unwrap_or_default();
                CategorySummary {
                    code: category.code.clone(),
                    title: category.title.clone(),
                    description: category.description.clone(),
                    group_count: category.groups.len(),
                    indicator_count: category.groups.iter().map(|g| g.indicators.len()).sum(),
                    access,
                }
            })
            .collect()
    }

    pub fn groups(&self) -> GroupList {
        let groups: Vec<GroupSummary> = self
            .categories
            .iter()
            .flat_map(|category| {
                category.groups.iter().map(move |group| GroupSummary {
                    code: group.code.clone(),
                    category: category.code.clone(),
                    path: format!("{}/{}", category.code, group.code),
                    description: group.description.clone(),
                    indicator_count: group.indicators.len(),
                })
            })
            .collect();
        GroupList {
            count: groups.len(),
            groups,
        }
    }
}

// ============================================================
// Indicators
// ============================================================

/// Filters for [`Metamodel::list_indicators`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFilter {
    /// Category code, group code or `category/group` path.
    pub group: Option<String>,
    pub for_prompts: Option<bool>,
    pub for_qualification: Option<bool>,
}

impl IndicatorFilter {
    fn matches(&self, entry: &IndicatorRef<'_>) -> bool {
        if let Some(group) = self.group.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            let group = group.replace('.', "/");
            let group = group.trim_matches('/');
            let hit = entry.category.code == group
                || entry.group.code == group
                || entry.group_path() == group;
            if !hit {
                return false;
            }
        }
        if self.for_prompts.is_some_and(|flag| entry.indicator.for_prompts != flag) {
            return false;
        }
        if self
            .for_qualification
            .is_some_and(|flag| entry.indicator.for_qualification != flag)
        {
            return false;
        }
        true
    }
}

/// An indicator with the category and group it lives in.
#[derive(Debug, Serialize)]
pub struct IndicatorView {
    #[serde(flatten)]
    pub indicator: Indicator,
    pub category: String,
    pub group: String,
    /// Twin document path where values for this indicator are stored.
    pub path: String,
}

impl From<IndicatorRef<'_>> for IndicatorView {
    fn from(entry: IndicatorRef<'_>) -> Self {
        Self {
            indicator: entry.indicator.clone(),
            category: entry.category.code.clone(),
            group: entry.group.code.clone(),
            path: format!("{}/{}", entry.group_path(), entry.indicator.key),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IndicatorList {
    pub count: usize,
    pub indicators: Vec<IndicatorView>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum IndicatorLookup {
    Found(Box<IndicatorView>),
    NotFound { found: bool, error: String },
}

impl Metamodel {
    pub fn list_indicators(&self, filter: &IndicatorFilter) -> IndicatorList {
        let indicators: Vec<IndicatorView> = self
            .indicators()
            .filter(|entry| filter.matches(entry))
            .map(IndicatorView::from)
            .collect();
        IndicatorList {
            count: indicators.len(),
            indicators,
        }
    }

    pub fn indicator(&self, code: &str) -> IndicatorLookup {
        match self.find(code) {
            Some(entry) => IndicatorLookup::Found(Box::new(entry.into())),
            None => IndicatorLookup::NotFound {
                found: false,
                error: format!("Indicator not found: {}", code),
            },
        }
    }
}

// ============================================================
// Thresholds
// ============================================================

#[derive(Debug, Serialize)]
pub struct StageThreshold {
    pub stage: String,
    pub stage_name: String,
    pub stage_order: u32,
    #[serde(flatten)]
    pub threshold: Threshold,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ThresholdReport {
    Table {
        indicator: String,
        indicator_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        thresholds: Vec<StageThreshold>,
    },
    Missing {
        indicator: String,
        message: String,
        for_qualification: bool,
    },
    NotFound {
        found: bool,
        error: String,
    },
}

impl Metamodel {
    /// Per-stage thresholds for an indicator, ordered by stage.
    pub fn stage_thresholds(&self, code: &str) -> ThresholdReport {
        let Some(entry) = self.find(code) else {
            return ThresholdReport::NotFound {
                found: false,
                error: format!("Indicator not found: {}", code),
            };
        };
        let indicator = entry.indicator;

        let Some(thresholds) = indicator.thresholds.as_ref().filter(|t| !t.is_empty()) else {
            return ThresholdReport::Missing {
                indicator: indicator.code.clone(),
                message: "This indicator does not have stage thresholds".to_string(),
                for_qualification: indicator.for_qualification,
            };
        };

        let mut rows: Vec<StageThreshold> = thresholds
            .iter()
            .map(|(stage_code, threshold)| {
                let stage = self.stage(stage_code);
                StageThreshold {
                    stage: stage_code.clone(),
                    stage_name: stage.map_or_else(|| stage_code.clone(), |s| s.name.clone()),
                    stage_order: stage.map_or(u32::MAX, |s| s.order),
                    threshold: threshold.clone(),
                }
            })
            .collect();
        rows.sort_by_key(|row| row.stage_order);

        ThresholdReport::Table {
            indicator: indicator.code.clone(),
            indicator_name: indicator.name.clone(),
            unit: indicator.unit.clone(),
            thresholds: rows,
        }
    }
}

// ============================================================
// Degrees and stages
// ============================================================

#[derive(Debug, Serialize)]
pub struct DegreeList<'a> {
    pub count: usize,
    pub degrees: Vec<&'a Degree>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct StageList<'a> {
    pub count: usize,
    pub stages: Vec<&'a Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<&'a str>,
}

impl Metamodel {
    pub fn degree_list(&self) -> DegreeList<'_> {
        let mut degrees: Vec<&Degree> = self.degrees.iter().collect();
        degrees.sort_by_key(|d| d.order);
        DegreeList {
            count: degrees.len(),
            degrees,
            document: self.documents.get("degrees").map(String::as_str),
        }
    }

    pub fn stage_list(&self) -> StageList<'_> {
        let mut stages: Vec<&Stage> = self.stages.iter().collect();
        stages.sort_by_key(|s| s.order);
        StageList {
            count: stages.len(),
            stages,
            document: self.documents.get("stages").map(String::as_str),
        }
    }
}
