use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Metamodel {
    pub version: String,
    pub categories: Vec<CategoryDef>,
    pub degrees: Vec<Degree>,
    pub stages: Vec<Stage>,
    /// Shared reference documents (degrees, stages) as Markdown.
    #[serde(default)]
    pub documents: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryDef {
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Group {
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub indicators: Vec<Indicator>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Indicator {
    pub code: String,
    /// Source document name, also the last segment of the indicator's path.
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(rename = "type")]
    pub kind: IndicatorType,
    pub format: Format,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<BTreeMap<String, Threshold>>,
    #[serde(default)]
    pub for_prompts: bool,
    #[serde(default)]
    pub for_qualification: bool,
    #[serde(default)]
    pub trainee_model: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorType {
    Semantic,
    Temporal,
    Frequency,
    Scale,
    Categorical,
    Structural,
}

impl IndicatorType {
    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorType::Semantic => "semantic",
            IndicatorType::Temporal => "temporal",
            IndicatorType::Frequency => "frequency",
            IndicatorType::Scale => "scale",
            IndicatorType::Categorical => "categorical",
            IndicatorType::Structural => "structural",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum Format {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "structured_text")]
    StructuredText,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "enum")]
    Enum,
    #[serde(rename = "date")]
    Date,
    /// `HH:MM`
    #[serde(rename = "time")]
    Time,
    /// Day of week followed by `HH:MM`, e.g. `Mon 09:30`.
    #[serde(rename = "day_time")]
    DayTime,
    #[serde(rename = "list[string]")]
    StringList,
    #[serde(rename = "list[object]")]
    ObjectList,
    #[serde(rename = "checklist")]
    Checklist,
    #[serde(rename = "object")]
    Object,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::String => "string",
            Format::StructuredText => "structured_text",
            Format::Integer => "integer",
            Format::Float => "float",
            Format::Boolean => "boolean",
            Format::Enum => "enum",
            Format::Date => "date",
            Format::Time => "time",
            Format::DayTime => "day_time",
            Format::StringList => "list[string]",
            Format::ObjectList => "list[object]",
            Format::Checklist => "checklist",
            Format::Object => "object",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualification threshold for one stage.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
pub struct Threshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_weeks: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Degree {
    pub code: String,
    pub name: String,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Stage {
    pub code: String,
    pub name: String,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
