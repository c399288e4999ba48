use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metamodel::validate::ValidationReport;
use crate::twin::access::Category;

// ============================================================
// Twin Data Types (read_digital_twin, write_digital_twin)
// ============================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ReadDigitalTwinParams {
    /// Dot or slash separated path, e.g. "1_declarative/1_2_goals". Empty or "/" reads every category you may read.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteDigitalTwinParams {
    /// Dot or slash separated path; the first segment must be a category such as "1_declarative".
    pub path: String,
    /// Value to store (any JSON value).
    pub data: Value,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ReadResult {
    pub path: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct WriteResult {
    pub success: bool,
    pub path: String,
    pub category: Category,
    /// True if the key did not exist before this write.
    pub created: bool,
    /// False when the server keeps documents in memory only.
    pub persisted: bool,
    /// Indicator code the path resolved to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
}

/// Returned as a tool error when a write fails indicator validation.
#[derive(Debug, Serialize)]
pub struct RejectedWrite {
    pub success: bool,
    pub path: String,
    pub validation: ValidationReport,
}

// ============================================================
// Metamodel Types
// ============================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DescribeByPathParams {
    /// Metamodel path: "/" for the root, then category, group and indicator, e.g. "1_declarative/1_2_goals".
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetIndicatorsParams {
    /// Category code, group code or "category/group" path, e.g. "1_2_goals" or "3_derived".
    #[serde(default)]
    pub group: Option<String>,
    /// Only indicators used (or not used) in prompts.
    #[serde(default)]
    pub for_prompts: Option<bool>,
    /// Only indicators used (or not used) for qualification assessment.
    #[serde(default)]
    pub for_qualification: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetIndicatorParams {
    /// Indicator code, e.g. "IND.1.2.2". An indicator key is also accepted.
    pub code: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetStageThresholdsParams {
    /// Indicator code, e.g. "IND.3.1.01" for weekly self-development hours.
    pub indicator: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ValidateValueParams {
    /// Indicator code to validate against.
    pub indicator: String,
    /// Value to validate (any JSON type).
    pub value: Value,
}

// ============================================================
// Server Info Types (GET /mcp)
// ============================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfoDto {
    pub name: &'static str,
    pub version: &'static str,
    pub transport: &'static str,
    pub auth: &'static str,
    pub storage: &'static str,
    pub tools: Vec<String>,
    pub metamodel: MetamodelStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetamodelStats {
    pub version: String,
    pub categories: usize,
    pub groups: usize,
    pub indicators: usize,
    pub degrees: usize,
    pub stages: usize,
}
