use std::sync::Arc;

use anyhow::Result;
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo, Tool},
    tool, tool_handler, tool_router,
};
use serde_json::{Map, Value, json};

use crate::metamodel::{Metamodel, query::IndicatorFilter, validate::validate_value};
use crate::twin::{
    Caller, ReadOutcome, TwinService,
    access::{Operation, authorize},
    path::{KeyAction, TwinPath},
};

use super::helpers::{json_error_result, json_result, parse_arguments, twin_error};
use super::types::{
    DescribeByPathParams, GetIndicatorParams, GetIndicatorsParams, GetStageThresholdsParams,
    MetamodelStats, ReadDigitalTwinParams, ReadResult, RejectedWrite, ServerInfoDto,
    ValidateValueParams, WriteDigitalTwinParams, WriteResult,
};

pub const SERVER_NAME: &str = "twin-mcp";

/// MCP tool surface over one learner's twin document and the shared metamodel.
///
/// The server acts for exactly one [`Caller`]. The HTTP transport clones a
/// prototype per request with [`TwinMcpServer::with_caller`]; stdio uses the
/// configured identity for the whole session.
#[derive(Clone)]
pub struct TwinMcpServer {
    tool_router: ToolRouter<Self>,
    twin: Arc<TwinService>,
    metamodel: Arc<Metamodel>,
    caller: Caller,
}

#[tool_router]
impl TwinMcpServer {
    pub fn new(twin: Arc<TwinService>, metamodel: Arc<Metamodel>, caller: Caller) -> Self {
        Self {
            tool_router: Self::tool_router(),
            twin,
            metamodel,
            caller,
        }
    }

    pub fn with_caller(&self, caller: Caller) -> Self {
        Self {
            caller,
            ..self.clone()
        }
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn metamodel(&self) -> &Metamodel {
        &self.metamodel
    }

    pub fn twin(&self) -> &TwinService {
        &self.twin
    }

    /// Browse the metamodel tree
    #[tool(
        description = "Browse the metamodel. Root ('/') lists shared documents and the four categories; a category lists its groups; a group lists indicators as 'key:type/format:description'; an indicator path returns its full card."
    )]
    pub async fn describe_by_path(
        &self,
        params: Parameters<DescribeByPathParams>,
    ) -> Result<CallToolResult, McpError> {
        let description = self.metamodel.describe(params.0.path.as_deref());
        Ok(CallToolResult::success(vec![Content::text(description.to_string())]))
    }

    /// Read from the caller's twin document
    #[tool(
        description = "Read data from your digital twin by path (dot or slash notation). An empty path or '/' returns every category your role may read. Missing paths return found=false."
    )]
    pub async fn read_digital_twin(
        &self,
        params: Parameters<ReadDigitalTwinParams>,
    ) -> Result<CallToolResult, McpError> {
        let raw = self.canonical(&params.0.path.unwrap_or_default());
        let outcome = self.twin.read(&self.caller, &raw).map_err(twin_error)?;

        let path = display_path(&raw);
        let result = match outcome {
            ReadOutcome::Found(value) => ReadResult {
                path,
                found: true,
                value: Some(value),
                message: None,
            },
            ReadOutcome::NotFound => ReadResult {
                message: Some(format!("Path not found: {}", path)),
                path,
                found: false,
                value: None,
            },
        };

        json_result(&result)
    }

    /// Write to the caller's twin document
    #[tool(
        description = "Write data to your digital twin by path. Users may write 1_declarative; 2_collected and 3_derived are written by the system; 4_generated by guide or system. Values at indicator paths are validated against the metamodel first."
    )]
    pub async fn write_digital_twin(
        &self,
        params: Parameters<WriteDigitalTwinParams>,
    ) -> Result<CallToolResult, McpError> {
        let WriteDigitalTwinParams { path, data } = params.0;

        let parsed = TwinPath::parse(&path).map_err(|e| McpError::invalid_params(e.to_string(), None))?;
        let parsed = self.metamodel.canonical_path(parsed);
        if !parsed.is_root() {
            authorize(&parsed, self.caller.role, Operation::Write).map_err(|denied| {
                tracing::warn!(user = %self.caller.user_id, "{}", denied);
                twin_error(denied.into())
            })?;
        }

        let indicator = self.metamodel.resolve(&parsed).map(|entry| entry.indicator);
        if let Some(indicator) = indicator {
            let report = validate_value(indicator, &data);
            if !report.valid {
                tracing::info!(
                    user = %self.caller.user_id,
                    indicator = %indicator.code,
                    "write rejected by validation"
                );
                return json_error_result(&RejectedWrite {
                    success: false,
                    path: parsed.to_string(),
                    validation: report,
                });
            }
        }

        let outcome = self
            .twin
            .write(&self.caller, &parsed.to_string(), data)
            .map_err(twin_error)?;

        json_result(&WriteResult {
            success: true,
            path: outcome.path.to_string(),
            category: outcome.category,
            created: outcome.action == KeyAction::Added,
            persisted: self.twin.is_persistent(),
            indicator: indicator.map(|i| i.code.clone()),
        })
    }

    /// List the four data categories
    #[tool(
        description = "List the four data categories (1_declarative, 2_collected, 3_derived, 4_generated) with group and indicator counts and per-role read/write/generate access."
    )]
    pub async fn get_categories(&self) -> Result<CallToolResult, McpError> {
        let categories = self.metamodel.category_summaries();
        json_result(&json!({
            "count": categories.len(),
            "categories": categories,
        }))
    }

    /// List indicator groups
    #[tool(description = "Get all indicator groups with their category, path and indicator count.")]
    pub async fn get_indicator_groups(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.metamodel.groups())
    }

    /// List qualification degrees
    #[tool(
        description = "Get all qualification degrees (DEG.*) from Freshman to Public Figure, ordered, with descriptions."
    )]
    pub async fn get_degrees(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.metamodel.degree_list())
    }

    /// List student stages
    #[tool(description = "Get all student stages (STG.Student.*) within the Student degree, ordered.")]
    pub async fn get_stages(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.metamodel.stage_list())
    }

    /// List indicators with optional filters
    #[tool(
        description = "Get indicators from the metamodel. Optionally filter by group (category code, group code or 'category/group') and by the for_prompts / for_qualification flags."
    )]
    pub async fn get_indicators(
        &self,
        params: Parameters<GetIndicatorsParams>,
    ) -> Result<CallToolResult, McpError> {
        let GetIndicatorsParams {
            group,
            for_prompts,
            for_qualification,
        } = params.0;
        let filter = IndicatorFilter {
            group,
            for_prompts,
            for_qualification,
        };
        json_result(&self.metamodel.list_indicators(&filter))
    }

    /// Get one indicator
    #[tool(description = "Get a single indicator by its code with full details including thresholds.")]
    pub async fn get_indicator(
        &self,
        params: Parameters<GetIndicatorParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.metamodel.indicator(&params.0.code))
    }

    /// Get per-stage thresholds
    #[tool(
        description = "Get threshold values for an indicator across all student stages, ordered by stage. Indicators without thresholds return a message."
    )]
    pub async fn get_stage_thresholds(
        &self,
        params: Parameters<GetStageThresholdsParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.metamodel.stage_thresholds(&params.0.indicator))
    }

    /// Validate a value against an indicator
    #[tool(
        description = "Validate a value against an indicator's declared format, enum values, and min/max range."
    )]
    pub async fn validate_value(
        &self,
        params: Parameters<ValidateValueParams>,
    ) -> Result<CallToolResult, McpError> {
        let ValidateValueParams { indicator, value } = params.0;
        json_result(&self.metamodel.validate(&indicator, &value))
    }
}

impl TwinMcpServer {
    /// The static tool catalogue with input schemas.
    pub fn tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    /// Dispatch a `tools/call` by name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = name, user = %self.caller.user_id, "tool call");

        match name {
            "describe_by_path" => {
                self.describe_by_path(Parameters(parse_arguments(name, arguments)?))
                    .await
            }
            "read_digital_twin" => {
                self.read_digital_twin(Parameters(parse_arguments(name, arguments)?))
                    .await
            }
            "write_digital_twin" => {
                self.write_digital_twin(Parameters(parse_arguments(name, arguments)?))
                    .await
            }
            "get_categories" => self.get_categories().await,
            "get_indicator_groups" => self.get_indicator_groups().await,
            "get_degrees" => self.get_degrees().await,
            "get_stages" => self.get_stages().await,
            "get_indicators" => {
                self.get_indicators(Parameters(parse_arguments(name, arguments)?))
                    .await
            }
            "get_indicator" => {
                self.get_indicator(Parameters(parse_arguments(name, arguments)?))
                    .await
            }
            "get_stage_thresholds" => {
                self.get_stage_thresholds(Parameters(parse_arguments(name, arguments)?))
                    .await
            }
            "validate_value" => {
                self.validate_value(Parameters(parse_arguments(name, arguments)?))
                    .await
            }
            other => Err(McpError::invalid_params(format!("Unknown tool: {}", other), None)),
        }
    }

    /// Summary served at `GET /mcp`.
    pub fn info(&self, transport: &'static str, auth: &'static str) -> ServerInfoDto {
        let metamodel = &self.metamodel;
        ServerInfoDto {
            name: SERVER_NAME,
            version: env!("CARGO_PKG_VERSION"),
            transport,
            auth,
            storage: self.twin.store_kind(),
            tools: self.tools().into_iter().map(|t| t.name.to_string()).collect(),
            metamodel: MetamodelStats {
                version: metamodel.version.clone(),
                categories: metamodel.categories.len(),
                groups: metamodel.group_count(),
                indicators: metamodel.indicator_count(),
                degrees: metamodel.degrees.len(),
                stages: metamodel.stages.len(),
            },
        }
    }

    /// Indicator paths spelled with underscores map onto the declared key.
    fn canonical(&self, raw: &str) -> String {
        match TwinPath::parse(raw) {
            Ok(path) if !path.is_root() => self.metamodel.canonical_path(path).to_string(),
            _ => raw.to_string(),
        }
    }
}

fn display_path(raw: &str) -> String {
    match TwinPath::parse(raw) {
        Ok(path) if path.is_root() => "/".to_string(),
        Ok(path) => path.to_string(),
        Err(_) => raw.to_string(),
    }
}

#[tool_handler]
impl ServerHandler for TwinMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name = SERVER_NAME.into();
        server_info.version = env!("CARGO_PKG_VERSION").into();

        ServerInfo {
            server_info,
            instructions: Some(
                "Digital twin MCP gives AI agents access to a learner's profile data and the indicator metamodel that describes it.\n\n\
                 Metamodel tools (read-only):\n\
                 1. describe_by_path - Browse categories, groups and indicators\n\
                 2. get_categories / get_indicator_groups - List the structure with counts\n\
                 3. get_indicators / get_indicator - Indicator definitions and flags\n\
                 4. get_degrees / get_stages - Learner progression levels\n\
                 5. get_stage_thresholds - Qualification thresholds per stage\n\
                 6. validate_value - Check a value before writing it\n\n\
                 Data tools:\n\
                 7. read_digital_twin - Read your twin by path\n\
                 8. write_digital_twin - Write your twin by path\n\n\
                 Paths use dots or slashes, e.g. '1_declarative/1_2_goals/09_Цели обучения'.\n\
                 The first segment is the category and decides access: users write 1_declarative only."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Serve MCP over stdin/stdout until the client disconnects.
pub async fn serve_stdio(server: TwinMcpServer) -> Result<()> {
    let caller = server.caller();
    tracing::info!(user = %caller.user_id, role = %caller.role, "serving MCP over stdio");
    let running = server.serve(rmcp::transport::stdio()).await?;
    running.waiting().await?;
    Ok(())
}
