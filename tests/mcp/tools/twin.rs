use std::fs;

use rmcp::{handler::server::wrapper::Parameters, model::ErrorCode};
use serde_json::{Map, json};
use twin_mcp::{
    mcp::{
        ACCESS_DENIED,
        types::{ReadDigitalTwinParams, WriteDigitalTwinParams},
    },
    twin::access::Role,
};

use crate::{LEARNER, McpTestFixture, extract_tool_error_json, extract_tool_result_json};

const GOALS_PATH: &str = "1_declarative/1_2_goals/09_Цели обучения";
const REPORT_TIME_PATH: &str = "1_declarative/1_4_context/02_Время отчёта за день";

fn read(path: &str) -> Parameters<ReadDigitalTwinParams> {
    Parameters(ReadDigitalTwinParams {
        path: Some(path.to_string()),
    })
}

fn write(path: &str, data: serde_json::Value) -> Parameters<WriteDigitalTwinParams> {
    Parameters(WriteDigitalTwinParams {
        path: path.to_string(),
        data,
    })
}

// ============================================================================
// write_digital_twin / read_digital_twin tests
// ============================================================================

#[tokio::test]
async fn test_write_then_read_round_trip() {
    let fixture = McpTestFixture::new();
    let server = fixture.server(Role::User);

    let result = server
        .write_digital_twin(write(GOALS_PATH, json!("Learn systems thinking")))
        .await
        .unwrap();
    let json = extract_tool_result_json(&result);
    assert_eq!(json["success"], true);
    assert_eq!(json["category"], "1_declarative");
    assert_eq!(json["created"], true);
    assert_eq!(json["persisted"], false);
    assert_eq!(json["indicator"], "IND.1.2.2");
    assert_eq!(json["path"], "1_declarative.1_2_goals.09_Цели обучения");

    // Dot and slash notation address the same value.
    let result = server
        .read_digital_twin(read("1_declarative.1_2_goals.09_Цели обучения"))
        .await
        .unwrap();
    let json = extract_tool_result_json(&result);
    assert_eq!(json["found"], true);
    assert_eq!(json["value"], "Learn systems thinking");
}

#[tokio::test]
async fn test_indicator_key_spellings_share_one_slot() {
    let fixture = McpTestFixture::new();
    let server = fixture.server(Role::User);

    let result = server
        .write_digital_twin(write("1_declarative.1_2_goals.09_Цели_обучения", json!("A")))
        .await
        .unwrap();
    let json = extract_tool_result_json(&result);
    assert_eq!(json["created"], true);
    assert_eq!(json["path"], "1_declarative.1_2_goals.09_Цели обучения");

    let result = server
        .write_digital_twin(write(GOALS_PATH, json!("B")))
        .await
        .unwrap();
    let json = extract_tool_result_json(&result);
    assert_eq!(json["created"], false);
    assert_eq!(json["indicator"], "IND.1.2.2");

    let result = server
        .read_digital_twin(read("1_declarative/1_2_goals/09_Цели_обучения"))
        .await
        .unwrap();
    assert_eq!(extract_tool_result_json(&result)["value"], "B");

    let result = server
        .read_digital_twin(read("1_declarative/1_2_goals"))
        .await
        .unwrap();
    assert_eq!(
        extract_tool_result_json(&result)["value"],
        json!({"09_Цели обучения": "B"})
    );
}

#[tokio::test]
async fn test_overwrite_reports_update() {
    let fixture = McpTestFixture::new();
    let server = fixture.server(Role::User);

    server
        .write_digital_twin(write("1_declarative/notes", json!("first")))
        .await
        .unwrap();
    let result = server
        .write_digital_twin(write("1_declarative/notes", json!({"text": "second"})))
        .await
        .unwrap();
    let json = extract_tool_result_json(&result);
    assert_eq!(json["created"], false);
    assert!(json.get("indicator").is_none());

    let json = extract_tool_result_json(
        &server.read_digital_twin(read("1_declarative/notes/text")).await.unwrap(),
    );
    assert_eq!(json["value"], "second");
}

#[tokio::test]
async fn test_read_missing_path_is_not_an_error() {
    let fixture = McpTestFixture::new();
    let server = fixture.server(Role::User);

    let result = server
        .read_digital_twin(read("1_declarative/1_2_goals/missing"))
        .await
        .unwrap();
    let json = extract_tool_result_json(&result);
    assert_eq!(json["found"], false);
    assert_eq!(json["message"], "Path not found: 1_declarative.1_2_goals.missing");
    assert!(json.get("value").is_none());
}

#[tokio::test]
async fn test_root_read_is_filtered_by_role() {
    let fixture = McpTestFixture::new();
    fixture
        .server(Role::User)
        .write_digital_twin(write("1_declarative/notes", json!("mine")))
        .await
        .unwrap();
    fixture
        .server(Role::System)
        .write_digital_twin(write("2_collected/2_5_finance/01_Статус подписки", json!("pro")))
        .await
        .unwrap();

    let json = extract_tool_result_json(
        &fixture
            .server(Role::User)
            .read_digital_twin(Parameters(ReadDigitalTwinParams::default()))
            .await
            .unwrap(),
    );
    assert_eq!(json["path"], "/");
    assert_eq!(json["value"]["1_declarative"]["notes"], "mine");
    assert_eq!(json["value"]["2_collected"]["2_5_finance"]["01_Статус подписки"], "pro");

    // System writes collected data but has no read flag on it.
    let json = extract_tool_result_json(
        &fixture
            .server(Role::System)
            .read_digital_twin(read("/"))
            .await
            .unwrap(),
    );
    assert!(json["value"].get("2_collected").is_none());
    assert_eq!(json["value"]["1_declarative"]["notes"], "mine");
}

#[tokio::test]
async fn test_documents_are_per_user() {
    let fixture = McpTestFixture::new();
    fixture
        .server_for("alice", Role::User)
        .write_digital_twin(write("1_declarative/notes", json!("alice's")))
        .await
        .unwrap();

    let json = extract_tool_result_json(
        &fixture
            .server_for("bob", Role::User)
            .read_digital_twin(read("1_declarative/notes"))
            .await
            .unwrap(),
    );
    assert_eq!(json["found"], false);
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
async fn test_user_cannot_write_collected() {
    let fixture = McpTestFixture::new();
    let err = fixture
        .server(Role::User)
        .write_digital_twin(write("2_collected/2_5_finance/01_Статус подписки", json!("pro")))
        .await
        .unwrap_err();

    assert_eq!(err.code, ACCESS_DENIED);
    assert_eq!(err.message, "Access denied: role 'user' cannot write '2_collected'");
    let data = err.data.unwrap();
    assert_eq!(data["role"], "user");
    assert_eq!(data["operation"], "write");
}

#[tokio::test]
async fn test_system_writes_collected() {
    let fixture = McpTestFixture::new();
    let result = fixture
        .server(Role::System)
        .write_digital_twin(write("2_collected/2_5_finance/01_Статус подписки", json!("pro")))
        .await
        .unwrap();
    assert_eq!(extract_tool_result_json(&result)["category"], "2_collected");
}

#[tokio::test]
async fn test_generated_needs_generate_flag() {
    let fixture = McpTestFixture::new();

    let err = fixture
        .server(Role::User)
        .write_digital_twin(write("4_generated/summary", json!("text")))
        .await
        .unwrap_err();
    assert_eq!(err.code, ACCESS_DENIED);

    let result = fixture
        .server(Role::Guide)
        .write_digital_twin(write("4_generated/summary", json!("text")))
        .await
        .unwrap();
    assert_eq!(extract_tool_result_json(&result)["category"], "4_generated");
}

#[tokio::test]
async fn test_guide_cannot_write_declarative() {
    let fixture = McpTestFixture::new();
    let err = fixture
        .server(Role::Guide)
        .write_digital_twin(write("1_declarative/notes", json!("x")))
        .await
        .unwrap_err();
    assert_eq!(err.code, ACCESS_DENIED);
}

#[tokio::test]
async fn test_unknown_category_denied() {
    let fixture = McpTestFixture::new();
    let server = fixture.server(Role::System);

    let err = server
        .write_digital_twin(write("5_unknown/x", json!(1)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ACCESS_DENIED);

    let err = server.read_digital_twin(read("5_unknown")).await.unwrap_err();
    assert_eq!(err.code, ACCESS_DENIED);
}

#[tokio::test]
async fn test_denied_check_runs_before_validation() {
    let fixture = McpTestFixture::new();
    // Invalid value for an integer indicator, but the role check fails first.
    let err = fixture
        .server(Role::User)
        .write_digital_twin(write("2_collected/2_5_finance/02_Реферальная активность", json!("many")))
        .await
        .unwrap_err();
    assert_eq!(err.code, ACCESS_DENIED);
}

#[tokio::test]
async fn test_invalid_paths() {
    let fixture = McpTestFixture::new();
    let server = fixture.server(Role::User);

    let err = server
        .write_digital_twin(write("/", json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

    let err = server
        .write_digital_twin(write("1_declarative//notes", json!(1)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
}

// ============================================================================
// Validation on write
// ============================================================================

#[tokio::test]
async fn test_invalid_indicator_value_rejected() {
    let fixture = McpTestFixture::new();
    let server = fixture.server(Role::User);

    let result = server
        .write_digital_twin(write(REPORT_TIME_PATH, json!("25:99")))
        .await
        .unwrap();
    let json = extract_tool_error_json(&result);
    assert_eq!(json["success"], false);
    assert_eq!(json["validation"]["valid"], false);
    assert_eq!(json["validation"]["indicator"], "IND.1.4.4");
    assert_eq!(json["validation"]["errors"][0], "Expected time string (HH:MM)");

    // Nothing was stored.
    let json = extract_tool_result_json(&server.read_digital_twin(read(REPORT_TIME_PATH)).await.unwrap());
    assert_eq!(json["found"], false);
}

#[tokio::test]
async fn test_valid_indicator_value_accepted() {
    let fixture = McpTestFixture::new();
    let result = fixture
        .server(Role::User)
        .write_digital_twin(write(REPORT_TIME_PATH, json!("21:30")))
        .await
        .unwrap();
    let json = extract_tool_result_json(&result);
    assert_eq!(json["indicator"], "IND.1.4.4");
}

// ============================================================================
// File store
// ============================================================================

#[tokio::test]
async fn test_file_store_persists_document() {
    let fixture = McpTestFixture::with_file_store().unwrap();
    let result = fixture
        .server(Role::User)
        .write_digital_twin(write(GOALS_PATH, json!("Finish the course")))
        .await
        .unwrap();
    assert_eq!(extract_tool_result_json(&result)["persisted"], true);

    let file = fixture.data_dir().unwrap().join(format!("{}.json", LEARNER));
    let content = fs::read_to_string(file).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(stored["1_declarative"]["1_2_goals"]["09_Цели обучения"], "Finish the course");
    assert!(content.ends_with('\n'));
}

// ============================================================================
// Dispatch by name
// ============================================================================

#[tokio::test]
async fn test_call_tool_by_name() {
    let fixture = McpTestFixture::new();
    let server = fixture.server(Role::User);

    let mut args = Map::new();
    args.insert("path".to_string(), json!("1_declarative/notes"));
    args.insert("data".to_string(), json!([1, 2, 3]));
    let result = server.call_tool("write_digital_twin", Some(args)).await.unwrap();
    assert_eq!(extract_tool_result_json(&result)["success"], true);

    let result = server.call_tool("read_digital_twin", None).await.unwrap();
    assert_eq!(extract_tool_result_json(&result)["value"]["1_declarative"]["notes"], json!([1, 2, 3]));

    let err = server.call_tool("drop_twin", None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    assert_eq!(err.message, "Unknown tool: drop_twin");

    let err = server.call_tool("write_digital_twin", None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
}
