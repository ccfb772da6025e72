//! Integration tests for MCP protocol handling.
//!
//! These tests drive the server through a full session over in-memory
//! streams: initialisation, capability listing, calls and error replies.

use std::sync::Arc;

use mcp_template_server::builtin;
use mcp_template_server::config::ServerIdentity;
use mcp_template_server::mcp::protocol::{parse_message, IncomingMessage, RequestId};
use mcp_template_server::mcp::server::ServerState;
use mcp_template_server::mcp::{LineTransport, McpServer};
use serde_json::{json, Value};

// =============================================================================
// Helpers
// =============================================================================

const INIT: &str = r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test-client","version":"1.0.0"}}}"#;
const INITIALIZED: &str = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;

/// Runs a session and returns every reply, keyed by position.
async fn run_session(lines: &[String]) -> (Vec<Value>, ServerState) {
    let identity = ServerIdentity {
        name: "integration".to_string(),
        version: "9.9.9".to_string(),
        description: "integration test server".to_string(),
    };
    let host = Arc::new(builtin::default_host(&identity).expect("builtin registration"));

    let mut input = lines.join("\n");
    input.push('\n');
    let transport = LineTransport::new(input.as_bytes(), Vec::new());

    let mut server = McpServer::with_transport(host, identity, transport);
    server.serve().await.expect("session I/O");
    let state = server.state();

    let output = String::from_utf8(server.into_transport().into_writer()).expect("utf-8 output");
    let replies = output
        .lines()
        .map(|l| serde_json::from_str(l).expect("reply is JSON"))
        .collect();
    (replies, state)
}

/// Runs an initialised session followed by `requests`, returning their replies.
async fn run_initialised(requests: &[Value]) -> Vec<Value> {
    let mut lines = vec![INIT.to_string(), INITIALIZED.to_string()];
    lines.extend(requests.iter().map(Value::to_string));

    let (mut replies, _) = run_session(&lines).await;
    assert_eq!(replies[0]["id"], 0, "first reply answers initialize");
    replies.remove(0);
    replies
}

fn call(id: i64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let result = parse_message(INIT);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::Number(0));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let result = parse_message(INITIALIZED);
    assert!(matches!(result, Ok(IncomingMessage::Notification(_))));
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let json = r#"{"id": 1, "method": "test"}"#;
    let err = parse_message(json).unwrap_err();
    assert_eq!(err.id, Some(RequestId::Number(1)));
}

// =============================================================================
// Session Tests
// =============================================================================

#[tokio::test]
async fn test_initialize_reports_identity() {
    let (replies, state) = run_session(&[INIT.to_string()]).await;
    assert_eq!(state, ServerState::ShuttingDown);

    let result = &replies[0]["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "integration");
    assert_eq!(result["serverInfo"]["version"], "9.9.9");
}

#[tokio::test]
async fn test_requests_before_initialized_are_rejected() {
    let (replies, _) = run_session(&[
        INIT.to_string(),
        call(1, "tools/list", json!({})).to_string(),
    ])
    .await;
    assert_eq!(replies[1]["error"]["code"], -32600);
}

#[tokio::test]
async fn test_unknown_method() {
    let replies = run_initialised(&[call(1, "sampling/createMessage", json!({}))]).await;
    assert_eq!(replies[0]["error"]["code"], -32601);
}

#[tokio::test]
async fn test_list_everything() {
    let replies = run_initialised(&[
        call(1, "tools/list", json!({})),
        call(2, "resources/list", json!({})),
        call(3, "resources/templates/list", json!({})),
        call(4, "prompts/list", json!({})),
    ])
    .await;

    let names = |reply: &Value, key: &str, field: &str| -> Vec<String> {
        reply["result"][key]
            .as_array()
            .expect("list array")
            .iter()
            .map(|item| item[field].as_str().expect("string field").to_string())
            .collect()
    };

    assert_eq!(names(&replies[0], "tools", "name"), ["add", "echo", "timestamp"]);
    assert_eq!(names(&replies[1], "resources", "uri"), ["info://server"]);
    assert_eq!(
        names(&replies[2], "resourceTemplates", "uriTemplate"),
        ["greeting://{name}", "data://{id}"]
    );
    assert_eq!(
        names(&replies[3], "prompts", "name"),
        ["analyze", "code_review", "summarize"]
    );

    let code_review = &replies[3]["result"]["prompts"][1];
    assert_eq!(code_review["arguments"][0]["name"], "code");
    assert_eq!(code_review["arguments"][0]["required"], true);
}

#[tokio::test]
async fn test_tool_calls() {
    let replies = run_initialised(&[
        call(1, "tools/call", json!({"name": "add", "arguments": {"a": 2, "b": 3.5}})),
        call(2, "tools/call", json!({"name": "echo", "arguments": {"message": "héllo ✓"}})),
        call(3, "tools/call", json!({"name": "add", "arguments": {"a": "x", "b": 3}})),
        call(4, "tools/call", json!({"name": "nonexistent", "arguments": {}})),
    ])
    .await;

    assert_eq!(replies[0]["result"]["content"][0]["text"], "5.5");
    assert_eq!(replies[1]["result"]["content"][0]["text"], "héllo ✓");

    assert_eq!(replies[2]["result"]["isError"], true);
    let text = replies[2]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("'a'"), "validation names field: {text}");

    assert_eq!(replies[3]["error"]["code"], -32602);
    assert_eq!(replies[3]["error"]["data"]["kind"], "not_found");
}

#[tokio::test]
async fn test_resource_reads() {
    let replies = run_initialised(&[
        call(1, "resources/read", json!({"uri": "greeting://Alice"})),
        call(2, "resources/read", json!({"uri": "info://server"})),
        call(3, "resources/read", json!({"uri": "missing://thing"})),
    ])
    .await;

    let greeting = &replies[0]["result"]["contents"][0];
    assert_eq!(greeting["uri"], "greeting://Alice");
    assert_eq!(greeting["mimeType"], "text/plain");
    assert!(greeting["text"].as_str().unwrap().contains("Alice"));

    let info = &replies[1]["result"]["contents"][0];
    assert_eq!(info["mimeType"], "application/json");
    let info: Value = serde_json::from_str(info["text"].as_str().unwrap()).unwrap();
    assert_eq!(info["name"], "integration");

    assert_eq!(replies[2]["error"]["code"], -32002);
}

#[tokio::test]
async fn test_prompt_get_and_errors() {
    let replies = run_initialised(&[
        call(1, "prompts/get", json!({"name": "code_review", "arguments": {"code": "let x = 1;"}})),
        call(2, "prompts/get", json!({"name": "code_review"})),
        call(3, "prompts/get", json!({"name": "poem"})),
    ])
    .await;

    let message = &replies[0]["result"]["messages"][0];
    assert_eq!(message["role"], "user");
    assert!(message["content"]["text"].as_str().unwrap().contains("let x = 1;"));

    assert_eq!(replies[1]["error"]["code"], -32602);
    assert_eq!(replies[1]["error"]["data"]["field"], "code");

    assert_eq!(replies[2]["error"]["code"], -32602);
}

#[tokio::test]
async fn test_failures_do_not_end_session() {
    let replies = run_initialised(&[
        json!({"not": "jsonrpc"}),
        call(1, "tools/call", json!({"name": "add", "arguments": {}})),
        call(2, "ping", json!({})),
    ])
    .await;

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["error"]["code"], -32600);
    assert_eq!(replies[1]["result"]["isError"], true);
    assert_eq!(replies[2]["id"], 2);
    assert_eq!(replies[2]["result"], json!({}));
}

#[tokio::test]
async fn test_wrong_version_reply_carries_id() {
    let replies = run_initialised(&[json!({"jsonrpc": "1.0", "id": 41, "method": "ping"})]).await;
    assert_eq!(replies[0]["id"], 41);
    assert_eq!(replies[0]["error"]["code"], -32600);
}
