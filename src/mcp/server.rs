//! MCP server lifecycle and method routing.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: `initialize` request, then the
//!    `notifications/initialized` notification
//! 2. **Operation**: list/call/read/get requests, routed to the
//!    [`CapabilityHost`]
//! 3. **Shutdown**: EOF on input or a termination signal
//!
//! Capability failures never end the session: each one becomes either an
//! `isError` tool result or a JSON-RPC error for that request alone.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ServerIdentity;
use crate::host::{CapabilityHost, CapabilityKind, HostError, PromptMessage, Role};
use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION,
};
use crate::mcp::transport::{LineTransport, StdioTransport};

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListCapability>,
    /// Resource-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceCapabilities>,
    /// Prompt-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListCapability>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ListCapability::default()),
            resources: Some(ResourceCapabilities::default()),
            prompts: Some(ListCapability::default()),
        }
    }
}

/// Capabilities of a listable collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListCapability {
    /// Whether the list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

/// Resource-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCapabilities {
    /// Whether clients can subscribe to resource updates.
    #[serde(skip_serializing_if = "is_false")]
    pub subscribe: bool,
    /// Whether the resource list can change during the session.
    #[serde(skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl From<&ServerIdentity> for ServerInfo {
    fn from(identity: &ServerIdentity) -> Self {
        Self {
            name: identity.name.clone(),
            version: identity.version.clone(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// A literal resource for resources/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    /// Resource URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the contents.
    pub mime_type: String,
}

/// A templated resource for resources/templates/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateDefinition {
    /// URI template with `{placeholder}` segments.
    pub uri_template: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the contents.
    pub mime_type: String,
}

/// A prompt argument for prompts/list response.
#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Whether the argument must be supplied.
    pub required: bool,
}

/// A prompt definition for prompts/list response.
#[derive(Debug, Clone, Serialize)]
pub struct PromptDefinition {
    /// Prompt name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Accepted arguments, in declaration order.
    pub arguments: Vec<PromptArgument>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Parameters for resources/read request.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResourceParams {
    /// URI to read.
    pub uri: String,
}

/// Parameters for prompts/get request.
#[derive(Debug, Clone, Deserialize)]
pub struct GetPromptParams {
    /// Name of the prompt.
    pub name: String,
    /// Arguments for the prompt.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// A content item in tool results and prompt messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<Content>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// A prompt message as sent on the wire.
#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: Role,
    content: Content,
}

impl From<PromptMessage> for WireMessage {
    fn from(message: PromptMessage) -> Self {
        Self {
            role: message.role,
            content: Content::Text {
                text: message.content,
            },
        }
    }
}

/// The MCP server.
pub struct McpServer<R = tokio::io::Stdin, W = tokio::io::Stdout> {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: LineTransport<R, W>,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<String>,
    /// Registered capabilities, read-only from here on.
    host: Arc<CapabilityHost>,
    /// Identity reported in `serverInfo`.
    identity: ServerIdentity,
}

impl McpServer {
    /// Creates a server speaking over stdin/stdout.
    #[must_use]
    pub fn new(host: Arc<CapabilityHost>, identity: ServerIdentity) -> Self {
        Self::with_transport(host, identity, StdioTransport::stdio())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server over an arbitrary transport.
    pub fn with_transport(
        host: Arc<CapabilityHost>,
        identity: ServerIdentity,
        transport: LineTransport<R, W>,
    ) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport,
            protocol_version: None,
            host,
            identity,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the protocol version agreed during initialisation.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Consumes the server, returning its transport.
    pub fn into_transport(self) -> LineTransport<R, W> {
        self.transport
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.run_with_shutdown().await
    }

    /// Serves messages until the input reaches EOF, without signal handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve(&mut self) -> std::io::Result<()> {
        loop {
            let line_result = self.transport.read_line().await;
            if self.handle_transport_result(line_result).await? {
                return Ok(());
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            tracing::info!("Input closed");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.handle_line(&line).await?;

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &str) -> std::io::Result<()> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => {
                tracing::debug!(id = %req.id, method = %req.method, "Request received");
                let outcome = self.dispatch(&req);
                match outcome {
                    Ok(resp) => self.transport.write_message(&resp).await,
                    Err(error) => self.transport.write_message(&error).await,
                }
            }
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(code = error.error.code, "Rejected malformed message");
                self.transport.write_message(&error).await
            }
        }
    }

    /// Handles an incoming notification.
    pub fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" if self.state == ServerState::Initialising => {
                tracing::info!("Client initialised, server running");
                self.state = ServerState::Running;
            }
            other => tracing::debug!(method = %other, "Ignoring notification"),
        }
    }

    /// Routes a request to its handler and builds the reply.
    ///
    /// # Errors
    ///
    /// Returns the JSON-RPC error to send back for this request.
    pub fn dispatch(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "ping" => Ok(Self::handle_ping(req)),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req),
            "resources/list" => self.handle_resources_list(req),
            "resources/templates/list" => self.handle_resource_templates_list(req),
            "resources/read" => self.handle_resources_read(req),
            "prompts/list" => self.handle_prompts_list(req),
            "prompts/get" => self.handle_prompts_get(req),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Server already initialised",
                ),
            ));
        }

        let params: InitializeParams = parse_params(req, "initialize")?;
        tracing::info!(
            requested_version = %params.protocol_version,
            client = params.client_info.as_ref().map_or("unknown", |c| c.name.as_str()),
            "Initialising session"
        );

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();

        self.protocol_version = Some(negotiated_version.clone());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::from(&self.identity),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let tools: Vec<ToolDefinition> = self
            .host
            .list_tools()
            .into_iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: Some(tool.description().to_string())
                    .filter(|d| !d.is_empty()),
                input_schema: tool.schema().to_json_schema(),
            })
            .collect();

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tools }),
        ))
    }

    /// Handles the tools/call request.
    fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = parse_params(req, "tool call")?;
        tracing::info!(tool = %params.name, "Tool call");

        let result = match self.host.invoke_tool(&params.name, params.arguments.as_ref()) {
            Ok(payload) => ToolCallResult::text(payload.to_text()),
            Err(
                error @ HostError::NotFound {
                    kind: CapabilityKind::Tool,
                    ..
                },
            ) => return Err(JsonRpcError::from_host_error(req.id.clone(), &error)),
            Err(error) => ToolCallResult::error(error.to_string()),
        };

        to_response(&req.id, &result)
    }

    /// Handles the resources/list request.
    fn handle_resources_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let resources: Vec<ResourceDefinition> = self
            .host
            .list_resources()
            .into_iter()
            .map(|r| ResourceDefinition {
                uri: r.pattern().as_str().to_string(),
                name: r.meta().name.clone(),
                description: r.meta().description.clone(),
                mime_type: r.meta().mime_type.clone(),
            })
            .collect();

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "resources": resources }),
        ))
    }

    /// Handles the resources/templates/list request.
    fn handle_resource_templates_list(
        &self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let templates: Vec<ResourceTemplateDefinition> = self
            .host
            .list_resource_templates()
            .into_iter()
            .map(|r| ResourceTemplateDefinition {
                uri_template: r.pattern().as_str().to_string(),
                name: r.meta().name.clone(),
                description: r.meta().description.clone(),
                mime_type: r.meta().mime_type.clone(),
            })
            .collect();

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "resourceTemplates": templates }),
        ))
    }

    /// Handles the resources/read request.
    fn handle_resources_read(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ReadResourceParams = parse_params(req, "resource read")?;
        tracing::info!(uri = %params.uri, "Resource read");

        let contents = self
            .host
            .read_resource(&params.uri)
            .map_err(|e| JsonRpcError::from_host_error(req.id.clone(), &e))?;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "contents": [{
                    "uri": contents.uri,
                    "mimeType": contents.mime_type,
                    "text": contents.payload.to_text(),
                }],
            }),
        ))
    }

    /// Handles the prompts/list request.
    fn handle_prompts_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let prompts: Vec<PromptDefinition> = self
            .host
            .list_prompts()
            .into_iter()
            .map(|p| PromptDefinition {
                name: p.name().to_string(),
                description: p.description().to_string(),
                arguments: p
                    .schema()
                    .params()
                    .iter()
                    .map(|param| PromptArgument {
                        name: param.name.clone(),
                        description: param.description.clone(),
                        required: param.required,
                    })
                    .collect(),
            })
            .collect();

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "prompts": prompts }),
        ))
    }

    /// Handles the prompts/get request.
    fn handle_prompts_get(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: GetPromptParams = parse_params(req, "prompt get")?;
        tracing::info!(prompt = %params.name, "Prompt get");

        let messages = self
            .host
            .invoke_prompt(&params.name, params.arguments.as_ref())
            .map_err(|e| JsonRpcError::from_host_error(req.id.clone(), &e))?;
        let description = self
            .host
            .prompt(&params.name)
            .map(|p| p.description().to_string())
            .unwrap_or_default();
        let messages: Vec<WireMessage> = messages.into_iter().map(WireMessage::from).collect();

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "description": description,
                "messages": messages,
            }),
        ))
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }
}

/// Deserialises request params, reporting problems as invalid params.
fn parse_params<T: DeserializeOwned>(req: &JsonRpcRequest, what: &str) -> Result<T, JsonRpcError> {
    req.params
        .as_ref()
        .map(|p| serde_json::from_value(p.clone()))
        .transpose()
        .map_err(|e| {
            JsonRpcError::invalid_params(req.id.clone(), format!("Invalid {what} params: {e}"))
        })?
        .ok_or_else(|| {
            JsonRpcError::invalid_params(req.id.clone(), format!("Missing {what} params"))
        })
}

/// Serialises a result struct into a success response.
fn to_response<T: Serialize>(id: &RequestId, result: &T) -> Result<JsonRpcResponse, JsonRpcError> {
    let value = serde_json::to_value(result).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialise result");
        JsonRpcError::internal_error(id.clone(), "Internal error: failed to serialise result")
    })?;
    Ok(JsonRpcResponse::success(id.clone(), value))
}
