//! Capability host: registry and dispatcher for tools, resources and prompts.
//!
//! The host has two phases. During start-up capabilities are registered
//! through `&mut self`; afterwards the host is shared read-only (usually in
//! an `Arc`) and every dispatch method takes `&self`. Duplicate
//! registrations are rejected with [`HostError::Configuration`] and leave the
//! existing entry untouched.
//!
//! # Dispatch
//!
//! - **Tools and prompts** are looked up by exact name, their arguments are
//!   validated against the declared [`ParamSchema`], then the handler runs.
//! - **Resources** are matched by URI. A literal pattern equal to the URI
//!   wins outright. Otherwise the matching template with the fewest
//!   placeholders wins, and ties go to the earlier registration.
//!
//! Handler failures are reported as [`HostError::Handler`] with the
//! handler's message; the original error type is not exposed.

mod error;
mod schema;
mod template;

pub use error::{CapabilityKind, HandlerResult, HostError, HostResult};
pub use schema::{Arguments, ParamSchema, ParamSpec, ParamType};
pub use template::{Bindings, UriPattern, UriTemplate};

use std::fmt;

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// MIME type for plain text payloads.
pub const MIME_TEXT: &str = "text/plain";

/// MIME type for structured payloads.
pub const MIME_JSON: &str = "application/json";

/// A value produced by a tool or resource handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain text, passed through unchanged.
    Text(String),
    /// Structured data, rendered as JSON text on the wire.
    Json(Value),
}

impl Payload {
    /// Renders the payload as text.
    ///
    /// JSON payloads are pretty-printed; strings inside them stay escaped,
    /// so multi-line output is still a single valid JSON document.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    /// Returns the structured value, if this is a JSON payload.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Text(_) => None,
            Self::Json(value) => Some(value),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Speaker of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The model side of the conversation.
    Assistant,
}

/// One message of a prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    /// Who speaks.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl PromptMessage {
    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

type ToolHandler = dyn Fn(&Arguments) -> HandlerResult<Payload> + Send + Sync;
type ResourceHandler = dyn Fn(&Bindings) -> HandlerResult<Payload> + Send + Sync;
type PromptHandler = dyn Fn(&Arguments) -> HandlerResult<Vec<PromptMessage>> + Send + Sync;

/// A registered tool.
pub struct ToolDescriptor {
    name: String,
    description: String,
    schema: ParamSchema,
    handler: Box<ToolHandler>,
}

impl ToolDescriptor {
    /// Tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters.
    #[must_use]
    pub const fn schema(&self) -> &ParamSchema {
        &self.schema
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Display metadata for a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMeta {
    /// Short display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the payload.
    pub mime_type: String,
}

impl ResourceMeta {
    /// Creates metadata for a plain text resource.
    #[must_use]
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            mime_type: MIME_TEXT.to_string(),
        }
    }

    /// Overrides the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = mime_type.to_string();
        self
    }
}

/// A registered resource.
pub struct ResourceDescriptor {
    pattern: UriPattern,
    meta: ResourceMeta,
    handler: Box<ResourceHandler>,
}

impl ResourceDescriptor {
    /// URI pattern the resource answers to.
    #[must_use]
    pub const fn pattern(&self) -> &UriPattern {
        &self.pattern
    }

    /// Display metadata.
    #[must_use]
    pub const fn meta(&self) -> &ResourceMeta {
        &self.meta
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("pattern", &self.pattern.as_str())
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// A registered prompt.
pub struct PromptDescriptor {
    name: String,
    description: String,
    schema: ParamSchema,
    handler: Box<PromptHandler>,
}

impl PromptDescriptor {
    /// Prompt name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters.
    #[must_use]
    pub const fn schema(&self) -> &ParamSchema {
        &self.schema
    }
}

impl fmt::Debug for PromptDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptDescriptor")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// The result of reading a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceContents {
    /// The URI that was requested.
    pub uri: String,
    /// MIME type declared by the matched resource.
    pub mime_type: String,
    /// Handler output.
    pub payload: Payload,
}

/// Registry of tools, resources and prompts.
#[derive(Debug, Default)]
pub struct CapabilityHost {
    tools: IndexMap<String, ToolDescriptor>,
    resources: IndexMap<String, ResourceDescriptor>,
    prompts: IndexMap<String, PromptDescriptor>,
}

impl CapabilityHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Configuration`] if a tool with this name exists
    /// or the schema declares a parameter twice.
    pub fn register_tool<F>(
        &mut self,
        name: &str,
        description: &str,
        schema: ParamSchema,
        handler: F,
    ) -> HostResult<()>
    where
        F: Fn(&Arguments) -> HandlerResult<Payload> + Send + Sync + 'static,
    {
        schema.check(name)?;
        match self.tools.entry(name.to_string()) {
            Entry::Occupied(_) => Err(HostError::duplicate(CapabilityKind::Tool, name)),
            Entry::Vacant(slot) => {
                slot.insert(ToolDescriptor {
                    name: name.to_string(),
                    description: description.to_string(),
                    schema,
                    handler: Box::new(handler),
                });
                debug!(tool = %name, "Registered tool");
                Ok(())
            }
        }
    }

    /// Registers a resource under a literal URI or a URI template.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Configuration`] if the pattern is already
    /// registered or is not a well-formed template.
    pub fn register_resource<F>(
        &mut self,
        uri_pattern: &str,
        meta: ResourceMeta,
        handler: F,
    ) -> HostResult<()>
    where
        F: Fn(&Bindings) -> HandlerResult<Payload> + Send + Sync + 'static,
    {
        let pattern = UriPattern::parse(uri_pattern)?;
        match self.resources.entry(uri_pattern.to_string()) {
            Entry::Occupied(_) => Err(HostError::duplicate(
                CapabilityKind::Resource,
                uri_pattern,
            )),
            Entry::Vacant(slot) => {
                slot.insert(ResourceDescriptor {
                    pattern,
                    meta,
                    handler: Box::new(handler),
                });
                debug!(uri = %uri_pattern, "Registered resource");
                Ok(())
            }
        }
    }

    /// Registers a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Configuration`] if a prompt with this name exists
    /// or the schema declares a parameter twice.
    pub fn register_prompt<F>(
        &mut self,
        name: &str,
        description: &str,
        schema: ParamSchema,
        handler: F,
    ) -> HostResult<()>
    where
        F: Fn(&Arguments) -> HandlerResult<Vec<PromptMessage>> + Send + Sync + 'static,
    {
        schema.check(name)?;
        match self.prompts.entry(name.to_string()) {
            Entry::Occupied(_) => Err(HostError::duplicate(CapabilityKind::Prompt, name)),
            Entry::Vacant(slot) => {
                slot.insert(PromptDescriptor {
                    name: name.to_string(),
                    description: description.to_string(),
                    schema,
                    handler: Box::new(handler),
                });
                debug!(prompt = %name, "Registered prompt");
                Ok(())
            }
        }
    }

    /// Returns all tools in registration order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().collect()
    }

    /// Returns literal resources in registration order.
    #[must_use]
    pub fn list_resources(&self) -> Vec<&ResourceDescriptor> {
        self.resources
            .values()
            .filter(|r| r.pattern.is_literal())
            .collect()
    }

    /// Returns templated resources in registration order.
    #[must_use]
    pub fn list_resource_templates(&self) -> Vec<&ResourceDescriptor> {
        self.resources
            .values()
            .filter(|r| !r.pattern.is_literal())
            .collect()
    }

    /// Returns all prompts in registration order.
    #[must_use]
    pub fn list_prompts(&self) -> Vec<&PromptDescriptor> {
        self.prompts.values().collect()
    }

    /// Invokes a tool by name.
    ///
    /// # Errors
    ///
    /// - [`HostError::NotFound`] if no tool has this name
    /// - [`HostError::Validation`] if an argument is missing or mistyped
    /// - [`HostError::Handler`] if the tool itself fails
    pub fn invoke_tool(&self, name: &str, args: Option<&Value>) -> HostResult<Payload> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| HostError::not_found(CapabilityKind::Tool, name))?;
        let arguments = tool.schema.validate(args)?;

        debug!(tool = %name, "Invoking tool");
        (tool.handler)(&arguments).map_err(|e| handler_failed(CapabilityKind::Tool, name, &*e))
    }

    /// Reads a resource by URI.
    ///
    /// # Errors
    ///
    /// - [`HostError::NotFound`] if no pattern matches the URI
    /// - [`HostError::Handler`] if the resource handler fails
    pub fn read_resource(&self, uri: &str) -> HostResult<ResourceContents> {
        let (resource, bindings) = self
            .resolve_resource(uri)
            .ok_or_else(|| HostError::not_found(CapabilityKind::Resource, uri))?;

        debug!(uri = %uri, pattern = %resource.pattern.as_str(), "Reading resource");
        let payload = (resource.handler)(&bindings)
            .map_err(|e| handler_failed(CapabilityKind::Resource, uri, &*e))?;

        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: resource.meta.mime_type.clone(),
            payload,
        })
    }

    /// Invokes a prompt by name, returning its messages in order.
    ///
    /// # Errors
    ///
    /// Same categories as [`Self::invoke_tool`].
    pub fn invoke_prompt(
        &self,
        name: &str,
        args: Option<&Value>,
    ) -> HostResult<Vec<PromptMessage>> {
        let prompt = self
            .prompts
            .get(name)
            .ok_or_else(|| HostError::not_found(CapabilityKind::Prompt, name))?;
        let arguments = prompt.schema.validate(args)?;

        debug!(prompt = %name, "Rendering prompt");
        (prompt.handler)(&arguments)
            .map_err(|e| handler_failed(CapabilityKind::Prompt, name, &*e))
    }

    /// Looks up a prompt descriptor by name.
    #[must_use]
    pub fn prompt(&self, name: &str) -> Option<&PromptDescriptor> {
        self.prompts.get(name)
    }

    /// Finds the resource answering to a URI.
    fn resolve_resource(&self, uri: &str) -> Option<(&ResourceDescriptor, Bindings)> {
        if let Some(literal) = self.resources.get(uri).filter(|r| r.pattern.is_literal()) {
            return Some((literal, Bindings::default()));
        }

        // min_by_key keeps the first of equal minima, i.e. the earliest registration
        self.resources
            .values()
            .filter(|r| !r.pattern.is_literal())
            .filter_map(|r| r.pattern.match_uri(uri).map(|b| (r, b)))
            .min_by_key(|(r, _)| r.pattern.wildcard_count())
    }
}

fn handler_failed(
    kind: CapabilityKind,
    name: &str,
    error: &(dyn std::error::Error + Send + Sync),
) -> HostError {
    warn!(%kind, name = %name, error = %error, "Handler failed");
    HostError::Handler {
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_resource(text: &'static str) -> impl Fn(&Bindings) -> HandlerResult<Payload> {
        move |_| Ok(Payload::from(text))
    }

    #[test]
    fn duplicate_tool_keeps_first() {
        let mut host = CapabilityHost::new();
        host.register_tool("t", "", ParamSchema::new(), |_| Ok("first".into()))
            .unwrap();
        let err = host
            .register_tool("t", "", ParamSchema::new(), |_| Ok("second".into()))
            .unwrap_err();
        assert_eq!(err.kind(), "configuration_error");

        let out = host.invoke_tool("t", None).unwrap();
        assert_eq!(out, Payload::Text("first".to_string()));
        assert_eq!(host.list_tools().len(), 1);
    }

    #[test]
    fn duplicate_resource_and_prompt_rejected() {
        let mut host = CapabilityHost::new();
        let meta = ResourceMeta::new("x", "");
        host.register_resource("x://{id}", meta.clone(), text_resource("a"))
            .unwrap();
        assert!(host
            .register_resource("x://{id}", meta, text_resource("b"))
            .is_err());

        host.register_prompt("p", "", ParamSchema::new(), |_| Ok(vec![]))
            .unwrap();
        assert!(host
            .register_prompt("p", "", ParamSchema::new(), |_| Ok(vec![]))
            .is_err());
    }

    #[test]
    fn handler_error_is_wrapped() {
        let mut host = CapabilityHost::new();
        host.register_tool("boom", "", ParamSchema::new(), |_| {
            Err("disk on fire".into())
        })
        .unwrap();

        match host.invoke_tool("boom", None).unwrap_err() {
            HostError::Handler { message } => assert_eq!(message, "disk on fire"),
            other => panic!("Expected Handler, got {other:?}"),
        }
        // Registry is still usable afterwards
        assert!(host.invoke_tool("boom", Some(&json!({}))).is_err());
        assert_eq!(host.list_tools().len(), 1);
    }

    #[test]
    fn literal_beats_template() {
        let mut host = CapabilityHost::new();
        host.register_resource("user://{id}", ResourceMeta::new("t", ""), text_resource("template"))
            .unwrap();
        host.register_resource("user://me", ResourceMeta::new("l", ""), text_resource("literal"))
            .unwrap();

        let read = host.read_resource("user://me").unwrap();
        assert_eq!(read.payload, Payload::Text("literal".to_string()));
        let read = host.read_resource("user://42").unwrap();
        assert_eq!(read.payload, Payload::Text("template".to_string()));
    }

    #[test]
    fn fewer_placeholders_win() {
        let mut host = CapabilityHost::new();
        host.register_resource("r://{a}/{b}", ResourceMeta::new("two", ""), text_resource("two"))
            .unwrap();
        host.register_resource("r://{a}/fixed", ResourceMeta::new("one", ""), text_resource("one"))
            .unwrap();

        let read = host.read_resource("r://x/fixed").unwrap();
        assert_eq!(read.payload, Payload::Text("one".to_string()));
        let read = host.read_resource("r://x/other").unwrap();
        assert_eq!(read.payload, Payload::Text("two".to_string()));
    }

    #[test]
    fn ties_go_to_first_registration() {
        let mut host = CapabilityHost::new();
        host.register_resource("r://{a}", ResourceMeta::new("first", ""), text_resource("first"))
            .unwrap();
        host.register_resource("r://{b}", ResourceMeta::new("second", ""), text_resource("second"))
            .unwrap();

        let read = host.read_resource("r://x").unwrap();
        assert_eq!(read.payload, Payload::Text("first".to_string()));
    }

    #[test]
    fn unmatched_uri_is_not_found() {
        let host = CapabilityHost::new();
        let err = host.read_resource("nothing://here").unwrap_err();
        assert!(matches!(
            err,
            HostError::NotFound {
                kind: CapabilityKind::Resource,
                ..
            }
        ));
    }

    #[test]
    fn resource_listing_splits_literals_and_templates() {
        let mut host = CapabilityHost::new();
        host.register_resource("a://x", ResourceMeta::new("a", ""), text_resource("a"))
            .unwrap();
        host.register_resource("b://{y}", ResourceMeta::new("b", ""), text_resource("b"))
            .unwrap();

        let literals: Vec<_> = host
            .list_resources()
            .iter()
            .map(|r| r.meta().name.clone())
            .collect();
        let templates: Vec<_> = host
            .list_resource_templates()
            .iter()
            .map(|r| r.meta().name.clone())
            .collect();
        assert_eq!(literals, vec!["a"]);
        assert_eq!(templates, vec!["b"]);
    }

    #[test]
    fn json_payload_renders_as_json_text() {
        let payload = Payload::from(json!({"ok": true}));
        let text = payload.to_text();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, json!({"ok": true}));
    }
}
