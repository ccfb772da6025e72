//! Built-in resources: `info://server`, `greeting://{name}`, `data://{id}`.

use chrono::{Local, SecondsFormat};
use serde_json::json;

use crate::config::ServerIdentity;
use crate::host::{CapabilityHost, HostResult, Payload, ResourceMeta, MIME_JSON};

/// Capability kinds advertised by `info://server`.
const CAPABILITIES: [&str; 3] = ["tools", "resources", "prompts"];

/// Registers the built-in resources.
///
/// # Errors
///
/// Returns a configuration error if a pattern is already taken.
pub fn register(host: &mut CapabilityHost, identity: &ServerIdentity) -> HostResult<()> {
    let info = json!({
        "name": identity.name,
        "version": identity.version,
        "capabilities": CAPABILITIES,
        "description": identity.description,
    });
    host.register_resource(
        "info://server",
        ResourceMeta::new("server-info", "Information about this MCP server")
            .with_mime_type(MIME_JSON),
        move |_| Ok(Payload::Json(info.clone())),
    )?;

    host.register_resource(
        "greeting://{name}",
        ResourceMeta::new("greeting", "A personalised greeting"),
        |bindings| {
            let name = bindings.get("name")?;
            Ok(Payload::Text(format!(
                "Hello, {name}! Welcome to the MCP server."
            )))
        },
    )?;

    // No backing store: records are synthesised from the id
    let source = identity.name.clone();
    host.register_resource(
        "data://{id}",
        ResourceMeta::new("data", "Access data by id").with_mime_type(MIME_JSON),
        move |bindings| {
            let id = bindings.get("id")?;
            Ok(Payload::Json(json!({
                "id": id,
                "timestamp": Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
                "status": "active",
                "metadata": {
                    "source": source,
                    "type": "example",
                },
            })))
        },
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_for(identity: &ServerIdentity) -> CapabilityHost {
        let mut host = CapabilityHost::new();
        register(&mut host, identity).unwrap();
        host
    }

    fn identity() -> ServerIdentity {
        ServerIdentity {
            name: "unit-test".to_string(),
            version: "0.0.1".to_string(),
            description: "testing".to_string(),
        }
    }

    #[test]
    fn info_reports_identity() {
        let host = host_for(&identity());
        let read = host.read_resource("info://server").unwrap();
        assert_eq!(read.mime_type, MIME_JSON);

        let value = read.payload.as_json().unwrap();
        assert_eq!(value["name"], "unit-test");
        assert_eq!(value["version"], "0.0.1");
        assert_eq!(value["capabilities"], json!(["tools", "resources", "prompts"]));
    }

    #[test]
    fn greeting_contains_name() {
        let host = host_for(&identity());
        let read = host.read_resource("greeting://Alice").unwrap();
        assert_eq!(read.uri, "greeting://Alice");
        assert!(read.payload.to_text().contains("Alice"));
    }

    #[test]
    fn data_echoes_id() {
        let host = host_for(&identity());
        let read = host.read_resource("data://item-42").unwrap();
        let value = read.payload.as_json().unwrap();
        assert_eq!(value["id"], "item-42");
        assert_eq!(value["status"], "active");
        assert_eq!(value["metadata"]["source"], "unit-test");
    }

    #[test]
    fn unknown_scheme_not_found() {
        let host = host_for(&identity());
        let err = host.read_resource("weather://London").unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
