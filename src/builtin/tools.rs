//! Built-in tools: `add`, `echo`, `timestamp`.

use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use serde_json::{json, Value};

use crate::host::{
    Arguments, CapabilityHost, HandlerResult, HostResult, ParamSchema, ParamType, Payload,
};

/// Registers the built-in tools in listing order.
///
/// # Errors
///
/// Returns a configuration error if a tool name is already taken.
pub fn register(host: &mut CapabilityHost) -> HostResult<()> {
    host.register_tool(
        "add",
        "Add two numbers together",
        ParamSchema::new()
            .required("a", ParamType::Number, "First number")
            .required("b", ParamType::Number, "Second number"),
        add,
    )?;
    host.register_tool(
        "echo",
        "Echo back the provided text",
        ParamSchema::new().required("message", ParamType::String, "Message to echo"),
        echo,
    )?;
    host.register_tool(
        "timestamp",
        "Get the current timestamp in ISO, Unix and local formats",
        ParamSchema::new(),
        |_| Ok(Payload::Json(timestamp_payload(&Local::now()))),
    )?;
    Ok(())
}

fn add(args: &Arguments) -> HandlerResult<Payload> {
    let (a, b) = (args.f64("a")?, args.f64("b")?);
    let sum = a + b;
    // JSON has no encoding for infinities
    if !sum.is_finite() {
        return Err(format!("sum of {a} and {b} is not a finite number").into());
    }
    Ok(Payload::Json(json!(sum)))
}

fn echo(args: &Arguments) -> HandlerResult<Payload> {
    Ok(Payload::Text(args.str("message")?.to_string()))
}

/// Renders one instant in the three formats the `timestamp` tool reports.
///
/// `iso` is truncated to whole seconds so that it names the same instant
/// as `unix`.
#[must_use]
pub fn timestamp_payload<Tz>(now: &DateTime<Tz>) -> Value
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    json!({
        "iso": now.to_rfc3339_opts(SecondsFormat::Secs, false),
        "unix": now.timestamp(),
        "local": now.format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}
