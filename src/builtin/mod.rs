//! Example capabilities shipped with the template server.
//!
//! | Kind | Name | Notes |
//! |------|------|-------|
//! | Tool | `add` | Sum of two numbers |
//! | Tool | `echo` | Returns its input unchanged |
//! | Tool | `timestamp` | Current time as ISO, Unix and local strings |
//! | Resource | `info://server` | Server identity and capability summary |
//! | Resource | `greeting://{name}` | Personalised greeting |
//! | Resource | `data://{id}` | Synthesised record for an id |
//! | Prompt | `analyze` | Data analysis request |
//! | Prompt | `code_review` | Code review checklist |
//! | Prompt | `summarize` | Summary request |

pub mod prompts;
pub mod resources;
pub mod tools;

use crate::config::ServerIdentity;
use crate::host::{CapabilityHost, HostResult};

/// Registers every built-in tool, resource and prompt.
///
/// # Errors
///
/// Returns a configuration error if any name is already taken on `host`.
pub fn register_all(host: &mut CapabilityHost, identity: &ServerIdentity) -> HostResult<()> {
    tools::register(host)?;
    resources::register(host, identity)?;
    prompts::register(host)?;
    Ok(())
}

/// Builds a host populated with the built-in capabilities.
///
/// # Errors
///
/// Propagates registration failures from [`register_all`].
pub fn default_host(identity: &ServerIdentity) -> HostResult<CapabilityHost> {
    let mut host = CapabilityHost::new();
    register_all(&mut host, identity)?;
    Ok(host)
}
