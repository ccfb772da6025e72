//! Built-in prompts: `analyze`, `code_review`, `summarize`.

use crate::host::{
    Arguments, CapabilityHost, HandlerResult, HostResult, ParamSchema, ParamType, PromptMessage,
};

const ANALYZE: &str = "Please analyze the following data and provide insights.";

const CODE_REVIEW: &str = "Please review the following code for:
1. Best practices
2. Potential bugs
3. Performance issues
4. Security concerns";

const SUMMARIZE: &str = "Please provide a concise summary of the key points.";

/// Registers the built-in prompts in listing order.
///
/// # Errors
///
/// Returns a configuration error if a prompt name is already taken.
pub fn register(host: &mut CapabilityHost) -> HostResult<()> {
    host.register_prompt(
        "analyze",
        "Analysis prompt template",
        ParamSchema::new().optional("subject", ParamType::String, "What to analyze"),
        analyze,
    )?;
    host.register_prompt(
        "code_review",
        "Code review prompt template",
        ParamSchema::new().required("code", ParamType::String, "Code snippet to review"),
        code_review,
    )?;
    host.register_prompt(
        "summarize",
        "Summarization prompt template",
        ParamSchema::new().required("text", ParamType::String, "Text to summarize"),
        summarize,
    )?;
    Ok(())
}

fn analyze(args: &Arguments) -> HandlerResult<Vec<PromptMessage>> {
    let content = match args.opt_str("subject") {
        Some(subject) => format!("{ANALYZE}\n\n{subject}"),
        None => ANALYZE.to_string(),
    };
    Ok(vec![PromptMessage::user(content)])
}

fn code_review(args: &Arguments) -> HandlerResult<Vec<PromptMessage>> {
    let code = args.str("code")?;
    Ok(vec![PromptMessage::user(format!(
        "{CODE_REVIEW}\n\n```\n{code}\n```"
    ))])
}

fn summarize(args: &Arguments) -> HandlerResult<Vec<PromptMessage>> {
    let text = args.str("text")?;
    Ok(vec![PromptMessage::user(format!("{SUMMARIZE}\n\n{text}"))])
}
