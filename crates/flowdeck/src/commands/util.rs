//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use flowdeck_core::{Flow, FlowId, SessionView};

use crate::error::CliError;

/// Resolve a flow identifier (full ID or unique prefix) against a view.
///
/// Searches every visible item; exact matches win over prefixes.
pub fn resolve_flow<'a>(view: &'a SessionView<Flow>, identifier: &str) -> Result<&'a Arc<Flow>, CliError> {
    let wanted = FlowId::from(identifier);
    if let Some(exact) = view.items.iter().find(|f| f.id == wanted) {
        return Ok(exact);
    }

    let mut matches = view.items.iter().filter(|f| f.id.starts_with(identifier));
    match (matches.next(), matches.count()) {
        (Some(flow), 0) => Ok(flow),
        (Some(_), more) => Err(CliError::Ambiguous {
            prefix: identifier.into(),
            count: more + 1,
        }),
        (None, _) => Err(CliError::NotFound {
            identifier: identifier.into(),
        }),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Refuses outright when stdin is not a terminal.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}
