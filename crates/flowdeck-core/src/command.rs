// ── Command API ──
//
// Every REST write operation flows through `FlowCommand`. The controller
// acknowledges the request to the session immediately and routes the
// command to the API client on its command task.

use bytes::Bytes;

use crate::error::CoreError;
use crate::model::FlowId;

/// A command envelope sent through the command channel.
pub(crate) struct CommandEnvelope {
    pub command: FlowCommand,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All write operations against the flows API.
#[derive(Debug, Clone)]
pub enum FlowCommand {
    // ── Per-flow operations ──────────────────────────────────────────
    Accept { id: FlowId },
    Delete { id: FlowId },
    Duplicate { id: FlowId },
    Replay { id: FlowId },
    Revert { id: FlowId },
    /// Partial update; `data` is sent verbatim.
    Update { id: FlowId, data: serde_json::Value },

    // ── Bulk operations ──────────────────────────────────────────────
    AcceptAll,
    Clear,
    Download,
    Upload { dump: Bytes },
}

impl FlowCommand {
    /// Short name for logging and messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Accept { .. } => "accept",
            Self::Delete { .. } => "delete",
            Self::Duplicate { .. } => "duplicate",
            Self::Replay { .. } => "replay",
            Self::Revert { .. } => "revert",
            Self::Update { .. } => "update",
            Self::AcceptAll => "accept-all",
            Self::Clear => "clear",
            Self::Download => "download",
            Self::Upload { .. } => "upload",
        }
    }

    /// The flow this command targets, if any.
    pub fn target(&self) -> Option<&FlowId> {
        match self {
            Self::Accept { id }
            | Self::Delete { id }
            | Self::Duplicate { id }
            | Self::Replay { id }
            | Self::Revert { id }
            | Self::Update { id, .. } => Some(id),
            Self::AcceptAll | Self::Clear | Self::Download | Self::Upload { .. } => None,
        }
    }
}

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    /// Exported dump from [`FlowCommand::Download`].
    Dump(Bytes),
}
