//! Bridge-facing execution event vocabulary.

use indexmap::IndexMap;
use serde::Serialize;

use breakline_runtime::debug::{FrameSnapshot, RunEvent};

/// Events surfaced to the debug bridge, in program order.
///
/// Exactly one terminal event (`Completed` or `Failed`) ends each
/// execution. Serializes as a tagged union so remote bridges can
/// pattern-match on `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExecutionEvent {
    /// Execution paused at a breakpoint.
    #[serde(rename_all = "camelCase")]
    Breakpoint {
        /// Snapshot of the paused frame.
        frame: FrameSnapshot,
    },
    /// A user call-graph function was entered.
    #[serde(rename_all = "camelCase")]
    StateUpdate {
        /// Name of the entered function.
        node: String,
        /// Argument bindings at entry.
        payload: IndexMap<String, serde_json::Value>,
    },
    /// Terminal: execution completed with a result.
    #[serde(rename_all = "camelCase")]
    Completed {
        /// Final output document.
        output: serde_json::Value,
    },
    /// Terminal: execution failed.
    #[serde(rename_all = "camelCase")]
    Failed {
        /// Failure description for the user.
        error: String,
    },
}

impl ExecutionEvent {
    /// Whether this event ends the execution.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

impl From<RunEvent> for ExecutionEvent {
    fn from(event: RunEvent) -> Self {
        match event {
            RunEvent::Breakpoint(frame) => Self::Breakpoint { frame },
            RunEvent::StateUpdate { node, payload } => Self::StateUpdate { node, payload },
            RunEvent::Completed(output) => Self::Completed { output },
            RunEvent::Failed(error) => Self::Failed {
                error: error.to_string(),
            },
        }
    }
}
