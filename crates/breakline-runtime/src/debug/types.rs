//! Debug event types.

#![allow(missing_docs)]

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;

use crate::delegate::Output;
use crate::error::DelegateError;

/// Serializable snapshot of the frame a pause happened in.
///
/// Built fresh at each pause; ownership moves to the event consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    /// Absolute path of the paused file.
    pub file: PathBuf,
    /// Line about to execute.
    pub line: u32,
    /// Name of the enclosing function.
    pub function: String,
    /// Local bindings visible at the pause point.
    pub locals: IndexMap<String, serde_json::Value>,
}

/// Events produced by one instrumented execution, in program order.
///
/// Exactly one terminal event (`Completed` or `Failed`) is produced per
/// execution; zero or more `Breakpoint`/`StateUpdate` events precede it.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Execution paused at a breakpoint.
    Breakpoint(FrameSnapshot),
    /// A user call-graph function was entered.
    StateUpdate {
        node: String,
        payload: IndexMap<String, serde_json::Value>,
    },
    /// Terminal: the delegate completed with a result.
    Completed(Output),
    /// Terminal: the delegate failed.
    Failed(DelegateError),
}

impl RunEvent {
    /// Whether this event ends the execution.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Completed(_) | RunEvent::Failed(_))
    }
}
