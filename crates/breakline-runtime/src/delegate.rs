//! Execution delegate contract and instrumentation hooks.
//!
//! The debug controller treats the program under debug as an opaque callable
//! unit. A delegate cooperates with instrumentation by reporting call-frame
//! entries, statement boundaries, and frame exits into a [`FrameHook`]; a
//! delegate that never reports simply runs uninstrumented.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::DelegateError;
use crate::value::Value;

/// Input document handed to a delegate run.
pub type Input = serde_json::Value;

/// Final output document produced by a delegate run.
pub type Output = serde_json::Value;

/// Identifier for a live call frame, unique within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u64);

/// Description of a call frame at entry.
#[derive(Debug)]
pub struct FrameInfo<'a> {
    /// Frame identifier; stable for the lifetime of the frame.
    pub id: FrameId,
    /// Source file the frame's function is defined in.
    pub file: &'a Path,
    /// Name of the function owning this frame.
    pub function: &'a str,
    /// Logical target name when this frame is a forwarding wrapper
    /// (a trampoline whose only job is to call through to `forwards_to`
    /// under the same logical identity).
    pub forwards_to: Option<&'a str>,
    /// Argument bindings at entry, in declaration order.
    pub arguments: &'a IndexMap<SmolStr, Value>,
}

/// Statement-level hooks a delegate reports into while running.
///
/// `on_statement` may block the calling thread (that is how breakpoints
/// pause execution) and returns a directive: [`ControlFlow::Break`] asks the
/// delegate to unwind promptly instead of running further statements.
pub trait FrameHook {
    /// Called when a frame is entered, before its first statement.
    fn on_frame_entry(&mut self, frame: &FrameInfo<'_>);

    /// Called before each statement executes, with the bindings visible at
    /// that point.
    fn on_statement(
        &mut self,
        frame: FrameId,
        line: u32,
        locals: &IndexMap<SmolStr, Value>,
    ) -> ControlFlow<()>;

    /// Called when a frame returns.
    fn on_frame_exit(&mut self, frame: FrameId);
}

/// No-op hook for uninstrumented runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFrameHook;

impl FrameHook for NoopFrameHook {
    fn on_frame_entry(&mut self, _frame: &FrameInfo<'_>) {}

    fn on_statement(
        &mut self,
        _frame: FrameId,
        _line: u32,
        _locals: &IndexMap<SmolStr, Value>,
    ) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn on_frame_exit(&mut self, _frame: FrameId) {}
}

/// Opaque callable unit the debug controller drives.
///
/// A delegate that is internally asynchronous owns its private executor
/// inside [`run`](Self::run); the worker thread it runs on is never shared
/// with the consumer's concurrency substrate.
pub trait ExecutionDelegate: Send + Sync {
    /// Run the program to completion, reporting frames and statements to
    /// `hook`.
    fn run(&self, input: &Input, hook: &mut dyn FrameHook) -> Result<Output, DelegateError>;

    /// Entry file used to resolve bare line-number breakpoints, if one is
    /// designated.
    fn entrypoint(&self) -> Option<PathBuf> {
        None
    }
}
