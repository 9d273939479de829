//! Debug control and state.
//!
//! [`DebugControl`] is the shared handle connecting the consumer side of a
//! debug session to the worker thread the delegate runs on. The worker side
//! drives it through the [`FrameHook`] implementation; the consumer side
//! replaces breakpoints, resumes, and stops. Pauses block the worker on a
//! condvar; events flow to the consumer over an unbounded channel installed
//! with [`DebugControl::set_event_sender`].

#![allow(missing_docs)]

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::delegate::{FrameHook, FrameId, FrameInfo, Output};
use crate::error::DelegateError;
use crate::graph::CallGraph;
use crate::value::{capture_bindings, Value};

use super::breakpoints::BreakpointSpec;
use super::filter::SourceFilter;
use super::trace::trace_debug;
use super::types::{FrameSnapshot, RunEvent};

/// Worker execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugMode {
    /// Executing delegate code.
    Running,
    /// Parked at a breakpoint waiting for a resume signal.
    Paused,
}

#[derive(Debug)]
struct FrameMeta {
    file: PathBuf,
    function: SmolStr,
    instrumented: bool,
    /// Line of the most recent statement boundary observed in this frame.
    /// Re-entries onto the same line (multi-line expressions bouncing back
    /// after a nested call) never pause twice.
    last_line: Option<u32>,
}

#[derive(Debug)]
struct DebugState {
    spec: BreakpointSpec,
    mode: DebugMode,
    stopped: bool,
    /// Binary resume signal, consumed exactly once per wait.
    resume_pending: bool,
    last_location: Option<(PathBuf, u32)>,
    frames: FxHashMap<FrameId, FrameMeta>,
    event_tx: Option<Sender<RunEvent>>,
}

/// Shared debug control and hook implementation.
///
/// Cheap to clone; all clones share one state. The breakpoint spec is
/// mutated only from the consumer side while the worker is parked, so the
/// state mutex doubles as the memory barrier on handoff.
#[derive(Debug, Clone)]
pub struct DebugControl {
    state: Arc<(Mutex<DebugState>, Condvar)>,
    filter: SourceFilter,
    /// Present only when a state anchor was configured; `None` keeps the
    /// call-graph reporter inert.
    graph: Option<CallGraph>,
}

impl DebugControl {
    /// Create a new control handle in running mode.
    #[must_use]
    pub fn new(spec: BreakpointSpec, filter: SourceFilter, graph: Option<CallGraph>) -> Self {
        Self {
            state: Arc::new((
                Mutex::new(DebugState {
                    spec,
                    mode: DebugMode::Running,
                    stopped: false,
                    resume_pending: false,
                    last_location: None,
                    frames: FxHashMap::default(),
                    event_tx: None,
                }),
                Condvar::new(),
            )),
            filter,
            graph,
        }
    }

    /// Stream run events to a sender. Events produced while no sender is
    /// installed are dropped.
    pub fn set_event_sender(&self, sender: Sender<RunEvent>) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.event_tx = Some(sender);
    }

    /// Replace the breakpoint spec wholesale and re-decide instrumentation
    /// for live frames (this is how a session switches into or out of
    /// wildcard mode between segments). Call only while the worker is
    /// parked or before it starts.
    pub fn update_breakpoints(&self, spec: BreakpointSpec) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.spec = spec;
        let DebugState { spec, frames, .. } = &mut *state;
        for meta in frames.values_mut() {
            meta.instrumented = should_instrument(spec, &self.filter, &meta.file);
        }
        trace_debug(&format!("breakpoints replaced ({} lines)", spec.line_count()));
    }

    /// Release one pending pause. If the worker is not currently parked the
    /// signal stays available for the next pause.
    pub fn resume(&self) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.resume_pending = true;
        cvar.notify_all();
        trace_debug("resume");
    }

    /// Stop the session: unblock a parked worker and ask it to unwind.
    /// After this call no further events are emitted.
    pub fn stop(&self) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.stopped = true;
        cvar.notify_all();
        trace_debug("stop");
    }

    /// Report the delegate's outcome as the terminal event.
    ///
    /// Called by the worker after the delegate returns. A cooperative
    /// cancel unwind produces no event: after `stop()` nothing is valid.
    pub fn finish(&self, outcome: Result<Output, DelegateError>) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        if state.stopped {
            return;
        }
        let event = match outcome {
            Ok(output) => RunEvent::Completed(output),
            Err(DelegateError::Cancelled) => return,
            Err(err) => RunEvent::Failed(err),
        };
        trace_debug(&format!("finish {event:?}"));
        emit(&mut state, event);
    }

    /// Current worker mode.
    #[must_use]
    pub fn mode(&self) -> DebugMode {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.mode
    }

    /// Whether the worker is parked at a breakpoint.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        matches!(self.mode(), DebugMode::Paused)
    }

    /// Whether the session was stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.stopped
    }

    /// Last observed statement location.
    #[must_use]
    pub fn last_location(&self) -> Option<(PathBuf, u32)> {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.last_location.clone()
    }

    /// Returns the number of configured breakpoint lines (primarily for
    /// tests).
    #[doc(hidden)]
    #[must_use]
    pub fn breakpoint_count(&self) -> usize {
        let (lock, _) = &*self.state;
        let state = lock.lock().expect("debug state poisoned");
        state.spec.line_count()
    }
}

impl FrameHook for DebugControl {
    fn on_frame_entry(&mut self, frame: &FrameInfo<'_>) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        if state.stopped {
            return;
        }
        let instrumented = should_instrument(&state.spec, &self.filter, frame.file);
        state.frames.insert(
            frame.id,
            FrameMeta {
                file: frame.file.to_path_buf(),
                function: frame.function.into(),
                instrumented,
                last_line: None,
            },
        );
        // Wrapper trampolines are skipped; the forwarded-to frame, entered
        // next under its own name, carries the report.
        if let Some(graph) = &self.graph {
            if frame.forwards_to.is_none() && graph.contains(frame.function) {
                let event = RunEvent::StateUpdate {
                    node: frame.function.to_string(),
                    payload: capture_bindings(frame.arguments),
                };
                emit(&mut state, event);
            }
        }
    }

    fn on_statement(
        &mut self,
        frame: FrameId,
        line: u32,
        locals: &IndexMap<SmolStr, Value>,
    ) -> ControlFlow<()> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        if state.stopped {
            return ControlFlow::Break(());
        }
        let snapshot = {
            let DebugState {
                spec,
                frames,
                last_location,
                ..
            } = &mut *state;
            // Unknown frames keep tracing rather than aborting the run.
            let Some(meta) = frames.get_mut(&frame) else {
                return ControlFlow::Continue(());
            };
            if !meta.instrumented {
                return ControlFlow::Continue(());
            }
            let repeat = meta.last_line == Some(line);
            meta.last_line = Some(line);
            *last_location = Some((meta.file.clone(), line));
            if repeat || !spec.contains(&meta.file, line) {
                return ControlFlow::Continue(());
            }
            FrameSnapshot {
                file: meta.file.clone(),
                line,
                function: meta.function.to_string(),
                locals: capture_bindings(locals),
            }
        };
        trace_debug(&format!(
            "pause at {}:{line}",
            snapshot.file.display()
        ));
        state.mode = DebugMode::Paused;
        emit(&mut state, RunEvent::Breakpoint(snapshot));
        loop {
            if state.stopped {
                return ControlFlow::Break(());
            }
            if state.resume_pending {
                state.resume_pending = false;
                break;
            }
            state = cvar.wait(state).expect("debug state poisoned");
        }
        state.mode = DebugMode::Running;
        ControlFlow::Continue(())
    }

    fn on_frame_exit(&mut self, frame: FrameId) {
        let (lock, _) = &*self.state;
        let mut state = lock.lock().expect("debug state poisoned");
        state.frames.remove(&frame);
    }
}

fn should_instrument(spec: &BreakpointSpec, filter: &SourceFilter, file: &Path) -> bool {
    if spec.is_wildcard() {
        filter.is_project_file(file)
    } else {
        spec.has_file(file)
    }
}

fn emit(state: &mut DebugState, event: RunEvent) {
    if state.stopped {
        return;
    }
    if let Some(sender) = &state.event_tx {
        let _ = sender.send(event);
    }
}
