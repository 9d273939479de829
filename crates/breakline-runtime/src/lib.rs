//! `breakline-runtime` - statement-level instrumentation and debug control
//! for flow delegates.
//!
//! A *delegate* is an opaque callable unit that runs a program and reports
//! frame entries and statement boundaries into a [`delegate::FrameHook`].
//! The [`debug`] module turns those reports into breakpoint pauses, local
//! snapshots, and call-graph state events consumed by a debug session.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Debugging and pause/resume control.
pub mod debug;
/// Execution delegate contract and instrumentation hooks.
pub mod delegate;
/// Delegate and execution errors.
pub mod error;
/// User call-graph membership for state reporting.
pub mod graph;
/// Scripted delegates for exercising the debug controller.
pub mod harness;
/// Delegate-visible value types and snapshot capture.
pub mod value;

pub use delegate::{ExecutionDelegate, FrameHook, FrameId, FrameInfo, Input, NoopFrameHook, Output};
pub use error::DelegateError;
pub use graph::CallGraph;
pub use value::Value;
