//! Debug session facade for breakpointed delegate runs.
//!
//! A [`DebugSession`] wraps an execution delegate and drives one debug
//! segment per [`DebugSession::stream`] call: the delegate runs on a
//! dedicated worker thread, pauses at configured breakpoints, and every
//! call yields exactly one [`ExecutionEvent`] so an interactive bridge can
//! interleave user I/O between breakpoints.

mod protocol;
mod session;

pub use protocol::ExecutionEvent;
pub use session::{DebugSession, DebugSessionBuilder, StreamOptions};
