//! Delegate and execution errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors surfaced by an execution delegate.
///
/// These are the only failures that cross the debug facade boundary; they
/// travel as terminal `Failed` events rather than as thrown errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegateError {
    /// The delegate's program failed while executing.
    #[error("{0}")]
    Execution(String),

    /// A scripted program called a function that is not defined.
    #[error("undefined function '{0}'")]
    UndefinedFunction(SmolStr),

    /// Execution unwound after the debug controller requested a stop.
    #[error("execution cancelled")]
    Cancelled,
}

impl DelegateError {
    /// Build an execution failure from any displayable cause.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}
