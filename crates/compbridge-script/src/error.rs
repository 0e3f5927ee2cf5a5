//! Error types for script compilation and execution.

use thiserror::Error;

/// Result type for script operations.
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Errors surfaced from compiling or running component source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// Source failed to parse.
    #[error("SyntaxError: {message} ({line}:{column})")]
    Syntax {
        message: String,
        line: u32,
        column: u32,
    },

    /// A value was thrown and not caught by user code.
    #[error("{message}")]
    Thrown { message: String, line: Option<u32> },

    /// Execution was abandoned because the owning mount was torn down.
    #[error("execution interrupted")]
    Interrupted,
}

impl ScriptError {
    /// Source line associated with the error, if any.
    pub fn line(&self) -> Option<u32> {
        match self {
            ScriptError::Syntax { line, .. } => Some(*line),
            ScriptError::Thrown { line, .. } => *line,
            ScriptError::Interrupted => None,
        }
    }

    /// Whether this error came from teardown rather than user code.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ScriptError::Interrupted)
    }
}
