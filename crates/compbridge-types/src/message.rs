//! Fault protocol posted from a sandboxed mount to the supervising session.
//!
//! Messages cross the isolation boundary as JSON values tagged by `type`.
//! The direction is one-way and fire-and-forget; the receiving side must
//! tolerate payloads it does not understand.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fault::{FaultKind, FaultRecord};

/// Message text reported when a render produces nothing visible.
pub const EMPTY_RENDER_MESSAGE: &str =
    "component executed without error but produced no visible output";

/// A fault message as it travels across the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FaultMessage {
    /// Synthesis, discovery, or pre-render failure.
    CompileError { message: String },
    /// Exception during or after render.
    RuntimeError {
        message: String,
        #[serde(default)]
        line: Option<u32>,
    },
    /// Render succeeded but produced no visible output.
    EmptyRender { message: String },
}

impl FaultMessage {
    /// Build a `compile-error` message.
    pub fn compile(message: impl Into<String>) -> Self {
        FaultMessage::CompileError {
            message: message.into(),
        }
    }

    /// Build a `runtime-error` message.
    pub fn runtime(message: impl Into<String>, line: Option<u32>) -> Self {
        FaultMessage::RuntimeError {
            message: message.into(),
            line,
        }
    }

    /// Build the `empty-render` message.
    pub fn empty_render() -> Self {
        FaultMessage::EmptyRender {
            message: EMPTY_RENDER_MESSAGE.to_string(),
        }
    }

    /// The wire tag of this message.
    pub fn tag(&self) -> &'static str {
        match self {
            FaultMessage::CompileError { .. } => "compile-error",
            FaultMessage::RuntimeError { .. } => "runtime-error",
            FaultMessage::EmptyRender { .. } => "empty-render",
        }
    }

    /// Fault class this message reports.
    pub fn kind(&self) -> FaultKind {
        match self {
            FaultMessage::CompileError { .. } => FaultKind::Compile,
            FaultMessage::RuntimeError { .. } => FaultKind::Runtime,
            FaultMessage::EmptyRender { .. } => FaultKind::EmptyOutput,
        }
    }

    /// Human-readable message text.
    pub fn message(&self) -> &str {
        match self {
            FaultMessage::CompileError { message }
            | FaultMessage::RuntimeError { message, .. }
            | FaultMessage::EmptyRender { message } => message,
        }
    }

    /// Serialize for posting across the boundary.
    pub fn to_wire(&self) -> Value {
        // Serializing a plain enum of strings cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decode a posted payload.
    ///
    /// Returns `None` for malformed payloads and unrecognized tags so the
    /// listener can drop them without failing.
    pub fn from_wire(payload: &Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }

    /// Stamp this message as a console record captured now.
    pub fn into_record(self) -> FaultRecord {
        match self {
            FaultMessage::CompileError { message } => {
                FaultRecord::new(FaultKind::Compile, message, None)
            }
            FaultMessage::RuntimeError { message, line } => {
                FaultRecord::new(FaultKind::Runtime, message, line)
            }
            FaultMessage::EmptyRender { message } => {
                FaultRecord::new(FaultKind::EmptyOutput, message, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_tags() {
        assert_eq!(
            FaultMessage::compile("x").to_wire(),
            json!({"type": "compile-error", "message": "x"})
        );
        assert_eq!(
            FaultMessage::runtime("boom", Some(2)).to_wire(),
            json!({"type": "runtime-error", "message": "boom", "line": 2})
        );
        assert_eq!(FaultMessage::empty_render().to_wire()["type"], "empty-render");
    }

    #[test]
    fn test_runtime_line_may_be_absent() {
        let msg = FaultMessage::from_wire(&json!({"type": "runtime-error", "message": "x"}));
        assert_eq!(msg, Some(FaultMessage::runtime("x", None)));

        let msg = FaultMessage::from_wire(&json!({
            "type": "runtime-error",
            "message": "x",
            "line": null
        }));
        assert_eq!(msg, Some(FaultMessage::runtime("x", None)));
    }

    #[test]
    fn test_unknown_and_malformed_payloads_are_rejected() {
        assert!(FaultMessage::from_wire(&json!({"type": "resize", "height": 10})).is_none());
        assert!(FaultMessage::from_wire(&json!({"type": "compile-error"})).is_none());
        assert!(FaultMessage::from_wire(&json!("compile-error")).is_none());
        assert!(FaultMessage::from_wire(&json!(null)).is_none());
        assert!(FaultMessage::from_wire(&json!({"message": "no tag"})).is_none());
    }

    #[test]
    fn test_into_record_keeps_kind_and_line() {
        let record = FaultMessage::runtime("boom", Some(7)).into_record();
        assert_eq!(record.kind, FaultKind::Runtime);
        assert_eq!(record.message, "boom");
        assert_eq!(record.line, Some(7));

        let record = FaultMessage::empty_render().into_record();
        assert_eq!(record.kind, FaultKind::EmptyOutput);
        assert_eq!(record.message, EMPTY_RENDER_MESSAGE);
    }
}
