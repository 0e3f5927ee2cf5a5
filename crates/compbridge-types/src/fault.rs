//! Classified faults recorded by the error console.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three classes of failure a preview mount can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Source failed to produce a resolvable, invokable entry point.
    Compile,
    /// The entry point threw during or after invocation.
    Runtime,
    /// Render succeeded but nothing visible came out.
    EmptyOutput,
}

impl FaultKind {
    /// Short label used by console output.
    pub fn label(&self) -> &'static str {
        match self {
            FaultKind::Compile => "compile",
            FaultKind::Runtime => "runtime",
            FaultKind::EmptyOutput => "empty",
        }
    }

    /// Whether this fault is a soft warning rather than an error.
    ///
    /// Empty output may be intentional, so it is presented more gently.
    pub fn is_warning(&self) -> bool {
        matches!(self, FaultKind::EmptyOutput)
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fault received from a sandbox, stamped when it was captured.
///
/// Records are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultRecord {
    pub kind: FaultKind,
    pub message: String,
    /// Source line for runtime faults, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub occurred_at: DateTime<Utc>,
}

impl FaultRecord {
    /// Create a record captured now.
    pub fn new(kind: FaultKind, message: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            occurred_at: Utc::now(),
        }
    }
}

impl fmt::Display for FaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.occurred_at.format("%H:%M:%S%.3f"),
            self.kind,
            self.message
        )?;
        if let Some(line) = self.line {
            write!(f, " (line {line})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(FaultKind::Compile.to_string(), "compile");
        assert_eq!(FaultKind::Runtime.to_string(), "runtime");
        assert_eq!(FaultKind::EmptyOutput.to_string(), "empty");
        assert!(FaultKind::EmptyOutput.is_warning());
        assert!(!FaultKind::Runtime.is_warning());
    }

    #[test]
    fn test_record_display_includes_line() {
        let record = FaultRecord::new(FaultKind::Runtime, "boom", Some(3));
        let text = record.to_string();
        assert!(text.contains("runtime: boom"));
        assert!(text.ends_with("(line 3)"));
    }

    #[test]
    fn test_record_serializes_without_missing_line() {
        let record = FaultRecord::new(FaultKind::Compile, "component not found: `unknown`", None);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "compile");
        assert!(json.get("line").is_none());
    }
}
