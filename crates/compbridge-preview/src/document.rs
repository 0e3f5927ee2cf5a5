//! Preview document synthesis.
//!
//! A [`PreviewDocument`] is everything a sandbox needs to run one render:
//! the runtime prelude, the dialect to compile with, the literal source,
//! the discovered entry name and the input as a serialized JSON literal.

use std::sync::Arc;
use std::time::Duration;

use compbridge_config::PreviewSection;
use serde::Serialize;
use serde_json::Value;

use crate::entry::{EntryResolver, resolver_for};
use crate::html;

/// Hook bindings made available to user code without an import.
pub const PRELUDE: &str = "const { useState, useEffect, useRef, useMemo, useCallback } = React;";

/// Sandbox instrumentation carried by a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instrumentation {
    /// Delay after the render call before the output is judged.
    pub settle_delay_ms: u64,
    /// Report errors escaping user code after render (timers, effects).
    pub intercept_errors: bool,
}

impl Instrumentation {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self {
            settle_delay_ms: 100,
            intercept_errors: true,
        }
    }
}

/// A self-contained render request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewDocument {
    pub prelude: String,
    /// Dialect the host must compile with.
    pub compiler: String,
    pub source: String,
    /// Entry binding discovered in `source`.
    pub entry: Option<String>,
    /// Props as a JSON literal, never a live value.
    pub props_literal: String,
    pub instrumentation: Instrumentation,
}

impl PreviewDocument {
    /// Props parsed back from the embedded literal.
    pub fn props(&self) -> Value {
        serde_json::from_str(&self.props_literal).unwrap_or_else(|_| Value::Object(Default::default()))
    }

    /// Render as a standalone browser page.
    pub fn to_html(&self) -> String {
        html::render_page(self)
    }
}

/// Builds documents from source and input.
#[derive(Clone)]
pub struct Synthesizer {
    resolver: Arc<dyn EntryResolver>,
    instrumentation: Instrumentation,
}

impl Synthesizer {
    pub fn new(resolver: Arc<dyn EntryResolver>, instrumentation: Instrumentation) -> Self {
        Self {
            resolver,
            instrumentation,
        }
    }

    /// Synthesizer configured from the `[preview]` section.
    pub fn from_config(preview: &PreviewSection) -> Self {
        Self::new(
            resolver_for(preview.entry),
            Instrumentation {
                settle_delay_ms: preview.settle_delay_ms,
                intercept_errors: true,
            },
        )
    }

    pub fn resolver_name(&self) -> &'static str {
        self.resolver.name()
    }

    /// Build the document for `code` with `input` as props. Input that is
    /// not an object is injected as `{}`.
    pub fn synthesize(&self, code: &str, input: &Value) -> PreviewDocument {
        let props = match input {
            Value::Object(_) => input.clone(),
            _ => Value::Object(Default::default()),
        };
        PreviewDocument {
            prelude: PRELUDE.to_string(),
            compiler: compbridge_script::DIALECT.to_string(),
            source: code.to_string(),
            entry: self.resolver.resolve(code),
            props_literal: props.to_string(),
            instrumentation: self.instrumentation.clone(),
        }
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::from_config(&PreviewSection::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::DefaultExport;
    use serde_json::json;

    #[test]
    fn test_synthesize_embeds_everything() {
        let doc = Synthesizer::default().synthesize("const Card = ({t}) => <p>{t}</p>;", &json!({"t": "hi"}));
        assert_eq!(doc.prelude, PRELUDE);
        assert_eq!(doc.compiler, compbridge_script::DIALECT);
        assert_eq!(doc.entry.as_deref(), Some("Card"));
        assert_eq!(doc.props_literal, r#"{"t":"hi"}"#);
        assert_eq!(doc.props(), json!({"t": "hi"}));
        assert_eq!(doc.instrumentation.settle_delay(), Duration::from_millis(100));
        assert!(doc.instrumentation.intercept_errors);
    }

    #[test]
    fn test_non_object_input_becomes_empty_props() {
        let doc = Synthesizer::default().synthesize("const A = () => null;", &json!(42));
        assert_eq!(doc.props_literal, "{}");
    }

    #[test]
    fn test_resolver_is_pluggable() {
        let synth = Synthesizer::new(Arc::new(DefaultExport), Instrumentation::default());
        let doc = synth.synthesize("const a = 1;\nexport default Panel;", &json!({}));
        assert_eq!(doc.entry.as_deref(), Some("Panel"));
        assert_eq!(synth.resolver_name(), "default-export");
    }

    #[test]
    fn test_settle_delay_from_config() {
        let preview = PreviewSection {
            settle_delay_ms: 250,
            ..PreviewSection::default()
        };
        let doc = Synthesizer::from_config(&preview).synthesize("const A = 1;", &json!({}));
        assert_eq!(doc.instrumentation.settle_delay_ms, 250);
    }
}
