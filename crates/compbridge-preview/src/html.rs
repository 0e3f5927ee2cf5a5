//! Browser rendition of a preview document.
//!
//! The page loads React, ReactDOM and Babel from a CDN and posts the same
//! three fault messages to its parent window that the native host reports.

use compbridge_types::EMPTY_RENDER_MESSAGE;
use serde_json::Value;

use crate::document::PreviewDocument;

const REACT_URL: &str = "https://cdnjs.cloudflare.com/ajax/libs/react/18.2.0/umd/react.production.min.js";
const REACT_DOM_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/react-dom/18.2.0/umd/react-dom.production.min.js";
const BABEL_URL: &str = "https://cdnjs.cloudflare.com/ajax/libs/babel-standalone/7.23.5/babel.min.js";

const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="UTF-8">
    <script crossorigin src="@REACT@"></script>
    <script crossorigin src="@REACT_DOM@"></script>
    <script src="@BABEL@"></script>
    <style>
      body { margin: 0; padding: 20px; font-family: system-ui, -apple-system, sans-serif; }
      * { box-sizing: border-box; }
      .cb-panel { padding: 12px 16px; border-radius: 6px; font-size: 13px; white-space: pre-wrap; }
      .cb-error { background: #fef2f2; color: #b91c1c; border: 1px solid #fecaca; }
      .cb-warning { background: #fffbeb; color: #92400e; border: 1px solid #fde68a; }
    </style>
  </head>
  <body>
    <div id="root"></div>
    <script>
      (function () {
        const post = (message) => parent.postMessage(message, '*');
        const describe = (e) => (e && e.message !== undefined ? e.message : String(e));
        const panel = (kind, text) => {
          const el = document.createElement('div');
          el.className = 'cb-panel ' + kind;
          el.textContent = text;
          const root = document.getElementById('root');
          root.innerHTML = '';
          root.appendChild(el);
        };
        if (@INTERCEPT@) {
          window.onerror = function (message, source, line) {
            post({ type: 'runtime-error', message: String(message), line: line || null });
          };
        }

        const prelude = @PRELUDE@;
        const source = @SOURCE@;
        const entry = @ENTRY@;
        const props = @PROPS@;

        let Component;
        try {
          if (@COMPILER@ !== @DIALECT@) {
            throw new Error('unsupported compiler: ' + @COMPILER@);
          }
          const code = Babel.transform(prelude + '\n' + source, { presets: ['react'] }).code;
          if (!entry) {
            throw new Error('component not found: `unknown`');
          }
          const lookup = '\nreturn typeof ' + entry + " === 'undefined' ? undefined : " + entry + ';';
          Component = new Function('React', code + lookup)(React);
          if (Component === undefined) {
            throw new Error('component not found: `' + entry + '`');
          }
          if (typeof Component !== 'function') {
            Component = undefined;
            throw new Error('component not found: `' + entry + '` (not a function or class)');
          }
        } catch (e) {
          post({ type: 'compile-error', message: describe(e) });
          panel('cb-error', describe(e));
        }

        if (Component) {
          let rendered = false;
          try {
            const root = ReactDOM.createRoot(document.getElementById('root'));
            ReactDOM.flushSync(() => root.render(React.createElement(Component, props)));
            rendered = true;
          } catch (e) {
            post({ type: 'runtime-error', message: describe(e), line: (e && e.lineNumber) || null });
            panel('cb-error', describe(e));
          }
          if (rendered) {
            setTimeout(function () {
              const root = document.getElementById('root');
              const only = root && root.children.length === 1 ? root.children[0] : null;
              const empty = !root || root.childNodes.length === 0 ||
                (only && only.children.length === 0 && !only.textContent.trim());
              if (empty) {
                post({ type: 'empty-render', message: @EMPTY@ });
                panel('cb-warning', @EMPTY@);
              }
            }, @SETTLE@);
          }
        }
      })();
    </script>
  </body>
</html>
"#;

/// JSON literal safe to embed inside a `<script>` element.
fn script_literal(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn string_literal(s: &str) -> String {
    script_literal(&Value::String(s.to_string()))
}

/// Render `doc` as a standalone HTML page.
pub fn render_page(doc: &PreviewDocument) -> String {
    let entry = doc
        .entry
        .as_deref()
        .map_or(Value::Null, |name| Value::String(name.to_string()));
    let props = serde_json::from_str::<Value>(&doc.props_literal)
        .unwrap_or_else(|_| Value::Object(Default::default()));
    PAGE.replace("@REACT@", REACT_URL)
        .replace("@REACT_DOM@", REACT_DOM_URL)
        .replace("@BABEL@", BABEL_URL)
        .replace("@INTERCEPT@", &doc.instrumentation.intercept_errors.to_string())
        .replace("@SETTLE@", &doc.instrumentation.settle_delay_ms.to_string())
        .replace("@EMPTY@", &string_literal(EMPTY_RENDER_MESSAGE))
        .replace("@DIALECT@", &string_literal(compbridge_script::DIALECT))
        .replace("@COMPILER@", &string_literal(&doc.compiler))
        .replace("@ENTRY@", &script_literal(&entry))
        .replace("@PROPS@", &script_literal(&props))
        .replace("@PRELUDE@", &string_literal(&doc.prelude))
        .replace("@SOURCE@", &string_literal(&doc.source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Synthesizer;
    use serde_json::json;

    #[test]
    fn test_page_embeds_document() {
        let doc = Synthesizer::default().synthesize(
            "const Card = ({ title }) => <h1>{title}</h1>;",
            &json!({"title": "Hello"}),
        );
        let page = doc.to_html();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains(REACT_URL));
        assert!(page.contains(BABEL_URL));
        assert!(page.contains(r#"const entry = "Card";"#));
        assert!(page.contains(r#"const props = {"title":"Hello"};"#));
        assert!(page.contains("}, 100);"));
        assert!(page.contains("type: 'empty-render'"));
        for placeholder in ["@REACT@", "@ENTRY@", "@PROPS@", "@SOURCE@", "@EMPTY@"] {
            assert!(!page.contains(placeholder), "{placeholder} left in page");
        }
    }

    #[test]
    fn test_script_close_tags_are_escaped() {
        let doc = Synthesizer::default().synthesize(
            "const X = () => <div>{\"</script><script>alert(1)</script>\"}</div>;",
            &json!({"html": "</script>"}),
        );
        let page = doc.to_html();
        assert_eq!(page.matches("</script>").count(), 4);
        assert!(page.contains("<\\/script>"));
    }

    #[test]
    fn test_missing_entry_is_null() {
        let doc = Synthesizer::default().synthesize("cosnt X = 1", &json!({}));
        assert!(doc.to_html().contains("const entry = null;"));
    }
}
