//! What the preview area shows.

use compbridge_script::{VNode, to_html};
use compbridge_script::vdom::escape_text;
use compbridge_types::FaultKind;
use serde::Serialize;

/// Hint shown when there is no code to preview.
pub const PLACEHOLDER_TEXT: &str = "Enter component code to see a preview";

/// The preview area always shows exactly one of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum Surface {
    /// No code entered; nothing is mounted.
    #[default]
    Placeholder,
    /// Mounted, render in progress.
    Pending,
    /// Children of the output root.
    Rendered { nodes: Vec<VNode> },
    /// Inline panel for a compile or runtime fault.
    ErrorPanel { kind: FaultKind, message: String },
    /// Visible warning that replaced an empty render.
    EmptyWarning { message: String },
}

impl Surface {
    /// Rendered output, if any.
    pub fn nodes(&self) -> Option<&[VNode]> {
        match self {
            Surface::Rendered { nodes } => Some(nodes),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Surface::ErrorPanel { .. })
    }

    /// Markup for the preview area.
    pub fn to_html(&self) -> String {
        match self {
            Surface::Placeholder => {
                format!("<div class=\"cb-placeholder\">{}</div>", escape_text(PLACEHOLDER_TEXT))
            }
            Surface::Pending => String::new(),
            Surface::Rendered { nodes } => to_html(nodes),
            Surface::ErrorPanel { kind, message } => format!(
                "<div class=\"cb-panel cb-error\" data-kind=\"{kind}\">{}</div>",
                escape_text(message)
            ),
            Surface::EmptyWarning { message } => format!(
                "<div class=\"cb-panel cb-warning\">{}</div>",
                escape_text(message)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panels_escape_messages() {
        let panel = Surface::ErrorPanel {
            kind: FaultKind::Runtime,
            message: "x < y".into(),
        };
        assert_eq!(
            panel.to_html(),
            "<div class=\"cb-panel cb-error\" data-kind=\"runtime\">x &lt; y</div>"
        );
        assert!(panel.is_error());
        assert!(panel.nodes().is_none());
    }

    #[test]
    fn test_rendered_markup() {
        let surface = Surface::Rendered {
            nodes: vec![VNode::element("p", vec![], vec![VNode::text("hi")])],
        };
        assert_eq!(surface.to_html(), "<p>hi</p>");
        assert_eq!(surface.nodes().map(<[VNode]>::len), Some(1));
        assert!(Surface::default().to_html().contains(PLACEHOLDER_TEXT));
    }

    #[test]
    fn test_serializes_with_state_tag() {
        let json = serde_json::to_value(Surface::EmptyWarning { message: "m".into() }).unwrap();
        assert_eq!(json["state"], "empty-warning");
        assert_eq!(json["message"], "m");
    }
}
