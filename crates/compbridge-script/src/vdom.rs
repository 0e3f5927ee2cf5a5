//! Rendered output tree.

use serde::Serialize;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<VNode>,
    },
    Text {
        text: String,
    },
}

impl VNode {
    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text { text: text.into() }
    }

    pub fn element(tag: impl Into<String>, attrs: Vec<(String, String)>, children: Vec<VNode>) -> Self {
        VNode::Element {
            tag: tag.into(),
            attrs,
            children,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            VNode::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            VNode::Text { .. } => None,
        }
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element { children, .. } => children,
            VNode::Text { .. } => &[],
        }
    }

    fn write_html(&self, out: &mut String) {
        match self {
            VNode::Text { text } => out.push_str(&escape_text(text)),
            VNode::Element {
                tag,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape_attr(value));
                        out.push('"');
                    }
                }
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

/// Serialize nodes as HTML markup.
pub fn to_html(nodes: &[VNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_html(&mut out);
    }
    out
}

/// Concatenated text content, like `textContent`.
pub fn visible_text(nodes: &[VNode]) -> String {
    let mut out = String::new();
    collect_text(nodes, &mut out);
    out
}

fn collect_text(nodes: &[VNode], out: &mut String) {
    for node in nodes {
        match node {
            VNode::Text { text } => out.push_str(text),
            VNode::Element { children, .. } => collect_text(children, out),
        }
    }
}

/// Whether an output root with these children shows nothing: no children,
/// only whitespace text, or one childless element without text.
pub fn is_visually_empty(nodes: &[VNode]) -> bool {
    if nodes.is_empty() {
        return true;
    }
    if !visible_text(nodes).trim().is_empty() {
        return false;
    }
    match nodes {
        [VNode::Element { children, .. }] => children.is_empty(),
        _ => nodes.iter().all(|n| matches!(n, VNode::Text { .. })),
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn div(children: Vec<VNode>) -> VNode {
        VNode::element("div", vec![], children)
    }

    #[test]
    fn test_html_serialization() {
        let tree = VNode::element(
            "p",
            vec![("class".into(), "note".into()), ("hidden".into(), String::new())],
            vec![VNode::text("a < b"), VNode::element("br", vec![], vec![])],
        );
        assert_eq!(to_html(&[tree]), r#"<p class="note" hidden>a &lt; b<br /></p>"#);
    }

    #[test]
    fn test_attribute_quotes_escaped() {
        let node = VNode::element("img", vec![("alt".into(), "say \"hi\"".into())], vec![]);
        assert_eq!(to_html(&[node]), r#"<img alt="say &quot;hi&quot;" />"#);
    }

    #[test]
    fn test_emptiness() {
        assert!(is_visually_empty(&[]));
        assert!(is_visually_empty(&[div(vec![])]));
        assert!(is_visually_empty(&[VNode::text("  \n")]));
        assert!(!is_visually_empty(&[div(vec![VNode::text("5")])]));
        assert!(!is_visually_empty(&[div(vec![div(vec![])])]));
        assert!(!is_visually_empty(&[VNode::text("0")]));
        assert!(!is_visually_empty(&[div(vec![]), div(vec![])]));
    }

    #[test]
    fn test_visible_text_nested() {
        let tree = div(vec![VNode::text("Hello, "), div(vec![VNode::text("world")])]);
        assert_eq!(visible_text(&[tree]), "Hello, world");
    }
}
