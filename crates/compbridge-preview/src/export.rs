//! SVG export of the mounted output.
//!
//! The output tree is embedded as XHTML inside a `foreignObject`, which
//! keeps text and styles as vectors for design tools that import SVG.

use std::path::Path;
use std::time::Duration;

use compbridge_script::{VNode, to_html};
use tracing::debug;

use crate::error::ExportError;
use crate::host::SharedSurface;

/// Canvas size for exported documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Render output nodes as an SVG document.
pub fn to_svg(nodes: &[VNode], options: ExportOptions) -> String {
    let ExportOptions { width, height } = options;
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         viewBox=\"0 0 {width} {height}\">\
         <foreignObject x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\">\
         <div xmlns=\"http://www.w3.org/1999/xhtml\" style=\"margin:0;padding:20px;\
         font-family:system-ui,-apple-system,sans-serif;box-sizing:border-box\">{}</div>\
         </foreignObject></svg>",
        to_html(nodes)
    )
}

/// Wait `delay` for the mount to settle, then export whatever it shows.
pub async fn export_svg(
    surface: &SharedSurface,
    delay: Duration,
    options: ExportOptions,
) -> Result<String, ExportError> {
    tokio::time::sleep(delay).await;
    let surface = surface.lock();
    match surface.nodes() {
        Some(nodes) if !nodes.is_empty() => Ok(to_svg(nodes, options)),
        _ => {
            debug!("export found no rendered output");
            Err(ExportError::NoOutput)
        }
    }
}

/// Write an exported document, creating parent directories.
pub fn write_svg(svg: &str, path: &Path) -> Result<(), ExportError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, svg)
    };
    write().map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Surface;
    use std::sync::Arc;

    fn card() -> Vec<VNode> {
        vec![VNode::element(
            "div",
            vec![("style".into(), "padding:24px".into())],
            vec![
                VNode::text("Tom & Jerry"),
                VNode::element("input", vec![("type".into(), "email".into())], vec![]),
            ],
        )]
    }

    #[test]
    fn test_svg_embeds_xhtml() {
        let svg = to_svg(&card(), ExportOptions::default());
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"800\""));
        assert!(svg.contains("<foreignObject"));
        assert!(svg.contains("Tom &amp; Jerry"));
        assert!(svg.contains("<input type=\"email\" />"));
        assert!(svg.ends_with("</foreignObject></svg>"));
    }

    #[tokio::test]
    async fn test_export_requires_output() {
        let surface: SharedSurface = Arc::default();
        let err = export_svg(&surface, Duration::ZERO, ExportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::NoOutput));

        *surface.lock() = Surface::Rendered { nodes: card() };
        let svg = export_svg(&surface, Duration::from_millis(5), ExportOptions::default())
            .await
            .unwrap();
        assert!(svg.contains("padding:24px"));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/card.svg");
        write_svg("<svg/>", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg/>");
    }
}
