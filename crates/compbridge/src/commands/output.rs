//! Rendering a session's state for the terminal.

use anyhow::Result;
use compbridge_preview::{PreviewSession, Surface};
use compbridge_types::FaultRecord;
use console::Style;
use serde::Serialize;

use super::Context;

/// What a preview shows once it has settled.
#[derive(Debug, Serialize)]
pub struct Report {
    pub surface: Surface,
    pub html: String,
    pub faults: Vec<FaultRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
}

impl Report {
    pub fn capture(session: &PreviewSession) -> Self {
        let surface = session.surface();
        Self {
            html: surface.to_html(),
            surface,
            faults: session.console(),
            validation: session.validation(),
        }
    }

    /// Number of compile and runtime faults. Empty output is a warning.
    pub fn error_count(&self) -> usize {
        self.faults.iter().filter(|f| !f.kind.is_warning()).count()
    }

    pub fn print(&self, ctx: &Context) -> Result<()> {
        if ctx.json_output {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }

        let dim = Style::new().dim();
        let (red, green, yellow) = (
            Style::new().red(),
            Style::new().green(),
            Style::new().yellow(),
        );
        match &self.surface {
            Surface::Rendered { .. } => println!("{} rendered", green.apply_to("✓")),
            Surface::ErrorPanel { kind, .. } => {
                println!("{} {} error", red.apply_to("✗"), kind)
            }
            Surface::EmptyWarning { .. } => println!("{} empty output", yellow.apply_to("⚠")),
            Surface::Placeholder => println!("{}", dim.apply_to("no component code")),
            Surface::Pending => println!("{}", dim.apply_to("still rendering")),
        }
        if !self.html.is_empty() {
            println!("{}", self.html);
        }
        if let Some(ref message) = self.validation {
            println!("{} input: {}", yellow.apply_to("⚠"), message);
        }
        if !self.faults.is_empty() {
            println!();
            println!("Console ({}):", self.faults.len());
            for fault in &self.faults {
                let style = if fault.kind.is_warning() { &yellow } else { &red };
                println!("  {}", style.apply_to(fault));
            }
        }
        Ok(())
    }
}
