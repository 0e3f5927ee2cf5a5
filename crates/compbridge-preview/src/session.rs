//! The supervising side of a preview.
//!
//! A session owns the fault listener, the error console, the validation
//! slot and the current mount. Every source or input change synchronously
//! replaces the mount.

use std::sync::Arc;
use std::time::Duration;

use compbridge_config::PreviewSection;
use compbridge_types::FaultRecord;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::binder::{Resolution, resolve};
use crate::console::ErrorConsole;
use crate::document::{PreviewDocument, Synthesizer};
use crate::error::{ExportError, Result};
use crate::export::{self, ExportOptions};
use crate::host::{ExecutionHost, HostOptions, MountHandle, SharedSurface};
use crate::reporter::{self, ActiveMount, FaultSender, MountId};
use crate::surface::Surface;

/// Extra time allowed after the settle delay for the sandbox to report.
const SETTLE_MARGIN: Duration = Duration::from_millis(50);

/// A live preview of one component source and its input.
///
/// Must be created inside a tokio runtime; the fault listener runs as a
/// task for the lifetime of the session.
pub struct PreviewSession {
    settings: PreviewSection,
    synthesizer: Synthesizer,
    host: ExecutionHost,
    console: Arc<Mutex<ErrorConsole>>,
    surface: SharedSurface,
    tx: FaultSender,
    active: ActiveMount,
    listener: JoinHandle<()>,
    source: String,
    input_raw: String,
    input: Resolution,
    current: Option<MountHandle>,
    document: Option<PreviewDocument>,
}

impl PreviewSession {
    pub fn new(settings: PreviewSection) -> Self {
        let (tx, rx) = reporter::channel();
        let console = Arc::new(Mutex::new(ErrorConsole::new()));
        let active = ActiveMount::default();
        let listener = tokio::spawn(reporter::listen(rx, console.clone(), active.clone()));
        Self {
            synthesizer: Synthesizer::from_config(&settings),
            host: ExecutionHost::new(HostOptions {
                max_call_depth: settings.max_call_depth,
            }),
            settings,
            console,
            surface: SharedSurface::default(),
            tx,
            active,
            listener,
            source: String::new(),
            input_raw: "{}".to_string(),
            input: Resolution::default(),
            current: None,
            document: None,
        }
    }

    /// Replace the source and remount. When `clear_on_edit` is set the
    /// console is cleared after the old mount is gone and before the new
    /// one starts.
    pub fn set_source(&mut self, code: impl Into<String>) -> Result<()> {
        self.unmount();
        if self.settings.clear_on_edit {
            self.console.lock().clear();
        }
        self.source = code.into();
        self.remount()
    }

    /// Replace the raw input and remount with the resolved props.
    pub fn set_input(&mut self, raw: impl Into<String>) -> Result<()> {
        self.input_raw = raw.into();
        self.input = resolve(&self.input_raw);
        if let Some(message) = self.input.validation() {
            debug!(%message, "input validation");
        }
        self.remount()
    }

    /// Start over with no code, `{}` input and an empty console.
    pub fn reset(&mut self) {
        self.unmount();
        self.source.clear();
        self.input_raw = "{}".to_string();
        self.input = Resolution::default();
        self.document = None;
        self.console.lock().clear();
        *self.surface.lock() = Surface::Placeholder;
    }

    fn remount(&mut self) -> Result<()> {
        self.unmount();
        if self.source.trim().is_empty() {
            self.document = None;
            *self.surface.lock() = Surface::Placeholder;
            return Ok(());
        }
        let document = self.synthesizer.synthesize(&self.source, &self.input.parsed);
        *self.surface.lock() = Surface::Pending;
        let id = MountId::new();
        self.active.set(Some(id));
        let handle = match self.host.mount_as(
            id,
            document.clone(),
            self.tx.clone(),
            self.surface.clone(),
        ) {
            Ok(handle) => handle,
            Err(error) => {
                self.active.set(None);
                return Err(error);
            }
        };
        info!(mount = %handle.id(), entry = ?document.entry, "remounted");
        self.document = Some(document);
        self.current = Some(handle);
        Ok(())
    }

    fn unmount(&mut self) {
        self.active.set(None);
        if let Some(previous) = self.current.take() {
            previous.unmount();
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn input_raw(&self) -> &str {
        &self.input_raw
    }

    /// Props currently injected into the component.
    pub fn props(&self) -> serde_json::Value {
        self.input.props()
    }

    /// Contents of the validation slot.
    pub fn validation(&self) -> Option<String> {
        self.input.validation()
    }

    /// Snapshot of what the preview area shows.
    pub fn surface(&self) -> Surface {
        self.surface.lock().clone()
    }

    /// Snapshot of the error console in arrival order.
    pub fn console(&self) -> Vec<FaultRecord> {
        self.console.lock().records().to_vec()
    }

    pub fn clear_console(&self) {
        self.console.lock().clear();
    }

    /// Toggle console visibility; returns whether it is now collapsed.
    pub fn toggle_console(&self) -> bool {
        self.console.lock().toggle()
    }

    pub fn is_console_collapsed(&self) -> bool {
        self.console.lock().is_collapsed()
    }

    /// Document of the current mount.
    pub fn document(&self) -> Option<&PreviewDocument> {
        self.document.as_ref()
    }

    pub fn mount_id(&self) -> Option<MountId> {
        self.current.as_ref().map(MountHandle::id)
    }

    pub fn settle_delay(&self) -> Duration {
        self.settings.settle_delay()
    }

    /// Wait until the current mount's settle check has had time to report.
    pub async fn settled(&self) {
        tokio::time::sleep(self.settle_delay() + SETTLE_MARGIN).await;
    }

    /// Export the mounted output as SVG after the export settle delay.
    pub async fn export_svg(&self) -> std::result::Result<String, ExportError> {
        if self.current.is_none() {
            return Err(ExportError::NoOutput);
        }
        export::export_svg(
            &self.surface,
            self.settings.export_settle_delay(),
            ExportOptions::default(),
        )
        .await
    }

    /// Unmount and stop the listener.
    pub fn shutdown(mut self) {
        self.unmount();
        self.listener.abort();
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.unmount();
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compbridge_types::FaultKind;

    fn quick() -> PreviewSection {
        PreviewSection {
            settle_delay_ms: 20,
            export_settle_delay_ms: 20,
            ..PreviewSection::default()
        }
    }

    #[tokio::test]
    async fn test_blank_source_shows_placeholder() {
        let mut session = PreviewSession::new(quick());
        session.set_source("   \n").unwrap();
        assert_eq!(session.surface(), Surface::Placeholder);
        assert!(session.mount_id().is_none());
        assert!(session.document().is_none());
    }

    #[tokio::test]
    async fn test_invalid_input_sets_validation_only() {
        let mut session = PreviewSession::new(quick());
        session.set_source("const X = () => <p>hi</p>;").unwrap();
        session.set_input("{bad").unwrap();
        assert_eq!(session.validation().as_deref(), Some("invalid JSON"));
        assert_eq!(session.props(), serde_json::json!({}));
        session.settled().await;
        assert!(session.console().is_empty());
        assert_eq!(session.surface().nodes().map(<[_]>::len), Some(1));
    }

    #[tokio::test]
    async fn test_remount_replaces_mount() {
        let mut session = PreviewSession::new(quick());
        session.set_source("const A = () => <p>a</p>;").unwrap();
        let first = session.mount_id().unwrap();
        session.set_input(r#"{"x": 1}"#).unwrap();
        let second = session.mount_id().unwrap();
        assert_ne!(first, second);
        assert_eq!(session.document().unwrap().props_literal, r#"{"x":1}"#);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let mut session = PreviewSession::new(quick());
        session.set_input("[1]").unwrap();
        session
            .set_source("const X = () => { throw new Error(\"boom\") }")
            .unwrap();
        session.settled().await;
        assert_eq!(session.console()[0].kind, FaultKind::Runtime);

        session.reset();
        assert!(session.console().is_empty());
        assert_eq!(session.validation(), None);
        assert_eq!(session.input_raw(), "{}");
        assert_eq!(session.source(), "");
        assert_eq!(session.surface(), Surface::Placeholder);
    }

    #[tokio::test]
    async fn test_export_without_mount() {
        let session = PreviewSession::new(quick());
        assert!(matches!(
            session.export_svg().await,
            Err(ExportError::NoOutput)
        ));
    }
}
