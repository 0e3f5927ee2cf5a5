//! Isolated execution host: one sandbox thread and one fresh realm per
//! mount.
//!
//! A mount compiles the document, renders the entry component, runs a
//! single settle check and then keeps serving the realm's timers until it
//! is unmounted. Unmounting never waits for the sandbox; it raises the
//! interrupt flag, wakes the thread and detaches it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};
use std::time::Instant;

use compbridge_script::{
    DEFAULT_MAX_CALL_DEPTH, Realm, RealmOptions, ScriptError, Value, is_visually_empty, parse,
};
use compbridge_types::{EMPTY_RENDER_MESSAGE, FaultMessage};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::document::PreviewDocument;
use crate::error::{PreviewError, Result};
use crate::reporter::{FaultSender, MountId, Phase, Reporter, classify};
use crate::surface::Surface;

/// Message reported when the sandbox itself panics.
pub const INTERNAL_ERROR: &str = "internal sandbox error";

const SANDBOX_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Output surface shared between a session and its current mount.
pub type SharedSurface = Arc<Mutex<Surface>>;

/// Host settings applied to every mount.
#[derive(Debug, Clone)]
pub struct HostOptions {
    pub max_call_depth: usize,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Spawns sandboxed mounts.
#[derive(Debug, Clone, Default)]
pub struct ExecutionHost {
    options: HostOptions,
}

impl ExecutionHost {
    pub fn new(options: HostOptions) -> Self {
        Self { options }
    }

    /// Start a sandbox running `document`. Faults are posted on `tx`;
    /// rendered output goes to `surface`.
    pub fn mount(
        &self,
        document: PreviewDocument,
        tx: FaultSender,
        surface: SharedSurface,
    ) -> Result<MountHandle> {
        self.mount_as(MountId::new(), document, tx, surface)
    }

    /// Like [`mount`](Self::mount) with a caller-chosen id, so the listener
    /// can be told to accept it before the sandbox posts anything.
    pub fn mount_as(
        &self,
        id: MountId,
        document: PreviewDocument,
        tx: FaultSender,
        surface: SharedSurface,
    ) -> Result<MountHandle> {
        let torn_down = Arc::new(AtomicBool::new(false));
        let reporter = Reporter::new(tx, id, torn_down.clone());
        let sandbox = Sandbox {
            document,
            reporter,
            surface: SurfaceWriter {
                surface,
                torn_down: torn_down.clone(),
            },
            torn_down: torn_down.clone(),
            max_call_depth: self.options.max_call_depth,
        };
        let handle = thread::Builder::new()
            .name(format!("compbridge-sandbox-{}", &id.to_string()[..8]))
            .stack_size(SANDBOX_STACK_SIZE)
            .spawn(move || sandbox.run())
            .map_err(PreviewError::Spawn)?;
        debug!(mount = %id, "mounted");
        Ok(MountHandle {
            id,
            torn_down,
            thread: handle.thread().clone(),
        })
    }
}

/// Owner's handle on a running mount. Dropping it unmounts.
#[derive(Debug)]
pub struct MountHandle {
    id: MountId,
    torn_down: Arc<AtomicBool>,
    thread: Thread,
}

impl MountHandle {
    pub fn id(&self) -> MountId {
        self.id
    }

    pub fn is_unmounted(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Tear the mount down without waiting for its thread.
    pub fn unmount(&self) {
        if !self.torn_down.swap(true, Ordering::AcqRel) {
            debug!(mount = %self.id, "unmounted");
        }
        self.thread.unpark();
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Surface access for one mount; writes stop once it is torn down.
struct SurfaceWriter {
    surface: SharedSurface,
    torn_down: Arc<AtomicBool>,
}

impl SurfaceWriter {
    fn set(&self, next: Surface) {
        let mut surface = self.surface.lock();
        if !self.torn_down.load(Ordering::Acquire) {
            *surface = next;
        }
    }
}

struct Sandbox {
    document: PreviewDocument,
    reporter: Reporter,
    surface: SurfaceWriter,
    torn_down: Arc<AtomicBool>,
    max_call_depth: usize,
}

impl Sandbox {
    fn run(self) {
        let mount = self.reporter.mount();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute()));
        if outcome.is_err() {
            warn!(mount = %mount, "sandbox panicked");
            self.fail(FaultMessage::runtime(INTERNAL_ERROR, None));
        }
        debug!(mount = %mount, "sandbox exited");
    }

    fn interrupted(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Post a fault and show it in the preview area.
    fn fail(&self, message: FaultMessage) {
        self.surface.set(Surface::ErrorPanel {
            kind: message.kind(),
            message: message.message().to_string(),
        });
        self.reporter.post(&message);
    }

    fn report(&self, phase: Phase, error: &ScriptError) -> bool {
        match classify(phase, error) {
            Some(message) => {
                self.fail(message);
                true
            }
            None => false,
        }
    }

    fn publish(&self, realm: &Realm) {
        self.surface.set(Surface::Rendered {
            nodes: realm.output().to_vec(),
        });
    }

    fn execute(&self) {
        self.surface.set(Surface::Pending);
        let mut realm = Realm::new(RealmOptions {
            max_call_depth: self.max_call_depth,
            interrupt: self.torn_down.clone(),
        });

        let component = match self.compile(&mut realm) {
            Ok(component) => component,
            Err(message) => {
                if !self.interrupted() {
                    self.fail(message);
                }
                return;
            }
        };

        let mut settle_at = match realm.mount(&component, &self.document.props()) {
            Ok(()) => {
                self.publish(&realm);
                Some(Instant::now() + self.document.instrumentation.settle_delay())
            }
            Err(error) => {
                if !self.report(Phase::Render, &error) {
                    return;
                }
                None
            }
        };

        self.event_loop(&mut realm, &mut settle_at);
    }

    /// Parse and evaluate the prelude and source, then resolve the entry.
    fn compile(&self, realm: &mut Realm) -> std::result::Result<Value, FaultMessage> {
        let doc = &self.document;
        if doc.compiler != compbridge_script::DIALECT {
            return Err(FaultMessage::compile(format!(
                "unsupported compiler: {}",
                doc.compiler
            )));
        }
        for text in [&doc.prelude, &doc.source] {
            let program = parse(text).map_err(|e| FaultMessage::compile(e.to_string()))?;
            realm
                .evaluate(&program)
                .map_err(|e| FaultMessage::compile(e.to_string()))?;
        }
        let Some(name) = doc.entry.as_deref() else {
            return Err(FaultMessage::compile("component not found: `unknown`"));
        };
        match realm.global(name) {
            None | Some(Value::Undefined) => {
                Err(FaultMessage::compile(format!("component not found: `{name}`")))
            }
            Some(value) if !value.is_callable() => Err(FaultMessage::compile(format!(
                "component not found: `{name}` (not a function or class)"
            ))),
            Some(value) => Ok(value),
        }
    }

    /// Serve timers and the settle check until torn down.
    fn event_loop(&self, realm: &mut Realm, settle_at: &mut Option<Instant>) {
        loop {
            if self.interrupted() {
                return;
            }
            let now = Instant::now();
            match realm.run_next_timer(now) {
                Ok(true) => {
                    if realm.is_mounted() {
                        self.publish(realm);
                    }
                    continue;
                }
                Ok(false) => {}
                Err(error) => {
                    if error.is_interrupted() {
                        return;
                    }
                    self.deferred_error(realm, &error);
                    continue;
                }
            }
            if let Some(at) = *settle_at
                && now >= at
            {
                *settle_at = None;
                self.settle_check(realm);
            }
            let wake_at = match (realm.next_timer_deadline(), *settle_at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            match wake_at {
                Some(at) => thread::park_timeout(at.saturating_duration_since(Instant::now())),
                None => thread::park(),
            }
        }
    }

    /// An error escaped user code after render, as a global error
    /// interceptor would see it.
    fn deferred_error(&self, realm: &Realm, error: &ScriptError) {
        if !self.document.instrumentation.intercept_errors {
            debug!(mount = %self.reporter.mount(), %error, "uncaught error (not intercepted)");
            return;
        }
        let Some(message) = classify(Phase::Deferred, error) else {
            return;
        };
        if realm.is_mounted() {
            self.reporter.post(&message);
        } else {
            self.fail(message);
        }
    }

    fn settle_check(&self, realm: &Realm) {
        if !realm.is_mounted() || is_visually_empty(realm.output()) {
            self.surface.set(Surface::EmptyWarning {
                message: EMPTY_RENDER_MESSAGE.to_string(),
            });
            self.reporter.post(&FaultMessage::empty_render());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Synthesizer;
    use crate::reporter::channel;
    use compbridge_types::FaultKind;
    use serde_json::json;
    use std::time::Duration;

    fn run(code: &str, props: serde_json::Value) -> (MountHandle, SharedSurface, Vec<FaultMessage>) {
        let (tx, mut rx) = channel();
        let surface = SharedSurface::default();
        let doc = Synthesizer::default().synthesize(code, &props);
        let handle = ExecutionHost::default()
            .mount(doc, tx, surface.clone())
            .unwrap();
        thread::sleep(Duration::from_millis(300));
        let mut messages = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            assert_eq!(envelope.mount, handle.id());
            messages.extend(FaultMessage::from_wire(&envelope.payload));
        }
        (handle, surface, messages)
    }

    #[test]
    fn test_renders_visible_output() {
        let (_handle, surface, messages) = run(
            "const X = ({n}) => (n > 0 ? <div>{n}</div> : null);",
            json!({"n": 5}),
        );
        assert!(messages.is_empty(), "{messages:?}");
        assert_eq!(surface.lock().to_html(), "<div>5</div>");
    }

    #[test]
    fn test_empty_output_reported_once() {
        let (_handle, surface, messages) = run(
            "const X = ({n}) => (n > 0 ? <div>{n}</div> : null);",
            json!({"n": 0}),
        );
        assert_eq!(messages, [FaultMessage::empty_render()]);
        assert!(matches!(*surface.lock(), Surface::EmptyWarning { .. }));
    }

    #[test]
    fn test_compile_faults() {
        let (_h, surface, messages) = run("cosnt X = () => <div/>", json!({}));
        assert_eq!(messages, [FaultMessage::compile("component not found: `unknown`")]);
        assert!(surface.lock().is_error());

        let (_h, _, messages) = run("// const Missing = () => <div/>\nconsole.log('hi');", json!({}));
        assert_eq!(messages, [FaultMessage::compile("component not found: `Missing`")]);

        let (_h, _, messages) = run("const Config = { a: 1 };", json!({}));
        assert_eq!(
            messages,
            [FaultMessage::compile("component not found: `Config` (not a function or class)")]
        );

        let (_h, _, messages) = run("const X = () => <div>;", json!({}));
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message().starts_with("SyntaxError: "));
    }

    #[test]
    fn test_runtime_fault_reported_once() {
        let (_h, surface, messages) = run(
            "const X = () => { throw new Error(\"boom\") }",
            json!({}),
        );
        assert_eq!(messages, [FaultMessage::runtime("boom", Some(1))]);
        assert_eq!(
            *surface.lock(),
            Surface::ErrorPanel {
                kind: FaultKind::Runtime,
                message: "boom".into()
            }
        );
    }

    #[test]
    fn test_timer_errors_are_intercepted() {
        let code = "const X = () => {\n  useEffect(() => { setTimeout(() => { missing(); }, 10); }, []);\n  return <p>ok</p>;\n};";
        let (_h, surface, messages) = run(code, json!({}));
        assert_eq!(
            messages,
            [FaultMessage::runtime("ReferenceError: missing is not defined", Some(2))]
        );
        assert_eq!(surface.lock().to_html(), "<p>ok</p>");
    }

    #[test]
    fn test_unmount_stops_infinite_loop_silently() {
        let (tx, mut rx) = channel();
        let surface = SharedSurface::default();
        let doc = Synthesizer::default().synthesize(
            "const X = () => { while (true) {} };",
            &json!({}),
        );
        let handle = ExecutionHost::default().mount(doc, tx, surface).unwrap();
        thread::sleep(Duration::from_millis(50));
        handle.unmount();
        assert!(handle.is_unmounted());
        thread::sleep(Duration::from_millis(100));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unmounted_sandbox_stops_writing_surface() {
        let (tx, _rx) = channel();
        let surface = SharedSurface::default();
        let doc = Synthesizer::default().synthesize(
            "const X = () => { const [n, setN] = useState(0); useEffect(() => { const id = setInterval(() => setN(c => c + 1), 5); return () => clearInterval(id); }, []); return <i>{n}</i>; };",
            &json!({}),
        );
        let handle = ExecutionHost::default().mount(doc, tx, surface.clone()).unwrap();
        thread::sleep(Duration::from_millis(60));
        drop(handle);
        let frozen = surface.lock().clone();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(*surface.lock(), frozen);
    }
}
