//! Fault classification and the one-way message channel out of a sandbox.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use compbridge_script::ScriptError;
use compbridge_types::FaultMessage;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};
use uuid::Uuid;

use crate::console::ErrorConsole;

/// Identifies one mount in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(Uuid);

impl MountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where in a mount's lifetime an error escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Parsing, module evaluation and entry resolution.
    Compile,
    /// The initial render call and its commit.
    Render,
    /// Timers, effects and state-driven re-renders after render returned.
    Deferred,
}

/// Classify an escaped error. Teardown interruptions are not faults.
pub fn classify(phase: Phase, error: &ScriptError) -> Option<FaultMessage> {
    if error.is_interrupted() {
        return None;
    }
    Some(match phase {
        Phase::Compile => FaultMessage::compile(error.to_string()),
        Phase::Render | Phase::Deferred => FaultMessage::runtime(error.to_string(), error.line()),
    })
}

/// A wire payload tagged with the mount that posted it.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub mount: MountId,
    pub payload: Value,
}

/// Sending half of the fault channel.
pub type FaultSender = UnboundedSender<Envelope>;

/// Create the fault channel shared by all mounts of a session.
pub fn channel() -> (FaultSender, UnboundedReceiver<Envelope>) {
    mpsc::unbounded_channel()
}

/// The mount whose faults the listener currently accepts.
#[derive(Debug, Clone, Default)]
pub struct ActiveMount(Arc<Mutex<Option<MountId>>>);

impl ActiveMount {
    pub fn set(&self, mount: Option<MountId>) {
        *self.0.lock() = mount;
    }

    pub fn get(&self) -> Option<MountId> {
        *self.0.lock()
    }

    pub fn accepts(&self, mount: MountId) -> bool {
        self.get() == Some(mount)
    }
}

/// Posts fault messages for one mount. Posting is fire-and-forget and
/// becomes a no-op once the mount is torn down.
#[derive(Clone)]
pub struct Reporter {
    tx: FaultSender,
    mount: MountId,
    torn_down: Arc<AtomicBool>,
}

impl Reporter {
    pub fn new(tx: FaultSender, mount: MountId, torn_down: Arc<AtomicBool>) -> Self {
        Self {
            tx,
            mount,
            torn_down,
        }
    }

    pub fn mount(&self) -> MountId {
        self.mount
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    pub fn post(&self, message: &FaultMessage) {
        if self.is_torn_down() {
            debug!(mount = %self.mount, tag = message.tag(), "dropping fault from torn-down mount");
            return;
        }
        info!(mount = %self.mount, kind = ?message.kind(), message = message.message(), "fault");
        // A closed channel means the session is gone.
        let _ = self.tx.send(Envelope {
            mount: self.mount,
            payload: message.to_wire(),
        });
    }
}

/// Append every recognized message from the active mount to `console`
/// until all senders drop. Messages still queued from a replaced mount are
/// discarded.
pub async fn listen(
    mut rx: UnboundedReceiver<Envelope>,
    console: Arc<Mutex<ErrorConsole>>,
    active: ActiveMount,
) {
    while let Some(Envelope { mount, payload }) = rx.recv().await {
        let Some(message) = FaultMessage::from_wire(&payload) else {
            debug!(%payload, "ignoring unrecognized message");
            continue;
        };
        // The active mount is checked under the console lock, so a clear
        // that follows a mount switch removes anything accepted before it.
        let mut console = console.lock();
        if active.accepts(mount) {
            console.append(message.into_record());
        } else {
            debug!(%mount, tag = message.tag(), "dropping fault from replaced mount");
        }
    }
    debug!("fault channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use compbridge_types::FaultKind;
    use serde_json::json;

    #[test]
    fn test_classify_by_phase() {
        let thrown = ScriptError::Thrown {
            message: "boom".into(),
            line: Some(4),
        };
        assert_eq!(
            classify(Phase::Render, &thrown),
            Some(FaultMessage::runtime("boom", Some(4)))
        );
        assert_eq!(
            classify(Phase::Compile, &thrown),
            Some(FaultMessage::compile("boom"))
        );
        assert_eq!(classify(Phase::Deferred, &ScriptError::Interrupted), None);
    }

    #[test]
    fn test_post_after_teardown_is_noop() {
        let (tx, mut rx) = channel();
        let torn_down = Arc::new(AtomicBool::new(false));
        let reporter = Reporter::new(tx, MountId::new(), torn_down.clone());
        reporter.post(&FaultMessage::compile("first"));
        torn_down.store(true, Ordering::Release);
        reporter.post(&FaultMessage::compile("second"));
        assert_eq!(rx.try_recv().unwrap().payload["message"], "first");
        assert!(rx.try_recv().is_err());
    }

    fn envelope(mount: MountId, payload: Value) -> Envelope {
        Envelope { mount, payload }
    }

    #[tokio::test]
    async fn test_listener_appends_in_arrival_order() {
        let (tx, rx) = channel();
        let console = Arc::new(Mutex::new(ErrorConsole::new()));
        let mount = MountId::new();
        let active = ActiveMount::default();
        active.set(Some(mount));
        for payload in [
            FaultMessage::runtime("a", Some(1)).to_wire(),
            json!({"type": "resize", "height": 3}),
            json!("garbage"),
            FaultMessage::empty_render().to_wire(),
            FaultMessage::runtime("a", Some(1)).to_wire(),
        ] {
            tx.send(envelope(mount, payload)).unwrap();
        }
        drop(tx);
        listen(rx, console.clone(), active).await;

        let console = console.lock();
        let kinds: Vec<_> = console.records().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [FaultKind::Runtime, FaultKind::EmptyOutput, FaultKind::Runtime]
        );
    }

    #[tokio::test]
    async fn test_listener_drops_faults_from_replaced_mount() {
        let (tx, rx) = channel();
        let console = Arc::new(Mutex::new(ErrorConsole::new()));
        let (old, new) = (MountId::new(), MountId::new());
        let active = ActiveMount::default();
        active.set(Some(new));
        tx.send(envelope(old, FaultMessage::runtime("stale", Some(1)).to_wire()))
            .unwrap();
        tx.send(envelope(new, FaultMessage::compile("fresh").to_wire()))
            .unwrap();
        drop(tx);
        listen(rx, console.clone(), active).await;

        let console = console.lock();
        let messages: Vec<_> = console.records().iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["fresh"]);
    }

    #[tokio::test]
    async fn test_listener_drops_everything_without_active_mount() {
        let (tx, rx) = channel();
        let console = Arc::new(Mutex::new(ErrorConsole::new()));
        tx.send(envelope(MountId::new(), FaultMessage::empty_render().to_wire()))
            .unwrap();
        drop(tx);
        listen(rx, console.clone(), ActiveMount::default()).await;
        assert!(console.lock().records().is_empty());
    }
}
