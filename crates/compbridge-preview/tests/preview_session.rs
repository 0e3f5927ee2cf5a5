//! Session-level behavior: edits in, faults and surfaces out.

use compbridge_config::PreviewSection;
use compbridge_preview::{PreviewSession, Surface};
use compbridge_script::visible_text;
use compbridge_types::{EMPTY_RENDER_MESSAGE, FaultKind, FaultRecord};

fn settings() -> PreviewSection {
    PreviewSection {
        settle_delay_ms: 30,
        export_settle_delay_ms: 30,
        ..PreviewSection::default()
    }
}

async fn preview(code: &str, input: &str) -> PreviewSession {
    let mut session = PreviewSession::new(settings());
    session.set_input(input).unwrap();
    session.set_source(code).unwrap();
    session.settled().await;
    session
}

fn kinds(records: &[FaultRecord]) -> Vec<FaultKind> {
    records.iter().map(|r| r.kind).collect()
}

const CONDITIONAL: &str = "const X = ({n}) => (n>0 ? <div>{n}</div> : null)";

#[tokio::test]
async fn test_visible_render_has_no_faults() {
    let session = preview(CONDITIONAL, r#"{"n": 5}"#).await;
    assert!(session.console().is_empty());
    let surface = session.surface();
    assert_eq!(visible_text(surface.nodes().unwrap()), "5");
}

#[tokio::test]
async fn test_null_render_is_one_empty_output_fault() {
    let session = preview(CONDITIONAL, r#"{"n": 0}"#).await;
    let console = session.console();
    assert_eq!(kinds(&console), [FaultKind::EmptyOutput]);
    assert_eq!(console[0].message, EMPTY_RENDER_MESSAGE);
    assert_eq!(
        session.surface(),
        Surface::EmptyWarning {
            message: EMPTY_RENDER_MESSAGE.to_string()
        }
    );
}

#[tokio::test]
async fn test_throw_is_one_runtime_fault() {
    let session = preview("const X = () => { throw new Error(\"boom\") }", "{}").await;
    let console = session.console();
    assert_eq!(kinds(&console), [FaultKind::Runtime]);
    assert!(console[0].message.contains("boom"));
    assert!(session.surface().is_error());
}

#[tokio::test]
async fn test_misspelled_keyword_is_compile_fault() {
    let session = preview("cosnt X = () => <div/>", "{}").await;
    let console = session.console();
    assert_eq!(kinds(&console), [FaultKind::Compile]);
    assert!(console[0].message.starts_with("component not found"));
}

#[tokio::test]
async fn test_malformed_input_still_renders() {
    let session = preview(
        "const Greeting = ({ name }) => <h1>Hello {name || 'there'}</h1>;",
        r#"{"name": "#,
    )
    .await;
    assert_eq!(session.validation().as_deref(), Some("invalid JSON"));
    assert!(session.console().is_empty());
    assert_eq!(visible_text(session.surface().nodes().unwrap()), "Hello there");
}

#[tokio::test]
async fn test_source_edit_clears_console_once() {
    let failing = "const X = () => { throw new Error(\"boom\") }";
    let mut session = preview(failing, "{}").await;
    assert_eq!(session.console().len(), 1);

    session.set_source(failing).unwrap();
    session.settled().await;
    assert_eq!(session.console().len(), 1);

    // Input edits leave the log alone.
    session.set_input(r#"{"a": 1}"#).unwrap();
    session.settled().await;
    assert_eq!(session.console().len(), 2);
}

#[tokio::test]
async fn test_queued_fault_from_previous_source_is_discarded() {
    let mut session = PreviewSession::new(settings());
    session
        .set_source("const X = () => { throw new Error(\"stale\") }")
        .unwrap();
    // Block the runtime so the old mount's fault sits in the channel.
    std::thread::sleep(std::time::Duration::from_millis(100));
    session.set_source("const Y = () => <p>fine</p>;").unwrap();
    session.settled().await;
    assert!(session.console().is_empty(), "{:?}", session.console());
    assert_eq!(visible_text(session.surface().nodes().unwrap()), "fine");
}

#[tokio::test]
async fn test_console_accumulates_without_clear_on_edit() {
    let failing = "const X = () => { throw new Error(\"boom\") }";
    let mut session = PreviewSession::new(PreviewSection {
        clear_on_edit: false,
        ..settings()
    });
    for _ in 0..3 {
        session.set_source(failing).unwrap();
        session.settled().await;
    }
    assert_eq!(session.console().len(), 3);
    session.clear_console();
    assert!(session.console().is_empty());
}

#[tokio::test]
async fn test_superseded_mount_stays_silent() {
    let mut session = PreviewSession::new(settings());
    session
        .set_source("const Spin = () => { while (true) {} }")
        .unwrap();
    session.set_source("const Ok = () => <b>ok</b>;").unwrap();
    session.settled().await;
    assert!(session.console().is_empty());
    assert_eq!(visible_text(session.surface().nodes().unwrap()), "ok");
}

#[tokio::test]
async fn test_oversized_allocation_is_a_runtime_fault() {
    let session = preview(
        "const X = () => { const a = []; a[4294967296000] = 1; return <p>{a.length}</p>; };",
        "{}",
    )
    .await;
    assert!(session.console().is_empty());
    assert_eq!(visible_text(session.surface().nodes().unwrap()), "0");

    let session = preview(
        "const X = () => { const a = []; a[4000000000] = 1; return <p>x</p>; };",
        "{}",
    )
    .await;
    let console = session.console();
    assert_eq!(kinds(&console), [FaultKind::Runtime]);
    assert_eq!(console[0].message, "RangeError: Invalid array length");
}

#[tokio::test]
async fn test_export_produces_svg() {
    let session = preview("const Card = () => <div className=\"card\">Hi</div>;", "{}").await;
    let svg = session.export_svg().await.unwrap();
    assert!(svg.contains("<div class=\"card\">Hi</div>"));

    let empty = preview(CONDITIONAL, r#"{"n": 0}"#).await;
    assert!(empty.export_svg().await.is_err());
}
