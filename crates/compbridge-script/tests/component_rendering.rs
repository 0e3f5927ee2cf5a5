//! End-to-end tests: parse, evaluate and mount components through the
//! public API.

use compbridge_script::{Realm, RealmOptions, ScriptError, is_visually_empty, parse, to_html, visible_text};
use serde_json::json;

fn render(src: &str, name: &str, props: serde_json::Value) -> Result<Realm, ScriptError> {
    let mut realm = Realm::new(RealmOptions::default());
    realm.evaluate(&parse(src)?)?;
    let component = realm.global(name).expect("component is declared");
    realm.mount(&component, &props)?;
    Ok(realm)
}

#[test]
fn test_primary_button_styles() {
    let src = r#"const PrimaryButton = ({ text }) => {
  return (
    <div style={{
      display: 'inline-block',
      padding: '10px 20px',
      backgroundColor: '#1e40af',
      borderRadius: '6px',
    }}>
      {text || 'Button'}
    </div>
  );
};"#;
    let realm = render(src, "PrimaryButton", json!({"text": "Send"})).unwrap();
    assert_eq!(
        to_html(realm.output()),
        "<div style=\"display:inline-block;padding:10px 20px;background-color:#1e40af;\
         border-radius:6px\">Send</div>"
    );

    let realm = render(src, "PrimaryButton", json!({})).unwrap();
    assert_eq!(visible_text(realm.output()), "Button");
}

#[test]
fn test_tab_navigation_list() {
    let src = r#"const TabNavigation = ({ tabs = [] }) => {
  const tabList = tabs.length > 0 ? tabs : ['Tab 1', 'Tab 2', 'Tab 3'];
  const [activeTab, setActiveTab] = React.useState(tabList[0]);
  return (
    <nav>
      {tabList.map((tab, i) => (
        <button key={i} onClick={() => setActiveTab(tab)} aria-selected={tab === activeTab}>
          {tab}
        </button>
      ))}
    </nav>
  );
};"#;
    let realm = render(src, "TabNavigation", json!({"tabs": ["Overview", "Details"]})).unwrap();
    assert_eq!(
        to_html(realm.output()),
        "<nav><button aria-selected=\"true\">Overview</button>\
         <button aria-selected=\"false\">Details</button></nav>"
    );

    let realm = render(src, "TabNavigation", json!({})).unwrap();
    assert_eq!(visible_text(realm.output()), "Tab 1Tab 2Tab 3");
}

#[test]
fn test_fragments_and_nested_components() {
    let src = r#"
function Item({ label, done }) {
  return <li className={done ? "done" : undefined}>{label}{done && " ✓"}</li>;
}
function Checklist({ items }) {
  return (
    <>
      <h2>{`${items.filter(i => i.done).length}/${items.length} done`}</h2>
      <ul>{items.map(item => <Item key={item.label} {...item} />)}</ul>
    </>
  );
}
"#;
    let realm = render(
        src,
        "Checklist",
        json!({"items": [{"label": "write", "done": true}, {"label": "ship", "done": false}]}),
    )
    .unwrap();
    assert_eq!(
        to_html(realm.output()),
        "<h2>1/2 done</h2><ul><li class=\"done\">write ✓</li><li>ship</li></ul>"
    );
}

#[test]
fn test_empty_render_is_visually_empty() {
    let realm = render("const Blank = () => <div></div>;", "Blank", json!({})).unwrap();
    assert!(is_visually_empty(realm.output()));

    let realm = render("const Nothing = () => null;", "Nothing", json!({})).unwrap();
    assert!(realm.output().is_empty());
}

#[test]
fn test_runtime_errors_use_js_wording() {
    let err = render(
        "const X = ({ user }) => <p>{user.name}</p>;",
        "X",
        json!({}),
    )
    .err()
    .unwrap();
    assert_eq!(
        err.to_string(),
        "TypeError: Cannot read properties of undefined (reading 'name')"
    );

    let err = render("const X = () => <p>{missing}</p>;", "X", json!({}))
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "ReferenceError: missing is not defined");

    let err = render("const X = () => { const f = 1; return f(); };", "X", json!({}))
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "TypeError: f is not a function");
}

fn render_error(body: &str) -> String {
    let src = format!("const X = () => {{ {body} return <p>ok</p>; }};");
    render(&src, "X", json!({})).err().unwrap().to_string()
}

#[test]
fn test_huge_index_is_a_plain_property() {
    let realm = render(
        "const X = () => { const a = []; a[4294967296000] = 1; a[4294967295] = 2; return <p>{a.length}</p>; };",
        "X",
        json!({}),
    )
    .unwrap();
    assert_eq!(visible_text(realm.output()), "0");
}

#[test]
fn test_oversized_arrays_throw_range_errors() {
    for body in [
        "const a = []; a.length = 4294967296;",
        "const a = []; a.length = 1.5;",
        "const a = []; a.length = 4000000000;",
        "const a = []; a[4000000000] = 1;",
        "new Array(4294967295);",
        "Array.from({ length: 1e12 });",
    ] {
        assert_eq!(render_error(body), "RangeError: Invalid array length", "{body}");
    }
}

#[test]
fn test_oversized_strings_throw_range_errors() {
    for body in [
        "'ab'.repeat(1e9);",
        "'x'.padStart(1e12);",
        "'x'.padEnd(4294967295, 'yz');",
        "let s = 'x'.repeat(1e7); for (let i = 0; i < 8; i++) { s = s + s; }",
        "let s = 'x'.repeat(1e7); for (let i = 0; i < 8; i++) { s = `${s}${s}`; }",
    ] {
        assert_eq!(render_error(body), "RangeError: Invalid string length", "{body}");
    }
    assert_eq!(
        render_error("'x'.repeat(-1);"),
        "RangeError: Invalid count value: -1"
    );
    assert_eq!(
        render_error("'x'.repeat(Infinity);"),
        "RangeError: Invalid count value: Infinity"
    );
}

#[test]
fn test_syntax_error_reports_position() {
    let err = parse("const X = () => <div>;").unwrap_err();
    assert!(matches!(err, ScriptError::Syntax { line: 1, .. }));
    assert!(err.to_string().starts_with("SyntaxError: "));
}
