//! A disposable execution context: globals, hook store, timers and the
//! rendered output of one mounted root.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use tracing::debug;

use crate::ast::Program;
use crate::error::Result;
use crate::hooks::run_pending;
use crate::interpreter::{ErrorKind, Flow, Interpreter, make_element};
use crate::render::render_root;
use crate::value::{ElementType, Object, Value};
use crate::vdom::VNode;

/// Default limit on nested calls before a `RangeError` is thrown.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

const MAX_NESTED_UPDATES: usize = 50;

const MAX_UPDATE_DEPTH: &str = "Maximum update depth exceeded. This can happen when a component \
     repeatedly calls setState inside componentWillUpdate or componentDidUpdate. React limits \
     the number of nested updates to prevent infinite loops.";

/// Options for a new [`Realm`].
#[derive(Debug, Clone)]
pub struct RealmOptions {
    pub max_call_depth: usize,
    /// Set from another thread to abandon execution at the next check.
    pub interrupt: Arc<AtomicBool>,
}

impl Default for RealmOptions {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// One isolated interpreter instance with at most one mounted root.
pub struct Realm {
    interp: Interpreter,
    root: Option<Value>,
    output: Vec<VNode>,
}

impl Realm {
    pub fn new(options: RealmOptions) -> Self {
        Self {
            interp: Interpreter::new(options.max_call_depth, options.interrupt),
            root: None,
            output: Vec::new(),
        }
    }

    /// Run a parsed program's top-level statements in the global scope.
    pub fn evaluate(&mut self, program: &Program) -> Result<()> {
        let outcome = self.interp.run_program(program);
        settle(outcome)
    }

    /// Look up a global binding, including top-level declarations.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.interp.globals.lookup(name)
    }

    /// Mount `component` as the root with `props`, render it and run the
    /// initial effects. Non-object props mount as `{}`.
    pub fn mount(&mut self, component: &Value, props: &serde_json::Value) -> Result<()> {
        let element = make_element(
            ElementType::Component(component.clone()),
            props_from_json(props),
            None,
        );
        self.root = Some(element);
        self.interp.hooks.reset();
        self.interp.hooks.mark_dirty();
        let outcome = self.flush();
        self.finish(outcome)
    }

    /// Children of the output root after the last committed render.
    pub fn output(&self) -> &[VNode] {
        &self.output
    }

    pub fn is_mounted(&self) -> bool {
        self.root.is_some()
    }

    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.interp.timers.next_deadline()
    }

    pub fn has_pending_timers(&self) -> bool {
        !self.interp.timers.is_empty()
    }

    /// Run the earliest timer due at `now` and commit the updates it
    /// caused. Returns `Ok(false)` when nothing was due.
    ///
    /// A callback that throws leaves the tree mounted; a failure while
    /// re-rendering afterwards unmounts it.
    pub fn run_next_timer(&mut self, now: Instant) -> Result<bool> {
        let Some(due) = self.interp.timers.pop_due(now) else {
            return Ok(false);
        };
        let outcome = self.interp.call(&due.callback, Value::Undefined, due.args);
        if let Err(control) = outcome {
            settle(Err(control))?;
        }
        let outcome = self.flush();
        self.finish(outcome)?;
        Ok(true)
    }

    /// Re-render while updates are pending, running post-commit work in
    /// between.
    fn flush(&mut self) -> Flow<()> {
        let mut updates = 0;
        loop {
            let dirty = self.interp.hooks.take_dirty();
            if dirty && self.root.is_some() {
                updates += 1;
                if updates > MAX_NESTED_UPDATES {
                    return Err(self.interp.throw(ErrorKind::Error, MAX_UPDATE_DEPTH));
                }
                self.render()?;
            }
            let work = self.interp.hooks.take_pending();
            if !dirty && work.is_empty() {
                return Ok(());
            }
            for task in work {
                run_pending(&mut self.interp, task)?;
            }
        }
    }

    fn render(&mut self) -> Flow<()> {
        let Some(root) = self.root.clone() else {
            return Ok(());
        };
        self.interp.hooks.begin_pass();
        let output = render_root(&mut self.interp, &root)?;
        self.interp.hooks.end_pass();
        debug!(nodes = output.len(), "committed render");
        self.output = output;
        Ok(())
    }

    /// Unmount the tree after an uncaught error during render or commit.
    fn finish(&mut self, outcome: Flow<()>) -> Result<()> {
        let result = settle(outcome);
        if let Err(err) = &result
            && !err.is_interrupted()
        {
            self.root = None;
            self.output.clear();
            self.interp.hooks.reset();
        }
        result
    }
}

fn settle(outcome: Flow<()>) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(control) => match Interpreter::into_script_error(control) {
            Some(err) => Err(err),
            None => Ok(()),
        },
    }
}

/// Convert JSON props into a props object; anything but an object maps to
/// an empty one.
fn props_from_json(json: &serde_json::Value) -> Object {
    let mut props = Object::default();
    if let Value::Object(obj) = Value::from_json(json) {
        props.props = std::mem::take(&mut obj.borrow_mut().props);
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use crate::vdom::{to_html, visible_text};
    use serde_json::json;
    use std::time::Duration;

    fn realm_with(src: &str) -> Realm {
        let mut realm = Realm::new(RealmOptions::default());
        let program = parse_program(src).unwrap();
        realm.evaluate(&program).unwrap();
        realm
    }

    fn mount(src: &str, name: &str, props: serde_json::Value) -> (Realm, Result<()>) {
        let mut realm = realm_with(src);
        let component = realm.global(name).unwrap();
        let result = realm.mount(&component, &props);
        (realm, result)
    }

    #[test]
    fn test_conditional_render() {
        let src = "const X = ({n}) => (n > 0 ? <div>{n}</div> : null);";
        let (realm, result) = mount(src, "X", json!({"n": 5}));
        result.unwrap();
        assert_eq!(to_html(realm.output()), "<div>5</div>");

        let (realm, result) = mount(src, "X", json!({"n": 0}));
        result.unwrap();
        assert!(realm.output().is_empty());
    }

    #[test]
    fn test_thrown_error_unmounts() {
        let (realm, result) = mount(
            "const X = () => { throw new Error(\"boom\") }",
            "X",
            json!({}),
        );
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.line(), Some(1));
        assert!(!realm.is_mounted());
    }

    #[test]
    fn test_effect_updates_state() {
        let src = r#"
            const { useState, useEffect } = React;
            function Loader() {
                const [label, setLabel] = useState("loading");
                useEffect(() => { setLabel("ready"); }, []);
                return <p className="status">{label}</p>;
            }
        "#;
        let (realm, result) = mount(src, "Loader", json!({}));
        result.unwrap();
        assert_eq!(to_html(realm.output()), "<p class=\"status\">ready</p>");
    }

    #[test]
    fn test_timer_driven_update() {
        let src = r#"
            const { useState, useEffect } = React;
            const Ticker = () => {
                const [n, setN] = useState(0);
                useEffect(() => {
                    const id = setInterval(() => setN(c => c + 1), 10);
                    return () => clearInterval(id);
                }, []);
                if (n >= 3) return <span>done</span>;
                return <span>{n}</span>;
            };
        "#;
        let (mut realm, result) = mount(src, "Ticker", json!({}));
        result.unwrap();
        assert_eq!(visible_text(realm.output()), "0");
        let mut guard = 0;
        while visible_text(realm.output()) != "done" && guard < 10 {
            let now = realm.next_timer_deadline().unwrap();
            assert!(realm.run_next_timer(now).unwrap());
            guard += 1;
        }
        assert_eq!(visible_text(realm.output()), "done");
    }

    #[test]
    fn test_timer_error_keeps_tree() {
        let src = r#"
            const X = () => {
                React.useEffect(() => { setTimeout(() => { null.x; }, 0); }, []);
                return <b>still here</b>;
            };
        "#;
        let (mut realm, result) = mount(src, "X", json!({}));
        result.unwrap();
        let err = realm
            .run_next_timer(Instant::now() + Duration::from_millis(5))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: Cannot read properties of null (reading 'x')"
        );
        assert!(realm.is_mounted());
        assert_eq!(visible_text(realm.output()), "still here");
        assert!(!realm.has_pending_timers());
    }

    #[test]
    fn test_runaway_updates_are_capped() {
        let src = r#"
            const { useState, useEffect } = React;
            const Loop = () => {
                const [n, setN] = useState(0);
                useEffect(() => { setN(n + 1); });
                return <i>{n}</i>;
            };
        "#;
        let (realm, result) = mount(src, "Loop", json!({}));
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("Maximum update depth exceeded"));
        assert!(realm.output().is_empty());
    }

    #[test]
    fn test_class_component_lifecycle() {
        let src = r#"
            class Counter extends React.Component {
                constructor(props) {
                    super(props);
                    this.state = { count: props.start };
                }
                componentDidMount() {
                    this.setState({ count: this.state.count + 1 });
                }
                render() {
                    return <div>{this.props.label}: {this.state.count}</div>;
                }
            }
        "#;
        let (realm, result) = mount(src, "Counter", json!({"start": 41, "label": "Count"}));
        result.unwrap();
        assert_eq!(visible_text(realm.output()), "Count: 42");
    }

    #[test]
    fn test_non_object_props_mount_as_empty() {
        let (realm, result) = mount(
            "const X = (props) => <div>{Object.keys(props).length}</div>;",
            "X",
            json!([1, 2, 3]),
        );
        result.unwrap();
        assert_eq!(visible_text(realm.output()), "0");
    }

    #[test]
    fn test_interrupt_abandons_infinite_loop() {
        let interrupt = Arc::new(AtomicBool::new(true));
        let mut realm = Realm::new(RealmOptions {
            interrupt,
            ..RealmOptions::default()
        });
        let program = parse_program("while (true) {}").unwrap();
        let err = realm.evaluate(&program).unwrap_err();
        assert!(err.is_interrupted());
    }

    #[test]
    fn test_deep_recursion_is_a_range_error() {
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let mut realm = realm_with("function f(n) { return f(n + 1); }");
                let program = parse_program("f(0);").unwrap();
                realm.evaluate(&program).unwrap_err().to_string()
            })
            .unwrap();
        assert_eq!(
            handle.join().unwrap(),
            "RangeError: Maximum call stack size exceeded"
        );
    }
}
