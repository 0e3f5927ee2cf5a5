//! Turns element values into [`VNode`] trees, driving component renders.

use std::rc::Rc;

use crate::hooks::Pending;
use crate::interpreter::{ErrorKind, Flow, Interpreter, own_entries};
use crate::value::{Element, ElementType, Function, Value, number_to_string};
use crate::vdom::VNode;

const MAX_RENDER_PHASE_UPDATES: usize = 25;

pub(crate) const TOO_MANY_RERENDERS: &str =
    "Too many re-renders. React limits the number of renders to prevent an infinite loop.";

const UNITLESS: &[&str] = &[
    "animationIterationCount",
    "aspectRatio",
    "borderImageOutset",
    "borderImageSlice",
    "borderImageWidth",
    "boxFlex",
    "boxFlexGroup",
    "boxOrdinalGroup",
    "columnCount",
    "columns",
    "flex",
    "flexGrow",
    "flexPositive",
    "flexShrink",
    "flexNegative",
    "flexOrder",
    "gridArea",
    "gridRow",
    "gridRowEnd",
    "gridRowSpan",
    "gridRowStart",
    "gridColumn",
    "gridColumnEnd",
    "gridColumnSpan",
    "gridColumnStart",
    "fontWeight",
    "lineClamp",
    "lineHeight",
    "opacity",
    "order",
    "orphans",
    "scale",
    "tabSize",
    "widows",
    "zIndex",
    "zoom",
    "fillOpacity",
    "floodOpacity",
    "stopOpacity",
    "strokeDasharray",
    "strokeDashoffset",
    "strokeMiterlimit",
    "strokeOpacity",
    "strokeWidth",
];

/// SVG attributes React writes in kebab-case.
const SVG_KEBAB: &[&str] = &[
    "clipPath",
    "clipRule",
    "dominantBaseline",
    "fillOpacity",
    "fillRule",
    "fontFamily",
    "fontSize",
    "fontWeight",
    "stopColor",
    "stopOpacity",
    "strokeDasharray",
    "strokeDashoffset",
    "strokeLinecap",
    "strokeLinejoin",
    "strokeMiterlimit",
    "strokeOpacity",
    "strokeWidth",
    "textAnchor",
];

/// Attributes whose camelCase survives into markup.
const CASE_SENSITIVE: &[&str] = &[
    "viewBox",
    "preserveAspectRatio",
    "gradientUnits",
    "gradientTransform",
    "patternUnits",
    "markerWidth",
    "markerHeight",
    "refX",
    "refY",
];

/// Render the root element into the output root's children.
pub(crate) fn render_root(interp: &mut Interpreter, root: &Value) -> Flow<Vec<VNode>> {
    render_node(interp, root, "root")
}

fn render_node(interp: &mut Interpreter, value: &Value, path: &str) -> Flow<Vec<VNode>> {
    interp.check_interrupt()?;
    match value {
        Value::Undefined | Value::Null | Value::Bool(_) | Value::Symbol(_) => Ok(Vec::new()),
        Value::String(s) => Ok(vec![VNode::text(s.to_string())]),
        Value::Number(n) => Ok(vec![VNode::text(number_to_string(*n))]),
        Value::Array(items) => {
            let items = items.borrow().clone();
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let child_path = match item {
                    Value::Element(el) if el.key.is_some() => {
                        format!("{path}.k{}", el.key.as_deref().unwrap_or_default())
                    }
                    _ => format!("{path}.{i}"),
                };
                out.extend(render_node(interp, item, &child_path)?);
            }
            Ok(out)
        }
        Value::Element(el) => render_element(interp, el, path),
        Value::Function(f) => {
            tracing::warn!(
                target: "compbridge_script::console",
                function = %f.name(),
                "Functions are not valid as a React child"
            );
            Ok(Vec::new())
        }
        Value::Object(o) => {
            let keys: Vec<String> = o.borrow().props.iter().map(|(k, _)| k.to_string()).collect();
            Err(interp.throw(
                ErrorKind::Error,
                format!(
                    "Objects are not valid as a React child (found: object with keys {{{}}}). \
                     If you meant to render a collection of children, use an array instead.",
                    keys.join(", ")
                ),
            ))
        }
    }
}

fn render_element(interp: &mut Interpreter, el: &Element, path: &str) -> Flow<Vec<VNode>> {
    match &el.ty {
        ElementType::Host(tag) => render_host(interp, tag, &el.props, path),
        ElementType::Fragment => {
            let children = children_of(interp, &el.props)?;
            render_node(interp, &children, path)
        }
        ElementType::Component(Value::Function(func)) => {
            let instance_path: Rc<str> = format!("{path}:{}", func.name()).into();
            let props = with_default_props(interp, func, &el.props)?;
            if func.is_class() {
                render_class(interp, func, props, instance_path)
            } else {
                render_function(interp, func, props, instance_path)
            }
        }
        ElementType::Component(other) => {
            let got = match other {
                Value::Undefined | Value::Null => other.to_js_string(),
                _ => other.type_of().to_string(),
            };
            Err(interp.throw(
                ErrorKind::Error,
                format!(
                    "Element type is invalid: expected a string (for built-in components) or a \
                     class/function (for composite components) but got: {got}."
                ),
            ))
        }
    }
}

fn children_of(interp: &mut Interpreter, props: &Value) -> Flow<Value> {
    match props {
        Value::Object(_) => interp.get_property(props, "children"),
        _ => Ok(Value::Undefined),
    }
}

/// Fill `defaultProps` for props that are missing or undefined.
fn with_default_props(interp: &mut Interpreter, func: &Rc<Function>, props: &Value) -> Flow<Value> {
    let defaults = interp.get_property(&Value::Function(func.clone()), "defaultProps")?;
    if !matches!(defaults, Value::Object(_)) {
        return Ok(props.clone());
    }
    let mut merged = own_entries(props);
    for (key, value) in own_entries(&defaults) {
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) if matches!(slot, Value::Undefined) => *slot = value,
            Some(_) => {}
            None => merged.push((key, value)),
        }
    }
    Ok(Value::object(merged))
}

fn render_function(
    interp: &mut Interpreter,
    func: &Rc<Function>,
    props: Value,
    path: Rc<str>,
) -> Flow<Vec<VNode>> {
    interp.hooks.push_frame(path.clone());
    let mut renders = 0;
    let output = loop {
        let output = match interp.call_function(func, Value::Undefined, vec![props.clone()]) {
            Ok(output) => output,
            Err(e) => {
                interp.hooks.pop_frame();
                return Err(e);
            }
        };
        if !interp.hooks.take_render_phase_update() {
            break output;
        }
        renders += 1;
        if renders >= MAX_RENDER_PHASE_UPDATES {
            interp.hooks.pop_frame();
            return Err(interp.throw(ErrorKind::Error, TOO_MANY_RERENDERS));
        }
        interp.hooks.rewind_frame();
    };
    let effects = interp.hooks.pop_frame();
    let nodes = render_node(interp, &output, &format!("{path}/"))?;
    interp.hooks.queue_all(effects);
    Ok(nodes)
}

fn render_class(
    interp: &mut Interpreter,
    class: &Rc<Function>,
    props: Value,
    path: Rc<str>,
) -> Flow<Vec<VNode>> {
    interp.hooks.mark_seen(&path);
    let (instance, previous) = match interp.hooks.mounted_class(&path) {
        Some(mounted) => (mounted.instance, Some((mounted.props, mounted.state))),
        None => {
            let instance = interp.construct(&Value::Function(class.clone()), vec![props.clone()])?;
            (instance, None)
        }
    };
    interp.set_property(&instance, "props", props.clone())?;
    let render = interp.get_property(&instance, "render")?;
    if !render.is_callable() {
        return Err(interp.throw(
            ErrorKind::Error,
            format!(
                "{}(...): No `render` method found on the returned component instance: you may \
                 have forgotten to define `render`.",
                class.name()
            ),
        ));
    }
    let output = interp.call(&render, instance.clone(), Vec::new())?;
    let state = interp.get_property(&instance, "state")?;
    interp
        .hooks
        .store_class(path.clone(), instance.clone(), props, state);
    let nodes = render_node(interp, &output, &format!("{path}/"))?;
    interp.hooks.queue(match previous {
        None => Pending::Lifecycle {
            instance,
            method: "componentDidMount",
            args: Vec::new(),
        },
        Some((prev_props, prev_state)) => Pending::Lifecycle {
            instance,
            method: "componentDidUpdate",
            args: vec![prev_props, prev_state],
        },
    });
    Ok(nodes)
}

fn render_host(interp: &mut Interpreter, tag: &str, props: &Value, path: &str) -> Flow<Vec<VNode>> {
    let mut attrs = Vec::new();
    for (key, value) in own_entries(props) {
        if let Some(attr) = host_attribute(interp, &key, &value)? {
            attrs.push(attr);
        }
    }
    let children = children_of(interp, props)?;
    let rendered = render_node(interp, &children, &format!("{path}>{tag}"))?;
    Ok(vec![VNode::element(tag, attrs, merge_text(rendered))])
}

/// Adjacent text nodes collapse into one, as the DOM normalizes them.
fn merge_text(nodes: Vec<VNode>) -> Vec<VNode> {
    let mut out: Vec<VNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let VNode::Text { text } = &node
            && let Some(VNode::Text { text: prev }) = out.last_mut()
        {
            prev.push_str(text);
            continue;
        }
        out.push(node);
    }
    out
}

fn host_attribute(interp: &Interpreter, key: &str, value: &Value) -> Flow<Option<(String, String)>> {
    if key == "children" || key == "dangerouslySetInnerHTML" || is_event_handler(key) {
        return Ok(None);
    }
    if key == "style" {
        return match value {
            Value::Object(_) => {
                let css = style_to_css(value);
                Ok((!css.is_empty()).then(|| ("style".into(), css)))
            }
            Value::Undefined | Value::Null => Ok(None),
            _ => Err(interp.throw(
                ErrorKind::Error,
                "The `style` prop expects a mapping from style properties to values, not a \
                 string. For example, style={{marginRight: spacing + 'em'}} when using JSX.",
            )),
        };
    }
    let name = attribute_name(key);
    let keeps_booleans = name.starts_with("aria-") || name.starts_with("data-");
    let text = match value {
        Value::Undefined | Value::Null | Value::Function(_) | Value::Symbol(_) => return Ok(None),
        Value::Bool(b) if keeps_booleans => b.to_string(),
        Value::Bool(true) => String::new(),
        Value::Bool(false) => return Ok(None),
        Value::Number(n) => number_to_string(*n),
        other => other.to_js_string(),
    };
    Ok(Some((name, text)))
}

fn is_event_handler(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next() == Some('o')
        && chars.next() == Some('n')
        && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}

fn attribute_name(key: &str) -> String {
    match key {
        "className" => "class".into(),
        "htmlFor" => "for".into(),
        _ if key.contains('-') || CASE_SENSITIVE.contains(&key) => key.into(),
        _ if SVG_KEBAB.contains(&key) => kebab_case(key),
        _ => key.to_ascii_lowercase(),
    }
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn css_property(name: &str) -> String {
    if name.starts_with("--") {
        return name.into();
    }
    let kebab = kebab_case(name);
    if name.starts_with("ms") && name[2..].starts_with(|c: char| c.is_ascii_uppercase()) {
        format!("-{kebab}")
    } else {
        kebab
    }
}

/// Serialize a style object the way React writes inline styles.
pub(crate) fn style_to_css(style: &Value) -> String {
    let mut parts = Vec::new();
    for (key, value) in own_entries(style) {
        let text = match &value {
            Value::Undefined | Value::Null | Value::Bool(_) => continue,
            Value::String(s) if s.trim().is_empty() => continue,
            Value::Number(n)
                if *n != 0.0 && !key.starts_with("--") && !UNITLESS.contains(&&*key) =>
            {
                format!("{}px", number_to_string(*n))
            }
            other => other.to_js_string().trim().to_string(),
        };
        parts.push(format!("{}:{text}", css_property(&key)));
    }
    parts.join(";")
}
