//! The `React` namespace: elements, class components and hooks.

use super::{Intrinsics, MethodTable, arg, native};
use crate::hooks;
use crate::interpreter::{Flow, Interpreter, make_element, own_entries};
use crate::value::{Object, Value, property_key};

/// Shared constructor behind `React.Component` and `React.PureComponent`.
pub(super) fn component_constructor(
    interp: &mut Interpreter,
    this: Value,
    args: Vec<Value>,
) -> Flow<Value> {
    if matches!(this, Value::Object(_)) {
        interp.set_property(&this, "props", arg(&args, 0))?;
        interp.set_property(&this, "context", Value::empty_object())?;
        interp.set_property(&this, "refs", Value::empty_object())?;
    }
    Ok(this)
}

pub(super) fn component_methods() -> MethodTable {
    method_table! {
        "setState" => hooks::set_state,
        "forceUpdate" => hooks::force_update,
    }
}

fn create_element(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let mut args = args.into_iter();
    let ty = interp.element_type(args.next().unwrap_or_default());
    let config = args.next().unwrap_or_default();
    let mut props = Object::default();
    let mut key = None;
    for (name, value) in own_entries(&config) {
        match &*name {
            "key" => key = (!value.is_nullish()).then(|| property_key(&value)),
            "ref" => {}
            _ => props.set(name, value),
        }
    }
    let mut children: Vec<Value> = args.collect();
    if children.len() == 1 {
        props.set("children", children.remove(0));
    } else if !children.is_empty() {
        props.set("children", Value::array(children));
    }
    Ok(make_element(ty, props, key))
}

fn forward_ref(_interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let render = arg(&args, 0);
    let name = match &render {
        Value::Function(f) => f.name().to_string(),
        _ => String::new(),
    };
    Ok(native(&name, move |interp: &mut Interpreter, _this: Value, args: Vec<Value>| {
        interp.call(&render, Value::Undefined, vec![arg(&args, 0), Value::Null])
    }))
}

fn is_valid_element(_interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    Ok(Value::Bool(matches!(arg(&args, 0), Value::Element(_))))
}

pub(super) fn namespace(intrinsics: &Intrinsics) -> Value {
    let functions: MethodTable = method_table! {
        "createElement" => create_element,
        "isValidElement" => is_valid_element,
        "forwardRef" => forward_ref,
        "memo" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(arg(&args, 0)),
        "useState" => hooks::use_state,
        "useReducer" => hooks::use_reducer,
        "useEffect" => hooks::use_effect,
        "useLayoutEffect" => hooks::use_effect,
        "useRef" => hooks::use_ref,
        "useMemo" => hooks::use_memo,
        "useCallback" => hooks::use_callback,
    };
    let mut entries: Vec<(&str, Value)> = functions.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.extend([
        ("Fragment", intrinsics.fragment.clone()),
        ("StrictMode", intrinsics.fragment.clone()),
        ("Component", Value::Function(intrinsics.component_ctor.clone())),
        ("PureComponent", Value::Function(intrinsics.pure_component_ctor.clone())),
        ("version", Value::string("18.2.0")),
    ]);
    super::namespace(entries)
}
