//! `Object`, `console`, timers and the free global functions.

use std::rc::Rc;

use super::{MethodTable, arg};
use crate::interpreter::{Flow, Interpreter, own_entries, own_keys};
use crate::value::{Function, FunctionKind, Value, display_for_console, property_key};

pub(super) fn object_constructor(_interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    Ok(match arg(&args, 0) {
        value @ (Value::Object(_) | Value::Array(_) | Value::Function(_)) => value,
        _ => Value::empty_object(),
    })
}

pub(super) fn object_statics(ctor: &Rc<Function>) -> Value {
    let statics: MethodTable = method_table! {
        "keys" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::array(own_keys(&arg(&args, 0)).into_iter().map(Value::String).collect()))
        },
        "values" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::array(own_entries(&arg(&args, 0)).into_iter().map(|(_, v)| v).collect()))
        },
        "entries" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::array(
                own_entries(&arg(&args, 0))
                    .into_iter()
                    .map(|(k, v)| Value::array(vec![Value::String(k), v]))
                    .collect(),
            ))
        },
        "assign" => object_assign,
        "freeze" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            let target = arg(&args, 0);
            if let Value::Object(obj) = &target {
                obj.borrow_mut().frozen = true;
            }
            Ok(target)
        },
        "isFrozen" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::Bool(match &arg(&args, 0) {
                Value::Object(obj) => obj.borrow().frozen,
                _ => true,
            }))
        },
        "fromEntries" => object_from_entries,
        "create" => |_: &mut Interpreter, _: Value, _: Vec<Value>| Ok(Value::empty_object()),
        "is" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::Bool(arg(&args, 0).same_value(&arg(&args, 1))))
        },
    };
    for (name, func) in statics {
        ctor.set_static(name, func);
    }
    Value::Function(ctor.clone())
}

fn object_assign(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let target = arg(&args, 0);
    if target.is_nullish() {
        return Err(interp.type_error("Cannot convert undefined or null to object"));
    }
    for source in args.iter().skip(1) {
        for (key, value) in own_entries(source) {
            interp.set_property(&target, &key, value)?;
        }
    }
    Ok(target)
}

fn object_from_entries(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let mut props: Vec<(Rc<str>, Value)> = Vec::new();
    for entry in interp.iterate(&arg(&args, 0))? {
        let key = property_key(&interp.get_property(&entry, "0")?);
        let value = interp.get_property(&entry, "1")?;
        match props.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => props.push((key, value)),
        }
    }
    Ok(Value::object(props))
}

pub(super) fn object_methods() -> MethodTable {
    method_table! {
        "hasOwnProperty" => |_: &mut Interpreter, this: Value, args: Vec<Value>| {
            let key = property_key(&arg(&args, 0));
            Ok(Value::Bool(own_keys(&this).contains(&key)))
        },
        "toString" => |_: &mut Interpreter, this: Value, _: Vec<Value>| Ok(Value::string(this.to_js_string())),
        "valueOf" => |_: &mut Interpreter, this: Value, _: Vec<Value>| Ok(this),
    }
}

pub(super) fn function_methods() -> MethodTable {
    method_table! {
        "call" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| {
            let mut args = args.into_iter();
            let receiver = args.next().unwrap_or_default();
            interp.call(&this, receiver, args.collect())
        },
        "apply" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| {
            let list = match arg(&args, 1) {
                Value::Undefined | Value::Null => Vec::new(),
                other => interp.iterate(&other)?,
            };
            interp.call(&this, arg(&args, 0), list)
        },
        "bind" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| {
            let Value::Function(target) = this else {
                return Err(interp.type_error("Bind must be called on a function"));
            };
            let mut args = args.into_iter();
            let receiver = args.next().unwrap_or_default();
            Ok(Value::Function(Function::new(FunctionKind::Bound {
                target,
                this: receiver,
                args: args.collect(),
            })))
        },
        "toString" => |_: &mut Interpreter, this: Value, _: Vec<Value>| Ok(Value::string(this.to_js_string())),
    }
}

fn console_line(args: &[Value]) -> String {
    args.iter().map(display_for_console).collect::<Vec<_>>().join(" ")
}

pub(super) fn console() -> Value {
    let methods: MethodTable = method_table! {
        "log" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            tracing::info!(target: "compbridge_script::console", "{}", console_line(&args));
            Ok(Value::Undefined)
        },
        "info" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            tracing::info!(target: "compbridge_script::console", "{}", console_line(&args));
            Ok(Value::Undefined)
        },
        "debug" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            tracing::debug!(target: "compbridge_script::console", "{}", console_line(&args));
            Ok(Value::Undefined)
        },
        "warn" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            tracing::warn!(target: "compbridge_script::console", "{}", console_line(&args));
            Ok(Value::Undefined)
        },
        "error" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            tracing::error!(target: "compbridge_script::console", "{}", console_line(&args));
            Ok(Value::Undefined)
        },
    };
    Value::object(methods.into_iter().map(|(k, v)| (Rc::from(k), v)).collect())
}

fn schedule(interp: &mut Interpreter, args: Vec<Value>, repeat: bool) -> Flow<Value> {
    let mut args = args.into_iter();
    let callback = args.next().unwrap_or_default();
    if !callback.is_callable() {
        return Ok(Value::Number(0.0));
    }
    let delay = args.next().map_or(0.0, |v| v.to_number());
    let id = interp.timers.schedule(callback, args.collect(), delay, repeat);
    Ok(Value::Number(f64::from(id)))
}

fn cancel(interp: &mut Interpreter, args: &[Value]) {
    let id = arg(args, 0).to_number();
    if id.is_finite() && id >= 0.0 {
        interp.timers.clear(id as u32);
    }
}

pub(super) fn functions() -> Vec<(&'static str, Value)> {
    let table: MethodTable = method_table! {
        "setTimeout" => |interp: &mut Interpreter, _: Value, args: Vec<Value>| schedule(interp, args, false),
        "setInterval" => |interp: &mut Interpreter, _: Value, args: Vec<Value>| schedule(interp, args, true),
        "clearTimeout" => |interp: &mut Interpreter, _: Value, args: Vec<Value>| {
            cancel(interp, &args);
            Ok(Value::Undefined)
        },
        "clearInterval" => |interp: &mut Interpreter, _: Value, args: Vec<Value>| {
            cancel(interp, &args);
            Ok(Value::Undefined)
        },
        "queueMicrotask" => |interp: &mut Interpreter, _: Value, args: Vec<Value>| {
            schedule(interp, args, false).map(|_| Value::Undefined)
        },
        "requestAnimationFrame" => |interp: &mut Interpreter, _: Value, args: Vec<Value>| {
            let callback = arg(&args, 0);
            schedule(interp, vec![callback, Value::Number(16.0)], false)
        },
        "cancelAnimationFrame" => |interp: &mut Interpreter, _: Value, args: Vec<Value>| {
            cancel(interp, &args);
            Ok(Value::Undefined)
        },
        "Boolean" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(Value::Bool(arg(&args, 0).truthy())),
        "Symbol" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            let desc = match arg(&args, 0) {
                Value::Undefined => String::new(),
                other => other.to_js_string(),
            };
            Ok(Value::Symbol(desc.into()))
        },
    };
    table.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_line_formatting() {
        let line = console_line(&[
            Value::string("count"),
            Value::Number(3.0),
            Value::array(vec![Value::string("a")]),
        ]);
        assert_eq!(line, "count 3 [ 'a' ]");
    }
}
