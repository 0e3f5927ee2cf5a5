//! The `JSON` namespace, backed by `serde_json`.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use super::{MethodTable, arg};
use crate::interpreter::{ErrorKind, Flow, Interpreter, own_entries};
use crate::value::Value;

const MAX_DEPTH: usize = 64;

/// Replace values exposing `toJSON` with its result, recursively.
fn apply_to_json(interp: &mut Interpreter, value: Value, depth: usize) -> Flow<Value> {
    if depth > MAX_DEPTH {
        return Ok(Value::Null);
    }
    match &value {
        Value::Object(_) => {
            let to_json = interp.get_property(&value, "toJSON")?;
            if to_json.is_callable() {
                return interp.call(&to_json, value, Vec::new());
            }
            let mut props = Vec::new();
            for (key, item) in own_entries(&value) {
                props.push((key, apply_to_json(interp, item, depth + 1)?));
            }
            Ok(Value::object(props))
        }
        Value::Array(items) => {
            let items = items.borrow().clone();
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(apply_to_json(interp, item, depth + 1)?);
            }
            Ok(Value::array(out))
        }
        _ => Ok(value),
    }
}

fn indent_of(space: &Value) -> String {
    match space {
        Value::Number(n) if *n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    }
}

fn stringify(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let value = apply_to_json(interp, arg(&args, 0), 0)?;
    let Some(json) = value.to_json() else {
        return Ok(Value::Undefined);
    };
    let indent = indent_of(&arg(&args, 2));
    if indent.is_empty() {
        return Ok(Value::string(json.to_string()));
    }
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    json.serialize(&mut ser)
        .map_err(|e| interp.type_error(format!("JSON.stringify: {e}")))?;
    Ok(Value::string(String::from_utf8_lossy(&buf).into_owned()))
}

fn parse(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let text = arg(&args, 0).to_js_string();
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => Ok(Value::from_json(&json)),
        Err(e) => Err(interp.throw(ErrorKind::SyntaxError, format!("JSON.parse: {e}"))),
    }
}

pub(super) fn namespace() -> Value {
    let functions: MethodTable = method_table! {
        "stringify" => stringify,
        "parse" => parse,
    };
    super::namespace(functions.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_of() {
        assert_eq!(indent_of(&Value::Number(2.0)), "  ");
        assert_eq!(indent_of(&Value::Number(40.0)).len(), 10);
        assert_eq!(indent_of(&Value::string("\t")), "\t");
        assert_eq!(indent_of(&Value::Undefined), "");
    }
}
