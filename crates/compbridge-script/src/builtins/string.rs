//! `String` and string prototype methods. Indices count Unicode scalar
//! values.

use std::rc::Rc;

use super::{MethodTable, arg, native, relative_index};
use crate::interpreter::{ErrorKind, Flow, Interpreter};
use crate::value::{MAX_STRING_LENGTH, Value};

fn text(this: &Value) -> Rc<str> {
    match this {
        Value::String(s) => s.clone(),
        other => other.to_js_string().into(),
    }
}

fn chars(this: &Value) -> Vec<char> {
    text(this).chars().collect()
}

fn arg_text(args: &[Value], index: usize) -> String {
    match args.get(index) {
        None | Some(Value::Undefined) => "undefined".into(),
        Some(v) => v.to_js_string(),
    }
}

fn char_offset(haystack: &str, byte: usize) -> usize {
    haystack[..byte].chars().count()
}

fn byte_offset(haystack: &str, chars: usize) -> usize {
    haystack
        .char_indices()
        .nth(chars)
        .map_or(haystack.len(), |(i, _)| i)
}

fn split(_interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let s = text(&this);
    let limit = match arg(&args, 1) {
        Value::Undefined => usize::MAX,
        other => other.to_number().max(0.0) as usize,
    };
    let parts: Vec<Value> = match arg(&args, 0) {
        Value::Undefined => vec![Value::String(s.clone())],
        sep => {
            let sep = sep.to_js_string();
            if sep.is_empty() {
                s.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(Value::string).collect()
            }
        }
    };
    Ok(Value::array(parts.into_iter().take(limit).collect()))
}

fn replace_with(
    interp: &mut Interpreter,
    this: Value,
    args: Vec<Value>,
    all: bool,
) -> Flow<Value> {
    let s = text(&this);
    let pattern = arg_text(&args, 0);
    let replacement = arg(&args, 1);
    let mut out = String::with_capacity(s.len());
    let mut rest: &str = &s;
    let mut consumed = 0;
    loop {
        let Some(found) = rest.find(pattern.as_str()) else {
            break;
        };
        out.push_str(&rest[..found]);
        let piece = if replacement.is_callable() {
            let position = char_offset(&s, consumed + found) as f64;
            interp
                .call(
                    &replacement,
                    Value::Undefined,
                    vec![
                        Value::string(pattern.as_str()),
                        Value::Number(position),
                        Value::String(s.clone()),
                    ],
                )?
                .to_js_string()
        } else {
            replacement.to_js_string().replace("$&", &pattern)
        };
        out.push_str(&piece);
        let step = found + pattern.len();
        if pattern.is_empty() {
            match rest[found..].chars().next() {
                Some(c) => {
                    out.push(c);
                    consumed += c.len_utf8();
                    rest = &rest[c.len_utf8()..];
                }
                None => break,
            }
        } else {
            consumed += step;
            rest = &rest[step..];
        }
        if !all {
            break;
        }
    }
    out.push_str(rest);
    Ok(Value::string(out))
}

fn pad(interp: &mut Interpreter, this: &Value, args: &[Value], at_start: bool) -> Flow<Value> {
    let s = text(this);
    let target = arg(args, 0).to_number();
    let filler = match arg(args, 1) {
        Value::Undefined => " ".to_string(),
        other => other.to_js_string(),
    };
    let len = s.chars().count();
    if !(target > len as f64) || filler.is_empty() {
        return Ok(Value::String(s));
    }
    if target > MAX_STRING_LENGTH as f64 {
        return Err(interp.throw(ErrorKind::RangeError, "Invalid string length"));
    }
    let needed = target as usize - len;
    let padding: String = filler.chars().cycle().take(needed).collect();
    interp.check_string_length(s.len() + padding.len())?;
    Ok(Value::string(if at_start {
        format!("{padding}{s}")
    } else {
        format!("{s}{padding}")
    }))
}

fn slice(this: Value, args: Vec<Value>) -> Value {
    let chars = chars(&this);
    let start = relative_index(args.first(), chars.len(), 0);
    let end = relative_index(args.get(1), chars.len(), chars.len());
    if start >= end {
        return Value::string("");
    }
    Value::string(chars[start..end].iter().collect::<String>())
}

fn substring(this: Value, args: Vec<Value>) -> Value {
    let chars = chars(&this);
    let clamp = |v: Option<&Value>, default: usize| match v {
        None | Some(Value::Undefined) => default,
        Some(v) => {
            let n = v.to_number();
            if n.is_nan() || n < 0.0 {
                0
            } else {
                (n as usize).min(chars.len())
            }
        }
    };
    let a = clamp(args.first(), 0);
    let b = clamp(args.get(1), chars.len());
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    Value::string(chars[start..end].iter().collect::<String>())
}

fn index_of(this: Value, args: Vec<Value>, last: bool) -> Value {
    let s = text(&this);
    let needle = arg_text(&args, 0);
    let found = if last {
        s.rfind(needle.as_str())
    } else {
        let from = relative_index(args.get(1), s.chars().count(), 0);
        let from_byte = byte_offset(&s, from);
        s[from_byte..].find(needle.as_str()).map(|i| i + from_byte)
    };
    Value::Number(found.map_or(-1.0, |b| char_offset(&s, b) as f64))
}

fn repeat(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let count = arg(&args, 0).to_number();
    let count = if count.is_nan() { 0.0 } else { count };
    if count < 0.0 || count.is_infinite() {
        return Err(interp.throw(
            ErrorKind::RangeError,
            format!("Invalid count value: {}", crate::value::number_to_string(count)),
        ));
    }
    let s = text(&this);
    if count >= 1.0 && s.len() as f64 * count > MAX_STRING_LENGTH as f64 {
        return Err(interp.throw(ErrorKind::RangeError, "Invalid string length"));
    }
    Ok(Value::string(s.repeat(count as usize)))
}

pub(super) fn methods() -> MethodTable {
    method_table! {
        "toUpperCase" => |_: &mut Interpreter, this: Value, _: Vec<Value>| Ok(Value::string(text(&this).to_uppercase())),
        "toLowerCase" => |_: &mut Interpreter, this: Value, _: Vec<Value>| Ok(Value::string(text(&this).to_lowercase())),
        "trim" => |_: &mut Interpreter, this: Value, _: Vec<Value>| Ok(Value::string(text(&this).trim())),
        "trimStart" => |_: &mut Interpreter, this: Value, _: Vec<Value>| Ok(Value::string(text(&this).trim_start())),
        "trimEnd" => |_: &mut Interpreter, this: Value, _: Vec<Value>| Ok(Value::string(text(&this).trim_end())),
        "split" => split,
        "includes" => |_: &mut Interpreter, this: Value, args: Vec<Value>| {
            Ok(Value::Bool(text(&this).contains(arg_text(&args, 0).as_str())))
        },
        "startsWith" => |_: &mut Interpreter, this: Value, args: Vec<Value>| {
            let s = text(&this);
            let from = relative_index(args.get(1), s.chars().count(), 0);
            Ok(Value::Bool(s[byte_offset(&s, from)..].starts_with(arg_text(&args, 0).as_str())))
        },
        "endsWith" => |_: &mut Interpreter, this: Value, args: Vec<Value>| {
            let s = text(&this);
            let end = relative_index(args.get(1), s.chars().count(), s.chars().count());
            Ok(Value::Bool(s[..byte_offset(&s, end)].ends_with(arg_text(&args, 0).as_str())))
        },
        "slice" => |_: &mut Interpreter, this: Value, args: Vec<Value>| Ok(slice(this, args)),
        "substring" => |_: &mut Interpreter, this: Value, args: Vec<Value>| Ok(substring(this, args)),
        "replace" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| replace_with(interp, this, args, false),
        "replaceAll" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| replace_with(interp, this, args, true),
        "repeat" => repeat,
        "padStart" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| pad(interp, &this, &args, true),
        "padEnd" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| pad(interp, &this, &args, false),
        "charAt" => |_: &mut Interpreter, this: Value, args: Vec<Value>| {
            let index = arg(&args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index };
            let c = if index < 0.0 { None } else { text(&this).chars().nth(index as usize) };
            Ok(Value::string(c.map(String::from).unwrap_or_default()))
        },
        "charCodeAt" => |_: &mut Interpreter, this: Value, args: Vec<Value>| {
            let index = arg(&args, 0).to_number();
            let index = if index.is_nan() { 0.0 } else { index };
            let c = if index < 0.0 { None } else { text(&this).chars().nth(index as usize) };
            Ok(Value::Number(c.map_or(f64::NAN, |c| f64::from(u32::from(c)))))
        },
        "at" => |_: &mut Interpreter, this: Value, args: Vec<Value>| {
            let chars = chars(&this);
            let n = arg(&args, 0).to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            let index = if n < 0.0 { chars.len() as f64 + n } else { n };
            Ok(if index < 0.0 {
                Value::Undefined
            } else {
                chars.get(index as usize).map_or(Value::Undefined, |c| Value::string(c.to_string()))
            })
        },
        "indexOf" => |_: &mut Interpreter, this: Value, args: Vec<Value>| Ok(index_of(this, args, false)),
        "lastIndexOf" => |_: &mut Interpreter, this: Value, args: Vec<Value>| Ok(index_of(this, args, true)),
        "concat" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| {
            let mut s = text(&this).to_string();
            for value in &args {
                let piece = value.to_js_string();
                interp.check_string_length(s.len() + piece.len())?;
                s.push_str(&piece);
            }
            Ok(Value::string(s))
        },
        "localeCompare" => |_: &mut Interpreter, this: Value, args: Vec<Value>| {
            let ordering = text(&this).as_ref().cmp(arg_text(&args, 0).as_str());
            Ok(Value::Number(ordering as i8 as f64))
        },
        "toString" => |_: &mut Interpreter, this: Value, _: Vec<Value>| Ok(Value::String(text(&this))),
        "valueOf" => |_: &mut Interpreter, this: Value, _: Vec<Value>| Ok(Value::String(text(&this))),
    }
}

pub(super) fn globals() -> Vec<(&'static str, Value)> {
    let string = native("String", |_: &mut Interpreter, _: Value, args: Vec<Value>| {
        Ok(match args.first() {
            None => Value::string(""),
            Some(Value::String(s)) => Value::String(s.clone()),
            Some(other) => Value::string(other.to_js_string()),
        })
    });
    if let Value::Function(f) = &string {
        f.set_static(
            "fromCharCode",
            native("fromCharCode", |_: &mut Interpreter, _: Value, args: Vec<Value>| {
                let s: String = args
                    .iter()
                    .filter_map(|v| char::from_u32(v.to_number() as u32))
                    .collect();
                Ok(Value::string(s))
            }),
        );
    }
    vec![("String", string)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_count_chars() {
        let s = "héllo";
        assert_eq!(byte_offset(s, 2), 3);
        assert_eq!(char_offset(s, 3), 2);
        assert_eq!(byte_offset(s, 10), s.len());
    }

    #[test]
    fn test_pad_and_slice() {
        let mut interp = Interpreter::new(64, Default::default());
        let s = Value::string("5");
        assert_eq!(pad(&mut interp, &s, &[Value::Number(3.0), Value::string("0")], true).unwrap_or_else(|_| panic!("pad threw")).to_js_string(), "005");
        assert_eq!(pad(&mut interp, &s, &[Value::Number(1.0)], false).unwrap_or_else(|_| panic!("pad threw")).to_js_string(), "5");
        let word = Value::string("compbridge");
        assert_eq!(slice(word.clone(), vec![Value::Number(-6.0)]).to_js_string(), "bridge");
        assert_eq!(substring(word, vec![Value::Number(4.0), Value::Number(0.0)]).to_js_string(), "comp");
    }
}
