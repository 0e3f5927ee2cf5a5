//! `Array` statics and array prototype methods.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use super::{MethodTable, arg, relative_index};
use crate::interpreter::{ErrorKind, Flow, Interpreter};
use crate::value::{Function, Value, display_for_console};

pub(super) fn constructor(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    if let [Value::Number(n)] = args.as_slice() {
        if n.fract() != 0.0 || *n < 0.0 || *n > f64::from(u32::MAX) {
            return Err(interp.throw(ErrorKind::RangeError, "Invalid array length"));
        }
        interp.check_array_length(*n as usize)?;
        return Ok(Value::array(vec![Value::Undefined; *n as usize]));
    }
    Ok(Value::array(args))
}

pub(super) fn statics(ctor: &Rc<Function>) -> Value {
    let statics: MethodTable = method_table! {
        "isArray" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::Bool(matches!(arg(&args, 0), Value::Array(_))))
        },
        "of" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(Value::array(args)),
        "from" => array_from,
    };
    for (name, func) in statics {
        ctor.set_static(name, func);
    }
    Value::Function(ctor.clone())
}

fn array_from(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let source = arg(&args, 0);
    let items = match &source {
        Value::Array(_) | Value::String(_) => interp.iterate(&source)?,
        Value::Object(_) => {
            let len = interp.get_property(&source, "length")?.to_number();
            let len = if len.is_finite() && len > 0.0 { len as usize } else { 0 };
            interp.check_array_length(len)?;
            let mut items = Vec::with_capacity(len);
            for i in 0..len {
                items.push(interp.get_property(&source, &i.to_string())?);
            }
            items
        }
        _ => Vec::new(),
    };
    let map = arg(&args, 1);
    if !map.is_callable() {
        return Ok(Value::array(items));
    }
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        out.push(interp.call(&map, Value::Undefined, vec![item, Value::Number(i as f64)])?);
    }
    Ok(Value::array(out))
}

fn items_of(interp: &Interpreter, this: &Value) -> Flow<Rc<RefCell<Vec<Value>>>> {
    match this {
        Value::Array(items) => Ok(items.clone()),
        other => Err(interp.type_error(format!(
            "Array.prototype method called on incompatible receiver {}",
            display_for_console(other)
        ))),
    }
}

fn snapshot(interp: &Interpreter, this: &Value) -> Flow<Vec<Value>> {
    Ok(items_of(interp, this)?.borrow().clone())
}

fn callback(interp: &Interpreter, args: &[Value]) -> Flow<Value> {
    let func = arg(args, 0);
    if func.is_callable() {
        Ok(func)
    } else {
        Err(interp.type_error(format!("{} is not a function", display_for_console(&func))))
    }
}

/// Call `func(item, index, array)` for each element until `visit` says stop.
fn each(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    mut visit: impl FnMut(usize, &Value, Value) -> bool,
) -> Flow<()> {
    let func = callback(interp, args)?;
    for (i, item) in snapshot(interp, this)?.into_iter().enumerate() {
        let result = interp.call(
            &func,
            Value::Undefined,
            vec![item.clone(), Value::Number(i as f64), this.clone()],
        )?;
        if !visit(i, &item, result) {
            break;
        }
    }
    Ok(())
}

fn map(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let mut out = Vec::new();
    each(interp, &this, &args, |_, _, result| {
        out.push(result);
        true
    })?;
    Ok(Value::array(out))
}

fn filter(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let mut out = Vec::new();
    each(interp, &this, &args, |_, item, result| {
        if result.truthy() {
            out.push(item.clone());
        }
        true
    })?;
    Ok(Value::array(out))
}

fn for_each(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    each(interp, &this, &args, |_, _, _| true)?;
    Ok(Value::Undefined)
}

fn find(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let mut found = Value::Undefined;
    each(interp, &this, &args, |_, item, result| {
        if result.truthy() {
            found = item.clone();
            return false;
        }
        true
    })?;
    Ok(found)
}

fn find_index(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let mut found = -1.0;
    each(interp, &this, &args, |i, _, result| {
        if result.truthy() {
            found = i as f64;
            return false;
        }
        true
    })?;
    Ok(Value::Number(found))
}

fn some(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let mut any = false;
    each(interp, &this, &args, |_, _, result| {
        any = result.truthy();
        !any
    })?;
    Ok(Value::Bool(any))
}

fn every(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let mut all = true;
    each(interp, &this, &args, |_, _, result| {
        all = result.truthy();
        all
    })?;
    Ok(Value::Bool(all))
}

fn reduce_with(interp: &mut Interpreter, this: Value, args: Vec<Value>, reverse: bool) -> Flow<Value> {
    let func = callback(interp, &args)?;
    let mut items: Vec<(usize, Value)> = snapshot(interp, &this)?.into_iter().enumerate().collect();
    if reverse {
        items.reverse();
    }
    let mut items = items.into_iter();
    let mut acc = match args.get(1) {
        Some(init) => init.clone(),
        None => match items.next() {
            Some((_, first)) => first,
            None => return Err(interp.type_error("Reduce of empty array with no initial value")),
        },
    };
    for (i, item) in items {
        acc = interp.call(
            &func,
            Value::Undefined,
            vec![acc, item, Value::Number(i as f64), this.clone()],
        )?;
    }
    Ok(acc)
}

fn includes(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let needle = arg(&args, 0);
    let items = snapshot(interp, &this)?;
    let start = relative_index(args.get(1), items.len(), 0);
    Ok(Value::Bool(items[start..].iter().any(|item| {
        item.strict_equals(&needle) || item.same_value(&needle)
    })))
}

fn index_of(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let needle = arg(&args, 0);
    let items = snapshot(interp, &this)?;
    let start = relative_index(args.get(1), items.len(), 0);
    let found = items[start..]
        .iter()
        .position(|item| item.strict_equals(&needle))
        .map_or(-1.0, |i| (i + start) as f64);
    Ok(Value::Number(found))
}

fn last_index_of(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let needle = arg(&args, 0);
    let found = snapshot(interp, &this)?
        .iter()
        .rposition(|item| item.strict_equals(&needle))
        .map_or(-1.0, |i| i as f64);
    Ok(Value::Number(found))
}

pub(crate) fn join_values(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
        .collect::<Vec<_>>()
        .join(separator)
}

fn join(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let separator = match arg(&args, 0) {
        Value::Undefined => ",".to_string(),
        other => other.to_js_string(),
    };
    let items = snapshot(interp, &this)?;
    interp.check_string_length(separator.len().saturating_mul(items.len()))?;
    let joined = join_values(&items, &separator);
    interp.check_string_length(joined.len())?;
    Ok(Value::string(joined))
}

fn slice(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let items = snapshot(interp, &this)?;
    let start = relative_index(args.first(), items.len(), 0);
    let end = relative_index(args.get(1), items.len(), items.len());
    Ok(Value::array(if start < end {
        items[start..end].to_vec()
    } else {
        Vec::new()
    }))
}

fn concat(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let mut out = snapshot(interp, &this)?;
    for value in args {
        match value {
            Value::Array(items) => {
                let items = items.borrow();
                interp.check_array_length(out.len() + items.len())?;
                out.extend(items.iter().cloned());
            }
            other => out.push(other),
        }
    }
    Ok(Value::array(out))
}

fn push(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let items = items_of(interp, &this)?;
    let mut items = items.borrow_mut();
    interp.check_array_length(items.len() + args.len())?;
    items.extend(args);
    Ok(Value::Number(items.len() as f64))
}

fn pop(interp: &mut Interpreter, this: Value, _args: Vec<Value>) -> Flow<Value> {
    Ok(items_of(interp, &this)?.borrow_mut().pop().unwrap_or_default())
}

fn shift(interp: &mut Interpreter, this: Value, _args: Vec<Value>) -> Flow<Value> {
    let items = items_of(interp, &this)?;
    let mut items = items.borrow_mut();
    Ok(if items.is_empty() {
        Value::Undefined
    } else {
        items.remove(0)
    })
}

fn unshift(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let items = items_of(interp, &this)?;
    let mut items = items.borrow_mut();
    interp.check_array_length(items.len() + args.len())?;
    items.splice(0..0, args);
    Ok(Value::Number(items.len() as f64))
}

fn reverse(interp: &mut Interpreter, this: Value, _args: Vec<Value>) -> Flow<Value> {
    items_of(interp, &this)?.borrow_mut().reverse();
    Ok(this)
}

fn splice(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let items = items_of(interp, &this)?;
    let mut items = items.borrow_mut();
    let len = items.len();
    let start = relative_index(args.first(), len, 0);
    let delete = match args.get(1) {
        None => len - start,
        Some(v) => {
            let n = v.to_number();
            if n.is_nan() || n < 0.0 {
                0
            } else {
                (n as usize).min(len - start)
            }
        }
    };
    let inserted: Vec<Value> = args.into_iter().skip(2).collect();
    let removed: Vec<Value> = items.splice(start..start + delete, inserted).collect();
    Ok(Value::array(removed))
}

fn flatten_into(out: &mut Vec<Value>, items: &[Value], depth: usize) {
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => flatten_into(out, &inner.borrow(), depth - 1),
            other => out.push(other.clone()),
        }
    }
}

fn flat(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let depth = match arg(&args, 0) {
        Value::Undefined => 1,
        other => other.to_number().max(0.0) as usize,
    };
    let mut out = Vec::new();
    flatten_into(&mut out, &snapshot(interp, &this)?, depth);
    Ok(Value::array(out))
}

fn flat_map(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let mapped = map(interp, this, args)?;
    let mut out = Vec::new();
    if let Value::Array(items) = &mapped {
        flatten_into(&mut out, &items.borrow(), 1);
    }
    Ok(Value::array(out))
}

fn fill(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let value = arg(&args, 0);
    {
        let items = items_of(interp, &this)?;
        let mut items = items.borrow_mut();
        let len = items.len();
        let start = relative_index(args.get(1), len, 0);
        let end = relative_index(args.get(2), len, len);
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
    }
    Ok(this)
}

fn at(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let items = snapshot(interp, &this)?;
    let n = arg(&args, 0).to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let index = if n < 0.0 { items.len() as f64 + n } else { n };
    if index < 0.0 {
        return Ok(Value::Undefined);
    }
    Ok(items.get(index as usize).cloned().unwrap_or_default())
}

fn default_compare(a: &Value, b: &Value) -> Ordering {
    a.to_js_string().cmp(&b.to_js_string())
}

/// Stable merge sort with a comparator that may throw.
fn merge_sort(
    interp: &mut Interpreter,
    items: Vec<Value>,
    compare: &Value,
) -> Flow<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(interp, left, compare)?;
    let right = merge_sort(interp, right, compare)?;
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        let ordering = if compare.is_callable() {
            let n = interp
                .call(compare, Value::Undefined, vec![a.clone(), b.clone()])?
                .to_number();
            if n > 0.0 { Ordering::Greater } else { Ordering::Less }
        } else {
            default_compare(a, b)
        };
        let next = if ordering == Ordering::Greater {
            right.next()
        } else {
            left.next()
        };
        out.extend(next);
    }
    out.extend(left);
    out.extend(right);
    Ok(out)
}

fn sort(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let compare = arg(&args, 0);
    if !compare.is_callable() && !matches!(compare, Value::Undefined) {
        return Err(interp.type_error(
            "The comparison function must be either a function or undefined",
        ));
    }
    let items = snapshot(interp, &this)?;
    let (defined, undefined): (Vec<Value>, Vec<Value>) =
        items.into_iter().partition(|v| !matches!(v, Value::Undefined));
    let mut sorted = merge_sort(interp, defined, &compare)?;
    sorted.extend(undefined);
    *items_of(interp, &this)?.borrow_mut() = sorted;
    Ok(this)
}

pub(super) fn methods() -> MethodTable {
    method_table! {
        "map" => map,
        "filter" => filter,
        "forEach" => for_each,
        "reduce" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| reduce_with(interp, this, args, false),
        "reduceRight" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| reduce_with(interp, this, args, true),
        "find" => find,
        "findIndex" => find_index,
        "some" => some,
        "every" => every,
        "includes" => includes,
        "indexOf" => index_of,
        "lastIndexOf" => last_index_of,
        "join" => join,
        "slice" => slice,
        "concat" => concat,
        "push" => push,
        "pop" => pop,
        "shift" => shift,
        "unshift" => unshift,
        "reverse" => reverse,
        "splice" => splice,
        "flat" => flat,
        "flatMap" => flat_map,
        "fill" => fill,
        "at" => at,
        "sort" => sort,
        "toString" => |interp: &mut Interpreter, this: Value, _: Vec<Value>| {
            Ok(Value::string(join_values(&snapshot(interp, &this)?, ",")))
        },
    }
}
