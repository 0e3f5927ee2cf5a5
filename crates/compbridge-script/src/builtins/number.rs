//! `Number`, number prototype methods and the numeric global functions.

use super::{MethodTable, arg, native};
use crate::interpreter::{ErrorKind, Flow, Interpreter};
use crate::value::{Value, number_to_string};

fn this_number(interp: &Interpreter, this: &Value) -> Flow<f64> {
    if let Value::Number(n) = this {
        return Ok(*n);
    }
    if let Value::Object(obj) = this
        && let Some(Value::Number(n)) = &obj.borrow().primitive
    {
        return Ok(*n);
    }
    Err(interp.type_error("Number.prototype.valueOf requires that 'this' be a Number"))
}

fn to_fixed(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let n = this_number(interp, &this)?;
    let digits = arg(&args, 0).to_number();
    let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
    if !(0.0..=100.0).contains(&digits) {
        return Err(interp.throw(
            ErrorKind::RangeError,
            "toFixed() digits argument must be between 0 and 100",
        ));
    }
    if !n.is_finite() || n.abs() >= 1e21 {
        return Ok(Value::string(number_to_string(n)));
    }
    let n = if n == 0.0 { 0.0 } else { n };
    Ok(Value::string(format!("{:.*}", digits as usize, n)))
}

fn to_radix(mut n: f64, radix: u32) -> String {
    let negative = n < 0.0;
    n = n.abs().trunc();
    if n == 0.0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while n >= 1.0 {
        let d = (n % f64::from(radix)) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('0'));
        n = (n / f64::from(radix)).trunc();
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

fn to_string(interp: &mut Interpreter, this: Value, args: Vec<Value>) -> Flow<Value> {
    let n = this_number(interp, &this)?;
    let radix = match arg(&args, 0) {
        Value::Undefined => 10.0,
        other => other.to_number(),
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.throw(
            ErrorKind::RangeError,
            "toString() radix must be between 2 and 36",
        ));
    }
    if radix == 10.0 || !n.is_finite() {
        return Ok(Value::string(number_to_string(n)));
    }
    Ok(Value::string(to_radix(n, radix as u32)))
}

/// en-US grouping with at most three fraction digits.
pub(crate) fn to_locale_string(n: f64) -> String {
    if !n.is_finite() {
        return number_to_string(n);
    }
    let fixed = format!("{:.3}", n.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((&fixed, ""));
    let frac = frac.trim_end_matches('0');
    let mut grouped = String::new();
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if n < 0.0 && (int != "0" || !frac.is_empty()) { "-" } else { "" };
    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

pub(super) fn methods() -> MethodTable {
    method_table! {
        "toFixed" => to_fixed,
        "toString" => to_string,
        "toLocaleString" => |interp: &mut Interpreter, this: Value, _: Vec<Value>| {
            Ok(Value::string(to_locale_string(this_number(interp, &this)?)))
        },
        "valueOf" => |interp: &mut Interpreter, this: Value, _: Vec<Value>| {
            Ok(Value::Number(this_number(interp, &this)?))
        },
    }
}

/// Longest numeric prefix, as `parseFloat` reads it.
pub(crate) fn parse_float(s: &str) -> f64 {
    let t = s.trim_start();
    for literal in ["Infinity", "+Infinity"] {
        if t.starts_with(literal) {
            return f64::INFINITY;
        }
    }
    if t.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }
    let bytes = t.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let mut seen_digit = false;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        seen_digit = true;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            seen_digit = true;
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    t[..end].parse().unwrap_or(f64::NAN)
}

pub(crate) fn parse_int(s: &str, radix: Option<u32>) -> f64 {
    let mut t = s.trim_start();
    let negative = t.starts_with('-');
    if negative || t.starts_with('+') {
        t = &t[1..];
    }
    let explicit = radix;
    let mut radix = radix.unwrap_or(10);
    if matches!(explicit, None | Some(16))
        && let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X"))
    {
        t = rest;
        radix = 16;
    }
    let digits: String = t.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    if negative { -value } else { value }
}

fn parse_int_native(_interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let radix = match arg(&args, 1) {
        Value::Undefined => None,
        other => {
            let r = other.to_number();
            if r == 0.0 || r.is_nan() {
                None
            } else if (2.0..=36.0).contains(&r) {
                Some(r as u32)
            } else {
                return Ok(Value::Number(f64::NAN));
            }
        }
    };
    Ok(Value::Number(parse_int(&arg(&args, 0).to_js_string(), radix)))
}

fn parse_float_native(_interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    Ok(Value::Number(parse_float(&arg(&args, 0).to_js_string())))
}

pub(super) fn globals() -> Vec<(&'static str, Value)> {
    let number = native("Number", |_: &mut Interpreter, _: Value, args: Vec<Value>| {
        Ok(Value::Number(args.first().map_or(0.0, Value::to_number)))
    });
    if let Value::Function(f) = &number {
        let statics: MethodTable = method_table! {
            "isInteger" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
                Ok(Value::Bool(matches!(arg(&args, 0), Value::Number(n) if n.is_finite() && n.fract() == 0.0)))
            },
            "isFinite" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
                Ok(Value::Bool(matches!(arg(&args, 0), Value::Number(n) if n.is_finite())))
            },
            "isNaN" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
                Ok(Value::Bool(matches!(arg(&args, 0), Value::Number(n) if n.is_nan())))
            },
            "parseFloat" => parse_float_native,
            "parseInt" => parse_int_native,
        };
        for (name, func) in statics {
            f.set_static(name, func);
        }
        f.set_static("MAX_SAFE_INTEGER", Value::Number(9_007_199_254_740_991.0));
        f.set_static("MIN_SAFE_INTEGER", Value::Number(-9_007_199_254_740_991.0));
        f.set_static("EPSILON", Value::Number(f64::EPSILON));
        f.set_static("MAX_VALUE", Value::Number(f64::MAX));
        f.set_static("POSITIVE_INFINITY", Value::Number(f64::INFINITY));
        f.set_static("NEGATIVE_INFINITY", Value::Number(f64::NEG_INFINITY));
        f.set_static("NaN", Value::Number(f64::NAN));
    }
    let table: MethodTable = method_table! {
        "parseInt" => parse_int_native,
        "parseFloat" => parse_float_native,
        "isNaN" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::Bool(arg(&args, 0).to_number().is_nan()))
        },
        "isFinite" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::Bool(arg(&args, 0).to_number().is_finite()))
        },
    };
    let mut out: Vec<(&'static str, Value)> = table.into_iter().collect();
    out.push(("Number", number));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42px", None), 42.0);
        assert_eq!(parse_int("  -17", None), -17.0);
        assert_eq!(parse_int("0x1f", None), 31.0);
        assert_eq!(parse_int("ff", Some(16)), 255.0);
        assert_eq!(parse_int("101", Some(2)), 5.0);
        assert!(parse_int("px", None).is_nan());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float("3.14abc"), 3.14);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("1e3x"), 1000.0);
        assert_eq!(parse_float("2e"), 2.0);
        assert!(parse_float("abc").is_nan());
    }

    #[test]
    fn test_locale_and_radix() {
        assert_eq!(to_locale_string(1234567.891), "1,234,567.891");
        assert_eq!(to_locale_string(-1000.0), "-1,000");
        assert_eq!(to_locale_string(12.5), "12.5");
        assert_eq!(to_radix(255.0, 16), "ff");
        assert_eq!(to_radix(-5.0, 2), "-101");
    }
}
