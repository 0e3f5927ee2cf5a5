//! The `Math` namespace.

use rand::Rng;

use super::{MethodTable, arg};
use crate::interpreter::Interpreter;
use crate::value::Value;

fn unary(args: &[Value], f: impl Fn(f64) -> f64) -> Value {
    Value::Number(f(arg(args, 0).to_number()))
}

/// `Math.round` rounds halves towards positive infinity.
fn round(n: f64) -> f64 {
    if !n.is_finite() || n.fract() == 0.0 {
        return n;
    }
    (n + 0.5).floor()
}

fn sign(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 { n } else { n.signum() }
}

fn extremum(args: &[Value], pick_max: bool) -> Value {
    let mut acc = if pick_max { f64::NEG_INFINITY } else { f64::INFINITY };
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return Value::Number(f64::NAN);
        }
        acc = if pick_max { acc.max(n) } else { acc.min(n) };
    }
    Value::Number(acc)
}

pub(super) fn namespace() -> Value {
    let functions: MethodTable = method_table! {
        "abs" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::abs)),
        "floor" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::floor)),
        "ceil" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::ceil)),
        "round" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, round)),
        "trunc" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::trunc)),
        "sign" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, sign)),
        "sqrt" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::sqrt)),
        "cbrt" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::cbrt)),
        "log" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::ln)),
        "log2" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::log2)),
        "log10" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::log10)),
        "exp" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::exp)),
        "sin" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::sin)),
        "cos" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::cos)),
        "tan" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(unary(&args, f64::tan)),
        "atan2" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::Number(arg(&args, 0).to_number().atan2(arg(&args, 1).to_number())))
        },
        "pow" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::Number(arg(&args, 0).to_number().powf(arg(&args, 1).to_number())))
        },
        "hypot" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::Number(args.iter().map(|v| v.to_number().powi(2)).sum::<f64>().sqrt()))
        },
        "min" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(extremum(&args, false)),
        "max" => |_: &mut Interpreter, _: Value, args: Vec<Value>| Ok(extremum(&args, true)),
        "random" => |_: &mut Interpreter, _: Value, _: Vec<Value>| {
            Ok(Value::Number(rand::rng().random::<f64>()))
        },
    };
    let mut entries: Vec<(&str, Value)> = functions.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.extend([
        ("PI", Value::Number(std::f64::consts::PI)),
        ("E", Value::Number(std::f64::consts::E)),
        ("LN2", Value::Number(std::f64::consts::LN_2)),
        ("LN10", Value::Number(std::f64::consts::LN_10)),
        ("SQRT2", Value::Number(std::f64::consts::SQRT_2)),
    ]);
    super::namespace(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_halves_up() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(-2.6), -3.0);
        assert_eq!(round(7.0), 7.0);
    }

    #[test]
    fn test_extremum() {
        let args = [Value::Number(3.0), Value::Number(-1.0), Value::Number(8.0)];
        assert_eq!(extremum(&args, true).to_number(), 8.0);
        assert_eq!(extremum(&args, false).to_number(), -1.0);
        assert_eq!(extremum(&[], true).to_number(), f64::NEG_INFINITY);
        assert!(extremum(&[Value::string("x")], false).to_number().is_nan());
    }
}
