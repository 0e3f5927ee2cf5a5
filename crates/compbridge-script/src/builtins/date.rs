//! `Date`, backed by `chrono` in the host's local time zone. A date is an
//! object whose boxed primitive is its epoch-millisecond timestamp.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

use super::{MethodTable, arg};
use crate::interpreter::{ErrorKind, Flow, Interpreter};
use crate::value::{Function, Object, Value};

const INVALID_DATE: &str = "Invalid Date";

const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

fn now_millis() -> f64 {
    Utc::now().timestamp_millis() as f64
}

/// Parse the date strings components commonly hand to `new Date(...)`.
fn parse_date(s: &str) -> f64 {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.timestamp_millis() as f64;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return dt.timestamp_millis() as f64;
    }
    // Date-only ISO strings are UTC.
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return midnight.and_utc().timestamp_millis() as f64;
    }
    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return local_millis(naive);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y/%m/%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return local_millis(midnight);
    }
    f64::NAN
}

fn local_millis(naive: NaiveDateTime) -> f64 {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or(f64::NAN, |dt| dt.timestamp_millis() as f64)
}

/// `new Date(year, month, day?, hours?, minutes?, seconds?, ms?)` with
/// out-of-range fields carried over, e.g. month 12 is January next year.
fn from_components(parts: &[f64]) -> f64 {
    if parts.iter().any(|n| !n.is_finite()) {
        return f64::NAN;
    }
    let field = |i: usize, default: f64| parts.get(i).copied().unwrap_or(default).trunc();
    let mut year = field(0, 1970.0);
    if (0.0..=99.0).contains(&year) {
        year += 1900.0;
    }
    let month = field(1, 0.0);
    let year = year + (month / 12.0).floor();
    let month = month.rem_euclid(12.0);
    let Some(first) = NaiveDate::from_ymd_opt(year as i32, month as u32 + 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return f64::NAN;
    };
    let offset_ms = (field(2, 1.0) - 1.0) * 86_400_000.0
        + field(3, 0.0) * 3_600_000.0
        + field(4, 0.0) * 60_000.0
        + field(5, 0.0) * 1000.0
        + field(6, 0.0);
    let Some(naive) = first.checked_add_signed(chrono::Duration::milliseconds(offset_ms as i64)) else {
        return f64::NAN;
    };
    local_millis(naive)
}

fn make_date(interp: &Interpreter, millis: f64) -> Value {
    let millis = if millis.is_finite() && millis.abs() <= 8.64e15 {
        millis.trunc()
    } else {
        f64::NAN
    };
    Value::Object(Rc::new(RefCell::new(Object {
        class: Some(interp.intrinsics.date_ctor.clone()),
        primitive: Some(Value::Number(millis)),
        ..Object::default()
    })))
}

pub(super) fn constructor(interp: &mut Interpreter, _this: Value, args: Vec<Value>) -> Flow<Value> {
    let millis = match args.as_slice() {
        [] => now_millis(),
        [Value::String(s)] => parse_date(s),
        [single] => single.to_number(),
        many => from_components(&many.iter().map(Value::to_number).collect::<Vec<_>>()),
    };
    Ok(make_date(interp, millis))
}

fn this_time(interp: &Interpreter, this: &Value) -> Flow<f64> {
    if let Value::Object(obj) = this {
        let obj = obj.borrow();
        let is_date = obj
            .class
            .as_ref()
            .is_some_and(|c| Rc::ptr_eq(c, &interp.intrinsics.date_ctor));
        if is_date && let Some(Value::Number(n)) = &obj.primitive {
            return Ok(*n);
        }
    }
    Err(interp.type_error("this is not a Date object."))
}

fn local(interp: &Interpreter, this: &Value) -> Flow<Option<DateTime<Local>>> {
    let millis = this_time(interp, this)?;
    if millis.is_nan() {
        return Ok(None);
    }
    Ok(Local.timestamp_millis_opt(millis as i64).single())
}

fn getter(
    get: impl Fn(&DateTime<Local>) -> u32 + 'static,
) -> impl Fn(&mut Interpreter, Value, Vec<Value>) -> Flow<Value> {
    move |interp, this, _args| {
        Ok(Value::Number(
            local(interp, &this)?.map_or(f64::NAN, |dt| f64::from(get(&dt))),
        ))
    }
}

fn formatter(
    format: &'static str,
) -> impl Fn(&mut Interpreter, Value, Vec<Value>) -> Flow<Value> {
    move |interp, this, _args| {
        Ok(Value::string(match local(interp, &this)? {
            Some(dt) => dt.format(format).to_string(),
            None => INVALID_DATE.to_string(),
        }))
    }
}

fn iso_string(millis: f64) -> Option<String> {
    if millis.is_nan() {
        return None;
    }
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

pub(super) fn methods() -> MethodTable {
    method_table! {
        "getTime" => |interp: &mut Interpreter, this: Value, _: Vec<Value>| {
            Ok(Value::Number(this_time(interp, &this)?))
        },
        "valueOf" => |interp: &mut Interpreter, this: Value, _: Vec<Value>| {
            Ok(Value::Number(this_time(interp, &this)?))
        },
        "getFullYear" => |interp: &mut Interpreter, this: Value, _: Vec<Value>| {
            Ok(Value::Number(local(interp, &this)?.map_or(f64::NAN, |dt| f64::from(dt.year()))))
        },
        "getMonth" => getter(|dt| dt.month0()),
        "getDate" => getter(|dt| dt.day()),
        "getDay" => getter(|dt| dt.weekday().num_days_from_sunday()),
        "getHours" => getter(|dt| dt.hour()),
        "getMinutes" => getter(|dt| dt.minute()),
        "getSeconds" => getter(|dt| dt.second()),
        "getMilliseconds" => getter(|dt| dt.timestamp_subsec_millis()),
        "getTimezoneOffset" => |interp: &mut Interpreter, this: Value, _: Vec<Value>| {
            Ok(Value::Number(local(interp, &this)?.map_or(f64::NAN, |dt| {
                -f64::from(dt.offset().local_minus_utc()) / 60.0
            })))
        },
        "setTime" => |interp: &mut Interpreter, this: Value, args: Vec<Value>| {
            this_time(interp, &this)?;
            let millis = arg(&args, 0).to_number();
            if let Value::Object(obj) = &this {
                obj.borrow_mut().primitive = Some(Value::Number(millis));
            }
            Ok(Value::Number(millis))
        },
        "toISOString" => |interp: &mut Interpreter, this: Value, _: Vec<Value>| {
            match iso_string(this_time(interp, &this)?) {
                Some(s) => Ok(Value::string(s)),
                None => Err(interp.throw(ErrorKind::RangeError, "Invalid time value")),
            }
        },
        "toJSON" => |interp: &mut Interpreter, this: Value, _: Vec<Value>| {
            Ok(iso_string(this_time(interp, &this)?).map_or(Value::Null, Value::string))
        },
        "toLocaleDateString" => formatter("%-m/%-d/%Y"),
        "toLocaleTimeString" => formatter("%-I:%M:%S %p"),
        "toLocaleString" => formatter("%-m/%-d/%Y, %-I:%M:%S %p"),
        "toDateString" => formatter("%a %b %d %Y"),
        "toTimeString" => formatter("%H:%M:%S GMT%z"),
        "toString" => formatter("%a %b %d %Y %H:%M:%S GMT%z"),
    }
}

pub(super) fn statics(ctor: &Rc<Function>) -> Value {
    let statics: MethodTable = method_table! {
        "now" => |_: &mut Interpreter, _: Value, _: Vec<Value>| Ok(Value::Number(now_millis())),
        "parse" => |_: &mut Interpreter, _: Value, args: Vec<Value>| {
            Ok(Value::Number(parse_date(&arg(&args, 0).to_js_string())))
        },
    };
    for (name, func) in statics {
        ctor.set_static(name, func);
    }
    Value::Function(ctor.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_forms() {
        assert_eq!(parse_date("1970-01-02"), 86_400_000.0);
        assert_eq!(parse_date("2024-03-01T12:00:00Z"), 1_709_294_400_000.0);
        assert_eq!(parse_date("2024-03-01T12:00:00.250+00:00"), 1_709_294_400_250.0);
        assert!(parse_date("not a date").is_nan());
    }

    #[test]
    fn test_components_carry_over() {
        let december = from_components(&[2023.0, 11.0, 31.0]);
        let carried = from_components(&[2023.0, 12.0, 0.0]);
        assert_eq!(december, carried);
        assert!(from_components(&[f64::NAN, 1.0]).is_nan());
    }

    #[test]
    fn test_iso_string() {
        assert_eq!(iso_string(0.0).as_deref(), Some("1970-01-01T00:00:00.000Z"));
        assert_eq!(iso_string(f64::NAN), None);
    }
}
