//! Runtime values and the coercions the interpreter needs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{ClassDef, FunctionDef};
use crate::interpreter::{Flow, Interpreter};

pub type NativeFn = dyn Fn(&mut Interpreter, Value, Vec<Value>) -> Flow<Value>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Symbol(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Object>>),
    Function(Rc<Function>),
    Element(Rc<Element>),
}

/// A plain or class-instance object. Keys keep insertion order.
#[derive(Default)]
pub struct Object {
    pub props: Vec<(Rc<str>, Value)>,
    /// Constructor for class instances and error objects.
    pub class: Option<Rc<Function>>,
    pub frozen: bool,
    /// Boxed primitive, e.g. the timestamp behind a `Date`.
    pub primitive: Option<Value>,
}

impl Object {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.iter().find(|(k, _)| &**k == key).map(|(_, v)| v)
    }

    pub fn set(&mut self, key: impl Into<Rc<str>>, value: Value) {
        if self.frozen {
            return;
        }
        let key = key.into();
        match self.props.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.props.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        if self.frozen {
            return false;
        }
        let before = self.props.len();
        self.props.retain(|(k, _)| &**k != key);
        before != self.props.len()
    }
}

pub struct Function {
    pub kind: FunctionKind,
    /// Static members, `defaultProps`, `displayName` and the like.
    pub props: RefCell<Vec<(Rc<str>, Value)>>,
}

pub enum FunctionKind {
    Closure {
        def: Rc<FunctionDef>,
        env: Env,
    },
    Native {
        name: Rc<str>,
        func: Rc<NativeFn>,
        /// Parent constructor, for `instanceof` across error types.
        parent: Option<Rc<Function>>,
    },
    Class {
        def: Rc<ClassDef>,
        env: Env,
        parent: Option<Rc<Function>>,
    },
    Bound {
        target: Rc<Function>,
        this: Value,
        args: Vec<Value>,
    },
}

impl Function {
    pub fn new(kind: FunctionKind) -> Rc<Self> {
        Rc::new(Self {
            kind,
            props: RefCell::new(Vec::new()),
        })
    }

    pub fn name(&self) -> Rc<str> {
        for key in ["displayName", "name"] {
            if let Some(Value::String(name)) = self.get_static(key) {
                return name;
            }
        }
        match &self.kind {
            FunctionKind::Closure { def, .. } => def.name.clone().unwrap_or_else(|| "".into()),
            FunctionKind::Native { name, .. } => name.clone(),
            FunctionKind::Class { def, .. } => def.name.clone().unwrap_or_else(|| "".into()),
            FunctionKind::Bound { target, .. } => format!("bound {}", target.name()).into(),
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, FunctionKind::Class { .. })
    }

    pub fn parent(&self) -> Option<Rc<Function>> {
        match &self.kind {
            FunctionKind::Native { parent, .. } | FunctionKind::Class { parent, .. } => {
                parent.clone()
            }
            _ => None,
        }
    }

    pub fn get_static(&self, key: &str) -> Option<Value> {
        self.props
            .borrow()
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn set_static(&self, key: impl Into<Rc<str>>, value: Value) {
        let key = key.into();
        let mut props = self.props.borrow_mut();
        match props.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => props.push((key, value)),
        }
    }
}

/// A React element: `{ type, props, key }`.
pub struct Element {
    pub ty: ElementType,
    pub props: Value,
    pub key: Option<Rc<str>>,
}

pub enum ElementType {
    Host(Rc<str>),
    Fragment,
    Component(Value),
}

impl Element {
    pub fn type_name(&self) -> Rc<str> {
        match &self.ty {
            ElementType::Host(tag) => tag.clone(),
            ElementType::Fragment => "#fragment".into(),
            ElementType::Component(Value::Function(f)) => f.name(),
            ElementType::Component(_) => "#invalid".into(),
        }
    }
}

// ── Environments ─────────────────────────────────────────────────────────

struct Slot {
    value: Value,
    mutable: bool,
}

struct Scope {
    vars: RefCell<HashMap<Rc<str>, Slot>>,
    parent: Option<Env>,
}

/// Lexical scope chain.
#[derive(Clone)]
pub struct Env(Rc<Scope>);

pub enum AssignError {
    Undeclared,
    Constant,
}

impl Env {
    pub fn root() -> Self {
        Env(Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    pub fn child(&self) -> Self {
        Env(Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn declare(&self, name: Rc<str>, value: Value, mutable: bool) {
        self.0
            .vars
            .borrow_mut()
            .insert(name, Slot { value, mutable });
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(slot) = env.0.vars.borrow().get(name) {
                return Some(slot.value.clone());
            }
            scope = env.0.parent.as_ref();
        }
        None
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), AssignError> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(slot) = env.0.vars.borrow_mut().get_mut(name) {
                if !slot.mutable {
                    return Err(AssignError::Constant);
                }
                slot.value = value;
                return Ok(());
            }
            scope = env.0.parent.as_ref();
        }
        Err(AssignError::Undeclared)
    }
}

// ── Constructors and conversions ─────────────────────────────────────────

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(props: Vec<(Rc<str>, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(Object {
            props,
            ..Object::default()
        })))
    }

    pub fn empty_object() -> Self {
        Value::object(Vec::new())
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Function(_) => "function",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Element(_) => "object",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined | Value::Symbol(_) | Value::Function(_) => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Array(items) => {
                let items = items.borrow();
                match items.as_slice() {
                    [] => 0.0,
                    [single] => single.to_number(),
                    _ => f64::NAN,
                }
            }
            Value::Object(obj) => obj
                .borrow()
                .primitive
                .as_ref()
                .map_or(f64::NAN, Value::to_number),
            Value::Element(_) => f64::NAN,
        }
    }

    /// `String(value)` semantics.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Symbol(desc) => format!("Symbol({desc})"),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(obj) => {
                let obj = obj.borrow();
                match (obj.get("name"), obj.get("message"), &obj.class) {
                    (Some(name), Some(message), Some(_)) => {
                        let message = message.to_js_string();
                        if message.is_empty() {
                            name.to_js_string()
                        } else {
                            format!("{}: {}", name.to_js_string(), message)
                        }
                    }
                    _ => "[object Object]".into(),
                }
            }
            Value::Function(f) => format!("function {}() {{ [native code] }}", f.name()),
            Value::Element(_) => "[object Object]".into(),
        }
    }

    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Element(a), Value::Element(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `Object.is`, used for hook dependency and state comparisons.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                (a.is_nan() && b.is_nan()) || (a == b && a.is_sign_negative() == b.is_sign_negative())
            }
            _ => self.strict_equals(other),
        }
    }

    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, _) | (_, a) if a.is_nullish() => false,
            (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) => Value::Number(self.to_number()).loose_equals(other),
            (_, Value::Bool(_)) => self.loose_equals(&Value::Number(other.to_number())),
            (Value::Array(_) | Value::Object(_), Value::String(_) | Value::Number(_)) => {
                Value::string(self.to_js_string()).loose_equals(other)
            }
            (Value::String(_) | Value::Number(_), Value::Array(_) | Value::Object(_)) => {
                self.loose_equals(&Value::string(other.to_js_string()))
            }
            _ => self.strict_equals(other),
        }
    }

    /// Convert to JSON; `None` for values JSON cannot represent.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        self.to_json_depth(0)
    }

    fn to_json_depth(&self, depth: usize) -> Option<serde_json::Value> {
        use serde_json::Value as Json;
        if depth > 64 {
            return Some(Json::Null);
        }
        Some(match self {
            Value::Undefined | Value::Function(_) | Value::Symbol(_) => return None,
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.to_string()),
            Value::Array(items) => Json::Array(
                items
                    .borrow()
                    .iter()
                    .map(|v| v.to_json_depth(depth + 1).unwrap_or(Json::Null))
                    .collect(),
            ),
            Value::Object(obj) => {
                let mut map = serde_json::Map::new();
                for (k, v) in &obj.borrow().props {
                    if let Some(json) = v.to_json_depth(depth + 1) {
                        map.insert(k.to_string(), json);
                    }
                }
                Json::Object(map)
            }
            Value::Element(el) => {
                let mut map = serde_json::Map::new();
                map.insert("type".into(), Json::String(el.type_name().to_string()));
                map.insert(
                    "key".into(),
                    el.key
                        .as_ref()
                        .map(|k| Json::String(k.to_string()))
                        .unwrap_or(Json::Null),
                );
                if let Some(props) = el.props.to_json_depth(depth + 1) {
                    map.insert("props".into(), props);
                }
                Json::Object(map)
            }
        })
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::string(s.as_str()),
            Json::Array(items) => Value::array(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::object(
                map.iter()
                    .map(|(k, v)| (Rc::from(k.as_str()), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

/// Developer-facing rendering used by `console.*` and uncaught throws.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&inspect(self, 0))
    }
}

fn inspect(value: &Value, depth: usize) -> String {
    match value {
        Value::String(s) if depth > 0 => format!("'{s}'"),
        Value::Array(_) | Value::Object(_) if depth > 3 => "[Object]".into(),
        Value::Array(items) => {
            let items = items.borrow();
            if items.is_empty() {
                return "[]".into();
            }
            let inner: Vec<String> = items.iter().map(|v| inspect(v, depth + 1)).collect();
            format!("[ {} ]", inner.join(", "))
        }
        Value::Object(obj) => {
            let obj = obj.borrow();
            if obj.class.is_some() && obj.get("message").is_some() {
                return value.to_js_string();
            }
            if obj.props.is_empty() {
                return "{}".into();
            }
            let inner: Vec<String> = obj
                .props
                .iter()
                .map(|(k, v)| format!("{k}: {}", inspect(v, depth + 1)))
                .collect();
            format!("{{ {} }}", inner.join(", "))
        }
        Value::Function(func) => format!("[Function: {}]", func.name()),
        Value::Element(el) => format!("<{} />", el.type_name()),
        other => other.to_js_string(),
    }
}

/// `console.log` style: strings print bare, everything else inspected.
pub fn display_for_console(value: &Value) -> String {
    inspect(value, 0)
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Format a number the way `Number.prototype.toString()` does.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    if n == 0.0 {
        return "0".into();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{n}");
    }
    let formatted = format!("{n:e}");
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => formatted,
    }
}

pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    match t {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => t.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// Canonical property key for a computed access.
pub fn property_key(value: &Value) -> Rc<str> {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_js_string().into(),
    }
}

/// Largest legal array length, 2^32 - 1.
pub const ARRAY_LENGTH_LIMIT: u64 = u32::MAX as u64;

/// Longest array a script may grow. Legal lengths above this throw
/// `RangeError` instead of allocating.
pub const MAX_ARRAY_LENGTH: usize = 1 << 22;

/// Longest string, in bytes, a script may build.
pub const MAX_STRING_LENGTH: usize = 1 << 26;

/// Parse an array index key. Keys at or above 2^32 - 1 are ordinary
/// property names, not indices.
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    let index: u64 = key.parse().ok()?;
    if index >= ARRAY_LENGTH_LIMIT {
        return None;
    }
    usize::try_from(index).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(number_to_string(5.0), "5");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_string(1.5), "1.5");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number(" 42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x10"), 16.0);
        assert!(string_to_number("12px").is_nan());
        assert_eq!(string_to_number("1e3"), 1000.0);
    }

    #[test]
    fn test_truthiness_and_typeof() {
        assert!(!Value::string("").truthy());
        assert!(Value::string("0").truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(Value::empty_object().truthy());
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::array(vec![]).type_of(), "object");
    }

    #[test]
    fn test_equality() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(Value::string("1").loose_equals(&Value::Number(1.0)));
        assert!(Value::Bool(true).loose_equals(&Value::Number(1.0)));
        assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
        assert!(Value::Number(f64::NAN).same_value(&Value::Number(f64::NAN)));
        let arr = Value::array(vec![]);
        assert!(arr.strict_equals(&arr.clone()));
        assert!(!arr.strict_equals(&Value::array(vec![])));
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({"n": 5, "tags": ["a", null], "ok": true});
        let value = Value::from_json(&json);
        assert_eq!(value.to_json(), Some(json));
        assert_eq!(Value::Undefined.to_json(), None);
    }

    #[test]
    fn test_env_scoping() {
        let root = Env::root();
        root.declare("a".into(), Value::Number(1.0), false);
        let child = root.child();
        child.declare("b".into(), Value::Number(2.0), true);
        assert!(child.lookup("a").is_some());
        assert!(root.lookup("b").is_none());
        assert!(matches!(child.assign("a", Value::Null), Err(AssignError::Constant)));
        assert!(matches!(child.assign("zz", Value::Null), Err(AssignError::Undeclared)));
        assert!(child.assign("b", Value::Null).is_ok());
    }

    #[test]
    fn test_inspect() {
        let value = Value::object(vec![
            ("a".into(), Value::Number(1.0)),
            ("b".into(), Value::array(vec![Value::string("x")])),
        ]);
        assert_eq!(display_for_console(&value), "{ a: 1, b: [ 'x' ] }");
        assert_eq!(display_for_console(&Value::string("plain")), "plain");
    }

    #[test]
    fn test_array_index_keys() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("12"), Some(12));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("length"), None);
        assert_eq!(array_index("4294967294"), Some(4_294_967_294));
        assert_eq!(array_index("4294967295"), None);
        assert_eq!(array_index("4294967296000"), None);
    }
}
