//! Global bindings and the method tables behind primitive and built-in
//! prototypes.

use std::collections::HashMap;
use std::rc::Rc;

use crate::interpreter::{ErrorKind, Flow, Interpreter};
use crate::value::{Function, FunctionKind, Value};

pub(crate) type MethodTable = HashMap<&'static str, Value>;

/// Build a [`MethodTable`] from `name => function` pairs.
macro_rules! method_table {
    ($($name:literal => $func:expr),* $(,)?) => {{
        let mut table = $crate::builtins::MethodTable::new();
        $( table.insert($name, $crate::builtins::native($name, $func)); )*
        table
    }};
}
pub(crate) use method_table;

mod array;
mod date;
mod global;
mod json;
mod math;
mod number;
mod react;
mod string;

pub(crate) fn native_fn(
    name: &str,
    parent: Option<Rc<Function>>,
    func: impl Fn(&mut Interpreter, Value, Vec<Value>) -> Flow<Value> + 'static,
) -> Rc<Function> {
    Function::new(FunctionKind::Native {
        name: name.into(),
        func: Rc::new(func),
        parent,
    })
}

pub(crate) fn native(
    name: &str,
    func: impl Fn(&mut Interpreter, Value, Vec<Value>) -> Flow<Value> + 'static,
) -> Value {
    Value::Function(native_fn(name, None, func))
}

pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// An object whose properties are the given entries.
pub(crate) fn namespace(entries: Vec<(&str, Value)>) -> Value {
    Value::object(entries.into_iter().map(|(k, v)| (Rc::from(k), v)).collect())
}

/// Resolve a relative index argument (`slice`, `at`, ...) against `len`.
pub(crate) fn relative_index(value: Option<&Value>, len: usize, default: usize) -> usize {
    let n = match value {
        None | Some(Value::Undefined) => return default,
        Some(v) => v.to_number(),
    };
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn error_constructor(
    kind: ErrorKind,
) -> impl Fn(&mut Interpreter, Value, Vec<Value>) -> Flow<Value> {
    move |interp, this, args| {
        let message = match args.first() {
            Some(Value::Undefined) | None => String::new(),
            Some(v) => v.to_js_string(),
        };
        match &this {
            Value::Object(obj) => {
                let mut obj = obj.borrow_mut();
                if obj.get("name").is_none() {
                    obj.set("name", Value::string(kind.name()));
                }
                obj.set("message", Value::string(message));
            }
            _ => return Ok(interp.make_error(kind, message)),
        }
        Ok(this)
    }
}

/// Constructors and prototype tables shared by every evaluation in a realm.
pub(crate) struct Intrinsics {
    pub object_ctor: Rc<Function>,
    pub array_ctor: Rc<Function>,
    pub date_ctor: Rc<Function>,
    pub component_ctor: Rc<Function>,
    pub pure_component_ctor: Rc<Function>,
    errors: Vec<(ErrorKind, Rc<Function>)>,
    pub fragment: Value,
    pub string_methods: MethodTable,
    pub number_methods: MethodTable,
    pub array_methods: MethodTable,
    pub object_methods: MethodTable,
    pub function_methods: MethodTable,
    component_methods: MethodTable,
    date_methods: MethodTable,
}

impl Intrinsics {
    pub fn new() -> Self {
        let base = native_fn("Error", None, error_constructor(ErrorKind::Error));
        let mut errors = vec![(ErrorKind::Error, base.clone())];
        for kind in [
            ErrorKind::TypeError,
            ErrorKind::RangeError,
            ErrorKind::ReferenceError,
            ErrorKind::SyntaxError,
        ] {
            errors.push((
                kind,
                native_fn(kind.name(), Some(base.clone()), error_constructor(kind)),
            ));
        }
        Self {
            object_ctor: native_fn("Object", None, global::object_constructor),
            array_ctor: native_fn("Array", None, array::constructor),
            date_ctor: native_fn("Date", None, date::constructor),
            component_ctor: native_fn("Component", None, react::component_constructor),
            pure_component_ctor: native_fn("PureComponent", None, react::component_constructor),
            errors,
            fragment: Value::Symbol("react.fragment".into()),
            string_methods: string::methods(),
            number_methods: number::methods(),
            array_methods: array::methods(),
            object_methods: global::object_methods(),
            function_methods: global::function_methods(),
            component_methods: react::component_methods(),
            date_methods: date::methods(),
        }
    }

    pub fn error_ctor(&self, kind: ErrorKind) -> Rc<Function> {
        self.errors
            .iter()
            .find(|(k, _)| *k == kind)
            .or_else(|| self.errors.first())
            .map(|(_, f)| f.clone())
            .unwrap_or_else(|| native_fn("Error", None, error_constructor(kind)))
    }

    pub fn method(&self, table: &MethodTable, key: &str) -> Value {
        table.get(key).cloned().unwrap_or_default()
    }

    /// Instance methods for objects constructed by a native constructor.
    pub fn native_proto(&self, ctor: &Rc<Function>) -> Option<&MethodTable> {
        if Rc::ptr_eq(ctor, &self.component_ctor) || Rc::ptr_eq(ctor, &self.pure_component_ctor) {
            Some(&self.component_methods)
        } else if Rc::ptr_eq(ctor, &self.date_ctor) {
            Some(&self.date_methods)
        } else {
            None
        }
    }

    pub fn is_fragment(&self, symbol: &Rc<str>) -> bool {
        matches!(&self.fragment, Value::Symbol(f) if Rc::ptr_eq(f, symbol))
    }
}

/// Declare every global binding into the interpreter's root scope.
pub(crate) fn install_globals(interp: &mut Interpreter) {
    let intrinsics = &interp.intrinsics;
    let mut globals: Vec<(&str, Value)> = vec![
        ("undefined", Value::Undefined),
        ("NaN", Value::Number(f64::NAN)),
        ("Infinity", Value::Number(f64::INFINITY)),
        ("React", react::namespace(intrinsics)),
        ("Math", math::namespace()),
        ("JSON", json::namespace()),
        ("console", global::console()),
    ];
    for (kind, ctor) in &intrinsics.errors {
        globals.push((kind.name(), Value::Function(ctor.clone())));
    }
    globals.push(("Object", global::object_statics(&intrinsics.object_ctor)));
    globals.push(("Array", array::statics(&intrinsics.array_ctor)));
    globals.push(("Date", date::statics(&intrinsics.date_ctor)));
    globals.extend(global::functions());
    globals.extend(number::globals());
    globals.extend(string::globals());

    for (name, value) in globals {
        interp.globals.declare(name.into(), value, false);
    }
}
