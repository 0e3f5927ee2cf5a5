//! Tree-walking evaluator for the component dialect.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ast::*;
use crate::builtins::{self, Intrinsics};
use crate::error::ScriptError;
use crate::hooks::HookStore;
use crate::timers::TimerQueue;
use crate::value::{
    ARRAY_LENGTH_LIMIT, AssignError, Element, ElementType, Env, Function, FunctionKind,
    MAX_ARRAY_LENGTH, MAX_STRING_LENGTH, Object, Value, array_index, display_for_console,
    property_key,
};

/// Non-local exits threaded through evaluation.
pub enum Control {
    Throw { value: Value, line: Option<u32> },
    Return(Value),
    Break,
    Continue,
    Interrupted,
}

pub type Flow<T> = std::result::Result<T, Control>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
        }
    }
}

const THIS: &str = "this";
const HOME_CLASS: &str = "%home";

pub struct Interpreter {
    pub(crate) globals: Env,
    pub(crate) intrinsics: Intrinsics,
    pub(crate) hooks: HookStore,
    pub(crate) timers: TimerQueue,
    interrupt: Arc<AtomicBool>,
    call_depth: usize,
    max_call_depth: usize,
    line: u32,
}

impl Interpreter {
    pub fn new(max_call_depth: usize, interrupt: Arc<AtomicBool>) -> Self {
        let mut interp = Self {
            globals: Env::root(),
            intrinsics: Intrinsics::new(),
            hooks: HookStore::default(),
            timers: TimerQueue::default(),
            interrupt,
            call_depth: 0,
            max_call_depth,
            line: 0,
        };
        builtins::install_globals(&mut interp);
        interp
    }

    /// Run top-level statements in the global scope.
    pub fn run_program(&mut self, program: &Program) -> Flow<()> {
        let env = self.globals.clone();
        match self.exec_block_in(&program.body, &env) {
            Ok(()) | Err(Control::Return(_) | Control::Break | Control::Continue) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn check_interrupt(&self) -> Flow<()> {
        if self.interrupt.load(Ordering::Relaxed) {
            Err(Control::Interrupted)
        } else {
            Ok(())
        }
    }

    // ── Errors ───────────────────────────────────────────────────────────

    pub fn make_error(&self, kind: ErrorKind, message: impl Into<String>) -> Value {
        let message: String = message.into();
        Value::Object(Rc::new(RefCell::new(Object {
            props: vec![
                ("name".into(), Value::string(kind.name())),
                ("message".into(), Value::string(message)),
            ],
            class: Some(self.intrinsics.error_ctor(kind)),
            ..Object::default()
        })))
    }

    pub fn throw(&self, kind: ErrorKind, message: impl Into<String>) -> Control {
        Control::Throw {
            value: self.make_error(kind, message),
            line: (self.line > 0).then_some(self.line),
        }
    }

    pub fn type_error(&self, message: impl Into<String>) -> Control {
        self.throw(ErrorKind::TypeError, message)
    }

    /// Refuse to grow an array past [`MAX_ARRAY_LENGTH`].
    pub fn check_array_length(&self, len: usize) -> Flow<()> {
        if len > MAX_ARRAY_LENGTH {
            return Err(self.throw(ErrorKind::RangeError, "Invalid array length"));
        }
        Ok(())
    }

    /// Refuse to build a string longer than [`MAX_STRING_LENGTH`] bytes.
    pub fn check_string_length(&self, len: usize) -> Flow<()> {
        if len > MAX_STRING_LENGTH {
            return Err(self.throw(ErrorKind::RangeError, "Invalid string length"));
        }
        Ok(())
    }

    pub fn into_script_error(control: Control) -> Option<ScriptError> {
        match control {
            Control::Throw { value, line } => Some(ScriptError::Thrown {
                message: describe_thrown(&value),
                line,
            }),
            Control::Interrupted => Some(ScriptError::Interrupted),
            Control::Return(_) | Control::Break | Control::Continue => None,
        }
    }

    // ── Statements ───────────────────────────────────────────────────────

    pub(crate) fn exec_block_in(&mut self, stmts: &[Stmt], env: &Env) -> Flow<()> {
        self.hoist(stmts, env);
        for stmt in stmts {
            self.exec(stmt, env)?;
        }
        Ok(())
    }

    fn hoist(&mut self, stmts: &[Stmt], env: &Env) {
        for stmt in stmts {
            let def = match stmt {
                Stmt::Function(def) => def,
                Stmt::ExportDefaultDecl(inner) => match &**inner {
                    Stmt::Function(def) => def,
                    _ => continue,
                },
                _ => continue,
            };
            if let Some(name) = &def.name {
                env.declare(name.clone(), closure(def, env), true);
            }
        }
    }

    fn exec(&mut self, stmt: &Stmt, env: &Env) -> Flow<()> {
        match stmt {
            Stmt::VarDecl { kind, decls } => {
                for decl in decls {
                    let value = match &decl.init {
                        Some(init) => {
                            let value = self.eval(init, env)?;
                            if let Pattern::Ident(name) = &decl.target {
                                infer_name(&value, name);
                            }
                            value
                        }
                        None => Value::Undefined,
                    };
                    self.bind_pattern(&decl.target, value, env, *kind != DeclKind::Const)?;
                }
                Ok(())
            }
            Stmt::Function(_) | Stmt::Empty => Ok(()),
            Stmt::Class(def) => {
                let class = self.eval_class(def, env)?;
                if let Some(name) = &def.name {
                    env.declare(name.clone(), class, true);
                }
                Ok(())
            }
            Stmt::Expr(expr) => self.eval(expr, env).map(drop),
            Stmt::Block(stmts) => self.exec_block_in(stmts, &env.child()),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, env)?.truthy() {
                    self.exec(consequent, env)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate, env)
                } else {
                    Ok(())
                }
            }
            Stmt::Return(arg) => {
                let value = match arg {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Undefined,
                };
                Err(Control::Return(value))
            }
            Stmt::While { test, body } => {
                loop {
                    self.check_interrupt()?;
                    if !self.eval(test, env)?.truthy() {
                        break;
                    }
                    match self.exec(body, env) {
                        Ok(()) | Err(Control::Continue) => {}
                        Err(Control::Break) => break,
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            }
            Stmt::DoWhile { body, test } => {
                loop {
                    self.check_interrupt()?;
                    match self.exec(body, env) {
                        Ok(()) | Err(Control::Continue) => {}
                        Err(Control::Break) => break,
                        Err(e) => return Err(e),
                    }
                    if !self.eval(test, env)?.truthy() {
                        break;
                    }
                }
                Ok(())
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let scope = env.child();
                if let Some(init) = init {
                    self.exec(init, &scope)?;
                }
                loop {
                    self.check_interrupt()?;
                    if let Some(test) = test
                        && !self.eval(test, &scope)?.truthy()
                    {
                        break;
                    }
                    match self.exec(body, &scope) {
                        Ok(()) | Err(Control::Continue) => {}
                        Err(Control::Break) => break,
                        Err(e) => return Err(e),
                    }
                    if let Some(update) = update {
                        self.eval(update, &scope)?;
                    }
                }
                Ok(())
            }
            Stmt::ForEach {
                kind,
                target,
                iterable,
                keys,
                body,
            } => {
                let source = self.eval(iterable, env)?;
                let items = if *keys {
                    own_keys(&source).into_iter().map(Value::String).collect()
                } else {
                    self.iterate(&source)?
                };
                for item in items {
                    self.check_interrupt()?;
                    let scope = env.child();
                    self.bind_pattern(target, item, &scope, *kind != DeclKind::Const)?;
                    match self.exec(body, &scope) {
                        Ok(()) | Err(Control::Continue) => {}
                        Err(Control::Break) => break,
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            }
            Stmt::Break => Err(Control::Break),
            Stmt::Continue => Err(Control::Continue),
            Stmt::Throw(expr) => {
                let value = self.eval(expr, env)?;
                Err(Control::Throw {
                    value,
                    line: Some(expr.line),
                })
            }
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                let mut result = self.exec_block_in(block, &env.child());
                if let Some(handler) = handler
                    && let Err(Control::Throw { value, .. }) = &result
                {
                    let value = value.clone();
                    let scope = env.child();
                    result = match param {
                        Some(param) => self.bind_pattern(param, value, &scope, true),
                        None => Ok(()),
                    }
                    .and_then(|()| self.exec_block_in(handler, &scope));
                }
                if let Some(finalizer) = finalizer {
                    self.exec_block_in(finalizer, &env.child())?;
                }
                result
            }
            Stmt::ExportDefaultDecl(inner) => self.exec(inner, env),
            Stmt::ExportDefault(expr) => self.eval(expr, env).map(drop),
        }
    }

    /// Bind a declaration or parameter pattern into `env`.
    pub(crate) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        env: &Env,
        mutable: bool,
    ) -> Flow<()> {
        match pattern {
            Pattern::Ident(name) => {
                env.declare(name.clone(), value, mutable);
                Ok(())
            }
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    let first = props
                        .first()
                        .and_then(|p| match &p.key {
                            PropKey::Named(n) => Some(n.to_string()),
                            PropKey::Computed(_) => None,
                        })
                        .unwrap_or_default();
                    let shown = value.to_js_string();
                    return Err(self.type_error(format!(
                        "Cannot destructure property '{first}' of '{shown}' as it is {shown}."
                    )));
                }
                let mut used = Vec::with_capacity(props.len());
                for prop in props {
                    let key = match &prop.key {
                        PropKey::Named(name) => name.clone(),
                        PropKey::Computed(expr) => property_key(&self.eval(expr, env)?),
                    };
                    let mut item = self.get_property(&value, &key)?;
                    if matches!(item, Value::Undefined)
                        && let Some(default) = &prop.value.default
                    {
                        item = self.eval(default, env)?;
                    }
                    self.bind_pattern(&prop.value.target, item, env, mutable)?;
                    used.push(key);
                }
                if let Some(rest) = rest {
                    let remaining = own_entries(&value)
                        .into_iter()
                        .filter(|(k, _)| !used.contains(k))
                        .collect();
                    env.declare(rest.clone(), Value::object(remaining), mutable);
                }
                Ok(())
            }
            Pattern::Array { elems, rest } => {
                let items = self.iterate(&value)?;
                for (i, elem) in elems.iter().enumerate() {
                    let Some(binding) = elem else { continue };
                    let mut item = items.get(i).cloned().unwrap_or_default();
                    if matches!(item, Value::Undefined)
                        && let Some(default) = &binding.default
                    {
                        item = self.eval(default, env)?;
                    }
                    self.bind_pattern(&binding.target, item, env, mutable)?;
                }
                if let Some(rest) = rest {
                    let tail = items.get(elems.len()..).map(<[Value]>::to_vec).unwrap_or_default();
                    self.bind_pattern(rest, Value::array(tail), env, mutable)?;
                }
                Ok(())
            }
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────

    pub(crate) fn eval(&mut self, expr: &Expr, env: &Env) -> Flow<Value> {
        self.line = expr.line;
        match &expr.kind {
            ExprKind::Undefined => Ok(Value::Undefined),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Str(s) => Ok(Value::String(s.clone())),
            ExprKind::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => {
                            let piece = self.eval(expr, env)?.to_js_string();
                            self.check_string_length(out.len() + piece.len())?;
                            out.push_str(&piece);
                        }
                    }
                }
                Ok(Value::string(out))
            }
            ExprKind::Ident(name) => self.lookup(name, env),
            ExprKind::This => Ok(env.lookup(THIS).unwrap_or_default()),
            ExprKind::Array(elems) => {
                let mut items = Vec::with_capacity(elems.len());
                for elem in elems {
                    match elem {
                        ArrayElem::Item(expr) => items.push(self.eval(expr, env)?),
                        ArrayElem::Spread(expr) => {
                            let source = self.eval(expr, env)?;
                            let spread = self.iterate(&source)?;
                            self.check_array_length(items.len() + spread.len())?;
                            items.extend(spread);
                        }
                        ArrayElem::Hole => items.push(Value::Undefined),
                    }
                }
                Ok(Value::array(items))
            }
            ExprKind::Object(props) => {
                let mut object = Object::default();
                for prop in props {
                    match prop {
                        ObjectProp::KeyValue(key, expr) => {
                            let key = match key {
                                PropKey::Named(name) => name.clone(),
                                PropKey::Computed(expr) => property_key(&self.eval(expr, env)?),
                            };
                            let value = self.eval(expr, env)?;
                            infer_name(&value, &key);
                            object.set(key, value);
                        }
                        ObjectProp::Spread(expr) => {
                            let source = self.eval(expr, env)?;
                            for (k, v) in own_entries(&source) {
                                object.set(k, v);
                            }
                        }
                    }
                }
                Ok(Value::Object(Rc::new(RefCell::new(object))))
            }
            ExprKind::Function(def) => Ok(closure(def, env)),
            ExprKind::Class(def) => self.eval_class(def, env),
            ExprKind::Unary(op, arg) => {
                if *op == UnaryOp::Typeof
                    && let ExprKind::Ident(name) = &arg.kind
                {
                    let ty = env.lookup(name).map_or("undefined", |v| v.type_of());
                    return Ok(Value::string(ty));
                }
                let value = self.eval(arg, env)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::BitNot => Value::Number(f64::from(!to_int32(value.to_number()))),
                    UnaryOp::Typeof => Value::string(value.type_of()),
                    UnaryOp::Void => Value::Undefined,
                })
            }
            ExprKind::Update {
                increment,
                prefix,
                target,
            } => {
                let old = self.eval(target, env)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.assign_to(target, Value::Number(new), env)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            ExprKind::Binary(op, left, right) => {
                let a = self.eval(left, env)?;
                let b = self.eval(right, env)?;
                self.line = expr.line;
                self.binary(*op, a, b)
            }
            ExprKind::Logical(op, left, right) => {
                let a = self.eval(left, env)?;
                let short_circuit = match op {
                    LogicalOp::And => !a.truthy(),
                    LogicalOp::Or => a.truthy(),
                    LogicalOp::Nullish => !a.is_nullish(),
                };
                if short_circuit {
                    Ok(a)
                } else {
                    self.eval(right, env)
                }
            }
            ExprKind::Conditional(test, consequent, alternate) => {
                if self.eval(test, env)?.truthy() {
                    self.eval(consequent, env)
                } else {
                    self.eval(alternate, env)
                }
            }
            ExprKind::Assign { op, target, value } => {
                let new = match op {
                    AssignOp::Assign => {
                        let value = self.eval(value, env)?;
                        if let ExprKind::Ident(name) = &target.kind {
                            infer_name(&value, name);
                        }
                        value
                    }
                    AssignOp::Arith(bop) => {
                        let current = self.eval(target, env)?;
                        let rhs = self.eval(value, env)?;
                        self.binary(*bop, current, rhs)?
                    }
                    AssignOp::Logical(lop) => {
                        let current = self.eval(target, env)?;
                        let keep = match lop {
                            LogicalOp::And => !current.truthy(),
                            LogicalOp::Or => current.truthy(),
                            LogicalOp::Nullish => !current.is_nullish(),
                        };
                        if keep {
                            return Ok(current);
                        }
                        self.eval(value, env)?
                    }
                };
                self.line = expr.line;
                self.assign_to(target, new.clone(), env)?;
                Ok(new)
            }
            ExprKind::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(expr, env)?;
                }
                Ok(last)
            }
            ExprKind::Member { .. } | ExprKind::Call { .. } => {
                Ok(self.eval_chain(expr, env)?.unwrap_or_default())
            }
            ExprKind::OptionalChain(inner) => Ok(self.eval_chain(inner, env)?.unwrap_or_default()),
            ExprKind::New { callee, args } => {
                let ctor = self.eval(callee, env)?;
                let args = self.eval_args(args, env)?;
                self.line = expr.line;
                if !ctor.is_callable() {
                    return Err(
                        self.type_error(format!("{} is not a constructor", describe_callee(callee)))
                    );
                }
                self.construct(&ctor, args)
            }
            ExprKind::SuperCall(args) => self.eval_super_call(args, env),
            ExprKind::Delete(target) => match &target.kind {
                ExprKind::Member {
                    object, property, ..
                } => {
                    let base = self.eval(object, env)?;
                    let key = self.member_key(property, env)?;
                    Ok(Value::Bool(delete_property(&base, &key)))
                }
                _ => Ok(Value::Bool(true)),
            },
            ExprKind::Jsx(element) => self.eval_jsx(element, env),
        }
    }

    /// Evaluate a member/call chain. `None` means an optional link
    /// short-circuited.
    fn eval_chain(&mut self, expr: &Expr, env: &Env) -> Flow<Option<Value>> {
        match &expr.kind {
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let Some(base) = self.eval_chain(object, env)? else {
                    return Ok(None);
                };
                if *optional && base.is_nullish() {
                    return Ok(None);
                }
                let key = self.member_key(property, env)?;
                self.line = expr.line;
                self.get_property(&base, &key).map(Some)
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => {
                let (this, func) = match &callee.kind {
                    ExprKind::Member {
                        object,
                        property,
                        optional: member_optional,
                    } => {
                        let Some(base) = self.eval_chain(object, env)? else {
                            return Ok(None);
                        };
                        if *member_optional && base.is_nullish() {
                            return Ok(None);
                        }
                        let key = self.member_key(property, env)?;
                        self.line = callee.line;
                        let func = self.get_property(&base, &key)?;
                        (base, func)
                    }
                    _ => {
                        let Some(func) = self.eval_chain(callee, env)? else {
                            return Ok(None);
                        };
                        (Value::Undefined, func)
                    }
                };
                if *optional && func.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_args(args, env)?;
                self.line = expr.line;
                let Value::Function(func) = &func else {
                    return Err(
                        self.type_error(format!("{} is not a function", describe_callee(callee)))
                    );
                };
                self.call_function(func, this, args).map(Some)
            }
            _ => self.eval(expr, env).map(Some),
        }
    }

    fn member_key(&mut self, property: &MemberProp, env: &Env) -> Flow<Rc<str>> {
        match property {
            MemberProp::Named(name) => Ok(name.clone()),
            MemberProp::Computed(expr) => Ok(property_key(&self.eval(expr, env)?)),
        }
    }

    fn lookup(&self, name: &str, env: &Env) -> Flow<Value> {
        env.lookup(name)
            .ok_or_else(|| self.throw(ErrorKind::ReferenceError, format!("{name} is not defined")))
    }

    fn assign_to(&mut self, target: &Expr, value: Value, env: &Env) -> Flow<()> {
        match &target.kind {
            ExprKind::Ident(name) => match env.assign(name, value) {
                Ok(()) => Ok(()),
                Err(AssignError::Constant) => Err(self.type_error("Assignment to constant variable.")),
                Err(AssignError::Undeclared) => Err(self.throw(
                    ErrorKind::ReferenceError,
                    format!("{name} is not defined"),
                )),
            },
            ExprKind::Member {
                object, property, ..
            } => {
                let base = self.eval(object, env)?;
                let key = self.member_key(property, env)?;
                self.line = target.line;
                self.set_property(&base, &key, value)
            }
            _ => Err(self.throw(ErrorKind::SyntaxError, "Invalid left-hand side in assignment")),
        }
    }

    pub(crate) fn eval_args(&mut self, args: &[Argument], env: &Env) -> Flow<Vec<Value>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Argument::Expr(expr) => out.push(self.eval(expr, env)?),
                Argument::Spread(expr) => {
                    let source = self.eval(expr, env)?;
                    out.extend(self.iterate(&source)?);
                }
            }
        }
        Ok(out)
    }

    fn binary(&mut self, op: BinaryOp, a: Value, b: Value) -> Flow<Value> {
        Ok(match op {
            BinaryOp::Add => {
                let (a, b) = (to_primitive(a), to_primitive(b));
                if matches!(a, Value::String(_)) || matches!(b, Value::String(_)) {
                    let (a, b) = (a.to_js_string(), b.to_js_string());
                    self.check_string_length(a.len() + b.len())?;
                    let mut s = a;
                    s.push_str(&b);
                    Value::string(s)
                } else {
                    Value::Number(a.to_number() + b.to_number())
                }
            }
            BinaryOp::Sub => Value::Number(a.to_number() - b.to_number()),
            BinaryOp::Mul => Value::Number(a.to_number() * b.to_number()),
            BinaryOp::Div => Value::Number(a.to_number() / b.to_number()),
            BinaryOp::Rem => Value::Number(a.to_number() % b.to_number()),
            BinaryOp::Pow => Value::Number(a.to_number().powf(b.to_number())),
            BinaryOp::StrictEq => Value::Bool(a.strict_equals(&b)),
            BinaryOp::StrictNe => Value::Bool(!a.strict_equals(&b)),
            BinaryOp::LooseEq => Value::Bool(a.loose_equals(&b)),
            BinaryOp::LooseNe => Value::Bool(!a.loose_equals(&b)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                let (a, b) = (to_primitive(a), to_primitive(b));
                let ordering = match (&a, &b) {
                    (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
                    _ => a.to_number().partial_cmp(&b.to_number()),
                };
                let Some(ordering) = ordering else {
                    return Ok(Value::Bool(false));
                };
                Value::Bool(match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Gt => ordering.is_gt(),
                    BinaryOp::Le => ordering.is_le(),
                    _ => ordering.is_ge(),
                })
            }
            BinaryOp::BitAnd => Value::Number(f64::from(
                to_int32(a.to_number()) & to_int32(b.to_number()),
            )),
            BinaryOp::BitOr => Value::Number(f64::from(
                to_int32(a.to_number()) | to_int32(b.to_number()),
            )),
            BinaryOp::BitXor => Value::Number(f64::from(
                to_int32(a.to_number()) ^ to_int32(b.to_number()),
            )),
            BinaryOp::InstanceOf => Value::Bool(self.instance_of(&a, &b)?),
            BinaryOp::In => {
                let key = property_key(&a);
                let found = match &b {
                    Value::Object(o) => o.borrow().get(&key).is_some(),
                    Value::Array(items) => {
                        &*key == "length"
                            || array_index(&key).is_some_and(|i| i < items.borrow().len())
                    }
                    Value::Function(f) => f.get_static(&key).is_some(),
                    _ => {
                        return Err(self.type_error(format!(
                            "Cannot use 'in' operator to search for '{key}' in {}",
                            b.to_js_string()
                        )));
                    }
                };
                Value::Bool(found)
            }
        })
    }

    fn instance_of(&self, value: &Value, ctor: &Value) -> Flow<bool> {
        let Value::Function(ctor) = ctor else {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        };
        let is_object_ctor = Rc::ptr_eq(ctor, &self.intrinsics.object_ctor);
        Ok(match value {
            Value::Array(_) => is_object_ctor || Rc::ptr_eq(ctor, &self.intrinsics.array_ctor),
            Value::Object(o) => {
                let mut current = o.borrow().class.clone();
                while let Some(class) = current {
                    if Rc::ptr_eq(&class, ctor) {
                        return Ok(true);
                    }
                    current = class.parent();
                }
                is_object_ctor
            }
            _ => false,
        })
    }

    // ── Properties ───────────────────────────────────────────────────────

    pub fn get_property(&mut self, base: &Value, key: &str) -> Flow<Value> {
        match base {
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot read properties of {} (reading '{key}')",
                base.to_js_string()
            ))),
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                if let Some(i) = array_index(key) {
                    return Ok(s
                        .chars()
                        .nth(i)
                        .map(|c| Value::string(c.to_string()))
                        .unwrap_or_default());
                }
                Ok(self.intrinsics.method(&self.intrinsics.string_methods, key))
            }
            Value::Number(_) => Ok(self.intrinsics.method(&self.intrinsics.number_methods, key)),
            Value::Bool(_) => Ok(self.intrinsics.method(&self.intrinsics.object_methods, key)),
            Value::Symbol(desc) => match key {
                "description" => Ok(Value::String(desc.clone())),
                _ => Ok(self.intrinsics.method(&self.intrinsics.object_methods, key)),
            },
            Value::Array(items) => {
                if key == "length" {
                    return Ok(Value::Number(items.borrow().len() as f64));
                }
                if let Some(i) = array_index(key) {
                    return Ok(items.borrow().get(i).cloned().unwrap_or_default());
                }
                Ok(self.intrinsics.method(&self.intrinsics.array_methods, key))
            }
            Value::Object(o) => {
                if let Some(value) = o.borrow().get(key) {
                    return Ok(value.clone());
                }
                let class = o.borrow().class.clone();
                if let Some(class) = class
                    && let Some(method) = self.find_method(&class, key)
                {
                    return Ok(method);
                }
                Ok(self.intrinsics.method(&self.intrinsics.object_methods, key))
            }
            Value::Function(f) => {
                let mut current = Some(f.clone());
                while let Some(func) = current {
                    if let Some(value) = func.get_static(key) {
                        return Ok(value);
                    }
                    current = func.parent();
                }
                match key {
                    "name" => Ok(Value::String(f.name())),
                    "length" => Ok(Value::Number(match &f.kind {
                        FunctionKind::Closure { def, .. } => def.params.len() as f64,
                        _ => 0.0,
                    })),
                    _ => Ok(self.intrinsics.method(&self.intrinsics.function_methods, key)),
                }
            }
            Value::Element(el) => Ok(match key {
                "type" => match &el.ty {
                    ElementType::Host(tag) => Value::String(tag.clone()),
                    ElementType::Fragment => self.intrinsics.fragment.clone(),
                    ElementType::Component(value) => value.clone(),
                },
                "props" => el.props.clone(),
                "key" => el.key.clone().map(Value::String).unwrap_or(Value::Null),
                _ => Value::Undefined,
            }),
        }
    }

    pub fn set_property(&mut self, base: &Value, key: &str, value: Value) -> Flow<()> {
        match base {
            Value::Object(o) => {
                if o.borrow().frozen {
                    return Err(self.type_error(format!(
                        "Cannot assign to read only property '{key}' of object"
                    )));
                }
                o.borrow_mut().set(key, value);
                Ok(())
            }
            Value::Array(items) => {
                let mut items = items.borrow_mut();
                if key == "length" {
                    let len = value.to_number();
                    if !(0.0..=ARRAY_LENGTH_LIMIT as f64).contains(&len) || len.fract() != 0.0 {
                        return Err(self.throw(ErrorKind::RangeError, "Invalid array length"));
                    }
                    let len = len as usize;
                    if len > items.len() {
                        self.check_array_length(len)?;
                    }
                    items.resize(len, Value::Undefined);
                } else if let Some(i) = array_index(key) {
                    if i >= items.len() {
                        self.check_array_length(i + 1)?;
                        items.resize(i + 1, Value::Undefined);
                    }
                    items[i] = value;
                }
                Ok(())
            }
            Value::Function(f) => {
                f.set_static(key, value);
                Ok(())
            }
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot set properties of {} (setting '{key}')",
                base.to_js_string()
            ))),
            _ => Ok(()),
        }
    }

    /// Instance method lookup along the class chain.
    fn find_method(&self, class: &Rc<Function>, key: &str) -> Option<Value> {
        let mut current = Some(class.clone());
        while let Some(func) = current {
            match &func.kind {
                FunctionKind::Class { def, env, .. } => {
                    for member in &def.members {
                        if let ClassMember::Method {
                            name,
                            def: method,
                            is_static: false,
                        } = member
                            && &**name == key
                        {
                            return Some(closure(method, env));
                        }
                    }
                }
                FunctionKind::Native { .. } => {
                    if let Some(table) = self.intrinsics.native_proto(&func)
                        && let Some(method) = table.get(key)
                    {
                        return Some(method.clone());
                    }
                }
                _ => {}
            }
            current = func.parent();
        }
        None
    }

    /// Values produced by `for...of`, spread and array destructuring.
    pub fn iterate(&self, value: &Value) -> Flow<Vec<Value>> {
        match value {
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::String(s) => Ok(s.chars().map(|c| Value::string(c.to_string())).collect()),
            other => {
                let shown = match other {
                    Value::Undefined | Value::Null => other.to_js_string(),
                    _ => other.type_of().to_string(),
                };
                Err(self.type_error(format!("{shown} is not iterable")))
            }
        }
    }

    // ── Calls ────────────────────────────────────────────────────────────

    pub fn call(&mut self, func: &Value, this: Value, args: Vec<Value>) -> Flow<Value> {
        match func {
            Value::Function(f) => self.call_function(f, this, args),
            other => Err(self.type_error(format!(
                "{} is not a function",
                display_for_console(other)
            ))),
        }
    }

    fn enter_call(&mut self) -> Flow<()> {
        self.check_interrupt()?;
        if self.call_depth >= self.max_call_depth {
            return Err(self.throw(ErrorKind::RangeError, "Maximum call stack size exceeded"));
        }
        self.call_depth += 1;
        Ok(())
    }

    pub fn call_function(&mut self, func: &Rc<Function>, this: Value, args: Vec<Value>) -> Flow<Value> {
        self.enter_call()?;
        let result = self.call_inner(func, this, args);
        self.call_depth -= 1;
        result
    }

    fn call_inner(&mut self, func: &Rc<Function>, this: Value, args: Vec<Value>) -> Flow<Value> {
        match &func.kind {
            FunctionKind::Closure { def, env } => {
                let scope = env.child();
                if !def.is_arrow {
                    scope.declare(THIS.into(), this, false);
                    scope.declare("arguments".into(), Value::array(args.clone()), true);
                }
                self.invoke(def, &scope, args)
            }
            FunctionKind::Native { func, .. } => func(self, this, args),
            FunctionKind::Class { def, .. } => Err(self.type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                def.name.as_deref().unwrap_or("")
            ))),
            FunctionKind::Bound {
                target,
                this: bound_this,
                args: bound_args,
            } => {
                let mut all = bound_args.clone();
                all.extend(args);
                self.call_inner(target, bound_this.clone(), all)
            }
        }
    }

    fn invoke(&mut self, def: &FunctionDef, scope: &Env, args: Vec<Value>) -> Flow<Value> {
        for (i, param) in def.params.iter().enumerate() {
            let mut value = args.get(i).cloned().unwrap_or_default();
            if matches!(value, Value::Undefined)
                && let Some(default) = &param.default
            {
                value = self.eval(default, scope)?;
            }
            self.bind_pattern(&param.target, value, scope, true)?;
        }
        if let Some(rest) = &def.rest {
            let extra = args.get(def.params.len()..).map(<[Value]>::to_vec).unwrap_or_default();
            self.bind_pattern(rest, Value::array(extra), scope, true)?;
        }
        match &def.body {
            FunctionBody::Expr(expr) => self.eval(expr, scope),
            FunctionBody::Block(stmts) => match self.exec_block_in(stmts, scope) {
                Ok(()) | Err(Control::Break | Control::Continue) => Ok(Value::Undefined),
                Err(Control::Return(value)) => Ok(value),
                Err(e) => Err(e),
            },
        }
    }

    pub fn construct(&mut self, ctor: &Value, args: Vec<Value>) -> Flow<Value> {
        let Value::Function(func) = ctor else {
            return Err(self.type_error(format!("{} is not a constructor", display_for_console(ctor))));
        };
        self.enter_call()?;
        let result = self.construct_inner(func, args);
        self.call_depth -= 1;
        result
    }

    fn construct_inner(&mut self, func: &Rc<Function>, args: Vec<Value>) -> Flow<Value> {
        match &func.kind {
            FunctionKind::Class { .. } => {
                let instance = new_instance(func);
                self.construct_into(func, &instance, args)?;
                Ok(instance)
            }
            FunctionKind::Native { func: native, .. } => native(self, Value::Undefined, args),
            FunctionKind::Closure { def, env } => {
                if def.is_arrow {
                    return Err(self.type_error(format!("{} is not a constructor", func.name())));
                }
                let instance = new_instance(func);
                let scope = env.child();
                scope.declare(THIS.into(), instance.clone(), false);
                let result = self.invoke(def, &scope, args)?;
                Ok(match result {
                    Value::Object(_) | Value::Array(_) | Value::Function(_) => result,
                    _ => instance,
                })
            }
            FunctionKind::Bound {
                target,
                args: bound_args,
                ..
            } => {
                let mut all = bound_args.clone();
                all.extend(args);
                self.construct_inner(target, all)
            }
        }
    }

    /// Run `class_fn`'s constructor chain against an existing instance.
    fn construct_into(&mut self, class_fn: &Rc<Function>, instance: &Value, args: Vec<Value>) -> Flow<()> {
        match &class_fn.kind {
            FunctionKind::Class { def, env, parent } => match &def.constructor {
                Some(ctor) => {
                    let scope = env.child();
                    scope.declare(THIS.into(), instance.clone(), false);
                    scope.declare(HOME_CLASS.into(), Value::Function(class_fn.clone()), false);
                    if parent.is_none() {
                        self.init_fields(class_fn, instance)?;
                    }
                    self.invoke(ctor, &scope, args).map(drop)
                }
                None => {
                    if let Some(parent) = parent {
                        self.construct_into(parent, instance, args)?;
                    }
                    self.init_fields(class_fn, instance)
                }
            },
            FunctionKind::Native { func, .. } => func(self, instance.clone(), args).map(drop),
            FunctionKind::Closure { def, env } => {
                let scope = env.child();
                scope.declare(THIS.into(), instance.clone(), false);
                self.invoke(def, &scope, args).map(drop)
            }
            FunctionKind::Bound { target, .. } => self.construct_into(target, instance, args),
        }
    }

    fn init_fields(&mut self, class_fn: &Rc<Function>, instance: &Value) -> Flow<()> {
        let FunctionKind::Class { def, env, .. } = &class_fn.kind else {
            return Ok(());
        };
        let scope = env.child();
        scope.declare(THIS.into(), instance.clone(), false);
        for member in &def.members {
            if let ClassMember::Field {
                name,
                value,
                is_static: false,
            } = member
            {
                let value = match value {
                    Some(expr) => self.eval(expr, &scope)?,
                    None => Value::Undefined,
                };
                infer_name(&value, name);
                self.set_property(instance, name, value)?;
            }
        }
        Ok(())
    }

    fn eval_super_call(&mut self, args: &[Argument], env: &Env) -> Flow<Value> {
        let Some(Value::Function(home)) = env.lookup(HOME_CLASS) else {
            return Err(self.throw(ErrorKind::SyntaxError, "'super' keyword unexpected here"));
        };
        let this = env.lookup(THIS).unwrap_or_default();
        let args = self.eval_args(args, env)?;
        if let Some(parent) = home.parent() {
            self.construct_into(&parent, &this, args)?;
        }
        self.init_fields(&home, &this)?;
        Ok(Value::Undefined)
    }

    fn eval_class(&mut self, def: &Rc<ClassDef>, env: &Env) -> Flow<Value> {
        let parent = match &def.extends {
            Some(expr) => match self.eval(expr, env)? {
                Value::Function(f) => Some(f),
                Value::Null => None,
                other => {
                    return Err(self.type_error(format!(
                        "Class extends value {} is not a constructor or null",
                        display_for_console(&other)
                    )));
                }
            },
            None => None,
        };
        let class_env = env.child();
        let class = Function::new(FunctionKind::Class {
            def: def.clone(),
            env: class_env.clone(),
            parent,
        });
        if let Some(name) = &def.name {
            class_env.declare(name.clone(), Value::Function(class.clone()), false);
        }
        let static_scope = class_env.child();
        static_scope.declare(THIS.into(), Value::Function(class.clone()), false);
        for member in &def.members {
            match member {
                ClassMember::Method {
                    name,
                    def: method,
                    is_static: true,
                } => class.set_static(name.clone(), closure(method, &class_env)),
                ClassMember::Field {
                    name,
                    value,
                    is_static: true,
                } => {
                    let value = match value {
                        Some(expr) => self.eval(expr, &static_scope)?,
                        None => Value::Undefined,
                    };
                    class.set_static(name.clone(), value);
                }
                _ => {}
            }
        }
        Ok(Value::Function(class))
    }

    // ── Elements ─────────────────────────────────────────────────────────

    fn eval_jsx(&mut self, element: &JsxElement, env: &Env) -> Flow<Value> {
        let ty = match &element.name {
            JsxName::Fragment => ElementType::Fragment,
            JsxName::Intrinsic(tag) => ElementType::Host(tag.clone()),
            JsxName::Component(expr) => {
                let value = self.eval(expr, env)?;
                self.element_type(value)
            }
        };
        let mut props = Object::default();
        let mut key = None;
        for attr in &element.attrs {
            match attr {
                JsxAttr::Named { name, value } => {
                    let value = match value {
                        Some(expr) => self.eval(expr, env)?,
                        None => Value::Bool(true),
                    };
                    match &**name {
                        "key" => key = (!value.is_nullish()).then(|| property_key(&value)),
                        "ref" => {}
                        _ => props.set(name.clone(), value),
                    }
                }
                JsxAttr::Spread(expr) => {
                    let source = self.eval(expr, env)?;
                    for (k, v) in own_entries(&source) {
                        if &*k == "key" {
                            key = (!v.is_nullish()).then(|| property_key(&v));
                        } else {
                            props.set(k, v);
                        }
                    }
                }
            }
        }
        let mut children = Vec::with_capacity(element.children.len());
        for child in &element.children {
            match child {
                JsxChild::Text(text) => children.push(Value::String(text.clone())),
                JsxChild::Expr(expr) => children.push(self.eval(expr, env)?),
                JsxChild::Element(child) => children.push(self.eval_jsx(child, env)?),
            }
        }
        if children.len() == 1 {
            props.set("children", children.remove(0));
        } else if !children.is_empty() {
            props.set("children", Value::array(children));
        }
        Ok(make_element(ty, props, key))
    }

    pub(crate) fn element_type(&self, value: Value) -> ElementType {
        match value {
            Value::String(tag) => ElementType::Host(tag),
            Value::Symbol(ref sym) if self.intrinsics.is_fragment(sym) => ElementType::Fragment,
            other => ElementType::Component(other),
        }
    }
}

pub(crate) fn make_element(ty: ElementType, props: Object, key: Option<Rc<str>>) -> Value {
    Value::Element(Rc::new(Element {
        ty,
        props: Value::Object(Rc::new(RefCell::new(props))),
        key,
    }))
}

fn closure(def: &Rc<FunctionDef>, env: &Env) -> Value {
    Value::Function(Function::new(FunctionKind::Closure {
        def: def.clone(),
        env: env.clone(),
    }))
}

fn new_instance(class: &Rc<Function>) -> Value {
    Value::Object(Rc::new(RefCell::new(Object {
        class: Some(class.clone()),
        ..Object::default()
    })))
}

/// Give anonymous functions the name of the binding they are assigned to.
fn infer_name(value: &Value, name: &str) {
    if let Value::Function(f) = value
        && f.name().is_empty()
    {
        f.set_static("name", Value::string(name));
    }
}

fn to_primitive(value: Value) -> Value {
    match value {
        Value::Object(ref o) if o.borrow().primitive.is_some() => {
            o.borrow().primitive.clone().unwrap_or_default()
        }
        Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Element(_) => {
            Value::string(value.to_js_string())
        }
        other => other,
    }
}

pub(crate) fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32 as i32
}

pub(crate) fn own_keys(value: &Value) -> Vec<Rc<str>> {
    match value {
        Value::Object(o) => o.borrow().props.iter().map(|(k, _)| k.clone()).collect(),
        Value::Array(items) => (0..items.borrow().len()).map(|i| i.to_string().into()).collect(),
        Value::String(s) => (0..s.chars().count()).map(|i| i.to_string().into()).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn own_entries(value: &Value) -> Vec<(Rc<str>, Value)> {
    match value {
        Value::Object(o) => o.borrow().props.clone(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (Rc::from(i.to_string()), v.clone()))
            .collect(),
        Value::String(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (Rc::from(i.to_string()), Value::string(c.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

fn delete_property(base: &Value, key: &str) -> bool {
    match base {
        Value::Object(o) => o.borrow_mut().remove(key),
        Value::Array(items) => {
            if let Some(i) = array_index(key)
                && let Some(slot) = items.borrow_mut().get_mut(i)
            {
                *slot = Value::Undefined;
            }
            true
        }
        _ => true,
    }
}

/// Source-ish text for a callee, used in "is not a function" messages.
fn describe_callee(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.to_string(),
        ExprKind::This => "this".into(),
        ExprKind::Member {
            object, property, ..
        } => match property {
            MemberProp::Named(name) => format!("{}.{name}", describe_callee(object)),
            MemberProp::Computed(_) => format!("{}[...]", describe_callee(object)),
        },
        ExprKind::Call { callee, .. } => format!("{}(...)", describe_callee(callee)),
        ExprKind::OptionalChain(inner) => describe_callee(inner),
        _ => "expression".into(),
    }
}

/// Message reported for an uncaught thrown value.
///
/// Plain `Error`s report their message; other error types are prefixed
/// with their name; non-error values are shown as uncaught.
pub fn describe_thrown(value: &Value) -> String {
    if let Value::Object(o) = value {
        let o = o.borrow();
        if o.class.is_some()
            && let Some(message) = o.get("message")
        {
            let name = o
                .get("name")
                .map(Value::to_js_string)
                .unwrap_or_else(|| "Error".into());
            let message = message.to_js_string();
            return if name == "Error" {
                message
            } else if message.is_empty() {
                name
            } else {
                format!("{name}: {message}")
            };
        }
    }
    format!("Uncaught {}", display_for_console(value))
}
