//! Syntax tree for the component dialect.

use std::rc::Rc;

pub type Ident = Rc<str>;

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Const,
    Let,
    Var,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub target: Pattern,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl {
        kind: DeclKind,
        decls: Vec<Declarator>,
    },
    Function(Rc<FunctionDef>),
    Class(Rc<ClassDef>),
    Expr(Expr),
    Block(Vec<Stmt>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Return(Option<Expr>),
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `for (const x of xs)` and `for (const k in obj)`.
    ForEach {
        kind: DeclKind,
        target: Pattern,
        iterable: Expr,
        keys: bool,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Throw(Expr),
    Try {
        block: Vec<Stmt>,
        param: Option<Pattern>,
        handler: Option<Vec<Stmt>>,
        finalizer: Option<Vec<Stmt>>,
    },
    /// `export default function Name() {}` binds `Name` as well.
    ExportDefaultDecl(Box<Stmt>),
    ExportDefault(Expr),
    Empty,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: Option<Ident>,
    pub params: Vec<Binding>,
    pub rest: Option<Pattern>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: Option<Ident>,
    pub extends: Option<Expr>,
    pub constructor: Option<Rc<FunctionDef>>,
    pub members: Vec<ClassMember>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Method {
        name: Ident,
        def: Rc<FunctionDef>,
        is_static: bool,
    },
    Field {
        name: Ident,
        value: Option<Expr>,
        is_static: bool,
    },
}

/// A binding target plus an optional default, used for parameters and
/// array pattern elements.
#[derive(Debug, Clone)]
pub struct Binding {
    pub target: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Ident(Ident),
    Object {
        props: Vec<PropPattern>,
        rest: Option<Ident>,
    },
    Array {
        elems: Vec<Option<Binding>>,
        rest: Option<Box<Pattern>>,
    },
}

#[derive(Debug, Clone)]
pub struct PropPattern {
    pub key: PropKey,
    pub value: Binding,
}

#[derive(Debug, Clone)]
pub enum PropKey {
    Named(Ident),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32) -> Self {
        Self { kind, line }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Template(Vec<TemplatePart>),
    Ident(Ident),
    This,
    Array(Vec<ArrayElem>),
    Object(Vec<ObjectProp>),
    Function(Rc<FunctionDef>),
    Class(Rc<ClassDef>),
    Unary(UnaryOp, Box<Expr>),
    Update {
        increment: bool,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Sequence(Vec<Expr>),
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Argument>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Argument>,
    },
    SuperCall(Vec<Argument>),
    /// Wraps a member/call chain containing `?.` so a nullish base
    /// short-circuits the whole chain.
    OptionalChain(Box<Expr>),
    Delete(Box<Expr>),
    Jsx(Rc<JsxElement>),
}

#[derive(Debug, Clone)]
pub enum TemplatePart {
    Text(Rc<str>),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum ArrayElem {
    Item(Expr),
    Spread(Expr),
    Hole,
}

#[derive(Debug, Clone)]
pub enum ObjectProp {
    KeyValue(PropKey, Expr),
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub enum MemberProp {
    Named(Ident),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum Argument {
    Expr(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    Typeof,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    StrictEq,
    StrictNe,
    LooseEq,
    LooseNe,
    Lt,
    Gt,
    Le,
    Ge,
    BitAnd,
    BitOr,
    BitXor,
    InstanceOf,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Arith(BinaryOp),
    Logical(LogicalOp),
}

#[derive(Debug, Clone)]
pub struct JsxElement {
    pub name: JsxName,
    pub attrs: Vec<JsxAttr>,
    pub children: Vec<JsxChild>,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum JsxName {
    Fragment,
    /// Lowercase host tag such as `div`.
    Intrinsic(Rc<str>),
    /// Capitalized or dotted name resolved in scope.
    Component(Expr),
}

#[derive(Debug, Clone)]
pub enum JsxAttr {
    Named { name: Rc<str>, value: Option<Expr> },
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub enum JsxChild {
    Text(Rc<str>),
    Expr(Expr),
    Element(Rc<JsxElement>),
}
