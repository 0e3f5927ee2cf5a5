//! Recursive-descent parser producing [`Program`].

use std::rc::Rc;

use crate::ast::*;
use crate::error::{Result, ScriptError};
use crate::lexer::{Lexer, TemplateChunk, Token, TokenKind};
use crate::value::number_to_string;

const MAX_NESTING: usize = 200;

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "false", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "yield",
];

/// Parse a complete source unit.
pub fn parse_program(src: &str) -> Result<Program> {
    let mut parser = Parser::new(src)?;
    let mut body = Vec::new();
    while !parser.tok.is_eof() {
        body.push(parser.parse_statement()?);
    }
    Ok(Program { body })
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    tok: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Result<Self> {
        Self::with_lexer(Lexer::new(src))
    }

    fn with_lexer(mut lexer: Lexer<'a>) -> Result<Self> {
        let tok = lexer.next_token()?;
        Ok(Self {
            lexer,
            tok,
            depth: 0,
        })
    }

    fn advance(&mut self) -> Result<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.tok, next))
    }

    fn error_at(&self, tok: &Token, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            message: message.into(),
            line: tok.line,
            column: tok.column,
        }
    }

    fn unexpected(&self) -> ScriptError {
        let message = match &self.tok.kind {
            TokenKind::Eof => "Unexpected end of input".to_string(),
            TokenKind::Ident(name) if RESERVED.contains(&&**name) => {
                format!("Unexpected token '{name}'")
            }
            TokenKind::Ident(name) => format!("Unexpected identifier '{name}'"),
            TokenKind::Number(_) => "Unexpected number".to_string(),
            TokenKind::Str(_) => "Unexpected string".to_string(),
            TokenKind::Template(_) => "Unexpected template string".to_string(),
            TokenKind::Punct(p) => format!("Unexpected token '{p}'"),
        };
        self.error_at(&self.tok, message)
    }

    fn eat(&mut self, p: &str) -> Result<bool> {
        if self.tok.is_punct(p) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, p: &str) -> Result<()> {
        if self.eat(p)? {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> Result<bool> {
        if self.tok.is_ident(kw) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// A non-reserved identifier usable as a binding.
    fn binding_ident(&mut self) -> Result<Ident> {
        match &self.tok.kind {
            TokenKind::Ident(name) if !RESERVED.contains(&&**name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Any identifier including keywords, as used after `.` or as a key.
    fn property_name(&mut self) -> Result<Ident> {
        match &self.tok.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn consume_semicolon(&mut self) -> Result<()> {
        if self.eat(";")? {
            return Ok(());
        }
        if self.tok.is_punct("}") || self.tok.is_eof() || self.tok.newline_before {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error_at(&self.tok, "Maximum nesting depth exceeded"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ── Statements ───────────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Stmt> {
        self.enter()?;
        let stmt = self.parse_statement_inner();
        self.leave();
        stmt
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt> {
        if self.tok.is_punct("{") {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if self.eat(";")? {
            return Ok(Stmt::Empty);
        }
        let keyword = match &self.tok.kind {
            TokenKind::Ident(kw) => kw.clone(),
            _ => return self.parse_expression_statement(),
        };
        match &*keyword {
            "const" | "let" | "var" => {
                let stmt = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Ok(stmt)
            }
            "function" => Ok(Stmt::Function(self.parse_function(true)?)),
            "class" => Ok(Stmt::Class(self.parse_class(true)?)),
            "if" => {
                self.advance()?;
                self.expect("(")?;
                let test = self.parse_expression()?;
                self.expect(")")?;
                let consequent = Box::new(self.parse_statement()?);
                let alternate = if self.eat_keyword("else")? {
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    test,
                    consequent,
                    alternate,
                })
            }
            "return" => {
                self.advance()?;
                let arg = if self.tok.is_punct(";")
                    || self.tok.is_punct("}")
                    || self.tok.is_eof()
                    || self.tok.newline_before
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                Ok(Stmt::Return(arg))
            }
            "while" => {
                self.advance()?;
                self.expect("(")?;
                let test = self.parse_expression()?;
                self.expect(")")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { test, body })
            }
            "do" => {
                self.advance()?;
                let body = Box::new(self.parse_statement()?);
                if !self.eat_keyword("while")? {
                    return Err(self.unexpected());
                }
                self.expect("(")?;
                let test = self.parse_expression()?;
                self.expect(")")?;
                self.eat(";")?;
                Ok(Stmt::DoWhile { body, test })
            }
            "for" => self.parse_for(),
            "break" => {
                self.advance()?;
                self.consume_semicolon()?;
                Ok(Stmt::Break)
            }
            "continue" => {
                self.advance()?;
                self.consume_semicolon()?;
                Ok(Stmt::Continue)
            }
            "throw" => {
                self.advance()?;
                if self.tok.newline_before {
                    return Err(self.error_at(&self.tok, "Illegal newline after throw"));
                }
                let arg = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(arg))
            }
            "try" => self.parse_try(),
            "export" => self.parse_export(),
            "import" => self.parse_import(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect("{")?;
        let mut body = Vec::new();
        while !self.tok.is_punct("}") {
            if self.tok.is_eof() {
                return Err(self.unexpected());
            }
            body.push(self.parse_statement()?);
        }
        self.advance()?;
        Ok(body)
    }

    fn decl_kind(&mut self) -> Result<DeclKind> {
        let kind = if self.tok.is_ident("const") {
            DeclKind::Const
        } else if self.tok.is_ident("let") {
            DeclKind::Let
        } else if self.tok.is_ident("var") {
            DeclKind::Var
        } else {
            return Err(self.unexpected());
        };
        self.advance()?;
        Ok(kind)
    }

    fn parse_var_decl(&mut self) -> Result<Stmt> {
        let kind = self.decl_kind()?;
        let first = self.parse_binding_target()?;
        self.parse_declarators(kind, first)
    }

    fn parse_declarators(&mut self, kind: DeclKind, first: Pattern) -> Result<Stmt> {
        let mut decls = Vec::new();
        let mut target = first;
        loop {
            let at = self.tok.clone();
            let init = if self.eat("=")? {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            if init.is_none() {
                if kind == DeclKind::Const {
                    return Err(self.error_at(&at, "Missing initializer in const declaration"));
                }
                if !matches!(target, Pattern::Ident(_)) {
                    return Err(
                        self.error_at(&at, "Missing initializer in destructuring declaration")
                    );
                }
            }
            decls.push(Declarator { target, init });
            if !self.eat(",")? {
                break;
            }
            target = self.parse_binding_target()?;
        }
        Ok(Stmt::VarDecl { kind, decls })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        self.advance()?;
        self.expect("(")?;

        let mut init = None;
        if self.tok.is_ident("const") || self.tok.is_ident("let") || self.tok.is_ident("var") {
            let kind = self.decl_kind()?;
            let target = self.parse_binding_target()?;
            let keys = self.tok.is_ident("in");
            if keys || self.tok.is_ident("of") {
                self.advance()?;
                let iterable = self.parse_assignment()?;
                self.expect(")")?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Stmt::ForEach {
                    kind,
                    target,
                    iterable,
                    keys,
                    body,
                });
            }
            init = Some(Box::new(self.parse_declarators(kind, target)?));
        } else if !self.tok.is_punct(";") {
            init = Some(Box::new(Stmt::Expr(self.parse_expression()?)));
        }
        self.expect(";")?;
        let test = if self.tok.is_punct(";") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(";")?;
        let update = if self.tok.is_punct(")") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_try(&mut self) -> Result<Stmt> {
        self.advance()?;
        let block = self.parse_block()?;
        let mut param = None;
        let mut handler = None;
        if self.eat_keyword("catch")? {
            if self.eat("(")? {
                param = Some(self.parse_binding_target()?);
                self.expect(")")?;
            }
            handler = Some(self.parse_block()?);
        }
        let finalizer = if self.eat_keyword("finally")? {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_at(&self.tok, "Missing catch or finally after try"));
        }
        Ok(Stmt::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    fn parse_export(&mut self) -> Result<Stmt> {
        self.advance()?;
        if self.eat_keyword("default")? {
            if self.tok.is_ident("function") || self.tok.is_ident("class") {
                let is_function = self.tok.is_ident("function");
                let decl = if is_function {
                    let def = self.parse_function(false)?;
                    if def.name.is_none() {
                        return Ok(Stmt::ExportDefault(Expr::new(
                            ExprKind::Function(def.clone()),
                            def.line,
                        )));
                    }
                    Stmt::Function(def)
                } else {
                    let def = self.parse_class(false)?;
                    if def.name.is_none() {
                        return Ok(Stmt::ExportDefault(Expr::new(
                            ExprKind::Class(def.clone()),
                            def.line,
                        )));
                    }
                    Stmt::Class(def)
                };
                return Ok(Stmt::ExportDefaultDecl(Box::new(decl)));
            }
            let expr = self.parse_assignment()?;
            self.consume_semicolon()?;
            return Ok(Stmt::ExportDefault(expr));
        }
        if self.tok.is_punct("{") {
            // Named export lists only re-expose existing bindings.
            while !self.tok.is_punct("}") {
                if self.tok.is_eof() {
                    return Err(self.unexpected());
                }
                self.advance()?;
            }
            self.advance()?;
            self.consume_semicolon()?;
            return Ok(Stmt::Empty);
        }
        self.parse_statement()
    }

    /// Module imports have nothing to resolve against; skip the clause.
    fn parse_import(&mut self) -> Result<Stmt> {
        self.advance()?;
        while !matches!(self.tok.kind, TokenKind::Str(_)) {
            if self.tok.is_eof() {
                return Err(self.unexpected());
            }
            self.advance()?;
        }
        self.advance()?;
        self.consume_semicolon()?;
        Ok(Stmt::Empty)
    }

    // ── Functions and classes ────────────────────────────────────────────

    fn parse_function(&mut self, require_name: bool) -> Result<Rc<FunctionDef>> {
        let line = self.tok.line;
        self.advance()?;
        if self.tok.is_punct("*") {
            return Err(self.error_at(&self.tok, "Generator functions are not supported"));
        }
        let name = if matches!(self.tok.kind, TokenKind::Ident(_)) {
            Some(self.binding_ident()?)
        } else if require_name {
            return Err(self.error_at(&self.tok, "Function statements require a function name"));
        } else {
            None
        };
        self.parse_function_rest(name, line)
    }

    fn parse_function_rest(&mut self, name: Option<Ident>, line: u32) -> Result<Rc<FunctionDef>> {
        self.expect("(")?;
        let (params, rest) = self.parse_params()?;
        let body = FunctionBody::Block(self.parse_block()?);
        Ok(Rc::new(FunctionDef {
            name,
            params,
            rest,
            body,
            is_arrow: false,
            line,
        }))
    }

    /// Parameters after the opening `(`, through the closing `)`.
    fn parse_params(&mut self) -> Result<(Vec<Binding>, Option<Pattern>)> {
        let mut params = Vec::new();
        let mut rest = None;
        while !self.tok.is_punct(")") {
            if self.eat("...")? {
                rest = Some(self.parse_binding_target()?);
                break;
            }
            params.push(self.parse_binding()?);
            if !self.eat(",")? {
                break;
            }
        }
        self.expect(")")?;
        Ok((params, rest))
    }

    fn parse_binding(&mut self) -> Result<Binding> {
        let target = self.parse_binding_target()?;
        let default = if self.eat("=")? {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        Ok(Binding { target, default })
    }

    fn parse_binding_target(&mut self) -> Result<Pattern> {
        if self.eat("{")? {
            let mut props = Vec::new();
            let mut rest = None;
            while !self.tok.is_punct("}") {
                if self.eat("...")? {
                    rest = Some(self.binding_ident()?);
                    break;
                }
                let (key, shorthand) = self.parse_prop_key()?;
                let target = if self.eat(":")? {
                    self.parse_binding_target()?
                } else {
                    match shorthand {
                        Some(name) if !RESERVED.contains(&&*name) => Pattern::Ident(name),
                        _ => return Err(self.unexpected()),
                    }
                };
                let default = if self.eat("=")? {
                    Some(self.parse_assignment()?)
                } else {
                    None
                };
                props.push(PropPattern {
                    key,
                    value: Binding { target, default },
                });
                if !self.eat(",")? {
                    break;
                }
            }
            self.expect("}")?;
            return Ok(Pattern::Object { props, rest });
        }
        if self.eat("[")? {
            let mut elems = Vec::new();
            let mut rest = None;
            while !self.tok.is_punct("]") {
                if self.eat(",")? {
                    elems.push(None);
                    continue;
                }
                if self.eat("...")? {
                    rest = Some(Box::new(self.parse_binding_target()?));
                    break;
                }
                elems.push(Some(self.parse_binding()?));
                if !self.eat(",")? {
                    break;
                }
            }
            self.expect("]")?;
            return Ok(Pattern::Array { elems, rest });
        }
        Ok(Pattern::Ident(self.binding_ident()?))
    }

    /// Object key; also returns the bare name when shorthand is possible.
    fn parse_prop_key(&mut self) -> Result<(PropKey, Option<Ident>)> {
        match &self.tok.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance()?;
                Ok((PropKey::Named(name.clone()), Some(name)))
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance()?;
                Ok((PropKey::Named(s), None))
            }
            TokenKind::Number(n) => {
                let key: Ident = number_to_string(*n).into();
                self.advance()?;
                Ok((PropKey::Named(key), None))
            }
            TokenKind::Punct("[") => {
                self.advance()?;
                let expr = self.parse_assignment()?;
                self.expect("]")?;
                Ok((PropKey::Computed(Box::new(expr)), None))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_class(&mut self, require_name: bool) -> Result<Rc<ClassDef>> {
        let line = self.tok.line;
        self.advance()?;
        let name = if matches!(&self.tok.kind, TokenKind::Ident(n) if &**n != "extends") {
            Some(self.binding_ident()?)
        } else if require_name {
            return Err(self.error_at(&self.tok, "Class statements require a class name"));
        } else {
            None
        };
        let extends = if self.eat_keyword("extends")? {
            Some(self.parse_call_member()?)
        } else {
            None
        };

        self.expect("{")?;
        let mut constructor = None;
        let mut members = Vec::new();
        while !self.tok.is_punct("}") {
            if self.eat(";")? {
                continue;
            }
            if self.tok.is_eof() {
                return Err(self.unexpected());
            }
            let member_line = self.tok.line;
            let mut name = self.class_member_name()?;
            let mut is_static = false;
            if &*name == "static" && !self.tok.is_punct("(") && !self.tok.is_punct("=") {
                is_static = true;
                name = self.class_member_name()?;
            }
            if self.tok.is_punct("(") {
                let def = self.parse_function_rest(Some(name.clone()), member_line)?;
                if &*name == "constructor" && !is_static {
                    constructor = Some(def);
                } else {
                    members.push(ClassMember::Method {
                        name,
                        def,
                        is_static,
                    });
                }
            } else {
                let value = if self.eat("=")? {
                    Some(self.parse_assignment()?)
                } else {
                    None
                };
                self.consume_semicolon()?;
                members.push(ClassMember::Field {
                    name,
                    value,
                    is_static,
                });
            }
        }
        self.advance()?;
        Ok(Rc::new(ClassDef {
            name,
            extends,
            constructor,
            members,
            line,
        }))
    }

    fn class_member_name(&mut self) -> Result<Ident> {
        match &self.tok.kind {
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(s)
            }
            _ => self.property_name(),
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────

    fn parse_expression(&mut self) -> Result<Expr> {
        let first = self.parse_assignment()?;
        if !self.tok.is_punct(",") {
            return Ok(first);
        }
        let line = first.line;
        let mut exprs = vec![first];
        while self.eat(",")? {
            exprs.push(self.parse_assignment()?);
        }
        Ok(Expr::new(ExprKind::Sequence(exprs), line))
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = self.parse_assignment_inner();
        self.leave();
        expr
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr> {
        if self.is_arrow_start()? {
            return self.parse_arrow();
        }
        let left = self.parse_conditional()?;
        let op = match self.tok.kind {
            TokenKind::Punct("=") => AssignOp::Assign,
            TokenKind::Punct("+=") => AssignOp::Arith(BinaryOp::Add),
            TokenKind::Punct("-=") => AssignOp::Arith(BinaryOp::Sub),
            TokenKind::Punct("*=") => AssignOp::Arith(BinaryOp::Mul),
            TokenKind::Punct("/=") => AssignOp::Arith(BinaryOp::Div),
            TokenKind::Punct("%=") => AssignOp::Arith(BinaryOp::Rem),
            TokenKind::Punct("**=") => AssignOp::Arith(BinaryOp::Pow),
            TokenKind::Punct("&&=") => AssignOp::Logical(LogicalOp::And),
            TokenKind::Punct("||=") => AssignOp::Logical(LogicalOp::Or),
            TokenKind::Punct("??=") => AssignOp::Logical(LogicalOp::Nullish),
            _ => return Ok(left),
        };
        if !is_assignable(&left) {
            return Err(self.error_at(&self.tok, "Invalid left-hand side in assignment"));
        }
        self.advance()?;
        let value = self.parse_assignment()?;
        let line = left.line;
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(left),
                value: Box::new(value),
            },
            line,
        ))
    }

    /// Looks ahead for `x =>` or `( ... ) =>` without consuming input.
    fn is_arrow_start(&mut self) -> Result<bool> {
        match &self.tok.kind {
            TokenKind::Ident(name) if !RESERVED.contains(&&**name) => {
                let mut lookahead = self.lexer.clone();
                let next = lookahead.next_token()?;
                Ok(next.is_punct("=>") && !next.newline_before)
            }
            TokenKind::Punct("(") => {
                let mut lookahead = self.lexer.clone();
                let mut depth = 1usize;
                while depth > 0 {
                    let t = match lookahead.next_token() {
                        Ok(t) => t,
                        Err(_) => return Ok(false),
                    };
                    match t.kind {
                        TokenKind::Eof => return Ok(false),
                        TokenKind::Punct("(" | "[" | "{") => depth += 1,
                        TokenKind::Punct(")" | "]" | "}") => depth -= 1,
                        _ => {}
                    }
                }
                let next = match lookahead.next_token() {
                    Ok(t) => t,
                    Err(_) => return Ok(false),
                };
                Ok(next.is_punct("=>"))
            }
            _ => Ok(false),
        }
    }

    fn parse_arrow(&mut self) -> Result<Expr> {
        let line = self.tok.line;
        let (params, rest) = if self.eat("(")? {
            self.parse_params()?
        } else {
            let name = self.binding_ident()?;
            (
                vec![Binding {
                    target: Pattern::Ident(name),
                    default: None,
                }],
                None,
            )
        };
        self.expect("=>")?;
        let body = if self.tok.is_punct("{") {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expr(Box::new(self.parse_assignment()?))
        };
        Ok(Expr::new(
            ExprKind::Function(Rc::new(FunctionDef {
                name: None,
                params,
                rest,
                body,
                is_arrow: true,
                line,
            })),
            line,
        ))
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let test = self.parse_binary(1)?;
        if !self.eat("?")? {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect(":")?;
        let alternate = self.parse_assignment()?;
        let line = test.line;
        Ok(Expr::new(
            ExprKind::Conditional(Box::new(test), Box::new(consequent), Box::new(alternate)),
            line,
        ))
    }

    fn binary_operator(&self) -> Option<(u8, BinaryOperator)> {
        use BinaryOperator::{Arith, Logic};
        let op = match &self.tok.kind {
            TokenKind::Punct(p) => match *p {
                "??" => (1, Logic(LogicalOp::Nullish)),
                "||" => (2, Logic(LogicalOp::Or)),
                "&&" => (3, Logic(LogicalOp::And)),
                "|" => (4, Arith(BinaryOp::BitOr)),
                "^" => (5, Arith(BinaryOp::BitXor)),
                "&" => (6, Arith(BinaryOp::BitAnd)),
                "===" => (7, Arith(BinaryOp::StrictEq)),
                "!==" => (7, Arith(BinaryOp::StrictNe)),
                "==" => (7, Arith(BinaryOp::LooseEq)),
                "!=" => (7, Arith(BinaryOp::LooseNe)),
                "<" => (8, Arith(BinaryOp::Lt)),
                ">" => (8, Arith(BinaryOp::Gt)),
                "<=" => (8, Arith(BinaryOp::Le)),
                ">=" => (8, Arith(BinaryOp::Ge)),
                "+" => (10, Arith(BinaryOp::Add)),
                "-" => (10, Arith(BinaryOp::Sub)),
                "*" => (11, Arith(BinaryOp::Mul)),
                "/" => (11, Arith(BinaryOp::Div)),
                "%" => (11, Arith(BinaryOp::Rem)),
                "**" => (12, Arith(BinaryOp::Pow)),
                _ => return None,
            },
            TokenKind::Ident(kw) if &**kw == "instanceof" => (8, Arith(BinaryOp::InstanceOf)),
            TokenKind::Ident(kw) if &**kw == "in" => (8, Arith(BinaryOp::In)),
            _ => return None,
        };
        Some(op)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        while let Some((prec, op)) = self.binary_operator() {
            if prec < min_prec {
                break;
            }
            self.advance()?;
            let next_min = if prec == 12 { prec } else { prec + 1 };
            let right = self.parse_binary(next_min)?;
            let line = left.line;
            let kind = match op {
                BinaryOperator::Arith(op) => ExprKind::Binary(op, Box::new(left), Box::new(right)),
                BinaryOperator::Logic(op) => ExprKind::Logical(op, Box::new(left), Box::new(right)),
            };
            left = Expr::new(kind, line);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let line = self.tok.line;
        let op = match &self.tok.kind {
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("-") => Some(UnaryOp::Neg),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Punct("~") => Some(UnaryOp::BitNot),
            TokenKind::Ident(kw) if &**kw == "typeof" => Some(UnaryOp::Typeof),
            TokenKind::Ident(kw) if &**kw == "void" => Some(UnaryOp::Void),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            self.enter()?;
            let arg = self.parse_unary();
            self.leave();
            return Ok(Expr::new(ExprKind::Unary(op, Box::new(arg?)), line));
        }
        if self.eat_keyword("delete")? {
            let arg = self.parse_unary()?;
            return Ok(Expr::new(ExprKind::Delete(Box::new(arg)), line));
        }
        if self.tok.is_punct("++") || self.tok.is_punct("--") {
            let increment = self.tok.is_punct("++");
            self.advance()?;
            let target = self.parse_unary()?;
            if !is_assignable(&target) {
                return Err(self.error_at(
                    &self.tok,
                    "Invalid left-hand side expression in prefix operation",
                ));
            }
            return Ok(Expr::new(
                ExprKind::Update {
                    increment,
                    prefix: true,
                    target: Box::new(target),
                },
                line,
            ));
        }

        let expr = self.parse_call_member()?;
        if (self.tok.is_punct("++") || self.tok.is_punct("--")) && !self.tok.newline_before {
            if !is_assignable(&expr) {
                return Err(self.error_at(
                    &self.tok,
                    "Invalid left-hand side expression in postfix operation",
                ));
            }
            let increment = self.tok.is_punct("++");
            self.advance()?;
            return Ok(Expr::new(
                ExprKind::Update {
                    increment,
                    prefix: false,
                    target: Box::new(expr),
                },
                line,
            ));
        }
        Ok(expr)
    }

    fn parse_call_member(&mut self) -> Result<Expr> {
        let mut expr = if self.tok.is_ident("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let mut optional_chain = false;
        loop {
            let line = self.tok.line;
            if self.eat(".")? {
                let name = self.property_name()?;
                expr = member(expr, MemberProp::Named(name), false, line);
            } else if self.eat("?.")? {
                optional_chain = true;
                if self.tok.is_punct("(") {
                    let args = self.parse_args()?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                            optional: true,
                        },
                        line,
                    );
                } else if self.eat("[")? {
                    let prop = self.parse_expression()?;
                    self.expect("]")?;
                    expr = member(expr, MemberProp::Computed(Box::new(prop)), true, line);
                } else {
                    let name = self.property_name()?;
                    expr = member(expr, MemberProp::Named(name), true, line);
                }
            } else if self.eat("[")? {
                let prop = self.parse_expression()?;
                self.expect("]")?;
                expr = member(expr, MemberProp::Computed(Box::new(prop)), false, line);
            } else if self.tok.is_punct("(") {
                let args = self.parse_args()?;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                        optional: false,
                    },
                    line,
                );
            } else {
                break;
            }
        }
        if optional_chain {
            let line = expr.line;
            expr = Expr::new(ExprKind::OptionalChain(Box::new(expr)), line);
        }
        Ok(expr)
    }

    fn parse_new(&mut self) -> Result<Expr> {
        let line = self.tok.line;
        self.advance()?;
        let mut callee = if self.tok.is_ident("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            let member_line = self.tok.line;
            if self.eat(".")? {
                let name = self.property_name()?;
                callee = member(callee, MemberProp::Named(name), false, member_line);
            } else if self.eat("[")? {
                let prop = self.parse_expression()?;
                self.expect("]")?;
                callee = member(callee, MemberProp::Computed(Box::new(prop)), false, member_line);
            } else {
                break;
            }
        }
        let args = if self.tok.is_punct("(") {
            self.parse_args()?
        } else {
            Vec::new()
        };
        Ok(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            line,
        ))
    }

    fn parse_args(&mut self) -> Result<Vec<Argument>> {
        self.expect("(")?;
        let mut args = Vec::new();
        while !self.tok.is_punct(")") {
            if self.eat("...")? {
                args.push(Argument::Spread(self.parse_assignment()?));
            } else {
                args.push(Argument::Expr(self.parse_assignment()?));
            }
            if !self.eat(",")? {
                break;
            }
        }
        self.expect(")")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let line = self.tok.line;
        let kind = match self.tok.kind.clone() {
            TokenKind::Number(n) => {
                self.advance()?;
                ExprKind::Number(n)
            }
            TokenKind::Str(s) => {
                self.advance()?;
                ExprKind::Str(s)
            }
            TokenKind::Template(chunks) => {
                self.advance()?;
                ExprKind::Template(self.parse_template(chunks)?)
            }
            TokenKind::Punct("(") => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(")")?;
                return Ok(expr);
            }
            TokenKind::Punct("[") => self.parse_array()?,
            TokenKind::Punct("{") => self.parse_object()?,
            TokenKind::Punct("<") => {
                let element = self.parse_jsx_after_lt(line)?;
                self.advance()?;
                ExprKind::Jsx(Rc::new(element))
            }
            TokenKind::Ident(name) => match &*name {
                "true" | "false" => {
                    self.advance()?;
                    ExprKind::Bool(&*name == "true")
                }
                "null" => {
                    self.advance()?;
                    ExprKind::Null
                }
                "undefined" => {
                    self.advance()?;
                    ExprKind::Undefined
                }
                "this" => {
                    self.advance()?;
                    ExprKind::This
                }
                "function" => ExprKind::Function(self.parse_function(false)?),
                "class" => ExprKind::Class(self.parse_class(false)?),
                "super" => {
                    self.advance()?;
                    if !self.tok.is_punct("(") {
                        return Err(self.error_at(&self.tok, "'super' keyword unexpected here"));
                    }
                    ExprKind::SuperCall(self.parse_args()?)
                }
                _ => ExprKind::Ident(self.binding_ident()?),
            },
            _ => return Err(self.unexpected()),
        };
        Ok(Expr::new(kind, line))
    }

    fn parse_template(&mut self, chunks: Vec<TemplateChunk>) -> Result<Vec<TemplatePart>> {
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match chunk {
                TemplateChunk::Text(text) => parts.push(TemplatePart::Text(text.into())),
                TemplateChunk::Expr {
                    source,
                    line,
                    column,
                } => {
                    let mut sub = Parser::with_lexer(Lexer::starting_at(&source, line, column))?;
                    sub.depth = self.depth;
                    let expr = sub.parse_expression()?;
                    if !sub.tok.is_eof() {
                        return Err(sub.unexpected());
                    }
                    parts.push(TemplatePart::Expr(expr));
                }
            }
        }
        Ok(parts)
    }

    fn parse_array(&mut self) -> Result<ExprKind> {
        self.advance()?;
        let mut elems = Vec::new();
        while !self.tok.is_punct("]") {
            if self.eat(",")? {
                elems.push(ArrayElem::Hole);
                continue;
            }
            if self.eat("...")? {
                elems.push(ArrayElem::Spread(self.parse_assignment()?));
            } else {
                elems.push(ArrayElem::Item(self.parse_assignment()?));
            }
            if !self.eat(",")? {
                break;
            }
        }
        self.expect("]")?;
        Ok(ExprKind::Array(elems))
    }

    fn parse_object(&mut self) -> Result<ExprKind> {
        self.advance()?;
        let mut props = Vec::new();
        while !self.tok.is_punct("}") {
            if self.eat("...")? {
                props.push(ObjectProp::Spread(self.parse_assignment()?));
            } else {
                let line = self.tok.line;
                let (key, shorthand) = self.parse_prop_key()?;
                let value = if self.tok.is_punct("(") {
                    let name = match &key {
                        PropKey::Named(name) => Some(name.clone()),
                        PropKey::Computed(_) => None,
                    };
                    Expr::new(ExprKind::Function(self.parse_function_rest(name, line)?), line)
                } else if self.eat(":")? {
                    self.parse_assignment()?
                } else {
                    match shorthand {
                        Some(name) if !RESERVED.contains(&&*name) => {
                            Expr::new(ExprKind::Ident(name), line)
                        }
                        _ => return Err(self.unexpected()),
                    }
                };
                props.push(ObjectProp::KeyValue(key, value));
            }
            if !self.eat(",")? {
                break;
            }
        }
        self.expect("}")?;
        Ok(ExprKind::Object(props))
    }

    // ── JSX ──────────────────────────────────────────────────────────────

    /// Parse an element whose `<` was just consumed. Leaves the lexer
    /// directly after the element's final `>`.
    fn parse_jsx_after_lt(&mut self, line: u32) -> Result<JsxElement> {
        self.enter()?;
        let element = self.parse_jsx_element(line);
        self.leave();
        element
    }

    fn parse_jsx_element(&mut self, line: u32) -> Result<JsxElement> {
        self.lexer.skip_jsx_whitespace();
        if self.lexer.eat_char('>') {
            let children = self.parse_jsx_children("")?;
            return Ok(JsxElement {
                name: JsxName::Fragment,
                attrs: Vec::new(),
                children,
                line,
            });
        }
        let tag = self
            .lexer
            .read_jsx_name()
            .ok_or_else(|| self.lexer.error("Unexpected token in JSX tag"))?;
        let name = jsx_name(&tag, line);

        self.advance()?;
        let mut attrs = Vec::new();
        loop {
            if self.tok.is_punct("/") {
                self.advance()?;
                if !self.tok.is_punct(">") {
                    return Err(self.unexpected());
                }
                return Ok(JsxElement {
                    name,
                    attrs,
                    children: Vec::new(),
                    line,
                });
            }
            if self.tok.is_punct(">") {
                break;
            }
            if self.tok.is_punct("{") {
                self.advance()?;
                self.expect("...")?;
                let expr = self.parse_assignment()?;
                if !self.tok.is_punct("}") {
                    return Err(self.unexpected());
                }
                self.advance()?;
                attrs.push(JsxAttr::Spread(expr));
                continue;
            }
            if !matches!(self.tok.kind, TokenKind::Ident(_)) {
                return Err(self.unexpected());
            }
            self.lexer.reset(self.tok.position());
            let attr_name: Rc<str> = self
                .lexer
                .read_jsx_name()
                .ok_or_else(|| self.unexpected())?
                .into();
            self.advance()?;
            let value = if self.eat("=")? {
                let value_line = self.tok.line;
                match self.tok.kind.clone() {
                    TokenKind::Str(s) => {
                        self.advance()?;
                        Some(Expr::new(ExprKind::Str(decode_entities(&s).into()), value_line))
                    }
                    TokenKind::Punct("{") => {
                        self.advance()?;
                        let expr = self.parse_assignment()?;
                        if !self.tok.is_punct("}") {
                            return Err(self.unexpected());
                        }
                        self.advance()?;
                        Some(expr)
                    }
                    _ => return Err(self.unexpected()),
                }
            } else {
                None
            };
            attrs.push(JsxAttr::Named {
                name: attr_name,
                value,
            });
        }

        let children = self.parse_jsx_children(&tag)?;
        Ok(JsxElement {
            name,
            attrs,
            children,
            line,
        })
    }

    /// Children up to and including the closing tag for `tag`.
    fn parse_jsx_children(&mut self, tag: &str) -> Result<Vec<JsxChild>> {
        let mut children = Vec::new();
        loop {
            let raw = self.lexer.read_jsx_text();
            if let Some(text) = clean_jsx_text(&raw) {
                children.push(JsxChild::Text(decode_entities(&text).into()));
            }
            match self.lexer.peek_char() {
                None => return Err(self.lexer.error("Unterminated JSX contents")),
                Some('{') => {
                    self.lexer.bump();
                    self.advance()?;
                    if self.tok.is_punct("}") {
                        continue;
                    }
                    let expr = self.parse_expression()?;
                    if !self.tok.is_punct("}") {
                        return Err(self.unexpected());
                    }
                    children.push(JsxChild::Expr(expr));
                }
                Some(_) => {
                    let line = self.lexer.position().line;
                    self.lexer.bump();
                    self.lexer.skip_jsx_whitespace();
                    if self.lexer.eat_char('/') {
                        self.lexer.skip_jsx_whitespace();
                        let closing = self.lexer.read_jsx_name().unwrap_or_default();
                        self.lexer.skip_jsx_whitespace();
                        if closing != tag || !self.lexer.eat_char('>') {
                            return Err(self.lexer.error(format!(
                                "Expected corresponding JSX closing tag for <{tag}>"
                            )));
                        }
                        return Ok(children);
                    }
                    let child = self.parse_jsx_after_lt(line)?;
                    children.push(JsxChild::Element(Rc::new(child)));
                }
            }
        }
    }
}

enum BinaryOperator {
    Arith(BinaryOp),
    Logic(LogicalOp),
}

fn member(object: Expr, property: MemberProp, optional: bool, line: u32) -> Expr {
    Expr::new(
        ExprKind::Member {
            object: Box::new(object),
            property,
            optional,
        },
        line,
    )
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Ident(_) | ExprKind::Member { optional: false, .. }
    )
}

fn jsx_name(tag: &str, line: u32) -> JsxName {
    let first = tag.chars().next().unwrap_or('a');
    if (first.is_lowercase() && !tag.contains('.')) || tag.contains('-') {
        return JsxName::Intrinsic(tag.into());
    }
    let mut parts = tag.split('.');
    let head = parts.next().unwrap_or_default();
    let mut expr = Expr::new(ExprKind::Ident(head.into()), line);
    for part in parts {
        expr = member(expr, MemberProp::Named(part.into()), false, line);
    }
    JsxName::Component(expr)
}

/// Collapse JSX text the way the JSX transform does: lines are trimmed,
/// blank lines dropped, and the rest joined with single spaces.
fn clean_jsx_text(raw: &str) -> Option<String> {
    if !raw.contains('\n') {
        return (!raw.is_empty()).then(|| raw.to_string());
    }
    let lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len() - 1;
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut piece = *line;
        if i > 0 {
            piece = piece.trim_start();
        }
        if i < last {
            piece = piece.trim_end();
        }
        if piece.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(piece);
    }
    (!out.is_empty()).then_some(out)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                "copy" => Some('\u{a9}'),
                "mdash" => Some('\u{2014}'),
                "hellip" => Some('\u{2026}'),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        parse_program(src).unwrap()
    }

    fn syntax_error(src: &str) -> (String, u32) {
        match parse_program(src) {
            Err(ScriptError::Syntax { message, line, .. }) => (message, line),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_arrow_component_with_jsx() {
        let program = parse("const Hello = ({ name }) => <div className=\"x\">Hi {name}</div>;");
        let Stmt::VarDecl { decls, .. } = &program.body[0] else {
            panic!("expected declaration");
        };
        let Some(init) = &decls[0].init else {
            panic!("missing init");
        };
        let ExprKind::Function(def) = &init.kind else {
            panic!("expected arrow");
        };
        assert!(def.is_arrow);
        let FunctionBody::Expr(body) = &def.body else {
            panic!("expected expression body");
        };
        let ExprKind::Jsx(el) = &body.kind else {
            panic!("expected jsx");
        };
        assert!(matches!(&el.name, JsxName::Intrinsic(t) if &**t == "div"));
        assert_eq!(el.attrs.len(), 1);
        assert_eq!(el.children.len(), 2);
        assert!(matches!(&el.children[0], JsxChild::Text(t) if &**t == "Hi "));
    }

    #[test]
    fn test_jsx_text_with_apostrophe_and_multiline() {
        let program = parse("const A = () => (\n  <p>\n    Don't   stop\n    here\n  </p>\n);");
        let Stmt::VarDecl { decls, .. } = &program.body[0] else {
            panic!()
        };
        let ExprKind::Function(def) = &decls[0].init.as_ref().unwrap().kind else {
            panic!()
        };
        let FunctionBody::Expr(body) = &def.body else {
            panic!()
        };
        let ExprKind::Jsx(el) = &body.kind else {
            panic!()
        };
        assert!(matches!(&el.children[0], JsxChild::Text(t) if &**t == "Don't   stop here"));
    }

    #[test]
    fn test_fragments_comments_and_components() {
        let program = parse(
            "function App() { return <><Card.Body title='x' disabled />{/* note */}<my-el/></>; }",
        );
        let Stmt::Function(def) = &program.body[0] else {
            panic!()
        };
        let FunctionBody::Block(body) = &def.body else {
            panic!()
        };
        let Stmt::Return(Some(expr)) = &body[0] else {
            panic!()
        };
        let ExprKind::Jsx(el) = &expr.kind else {
            panic!()
        };
        assert!(matches!(el.name, JsxName::Fragment));
        assert_eq!(el.children.len(), 2);
        let JsxChild::Element(card) = &el.children[0] else {
            panic!()
        };
        assert!(matches!(card.name, JsxName::Component(_)));
        assert_eq!(card.attrs.len(), 2);
        let JsxChild::Element(custom) = &el.children[1] else {
            panic!()
        };
        assert!(matches!(&custom.name, JsxName::Intrinsic(t) if &**t == "my-el"));
    }

    #[test]
    fn test_class_component() {
        let program = parse(
            "class Counter extends React.Component {\n  state = { n: 0 };\n  static defaultProps = {};\n  render() { return <b>{this.state.n}</b>; }\n}",
        );
        let Stmt::Class(class) = &program.body[0] else {
            panic!()
        };
        assert_eq!(class.name.as_deref(), Some("Counter"));
        assert!(class.extends.is_some());
        assert_eq!(class.members.len(), 3);
        assert!(matches!(
            &class.members[1],
            ClassMember::Field { is_static: true, .. }
        ));
    }

    #[test]
    fn test_asi_and_return_newline() {
        let program = parse("let a = 1\nlet b = a\nfunction f() { return\n 5 }");
        assert_eq!(program.body.len(), 3);
        let Stmt::Function(def) = &program.body[2] else {
            panic!()
        };
        let FunctionBody::Block(body) = &def.body else {
            panic!()
        };
        assert!(matches!(body[0], Stmt::Return(None)));
    }

    #[test]
    fn test_precedence() {
        let program = parse("x = 1 + 2 * 3 ** 2 ** 1 > 4 && y ?? z;");
        let Stmt::Expr(expr) = &program.body[0] else {
            panic!()
        };
        let ExprKind::Assign { value, .. } = &expr.kind else {
            panic!()
        };
        assert!(matches!(value.kind, ExprKind::Logical(LogicalOp::Nullish, _, _)));
    }

    #[test]
    fn test_optional_chain_wraps_whole_chain() {
        let program = parse("a?.b.c();");
        let Stmt::Expr(expr) = &program.body[0] else {
            panic!()
        };
        assert!(matches!(expr.kind, ExprKind::OptionalChain(_)));
    }

    #[test]
    fn test_template_expression_lines() {
        let program = parse("const s = `a\n${ b.c }`;");
        let Stmt::VarDecl { decls, .. } = &program.body[0] else {
            panic!()
        };
        let ExprKind::Template(parts) = &decls[0].init.as_ref().unwrap().kind else {
            panic!()
        };
        let TemplatePart::Expr(e) = &parts[1] else {
            panic!()
        };
        assert_eq!(e.line, 2);
    }

    #[test]
    fn test_imports_and_exports() {
        let program = parse(
            "import React, { useState } from 'react';\nexport default function App() { return null }\nexport { App };",
        );
        assert!(matches!(program.body[0], Stmt::Empty));
        assert!(matches!(program.body[1], Stmt::ExportDefaultDecl(_)));
    }

    #[test]
    fn test_syntax_errors_report_line() {
        let (message, line) = syntax_error("const A = () => {\n  return <div>;\n}");
        assert!(message.contains("JSX") || message.starts_with("Unexpected"), "{message}");
        assert!(line >= 2);

        let (message, _) = syntax_error("const x;");
        assert_eq!(message, "Missing initializer in const declaration");

        let (message, line) = syntax_error("let a = 1;\nlet b = ;");
        assert_eq!(message, "Unexpected token ';'");
        assert_eq!(line, 2);
    }

    #[test]
    fn test_mismatched_closing_tag() {
        let (message, _) = syntax_error("const A = () => <div></span>;");
        assert_eq!(message, "Expected corresponding JSX closing tag for <div>");
    }

    #[test]
    fn test_nesting_limit() {
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let src = format!("x = {}1{};", "(".repeat(400), ")".repeat(400));
                syntax_error(&src).0
            })
            .unwrap();
        assert_eq!(handle.join().unwrap(), "Maximum nesting depth exceeded");
    }

    #[test]
    fn test_entities_and_jsx_text_cleanup() {
        assert_eq!(decode_entities("a &amp; b &lt;3 &#65;&#x42; &bogus"), "a & b <3 AB &bogus");
        assert_eq!(clean_jsx_text("\n   \n  "), None);
        assert_eq!(clean_jsx_text("  hi  ").as_deref(), Some("  hi  "));
        assert_eq!(clean_jsx_text("\n  a\n  b  \n").as_deref(), Some("a b"));
    }
}
