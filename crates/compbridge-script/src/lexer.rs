//! Tokenizer for the component dialect.
//!
//! The lexer is pull-based: the parser asks for one token at a time and,
//! inside JSX, switches to character-level reads (`read_jsx_text`,
//! `read_jsx_name`) because JSX text is not tokenizable as script.

use std::rc::Rc;

use crate::error::{Result, ScriptError};

/// Punctuators, longest first so greedy matching works.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "...", "**=", "||=", "&&=", "??=", "=>", "==", "!=", "<=", ">=", "&&", "||",
    "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "**", "{", "}", "(", ")", "[", "]", ";",
    ",", "<", ">", "+", "-", "*", "/", "%", "!", "=", "?", ":", ".", "&", "|", "^", "~",
];

/// A piece of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateChunk {
    Text(String),
    /// Raw source of a `${...}` substitution and where it starts.
    Expr {
        source: String,
        line: u32,
        column: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(Rc<str>),
    Number(f64),
    Str(Rc<str>),
    Template(Vec<TemplateChunk>),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(q) if q == p)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(id) if &**id == name)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Position of the first character of this token.
    pub fn position(&self) -> Position {
        Position {
            offset: self.start,
            line: self.line,
            column: self.column,
        }
    }
}

/// Saved lexer position, used to rewind to a token start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::starting_at(src, 1, 1)
    }

    /// Lexer whose line/column numbering starts at the given position.
    ///
    /// Used for template substitutions so errors point into the outer source.
    pub fn starting_at(src: &'a str, line: u32, column: u32) -> Self {
        Self {
            src,
            pos: 0,
            line,
            column,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    pub fn reset(&mut self, to: Position) {
        self.pos = to.offset;
        self.line = to.line;
        self.column = to.column;
    }

    pub fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            message: message.into(),
            line: self.line,
            column: self.column,
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_char_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s)
    }

    /// Skip whitespace and comments. Returns whether a newline was crossed.
    pub fn skip_trivia(&mut self) -> Result<bool> {
        let mut newline = false;
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    if c == '\n' {
                        newline = true;
                    }
                    self.bump();
                }
                Some('/') if self.starts_with("//") => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.starts_with("/*") => {
                    self.bump();
                    self.bump();
                    loop {
                        if self.starts_with("*/") {
                            self.bump();
                            self.bump();
                            break;
                        }
                        match self.bump() {
                            Some('\n') => newline = true,
                            Some(_) => {}
                            None => return Err(self.error("Unterminated comment")),
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        let newline_before = self.skip_trivia()?;
        let start = self.pos;
        let line = self.line;
        let column = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) if is_ident_start(c) => TokenKind::Ident(self.read_ident().into()),
            Some(c) if c.is_ascii_digit() => TokenKind::Number(self.read_number()?),
            Some('.') if self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                TokenKind::Number(self.read_number()?)
            }
            Some(q @ ('"' | '\'')) => TokenKind::Str(self.read_string(q)?.into()),
            Some('`') => TokenKind::Template(self.read_template()?),
            Some(_) => TokenKind::Punct(self.read_punct()?),
        };

        Ok(Token {
            kind,
            start,
            end: self.pos,
            line,
            column,
            newline_before,
        })
    }

    fn read_ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            if is_ident_part(c) {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    fn read_number(&mut self) -> Result<f64> {
        if self.starts_with("0x") || self.starts_with("0X") {
            self.bump();
            self.bump();
            let mut digits = String::new();
            while let Some(c) = self.peek_char() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                } else if c != '_' {
                    break;
                }
                self.bump();
            }
            return u64::from_str_radix(&digits, 16)
                .map(|n| n as f64)
                .map_err(|_| self.error("Invalid hexadecimal number"));
        }

        let mut text = String::new();
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(c) = self.peek_char() {
            match c {
                '0'..='9' => text.push(c),
                '_' => {}
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    text.push(c);
                }
                'e' | 'E' if !seen_exp => {
                    seen_exp = true;
                    text.push(c);
                    self.bump();
                    if let Some(sign @ ('+' | '-')) = self.peek_char() {
                        text.push(sign);
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }
        if self.peek_char().is_some_and(is_ident_start) {
            return Err(self.error("Invalid or unexpected token"));
        }
        text.parse::<f64>()
            .map_err(|_| self.error(format!("Invalid number '{text}'")))
    }

    fn read_escape(&mut self) -> Result<Option<char>> {
        let c = self
            .bump()
            .ok_or_else(|| self.error("Invalid or unexpected token"))?;
        let out = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            '\n' => return Ok(None),
            'x' => {
                let hex: String = (0..2).filter_map(|_| self.bump()).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| self.error("Invalid hexadecimal escape sequence"))?;
                char::from_u32(code).unwrap_or('\u{fffd}')
            }
            'u' => {
                let hex: String = if self.peek_char() == Some('{') {
                    self.bump();
                    let mut hex = String::new();
                    while let Some(c) = self.bump() {
                        if c == '}' {
                            break;
                        }
                        hex.push(c);
                    }
                    hex
                } else {
                    (0..4).filter_map(|_| self.bump()).collect()
                };
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| self.error("Invalid Unicode escape sequence"))?;
                char::from_u32(code).unwrap_or('\u{fffd}')
            }
            other => other,
        };
        Ok(Some(out))
    }

    fn read_string(&mut self, quote: char) -> Result<String> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("Invalid or unexpected token")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    if let Some(c) = self.read_escape()? {
                        out.push(c);
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn read_template(&mut self) -> Result<Vec<TemplateChunk>> {
        self.bump();
        let mut chunks = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.error("Unterminated template literal")),
                Some('`') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    if let Some(c) = self.read_escape()? {
                        text.push(c);
                    }
                }
                Some('$') if self.starts_with("${") => {
                    self.bump();
                    self.bump();
                    if !text.is_empty() {
                        chunks.push(TemplateChunk::Text(std::mem::take(&mut text)));
                    }
                    let line = self.line;
                    let column = self.column;
                    let start = self.pos;
                    self.skip_balanced('}')?;
                    let source = self.src[start..self.pos].to_string();
                    self.bump();
                    chunks.push(TemplateChunk::Expr {
                        source,
                        line,
                        column,
                    });
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        if !text.is_empty() {
            chunks.push(TemplateChunk::Text(text));
        }
        Ok(chunks)
    }

    /// Advance to the unmatched `close` brace, leaving it unconsumed.
    fn skip_balanced(&mut self, close: char) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.peek_char() {
                None => return Err(self.error("Unterminated template literal")),
                Some(c @ ('"' | '\'')) => {
                    self.read_string(c)?;
                }
                Some('`') => {
                    self.read_template()?;
                }
                Some('{') => {
                    depth += 1;
                    self.bump();
                }
                Some(c) if c == close && depth == 0 => return Ok(()),
                Some('}') => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn read_punct(&mut self) -> Result<&'static str> {
        for p in PUNCTUATORS {
            if self.starts_with(p) {
                // `a?.5:1` is a conditional, not optional chaining.
                if *p == "?." && self.peek_char_at(2).is_some_and(|c| c.is_ascii_digit()) {
                    continue;
                }
                for _ in 0..p.chars().count() {
                    self.bump();
                }
                return Ok(p);
            }
        }
        let c = self.peek_char().unwrap_or('?');
        Err(self.error(format!("Invalid or unexpected token '{c}'")))
    }

    // ── JSX character-level reads ────────────────────────────────────────

    /// Raw JSX text up to the next `<` or `{`.
    pub fn read_jsx_text(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            if c == '<' || c == '{' {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    /// A JSX tag or attribute name (`div`, `aria-label`, `React.Fragment`).
    pub fn read_jsx_name(&mut self) -> Option<String> {
        let first = self.peek_char()?;
        if !is_ident_start(first) {
            return None;
        }
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            if is_ident_part(c) || c == '-' || c == ':' || c == '.' {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Some(out)
    }

    /// Skip plain whitespace (no comments) inside JSX tags.
    pub fn skip_jsx_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Consume `expected` if it is the next character.
    pub fn eat_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok.is_eof() {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn test_basic_tokens() {
        let toks = kinds("const X = ({n}) => n >= 1;");
        assert_eq!(toks[0], TokenKind::Ident("const".into()));
        assert!(toks.contains(&TokenKind::Punct("=>")));
        assert!(toks.contains(&TokenKind::Punct(">=")));
        assert_eq!(toks.last(), Some(&TokenKind::Punct(";")));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("42 3.5 .5 1e3 0xff 1_000"), vec![
            TokenKind::Number(42.0),
            TokenKind::Number(3.5),
            TokenKind::Number(0.5),
            TokenKind::Number(1000.0),
            TokenKind::Number(255.0),
            TokenKind::Number(1000.0),
        ]);
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(kinds(r#"'a\'b' "c\nd" "A""#), vec![
            TokenKind::Str("a'b".into()),
            TokenKind::Str("c\nd".into()),
            TokenKind::Str("A".into()),
        ]);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let mut lexer = Lexer::new("'abc");
        assert!(matches!(lexer.next_token(), Err(ScriptError::Syntax { .. })));
    }

    #[test]
    fn test_template_chunks() {
        let toks = kinds("`a ${b + `x${c}`} d`");
        let TokenKind::Template(chunks) = &toks[0] else {
            panic!("expected template");
        };
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], TemplateChunk::Text("a ".into()));
        assert!(matches!(&chunks[1], TemplateChunk::Expr { source, .. } if source == "b + `x${c}`"));
        assert_eq!(chunks[2], TemplateChunk::Text(" d".into()));
    }

    #[test]
    fn test_comments_and_newlines() {
        let mut lexer = Lexer::new("a // comment\n/* block */ b");
        let a = lexer.next_token().unwrap();
        let b = lexer.next_token().unwrap();
        assert!(!a.newline_before);
        assert!(b.newline_before);
        assert_eq!(b.line, 2);
    }

    #[test]
    fn test_optional_chaining_vs_conditional() {
        assert!(kinds("a?.b").contains(&TokenKind::Punct("?.")));
        assert!(kinds("a?.5:1").contains(&TokenKind::Punct("?")));
    }

    #[test]
    fn test_jsx_reads() {
        let mut lexer = Lexer::new("aria-label=\"x\"> hello {name}");
        assert_eq!(lexer.read_jsx_name().as_deref(), Some("aria-label"));
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert_eq!(lexer.read_jsx_text(), " hello ");
        assert_eq!(lexer.peek_char(), Some('{'));
    }
}
