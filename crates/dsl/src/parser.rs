//! Build Script Parser
//!
//! Parses the declarative Kotlin DSL subset into a [`Script`].

use std::path::Path;
use gradle_composer_core::{ComposeError, SyntaxError};
use tracing::debug;

use crate::ast::{Arg, Expr, Position, Script, Segment, Statement, StatementKind};
use crate::lexer::{Lexer, Token, TokenKind};

/// Words accepted as infix operators after an expression
const INFIX_WORDS: &[&str] = &["version", "apply"];

/// Deepest nesting of expressions, blocks and type arguments
pub const MAX_DEPTH: usize = 128;

/// Script parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Parse a script file from path
    pub async fn parse_file(path: impl AsRef<Path>) -> Result<Script, ComposeError> {
        let path = path.as_ref();
        debug!("Parsing {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse_str(&content).map_err(|e| ComposeError::syntax(path.display().to_string(), e))
    }

    /// Parse a script from a string
    pub fn parse_str(src: &str) -> Result<Script, SyntaxError> {
        let tokens = Lexer::new(src).tokenize()?;
        let mut parser = Parser { tokens, pos: 0, depth: 0 };
        let statements = parser.statements()?;
        parser.expect(&TokenKind::Eof, "end of script")?;
        Ok(Script { statements })
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> &Token {
        let idx = self.pos;
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn position(&self) -> Position {
        let token = &self.tokens[self.pos];
        Position {
            line: token.line,
            column: token.column,
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let token = &self.tokens[self.pos];
        SyntaxError {
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), SyntaxError> {
        if self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {}", what, describe(self.peek()))))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String, SyntaxError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected {}, found {}", what, describe(&other)))),
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>) -> Result<T, SyntaxError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {} levels", MAX_DEPTH)));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), TokenKind::Newline) {
            self.advance();
        }
    }

    /// Statements up to a closing brace or end of input
    fn statements(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        let mut statements = Vec::new();
        loop {
            while matches!(self.peek(), TokenKind::Newline | TokenKind::Semi) {
                self.advance();
            }
            if matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
                return Ok(statements);
            }

            statements.push(self.statement()?);

            match self.peek() {
                TokenKind::Newline | TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof => {}
                other => {
                    return Err(self.error(format!(
                        "expected end of statement, found {}",
                        describe(other)
                    )))
                }
            }
        }
    }

    fn statement(&mut self) -> Result<Statement, SyntaxError> {
        let position = self.position();

        if matches!(self.peek(), TokenKind::Ident(w) if w == "val" || w == "var") {
            self.advance();
            let name = self.ident("binding name")?;
            let ty = if matches!(self.peek(), TokenKind::Colon) {
                self.advance();
                Some(self.type_name()?)
            } else {
                None
            };
            self.expect(&TokenKind::Eq, "`=`")?;
            let value = self.expr()?;
            return Ok(Statement {
                kind: StatementKind::Val { name, ty, value },
                position,
            });
        }

        let expr = self.expr()?;

        if matches!(self.peek(), TokenKind::Eq) {
            let target = match &expr {
                Expr::Chain(segments) if segments.iter().all(Segment::is_plain) => {
                    segments.iter().map(|s| s.name.clone()).collect()
                }
                _ => return Err(self.error("invalid assignment target")),
            };
            self.advance();
            let value = self.expr()?;
            return Ok(Statement {
                kind: StatementKind::Assign { target, value },
                position,
            });
        }

        Ok(Statement {
            kind: StatementKind::Expr(expr),
            position,
        })
    }

    /// `Name`, `a.b.Name` or `Name<Arg, ...>`, rendered back to text
    fn type_name(&mut self) -> Result<String, SyntaxError> {
        self.nested(Self::type_path)
    }

    fn type_path(&mut self) -> Result<String, SyntaxError> {
        let mut name = self.ident("type name")?;
        while matches!(self.peek(), TokenKind::Dot) {
            self.advance();
            name.push('.');
            name.push_str(&self.ident("type name")?);
        }
        if matches!(self.peek(), TokenKind::Lt) {
            let args = self.type_args()?;
            name.push('<');
            name.push_str(&args.join(", "));
            name.push('>');
        }
        Ok(name)
    }

    fn type_args(&mut self) -> Result<Vec<String>, SyntaxError> {
        self.expect(&TokenKind::Lt, "`<`")?;
        let mut args = vec![self.type_name()?];
        while matches!(self.peek(), TokenKind::Comma) {
            self.advance();
            args.push(self.type_name()?);
        }
        self.expect(&TokenKind::Gt, "`>`")?;
        Ok(args)
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::infix)
    }

    fn infix(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.primary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Ident(word) if INFIX_WORDS.contains(&word.as_str()) => word.clone(),
                _ => break,
            };
            self.advance();
            let rhs = self.primary()?;
            lhs = Expr::Infix {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek().clone() {
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::Int(i) => {
                self.advance();
                Ok(Expr::Int(i))
            }
            TokenKind::Ident(word) if word == "true" || word == "false" => {
                self.advance();
                Ok(Expr::Bool(word == "true"))
            }
            TokenKind::Ident(_) => self.chain(),
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.expr()?;
                self.skip_newlines();
                self.expect(&TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            other => Err(self.error(format!("expected expression, found {}", describe(&other)))),
        }
    }

    fn chain(&mut self) -> Result<Expr, SyntaxError> {
        let mut segments = Vec::new();
        loop {
            let mut segment = Segment {
                name: self.ident("name")?,
                ..Default::default()
            };

            if matches!(self.peek(), TokenKind::Lt) {
                segment.type_args = self.type_args()?;
            }
            if matches!(self.peek(), TokenKind::LParen) {
                segment.args = Some(self.args()?);
            }
            if matches!(self.peek(), TokenKind::LBrace) {
                self.advance();
                let body = self.statements()?;
                self.expect(&TokenKind::RBrace, "`}`")?;
                segment.block = Some(body);
            }
            segments.push(segment);

            if matches!(self.peek(), TokenKind::Dot) {
                self.advance();
                continue;
            }

            // a chain may continue on the next line with a leading `.`
            let mut offset = 0;
            while matches!(self.peek_at(offset), TokenKind::Newline) {
                offset += 1;
            }
            if offset > 0 && matches!(self.peek_at(offset), TokenKind::Dot) {
                self.pos += offset + 1;
                continue;
            }

            return Ok(Expr::Chain(segments));
        }
    }

    fn args(&mut self) -> Result<Vec<Arg>, SyntaxError> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::RParen) {
                self.advance();
                return Ok(args);
            }

            let named = matches!(
                (self.peek(), self.peek_at(1)),
                (TokenKind::Ident(_), TokenKind::Eq)
            );
            let name = if named {
                let n = self.ident("argument name")?;
                self.advance();
                Some(n)
            } else {
                None
            };
            self.skip_newlines();
            let value = self.expr()?;
            args.push(Arg { name, value });

            self.skip_newlines();
            match self.peek() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {}
                other => {
                    return Err(self.error(format!("expected `,` or `)`, found {}", describe(other))))
                }
            }
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("`{}`", name),
        TokenKind::Str(_) => "string literal".to_string(),
        TokenKind::Int(i) => format!("`{}`", i),
        TokenKind::LParen => "`(`".to_string(),
        TokenKind::RParen => "`)`".to_string(),
        TokenKind::LBrace => "`{`".to_string(),
        TokenKind::RBrace => "`}`".to_string(),
        TokenKind::Lt => "`<`".to_string(),
        TokenKind::Gt => "`>`".to_string(),
        TokenKind::Dot => "`.`".to_string(),
        TokenKind::Comma => "`,`".to_string(),
        TokenKind::Colon => "`:`".to_string(),
        TokenKind::Eq => "`=`".to_string(),
        TokenKind::Semi => "`;`".to_string(),
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Eof => "end of script".to_string(),
    }
}
