//! Tokenizer for build scripts

use gradle_composer_core::SyntaxError;

/// Token kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Int(i64),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Lt,
    Gt,
    Dot,
    Comma,
    Colon,
    Eq,
    Semi,
    Newline,
    Eof,
}

/// Token with its source position (1-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Character-level scanner
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Lexer over `src`
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input, ending with `Eof`
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line,
            column,
            message: message.into(),
        }
    }

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        loop {
            match self.chars.peek().copied() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some('/') => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    match self.chars.peek() {
                        Some('/') => {
                            while let Some(&c) = self.chars.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.block_comment(line, column)?;
                        }
                        _ => return Err(self.error(line, column, "unexpected `/`")),
                    }
                }
                _ => break,
            }
        }

        let (line, column) = (self.line, self.column);
        let token = |kind| Token { kind, line, column };

        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(token(TokenKind::Eof)),
        };

        let kind = match c {
            '\n' => TokenKind::Newline,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '=' => TokenKind::Eq,
            ';' => TokenKind::Semi,
            '"' => TokenKind::Str(self.string(line, column)?),
            c if c.is_ascii_digit() => TokenKind::Int(self.number(c, line, column)?),
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some(&c) = self.chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                TokenKind::Ident(ident)
            }
            other => return Err(self.error(line, column, format!("unexpected character `{}`", other))),
        };

        Ok(token(kind))
    }

    fn block_comment(&mut self, line: usize, column: usize) -> Result<(), SyntaxError> {
        while let Some(c) = self.bump() {
            if c == '*' && self.chars.peek() == Some(&'/') {
                self.bump();
                return Ok(());
            }
        }
        Err(self.error(line, column, "unterminated block comment"))
    }

    fn string(&mut self, line: usize, column: usize) -> Result<String, SyntaxError> {
        // `"` already consumed; a second quote is either `""` or the start of `"""`
        if self.chars.peek() == Some(&'"') {
            self.bump();
            if self.chars.peek() == Some(&'"') {
                self.bump();
                return self.raw_string(line, column);
            }
            return Ok(String::new());
        }

        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(c @ ('"' | '\\' | '$' | '\'')) => value.push(c),
                    Some(c) => {
                        return Err(self.error(self.line, self.column, format!("unknown escape `\\{}`", c)))
                    }
                    None => break,
                },
                Some('\n') | None => break,
                Some(c) => value.push(c),
            }
        }
        Err(self.error(line, column, "unterminated string literal"))
    }

    fn raw_string(&mut self, line: usize, column: usize) -> Result<String, SyntaxError> {
        let mut value = String::new();
        while let Some(c) = self.bump() {
            value.push(c);
            if value.ends_with("\"\"\"") {
                value.truncate(value.len() - 3);
                return Ok(value);
            }
        }
        Err(self.error(line, column, "unterminated raw string literal"))
    }

    fn number(&mut self, first: char, line: usize, column: usize) -> Result<i64, SyntaxError> {
        let mut digits = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else if c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        if self.chars.peek() == Some(&'L') {
            self.bump();
        }
        digits
            .parse()
            .map_err(|_| self.error(line, column, format!("integer `{}` out of range", digits)))
    }
}
