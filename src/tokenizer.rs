//! Lexical analyzer for the Jack language.
//!
//! The tokenizer is pull-based: each [`Tokenizer::advance`] call scans one
//! token, and `current()` returns `None` once the input is exhausted. The
//! start position of the previous token is retained so the engine can point
//! a diagnostic at a token it has already consumed.

use crate::error::CompileError;
use crate::token::{Keyword, Span, SpannedToken, Token, is_symbol};

/// Highest value a Jack integer constant may take.
const MAX_INT: u32 = 32767;

/// Jack language tokenizer.
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    byte_offset: usize,
    line: usize,
    column: usize,
    current: Option<SpannedToken>,
    /// Start position of the current token, or of EOF.
    span: Span,
    /// Start position of the token consumed before the current one.
    prev_span: Span,
}

impl Tokenizer {
    /// Create a tokenizer over the given source. No token is available
    /// until the first `advance()`.
    pub fn new(input: &str) -> Self {
        let origin = Span::new(0, 0, 1, 1);
        Self {
            chars: input.chars().collect(),
            pos: 0,
            byte_offset: 0,
            line: 1,
            column: 1,
            current: None,
            span: origin,
            prev_span: origin,
        }
    }

    /// Scan the next token. At end of input the current token becomes
    /// `None` and stays that way.
    pub fn advance(&mut self) -> Result<(), CompileError> {
        self.prev_span = self.span;
        self.skip_whitespace_and_comments()?;

        let start = self.here();
        let Some(c) = self.peek() else {
            self.span = start;
            self.current = None;
            return Ok(());
        };

        let token = if is_symbol(c) {
            self.bump();
            Token::Symbol(c)
        } else if c.is_ascii_digit() {
            self.read_integer(start)?
        } else if c == '"' {
            self.read_string(start)?
        } else if c.is_ascii_alphabetic() || c == '_' {
            self.read_word()
        } else {
            self.bump();
            return Err(CompileError::lexical(
                self.finish_span(start),
                format!("unrecognized character '{}'", c),
            ));
        };

        let span = self.finish_span(start);
        self.span = span;
        self.current = Some(SpannedToken::new(token, span));
        Ok(())
    }

    /// The current token, or `None` at end of input.
    pub fn current(&self) -> Option<&SpannedToken> {
        self.current.as_ref()
    }

    /// Start position of the current token (the EOF position once the
    /// input is exhausted).
    pub fn span(&self) -> Span {
        self.span
    }

    /// Start position of the previously consumed token.
    pub fn prev_span(&self) -> Span {
        self.prev_span
    }

    fn here(&self) -> Span {
        Span::new(self.byte_offset, self.byte_offset, self.line, self.column)
    }

    fn finish_span(&self, start: Span) -> Span {
        Span::new(start.start, self.byte_offset, start.line, start.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    /// Consume one character, tracking line and column.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        self.byte_offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), CompileError> {
        loop {
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    self.bump();
                } else {
                    break;
                }
            }

            if self.peek() == Some('/') {
                if self.peek_next() == Some('/') {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                    continue;
                }
                if self.peek_next() == Some('*') {
                    // Errors point at the `/*`, not at EOF.
                    let start = self.here();
                    self.bump();
                    self.bump();
                    loop {
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.bump();
                            self.bump();
                            break;
                        }
                        if self.bump().is_none() {
                            return Err(CompileError::lexical(
                                start,
                                "unclosed block comment",
                            ));
                        }
                    }
                    continue;
                }
            }

            return Ok(());
        }
    }

    fn read_integer(&mut self, start: Span) -> Result<Token, CompileError> {
        let mut value: u32 = 0;
        while let Some(c) = self.peek() {
            let Some(digit) = c.to_digit(10) else { break };
            self.bump();
            value = value.saturating_mul(10).saturating_add(digit);
        }

        if value > MAX_INT {
            return Err(CompileError::lexical(
                self.finish_span(start),
                format!("integer constant exceeds maximum value {}", MAX_INT),
            ));
        }
        Ok(Token::IntegerConstant(value as u16))
    }

    /// String constants live on a single line and have no escapes.
    fn read_string(&mut self, start: Span) -> Result<Token, CompileError> {
        self.bump(); // opening quote

        let mut value = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.bump();
                    return Ok(Token::StringConstant(value));
                }
                Some('\n') | None => {
                    return Err(CompileError::lexical(start, "unclosed string constant"));
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
    }

    fn read_word(&mut self) -> Token {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                value.push(c);
                self.bump();
            } else {
                break;
            }
        }

        match Keyword::parse_keyword(&value) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(value),
        }
    }
}
