// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Trivia-preserving C# lexer.
//!
//! [`tokenize`] splits source text into a flat token stream that covers every
//! byte of the input: concatenating the token texts reproduces the source
//! exactly. Whitespace, newlines, comments and preprocessor lines are kept as
//! trivia tokens so rewriters can leave them untouched.
//!
//! The lexer knows enough C# to never mistake the inside of a literal for
//! code: regular, verbatim (`@"..."`), interpolated (`$"..."`, `$@"..."`) and
//! raw (`"""..."""`) strings, character literals and block comments. It does
//! not distinguish keywords from identifiers; that is left to the syntax
//! layer.
//!
//! Punctuation is one character per token except `::` and `=>`. In
//! particular `>>` lexes as two `>` tokens so nested generic argument lists
//! close naturally.

use migtool_core::patch::Span;
use thiserror::Error;

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier or keyword, including verbatim `@name` forms.
    Identifier,
    Number,
    String,
    Char,
    Punct,
    Whitespace,
    Newline,
    Comment,
    /// A whole `#...` directive line.
    Preprocessor,
}

impl TokenKind {
    /// True for tokens that carry no syntax.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment | TokenKind::Preprocessor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// 1-indexed line of the first byte.
    pub line: u32,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct LexError {
    pub message: String,
    pub line: u32,
}

/// Split `source` into tokens, trivia included.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        line: 1,
        line_has_code: false,
    };
    let mut tokens = Vec::new();
    while lexer.pos < source.len() {
        let start = lexer.pos;
        let line = lexer.line;
        let kind = lexer.next_kind()?;
        if !kind.is_trivia() {
            lexer.line_has_code = true;
        }
        if kind == TokenKind::Newline {
            lexer.line_has_code = false;
        }
        tokens.push(Token {
            kind,
            span: Span::new(start, lexer.pos),
            line,
        });
    }
    Ok(tokens)
}

// ============================================================================
// Lexer
// ============================================================================

struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    line: u32,
    /// A non-trivia token has been seen on the current line.
    line_has_code: bool,
}

impl Lexer<'_> {
    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn current_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn error(&self, message: &str, line: u32) -> LexError {
        LexError {
            message: message.to_string(),
            line,
        }
    }

    /// Advance one character, counting newlines.
    fn bump(&mut self) {
        if let Some(c) = self.current_char() {
            if c == '\n' {
                self.line += 1;
            }
            self.pos += c.len_utf8();
        }
    }

    fn next_kind(&mut self) -> Result<TokenKind, LexError> {
        let Some(c) = self.current_char() else {
            return Ok(TokenKind::Whitespace);
        };
        let line = self.line;
        let kind = match c {
            '\n' => {
                self.bump();
                TokenKind::Newline
            }
            '\r' if self.peek(1) == Some(b'\n') => {
                self.pos += 1;
                self.bump();
                TokenKind::Newline
            }
            c if c.is_whitespace() || c == '\u{feff}' => {
                while let Some(c) = self.current_char() {
                    if c == '\n' || (c == '\r' && self.peek(1) == Some(b'\n')) {
                        break;
                    }
                    if !(c.is_whitespace() || c == '\u{feff}') {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
                TokenKind::Whitespace
            }
            '/' if self.peek(1) == Some(b'/') => {
                self.skip_to_line_end();
                TokenKind::Comment
            }
            '/' if self.peek(1) == Some(b'*') => {
                self.pos += 2;
                loop {
                    if self.pos >= self.bytes.len() {
                        return Err(self.error("unterminated block comment", line));
                    }
                    if self.peek(0) == Some(b'*') && self.peek(1) == Some(b'/') {
                        self.pos += 2;
                        break;
                    }
                    self.bump();
                }
                TokenKind::Comment
            }
            '#' if !self.line_has_code => {
                self.skip_to_line_end();
                TokenKind::Preprocessor
            }
            '"' => {
                self.scan_string(false, false)?;
                TokenKind::String
            }
            '@' if self.peek(1) == Some(b'"') => {
                self.pos += 1;
                self.scan_string(true, false)?;
                TokenKind::String
            }
            '@' if self.peek(1) == Some(b'$') => {
                self.pos += 2;
                if self.peek(0) != Some(b'"') {
                    return Err(self.error("expected '\"' after '@$'", line));
                }
                self.scan_string(true, true)?;
                TokenKind::String
            }
            '$' => {
                self.scan_interpolated()?;
                TokenKind::String
            }
            '\'' => {
                self.scan_char()?;
                TokenKind::Char
            }
            '@' if self.source[self.pos + 1..]
                .chars()
                .next()
                .is_some_and(is_identifier_start) =>
            {
                self.pos += 1;
                self.scan_identifier();
                TokenKind::Identifier
            }
            c if is_identifier_start(c) => {
                self.scan_identifier();
                TokenKind::Identifier
            }
            c if c.is_ascii_digit() => {
                self.scan_number();
                TokenKind::Number
            }
            '.' if self.peek(1).is_some_and(|b| b.is_ascii_digit()) => {
                self.scan_number();
                TokenKind::Number
            }
            ':' if self.peek(1) == Some(b':') => {
                self.pos += 2;
                TokenKind::Punct
            }
            '=' if self.peek(1) == Some(b'>') => {
                self.pos += 2;
                TokenKind::Punct
            }
            c => {
                self.pos += c.len_utf8();
                TokenKind::Punct
            }
        };
        Ok(kind)
    }

    /// Stop before the line terminator (`\n` or `\r\n`).
    fn skip_to_line_end(&mut self) {
        while let Some(b) = self.peek(0) {
            if b == b'\n' || (b == b'\r' && self.peek(1) == Some(b'\n')) {
                break;
            }
            self.bump();
        }
    }

    fn scan_identifier(&mut self) {
        while let Some(c) = self.current_char() {
            if c == '_' || c.is_alphanumeric() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn scan_number(&mut self) {
        while let Some(b) = self.peek(0) {
            let continues = b.is_ascii_alphanumeric()
                || b == b'_'
                || (b == b'.' && self.peek(1).is_some_and(|n| n.is_ascii_digit()));
            if !continues {
                break;
            }
            self.pos += 1;
        }
    }

    fn scan_char(&mut self) -> Result<(), LexError> {
        let line = self.line;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None | Some(b'\n') => {
                    return Err(self.error("unterminated character literal", line));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    if self.peek(0).is_some_and(|b| b != b'\n') {
                        self.bump();
                    }
                }
                Some(b'\'') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.bump(),
            }
        }
    }

    /// `$"..."`, `$@"..."` and raw `$$"""..."""` forms, positioned at the first `$`.
    fn scan_interpolated(&mut self) -> Result<(), LexError> {
        let line = self.line;
        while self.peek(0) == Some(b'$') {
            self.pos += 1;
        }
        let verbatim = self.peek(0) == Some(b'@');
        if verbatim {
            self.pos += 1;
        }
        if self.peek(0) != Some(b'"') {
            return Err(self.error("expected '\"' after '$'", line));
        }
        self.scan_string(verbatim, true)
    }

    /// Scan a string literal positioned at its opening quote.
    fn scan_string(&mut self, verbatim: bool, interpolated: bool) -> Result<(), LexError> {
        let line = self.line;
        let quotes = self.bytes[self.pos..]
            .iter()
            .take_while(|&&b| b == b'"')
            .count();
        if quotes >= 3 && !verbatim {
            return self.scan_raw_string(quotes, line);
        }
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => return Err(self.error("unterminated string literal", line)),
                Some(b'\n') if !verbatim => {
                    return Err(self.error("unterminated string literal", line));
                }
                Some(b'\\') if !verbatim => {
                    self.pos += 1;
                    if self.peek(0).is_some_and(|b| b != b'\n') {
                        self.bump();
                    }
                }
                Some(b'"') => {
                    if verbatim && self.peek(1) == Some(b'"') {
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                Some(b'{') if interpolated => {
                    if self.peek(1) == Some(b'{') {
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        self.scan_hole()?;
                    }
                }
                Some(_) => self.bump(),
            }
        }
    }

    fn scan_raw_string(&mut self, quotes: usize, line: u32) -> Result<(), LexError> {
        self.pos += quotes;
        loop {
            match self.peek(0) {
                None => return Err(self.error("unterminated raw string literal", line)),
                Some(b'"') => {
                    let run = self.bytes[self.pos..]
                        .iter()
                        .take_while(|&&b| b == b'"')
                        .count();
                    self.pos += run;
                    if run >= quotes {
                        return Ok(());
                    }
                }
                Some(_) => self.bump(),
            }
        }
    }

    /// Scan an interpolation hole up to its closing `}`, positioned just past `{`.
    fn scan_hole(&mut self) -> Result<(), LexError> {
        let line = self.line;
        let mut depth = 1usize;
        loop {
            match self.peek(0) {
                None => return Err(self.error("unterminated interpolation hole", line)),
                Some(b'{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b'}') => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(b'"') => self.scan_string(false, false)?,
                Some(b'@') if self.peek(1) == Some(b'"') => {
                    self.pos += 1;
                    self.scan_string(true, false)?;
                }
                Some(b'$') => self.scan_interpolated()?,
                Some(b'\'') => self.scan_char()?,
                Some(_) => self.bump(),
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}
