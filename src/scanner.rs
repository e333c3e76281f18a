use std::iter::FusedIterator;

use log::{debug, info};
use phf::phf_map;

use crate::error::LarkError;
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"class" => TokenType::CLASS,
    b"else" => TokenType::ELSE,
    b"extends" => TokenType::EXTENDS,
    b"false" => TokenType::FALSE,
    b"for" => TokenType::FOR,
    b"function" => TokenType::FUNCTION,
    b"if" => TokenType::IF,
    b"let" => TokenType::LET,
    b"new" => TokenType::NEW,
    b"none" => TokenType::NONE,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"while" => TokenType::WHILE,
};

/// Byte-level lexer over a UTF-8 source buffer.
///
/// Implements `Iterator`, yielding one token (or one diagnostic) per call and
/// a single trailing `EOF` token.  Positions are 1-based `(row, col)` of the
/// first byte of each lexeme.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    source: &'a [u8],
    start: usize,
    curr_ptr: usize,
    row: usize,
    col: usize,
    token_row: usize,
    token_col: usize,
    pending_token: Option<TokenType>,
}

impl<'a> Scanner<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        info!("Initializing Scanner with buffer of {} bytes", buf.len());

        Self {
            source: buf,
            start: 0,
            curr_ptr: 0,
            row: 1,
            col: 1,
            token_row: 1,
            token_col: 1,
            pending_token: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    fn scan_token(&mut self) -> Result<(), LarkError> {
        let byte: u8 = self.advance();

        debug!(
            "Processing byte '{}' at {}:{}",
            byte as char, self.token_row, self.token_col
        );

        match byte {
            b'(' => self.add_token(TokenType::LEFT_PAREN),

            b')' => self.add_token(TokenType::RIGHT_PAREN),

            b'{' => self.add_token(TokenType::LEFT_BRACE),

            b'}' => self.add_token(TokenType::RIGHT_BRACE),

            b',' => self.add_token(TokenType::COMMA),

            b'.' => self.add_token(TokenType::DOT),

            b';' => self.add_token(TokenType::SEMICOLON),

            b':' => self.add_token(TokenType::COLON),

            b'?' => self.add_token(TokenType::QUESTION),

            b'^' => self.add_token(TokenType::CARET),

            b'+' => {
                let token_type: TokenType = if self.match_byte(b'+') {
                    TokenType::PLUS_PLUS
                } else if self.match_byte(b'=') {
                    TokenType::PLUS_EQUAL
                } else {
                    TokenType::PLUS
                };

                self.add_token(token_type);
            }

            b'-' => {
                let token_type: TokenType = if self.match_byte(b'-') {
                    TokenType::MINUS_MINUS
                } else if self.match_byte(b'=') {
                    TokenType::MINUS_EQUAL
                } else {
                    TokenType::MINUS
                };

                self.add_token(token_type);
            }

            b'*' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::STAR_EQUAL
                } else {
                    TokenType::STAR
                };

                self.add_token(token_type);
            }

            b'!' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };

                self.add_token(token_type);
            }

            b'=' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };

                self.add_token(token_type);
            }

            b'<' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                };

                self.add_token(token_type);
            }

            b'>' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };

                self.add_token(token_type);
            }

            b' ' | b'\r' | b'\t' | b'\n' => {
                debug!("Skipping whitespace");
            }

            b'/' => {
                if self.match_byte(b'/') {
                    debug!("Found line comment, skipping until newline");

                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_byte(b'*') {
                    debug!("Found block comment");

                    self.skip_block_comment();
                } else if self.match_byte(b'=') {
                    self.add_token(TokenType::SLASH_EQUAL);
                } else {
                    self.add_token(TokenType::SLASH);
                }
            }

            b'#' => {
                debug!("Found '#' comment, skipping until newline");

                while self.peek() != b'\n' && !self.is_at_end() {
                    self.advance();
                }
            }

            b'"' => {
                self.parse_string()?;
            }

            b'0'..=b'9' => {
                self.parse_number();
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            _ => {
                debug!(
                    "Unexpected character '{}' at {}:{}",
                    byte as char, self.token_row, self.token_col
                );

                return Err(LarkError::syntax(
                    self.token_row,
                    self.token_col,
                    format!("unexpected character '{}'", byte as char),
                ));
            }
        }

        Ok(())
    }

    /// Consume a `/* ... */` comment.  An unterminated comment runs to EOF
    /// without a diagnostic.
    fn skip_block_comment(&mut self) {
        while !self.is_at_end() {
            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance();
                self.advance();

                return;
            }

            self.advance();
        }
    }

    fn parse_string(&mut self) -> Result<(), LarkError> {
        debug!(
            "Parsing string literal at {}:{}",
            self.token_row, self.token_col
        );

        // Strings may span lines; advance() keeps row/col current.
        while !self.is_at_end() && self.peek() != b'"' {
            self.advance();
        }

        if self.is_at_end() {
            debug!("Unterminated string at {}:{}", self.token_row, self.token_col);

            return Err(LarkError::syntax(
                self.token_row,
                self.token_col,
                "unterminated string",
            ));
        }

        self.advance();

        // The stored literal excludes the surrounding quotes.
        let parsed_string: String = unsafe {
            String::from_utf8_unchecked(self.source[self.start + 1..self.curr_ptr - 1].to_vec())
        };

        info!("Parsed string literal: {}", parsed_string);

        self.add_token(TokenType::STRING(parsed_string));

        Ok(())
    }

    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A '.' is part of the number only when followed by a digit.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let parsed_number: String =
            unsafe { String::from_utf8_unchecked(self.source[self.start..self.curr_ptr].to_vec()) };

        let number: f64 = parsed_number.parse().unwrap_or(0.0);

        info!("Parsed number: {}", number);

        self.add_token(TokenType::NUMBER(number));
    }

    fn parse_identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        let text: &str =
            unsafe { std::str::from_utf8_unchecked(&self.source[self.start..self.curr_ptr]) };

        match KEYWORDS.get(text.as_bytes()) {
            Some(token_type) => {
                info!("Parsed keyword: {}", text);

                self.add_token(token_type.clone());
            }

            None => {
                info!("Parsed identifier: {}", text);

                self.add_token(TokenType::IDENTIFIER);
            }
        }
    }

    #[inline]
    fn add_token(&mut self, token_type: TokenType) {
        self.pending_token = Some(token_type);
    }

    #[inline]
    fn advance(&mut self) -> u8 {
        let byte = self.source[self.curr_ptr];

        self.curr_ptr += 1;

        if byte == b'\n' {
            self.row += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }

        byte
    }

    #[inline]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.curr_ptr] != expected {
            false
        } else {
            self.advance();

            true
        }
    }

    #[inline]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.curr_ptr]
        }
    }

    #[inline]
    fn peek_next(&self) -> u8 {
        if self.curr_ptr + 1 >= self.len() {
            0
        } else {
            self.source[self.curr_ptr + 1]
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.curr_ptr >= self.len()
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, LarkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_at_end() {
                if self.curr_ptr == self.len() {
                    self.curr_ptr += 1;

                    info!("Reached EOF at {}:{}", self.row, self.col);

                    return Some(Ok(Token::new(
                        TokenType::EOF,
                        "".to_string(),
                        self.row,
                        self.col,
                    )));
                }

                debug!("Iterator fully consumed");

                return None;
            }

            self.pending_token = None;

            self.start = self.curr_ptr;
            self.token_row = self.row;
            self.token_col = self.col;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some(token_type) = self.pending_token.take() {
                let lexeme: &str = unsafe {
                    std::str::from_utf8_unchecked(&self.source[self.start..self.curr_ptr])
                };

                info!(
                    "Emitting token: type={:?}, lexeme={}, pos={}:{}",
                    token_type, lexeme, self.token_row, self.token_col
                );

                return Some(Ok(Token::new(
                    token_type,
                    lexeme.to_string(),
                    self.token_row,
                    self.token_col,
                )));
            }

            // Whitespace or a comment; keep scanning.
        }
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
