use std::mem::discriminant;

use log::info;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone)]
pub enum TokenType {
    // Single-character tokens.
    LEFT_PAREN,
    RIGHT_PAREN,
    LEFT_BRACE,
    RIGHT_BRACE,
    COMMA,
    DOT,
    SEMICOLON,
    COLON,
    QUESTION,
    CARET,

    // One or two character tokens.
    PLUS,
    PLUS_PLUS,
    PLUS_EQUAL,
    MINUS,
    MINUS_MINUS,
    MINUS_EQUAL,
    STAR,
    STAR_EQUAL,
    SLASH,
    SLASH_EQUAL,
    BANG,
    BANG_EQUAL,
    EQUAL,
    EQUAL_EQUAL,
    GREATER,
    GREATER_EQUAL,
    LESS,
    LESS_EQUAL,

    // Literals.
    IDENTIFIER,
    STRING(String),
    NUMBER(f64),

    // Keywords.
    CLASS,
    ELSE,
    EXTENDS,
    FALSE,
    FOR,
    FUNCTION,
    IF,
    LET,
    NEW,
    NONE,
    RETURN,
    SUPER,
    THIS,
    TRUE,
    WHILE,

    // Special characters.
    EOF,
}

/// Token kinds compare by variant only; literal payloads are ignored so the
/// parser can match against `NUMBER(0.0)` / `STRING(String::new())` sentinels.
impl PartialEq for TokenType {
    fn eq(&self, other: &Self) -> bool {
        discriminant(self) == discriminant(other)
    }
}

impl Eq for TokenType {}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,

    /// 1-based source row of the first character of the lexeme.
    pub row: usize,

    /// 1-based source column of the first character of the lexeme.
    pub col: usize,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, row: usize, col: usize) -> Self {
        info!(
            "Creating new token: type={:?}, lexeme={}, pos={}:{}",
            token_type, lexeme, row, col
        );

        Self {
            token_type,
            lexeme,
            row,
            col,
        }
    }
}
