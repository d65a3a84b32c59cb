//! Token types produced by the lexer

use std::fmt;

/// Token kinds, a closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    StringLiteral,
    Number,
    Id,

    // Keywords
    Print,
    Plot,
    Solve,
    If,
    Else,
    While,
    As,
    In,
    Integer,
    Rational,
    Real,
    Complex,
    String,

    // Punctuation
    LParen,
    RParen,
    LCurly,
    RCurly,
    Semicolon,
    Comma,

    // Comparison operators
    Eq,
    Neq,
    Lte,
    Gte,
    Lt,
    Gt,

    // Operators
    Plus,
    Minus,
    Times,
    Divide,
    Carat,
    Equal,

    /// End of the token stream
    Eof,
}

impl TokenKind {
    /// Upper-case token name, as used in source signatures
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::StringLiteral => "STRING_LITERAL",
            TokenKind::Number => "NUMBER",
            TokenKind::Id => "ID",
            TokenKind::Print => "PRINT",
            TokenKind::Plot => "PLOT",
            TokenKind::Solve => "SOLVE",
            TokenKind::If => "IF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::As => "AS",
            TokenKind::In => "IN",
            TokenKind::Integer => "INTEGER",
            TokenKind::Rational => "RATIONAL",
            TokenKind::Real => "REAL",
            TokenKind::Complex => "COMPLEX",
            TokenKind::String => "STRING",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LCurly => "LCURLY",
            TokenKind::RCurly => "RCURLY",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Comma => "COMMA",
            TokenKind::Eq => "EQ",
            TokenKind::Neq => "NEQ",
            TokenKind::Lte => "LTE",
            TokenKind::Gte => "GTE",
            TokenKind::Lt => "LT",
            TokenKind::Gt => "GT",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Times => "TIMES",
            TokenKind::Divide => "DIVIDE",
            TokenKind::Carat => "CARAT",
            TokenKind::Equal => "EQUAL",
            TokenKind::Eof => "$end",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lexed token. `text` is the exact source slice, `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    /// End-of-stream marker positioned at `line`
    pub fn eof(line: u32) -> Self {
        Self::new(TokenKind::Eof, "", line)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.text)
    }
}
