//! Lexer - turns MathLang source into a lazy stream of tokens
//!
//! Token classes are tried in declaration order against the text at the
//! current position; the first pattern that matches wins. Keywords are
//! declared before the identifier pattern, so `print` is a keyword while
//! `printer` (no word boundary after the keyword) is an identifier.
//!
//! Whitespace, newlines and `#` comments are recognised but never yielded.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::token::{Token, TokenKind};

/// Longest prefix of the unmatched text echoed back in errors
const ERROR_CONTEXT_CHARS: usize = 16;

/// Lexing failure: nothing matches at the current position
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("Unrecognised input '{text}' at line {line}")]
    NoMatch { text: String, line: u32 },
}

impl LexError {
    pub fn line(&self) -> u32 {
        match self {
            LexError::NoMatch { line, .. } => *line,
        }
    }
}

fn rule(kind: TokenKind, pattern: &str) -> (TokenKind, Regex) {
    (kind, Regex::new(&format!("^(?i:{})", pattern)).unwrap())
}

/// Master token-pattern list, in priority order
static TOKEN_RULES: LazyLock<Vec<(TokenKind, Regex)>> = LazyLock::new(|| {
    vec![
        // Strings: quote pair, no escapes, single line
        rule(TokenKind::StringLiteral, r#""[^"\r\n]*""#),
        // Reserved keywords
        rule(TokenKind::Print, r"print\b"),
        rule(TokenKind::Plot, r"plot\b"),
        rule(TokenKind::Solve, r"solve\b"),
        rule(TokenKind::If, r"if\b"),
        rule(TokenKind::Else, r"else\b"),
        rule(TokenKind::While, r"while\b"),
        rule(TokenKind::As, r"as\b"),
        rule(TokenKind::Integer, r"integer\b"),
        rule(TokenKind::Rational, r"rational\b"),
        rule(TokenKind::Real, r"real\b"),
        rule(TokenKind::Complex, r"complex\b"),
        rule(TokenKind::String, r"string\b"),
        rule(TokenKind::In, r"in\b"),
        // Identifiers, at most 64 characters
        rule(TokenKind::Id, r"[_a-z][_a-z0-9]{0,63}"),
        // Numbers: no sign, no exponent
        rule(TokenKind::Number, r"[0-9]+(?:\.[0-9]+)?"),
        // Special symbols
        rule(TokenKind::LParen, r"\("),
        rule(TokenKind::RParen, r"\)"),
        rule(TokenKind::LCurly, r"\{"),
        rule(TokenKind::RCurly, r"\}"),
        rule(TokenKind::Semicolon, r";"),
        rule(TokenKind::Comma, r","),
        // Comparison operators
        rule(TokenKind::Eq, r"=="),
        rule(TokenKind::Neq, r"!="),
        rule(TokenKind::Lte, r"<="),
        rule(TokenKind::Gte, r">="),
        rule(TokenKind::Lt, r"<"),
        rule(TokenKind::Gt, r">"),
        // Operators
        rule(TokenKind::Plus, r"\+"),
        rule(TokenKind::Minus, r"-"),
        rule(TokenKind::Times, r"\*"),
        rule(TokenKind::Divide, r"/"),
        rule(TokenKind::Carat, r"\^"),
        rule(TokenKind::Equal, r"="),
    ]
});

#[derive(Clone, Copy, PartialEq, Eq)]
enum Skip {
    Newline,
    Blank,
    Comment,
}

static SKIP_RULES: LazyLock<Vec<(Skip, Regex)>> = LazyLock::new(|| {
    [
        (Skip::Newline, r"^(?:\r\n|\r|\n)"),
        (Skip::Blank, r"^[ \t]+"),
        (Skip::Comment, r"^#[^\r\n]*"),
    ]
    .into_iter()
    .map(|(skip, pattern)| (skip, Regex::new(pattern).unwrap()))
    .collect()
});

/// Lazy, non-restartable token stream over one source string.
///
/// Yields `Ok(token)` until the input is exhausted, or a single `Err` at the
/// first unrecognised character sequence, after which the stream is fused.
pub struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    line: u32,
    done: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            done: false,
        }
    }

    /// Current 1-based line number
    pub fn line(&self) -> u32 {
        self.line
    }

    fn skip_ignored(&mut self) {
        'outer: loop {
            let rest = &self.source[self.pos..];
            for (skip, re) in SKIP_RULES.iter() {
                if let Some(m) = re.find(rest) {
                    if *skip == Skip::Newline {
                        self.line += 1;
                    }
                    self.pos += m.end();
                    continue 'outer;
                }
            }
            break;
        }
    }

    fn no_match(&self) -> LexError {
        let text: String = self.source[self.pos..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .take(ERROR_CONTEXT_CHARS)
            .collect();
        LexError::NoMatch {
            text,
            line: self.line,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.skip_ignored();
        let rest = &self.source[self.pos..];
        if rest.is_empty() {
            self.done = true;
            return None;
        }

        for (kind, re) in TOKEN_RULES.iter() {
            if let Some(m) = re.find(rest) {
                self.pos += m.end();
                return Some(Ok(Token::new(*kind, m.as_str(), self.line)));
            }
        }

        self.done = true;
        Some(Err(self.no_match()))
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

/// Lex a whole source string eagerly
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}

/// Signature of a source: space-joined `KIND:text` pairs.
///
/// Only tokens contribute, so two sources differing in comments or layout
/// share a signature.
pub fn source_signature(source: &str) -> Result<String, LexError> {
    let tokens = lex(source)?;
    Ok(tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" "))
}
