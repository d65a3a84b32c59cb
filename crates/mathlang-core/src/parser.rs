//! Recursive-descent parser for MathLang
//!
//! Pulls tokens lazily from the [`Lexer`] with one token of lookahead and
//! builds a [`Program`]. The parser owns the symbol table for its run:
//! assignment and input targets are declared once their statement has been
//! parsed, and every other name must already be declared.
//!
//! ## Precedence (loosest first)
//!
//! ```text
//! AS cast  >  comparison  >  + -  >  * /  >  unary + -  >  ^  >  primary
//! ```
//!
//! Everything is left-associative except `^`.
//!
//! ## Depth
//!
//! Every tree the parser returns satisfies `program.depth() <= MAX_DEPTH`,
//! operator chains included. Parentheses add no nodes but still count
//! against the same limit while they are being parsed.

use thiserror::Error;
use tracing::debug;

use crate::ast::*;
use crate::interrupt::{Interrupt, Interrupted};
use crate::lexer::{LexError, Lexer};
use crate::symbols::SymbolTable;
use crate::token::{Token, TokenKind};

/// Deepest tree accepted, counted in nodes below the program root.
///
/// A record for a node at level `n` nests at most `3n + 2` JSON containers
/// deep, so 40 keeps every serialized tree inside serde_json's default
/// recursion limit of 128.
pub const MAX_DEPTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Invalid token: '{text}' at line {line}")]
    InvalidToken { text: String, line: u32 },

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Undefined name '{name}' at line {line}")]
    UndefinedName { name: String, line: u32 },

    #[error("Nesting too deep at line {line}")]
    NestingTooDeep { line: u32 },

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl ParseError {
    /// Line the error points at, when it has one
    pub fn line(&self) -> Option<u32> {
        match self {
            ParseError::Lex(e) => Some(e.line()),
            ParseError::InvalidToken { line, .. }
            | ParseError::UndefinedName { line, .. }
            | ParseError::NestingTooDeep { line } => Some(*line),
            ParseError::UnexpectedEof | ParseError::Interrupted(_) => None,
        }
    }
}

/// Result of a successful parse
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub program: Program,
    pub symbols: SymbolTable,
}

// ============================================================================
// Public API
// ============================================================================

/// Parse MathLang source into a program plus the symbol table built on the way
pub fn parse(source: &str) -> Result<Parsed, ParseError> {
    parse_with(source, &Interrupt::new())
}

/// Parse, checking `interrupt` before every statement
pub fn parse_with(source: &str, interrupt: &Interrupt) -> Result<Parsed, ParseError> {
    let mut parser = Parser::new(source, interrupt)?;
    let program = parser.program()?;
    debug!(
        statements = program.statements.len(),
        symbols = parser.symbols.len(),
        "parsed program"
    );
    Ok(Parsed {
        program,
        symbols: parser.symbols,
    })
}

/// Parse MathLang source, keeping only the AST
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    parse(source).map(|parsed| parsed.program)
}

// ============================================================================
// Parser state
// ============================================================================

struct Parser<'src, 'i> {
    tokens: Lexer<'src>,
    current: Token,
    symbols: SymbolTable,
    interrupt: &'i Interrupt,
    /// Open blocks, parentheses and signs on the call stack
    depth: usize,
    /// Tree level of the statement being parsed
    level: usize,
}

/// Expression under construction, with its height in nodes
struct Node {
    expr: Expr,
    height: usize,
}

impl<'src, 'i> Parser<'src, 'i> {
    fn new(source: &'src str, interrupt: &'i Interrupt) -> Result<Self, ParseError> {
        let mut tokens = Lexer::new(source);
        let current = pull(&mut tokens)?;
        Ok(Self {
            tokens,
            current,
            symbols: SymbolTable::new(),
            interrupt,
            depth: 0,
            level: 1,
        })
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Consume the lookahead and return it
    fn bump(&mut self) -> Result<Token, ParseError> {
        let next = pull(&mut self.tokens)?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            self.bump()
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ParseError {
        if self.current.is_eof() {
            ParseError::UnexpectedEof
        } else {
            ParseError::InvalidToken {
                text: self.current.text.clone(),
                line: self.current.line,
            }
        }
    }

    fn too_deep(&self) -> ParseError {
        ParseError::NestingTooDeep {
            line: self.current.line,
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Wrap `expr` as a node one level above its tallest child
    fn node(&self, expr: Expr, child_height: usize) -> Result<Node, ParseError> {
        let height = child_height + 1;
        if self.level + height > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(Node { expr, height })
    }

    fn leaf(&self, expr: Expr) -> Result<Node, ParseError> {
        self.node(expr, 0)
    }

    fn join(
        &self,
        left: Node,
        right: Node,
        build: impl FnOnce(Expr, Expr) -> Expr,
    ) -> Result<Node, ParseError> {
        let height = left.height.max(right.height);
        self.node(build(left.expr, right.expr), height)
    }

    fn wrap(&self, inner: Node, build: impl FnOnce(Expr) -> Expr) -> Result<Node, ParseError> {
        let height = inner.height;
        self.node(build(inner.expr), height)
    }

    fn require_declared(&self, token: &Token) -> Result<(), ParseError> {
        if self.symbols.contains(&token.text) {
            Ok(())
        } else {
            Err(ParseError::UndefinedName {
                name: token.text.clone(),
                line: token.line,
            })
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn program(&mut self) -> Result<Program, ParseError> {
        let mut statements = vec![self.statement()?];
        while !self.current.is_eof() {
            statements.push(self.statement()?);
        }
        Ok(Program::new(statements))
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        self.interrupt.check()?;
        match self.current.kind {
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            _ => {
                let stmt = self.simple_statement()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(stmt)
            }
        }
    }

    fn simple_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current.kind {
            TokenKind::Id => {
                let target = self.bump()?;
                self.expect(TokenKind::Equal)?;
                let expr = self.padded_expression()?.expr;
                self.symbols.declare(&target.text);
                Ok(Stmt::Assignment {
                    name: target.text,
                    expr,
                })
            }
            TokenKind::Print => {
                self.bump()?;
                Ok(Stmt::Print {
                    args: self.arguments()?,
                })
            }
            TokenKind::Plot => {
                self.bump()?;
                Ok(Stmt::Plot {
                    args: self.arguments()?,
                })
            }
            TokenKind::In => self.input_statement(),
            _ => Err(self.unexpected()),
        }
    }

    fn input_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::In)?;
        let prompt = if self.at(TokenKind::Gt) {
            None
        } else {
            Some(self.prompt()?.expr)
        };
        self.expect(TokenKind::Gt)?;
        let target = self.expect(TokenKind::Id)?;
        let cast = if self.at(TokenKind::As) {
            self.bump()?;
            Some(self.cast_type()?)
        } else {
            None
        };
        self.symbols.declare(&target.text);
        Ok(Stmt::Input {
            name: target.text,
            prompt,
            cast,
        })
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::If)?;
        let condition = self.condition()?;
        let then_block = self.block()?;
        let else_block = if self.at(TokenKind::Else) {
            self.bump()?;
            Some(self.block()?)
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::While)?;
        let condition = self.condition()?;
        let body = self.block()?;
        Ok(Stmt::While { condition, body })
    }

    fn condition(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LParen)?;
        let condition = self.expression()?;
        self.expect(TokenKind::RParen)?;
        Ok(condition.expr)
    }

    /// A single statement, or `{ stmt+ }`
    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.enter()?;
        self.level += 1;
        if self.level > MAX_DEPTH {
            return Err(self.too_deep());
        }
        let block = if self.at(TokenKind::LCurly) {
            self.bump()?;
            let mut statements = vec![self.statement()?];
            while !self.at(TokenKind::RCurly) {
                statements.push(self.statement()?);
            }
            self.bump()?;
            statements
        } else {
            vec![self.statement()?]
        };
        self.level -= 1;
        self.leave();
        Ok(block)
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = vec![self.expression()?.expr];
        while self.at(TokenKind::Comma) {
            self.bump()?;
            args.push(self.expression()?.expr);
        }
        Ok(args)
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    /// Expression where `, expr` after a string operand pads-and-joins
    fn padded_expression(&mut self) -> Result<Node, ParseError> {
        let mut node = self.expression()?;
        while node.expr.is_string() && self.at(TokenKind::Comma) {
            self.bump()?;
            let right = self.expression()?;
            node = self.join(node, right, |l, r| Expr::concat(l, r, true))?;
        }
        Ok(node)
    }

    /// Input prompt: sums joined by padded commas, stopping before `>`
    fn prompt(&mut self) -> Result<Node, ParseError> {
        let mut prompt = self.sum()?;
        while self.at(TokenKind::Comma) {
            self.bump()?;
            let right = self.sum()?;
            prompt = self.join(prompt, right, |l, r| Expr::concat(l, r, true))?;
        }
        Ok(prompt)
    }

    fn expression(&mut self) -> Result<Node, ParseError> {
        self.enter()?;
        let mut node = if self.at(TokenKind::Solve) {
            self.solve()?
        } else {
            self.comparison()?
        };
        if self.at(TokenKind::As) {
            self.bump()?;
            let to = self.cast_type()?;
            node = self.wrap(node, |e| Expr::cast(e, to))?;
        }
        self.leave();
        Ok(node)
    }

    fn solve(&mut self) -> Result<Node, ParseError> {
        self.expect(TokenKind::Solve)?;
        let target = self.sum()?;
        let domain = if self.at(TokenKind::In) || self.at(TokenKind::As) {
            self.bump()?;
            self.domain()?
        } else {
            Domain::default()
        };
        self.wrap(target, |e| Expr::solve(e, domain))
    }

    fn comparison(&mut self) -> Result<Node, ParseError> {
        let mut left = self.sum()?;
        while let Some(op) = compare_op(self.current.kind) {
            self.bump()?;
            let right = self.sum()?;
            left = self.join(left, right, |l, r| Expr::comparison(l, op, r))?;
        }
        Ok(left)
    }

    fn sum(&mut self) -> Result<Node, ParseError> {
        let mut left = self.term()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            self.bump()?;
            let right = self.term()?;
            let concat = op == ArithOp::Add && (left.expr.is_string() || right.expr.is_string());
            left = self.join(left, right, |l, r| {
                if concat {
                    Expr::concat(l, r, false)
                } else {
                    Expr::binary(l, op, r)
                }
            })?;
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Node, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Times => ArithOp::Mul,
                TokenKind::Divide => ArithOp::Div,
                _ => break,
            };
            self.bump()?;
            let right = self.unary()?;
            left = self.join(left, right, |l, r| Expr::binary(l, op, r))?;
        }
        Ok(left)
    }

    /// Unary sign, lowered to `0 op operand`
    fn unary(&mut self) -> Result<Node, ParseError> {
        let op = match self.current.kind {
            TokenKind::Plus => ArithOp::Add,
            TokenKind::Minus => ArithOp::Sub,
            _ => return self.power(),
        };
        self.bump()?;
        self.enter()?;
        let operand = self.unary()?;
        self.leave();
        let zero = self.leaf(Expr::number("0"))?;
        self.join(zero, operand, |l, r| Expr::binary(l, op, r))
    }

    fn power(&mut self) -> Result<Node, ParseError> {
        let base = self.primary()?;
        if self.at(TokenKind::Carat) {
            self.bump()?;
            self.enter()?;
            let exponent = self.unary()?;
            self.leave();
            return self.join(base, exponent, |l, r| Expr::binary(l, ArithOp::Pow, r));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, ParseError> {
        match self.current.kind {
            TokenKind::Number => {
                let token = self.bump()?;
                self.leaf(Expr::Number(token.text))
            }
            TokenKind::StringLiteral => {
                let token = self.bump()?;
                self.leaf(Expr::Text(unquote(&token.text).to_string()))
            }
            TokenKind::Id => {
                let name = self.bump()?;
                self.require_declared(&name)?;
                if self.at(TokenKind::LParen) {
                    self.bump()?;
                    let arg = self.expression()?;
                    self.expect(TokenKind::RParen)?;
                    self.wrap(arg, |e| Expr::evaluation(name.text, e))
                } else {
                    self.leaf(Expr::Name(name.text))
                }
            }
            TokenKind::LParen => {
                self.bump()?;
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn cast_type(&mut self) -> Result<CastType, ParseError> {
        let cast = match self.current.kind {
            TokenKind::Integer => CastType::Integer,
            TokenKind::Real => CastType::Real,
            TokenKind::String => CastType::String,
            _ => return Err(self.unexpected()),
        };
        self.bump()?;
        Ok(cast)
    }

    fn domain(&mut self) -> Result<Domain, ParseError> {
        let domain = match self.current.kind {
            TokenKind::Integer => Domain::Integers,
            TokenKind::Rational => Domain::Rationals,
            TokenKind::Real => Domain::Reals,
            TokenKind::Complex => Domain::Complexes,
            _ => return Err(self.unexpected()),
        };
        self.bump()?;
        Ok(domain)
    }
}

/// Next token from the stream, or the end marker once it is exhausted
fn pull(tokens: &mut Lexer<'_>) -> Result<Token, ParseError> {
    match tokens.next() {
        Some(Ok(token)) => Ok(token),
        Some(Err(e)) => Err(e.into()),
        None => Ok(Token::eof(tokens.line())),
    }
}

fn compare_op(kind: TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Eq => Some(CompareOp::Eq),
        TokenKind::Neq => Some(CompareOp::Neq),
        TokenKind::Lt => Some(CompareOp::Lt),
        TokenKind::Lte => Some(CompareOp::Lte),
        TokenKind::Gt => Some(CompareOp::Gt),
        TokenKind::Gte => Some(CompareOp::Gte),
        _ => None,
    }
}

fn unquote(literal: &str) -> &str {
    literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};

    #[test]
    fn test_hello_world() {
        let program = parse_program(r#"PRINT "Hello World";"#).unwrap();
        assert_eq!(
            program.statements,
            vec![Stmt::Print {
                args: vec![Expr::text("Hello World")]
            }]
        );
    }

    #[test]
    fn test_assignment_and_solve() {
        let parsed = parse("f = 2*x + 1; roots = SOLVE f IN REAL;").unwrap();
        assert_eq!(parsed.program.statements.len(), 2);
        assert_eq!(
            parsed.program.statements[0],
            Stmt::Assignment {
                name: "f".into(),
                expr: Expr::binary(
                    Expr::binary(Expr::number("2"), ArithOp::Mul, Expr::name("x")),
                    ArithOp::Add,
                    Expr::number("1"),
                ),
            }
        );
        assert_eq!(
            parsed.program.statements[1],
            Stmt::Assignment {
                name: "roots".into(),
                expr: Expr::solve(Expr::name("f"), Domain::Reals),
            }
        );
        assert_eq!(parsed.symbols.names(), &["x", "f", "roots"]);
    }

    #[test]
    fn test_forward_reference_is_undefined_name() {
        let err = parse("x = y;").unwrap_err();
        assert_eq!(
            err,
            ParseError::UndefinedName {
                name: "y".into(),
                line: 1
            }
        );
        assert_eq!(err.to_string(), "Undefined name 'y' at line 1");
    }

    #[test]
    fn test_self_reference_before_declaration_is_undefined() {
        let err = parse("a = a + 1;").unwrap_err();
        assert!(matches!(err, ParseError::UndefinedName { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_undefined_name_reports_its_line() {
        let err = parse("a = 1;\nb = a;\nc = d;").unwrap_err();
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_invalid_token() {
        let err = parse("PRINT ;").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidToken {
                text: ";".into(),
                line: 1
            }
        );
        assert_eq!(err.to_string(), "Invalid token: ';' at line 1");
    }

    #[test]
    fn test_missing_semicolon_is_unexpected_eof() {
        assert_eq!(parse("PRINT 1").unwrap_err(), ParseError::UnexpectedEof);
        assert_eq!(parse("").unwrap_err(), ParseError::UnexpectedEof);
        assert_eq!(parse("# only a comment").unwrap_err(), ParseError::UnexpectedEof);
    }

    #[test]
    fn test_lex_error_surfaces() {
        assert!(matches!(parse("x = 1 $ 2;"), Err(ParseError::Lex(_))));
    }

    #[test]
    fn test_power_is_right_associative() {
        let program = parse_program("a = 2^3^2;").unwrap();
        let Stmt::Assignment { expr, .. } = &program.statements[0] else {
            panic!("Expected Assignment");
        };
        assert_eq!(
            *expr,
            Expr::binary(
                Expr::number("2"),
                ArithOp::Pow,
                Expr::binary(Expr::number("3"), ArithOp::Pow, Expr::number("2")),
            )
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let program = parse_program("a = 5 - 2 - 1;").unwrap();
        let Stmt::Assignment { expr, .. } = &program.statements[0] else {
            panic!("Expected Assignment");
        };
        assert_eq!(
            *expr,
            Expr::binary(
                Expr::binary(Expr::number("5"), ArithOp::Sub, Expr::number("2")),
                ArithOp::Sub,
                Expr::number("1"),
            )
        );
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let program = parse_program("a = -x^2;").unwrap();
        let Stmt::Assignment { expr, .. } = &program.statements[0] else {
            panic!("Expected Assignment");
        };
        assert_eq!(
            *expr,
            Expr::binary(
                Expr::number("0"),
                ArithOp::Sub,
                Expr::binary(Expr::name("x"), ArithOp::Pow, Expr::number("2")),
            )
        );
    }

    #[test]
    fn test_cast_applies_to_whole_expression() {
        let program = parse_program("a = x + 1 AS INTEGER;").unwrap();
        let Stmt::Assignment { expr, .. } = &program.statements[0] else {
            panic!("Expected Assignment");
        };
        assert_eq!(
            *expr,
            Expr::cast(
                Expr::binary(Expr::name("x"), ArithOp::Add, Expr::number("1")),
                CastType::Integer,
            )
        );
    }

    #[test]
    fn test_evaluation() {
        let program = parse_program("f = x^2; y = f(3);").unwrap();
        assert_eq!(
            program.statements[1],
            Stmt::Assignment {
                name: "y".into(),
                expr: Expr::evaluation("f", Expr::number("3")),
            }
        );
    }

    #[test]
    fn test_evaluation_of_undeclared_function() {
        let err = parse("y = g(3);").unwrap_err();
        assert!(matches!(err, ParseError::UndefinedName { ref name, .. } if name == "g"));
    }

    #[test]
    fn test_solve_forms() {
        let program =
            parse_program("f = x - 1; a = SOLVE f; b = SOLVE x^2 - 4 AS INTEGER; c = SOLVE f IN COMPLEX;")
                .unwrap();
        let domains: Vec<_> = program.statements[1..]
            .iter()
            .map(|s| match s {
                Stmt::Assignment {
                    expr: Expr::Solve { domain, .. },
                    ..
                } => *domain,
                other => panic!("Expected Solve, got {:?}", other),
            })
            .collect();
        assert_eq!(
            domains,
            vec![Domain::Reals, Domain::Integers, Domain::Complexes]
        );
    }

    #[test]
    fn test_rational_is_not_a_cast_type() {
        assert!(matches!(
            parse("a = x AS RATIONAL;"),
            Err(ParseError::InvalidToken { ref text, .. }) if text == "RATIONAL"
        ));
    }

    #[test]
    fn test_print_and_plot_arguments() {
        let program = parse_program("PRINT 1, x, \"a\"; PLOT x, x^2;").unwrap();
        assert!(matches!(&program.statements[0], Stmt::Print { args } if args.len() == 3));
        assert!(matches!(&program.statements[1], Stmt::Plot { args } if args.len() == 2));
    }

    #[test]
    fn test_input_forms() {
        let program = parse_program("IN > a; IN \"Value:\" > b AS REAL; PRINT a, b;").unwrap();
        assert_eq!(
            program.statements[0],
            Stmt::Input {
                name: "a".into(),
                prompt: None,
                cast: None
            }
        );
        assert_eq!(
            program.statements[1],
            Stmt::Input {
                name: "b".into(),
                prompt: Some(Expr::text("Value:")),
                cast: Some(CastType::Real),
            }
        );
    }

    #[test]
    fn test_string_concatenation() {
        let program = parse_program("s = \"a\" + \"b\"; t = \"n =\", x AS STRING;").unwrap();
        assert_eq!(
            program.statements[0],
            Stmt::Assignment {
                name: "s".into(),
                expr: Expr::concat(Expr::text("a"), Expr::text("b"), false),
            }
        );
        assert_eq!(
            program.statements[1],
            Stmt::Assignment {
                name: "t".into(),
                expr: Expr::concat(
                    Expr::text("n ="),
                    Expr::cast(Expr::name("x"), CastType::String),
                    true
                ),
            }
        );
    }

    #[test]
    fn test_comma_after_number_is_invalid() {
        assert!(matches!(
            parse("a = 1, 2;"),
            Err(ParseError::InvalidToken { ref text, .. }) if text == ","
        ));
    }

    #[test]
    fn test_conditional_and_loop() {
        let source = "n = 0;\nIF (n < 1) { PRINT \"small\"; } ELSE PRINT \"big\";\nWHILE (n < 3) { n = n + 1; PRINT n; }";
        let program = parse_program(source).unwrap();
        assert_eq!(program.statements.len(), 3);
        match &program.statements[1] {
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                assert_eq!(
                    *condition,
                    Expr::comparison(Expr::name("n"), CompareOp::Lt, Expr::number("1"))
                );
                assert_eq!(then_block.len(), 1);
                assert_eq!(else_block.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("Expected If, got {:?}", other),
        }
        assert!(matches!(&program.statements[2], Stmt::While { body, .. } if body.len() == 2));
    }

    #[test]
    fn test_names_declared_in_blocks_stay_visible() {
        let parsed = parse("IF (x > 0) { y = 1; } PRINT y;").unwrap();
        assert_eq!(parsed.symbols.names(), &["x", "y"]);
    }

    #[test]
    fn test_empty_block_is_invalid() {
        assert!(matches!(
            parse("IF (x > 0) { }"),
            Err(ParseError::InvalidToken { ref text, .. }) if text == "}"
        ));
    }

    #[test]
    fn test_parser_table_matches_collected_table() {
        let parsed = parse("a = 1; IN > b; WHILE (a < b) { c = a; a = a + 1; }").unwrap();
        assert_eq!(SymbolTable::collect(&parsed.program), parsed.symbols);
    }

    #[test]
    fn test_each_parse_owns_its_table() {
        let first = parse("y = 1;").unwrap();
        assert_eq!(first.symbols.names(), &["x", "y"]);
        assert!(matches!(parse("z = y;"), Err(ParseError::UndefinedName { .. })));
    }

    #[test]
    fn test_cancelled_parse() {
        let interrupt = Interrupt::new();
        interrupt.cancel();
        assert_eq!(
            parse_with("PRINT 1;", &interrupt).unwrap_err(),
            ParseError::Interrupted(Interrupted::Cancelled)
        );
    }

    #[test]
    fn test_expired_deadline() {
        let interrupt = Interrupt::with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(
            parse_with("PRINT 1;", &interrupt).unwrap_err(),
            ParseError::Interrupted(Interrupted::DeadlineExceeded)
        );
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let source = format!("a = {}1{};", "(".repeat(500), ")".repeat(500));
        assert!(matches!(
            parse(&source),
            Err(ParseError::NestingTooDeep { .. })
        ));
    }

    fn chain(terms: usize, op: &str) -> String {
        format!("a = {};", vec!["1"; terms].join(op))
    }

    #[test]
    fn test_operator_chain_at_depth_limit() {
        // the assignment takes one level, each term of the chain one more
        let program = parse_program(&chain(MAX_DEPTH - 1, " + ")).unwrap();
        assert_eq!(program.depth(), MAX_DEPTH);

        for op in [" + ", " * ", " < ", " - "] {
            assert_eq!(
                parse(&chain(MAX_DEPTH, op)).unwrap_err(),
                ParseError::NestingTooDeep { line: 1 },
                "chain joined by '{}'",
                op
            );
        }
    }

    #[test]
    fn test_huge_chain_is_rejected_without_recursing() {
        assert!(matches!(
            parse(&chain(10_000, "+")),
            Err(ParseError::NestingTooDeep { .. })
        ));
        let concat = format!("s = {};", vec!["\"a\""; 10_000].join(", "));
        assert!(matches!(
            parse(&concat),
            Err(ParseError::NestingTooDeep { .. })
        ));
        let signs = format!("a = {}1;", "-".repeat(10_000));
        assert!(matches!(
            parse(&signs),
            Err(ParseError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn test_nested_blocks_at_depth_limit() {
        let nested = |levels: usize| {
            format!(
                "IN > a; {} IN > b; {}",
                "WHILE (a) {".repeat(levels),
                "}".repeat(levels)
            )
        };
        let program = parse_program(&nested(MAX_DEPTH - 1)).unwrap();
        assert_eq!(program.depth(), MAX_DEPTH);
        assert!(matches!(
            parse(&nested(MAX_DEPTH)),
            Err(ParseError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn test_parsed_trees_respect_depth_limit() {
        let source = "f = x^2; a = -f(1 + 2 * 3) AS STRING; s = \"v\", a, 1 AS STRING; \
                      IF (a == 1) { WHILE (a < 2) { PRINT SOLVE f IN REAL; } }";
        let program = parse_program(source).unwrap();
        assert!(program.depth() <= MAX_DEPTH);
        assert_eq!(program.depth(), 7);
    }
}
