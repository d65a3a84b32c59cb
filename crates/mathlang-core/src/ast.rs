//! MathLang AST
//!
//! A closed set of node types:
//! - **Program**: the root, an ordered list of statements
//! - **Stmt**: assignment, input, print, plot, conditional, loop
//! - **Expr**: literals, names, arithmetic, comparisons, string
//!   concatenation, evaluation `f(v)`, `SOLVE` and casts
//!
//! Names are kept exactly as declared in the source. Synthetic host names
//! are only produced by the code generator, so a tree can be serialized and
//! rebuilt without any interning state.
//!
//! Equality is structural. Whether two trees generate the same code is a
//! separate question answered by [`crate::codegen::same_code`].

use std::fmt;
use std::str::FromStr;

// =============================================================================
// ENUMERATED TAGS
// =============================================================================

/// Numeric universe searched by `SOLVE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Domain {
    Integers,
    Rationals,
    #[default]
    Reals,
    Complexes,
}

impl Domain {
    /// Source keyword for this domain
    pub fn keyword(&self) -> &'static str {
        match self {
            Domain::Integers => "INTEGER",
            Domain::Rationals => "RATIONAL",
            Domain::Reals => "REAL",
            Domain::Complexes => "COMPLEX",
        }
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INTEGER" => Ok(Domain::Integers),
            "RATIONAL" => Ok(Domain::Rationals),
            "REAL" => Ok(Domain::Reals),
            "COMPLEX" => Ok(Domain::Complexes),
            _ => Err(format!("unknown domain '{}'", s)),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Target type of an `AS` conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastType {
    Integer,
    Real,
    String,
}

impl CastType {
    pub fn keyword(&self) -> &'static str {
        match self {
            CastType::Integer => "INTEGER",
            CastType::Real => "REAL",
            CastType::String => "STRING",
        }
    }
}

impl FromStr for CastType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INTEGER" => Ok(CastType::Integer),
            "REAL" => Ok(CastType::Real),
            "STRING" => Ok(CastType::String),
            _ => Err(format!("unknown cast type '{}'", s)),
        }
    }
}

impl fmt::Display for CastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl ArithOp {
    /// Operator as written in MathLang source
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Pow => "^",
        }
    }
}

impl FromStr for ArithOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(ArithOp::Add),
            "-" => Ok(ArithOp::Sub),
            "*" => Ok(ArithOp::Mul),
            "/" => Ok(ArithOp::Div),
            "^" => Ok(ArithOp::Pow),
            _ => Err(format!("unknown arithmetic operator '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::Neq),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Lte),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Gte),
            _ => Err(format!("unknown comparison operator '{}'", s)),
        }
    }
}

// =============================================================================
// NODES
// =============================================================================

/// A complete MathLang program
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }

    /// Levels of nodes below the program root (0 when empty)
    pub fn depth(&self) -> usize {
        block_depth(&self.statements)
    }
}

fn block_depth(statements: &[Stmt]) -> usize {
    statements.iter().map(Stmt::depth).max().unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `name = expr;`
    Assignment { name: String, expr: Expr },

    /// `IN [prompt] > name [AS type];`
    Input {
        name: String,
        prompt: Option<Expr>,
        cast: Option<CastType>,
    },

    /// `PRINT a, b;`
    Print { args: Vec<Expr> },

    /// `PLOT a, b;`
    Plot { args: Vec<Expr> },

    /// `IF (cond) block [ELSE block]`
    If {
        condition: Expr,
        then_block: Vec<Stmt>,
        else_block: Option<Vec<Stmt>>,
    },

    /// `WHILE (cond) block`
    While { condition: Expr, body: Vec<Stmt> },
}

impl Stmt {
    /// Levels of nodes from this statement down to its deepest leaf
    pub fn depth(&self) -> usize {
        let below = match self {
            Stmt::Assignment { expr, .. } => expr.depth(),
            Stmt::Input { prompt, .. } => prompt.as_ref().map_or(0, Expr::depth),
            Stmt::Print { args } | Stmt::Plot { args } => {
                args.iter().map(Expr::depth).max().unwrap_or(0)
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => condition
                .depth()
                .max(block_depth(then_block))
                .max(else_block.as_deref().map_or(0, block_depth)),
            Stmt::While { condition, body } => condition.depth().max(block_depth(body)),
        };
        1 + below
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal, kept as written (`3`, `2.5`)
    Number(String),

    /// String literal contents, without the quotes
    Text(String),

    /// Reference to a declared name
    Name(String),

    BinaryOp {
        left: Box<Expr>,
        op: ArithOp,
        right: Box<Expr>,
    },

    Comparison {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },

    /// String concatenation; `padded` inserts a space between the parts
    Concat {
        left: Box<Expr>,
        right: Box<Expr>,
        padded: bool,
    },

    /// `name(arg)`: substitute `arg` for the free variable in `name`
    Evaluation { name: String, arg: Box<Expr> },

    /// `SOLVE expr [IN domain]`
    Solve { expr: Box<Expr>, domain: Domain },

    /// `expr AS type`
    Cast { expr: Box<Expr>, to: CastType },
}

impl Expr {
    pub fn number(text: impl Into<String>) -> Self {
        Expr::Number(text.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Expr::Text(text.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    pub fn binary(left: Expr, op: ArithOp, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn comparison(left: Expr, op: CompareOp, right: Expr) -> Self {
        Expr::Comparison {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn concat(left: Expr, right: Expr, padded: bool) -> Self {
        Expr::Concat {
            left: Box::new(left),
            right: Box::new(right),
            padded,
        }
    }

    pub fn evaluation(name: impl Into<String>, arg: Expr) -> Self {
        Expr::Evaluation {
            name: name.into(),
            arg: Box::new(arg),
        }
    }

    pub fn solve(expr: Expr, domain: Domain) -> Self {
        Expr::Solve {
            expr: Box::new(expr),
            domain,
        }
    }

    pub fn cast(expr: Expr, to: CastType) -> Self {
        Expr::Cast {
            expr: Box::new(expr),
            to,
        }
    }

    /// Whether this expression statically yields a string
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            Expr::Text(_)
                | Expr::Concat { .. }
                | Expr::Cast {
                    to: CastType::String,
                    ..
                }
        )
    }

    pub fn depth(&self) -> usize {
        match self {
            Expr::Number(_) | Expr::Text(_) | Expr::Name(_) => 1,
            Expr::BinaryOp { left, right, .. }
            | Expr::Comparison { left, right, .. }
            | Expr::Concat { left, right, .. } => 1 + left.depth().max(right.depth()),
            Expr::Evaluation { arg: expr, .. }
            | Expr::Solve { expr, .. }
            | Expr::Cast { expr, .. } => 1 + expr.depth(),
        }
    }

    /// Visit every name this expression reads, left to right
    pub fn for_each_name<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Number(_) | Expr::Text(_) => {}
            Expr::Name(name) => f(name),
            Expr::BinaryOp { left, right, .. }
            | Expr::Comparison { left, right, .. }
            | Expr::Concat { left, right, .. } => {
                left.for_each_name(f);
                right.for_each_name(f);
            }
            Expr::Evaluation { name, arg } => {
                f(name);
                arg.for_each_name(f);
            }
            Expr::Solve { expr, .. } | Expr::Cast { expr, .. } => expr.for_each_name(f),
        }
    }
}
