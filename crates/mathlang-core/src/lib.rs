//! mathlang-core: Lexer, parser, AST, code generator and serializer for MathLang
//!
//! This crate contains the pure language logic with NO I/O or crypto:
//! - Regex-driven lexer producing a lazy token stream
//! - Recursive-descent parser with declared-before-use checking
//! - Per-parse symbol table mapping names to synthetic slots
//! - AST node types
//! - Python/SymPy code generation
//! - Tagged JSON serialization of programs
//!
//! Signing, bytecode artifacts and host execution live in the `mathlang`
//! crate, which builds on this one.

pub mod ast;
pub mod codegen;
pub mod interrupt;
pub mod lexer;
pub mod parser;
pub mod serializer;
pub mod symbols;
pub mod token;

// Re-export commonly used types
pub use ast::{ArithOp, CastType, CompareOp, Domain, Expr, Program, Stmt};
pub use codegen::{generate, same_code, CodeGenerator, EmitSource};
pub use interrupt::{Interrupt, Interrupted};
pub use lexer::{lex, source_signature, LexError, Lexer};
pub use parser::{parse, parse_program, parse_with, ParseError, Parsed, MAX_DEPTH};
pub use serializer::{
    deserialize, serialize, serialize_pretty, DeserializeError, EmitRecord, Record,
    SerializeError,
};
pub use symbols::{SymbolTable, FREE_VARIABLE};
pub use token::{Token, TokenKind};
