//! Serializer - lossless JSON form of the AST
//!
//! Every node becomes a tagged record:
//!
//! ```json
//! {"type": "Assignment", "params": {"name": "f", "expr": {"type": "Number", "params": {"value": "1"}}}}
//! ```
//!
//! Leaves are records too (`Number`, `Text`, `Name`), so a declared name can
//! never be confused with literal text. Reconstruction dispatches over the
//! fixed tag set below; any other tag is rejected. The rebuilt program must
//! still be one the parser could have produced: every name declared before
//! it is read, no empty blocks or argument lists, and no deeper than
//! [`MAX_DEPTH`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::ast::*;
use crate::parser::MAX_DEPTH;
use crate::symbols::SymbolTable;

/// Every tag the deserializer understands
pub const TAGS: &[&str] = &[
    "Program",
    "Assignment",
    "Input",
    "Print",
    "Plot",
    "If",
    "While",
    "Number",
    "Text",
    "Name",
    "BinaryOp",
    "Comparison",
    "Concat",
    "Evaluation",
    "Solve",
    "Cast",
];

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("Value is not serialisable: {0}")]
    Type(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeserializeError {
    #[error("Unknown node type '{0}'")]
    UnknownTag(String),

    #[error("Malformed record: {0}")]
    Malformed(String),

    #[error("Undefined name '{0}' in serialised program")]
    UndefinedName(String),
}

/// `{type, params}` record describing one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub kind: String,
    pub params: Map<String, Value>,
}

impl Record {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            params: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        json!({ "type": record.kind, "params": record.params })
    }
}

/// Describes a node as a tagged record
pub trait EmitRecord {
    fn emit_record(&self) -> Record;
}

fn records<T: EmitRecord>(nodes: &[T]) -> Value {
    Value::Array(nodes.iter().map(|n| n.emit_record().into()).collect())
}

fn optional<T: EmitRecord>(node: Option<&T>) -> Value {
    node.map_or(Value::Null, |n| n.emit_record().into())
}

impl EmitRecord for Program {
    fn emit_record(&self) -> Record {
        Record::new("Program").with("stmts", records(&self.statements))
    }
}

impl EmitRecord for Stmt {
    fn emit_record(&self) -> Record {
        match self {
            Stmt::Assignment { name, expr } => Record::new("Assignment")
                .with("name", name.as_str())
                .with("expr", expr.emit_record()),
            Stmt::Input { name, prompt, cast } => Record::new("Input")
                .with("name", name.as_str())
                .with("prompt", optional(prompt.as_ref()))
                .with("cast", cast.map_or(Value::Null, |c| c.keyword().into())),
            Stmt::Print { args } => Record::new("Print").with("args", records(args)),
            Stmt::Plot { args } => Record::new("Plot").with("args", records(args)),
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => Record::new("If")
                .with("condition", condition.emit_record())
                .with("true_block", records(then_block))
                .with(
                    "false_block",
                    else_block.as_deref().map_or(Value::Null, records),
                ),
            Stmt::While { condition, body } => Record::new("While")
                .with("condition", condition.emit_record())
                .with("code_block", records(body)),
        }
    }
}

impl EmitRecord for Expr {
    fn emit_record(&self) -> Record {
        match self {
            Expr::Number(value) => Record::new("Number").with("value", value.as_str()),
            Expr::Text(value) => Record::new("Text").with("value", value.as_str()),
            Expr::Name(name) => Record::new("Name").with("name", name.as_str()),
            Expr::BinaryOp { left, op, right } => Record::new("BinaryOp")
                .with("left", left.emit_record())
                .with("op", op.symbol())
                .with("right", right.emit_record()),
            Expr::Comparison { left, op, right } => Record::new("Comparison")
                .with("left", left.emit_record())
                .with("op", op.symbol())
                .with("right", right.emit_record()),
            Expr::Concat {
                left,
                right,
                padded,
            } => Record::new("Concat")
                .with("left", left.emit_record())
                .with("right", right.emit_record())
                .with("padded", *padded),
            Expr::Evaluation { name, arg } => Record::new("Evaluation")
                .with("name", name.as_str())
                .with("expr", arg.emit_record()),
            Expr::Solve { expr, domain } => Record::new("Solve")
                .with("expr", expr.emit_record())
                .with("domain", domain.keyword()),
            Expr::Cast { expr, to } => Record::new("Cast")
                .with("expr", expr.emit_record())
                .with("type", to.keyword()),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Serialise a program to its tagged JSON form
pub fn serialize(program: &Program) -> Result<String, SerializeError> {
    Ok(serde_json::to_string(&Value::from(program.emit_record()))?)
}

/// Indented variant of [`serialize`], for debugging output
pub fn serialize_pretty(program: &Program) -> Result<String, SerializeError> {
    Ok(serde_json::to_string_pretty(&Value::from(program.emit_record()))?)
}

/// Rebuild a program from its tagged JSON form
pub fn deserialize(text: &str) -> Result<Program, DeserializeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DeserializeError::Malformed(e.to_string()))?;
    let program = program_from(&value)?;
    if program.depth() > MAX_DEPTH {
        return Err(malformed(format!(
            "program nests deeper than {} levels",
            MAX_DEPTH
        )));
    }
    SymbolTable::check(&program).map_err(DeserializeError::UndefinedName)?;
    debug!(statements = program.statements.len(), "deserialised program");
    Ok(program)
}

// ============================================================================
// Reconstruction
// ============================================================================

fn malformed(message: impl Into<String>) -> DeserializeError {
    DeserializeError::Malformed(message.into())
}

/// Split a value into its tag and params, rejecting unknown tags
fn record(value: &Value) -> Result<(&str, &Map<String, Value>), DeserializeError> {
    let object = value
        .as_object()
        .ok_or_else(|| malformed(format!("expected a record, found {}", value)))?;
    let tag = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("record without a string 'type'"))?;
    if !TAGS.contains(&tag) {
        return Err(DeserializeError::UnknownTag(tag.to_string()));
    }
    let params = object
        .get("params")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(format!("'{}' record without 'params'", tag)))?;
    Ok((tag, params))
}

fn param<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a Value, DeserializeError> {
    params
        .get(key)
        .ok_or_else(|| malformed(format!("missing param '{}'", key)))
}

/// A param that may be absent or null
fn nullable<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| !v.is_null())
}

fn str_param<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a str, DeserializeError> {
    param(params, key)?
        .as_str()
        .ok_or_else(|| malformed(format!("param '{}' must be a string", key)))
}

fn identifier(params: &Map<String, Value>, key: &str) -> Result<String, DeserializeError> {
    let name = str_param(params, key)?;
    if is_identifier(name) {
        Ok(name.to_string())
    } else {
        Err(malformed(format!("'{}' is not an identifier", name)))
    }
}

fn keyword<T>(params: &Map<String, Value>, key: &str) -> Result<T, DeserializeError>
where
    T: std::str::FromStr<Err = String>,
{
    str_param(params, key)?.parse().map_err(malformed)
}

fn list<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a [Value], DeserializeError> {
    param(params, key)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| malformed(format!("param '{}' must be a list", key)))
}

/// A list the grammar requires at least one entry in
fn non_empty<'a>(
    params: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a [Value], DeserializeError> {
    let values = list(params, key)?;
    if values.is_empty() {
        return Err(malformed(format!("param '{}' must not be empty", key)));
    }
    Ok(values)
}

fn program_from(value: &Value) -> Result<Program, DeserializeError> {
    match record(value)? {
        ("Program", params) => Ok(Program::new(statements(non_empty(params, "stmts")?)?)),
        (tag, _) => Err(malformed(format!("expected Program, found {}", tag))),
    }
}

fn statements(values: &[Value]) -> Result<Vec<Stmt>, DeserializeError> {
    values.iter().map(stmt_from).collect()
}

fn exprs(values: &[Value]) -> Result<Vec<Expr>, DeserializeError> {
    values.iter().map(expr_from).collect()
}

fn stmt_from(value: &Value) -> Result<Stmt, DeserializeError> {
    let (tag, params) = record(value)?;
    let stmt = match tag {
        "Assignment" => Stmt::Assignment {
            name: identifier(params, "name")?,
            expr: expr_from(param(params, "expr")?)?,
        },
        "Input" => Stmt::Input {
            name: identifier(params, "name")?,
            prompt: nullable(params, "prompt").map(expr_from).transpose()?,
            cast: match nullable(params, "cast") {
                Some(_) => Some(keyword(params, "cast")?),
                None => None,
            },
        },
        "Print" => Stmt::Print {
            args: exprs(non_empty(params, "args")?)?,
        },
        "Plot" => Stmt::Plot {
            args: exprs(non_empty(params, "args")?)?,
        },
        "If" => Stmt::If {
            condition: expr_from(param(params, "condition")?)?,
            then_block: statements(non_empty(params, "true_block")?)?,
            else_block: match nullable(params, "false_block") {
                Some(_) => Some(statements(non_empty(params, "false_block")?)?),
                None => None,
            },
        },
        "While" => Stmt::While {
            condition: expr_from(param(params, "condition")?)?,
            body: statements(non_empty(params, "code_block")?)?,
        },
        other => return Err(malformed(format!("expected a statement, found {}", other))),
    };
    Ok(stmt)
}

fn expr_from(value: &Value) -> Result<Expr, DeserializeError> {
    let (tag, params) = record(value)?;
    let boxed = |key: &str| expr_from(param(params, key)?).map(Box::new);
    let expr = match tag {
        "Number" => {
            let text = str_param(params, "value")?;
            if !is_number(text) {
                return Err(malformed(format!("'{}' is not a number", text)));
            }
            Expr::Number(text.to_string())
        }
        "Text" => Expr::Text(str_param(params, "value")?.to_string()),
        "Name" => Expr::Name(identifier(params, "name")?),
        "BinaryOp" => Expr::BinaryOp {
            left: boxed("left")?,
            op: str_param(params, "op")?.parse().map_err(malformed)?,
            right: boxed("right")?,
        },
        "Comparison" => Expr::Comparison {
            left: boxed("left")?,
            op: str_param(params, "op")?.parse().map_err(malformed)?,
            right: boxed("right")?,
        },
        "Concat" => Expr::Concat {
            left: boxed("left")?,
            right: boxed("right")?,
            padded: param(params, "padded")?
                .as_bool()
                .ok_or_else(|| malformed("param 'padded' must be a boolean"))?,
        },
        "Evaluation" => Expr::Evaluation {
            name: identifier(params, "name")?,
            arg: boxed("expr")?,
        },
        "Solve" => Expr::Solve {
            expr: boxed("expr")?,
            domain: keyword(params, "domain")?,
        },
        "Cast" => Expr::Cast {
            expr: boxed("expr")?,
            to: keyword(params, "type")?,
        },
        other => return Err(malformed(format!("expected an expression, found {}", other))),
    };
    Ok(expr)
}

/// Same shape the lexer accepts for identifiers
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        && name.len() <= 64
}

/// Same shape the lexer accepts for numbers
fn is_number(text: &str) -> bool {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(whole) && fraction.map_or(true, digits)
}
