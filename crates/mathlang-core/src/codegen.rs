//! Code generator - lowers a MathLang AST to Python source using SymPy
//!
//! Every declared name is replaced by a synthetic variable derived from its
//! symbol-table slot (`x` is always `_0`). The table belongs to one
//! [`CodeGenerator`], so independent compilations never share naming state.
//!
//! ## Generated program shape
//!
//! ```text
//! import sympy as _s          <- preamble: library, primitives, free variable
//! _p=print
//! _i=input
//! _0=_s.Symbol("x")
//! ...statements...
//! [globals().pop(_k,None) for _k in ("_s","_p","_i","_0",...)]   <- teardown
//! ```
//!
//! Arithmetic is emitted fully parenthesised; simplification is left to
//! SymPy when the generated program runs.

use std::fmt::Write;

use crate::ast::*;
use crate::symbols::{synthetic_name, SymbolTable, FREE_VARIABLE};

const INDENT: &str = "    ";
const LIBRARY: &str = "_s";
const PRINT: &str = "_p";
const INPUT: &str = "_i";

/// Lowers nodes to host-runtime source
pub trait EmitSource {
    fn emit_source(&self, gen: &mut CodeGenerator) -> String;
}

/// Per-compile code generation context
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    symbols: SymbolTable,
}

impl CodeGenerator {
    pub fn new(symbols: SymbolTable) -> Self {
        Self { symbols }
    }

    /// Generator whose slots match what parsing `program` would assign
    pub fn for_program(program: &Program) -> Self {
        Self::new(SymbolTable::collect(program))
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Synthetic name for `name`, allocating a slot if it was never declared
    fn intern(&mut self, name: &str) -> String {
        synthetic_name(self.symbols.declare(name))
    }

    fn free_variable(&mut self) -> String {
        self.intern(FREE_VARIABLE)
    }

    fn program(&mut self, program: &Program) -> String {
        let x = self.free_variable();
        let mut lines = vec![
            format!("import sympy as {}", LIBRARY),
            format!("{}=print", PRINT),
            format!("{}=input", INPUT),
            format!("{}={}.Symbol(\"{}\")", x, LIBRARY, FREE_VARIABLE),
        ];
        self.block(&program.statements, 0, &mut lines);

        let released: Vec<String> = [LIBRARY, PRINT, INPUT]
            .into_iter()
            .map(str::to_string)
            .chain(self.symbols.synthetic_names())
            .map(|n| format!("\"{}\"", n))
            .collect();
        lines.push(format!(
            "[globals().pop(_k,None) for _k in ({},)]",
            released.join(",")
        ));
        lines.join("\n")
    }

    fn block(&mut self, statements: &[Stmt], depth: usize, lines: &mut Vec<String>) {
        for stmt in statements {
            self.statement(stmt, depth, lines);
        }
    }

    fn statement(&mut self, stmt: &Stmt, depth: usize, lines: &mut Vec<String>) {
        let pad = INDENT.repeat(depth);
        match stmt {
            Stmt::Assignment { name, expr } => {
                let value = self.expr(expr);
                let target = self.intern(name);
                lines.push(format!("{}{}={}", pad, target, value));
            }
            Stmt::Input { name, prompt, cast } => {
                let prompt = prompt.as_ref().map(|p| self.expr(p)).unwrap_or_default();
                let call = format!("{}({})", INPUT, prompt);
                let value = match cast {
                    Some(to) => cast_call(*to, &call),
                    None => call,
                };
                let target = self.intern(name);
                lines.push(format!("{}{}={}", pad, target, value));
            }
            Stmt::Print { args } => {
                let args = self.exprs(args);
                lines.push(format!("{}{}({})", pad, PRINT, args));
            }
            Stmt::Plot { args } => {
                let args = self.exprs(args);
                lines.push(format!("{}{}.plot({})", pad, LIBRARY, args));
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => {
                let condition = self.expr(condition);
                lines.push(format!("{}if {}:", pad, condition));
                self.block(then_block, depth + 1, lines);
                if let Some(else_block) = else_block {
                    lines.push(format!("{}else:", pad));
                    self.block(else_block, depth + 1, lines);
                }
            }
            Stmt::While { condition, body } => {
                let condition = self.expr(condition);
                lines.push(format!("{}while {}:", pad, condition));
                self.block(body, depth + 1, lines);
            }
        }
    }

    fn exprs(&mut self, exprs: &[Expr]) -> String {
        exprs
            .iter()
            .map(|e| self.expr(e))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Number(text) => python_number(text),
            Expr::Text(text) => python_string(text),
            Expr::Name(name) => self.intern(name),
            Expr::BinaryOp { left, op, right } => {
                let op = match op {
                    ArithOp::Pow => "**",
                    other => other.symbol(),
                };
                format!("({}){}({})", self.expr(left), op, self.expr(right))
            }
            Expr::Comparison { left, op, right } => {
                format!("({}){}({})", self.expr(left), op.symbol(), self.expr(right))
            }
            Expr::Concat {
                left,
                right,
                padded,
            } => {
                let sep = if *padded { "+\" \"+" } else { "+" };
                format!("str({}){}str({})", self.expr(left), sep, self.expr(right))
            }
            Expr::Evaluation { name, arg } => {
                let function = self.intern(name);
                let x = self.free_variable();
                format!(
                    "{}.sympify({}).subs({{{}:({})}})",
                    LIBRARY,
                    function,
                    x,
                    self.expr(arg)
                )
            }
            Expr::Solve { expr, domain } => {
                let target = self.expr(expr);
                let x = self.free_variable();
                format!(
                    "{}.solveset({},{},domain={}.{})",
                    LIBRARY,
                    target,
                    x,
                    LIBRARY,
                    domain_constant(*domain)
                )
            }
            Expr::Cast { expr, to } => {
                let inner = self.expr(expr);
                cast_call(*to, &inner)
            }
        }
    }
}

impl EmitSource for Program {
    fn emit_source(&self, gen: &mut CodeGenerator) -> String {
        gen.program(self)
    }
}

impl EmitSource for Stmt {
    fn emit_source(&self, gen: &mut CodeGenerator) -> String {
        let mut lines = Vec::new();
        gen.statement(self, 0, &mut lines);
        lines.join("\n")
    }
}

impl EmitSource for Expr {
    fn emit_source(&self, gen: &mut CodeGenerator) -> String {
        gen.expr(self)
    }
}

/// Generate the complete Python program for `program`
pub fn generate(program: &Program) -> String {
    program.emit_source(&mut CodeGenerator::for_program(program))
}

/// Whether two programs lower to identical source
pub fn same_code(a: &Program, b: &Program) -> bool {
    generate(a) == generate(b)
}

/// SymPy set constant for a solve domain
pub fn domain_constant(domain: Domain) -> &'static str {
    match domain {
        Domain::Integers => "Integers",
        Domain::Rationals => "Rationals",
        Domain::Reals => "Reals",
        Domain::Complexes => "Complexes",
    }
}

fn cast_call(to: CastType, inner: &str) -> String {
    let function = match to {
        CastType::Integer => "int",
        CastType::Real => "float",
        CastType::String => "str",
    };
    format!("{}({})", function, inner)
}

/// Double-quoted Python literal holding exactly `text`
/// Numeric literal as Python accepts it: no leading zeros on the whole part
fn python_number(text: &str) -> String {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text, None),
    };
    let whole = match whole.trim_start_matches('0') {
        "" => "0",
        digits => digits,
    };
    match fraction {
        Some(fraction) => format!("{}.{}", whole, fraction),
        None => whole.to_string(),
    }
}

fn python_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;
    use pretty_assertions::assert_eq;

    fn body(source: &str) -> Vec<String> {
        let code = generate(&parse_program(source).unwrap());
        let lines: Vec<String> = code.lines().map(str::to_string).collect();
        // Drop the four preamble lines and the teardown line
        lines[4..lines.len() - 1].to_vec()
    }

    #[test]
    fn test_hello_world_program() {
        let code = generate(&parse_program(r#"PRINT "Hello World";"#).unwrap());
        assert_eq!(
            code,
            [
                "import sympy as _s",
                "_p=print",
                "_i=input",
                "_0=_s.Symbol(\"x\")",
                "_p(\"Hello World\")",
                "[globals().pop(_k,None) for _k in (\"_s\",\"_p\",\"_i\",\"_0\",)]",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_assignment_and_solve() {
        assert_eq!(
            body("f = 2*x + 1; roots = SOLVE f IN REAL;"),
            vec![
                "_1=((2)*(_0))+(1)".to_string(),
                "_2=_s.solveset(_1,_0,domain=_s.Reals)".to_string(),
            ]
        );
    }

    #[test]
    fn test_teardown_releases_every_slot() {
        let code = generate(&parse_program("a = 1; b = a;").unwrap());
        let last = code.lines().last().unwrap();
        assert_eq!(
            last,
            "[globals().pop(_k,None) for _k in (\"_s\",\"_p\",\"_i\",\"_0\",\"_1\",\"_2\",)]"
        );
    }

    #[test]
    fn test_power_becomes_double_star() {
        assert_eq!(body("y = x^2;"), vec!["_1=(_0)**(2)".to_string()]);
    }

    #[test]
    fn test_reassignment_reuses_slot() {
        assert_eq!(
            body("x = 3; y = x^2; x = y;"),
            vec![
                "_0=3".to_string(),
                "_1=(_0)**(2)".to_string(),
                "_0=_1".to_string()
            ]
        );
    }

    #[test]
    fn test_evaluation_substitutes_free_variable() {
        assert_eq!(
            body("f = x^2; v = f(3);")[1],
            "_2=_s.sympify(_1).subs({_0:(3)})"
        );
    }

    #[test]
    fn test_solve_domains() {
        let lines = body("a = SOLVE x IN INTEGER; b = SOLVE x IN RATIONAL; c = SOLVE x AS COMPLEX;");
        assert!(lines[0].ends_with("domain=_s.Integers)"));
        assert!(lines[1].ends_with("domain=_s.Rationals)"));
        assert!(lines[2].ends_with("domain=_s.Complexes)"));
    }

    #[test]
    fn test_input_with_prompt_and_cast() {
        assert_eq!(
            body("IN \"Age:\" > age AS INTEGER; IN > name;"),
            vec![
                "_1=int(_i(\"Age:\"))".to_string(),
                "_2=_i()".to_string()
            ]
        );
    }

    #[test]
    fn test_print_plot_and_concat() {
        assert_eq!(
            body("PRINT \"x is\", x; PLOT x, x^2; s = \"a\" + \"b\"; t = \"v:\", x AS STRING;"),
            vec![
                "_p(\"x is\",_0)".to_string(),
                "_s.plot(_0,(_0)**(2))".to_string(),
                "_1=str(\"a\")+str(\"b\")".to_string(),
                "_2=str(\"v:\")+\" \"+str(str(_0))".to_string(),
            ]
        );
    }

    #[test]
    fn test_blocks_are_indented() {
        assert_eq!(
            body("n = 0; WHILE (n < 3) { IF (n == 1) PRINT n; ELSE { PRINT 0; } n = n + 1; }"),
            vec![
                "_1=0".to_string(),
                "while (_1)<(3):".to_string(),
                "    if (_1)==(1):".to_string(),
                "        _p(_1)".to_string(),
                "    else:".to_string(),
                "        _p(0)".to_string(),
                "    _1=(_1)+(1)".to_string(),
            ]
        );
    }

    #[test]
    fn test_unary_minus_and_casts() {
        assert_eq!(
            body("a = -x AS REAL;"),
            vec!["_1=float((0)-(_0))".to_string()]
        );
    }

    #[test]
    fn test_leading_zeros_are_dropped() {
        assert_eq!(
            body("a = 007; b = 000; c = 00.50; d = 10.0;"),
            vec![
                "_1=7".to_string(),
                "_2=0".to_string(),
                "_3=0.50".to_string(),
                "_4=10.0".to_string(),
            ]
        );
        assert_eq!(python_number("0"), "0");
        assert_eq!(python_number("0100"), "100");
    }

    #[test]
    fn test_python_string_escapes() {
        assert_eq!(python_string(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(python_string("line\nnext"), "\"line\\nnext\"");
        assert_eq!(python_string("\u{7}"), "\"\\u0007\"");
    }

    #[test]
    fn test_node_level_emission() {
        let mut gen = CodeGenerator::new(SymbolTable::new());
        let stmt = Stmt::Print {
            args: vec![Expr::name("x")],
        };
        assert_eq!(stmt.emit_source(&mut gen), "_p(_0)");
        assert_eq!(Expr::number("4").emit_source(&mut gen), "4");
    }

    #[test]
    fn test_same_code_compares_generated_source() {
        let a = parse_program("y = (x + 1);").unwrap();
        let b = parse_program("y = x + 1;").unwrap();
        assert_eq!(a, b);
        assert!(same_code(&a, &b));
        let c = parse_program("y = x - 1;").unwrap();
        assert!(!same_code(&a, &c));
    }

    #[test]
    fn test_generators_are_independent() {
        let first = generate(&parse_program("a = 1; b = 2;").unwrap());
        let second = generate(&parse_program("b = 2;").unwrap());
        assert!(first.contains("_2=2"));
        assert!(second.contains("_1=2"));
    }
}
