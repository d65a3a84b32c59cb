//! Symbol table - ordered registry of declared names
//!
//! The slot index of a name is its position in the table and never changes
//! once assigned. The code generator derives synthetic variable names
//! (`_0`, `_1`, ...) from those slots. A table lives for exactly one
//! compilation; nothing here is shared between compilations.

use crate::ast::{Expr, Program, Stmt};

/// The implicit free variable every program starts with
pub const FREE_VARIABLE: &str = "x";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    names: Vec<String>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A fresh table seeded with the free variable in slot 0
    pub fn new() -> Self {
        Self {
            names: vec![FREE_VARIABLE.to_string()],
        }
    }

    /// Rebuild the table a parse of `program` would have produced: the free
    /// variable, then every assignment/input target in program order.
    pub fn collect(program: &Program) -> Self {
        let mut table = Self::new();
        table.declare_all(&program.statements);
        table
    }

    /// Like [`SymbolTable::collect`], but also verifies that every name is
    /// declared before it is read. Returns the first offending name.
    pub fn check(program: &Program) -> Result<Self, String> {
        let mut table = Self::new();
        table.check_all(&program.statements)?;
        Ok(table)
    }

    fn check_all(&mut self, statements: &[Stmt]) -> Result<(), String> {
        for stmt in statements {
            match stmt {
                Stmt::Assignment { name, expr } => {
                    self.check_expr(expr)?;
                    self.declare(name);
                }
                Stmt::Input { name, prompt, .. } => {
                    if let Some(prompt) = prompt {
                        self.check_expr(prompt)?;
                    }
                    self.declare(name);
                }
                Stmt::Print { args } | Stmt::Plot { args } => {
                    for arg in args {
                        self.check_expr(arg)?;
                    }
                }
                Stmt::If {
                    condition,
                    then_block,
                    else_block,
                } => {
                    self.check_expr(condition)?;
                    self.check_all(then_block)?;
                    if let Some(else_block) = else_block {
                        self.check_all(else_block)?;
                    }
                }
                Stmt::While { condition, body } => {
                    self.check_expr(condition)?;
                    self.check_all(body)?;
                }
            }
        }
        Ok(())
    }

    fn check_expr(&self, expr: &Expr) -> Result<(), String> {
        let mut undefined = None;
        expr.for_each_name(&mut |name| {
            if undefined.is_none() && !self.contains(name) {
                undefined = Some(name.to_string());
            }
        });
        match undefined {
            Some(name) => Err(name),
            None => Ok(()),
        }
    }

    fn declare_all(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            match stmt {
                Stmt::Assignment { name, .. } | Stmt::Input { name, .. } => {
                    self.declare(name);
                }
                Stmt::If {
                    then_block,
                    else_block,
                    ..
                } => {
                    self.declare_all(then_block);
                    if let Some(else_block) = else_block {
                        self.declare_all(else_block);
                    }
                }
                Stmt::While { body, .. } => self.declare_all(body),
                Stmt::Print { .. } | Stmt::Plot { .. } => {}
            }
        }
    }

    /// Add `name` if it is new; returns its slot either way
    pub fn declare(&mut self, name: &str) -> usize {
        match self.slot(name) {
            Some(slot) => slot,
            None => {
                self.names.push(name.to_string());
                self.names.len() - 1
            }
        }
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    /// Synthetic host-runtime name for a declared symbol
    pub fn synthetic(&self, name: &str) -> Option<String> {
        self.slot(name).map(synthetic_name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Synthetic names of every slot, in slot order
    pub fn synthetic_names(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.names.len()).map(synthetic_name)
    }
}

pub fn synthetic_name(slot: usize) -> String {
    format!("_{}", slot)
}
