//! Abstract syntax tree of the analysed Go-like language.
//!
//! The parser lives outside this crate; it hands over a [`FuncDecl`] per function. The
//! analyses only read the tree, through a small capability set on [`Stmt`]:
//!
//! | Capability | Method |
//! |------------|--------|
//! | statement kind | [`Stmt::kind_name`] / pattern matching on [`StmtKind`] |
//! | nested statements | [`Stmt::children`] |
//! | assigned variables | [`Stmt::defined_variables`] |
//! | read variables | [`Stmt::used_variables`], [`Expr::used_variables`] |
//! | position | [`Stmt::position`] |
//!
//! The [`build`] module assembles trees by hand, which is how embedders without a Go
//! front end and the test-suite construct input.

pub mod build;
mod expr;
mod stmt;

use std::fmt;

pub use expr::{BinaryOp, Expr, LitKind, Renamed, UnaryOp, BLANK};
pub use stmt::{
    AssignOp, CaseClause, CommClause, ForStmt, IfStmt, RangeStmt, SelectStmt, Stmt, StmtKind,
    SwitchStmt,
};

/// A source position (1-based line and column; `0:0` when unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A function declaration: the unit every analysis runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    /// Function name
    pub name: String,
    /// Parameter names; their incoming values are version 0 in SSA form
    pub params: Vec<String>,
    /// Function body
    pub body: Vec<Stmt>,
    /// Position of the declaration
    pub pos: Position,
}

impl FuncDecl {
    /// Counts all statements in the body, nested ones included.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&Stmt> = self.body.iter().collect();
        while let Some(stmt) = pending.pop() {
            count += 1;
            pending.extend(stmt.children());
        }
        count
    }
}
