//! Basic blocks and the statements they reference.

use std::fmt;

use strum::{Display, EnumIter, IntoStaticStr};

use crate::{
    ast::{Expr, Position, RangeStmt, Stmt},
    utils::graph::NodeId,
};

/// Where a block came from.
///
/// The snake_case name of the variant is the default block label; see
/// [`BasicBlock::label`] for the two exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[allow(missing_docs)]
pub enum BlockKind {
    Entry,
    Exit,
    FuncEntry,
    IfCond,
    IfThen,
    IfElse,
    IfMerge,
    ForHeader,
    ForBody,
    ForPost,
    ForExit,
    RangeHeader,
    RangeBody,
    RangeExit,
    SwitchHeader,
    SwitchCase,
    SwitchMerge,
    SelectHeader,
    SelectCase,
    SelectMerge,
    Return,
    GoSpawn,
    AfterGo,
    DeferCall,
    AfterDefer,
    Label,
    Unreachable,
}

impl BlockKind {
    /// Returns `true` for blocks that evaluate a loop condition or range header.
    #[must_use]
    pub const fn is_loop_header(self) -> bool {
        matches!(self, Self::ForHeader | Self::RangeHeader)
    }

    /// Graphviz fill colour used when rendering blocks of this kind.
    #[must_use]
    pub const fn fill_color(self) -> &'static str {
        match self {
            Self::Entry => "lightgreen",
            Self::Exit => "lightcoral",
            Self::IfCond => "lightyellow",
            Self::IfThen => "lightblue",
            Self::IfElse => "lightcyan",
            Self::ForHeader | Self::RangeHeader => "lightpink",
            Self::ForBody | Self::RangeBody => "lavender",
            Self::SwitchHeader | Self::SelectHeader => "lightgoldenrodyellow",
            Self::SwitchCase | Self::SelectCase => "lightsteelblue",
            Self::Return => "lightsalmon",
            Self::GoSpawn | Self::AfterGo => "palegreen",
            Self::DeferCall | Self::AfterDefer => "peachpuff",
            Self::Unreachable => "lightgray",
            _ => "white",
        }
    }
}

/// A statement recorded in a basic block.
///
/// Blocks never own AST nodes; they reference the tree handed to the builder, which
/// must outlive the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStmt<'ast> {
    /// A simple statement, `return`, `go`, `defer`, or the communication of a select clause
    Stmt(&'ast Stmt),
    /// An evaluated expression: a condition, switch tag or case value
    Expr(&'ast Expr, Position),
    /// The per-iteration step of a range loop: assigns key/value, reads the collection
    Range(&'ast RangeStmt, Position),
}

impl<'ast> BlockStmt<'ast> {
    /// Variables assigned, in order, without duplicates.
    #[must_use]
    pub fn defined_variables(&self) -> Vec<&'ast str> {
        match *self {
            BlockStmt::Stmt(stmt) => stmt.defined_variables(),
            BlockStmt::Expr(..) => Vec::new(),
            BlockStmt::Range(range, _) => range.defined_variables(),
        }
    }

    /// Variables read, in evaluation order, without duplicates.
    #[must_use]
    pub fn used_variables(&self) -> Vec<&'ast str> {
        match *self {
            BlockStmt::Stmt(stmt) => stmt.used_variables(),
            BlockStmt::Expr(expr, _) => expr.used_variables(),
            BlockStmt::Range(range, _) => range.collection.used_variables(),
        }
    }

    /// Expressions evaluated by this statement, outermost first.
    ///
    /// Used to enumerate candidate subexpressions; nested statements are not included.
    #[must_use]
    pub fn expressions(&self) -> Vec<&'ast Expr> {
        use crate::ast::StmtKind;

        match *self {
            BlockStmt::Expr(expr, _) => vec![expr],
            BlockStmt::Range(range, _) => vec![&range.collection],
            BlockStmt::Stmt(stmt) => match &stmt.kind {
                StmtKind::Expr(expr) | StmtKind::Go(expr) | StmtKind::Defer(expr) => vec![expr],
                StmtKind::Assign { lhs, rhs, .. } => rhs
                    .iter()
                    .chain(lhs.iter().filter(|target| target.as_ident().is_none()))
                    .collect(),
                StmtKind::Decl { values, .. } | StmtKind::Return(values) => values.iter().collect(),
                StmtKind::Send { channel, value } => vec![channel, value],
                StmtKind::IncDec { target, .. } => vec![target],
                _ => Vec::new(),
            },
        }
    }

    /// Source position.
    #[must_use]
    pub fn position(&self) -> Position {
        match *self {
            BlockStmt::Stmt(stmt) => stmt.position(),
            BlockStmt::Expr(_, pos) | BlockStmt::Range(_, pos) => pos,
        }
    }
}

impl fmt::Display for BlockStmt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStmt::Stmt(stmt) => write!(f, "{stmt}"),
            BlockStmt::Expr(expr, _) => write!(f, "{expr}"),
            BlockStmt::Range(range, _) => write_range(f, range, &|name| name.to_string(), &|_| None),
        }
    }
}

/// Writes a range header, e.g. `i, v := range xs`, naming the assigned variables through
/// `def_name` and the collection's identifiers through `rename_use`.
pub(crate) fn write_range(
    f: &mut fmt::Formatter<'_>,
    range: &RangeStmt,
    def_name: &dyn Fn(&str) -> String,
    rename_use: &dyn Fn(&str) -> Option<String>,
) -> fmt::Result {
    let vars: Vec<String> = [&range.key, &range.value]
        .into_iter()
        .flatten()
        .map(|var| def_name(var))
        .collect();
    if !vars.is_empty() {
        let op = if range.define { ":=" } else { "=" };
        write!(f, "{} {op} ", vars.join(", "))?;
    }
    write!(f, "range {}", range.collection.display_with(rename_use))
}

/// A basic block: a maximal straight-line sequence of statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock<'ast> {
    /// Position of the block in its graph
    pub id: NodeId,
    /// Origin of the block
    pub kind: BlockKind,
    /// Human-readable origin, e.g. `if_then`, `func_main_entry` or `label_loop`
    pub label: String,
    /// Statements in execution order; empty for pure join or split blocks
    pub stmts: Vec<BlockStmt<'ast>>,
}

impl<'ast> BasicBlock<'ast> {
    /// Creates an empty block labelled by its kind.
    #[must_use]
    pub fn new(id: NodeId, kind: BlockKind) -> Self {
        BasicBlock {
            id,
            kind,
            label: kind.to_string(),
            stmts: Vec::new(),
        }
    }

    /// Creates an empty block with an explicit label.
    #[must_use]
    pub fn with_label(id: NodeId, kind: BlockKind, label: impl Into<String>) -> Self {
        BasicBlock {
            id,
            kind,
            label: label.into(),
            stmts: Vec::new(),
        }
    }

    /// Returns `true` if the block holds no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stmts.len()
    }
}
