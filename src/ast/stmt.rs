//! Statement nodes and the reader capability the CFG builder relies on.

use std::fmt;

use strum::IntoStaticStr;

use crate::ast::{
    expr::{push_unique, BLANK},
    BinaryOp, Expr, Position,
};

/// Assignment operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `op=`, e.g. `+=`
    Compound(BinaryOp),
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignOp::Assign => f.write_str("="),
            AssignOp::Define => f.write_str(":="),
            AssignOp::Compound(op) => write!(f, "{op}="),
        }
    }
}

/// `if [init;] cond { then } [else ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfStmt {
    /// Optional init statement, scoped to the if
    pub init: Option<Box<Stmt>>,
    /// Branch condition
    pub cond: Expr,
    /// Statements executed when `cond` holds
    pub then: Vec<Stmt>,
    /// Either a [`StmtKind::Block`] or a nested [`StmtKind::If`]
    pub els: Option<Box<Stmt>>,
}

/// `for [init]; [cond]; [post] { body }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForStmt {
    /// Executed once before the loop
    pub init: Option<Box<Stmt>>,
    /// Loop condition; `None` loops until a jump leaves the body
    pub cond: Option<Expr>,
    /// Executed after each iteration
    pub post: Option<Box<Stmt>>,
    /// Loop body
    pub body: Vec<Stmt>,
}

/// `for key, value := range collection { body }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeStmt {
    /// Key/index variable
    pub key: Option<String>,
    /// Value variable
    pub value: Option<String>,
    /// `:=` rather than `=`
    pub define: bool,
    /// The ranged-over expression, evaluated in the loop header
    pub collection: Expr,
    /// Loop body
    pub body: Vec<Stmt>,
}

impl RangeStmt {
    /// Variables assigned by each iteration.
    #[must_use]
    pub fn defined_variables(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        for name in [&self.key, &self.value].into_iter().flatten() {
            if name != BLANK {
                push_unique(&mut vars, name.as_str());
            }
        }
        vars
    }
}

/// One `case` (or `default`) clause of a switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseClause {
    /// Case values; `None` for `default`
    pub values: Option<Vec<Expr>>,
    /// Clause body
    pub body: Vec<Stmt>,
    /// The body ends with `fallthrough`
    pub fallthrough: bool,
    /// Position of the clause
    pub pos: Position,
}

impl CaseClause {
    /// Returns `true` for the `default` clause.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.values.is_none()
    }

    /// Attaches a source position.
    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.pos = Position::new(line, column);
        self
    }
}

/// `switch [init;] [tag] { clauses }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchStmt {
    /// Optional init statement
    pub init: Option<Box<Stmt>>,
    /// Switch tag; `None` for an expressionless switch
    pub tag: Option<Expr>,
    /// Clauses in source order
    pub clauses: Vec<CaseClause>,
}

/// One communication clause of a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommClause {
    /// The send or receive statement; `None` for `default`
    pub comm: Option<Box<Stmt>>,
    /// Clause body
    pub body: Vec<Stmt>,
    /// Position of the clause
    pub pos: Position,
}

/// `select { clauses }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStmt {
    /// Clauses in source order
    pub clauses: Vec<CommClause>,
}

/// Statement variants. The kind name (`kind_name`) is the snake_case variant name.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StmtKind {
    /// An expression evaluated for its effect, usually a call
    Expr(Expr),
    /// `lhs op rhs`
    Assign {
        /// Assigned locations; identifiers define variables
        lhs: Vec<Expr>,
        /// Assignment operator
        op: AssignOp,
        /// Assigned values
        rhs: Vec<Expr>,
    },
    /// `target++` or `target--`
    IncDec {
        /// Updated location
        target: Expr,
        /// `++` rather than `--`
        increment: bool,
    },
    /// `var names [= values]`
    Decl {
        /// Declared variables
        names: Vec<String>,
        /// Initial values, possibly empty
        values: Vec<Expr>,
    },
    /// `channel <- value`
    Send {
        /// Channel
        channel: Expr,
        /// Sent value
        value: Expr,
    },
    /// If statement
    If(IfStmt),
    /// Three-clause or condition-only for loop
    For(ForStmt),
    /// Range loop
    Range(RangeStmt),
    /// Expression switch
    Switch(SwitchStmt),
    /// Select statement
    Select(SelectStmt),
    /// `return exprs`
    Return(Vec<Expr>),
    /// `go call`
    Go(Expr),
    /// `defer call`
    Defer(Expr),
    /// `{ stmts }`
    Block(Vec<Stmt>),
    /// `break [label]`
    Break(Option<String>),
    /// `continue [label]`
    Continue(Option<String>),
    /// `goto label`
    Goto(String),
    /// `label: stmt`
    Labeled {
        /// Label name
        label: String,
        /// Labeled statement
        stmt: Box<Stmt>,
    },
    /// Empty statement
    Empty,
}

/// A statement with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    /// What the statement is
    pub kind: StmtKind,
    /// Where it starts
    pub pos: Position,
}

impl Stmt {
    /// Creates a statement without position information.
    #[must_use]
    pub fn new(kind: StmtKind) -> Self {
        Stmt {
            kind,
            pos: Position::default(),
        }
    }

    /// Attaches a source position.
    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.pos = Position::new(line, column);
        self
    }

    /// The statement kind as a static snake_case name, e.g. `"if"` or `"inc_dec"`.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        (&self.kind).into()
    }

    /// The statement's source position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Returns `true` for statements that do not alter control flow.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::Expr(_)
                | StmtKind::Assign { .. }
                | StmtKind::IncDec { .. }
                | StmtKind::Decl { .. }
                | StmtKind::Send { .. }
                | StmtKind::Empty
        )
    }

    /// Directly nested statements, in source order.
    #[must_use]
    pub fn children(&self) -> Vec<&Stmt> {
        let mut out: Vec<&Stmt> = Vec::new();
        match &self.kind {
            StmtKind::If(stmt) => {
                out.extend(stmt.init.as_deref());
                out.extend(&stmt.then);
                out.extend(stmt.els.as_deref());
            }
            StmtKind::For(stmt) => {
                out.extend(stmt.init.as_deref());
                out.extend(stmt.post.as_deref());
                out.extend(&stmt.body);
            }
            StmtKind::Range(stmt) => out.extend(&stmt.body),
            StmtKind::Switch(stmt) => {
                out.extend(stmt.init.as_deref());
                for clause in &stmt.clauses {
                    out.extend(&clause.body);
                }
            }
            StmtKind::Select(stmt) => {
                for clause in &stmt.clauses {
                    out.extend(clause.comm.as_deref());
                    out.extend(&clause.body);
                }
            }
            StmtKind::Block(stmts) => out.extend(stmts),
            StmtKind::Labeled { stmt, .. } => out.push(stmt),
            _ => {}
        }
        out
    }

    /// Variables this statement itself assigns, without duplicates.
    ///
    /// For compound statements only the header counts (the key/value of a range loop);
    /// nested statements are reported through [`children`](Self::children).
    #[must_use]
    pub fn defined_variables(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        match &self.kind {
            StmtKind::Assign { lhs, .. } => {
                for target in lhs {
                    if let Some(name) = target.as_ident().filter(|&n| n != BLANK) {
                        push_unique(&mut vars, name);
                    }
                }
            }
            StmtKind::IncDec { target, .. } => {
                if let Some(name) = target.as_ident().filter(|&n| n != BLANK) {
                    push_unique(&mut vars, name);
                }
            }
            StmtKind::Decl { names, .. } => {
                for name in names.iter().filter(|n| *n != BLANK) {
                    push_unique(&mut vars, name.as_str());
                }
            }
            StmtKind::Range(range) => vars = range.defined_variables(),
            _ => {}
        }
        vars
    }

    /// Variables this statement itself reads, without duplicates, in evaluation order.
    ///
    /// Compound assignments and inc/dec read their target before writing it; stores
    /// through an index or selector read the base and index. For compound statements
    /// only the header expression counts.
    #[must_use]
    pub fn used_variables(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        match &self.kind {
            StmtKind::Expr(expr) | StmtKind::Go(expr) | StmtKind::Defer(expr) => {
                collect(&mut vars, [expr]);
            }
            StmtKind::Assign { lhs, op, rhs } => {
                collect(&mut vars, rhs);
                for target in lhs {
                    match target {
                        Expr::Ident(_) => {
                            if matches!(op, AssignOp::Compound(_)) {
                                collect(&mut vars, [target]);
                            }
                        }
                        store => collect(&mut vars, [store]),
                    }
                }
            }
            StmtKind::IncDec { target, .. } => collect(&mut vars, [target]),
            StmtKind::Decl { values, .. } => collect(&mut vars, values),
            StmtKind::Send { channel, value } => collect(&mut vars, [channel, value]),
            StmtKind::Return(values) => collect(&mut vars, values),
            StmtKind::If(stmt) => collect(&mut vars, [&stmt.cond]),
            StmtKind::For(stmt) => collect(&mut vars, stmt.cond.as_ref()),
            StmtKind::Range(stmt) => collect(&mut vars, [&stmt.collection]),
            StmtKind::Switch(stmt) => collect(&mut vars, stmt.tag.as_ref()),
            _ => {}
        }
        vars
    }
}

fn collect<'a>(vars: &mut Vec<&'a str>, exprs: impl IntoIterator<Item = &'a Expr>) {
    for expr in exprs {
        expr.visit_idents(&mut |name| push_unique(vars, name));
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{expr}")?;
    }
    Ok(())
}

impl fmt::Display for Stmt {
    /// Renders simple statements as source; compound statements as their header.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::Expr(expr) => write!(f, "{expr}"),
            StmtKind::Assign { lhs, op, rhs } => {
                write_list(f, lhs)?;
                write!(f, " {op} ")?;
                write_list(f, rhs)
            }
            StmtKind::IncDec { target, increment } => {
                write!(f, "{target}{}", if *increment { "++" } else { "--" })
            }
            StmtKind::Decl { names, values } => {
                write!(f, "var {}", names.join(", "))?;
                if !values.is_empty() {
                    f.write_str(" = ")?;
                    write_list(f, values)?;
                }
                Ok(())
            }
            StmtKind::Send { channel, value } => write!(f, "{channel} <- {value}"),
            StmtKind::If(stmt) => write!(f, "if {}", stmt.cond),
            StmtKind::For(stmt) => match &stmt.cond {
                Some(cond) => write!(f, "for {cond}"),
                None => f.write_str("for"),
            },
            StmtKind::Range(stmt) => {
                let vars: Vec<&str> = [&stmt.key, &stmt.value]
                    .into_iter()
                    .flatten()
                    .map(String::as_str)
                    .collect();
                if vars.is_empty() {
                    write!(f, "range {}", stmt.collection)
                } else {
                    let op = if stmt.define { ":=" } else { "=" };
                    write!(f, "{} {op} range {}", vars.join(", "), stmt.collection)
                }
            }
            StmtKind::Switch(stmt) => match &stmt.tag {
                Some(tag) => write!(f, "switch {tag}"),
                None => f.write_str("switch"),
            },
            StmtKind::Select(_) => f.write_str("select"),
            StmtKind::Return(values) => {
                f.write_str("return")?;
                if !values.is_empty() {
                    f.write_str(" ")?;
                    write_list(f, values)?;
                }
                Ok(())
            }
            StmtKind::Go(call) => write!(f, "go {call}"),
            StmtKind::Defer(call) => write!(f, "defer {call}"),
            StmtKind::Block(_) => f.write_str("{ ... }"),
            StmtKind::Break(label) => write_jump(f, "break", label.as_deref()),
            StmtKind::Continue(label) => write_jump(f, "continue", label.as_deref()),
            StmtKind::Goto(label) => write!(f, "goto {label}"),
            StmtKind::Labeled { label, .. } => write!(f, "{label}:"),
            StmtKind::Empty => Ok(()),
        }
    }
}

fn write_jump(f: &mut fmt::Formatter<'_>, keyword: &str, label: Option<&str>) -> fmt::Result {
    match label {
        Some(label) => write!(f, "{keyword} {label}"),
        None => f.write_str(keyword),
    }
}
