//! Fixed enumerations of analysis domains.
//!
//! Each table maps the elements of one domain to dense indices `0..len()`, so sets over
//! the domain become [`BitSet`]s. Tables are built once per graph, in block then
//! statement order, which makes the numbering deterministic.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use crate::{
    analysis::ControlFlowGraph,
    ast::{Expr, UnaryOp},
    utils::{graph::NodeId, BitSet},
};

/// The variables of a function, in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl VariableTable {
    /// Collects every variable defined or used by a statement of `cfg`.
    #[must_use]
    pub fn from_cfg(cfg: &ControlFlowGraph<'_>) -> Self {
        let mut names: Vec<String> = Vec::new();
        for block in cfg.blocks() {
            for stmt in &block.stmts {
                names.extend(stmt.used_variables().into_iter().map(str::to_string));
                names.extend(stmt.defined_variables().into_iter().map(str::to_string));
            }
        }
        names.sort();
        names.dedup();
        Self::from_names(names)
    }

    fn from_names(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        VariableTable { names, index }
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the function mentions no variable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Variable at `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// All variables in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }

    /// The variables of `set`.
    #[must_use]
    pub fn names_in(&self, set: &BitSet) -> Vec<&str> {
        set.iter().filter_map(|i| self.name(i)).collect()
    }
}

/// One definition: statement `index` of block `node` assigns `variable`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefinitionSite {
    /// The assigned variable
    pub variable: String,
    /// Defining block
    pub node: NodeId,
    /// Statement index within the block
    pub index: usize,
}

impl DefinitionSite {
    /// Creates a definition site.
    pub fn new(variable: impl Into<String>, node: NodeId, index: usize) -> Self {
        DefinitionSite {
            variable: variable.into(),
            node,
            index,
        }
    }
}

impl fmt::Display for DefinitionSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.variable, self.node, self.index)
    }
}

/// Every definition site of a function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionTable {
    sites: Vec<DefinitionSite>,
    by_variable: BTreeMap<String, Vec<usize>>,
}

impl DefinitionTable {
    /// Enumerates the definitions of `cfg` in block then statement order.
    #[must_use]
    pub fn from_cfg(cfg: &ControlFlowGraph<'_>) -> Self {
        let mut table = DefinitionTable::default();
        for block in cfg.blocks() {
            for (index, stmt) in block.stmts.iter().enumerate() {
                for var in stmt.defined_variables() {
                    let id = table.sites.len();
                    table.sites.push(DefinitionSite::new(var, block.id, index));
                    table.by_variable.entry(var.to_string()).or_default().push(id);
                }
            }
        }
        table
    }

    /// Number of definition sites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns `true` if the function assigns nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Site at `index`.
    #[must_use]
    pub fn site(&self, index: usize) -> Option<&DefinitionSite> {
        self.sites.get(index)
    }

    /// Indices of the definitions of `variable`.
    #[must_use]
    pub fn indices_of(&self, variable: &str) -> &[usize] {
        self.by_variable.get(variable).map_or(&[], Vec::as_slice)
    }

    /// All sites in index order.
    pub fn iter(&self) -> impl Iterator<Item = &DefinitionSite> + '_ {
        self.sites.iter()
    }

    /// The sites of `set`.
    #[must_use]
    pub fn sites_in(&self, set: &BitSet) -> Vec<&DefinitionSite> {
        set.iter().filter_map(|i| self.site(i)).collect()
    }
}

/// A candidate expression for availability analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionEntry {
    /// Canonical source text
    pub text: String,
    /// Variables the expression reads, sorted
    pub operands: Vec<String>,
}

/// The referentially transparent operator expressions of a function.
///
/// Expressions are identified by canonical text: parentheses are dropped, nested
/// operands are parenthesized, and commutative operators order their operands, so
/// `b * a` and `(a * b)` are the same entry. Calls, receives, index and selector
/// expressions, address-of and dereference never qualify, and neither does anything
/// containing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionTable {
    entries: Vec<ExpressionEntry>,
    index: HashMap<String, usize>,
}

impl ExpressionTable {
    /// Collects the candidate expressions of `cfg`, innermost first.
    #[must_use]
    pub fn from_cfg(cfg: &ControlFlowGraph<'_>) -> Self {
        let mut table = ExpressionTable::default();
        for block in cfg.blocks() {
            for stmt in &block.stmts {
                for expr in stmt.expressions() {
                    for candidate in candidates(expr) {
                        table.intern(candidate);
                    }
                }
            }
        }
        table
    }

    fn intern(&mut self, expr: &Expr) -> usize {
        let text = canonical(expr);
        if let Some(&id) = self.index.get(&text) {
            return id;
        }
        let mut operands: Vec<String> = expr
            .used_variables()
            .into_iter()
            .map(str::to_string)
            .collect();
        operands.sort();
        let id = self.entries.len();
        self.index.insert(text.clone(), id);
        self.entries.push(ExpressionEntry { text, operands });
        id
    }

    /// Number of expressions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the function has no candidate expression.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the expression with canonical text `text`.
    #[must_use]
    pub fn index_of(&self, text: &str) -> Option<usize> {
        self.index.get(text).copied()
    }

    /// Index of `expr`, if it is a known candidate.
    #[must_use]
    pub fn index_of_expr(&self, expr: &Expr) -> Option<usize> {
        self.index_of(&canonical(expr))
    }

    /// Entry at `index`.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&ExpressionEntry> {
        self.entries.get(index)
    }

    /// All entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &ExpressionEntry> + '_ {
        self.entries.iter()
    }

    /// Indices of the expressions reading `variable`.
    pub fn reading(&self, variable: &str) -> impl Iterator<Item = usize> + '_ {
        let variable = variable.to_string();
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, entry)| entry.operands.contains(&variable))
            .map(|(i, _)| i)
    }

    /// The canonical texts of `set`.
    #[must_use]
    pub fn texts_in(&self, set: &BitSet) -> Vec<&str> {
        set.iter()
            .filter_map(|i| self.entry(i))
            .map(|entry| entry.text.as_str())
            .collect()
    }
}

/// The candidate subexpressions of `expr` in evaluation order (operands before the
/// operator that consumes them).
pub(crate) fn candidates(expr: &Expr) -> Vec<&Expr> {
    let mut found = Vec::new();
    collect_candidates(expr, &mut found);
    found
}

fn collect_candidates<'a>(expr: &'a Expr, found: &mut Vec<&'a Expr>) {
    match expr {
        Expr::Ident(_) | Expr::Lit { .. } => {}
        Expr::Binary { lhs, rhs, .. } => {
            collect_candidates(lhs, found);
            collect_candidates(rhs, found);
            if expr.is_pure() {
                found.push(expr);
            }
        }
        Expr::Unary { op, operand } => {
            collect_candidates(operand, found);
            if !matches!(op, UnaryOp::Recv | UnaryOp::Deref | UnaryOp::AddrOf) && expr.is_pure() {
                found.push(expr);
            }
        }
        Expr::Call { func, args } => {
            collect_candidates(func, found);
            for arg in args {
                collect_candidates(arg, found);
            }
        }
        Expr::Index { base, index } => {
            collect_candidates(base, found);
            collect_candidates(index, found);
        }
        Expr::Selector { base, .. } => collect_candidates(base, found),
        Expr::Paren(inner) => collect_candidates(inner, found),
    }
}

/// Canonical text of an expression.
pub(crate) fn canonical(expr: &Expr) -> String {
    match expr {
        Expr::Paren(inner) => canonical(inner),
        Expr::Binary { op, lhs, rhs } => {
            let mut left = operand_text(lhs);
            let mut right = operand_text(rhs);
            if op.is_commutative() && right < left {
                std::mem::swap(&mut left, &mut right);
            }
            format!("{left} {op} {right}")
        }
        Expr::Unary { op, operand } => format!("{op}{}", operand_text(operand)),
        other => other.to_string(),
    }
}

fn operand_text(expr: &Expr) -> String {
    match strip_parens(expr) {
        inner @ (Expr::Binary { .. } | Expr::Unary { .. }) => format!("({})", canonical(inner)),
        inner => canonical(inner),
    }
}

fn strip_parens(mut expr: &Expr) -> &Expr {
    while let Expr::Paren(inner) = expr {
        expr = inner;
    }
    expr
}
