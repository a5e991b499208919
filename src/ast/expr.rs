//! Expression nodes.

use std::fmt::{self, Write};

use strum::{Display, EnumString, IntoStaticStr};

/// Binary operators, displayed as their Go token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[allow(missing_docs)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Rem,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "^")]
    BitXor,
    #[strum(serialize = "&^")]
    AndNot,
    #[strum(serialize = "<<")]
    Shl,
    #[strum(serialize = ">>")]
    Shr,
    #[strum(serialize = "&&")]
    LogicalAnd,
    #[strum(serialize = "||")]
    LogicalOr,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

impl BinaryOp {
    /// Go operator precedence (5 binds tightest).
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::BitAnd
            | BinaryOp::AndNot => 5,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::BitOr | BinaryOp::BitXor => 4,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
            BinaryOp::LogicalAnd => 2,
            BinaryOp::LogicalOr => 1,
        }
    }

    /// Returns `true` if swapping the operands never changes the result.
    ///
    /// `+` is excluded because it also concatenates strings.
    #[must_use]
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinaryOp::Mul
                | BinaryOp::BitAnd
                | BinaryOp::BitOr
                | BinaryOp::BitXor
                | BinaryOp::LogicalAnd
                | BinaryOp::LogicalOr
                | BinaryOp::Eq
                | BinaryOp::Ne
        )
    }
}

/// Unary operators, displayed as their Go token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[allow(missing_docs)]
pub enum UnaryOp {
    #[strum(serialize = "-")]
    Neg,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "^")]
    BitNot,
    #[strum(serialize = "*")]
    Deref,
    #[strum(serialize = "&")]
    AddrOf,
    /// Channel receive `<-ch`
    #[strum(serialize = "<-")]
    Recv,
}

/// Kind of a basic literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum LitKind {
    Int,
    Float,
    String,
    Char,
    Bool,
    Nil,
}

/// An expression of the analysed language.
///
/// Literal values are kept as source text; the analyses never evaluate them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A variable, function or package name
    Ident(String),
    /// A basic literal
    Lit {
        /// Literal kind
        kind: LitKind,
        /// Source text of the literal
        value: String,
    },
    /// `lhs op rhs`
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// `op operand`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// `func(args...)`
    Call {
        /// Callee
        func: Box<Expr>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `base[index]`
    Index {
        /// Indexed value
        base: Box<Expr>,
        /// Index
        index: Box<Expr>,
    },
    /// `base.field`
    Selector {
        /// Selected value
        base: Box<Expr>,
        /// Field or method name (not a variable)
        field: String,
    },
    /// `(inner)`
    Paren(Box<Expr>),
}

/// The blank identifier, which never names a variable.
pub const BLANK: &str = "_";

impl Expr {
    /// Returns the identifier name if this is a plain identifier.
    #[must_use]
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Calls `visit` for every identifier reference, recursively, in occurrence order.
    ///
    /// Selector field names and the blank identifier are skipped.
    pub fn visit_idents<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Ident(name) => {
                if name != BLANK {
                    visit(name.as_str());
                }
            }
            Expr::Lit { .. } => {}
            Expr::Binary { lhs, rhs, .. } => {
                lhs.visit_idents(visit);
                rhs.visit_idents(visit);
            }
            Expr::Unary { operand, .. } => operand.visit_idents(visit),
            Expr::Call { func, args } => {
                func.visit_idents(visit);
                for arg in args {
                    arg.visit_idents(visit);
                }
            }
            Expr::Index { base, index } => {
                base.visit_idents(visit);
                index.visit_idents(visit);
            }
            Expr::Selector { base, .. } => base.visit_idents(visit),
            Expr::Paren(inner) => inner.visit_idents(visit),
        }
    }

    /// Returns the variables this expression reads, without duplicates, in first
    /// occurrence order.
    #[must_use]
    pub fn used_variables(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        self.visit_idents(&mut |name| push_unique(&mut vars, name));
        vars
    }

    /// Returns `true` if evaluating the expression has no side effects and its value
    /// depends only on the variables it names.
    ///
    /// Calls, channel receives, memory reads through index/selector/dereference and
    /// address-of are not referentially transparent.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        match self {
            Expr::Ident(_) | Expr::Lit { .. } => true,
            Expr::Binary { lhs, rhs, .. } => lhs.is_pure() && rhs.is_pure(),
            Expr::Unary { op, operand } => {
                matches!(
                    op,
                    UnaryOp::Neg | UnaryOp::Plus | UnaryOp::Not | UnaryOp::BitNot
                ) && operand.is_pure()
            }
            Expr::Paren(inner) => inner.is_pure(),
            Expr::Call { .. } | Expr::Index { .. } | Expr::Selector { .. } => false,
        }
    }

    /// Returns a displayable view that substitutes identifiers through `rename`.
    ///
    /// Identifiers for which `rename` returns `None` are printed unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use goscope::ast::build::{add, ident, int};
    ///
    /// let expr = add(ident("i"), int(1));
    /// let rename = |name: &str| (name == "i").then(|| "i_2".to_string());
    /// assert_eq!(expr.display_with(&rename).to_string(), "i_2 + 1");
    /// ```
    pub fn display_with<'a>(&'a self, rename: &'a dyn Fn(&str) -> Option<String>) -> Renamed<'a> {
        Renamed { expr: self, rename }
    }

    fn write_to(&self, out: &mut impl Write, rename: &dyn Fn(&str) -> Option<String>) -> fmt::Result {
        match self {
            Expr::Ident(name) => match rename(name.as_str()) {
                Some(renamed) => out.write_str(&renamed),
                None => out.write_str(name),
            },
            Expr::Lit { value, .. } => out.write_str(value),
            Expr::Binary { op, lhs, rhs } => {
                write_operand(out, lhs, op.precedence(), false, rename)?;
                write!(out, " {op} ")?;
                write_operand(out, rhs, op.precedence(), true, rename)
            }
            Expr::Unary { op, operand } => {
                write!(out, "{op}")?;
                let needs_parens = matches!(**operand, Expr::Binary { .. });
                if needs_parens {
                    out.write_char('(')?;
                }
                operand.write_to(out, rename)?;
                if needs_parens {
                    out.write_char(')')?;
                }
                Ok(())
            }
            Expr::Call { func, args } => {
                func.write_to(out, rename)?;
                out.write_char('(')?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    arg.write_to(out, rename)?;
                }
                out.write_char(')')
            }
            Expr::Index { base, index } => {
                base.write_to(out, rename)?;
                out.write_char('[')?;
                index.write_to(out, rename)?;
                out.write_char(']')
            }
            Expr::Selector { base, field } => {
                base.write_to(out, rename)?;
                write!(out, ".{field}")
            }
            Expr::Paren(inner) => {
                out.write_char('(')?;
                inner.write_to(out, rename)?;
                out.write_char(')')
            }
        }
    }
}

fn write_operand(
    out: &mut impl Write,
    operand: &Expr,
    parent: u8,
    right: bool,
    rename: &dyn Fn(&str) -> Option<String>,
) -> fmt::Result {
    let needs_parens = match operand {
        Expr::Binary { op, .. } => op.precedence() < parent || (right && op.precedence() == parent),
        _ => false,
    };
    if needs_parens {
        out.write_char('(')?;
        operand.write_to(out, rename)?;
        out.write_char(')')
    } else {
        operand.write_to(out, rename)
    }
}

pub(crate) fn push_unique<'a>(vars: &mut Vec<&'a str>, name: &'a str) {
    if !vars.contains(&name) {
        vars.push(name);
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, &|_| None)
    }
}

/// Display adapter returned by [`Expr::display_with`].
pub struct Renamed<'a> {
    expr: &'a Expr,
    rename: &'a dyn Fn(&str) -> Option<String>,
}

impl fmt::Display for Renamed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.write_to(f, self.rename)
    }
}
