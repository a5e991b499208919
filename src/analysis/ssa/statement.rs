//! Statements with versioned uses and definitions.

use std::fmt;

use crate::{
    analysis::{cfg::write_range, ssa::SsaName, BlockStmt},
    ast::{AssignOp, BinaryOp, Expr, Stmt, StmtKind, BLANK},
};

/// A block statement together with the SSA names it reads and writes.
///
/// `uses` follow the order of [`BlockStmt::used_variables`] and `defs` the order of
/// [`BlockStmt::defined_variables`]. Uses are resolved before definitions, so in
/// `x = x + 1` the use is the previous version of `x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaStatement<'ast> {
    /// The underlying statement
    pub stmt: BlockStmt<'ast>,
    /// Versions read
    pub uses: Vec<SsaName>,
    /// Versions written
    pub defs: Vec<SsaName>,
}

impl<'ast> SsaStatement<'ast> {
    /// The version of `variable` this statement reads, if any.
    #[must_use]
    pub fn use_of(&self, variable: &str) -> Option<&SsaName> {
        self.uses.iter().find(|name| name.variable == variable)
    }

    /// The version of `variable` this statement defines, if any.
    #[must_use]
    pub fn def_of(&self, variable: &str) -> Option<&SsaName> {
        self.defs.iter().find(|name| name.variable == variable)
    }
}

impl fmt::Display for SsaStatement<'_> {
    /// Renders the statement with every variable replaced by its version.
    ///
    /// Compound assignments and inc/dec are spelled out, e.g. `i_3 = i_2 + 1`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let use_name = |var: &str| self.use_of(var).map(ToString::to_string);
        let def_name = |var: &str| {
            self.def_of(var)
                .map_or_else(|| var.to_string(), ToString::to_string)
        };

        match self.stmt {
            BlockStmt::Expr(expr, _) => write!(f, "{}", expr.display_with(&use_name)),
            BlockStmt::Range(range, _) => write_range(f, range, &def_name, &use_name),
            BlockStmt::Stmt(stmt) => write_stmt(f, stmt, &def_name, &use_name),
        }
    }
}

fn write_stmt(
    f: &mut fmt::Formatter<'_>,
    stmt: &Stmt,
    def_name: &dyn Fn(&str) -> String,
    use_name: &dyn Fn(&str) -> Option<String>,
) -> fmt::Result {
    match &stmt.kind {
        StmtKind::Assign { lhs, op, rhs } => {
            if let (AssignOp::Compound(bin), [Expr::Ident(target)], [value]) =
                (op, lhs.as_slice(), rhs.as_slice())
            {
                return write_update(f, target, *bin, value.clone(), def_name, use_name);
            }
            for (i, target) in lhs.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                match target.as_ident() {
                    Some(name) if name != BLANK => f.write_str(&def_name(name))?,
                    _ => write!(f, "{}", target.display_with(use_name))?,
                }
            }
            write!(f, " {op} ")?;
            write_exprs(f, rhs, use_name)
        }
        StmtKind::IncDec { target, increment } => match target {
            Expr::Ident(name) => {
                let op = if *increment { BinaryOp::Add } else { BinaryOp::Sub };
                let one = Expr::Lit {
                    kind: crate::ast::LitKind::Int,
                    value: "1".to_string(),
                };
                write_update(f, name, op, one, def_name, use_name)
            }
            other => {
                let suffix = if *increment { "++" } else { "--" };
                write!(f, "{}{suffix}", other.display_with(use_name))
            }
        },
        StmtKind::Decl { names, values } => {
            let names: Vec<String> = names
                .iter()
                .map(|name| if name == BLANK { name.clone() } else { def_name(name) })
                .collect();
            write!(f, "var {}", names.join(", "))?;
            if !values.is_empty() {
                f.write_str(" = ")?;
                write_exprs(f, values, use_name)?;
            }
            Ok(())
        }
        StmtKind::Send { channel, value } => write!(
            f,
            "{} <- {}",
            channel.display_with(use_name),
            value.display_with(use_name)
        ),
        StmtKind::Expr(expr) => write!(f, "{}", expr.display_with(use_name)),
        StmtKind::Go(call) => write!(f, "go {}", call.display_with(use_name)),
        StmtKind::Defer(call) => write!(f, "defer {}", call.display_with(use_name)),
        StmtKind::Return(values) => {
            f.write_str("return")?;
            if !values.is_empty() {
                f.write_str(" ")?;
                write_exprs(f, values, use_name)?;
            }
            Ok(())
        }
        _ => write!(f, "{stmt}"),
    }
}

fn write_exprs(
    f: &mut fmt::Formatter<'_>,
    list: &[Expr],
    use_name: &dyn Fn(&str) -> Option<String>,
) -> fmt::Result {
    for (i, expr) in list.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", expr.display_with(use_name))?;
    }
    Ok(())
}

/// Writes `target op= value` as `target_new = target_old op value`.
fn write_update(
    f: &mut fmt::Formatter<'_>,
    target: &str,
    op: BinaryOp,
    value: Expr,
    def_name: &dyn Fn(&str) -> String,
    use_name: &dyn Fn(&str) -> Option<String>,
) -> fmt::Result {
    let update = Expr::Binary {
        op,
        lhs: Box::new(Expr::Ident(target.to_string())),
        rhs: Box::new(value),
    };
    write!(f, "{} = {}", def_name(target), update.display_with(use_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{build::*, Position};

    fn render(stmt: BlockStmt<'_>, uses: &[(&str, u32)], defs: &[(&str, u32)]) -> String {
        let to_names = |list: &[(&str, u32)]| {
            list.iter()
                .map(|&(var, version)| SsaName::new(var, version))
                .collect()
        };
        SsaStatement {
            stmt,
            uses: to_names(uses),
            defs: to_names(defs),
        }
        .to_string()
    }

    #[test]
    fn test_assignment_rendering() {
        let stmt = assign("x", add(ident("x"), int(1)));
        assert_eq!(render(BlockStmt::Stmt(&stmt), &[("x", 1)], &[("x", 2)]), "x_2 = x_1 + 1");
    }

    #[test]
    fn test_compound_and_incdec_rendering() {
        let stmt = compound("s", BinaryOp::Mul, add(ident("a"), int(1)));
        assert_eq!(
            render(BlockStmt::Stmt(&stmt), &[("a", 0), ("s", 2)], &[("s", 3)]),
            "s_3 = s_2 * (a_0 + 1)"
        );

        let stmt = inc("i");
        assert_eq!(render(BlockStmt::Stmt(&stmt), &[("i", 2)], &[("i", 3)]), "i_3 = i_2 + 1");
    }

    #[test]
    fn test_store_and_declaration_rendering() {
        let stmt = assign_to(
            vec![index(ident("a"), ident("i")), ident("_")],
            AssignOp::Assign,
            vec![ident("v"), int(0)],
        );
        assert_eq!(
            render(BlockStmt::Stmt(&stmt), &[("v", 1), ("a", 0), ("i", 4)], &[]),
            "a_0[i_4], _ = v_1, 0"
        );

        let stmt = var_decl(&["p", "q"], vec![]);
        assert_eq!(render(BlockStmt::Stmt(&stmt), &[], &[("p", 1), ("q", 1)]), "var p_1, q_1");
    }

    #[test]
    fn test_condition_and_range_rendering() {
        let cond = lt(ident("i"), ident("n"));
        assert_eq!(
            render(BlockStmt::Expr(&cond, Position::default()), &[("i", 2), ("n", 0)], &[]),
            "i_2 < n_0"
        );

        let stmt = range(Some("k"), None, ident("m"), vec![]);
        let StmtKind::Range(header) = &stmt.kind else {
            panic!("expected a range statement");
        };
        assert_eq!(
            render(BlockStmt::Range(header, Position::default()), &[("m", 0)], &[("k", 2)]),
            "k_2 := range m_0"
        );
    }

    #[test]
    fn test_lookup() {
        let stmt = ret(vec![ident("y")]);
        let ssa = SsaStatement {
            stmt: BlockStmt::Stmt(&stmt),
            uses: vec![SsaName::new("y", 3)],
            defs: vec![],
        };
        assert_eq!(ssa.use_of("y"), Some(&SsaName::new("y", 3)));
        assert_eq!(ssa.def_of("y"), None);
        assert_eq!(ssa.to_string(), "return y_3");
    }
}
