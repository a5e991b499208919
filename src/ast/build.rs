//! Constructors for assembling ASTs by hand.
//!
//! ```rust
//! use goscope::ast::build::*;
//!
//! // func f(x) { if x > 0 { y = 1 } else { y = 2 }; return y }
//! let f = func(
//!     "f",
//!     &["x"],
//!     vec![
//!         if_else(
//!             gt(ident("x"), int(0)),
//!             vec![assign("y", int(1))],
//!             vec![assign("y", int(2))],
//!         ),
//!         ret(vec![ident("y")]),
//!     ],
//! );
//! // The if, both branch assignments, the else block and the return.
//! assert_eq!(f.statement_count(), 5);
//! ```

use crate::ast::{
    AssignOp, BinaryOp, CaseClause, CommClause, Expr, ForStmt, FuncDecl, IfStmt, LitKind,
    Position, RangeStmt, SelectStmt, Stmt, StmtKind, SwitchStmt, UnaryOp,
};

/// An identifier.
#[must_use]
pub fn ident(name: &str) -> Expr {
    Expr::Ident(name.to_string())
}

/// An integer literal.
#[must_use]
pub fn int(value: i64) -> Expr {
    Expr::Lit {
        kind: LitKind::Int,
        value: value.to_string(),
    }
}

/// A string literal; `value` is quoted for display.
#[must_use]
pub fn string(value: &str) -> Expr {
    Expr::Lit {
        kind: LitKind::String,
        value: format!("{value:?}"),
    }
}

/// `true` or `false`.
#[must_use]
pub fn boolean(value: bool) -> Expr {
    Expr::Lit {
        kind: LitKind::Bool,
        value: value.to_string(),
    }
}

/// `nil`.
#[must_use]
pub fn nil() -> Expr {
    Expr::Lit {
        kind: LitKind::Nil,
        value: "nil".to_string(),
    }
}

/// `lhs op rhs`.
#[must_use]
pub fn binary(lhs: Expr, op: BinaryOp, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// `lhs + rhs`.
#[must_use]
pub fn add(lhs: Expr, rhs: Expr) -> Expr {
    binary(lhs, BinaryOp::Add, rhs)
}

/// `lhs - rhs`.
#[must_use]
pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
    binary(lhs, BinaryOp::Sub, rhs)
}

/// `lhs * rhs`.
#[must_use]
pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
    binary(lhs, BinaryOp::Mul, rhs)
}

/// `lhs < rhs`.
#[must_use]
pub fn lt(lhs: Expr, rhs: Expr) -> Expr {
    binary(lhs, BinaryOp::Lt, rhs)
}

/// `lhs > rhs`.
#[must_use]
pub fn gt(lhs: Expr, rhs: Expr) -> Expr {
    binary(lhs, BinaryOp::Gt, rhs)
}

/// `lhs == rhs`.
#[must_use]
pub fn eq(lhs: Expr, rhs: Expr) -> Expr {
    binary(lhs, BinaryOp::Eq, rhs)
}

/// `op operand`.
#[must_use]
pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary {
        op,
        operand: Box::new(operand),
    }
}

/// `-operand`.
#[must_use]
pub fn neg(operand: Expr) -> Expr {
    unary(UnaryOp::Neg, operand)
}

/// `<-channel`.
#[must_use]
pub fn recv(channel: Expr) -> Expr {
    unary(UnaryOp::Recv, channel)
}

/// `name(args...)`.
#[must_use]
pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        func: Box::new(ident(name)),
        args,
    }
}

/// `base[idx]`.
#[must_use]
pub fn index(base: Expr, idx: Expr) -> Expr {
    Expr::Index {
        base: Box::new(base),
        index: Box::new(idx),
    }
}

/// `base.field`.
#[must_use]
pub fn selector(base: Expr, field: &str) -> Expr {
    Expr::Selector {
        base: Box::new(base),
        field: field.to_string(),
    }
}

/// `(inner)`.
#[must_use]
pub fn paren(inner: Expr) -> Expr {
    Expr::Paren(Box::new(inner))
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind)
}

/// An expression statement.
#[must_use]
pub fn expr_stmt(expr: Expr) -> Stmt {
    stmt(StmtKind::Expr(expr))
}

/// `lhs op rhs` with arbitrary targets.
#[must_use]
pub fn assign_to(lhs: Vec<Expr>, op: AssignOp, rhs: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Assign { lhs, op, rhs })
}

/// `name = value`.
#[must_use]
pub fn assign(name: &str, value: Expr) -> Stmt {
    assign_to(vec![ident(name)], AssignOp::Assign, vec![value])
}

/// `name := value`.
#[must_use]
pub fn define(name: &str, value: Expr) -> Stmt {
    assign_to(vec![ident(name)], AssignOp::Define, vec![value])
}

/// `name op= value`.
#[must_use]
pub fn compound(name: &str, op: BinaryOp, value: Expr) -> Stmt {
    assign_to(vec![ident(name)], AssignOp::Compound(op), vec![value])
}

/// `name++`.
#[must_use]
pub fn inc(name: &str) -> Stmt {
    stmt(StmtKind::IncDec {
        target: ident(name),
        increment: true,
    })
}

/// `name--`.
#[must_use]
pub fn dec(name: &str) -> Stmt {
    stmt(StmtKind::IncDec {
        target: ident(name),
        increment: false,
    })
}

/// `var names [= values]`.
#[must_use]
pub fn var_decl(names: &[&str], values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Decl {
        names: names.iter().map(ToString::to_string).collect(),
        values,
    })
}

/// `channel <- value`.
#[must_use]
pub fn send(channel: Expr, value: Expr) -> Stmt {
    stmt(StmtKind::Send { channel, value })
}

/// `if cond { then }`.
#[must_use]
pub fn if_stmt(cond: Expr, then: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If(IfStmt {
        init: None,
        cond,
        then,
        els: None,
    }))
}

/// `if cond { then } else { els }`.
#[must_use]
pub fn if_else(cond: Expr, then: Vec<Stmt>, els: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If(IfStmt {
        init: None,
        cond,
        then,
        els: Some(Box::new(block(els))),
    }))
}

/// `if cond { then } else if ...`.
#[must_use]
pub fn if_else_if(cond: Expr, then: Vec<Stmt>, else_if: Stmt) -> Stmt {
    stmt(StmtKind::If(IfStmt {
        init: None,
        cond,
        then,
        els: Some(Box::new(else_if)),
    }))
}

/// `if init; cond { then }`.
#[must_use]
pub fn if_init(init: Stmt, cond: Expr, then: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::If(IfStmt {
        init: Some(Box::new(init)),
        cond,
        then,
        els: None,
    }))
}

/// `for init; cond; post { body }` with every clause optional.
#[must_use]
pub fn for_loop(init: Option<Stmt>, cond: Option<Expr>, post: Option<Stmt>, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::For(ForStmt {
        init: init.map(Box::new),
        cond,
        post: post.map(Box::new),
        body,
    }))
}

/// `for cond { body }`.
#[must_use]
pub fn while_loop(cond: Expr, body: Vec<Stmt>) -> Stmt {
    for_loop(None, Some(cond), None, body)
}

/// `for key, value := range collection { body }`.
#[must_use]
pub fn range(key: Option<&str>, value: Option<&str>, collection: Expr, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Range(RangeStmt {
        key: key.map(ToString::to_string),
        value: value.map(ToString::to_string),
        define: true,
        collection,
        body,
    }))
}

/// `switch tag { clauses }`.
#[must_use]
pub fn switch(tag: Option<Expr>, clauses: Vec<CaseClause>) -> Stmt {
    stmt(StmtKind::Switch(SwitchStmt {
        init: None,
        tag,
        clauses,
    }))
}

/// `switch init; tag { clauses }`.
#[must_use]
pub fn switch_init(init: Stmt, tag: Option<Expr>, clauses: Vec<CaseClause>) -> Stmt {
    stmt(StmtKind::Switch(SwitchStmt {
        init: Some(Box::new(init)),
        tag,
        clauses,
    }))
}

/// `case values: body`.
#[must_use]
pub fn case(values: Vec<Expr>, body: Vec<Stmt>) -> CaseClause {
    CaseClause {
        values: Some(values),
        body,
        fallthrough: false,
        pos: Position::default(),
    }
}

/// `case values: body; fallthrough`.
#[must_use]
pub fn case_fallthrough(values: Vec<Expr>, body: Vec<Stmt>) -> CaseClause {
    CaseClause {
        fallthrough: true,
        ..case(values, body)
    }
}

/// `default: body`.
#[must_use]
pub fn default_case(body: Vec<Stmt>) -> CaseClause {
    CaseClause {
        values: None,
        body,
        fallthrough: false,
        pos: Position::default(),
    }
}

/// `select { clauses }`.
#[must_use]
pub fn select(clauses: Vec<CommClause>) -> Stmt {
    stmt(StmtKind::Select(SelectStmt { clauses }))
}

/// `case comm: body` inside a select.
#[must_use]
pub fn comm(comm: Stmt, body: Vec<Stmt>) -> CommClause {
    CommClause {
        comm: Some(Box::new(comm)),
        body,
        pos: Position::default(),
    }
}

/// `default: body` inside a select.
#[must_use]
pub fn default_comm(body: Vec<Stmt>) -> CommClause {
    CommClause {
        comm: None,
        body,
        pos: Position::default(),
    }
}

/// `return values`.
#[must_use]
pub fn ret(values: Vec<Expr>) -> Stmt {
    stmt(StmtKind::Return(values))
}

/// `go call`.
#[must_use]
pub fn go(call: Expr) -> Stmt {
    stmt(StmtKind::Go(call))
}

/// `defer call`.
#[must_use]
pub fn defer(call: Expr) -> Stmt {
    stmt(StmtKind::Defer(call))
}

/// `{ stmts }`.
#[must_use]
pub fn block(stmts: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Block(stmts))
}

/// `break`.
#[must_use]
pub fn brk() -> Stmt {
    stmt(StmtKind::Break(None))
}

/// `break label`.
#[must_use]
pub fn brk_label(label: &str) -> Stmt {
    stmt(StmtKind::Break(Some(label.to_string())))
}

/// `continue`.
#[must_use]
pub fn cont() -> Stmt {
    stmt(StmtKind::Continue(None))
}

/// `continue label`.
#[must_use]
pub fn cont_label(label: &str) -> Stmt {
    stmt(StmtKind::Continue(Some(label.to_string())))
}

/// `goto label`.
#[must_use]
pub fn goto(label: &str) -> Stmt {
    stmt(StmtKind::Goto(label.to_string()))
}

/// `label: inner`.
#[must_use]
pub fn labeled(label: &str, inner: Stmt) -> Stmt {
    stmt(StmtKind::Labeled {
        label: label.to_string(),
        stmt: Box::new(inner),
    })
}

/// The empty statement.
#[must_use]
pub fn empty() -> Stmt {
    stmt(StmtKind::Empty)
}

/// `func name(params) { body }`.
#[must_use]
pub fn func(name: &str, params: &[&str], body: Vec<Stmt>) -> FuncDecl {
    FuncDecl {
        name: name.to_string(),
        params: params.iter().map(ToString::to_string).collect(),
        body,
        pos: Position::default(),
    }
}
