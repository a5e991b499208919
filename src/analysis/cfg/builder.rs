//! Lowering of a function AST into a control flow graph.
//!
//! The builder keeps a cursor on the block currently receiving statements. Simple
//! statements are appended to the cursor; every control construct allocates fresh
//! blocks, wires its edges explicitly and leaves the cursor on the block where execution
//! continues, or clears it when control cannot fall through (`return`, `break`,
//! `continue`, `goto`).
//!
//! # Block Shapes
//!
//! ```text
//!  if            for                  switch
//!
//!  [cond]        [init → cur]         [tag, case values]
//!   |    \          |                   |     |      \
//! [then] [else]  [header] <----+      [c0] → [c1]   (merge when no default)
//!   |    /        |     \      |        |      |      |
//!  [merge]     [body] [exit]  [post]    +--> [merge] <+
//!                 \____________/
//! ```
//!
//! Statements following a jump are placed in `unreachable` blocks. Those, and any other
//! block that ends up without a path from the entry, are pruned once the whole body has
//! been lowered, and the surviving blocks are renumbered in creation order. The function
//! exit is always kept.

use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::{
    analysis::cfg::{BasicBlock, BlockKind, BlockStmt, CfgEdgeKind, ControlFlowGraph},
    ast::{
        CaseClause, CommClause, ForStmt, FuncDecl, IfStmt, Position, RangeStmt, SelectStmt, Stmt,
        StmtKind, SwitchStmt,
    },
    utils::{
        graph::{algorithms, DirectedGraph, NodeId},
        BitSet,
    },
    Result,
};

/// Default limit on how deeply control constructs may nest.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 256;

/// Builds [`ControlFlowGraph`]s from function declarations.
///
/// The builder itself only carries configuration and can be reused for any number of
/// functions.
///
/// # Examples
///
/// ```rust
/// use goscope::{analysis::CfgBuilder, ast::build::*};
///
/// let f = func("f", &["x"], vec![ret(vec![ident("x")])]);
/// let cfg = CfgBuilder::new().with_max_nesting_depth(64).build(&f)?;
///
/// // entry, exit, func_f_entry, return
/// assert_eq!(cfg.block_count(), 4);
/// # Ok::<(), goscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfgBuilder {
    max_nesting_depth: usize,
}

impl Default for CfgBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CfgBuilder {
    /// Creates a builder with the default nesting limit.
    #[must_use]
    pub const fn new() -> Self {
        CfgBuilder {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    /// Sets how deeply control constructs may nest before the body is rejected.
    #[must_use]
    pub const fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// The configured nesting limit.
    #[must_use]
    pub const fn max_nesting_depth(&self) -> usize {
        self.max_nesting_depth
    }

    /// Lowers `func` into a control flow graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAst`](crate::Error::InvalidAst) for an undefined or
    /// duplicate label, a `break`/`continue` without a matching enclosing construct, a
    /// `fallthrough` in the final switch clause, a non-simple init or post statement, or
    /// nesting beyond the configured limit.
    #[instrument(level = "debug", skip_all, fields(function = %func.name))]
    pub fn build<'ast>(&self, func: &'ast FuncDecl) -> Result<ControlFlowGraph<'ast>> {
        let mut lowering = Lowering::new(func, self.max_nesting_depth);
        lowering.lower_stmts(&func.body)?;
        let cfg = lowering.finish()?;
        debug!(
            blocks = cfg.block_count(),
            edges = cfg.edge_count(),
            "built control flow graph"
        );
        Ok(cfg)
    }
}

/// A construct that `break` (and, for loops, `continue`) can target.
struct JumpTarget<'ast> {
    label: Option<&'ast str>,
    break_to: NodeId,
    continue_to: Option<NodeId>,
}

struct LabelInfo {
    block: NodeId,
    defined: bool,
    first_use: Position,
}

/// Mutable state of one lowering run.
struct Lowering<'ast> {
    func: &'ast FuncDecl,
    graph: DirectedGraph<BasicBlock<'ast>, CfgEdgeKind>,
    entry: NodeId,
    exit: NodeId,
    current: Option<NodeId>,
    targets: Vec<JumpTarget<'ast>>,
    labels: HashMap<&'ast str, LabelInfo>,
    /// Label attached to the loop, switch or select about to be lowered
    pending_label: Option<&'ast str>,
    deferred: Vec<NodeId>,
    depth: usize,
    max_depth: usize,
}

impl<'ast> Lowering<'ast> {
    fn new(func: &'ast FuncDecl, max_depth: usize) -> Self {
        let mut lowering = Lowering {
            func,
            graph: DirectedGraph::new(),
            entry: NodeId::new(0),
            exit: NodeId::new(0),
            current: None,
            targets: Vec::new(),
            labels: HashMap::new(),
            pending_label: None,
            deferred: Vec::new(),
            depth: 0,
            max_depth,
        };

        lowering.entry = lowering.new_block(BlockKind::Entry);
        lowering.exit = lowering.new_block(BlockKind::Exit);
        let body = lowering.new_labeled_block(
            BlockKind::FuncEntry,
            format!("func_{}_entry", func.name),
        );
        lowering.connect(lowering.entry, body, CfgEdgeKind::Unconditional);
        lowering.current = Some(body);
        lowering
    }

    fn new_block(&mut self, kind: BlockKind) -> NodeId {
        let id = NodeId::new(self.graph.node_count());
        self.graph.add_node(BasicBlock::new(id, kind))
    }

    fn new_labeled_block(&mut self, kind: BlockKind, label: String) -> NodeId {
        let id = NodeId::new(self.graph.node_count());
        self.graph.add_node(BasicBlock::with_label(id, kind, label))
    }

    /// Adds an edge unless one already connects the two blocks.
    fn connect(&mut self, from: NodeId, to: NodeId, kind: CfgEdgeKind) {
        if self.graph.find_edge(from, to).is_none() {
            // Both endpoints were handed out by this graph.
            let _ = self.graph.add_edge(from, to, kind);
        }
    }

    /// Returns the cursor, opening an `unreachable` block when control cannot reach here.
    fn cursor(&mut self) -> NodeId {
        match self.current {
            Some(block) => block,
            None => {
                let block = self.new_block(BlockKind::Unreachable);
                trace!(%block, "opened unreachable block");
                self.current = Some(block);
                block
            }
        }
    }

    fn push(&mut self, block: NodeId, item: BlockStmt<'ast>) {
        if let Some(data) = self.graph.node_mut(block) {
            data.stmts.push(item);
        }
    }

    /// Continues at `block` if anything flows into it.
    fn join(&mut self, block: NodeId) {
        self.current = (self.graph.in_degree(block) > 0).then_some(block);
    }

    /// Ends the current path with an edge to `target`.
    fn jump(&mut self, target: NodeId, kind: CfgEdgeKind) {
        let from = self.cursor();
        self.connect(from, target, kind);
        self.current = None;
    }

    fn enter(&mut self, pos: Position) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(invalid_ast!(
                pos,
                "control constructs nested deeper than {} levels",
                self.max_depth
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn lower_stmts(&mut self, stmts: &'ast [Stmt]) -> Result<()> {
        for stmt in stmts {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &'ast Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Empty => {}
            StmtKind::Expr(_)
            | StmtKind::Assign { .. }
            | StmtKind::IncDec { .. }
            | StmtKind::Decl { .. }
            | StmtKind::Send { .. } => {
                let block = self.cursor();
                self.push(block, BlockStmt::Stmt(stmt));
            }
            StmtKind::Block(stmts) => {
                self.enter(stmt.pos)?;
                self.lower_stmts(stmts)?;
                self.leave();
            }
            StmtKind::If(if_stmt) => {
                self.enter(stmt.pos)?;
                self.lower_if(if_stmt, stmt.pos)?;
                self.leave();
            }
            StmtKind::For(for_stmt) => {
                self.enter(stmt.pos)?;
                self.lower_for(for_stmt, stmt.pos)?;
                self.leave();
            }
            StmtKind::Range(range) => {
                self.enter(stmt.pos)?;
                self.lower_range(range, stmt.pos)?;
                self.leave();
            }
            StmtKind::Switch(switch) => {
                self.enter(stmt.pos)?;
                self.lower_switch(switch, stmt.pos)?;
                self.leave();
            }
            StmtKind::Select(select) => {
                self.enter(stmt.pos)?;
                self.lower_select(select)?;
                self.leave();
            }
            StmtKind::Return(_) => {
                let from = self.cursor();
                let block = self.new_block(BlockKind::Return);
                self.connect(from, block, CfgEdgeKind::Unconditional);
                self.push(block, BlockStmt::Stmt(stmt));
                self.connect(block, self.exit, CfgEdgeKind::Return);
                self.current = None;
            }
            StmtKind::Go(_) => {
                self.lower_call_site(stmt, BlockKind::GoSpawn, BlockKind::AfterGo);
            }
            StmtKind::Defer(_) => {
                let call = self.lower_call_site(stmt, BlockKind::DeferCall, BlockKind::AfterDefer);
                self.deferred.push(call);
            }
            StmtKind::Break(label) => {
                let target = self.break_target(label.as_deref(), stmt.pos)?;
                self.jump(target, CfgEdgeKind::Break);
            }
            StmtKind::Continue(label) => {
                let target = self.continue_target(label.as_deref(), stmt.pos)?;
                self.jump(target, CfgEdgeKind::Continue);
            }
            StmtKind::Goto(label) => {
                let target = self.label_block(label, stmt.pos);
                self.jump(target, CfgEdgeKind::Goto);
            }
            StmtKind::Labeled { label, stmt: inner } => {
                self.lower_labeled(label, inner, stmt.pos)?;
            }
        }
        Ok(())
    }

    /// Lowers `go`/`defer` into a call block followed by a continuation block; returns the
    /// call block.
    fn lower_call_site(&mut self, stmt: &'ast Stmt, call: BlockKind, after: BlockKind) -> NodeId {
        let from = self.cursor();
        let call_block = self.new_block(call);
        self.connect(from, call_block, CfgEdgeKind::Unconditional);
        self.push(call_block, BlockStmt::Stmt(stmt));
        let after_block = self.new_block(after);
        self.connect(call_block, after_block, CfgEdgeKind::Unconditional);
        self.current = Some(after_block);
        call_block
    }

    /// Lowers an init or post clause, which must be a simple statement.
    fn lower_clause(&mut self, stmt: &'ast Stmt, construct: &str) -> Result<()> {
        if !stmt.is_simple() {
            return Err(invalid_ast!(
                stmt.pos,
                "{construct} clause must be a simple statement, found {}",
                stmt.kind_name()
            ));
        }
        self.lower_stmt(stmt)
    }

    /// Lowers an `if` and its `else if` chain. The chain is walked in a loop, so each arm
    /// sits at the nesting depth of the first one.
    fn lower_if(&mut self, stmt: &'ast IfStmt, pos: Position) -> Result<()> {
        let mut arm = stmt;
        let mut arm_pos = pos;
        let mut merges = Vec::new();
        let mut else_tail = false;

        loop {
            let from = self.cursor();
            let cond = self.new_block(BlockKind::IfCond);
            self.connect(from, cond, CfgEdgeKind::Unconditional);

            self.current = Some(cond);
            if let Some(init) = &arm.init {
                self.lower_clause(init, "if init")?;
            }
            self.push(cond, BlockStmt::Expr(&arm.cond, arm_pos));

            let then = self.new_block(BlockKind::IfThen);
            let els = arm.els.as_ref().map(|_| self.new_block(BlockKind::IfElse));
            let merge = self.new_block(BlockKind::IfMerge);
            merges.push(merge);

            self.connect(cond, then, CfgEdgeKind::ConditionalTrue);
            self.connect(cond, els.unwrap_or(merge), CfgEdgeKind::ConditionalFalse);

            self.current = Some(then);
            self.lower_stmts(&arm.then)?;
            if let Some(end) = self.current {
                self.connect(end, merge, CfgEdgeKind::Unconditional);
            }

            let (Some(block), Some(else_stmt)) = (els, arm.els.as_deref()) else {
                break;
            };
            self.current = Some(block);
            if let StmtKind::If(next) = &else_stmt.kind {
                arm = next;
                arm_pos = else_stmt.pos;
                continue;
            }
            self.lower_stmt(else_stmt)?;
            else_tail = true;
            break;
        }

        // Innermost arm first; each merge flows into the merge of the arm around it.
        while let Some(merge) = merges.pop() {
            if else_tail {
                if let Some(end) = self.current {
                    self.connect(end, merge, CfgEdgeKind::Unconditional);
                }
            }
            else_tail = true;
            self.join(merge);
        }
        Ok(())
    }

    fn lower_for(&mut self, stmt: &'ast ForStmt, pos: Position) -> Result<()> {
        let label = self.pending_label.take();
        if let Some(init) = &stmt.init {
            self.lower_clause(init, "for init")?;
        }
        let from = self.cursor();

        let header = self.new_block(BlockKind::ForHeader);
        let body = self.new_block(BlockKind::ForBody);
        let post = stmt.post.as_ref().map(|_| self.new_block(BlockKind::ForPost));
        let exit = self.new_block(BlockKind::ForExit);

        self.connect(from, header, CfgEdgeKind::Unconditional);
        if let Some(cond) = &stmt.cond {
            self.push(header, BlockStmt::Expr(cond, pos));
        }
        self.connect(header, body, CfgEdgeKind::ConditionalTrue);
        self.connect(header, exit, CfgEdgeKind::ConditionalFalse);

        self.targets.push(JumpTarget {
            label,
            break_to: exit,
            continue_to: Some(post.unwrap_or(header)),
        });
        self.current = Some(body);
        self.lower_stmts(&stmt.body)?;
        self.targets.pop();

        match (post, &stmt.post) {
            (Some(post_block), Some(post_stmt)) => {
                if let Some(end) = self.current {
                    self.connect(end, post_block, CfgEdgeKind::Unconditional);
                }
                self.current = Some(post_block);
                self.lower_clause(post_stmt, "for post")?;
                self.connect(post_block, header, CfgEdgeKind::Back);
            }
            _ => {
                if let Some(end) = self.current {
                    self.connect(end, header, CfgEdgeKind::Back);
                }
            }
        }

        self.current = Some(exit);
        Ok(())
    }

    fn lower_range(&mut self, stmt: &'ast RangeStmt, pos: Position) -> Result<()> {
        let label = self.pending_label.take();
        let from = self.cursor();

        let header = self.new_block(BlockKind::RangeHeader);
        let body = self.new_block(BlockKind::RangeBody);
        let exit = self.new_block(BlockKind::RangeExit);

        self.connect(from, header, CfgEdgeKind::Unconditional);
        self.push(header, BlockStmt::Range(stmt, pos));
        self.connect(header, body, CfgEdgeKind::ConditionalTrue);
        self.connect(header, exit, CfgEdgeKind::ConditionalFalse);

        self.targets.push(JumpTarget {
            label,
            break_to: exit,
            continue_to: Some(header),
        });
        self.current = Some(body);
        self.lower_stmts(&stmt.body)?;
        self.targets.pop();

        if let Some(end) = self.current {
            self.connect(end, header, CfgEdgeKind::Back);
        }
        self.current = Some(exit);
        Ok(())
    }

    fn lower_switch(&mut self, stmt: &'ast SwitchStmt, pos: Position) -> Result<()> {
        let label = self.pending_label.take();
        if let Some(last) = stmt.clauses.last().filter(|clause| clause.fallthrough) {
            return Err(invalid_ast!(
                last.pos,
                "cannot fallthrough final case in switch"
            ));
        }

        if let Some(init) = &stmt.init {
            self.lower_clause(init, "switch init")?;
        }
        let from = self.cursor();
        let header = self.new_block(BlockKind::SwitchHeader);
        self.connect(from, header, CfgEdgeKind::Unconditional);

        if let Some(tag) = &stmt.tag {
            self.push(header, BlockStmt::Expr(tag, pos));
        }
        for clause in &stmt.clauses {
            for value in clause.values.iter().flatten() {
                self.push(header, BlockStmt::Expr(value, clause.pos));
            }
        }

        let cases: Vec<NodeId> = stmt
            .clauses
            .iter()
            .map(|_| self.new_block(BlockKind::SwitchCase))
            .collect();
        let merge = self.new_block(BlockKind::SwitchMerge);

        for (index, (clause, &case)) in stmt.clauses.iter().zip(&cases).enumerate() {
            self.connect(header, case, case_edge(clause.is_default(), index));
        }
        if !stmt.clauses.iter().any(CaseClause::is_default) {
            self.connect(header, merge, CfgEdgeKind::Default);
        }

        self.targets.push(JumpTarget {
            label,
            break_to: merge,
            continue_to: None,
        });
        for (index, clause) in stmt.clauses.iter().enumerate() {
            self.current = Some(cases[index]);
            self.lower_stmts(&clause.body)?;
            if let Some(end) = self.current {
                match cases.get(index + 1).filter(|_| clause.fallthrough) {
                    Some(&next) => self.connect(end, next, CfgEdgeKind::Fallthrough),
                    None => self.connect(end, merge, CfgEdgeKind::Unconditional),
                }
            }
        }
        self.targets.pop();

        self.join(merge);
        Ok(())
    }

    fn lower_select(&mut self, stmt: &'ast SelectStmt) -> Result<()> {
        let label = self.pending_label.take();
        let from = self.cursor();
        let header = self.new_block(BlockKind::SelectHeader);
        self.connect(from, header, CfgEdgeKind::Unconditional);

        let cases: Vec<NodeId> = stmt
            .clauses
            .iter()
            .map(|_| self.new_block(BlockKind::SelectCase))
            .collect();
        let merge = self.new_block(BlockKind::SelectMerge);

        for (index, (clause, &case)) in stmt.clauses.iter().zip(&cases).enumerate() {
            self.connect(header, case, case_edge(clause.comm.is_none(), index));
        }
        if stmt.clauses.is_empty() {
            self.connect(header, merge, CfgEdgeKind::Unconditional);
        }

        self.targets.push(JumpTarget {
            label,
            break_to: merge,
            continue_to: None,
        });
        for (clause, &case) in stmt.clauses.iter().zip(&cases) {
            self.current = Some(case);
            self.lower_comm_clause(clause)?;
            if let Some(end) = self.current {
                self.connect(end, merge, CfgEdgeKind::Unconditional);
            }
        }
        self.targets.pop();

        self.join(merge);
        Ok(())
    }

    fn lower_comm_clause(&mut self, clause: &'ast CommClause) -> Result<()> {
        if let Some(comm) = &clause.comm {
            self.lower_clause(comm, "select case")?;
        }
        self.lower_stmts(&clause.body)
    }

    fn lower_labeled(&mut self, label: &'ast str, inner: &'ast Stmt, pos: Position) -> Result<()> {
        let block = self.label_block(label, pos);
        if let Some(info) = self.labels.get_mut(label) {
            if info.defined {
                return Err(invalid_ast!(pos, "label {} already defined", label));
            }
            info.defined = true;
        }

        if let Some(from) = self.current {
            self.connect(from, block, CfgEdgeKind::Unconditional);
        }
        self.current = Some(block);

        if matches!(
            inner.kind,
            StmtKind::For(_) | StmtKind::Range(_) | StmtKind::Switch(_) | StmtKind::Select(_)
        ) {
            self.pending_label = Some(label);
        }
        self.lower_stmt(inner)
    }

    /// Returns the block of `label`, creating it on first mention.
    fn label_block(&mut self, label: &'ast str, pos: Position) -> NodeId {
        if let Some(info) = self.labels.get(label) {
            return info.block;
        }
        let block = self.new_labeled_block(BlockKind::Label, format!("label_{label}"));
        self.labels.insert(
            label,
            LabelInfo {
                block,
                defined: false,
                first_use: pos,
            },
        );
        block
    }

    fn break_target(&self, label: Option<&str>, pos: Position) -> Result<NodeId> {
        let found = match label {
            None => self.targets.last(),
            Some(name) => self.targets.iter().rev().find(|t| t.label == Some(name)),
        };
        match (found, label) {
            (Some(target), _) => Ok(target.break_to),
            (None, None) => Err(invalid_ast!(pos, "break is not in a loop, switch, or select")),
            (None, Some(name)) => Err(invalid_ast!(pos, "invalid break label {}", name)),
        }
    }

    fn continue_target(&self, label: Option<&str>, pos: Position) -> Result<NodeId> {
        let found = match label {
            None => self.targets.iter().rev().find(|t| t.continue_to.is_some()),
            Some(name) => self.targets.iter().rev().find(|t| t.label == Some(name)),
        };
        match (found.and_then(|t| t.continue_to), label) {
            (Some(target), _) => Ok(target),
            (None, None) => Err(invalid_ast!(pos, "continue is not in a loop")),
            (None, Some(name)) => Err(invalid_ast!(pos, "invalid continue label {}", name)),
        }
    }

    fn finish(mut self) -> Result<ControlFlowGraph<'ast>> {
        if let Some(end) = self.current.take() {
            self.connect(end, self.exit, CfgEdgeKind::Unconditional);
        }

        if let Some((name, info)) = self
            .labels
            .iter()
            .filter(|(_, info)| !info.defined)
            .min_by_key(|(name, info)| (info.first_use, **name))
        {
            return Err(invalid_ast!(info.first_use, "label {} not defined", name));
        }

        self.prune();
        ControlFlowGraph::new(
            self.func.name.clone(),
            self.graph,
            self.entry,
            self.exit,
            self.deferred,
        )
    }

    /// Drops blocks without a path from the entry and renumbers the rest.
    fn prune(&mut self) {
        let node_count = self.graph.node_count();
        let mut keep = BitSet::new(node_count);
        for node in algorithms::dfs(&self.graph, self.entry) {
            keep.insert(node.index());
        }
        keep.insert(self.exit.index());
        if keep.count() == node_count {
            return;
        }
        debug!(removed = node_count - keep.count(), "pruned unreachable blocks");

        let mut remap = vec![None; node_count];
        for (new_index, old_index) in keep.iter().enumerate() {
            remap[old_index] = Some(NodeId::new(new_index));
        }

        let edges: Vec<(NodeId, NodeId, CfgEdgeKind)> = self
            .graph
            .edges()
            .map(|(source, target, &kind)| (source, target, kind))
            .collect();
        let old = std::mem::take(&mut self.graph);
        let mut graph = DirectedGraph::with_capacity(keep.count(), edges.len());
        for (index, mut block) in old.into_nodes().into_iter().enumerate() {
            if let Some(id) = remap[index] {
                block.id = id;
                graph.add_node(block);
            }
        }
        for (source, target, kind) in edges {
            if let (Some(source), Some(target)) = (remap[source.index()], remap[target.index()]) {
                let _ = graph.add_edge(source, target, kind);
            }
        }

        let renumber = |node: NodeId| remap[node.index()];
        self.entry = renumber(self.entry).unwrap_or(self.entry);
        self.exit = renumber(self.exit).unwrap_or(self.exit);
        self.deferred = self.deferred.iter().filter_map(|&n| renumber(n)).collect();
        self.graph = graph;
    }
}

fn case_edge(is_default: bool, index: usize) -> CfgEdgeKind {
    if is_default {
        CfgEdgeKind::Default
    } else {
        CfgEdgeKind::Case { index }
    }
}
