//! Control Flow Graph implementation.
//!
//! This module provides the main [`ControlFlowGraph`] structure that wraps basic blocks
//! with proper graph semantics and provides access to dominator trees, loops, and traversals.

use std::{collections::BTreeSet, fmt::Write, sync::OnceLock};

use crate::{
    analysis::cfg::{BasicBlock, BlockKind, CfgEdgeKind},
    utils::{
        escape_dot,
        graph::{
            algorithms::{self, DominatorTree},
            DirectedGraph, GraphBase, NodeId, Predecessors, RootedGraph, Successors,
        },
    },
    Error, Result,
};

/// Information about a natural loop in the control flow graph.
///
/// A natural loop is a strongly connected region in the CFG with a single entry point
/// (the header). Back edges are edges from within the loop to the header.
///
/// # Examples
///
/// ```rust
/// use goscope::{ast::build::*, build_cfg};
///
/// let f = func("f", &[], vec![while_loop(lt(ident("i"), int(10)), vec![inc("i")])]);
/// let cfg = build_cfg(&f)?;
/// let natural_loop = &cfg.loops()[0];
/// assert_eq!(natural_loop.size(), 2);
/// assert_eq!(natural_loop.depth, 0);
/// # Ok::<(), goscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalLoop {
    /// The header block of the loop (single entry point).
    pub header: NodeId,
    /// All blocks that are part of the loop body (including the header).
    pub body: BTreeSet<NodeId>,
    /// Sources of the back edges into the header.
    pub back_edges: Vec<NodeId>,
    /// Depth of this loop in the loop nest (0 = outermost).
    pub depth: usize,
}

impl NaturalLoop {
    fn new(header: NodeId) -> Self {
        NaturalLoop {
            header,
            body: BTreeSet::from([header]),
            back_edges: Vec::new(),
            depth: 0,
        }
    }

    /// Returns true if this loop contains the given block.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.body.contains(&node)
    }

    /// Returns the number of blocks in the loop body, including the header.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// Summary metrics of a control flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CfgStats {
    /// Number of blocks
    pub node_count: usize,
    /// Number of edges
    pub edge_count: usize,
    /// Longest shortest-path distance (in edges) from the entry to any block
    pub max_depth: usize,
    /// Number of natural loops
    pub loop_count: usize,
    /// Number of blocks with two or more successors
    pub branch_count: usize,
}

/// A control flow graph for one function.
///
/// Blocks are stored in an arena and identified by [`NodeId`]; ids are dense and follow
/// block creation order, with the entry at 0 and the exit at 1 for graphs produced by
/// the [`CfgBuilder`](crate::analysis::CfgBuilder). Blocks reference, and never own,
/// the AST they were built from, which is why the graph borrows it for `'ast`.
///
/// # Lazy Computation
///
/// The dominator tree and the natural loops are computed on first access and cached.
/// Both use [`OnceLock`], so a shared graph can be queried from several threads.
///
/// # Examples
///
/// ```rust
/// use goscope::{ast::build::*, build_cfg};
///
/// let f = func("f", &["x"], vec![if_stmt(ident("x"), vec![assign("y", int(1))])]);
/// let cfg = build_cfg(&f)?;
///
/// for block_id in cfg.reverse_postorder() {
///     let block = cfg.block(block_id).unwrap();
///     println!("{block_id}: {} ({} statements)", block.label, block.stmts.len());
/// }
/// assert!(cfg.dominators().dominates(cfg.entry(), cfg.exit()));
/// # Ok::<(), goscope::Error>(())
/// ```
#[derive(Debug)]
pub struct ControlFlowGraph<'ast> {
    /// Name of the function
    name: String,
    /// Blocks and their edges
    graph: DirectedGraph<BasicBlock<'ast>, CfgEdgeKind>,
    /// The unique block without predecessors
    entry: NodeId,
    /// The unique block without successors
    exit: NodeId,
    /// Blocks holding `defer` calls, in source order
    deferred: Vec<NodeId>,
    /// Cached dominator tree
    dominators: OnceLock<DominatorTree>,
    /// Cached natural loops
    loops: OnceLock<Vec<NaturalLoop>>,
}

impl<'ast> ControlFlowGraph<'ast> {
    pub(crate) fn new(
        name: String,
        graph: DirectedGraph<BasicBlock<'ast>, CfgEdgeKind>,
        entry: NodeId,
        exit: NodeId,
        deferred: Vec<NodeId>,
    ) -> Result<Self> {
        if !graph.contains_node(entry) {
            return Err(Error::NoEntry);
        }
        if !graph.contains_node(exit) {
            return Err(Error::GraphError(format!(
                "exit node {exit} does not exist in graph with {} nodes",
                graph.node_count()
            )));
        }

        Ok(ControlFlowGraph {
            name,
            graph,
            entry,
            exit,
            deferred,
            dominators: OnceLock::new(),
            loops: OnceLock::new(),
        })
    }

    /// Builds a CFG from hand-assembled blocks, for front ends other than the AST builder.
    ///
    /// Block ids are reassigned from the position in `blocks`; `edges` refer to those
    /// positions. Exactly one block must be of kind [`BlockKind::Entry`] and exactly one
    /// of kind [`BlockKind::Exit`]. Duplicate edges are collapsed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoEntry`] if the entry or exit block is missing or not unique, and
    /// [`Error::GraphError`] if an edge references a block that does not exist.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use goscope::{
    ///     analysis::{BasicBlock, BlockKind, CfgEdgeKind, ControlFlowGraph},
    ///     utils::graph::NodeId,
    /// };
    ///
    /// let n = NodeId::new;
    /// let blocks = vec![
    ///     BasicBlock::new(n(0), BlockKind::Entry),
    ///     BasicBlock::new(n(1), BlockKind::Exit),
    /// ];
    /// let cfg = ControlFlowGraph::from_blocks("f", blocks, &[(n(0), n(1), CfgEdgeKind::Unconditional)])?;
    /// assert_eq!(cfg.successors(cfg.entry()).collect::<Vec<_>>(), vec![cfg.exit()]);
    /// # Ok::<(), goscope::Error>(())
    /// ```
    pub fn from_blocks(
        name: impl Into<String>,
        blocks: Vec<BasicBlock<'ast>>,
        edges: &[(NodeId, NodeId, CfgEdgeKind)],
    ) -> Result<Self> {
        let unique = |kind: BlockKind| {
            let mut found = blocks.iter().enumerate().filter(|(_, b)| b.kind == kind);
            match (found.next(), found.next()) {
                (Some((index, _)), None) => Some(NodeId::new(index)),
                _ => None,
            }
        };
        let entry = unique(BlockKind::Entry).ok_or(Error::NoEntry)?;
        let exit = unique(BlockKind::Exit).ok_or(Error::NoEntry)?;

        let mut graph = DirectedGraph::with_capacity(blocks.len(), edges.len());
        for (index, mut block) in blocks.into_iter().enumerate() {
            block.id = NodeId::new(index);
            graph.add_node(block);
        }
        for &(source, target, kind) in edges {
            if graph.contains_node(source) && graph.find_edge(source, target).is_some() {
                continue;
            }
            graph.add_edge(source, target, kind)?;
        }

        Self::new(name.into(), graph, entry, exit, Vec::new())
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the entry block.
    #[must_use]
    pub const fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the exit block.
    #[must_use]
    pub const fn exit(&self) -> NodeId {
        self.exit
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the block with the given id.
    #[must_use]
    pub fn block(&self, node_id: NodeId) -> Option<&BasicBlock<'ast>> {
        self.graph.node(node_id)
    }

    /// Returns all blocks in id order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock<'ast>> + '_ {
        self.graph.nodes().map(|(_, block)| block)
    }

    /// Returns the blocks holding `defer` calls, in source order.
    ///
    /// The graph does not route deferred calls through the exit; consumers that model
    /// deferred execution run these blocks' calls in reverse order on function exit.
    #[must_use]
    pub fn deferred_calls(&self) -> &[NodeId] {
        &self.deferred
    }

    /// Returns the successor block ids of `node_id` in edge order.
    pub fn successors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.successors(node_id)
    }

    /// Returns the predecessor block ids of `node_id` in edge order.
    pub fn predecessors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.predecessors(node_id)
    }

    /// Returns `(target, kind)` for the outgoing edges of `node_id`.
    pub fn outgoing_edges(
        &self,
        node_id: NodeId,
    ) -> impl Iterator<Item = (NodeId, CfgEdgeKind)> + '_ {
        self.graph
            .outgoing_edges(node_id)
            .map(|(target, &kind)| (target, kind))
    }

    /// Returns `(source, kind)` for the incoming edges of `node_id`.
    pub fn incoming_edges(
        &self,
        node_id: NodeId,
    ) -> impl Iterator<Item = (NodeId, CfgEdgeKind)> + '_ {
        self.graph
            .incoming_edges(node_id)
            .map(|(source, &kind)| (source, kind))
    }

    /// Returns the kind of the edge from `from` to `to`, if there is one.
    #[must_use]
    pub fn edge_kind(&self, from: NodeId, to: NodeId) -> Option<CfgEdgeKind> {
        let edge = self.graph.find_edge(from, to)?;
        self.graph.edge(edge).copied()
    }

    /// Returns the reachable blocks in reverse postorder.
    ///
    /// Forward data-flow problems iterate in this order.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<NodeId> {
        algorithms::reverse_postorder(&self.graph, self.entry)
    }

    /// Returns the reachable blocks in postorder.
    ///
    /// Backward data-flow problems iterate in this order.
    #[must_use]
    pub fn postorder(&self) -> Vec<NodeId> {
        algorithms::postorder(&self.graph, self.entry)
    }

    /// Depth-first preorder from the entry.
    pub fn dfs(&self) -> impl Iterator<Item = NodeId> + '_ {
        algorithms::dfs(&self.graph, self.entry)
    }

    /// Breadth-first order from the entry, with distances.
    pub fn bfs(&self) -> impl Iterator<Item = (NodeId, usize)> + '_ {
        algorithms::bfs(&self.graph, self.entry)
    }

    /// Returns the dominator tree, computing it on first access.
    #[must_use]
    pub fn dominators(&self) -> &DominatorTree {
        self.dominators
            .get_or_init(|| algorithms::compute_dominators(&self.graph, self.entry))
    }

    /// Returns the structural back edges `(source, header)`: edges into a block that is
    /// still open in a depth-first search from the entry.
    #[must_use]
    pub fn back_edges(&self) -> Vec<(NodeId, NodeId)> {
        algorithms::back_edges(&self.graph, self.entry)
    }

    /// Returns the natural loops, sorted by header, computing them on first access.
    ///
    /// A back edge `n -> h` exists when `h` dominates `n`. The loop body is every block
    /// that reaches `n` without passing through `h`, plus `h` itself. Back edges sharing
    /// a header form one loop.
    #[must_use]
    pub fn loops(&self) -> &[NaturalLoop] {
        self.loops.get_or_init(|| self.detect_loops())
    }

    fn detect_loops(&self) -> Vec<NaturalLoop> {
        let dominators = self.dominators();
        let mut loops: Vec<NaturalLoop> = Vec::new();

        for node in self.graph.node_ids() {
            if !dominators.is_reachable(node) {
                continue;
            }
            for succ in self.graph.successors(node) {
                if !dominators.dominates(succ, node) {
                    continue;
                }
                let header = succ;
                let index = match loops.iter().position(|l| l.header == header) {
                    Some(index) => index,
                    None => {
                        loops.push(NaturalLoop::new(header));
                        loops.len() - 1
                    }
                };
                loops[index].back_edges.push(node);
                self.expand_loop_body(&mut loops[index], node);
            }
        }

        Self::compute_loop_depths(&mut loops);
        loops.sort_by_key(|l| l.header);
        loops
    }

    fn expand_loop_body(&self, natural_loop: &mut NaturalLoop, back_edge_source: NodeId) {
        let mut worklist = vec![back_edge_source];
        while let Some(node) = worklist.pop() {
            if natural_loop.body.insert(node) {
                worklist.extend(
                    self.graph
                        .predecessors(node)
                        .filter(|pred| !natural_loop.body.contains(pred)),
                );
            }
        }
    }

    fn compute_loop_depths(loops: &mut [NaturalLoop]) {
        let headers: Vec<NodeId> = loops.iter().map(|l| l.header).collect();
        for (i, header) in headers.iter().enumerate() {
            let depth = loops
                .iter()
                .enumerate()
                .filter(|&(j, other)| i != j && other.body.contains(header))
                .count();
            loops[i].depth = depth;
        }
    }

    /// Returns true if this CFG contains any loops.
    #[must_use]
    pub fn has_loops(&self) -> bool {
        !self.loops().is_empty()
    }

    /// Returns the deepest loop containing `node`, if any.
    #[must_use]
    pub fn innermost_loop(&self, node: NodeId) -> Option<&NaturalLoop> {
        self.loops()
            .iter()
            .filter(|l| l.contains(node))
            .max_by_key(|l| l.depth)
    }

    /// Computes summary metrics.
    #[must_use]
    pub fn stats(&self) -> CfgStats {
        CfgStats {
            node_count: self.block_count(),
            edge_count: self.edge_count(),
            max_depth: self.bfs().map(|(_, distance)| distance).max().unwrap_or(0),
            loop_count: self.loops().len(),
            branch_count: self
                .graph
                .node_ids()
                .filter(|&node| self.graph.out_degree(node) >= 2)
                .count(),
        }
    }

    /// Renders the graph in Graphviz DOT format.
    ///
    /// Every block is labelled with its id, origin label and statements; edges carry
    /// their kind, and structural back edges are labelled `back` and dashed.
    ///
    /// ```rust
    /// use goscope::{ast::build::*, build_cfg};
    ///
    /// let f = func("f", &[], vec![while_loop(ident("c"), vec![])]);
    /// let dot = build_cfg(&f)?.to_dot(Some("f"));
    /// assert!(dot.starts_with("digraph CFG {"));
    /// assert!(dot.contains("label=\"back\""));
    /// # Ok::<(), goscope::Error>(())
    /// ```
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        self.render_dot(title, |block, label| {
            for stmt in &block.stmts {
                let _ = write!(label, "{}\\l", escape_dot(&stmt.to_string()));
            }
        })
    }

    /// Shared DOT skeleton; `body` appends the per-block contents to the node label.
    pub(crate) fn render_dot(
        &self,
        title: Option<&str>,
        mut body: impl FnMut(&BasicBlock<'ast>, &mut String),
    ) -> String {
        let mut dot = String::new();

        dot.push_str("digraph CFG {\n");
        if let Some(name) = title {
            let _ = writeln!(dot, "    label=\"CFG: {}\";", escape_dot(name));
        }
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n");
        dot.push_str("    edge [fontname=\"Courier\", fontsize=9];\n\n");

        for block in self.blocks() {
            let mut label = format!("{}: {}\\l", block.id.index(), escape_dot(&block.label));
            body(block, &mut label);

            let _ = writeln!(
                dot,
                "    {} [label=\"{label}\", style=filled, fillcolor={}];",
                block.id,
                block.kind.fill_color()
            );
        }

        dot.push('\n');

        let back_edges: BTreeSet<(NodeId, NodeId)> = self.back_edges().into_iter().collect();
        for (source, target, &kind) in self.graph.edges() {
            let is_back = back_edges.contains(&(source, target));
            let edge_label = if is_back { "back".to_string() } else { kind.label() };
            let color = match kind {
                CfgEdgeKind::ConditionalTrue => "green",
                CfgEdgeKind::ConditionalFalse => "red",
                CfgEdgeKind::Case { .. } | CfgEdgeKind::Default | CfgEdgeKind::Fallthrough => {
                    "blue"
                }
                CfgEdgeKind::Unconditional | CfgEdgeKind::Back => "black",
                _ => "purple",
            };
            let style = if is_back { ", style=dashed" } else { "" };

            let _ = writeln!(
                dot,
                "    {source} -> {target} [label=\"{}\", color={color}{style}];",
                escape_dot(&edge_label)
            );
        }

        dot.push_str("}\n");
        dot
    }
}

impl GraphBase for ControlFlowGraph<'_> {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.graph.node_ids()
    }
}

impl Successors for ControlFlowGraph<'_> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.successors(node)
    }
}

impl Predecessors for ControlFlowGraph<'_> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.predecessors(node)
    }
}

impl RootedGraph for ControlFlowGraph<'_> {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::cfg::{BasicBlock, BlockKind, CfgBuilder, CfgEdgeKind, ControlFlowGraph},
        ast::build::*,
        utils::graph::NodeId,
        Error,
    };

    fn n(i: usize) -> NodeId {
        NodeId::new(i)
    }

    fn blocks(kinds: &[BlockKind]) -> Vec<BasicBlock<'static>> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| BasicBlock::new(n(i), kind))
            .collect()
    }

    #[test]
    fn test_from_blocks_requires_entry() {
        let result = ControlFlowGraph::from_blocks("f", blocks(&[BlockKind::Exit]), &[]);
        assert!(matches!(result, Err(Error::NoEntry)));

        let result = ControlFlowGraph::from_blocks(
            "f",
            blocks(&[BlockKind::Entry, BlockKind::Entry, BlockKind::Exit]),
            &[],
        );
        assert!(matches!(result, Err(Error::NoEntry)));
    }

    #[test]
    fn test_from_blocks_rejects_unknown_target() {
        let result = ControlFlowGraph::from_blocks(
            "f",
            blocks(&[BlockKind::Entry, BlockKind::Exit]),
            &[(n(0), n(7), CfgEdgeKind::Unconditional)],
        );
        assert!(matches!(result, Err(Error::GraphError(_))));
    }

    #[test]
    fn test_from_blocks_collapses_duplicate_edges() {
        let cfg = ControlFlowGraph::from_blocks(
            "f",
            blocks(&[BlockKind::Exit, BlockKind::Entry]),
            &[
                (n(1), n(0), CfgEdgeKind::Unconditional),
                (n(1), n(0), CfgEdgeKind::Goto),
            ],
        )
        .unwrap();
        assert_eq!(cfg.entry(), n(1));
        assert_eq!(cfg.exit(), n(0));
        assert_eq!(cfg.edge_count(), 1);
    }

    #[test]
    fn test_nested_loops_depths() {
        let f = func(
            "f",
            &[],
            vec![while_loop(
                lt(ident("i"), ident("n")),
                vec![while_loop(
                    lt(ident("j"), ident("m")),
                    vec![assign("k", add(ident("i"), ident("j")))],
                )],
            )],
        );
        let cfg = CfgBuilder::new().build(&f).unwrap();
        let loops = cfg.loops();
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].depth, 0);
        assert_eq!(loops[1].depth, 1);
        assert!(loops[0].body.is_superset(&loops[1].body));
        assert_eq!(cfg.back_edges().len(), 2);

        let inner_body = cfg
            .blocks()
            .filter(|b| b.kind == BlockKind::ForBody)
            .nth(1)
            .unwrap()
            .id;
        assert_eq!(cfg.innermost_loop(inner_body), Some(&loops[1]));
    }

    #[test]
    fn test_loops_match_back_edges() {
        let f = func(
            "f",
            &["xs"],
            vec![range(Some("i"), None, ident("xs"), vec![expr_stmt(call("f", vec![]))])],
        );
        let cfg = CfgBuilder::new().build(&f).unwrap();
        assert!(cfg.has_loops());
        let natural_loop = &cfg.loops()[0];
        let structural: Vec<(NodeId, NodeId)> = natural_loop
            .back_edges
            .iter()
            .map(|&src| (src, natural_loop.header))
            .collect();
        assert_eq!(structural, cfg.back_edges());
    }

    #[test]
    fn test_stats() {
        let f = func(
            "f",
            &["x"],
            vec![
                if_else(ident("x"), vec![assign("y", int(1))], vec![assign("y", int(2))]),
                while_loop(ident("y"), vec![dec("y")]),
            ],
        );
        let cfg = CfgBuilder::new().build(&f).unwrap();
        let stats = cfg.stats();
        assert_eq!(stats.node_count, cfg.block_count());
        assert_eq!(stats.edge_count, cfg.edge_count());
        assert_eq!(stats.loop_count, 1);
        assert_eq!(stats.branch_count, 2);
        // entry -> func -> cond -> then -> merge -> header -> exit(for) -> exit
        assert_eq!(stats.max_depth, 7);
    }

    #[test]
    fn test_dot_output() {
        let f = func(
            "quote\"d",
            &[],
            vec![while_loop(lt(ident("i"), int(3)), vec![inc("i")])],
        );
        let cfg = CfgBuilder::new().build(&f).unwrap();
        let dot = cfg.to_dot(Some(cfg.name()));
        assert!(dot.contains("label=\"CFG: quote\\\"d\""));
        assert!(dot.contains("i \\< 3\\l"));
        assert!(dot.contains("label=\"back\", color=black, style=dashed"));
        assert!(dot.contains("label=\"true\", color=green"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_dominators_are_cached() {
        let f = func("f", &[], vec![assign("a", int(1))]);
        let cfg = CfgBuilder::new().build(&f).unwrap();
        let first: *const _ = cfg.dominators();
        let second: *const _ = cfg.dominators();
        assert_eq!(first, second);
        assert_eq!(cfg.dominators().immediate_dominator(cfg.exit()), Some(n(2)));
    }
}
