//! SSA-form control flow graphs.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Write,
};

use crate::{
    analysis::{
        ssa::{verify, DefSite, PhiFunction, SsaName, SsaStatement, SsaViolation},
        ControlFlowGraph,
    },
    utils::{
        escape_dot,
        graph::{algorithms::DominatorTree, GraphBase, NodeId, Predecessors, RootedGraph, Successors},
    },
    Result,
};

/// The SSA view of one CFG block: φ-functions first, then the renamed statements.
#[derive(Debug, Clone)]
pub struct SsaNode<'ast> {
    /// Block id, identical to the CFG block id
    pub id: NodeId,
    /// φ-functions, ordered by variable name
    pub phis: Vec<PhiFunction>,
    /// Statements in block order
    pub stmts: Vec<SsaStatement<'ast>>,
}

/// A control flow graph in SSA form.
///
/// The SSA graph shares the node ids and edges of the CFG it was built from, and keeps the
/// dominator tree and dominance frontiers used during construction.
#[derive(Debug, Clone)]
pub struct SsaCfg<'cfg, 'ast> {
    cfg: &'cfg ControlFlowGraph<'ast>,
    nodes: Vec<SsaNode<'ast>>,
    dominators: DominatorTree,
    frontiers: Vec<BTreeSet<NodeId>>,
    next_version: BTreeMap<String, u32>,
}

impl<'cfg, 'ast> SsaCfg<'cfg, 'ast> {
    pub(crate) fn new(
        cfg: &'cfg ControlFlowGraph<'ast>,
        nodes: Vec<SsaNode<'ast>>,
        dominators: DominatorTree,
        frontiers: Vec<BTreeSet<NodeId>>,
        next_version: BTreeMap<String, u32>,
    ) -> Self {
        SsaCfg {
            cfg,
            nodes,
            dominators,
            frontiers,
            next_version,
        }
    }

    /// The underlying control flow graph.
    #[must_use]
    pub fn cfg(&self) -> &'cfg ControlFlowGraph<'ast> {
        self.cfg
    }

    /// Returns the SSA node for `id`.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SsaNode<'ast>> {
        self.nodes.get(id.index())
    }

    #[cfg(test)]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut SsaNode<'ast>> {
        self.nodes.get_mut(id.index())
    }

    /// All SSA nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &SsaNode<'ast>> + '_ {
        self.nodes.iter()
    }

    /// The φ-functions of a block; empty for unknown ids.
    #[must_use]
    pub fn phis(&self, id: NodeId) -> &[PhiFunction] {
        self.node(id).map_or(&[], |node| node.phis.as_slice())
    }

    /// Dominator tree of the graph.
    #[must_use]
    pub fn dominators(&self) -> &DominatorTree {
        &self.dominators
    }

    /// Dominance frontier of a block.
    #[must_use]
    pub fn dominance_frontier(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.frontiers.get(id.index())
    }

    /// Dominance frontiers of every block, indexed by node id.
    #[must_use]
    pub fn frontiers(&self) -> &[BTreeSet<NodeId>] {
        &self.frontiers
    }

    /// Highest version minted for `variable`; 0 when it is never defined.
    #[must_use]
    pub fn next_version(&self, variable: &str) -> u32 {
        self.next_version.get(variable).copied().unwrap_or(0)
    }

    /// Highest minted version of every defined variable.
    #[must_use]
    pub fn versions(&self) -> &BTreeMap<String, u32> {
        &self.next_version
    }

    /// Total number of φ-functions.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.nodes.iter().map(|node| node.phis.len()).sum()
    }

    /// Every definition in the graph with its site, in block then statement order.
    #[must_use]
    pub fn definitions(&self) -> Vec<(SsaName, DefSite)> {
        let mut defs = Vec::new();
        for node in &self.nodes {
            for phi in &node.phis {
                defs.push((phi.target(), DefSite::Phi(node.id)));
            }
            for (index, stmt) in node.stmts.iter().enumerate() {
                for name in &stmt.defs {
                    defs.push((
                        name.clone(),
                        DefSite::Stmt {
                            node: node.id,
                            index,
                        },
                    ));
                }
            }
        }
        defs
    }

    /// Looks up the site defining `name`.
    #[must_use]
    pub fn definition_of(&self, name: &SsaName) -> Option<DefSite> {
        self.definitions()
            .into_iter()
            .find(|(defined, _)| defined == name)
            .map(|(_, site)| site)
    }

    /// Every structural problem of the SSA form, in block order.
    #[must_use]
    pub fn violations(&self) -> Vec<SsaViolation> {
        verify::check(self)
    }

    /// Checks single assignment, dominance of uses by definitions, and φ arity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SsaInternalError`](crate::Error::SsaInternalError) describing the
    /// first violation found.
    pub fn verify(&self) -> Result<()> {
        match self.violations().into_iter().next() {
            Some(violation) => Err(violation.into_error()),
            None => Ok(()),
        }
    }

    /// Renders the SSA graph in Graphviz DOT format, φ-functions above statements.
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        self.cfg.render_dot(title, |block, label| {
            let Some(node) = self.node(block.id) else {
                return;
            };
            for phi in &node.phis {
                let _ = write!(label, "{}\\l", escape_dot(&phi.to_string()));
            }
            for stmt in &node.stmts {
                let _ = write!(label, "{}\\l", escape_dot(&stmt.to_string()));
            }
        })
    }
}

impl GraphBase for SsaCfg<'_, '_> {
    fn node_count(&self) -> usize {
        self.cfg().block_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.cfg().block_count()).map(NodeId::new)
    }
}

impl Successors for SsaCfg<'_, '_> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.cfg().successors(node)
    }
}

impl Predecessors for SsaCfg<'_, '_> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.cfg().predecessors(node)
    }
}

impl RootedGraph for SsaCfg<'_, '_> {
    fn entry(&self) -> NodeId {
        self.cfg().entry()
    }
}
