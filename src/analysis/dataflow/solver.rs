//! Round-robin data flow solver.
//!
//! # Algorithm
//!
//! The solver iterates until a fixpoint is reached:
//!
//! 1. Initialize every set with the analysis' initial value and pin the boundary value at
//!    the entry (forward) or exit (backward)
//! 2. Visit every node once per pass, in reverse postorder (forward) or postorder
//!    (backward), with nodes unreachable from the entry appended in id order
//! 3. At each node, meet the neighbours' sets and apply the transfer function
//! 4. Stop after the first pass that changes no set
//!
//! # Complexity
//!
//! Sets only grow (union) or shrink (intersection), so with monotone transfer functions
//! every changing pass moves at least one of the `|N| · |D|` bits for good. The solver
//! refuses to run more than `|N| · |D| + 1` passes and reports
//! [`Error::DataFlowDiverged`] instead, which can only happen for a non-monotone
//! transfer function.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{debug, instrument, trace};

use crate::{
    analysis::dataflow::framework::{DataFlowAnalysis, DataFlowCfg, Direction},
    utils::{
        graph::{algorithms, NodeId},
        BitSet,
    },
    Error, Result,
};

/// Shared flag an embedder sets to abandon a running solve.
pub type CancellationToken = Arc<AtomicBool>;

/// Fixed point of a data flow problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFlowResults {
    /// `IN` set per node, indexed by node id
    pub in_sets: Vec<BitSet>,
    /// `OUT` set per node, indexed by node id
    pub out_sets: Vec<BitSet>,
    /// Passes performed, including the final pass that changed nothing
    pub iterations: usize,
}

impl DataFlowResults {
    /// The `IN` set of `node`.
    #[must_use]
    pub fn in_set(&self, node: NodeId) -> Option<&BitSet> {
        self.in_sets.get(node.index())
    }

    /// The `OUT` set of `node`.
    #[must_use]
    pub fn out_set(&self, node: NodeId) -> Option<&BitSet> {
        self.out_sets.get(node.index())
    }

    /// Returns `true` if one more application of the update rule changes no set.
    pub fn is_fixed_point<A, G>(&self, analysis: &A, graph: &G) -> bool
    where
        A: DataFlowAnalysis + ?Sized,
        G: DataFlowCfg,
    {
        let node_count = graph.node_count();
        if self.in_sets.len() != node_count || self.out_sets.len() != node_count {
            return false;
        }
        let boundary = analysis.boundary();

        (0..node_count).map(NodeId::new).all(|node| {
            let (input, output) = update(analysis, graph, node, &boundary, &self.in_sets, &self.out_sets);
            input == self.in_sets[node.index()] && output == self.out_sets[node.index()]
        })
    }
}

/// Iterates a [`DataFlowAnalysis`] to its fixed point.
///
/// # Usage
///
/// ```rust
/// use std::sync::{atomic::AtomicBool, Arc};
///
/// use goscope::{
///     analysis::dataflow::{DataFlowSolver, Liveness},
///     ast::build::*,
///     build_cfg,
/// };
///
/// let f = func("f", &["a"], vec![ret(vec![ident("a")])]);
/// let cfg = build_cfg(&f)?;
///
/// let cancel = Arc::new(AtomicBool::new(false));
/// let solver = DataFlowSolver::new().with_cancellation(cancel.clone());
/// let liveness = Liveness::new(&cfg);
/// let results = solver.solve(&liveness, &cfg)?;
///
/// assert!(results.is_fixed_point(&liveness, &cfg));
/// # Ok::<(), goscope::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DataFlowSolver {
    iteration_limit: Option<usize>,
    cancel: Option<CancellationToken>,
}

impl DataFlowSolver {
    /// Creates a solver with the default `|N| · |D| + 1` pass limit and no cancellation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of passes below the default bound.
    ///
    /// The effective limit is the smaller of `limit` and `|N| · |D| + 1`.
    #[must_use]
    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = Some(limit);
        self
    }

    /// Polls `token` before every pass and returns [`Error::Cancelled`] once it is set.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The default pass bound for a graph of `node_count` nodes and a domain of
    /// `domain_size` elements.
    #[must_use]
    pub const fn default_bound(node_count: usize, domain_size: usize) -> usize {
        node_count.saturating_mul(domain_size).saturating_add(1)
    }

    /// Solves `analysis` on `graph`.
    ///
    /// # Errors
    ///
    /// - [`Error::DataFlowDiverged`] if the pass limit is exceeded, or if a boundary,
    ///   initial or transferred set does not have the analysis' domain size
    /// - [`Error::Cancelled`] if the cancellation token was set
    #[instrument(level = "debug", skip_all, fields(analysis = analysis.name(), direction = %analysis.direction()))]
    pub fn solve<A, G>(&self, analysis: &A, graph: &G) -> Result<DataFlowResults>
    where
        A: DataFlowAnalysis + ?Sized,
        G: DataFlowCfg,
    {
        let node_count = graph.node_count();
        let domain_size = analysis.domain_size();
        let bound = Self::default_bound(node_count, domain_size);
        let limit = self.iteration_limit.map_or(bound, |limit| limit.min(bound));

        let diverged = |iterations: usize| Error::DataFlowDiverged {
            analysis: analysis.name().to_string(),
            domain_size,
            iterations,
        };

        let boundary = analysis.boundary();
        let initial = analysis.initial();
        if boundary.len() != domain_size || initial.len() != domain_size {
            return Err(diverged(0));
        }

        let mut in_sets = vec![initial.clone(); node_count];
        let mut out_sets = vec![initial; node_count];
        match analysis.direction() {
            Direction::Forward => {
                if let Some(set) = in_sets.get_mut(graph.entry().index()) {
                    *set = boundary.clone();
                }
            }
            Direction::Backward => {
                if let Some(set) = out_sets.get_mut(graph.exit().index()) {
                    *set = boundary.clone();
                }
            }
        }

        let order = visit_order(graph, analysis.direction());
        let mut iterations = 0;

        loop {
            if self
                .cancel
                .as_ref()
                .is_some_and(|token| token.load(Ordering::Relaxed))
            {
                debug!(iterations, "cancelled");
                return Err(Error::Cancelled);
            }

            iterations += 1;
            let mut changed = false;

            for &node in &order {
                let (input, output) = update(analysis, graph, node, &boundary, &in_sets, &out_sets);
                if input.len() != domain_size || output.len() != domain_size {
                    return Err(diverged(iterations));
                }

                let idx = node.index();
                if input != in_sets[idx] || output != out_sets[idx] {
                    changed = true;
                    in_sets[idx] = input;
                    out_sets[idx] = output;
                }
            }

            trace!(iterations, changed, "pass finished");
            if !changed {
                break;
            }
            if iterations >= limit {
                debug!(iterations, limit, "iteration limit exceeded");
                return Err(diverged(iterations));
            }
        }

        debug!(iterations, nodes = node_count, domain_size, "reached fixed point");
        Ok(DataFlowResults {
            in_sets,
            out_sets,
            iterations,
        })
    }
}

/// Reverse postorder (forward) or postorder (backward) from the entry, followed by the
/// nodes the traversal cannot reach.
fn visit_order<G: DataFlowCfg>(graph: &G, direction: Direction) -> Vec<NodeId> {
    let mut order = match direction {
        Direction::Forward => algorithms::reverse_postorder(graph, graph.entry()),
        Direction::Backward => algorithms::postorder(graph, graph.entry()),
    };

    let mut seen = BitSet::new(graph.node_count());
    for node in &order {
        seen.insert(node.index());
    }
    order.extend(graph.node_ids().filter(|node| !seen.contains(node.index())));
    order
}

/// Applies the update rule at `node` to the current sets and returns its new `(IN, OUT)`.
fn update<A, G>(
    analysis: &A,
    graph: &G,
    node: NodeId,
    boundary: &BitSet,
    in_sets: &[BitSet],
    out_sets: &[BitSet],
) -> (BitSet, BitSet)
where
    A: DataFlowAnalysis + ?Sized,
    G: DataFlowCfg,
{
    let domain_size = analysis.domain_size();
    match analysis.direction() {
        Direction::Forward => {
            let input = if node == graph.entry() {
                boundary.clone()
            } else {
                let preds: Vec<NodeId> = graph.predecessors(node).collect();
                analysis
                    .meet()
                    .combine(domain_size, preds.iter().map(|p| &out_sets[p.index()]))
            };
            let output = analysis.transfer(node, &input);
            (input, output)
        }
        Direction::Backward => {
            let output = if node == graph.exit() {
                boundary.clone()
            } else {
                let succs: Vec<NodeId> = graph.successors(node).collect();
                analysis
                    .meet()
                    .combine(domain_size, succs.iter().map(|s| &in_sets[s.index()]))
            };
            let input = analysis.transfer(node, &output);
            (input, output)
        }
    }
}
