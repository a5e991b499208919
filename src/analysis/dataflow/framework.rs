//! Data flow problem description: direction, meet, transfer functions, and the graphs
//! a problem can be solved on.
//!
//! Every problem here works on the powerset lattice of a finite domain `D`, with sets
//! stored as [`BitSet`]s indexed by a fixed enumeration of the domain.

use std::fmt;

use strum::{Display, IntoStaticStr};

use crate::{
    analysis::{ControlFlowGraph, SsaCfg},
    utils::{
        graph::{NodeId, RootedGraph},
        BitSet,
    },
};

/// Direction of data flow analysis.
///
/// The direction determines how information propagates through the CFG
/// and which neighbours are combined at merge points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    /// Information flows forward, from entry to exit.
    ///
    /// `IN[n]` is the meet over the predecessors' `OUT`, and `OUT[n] = f_n(IN[n])`.
    ///
    /// Examples: reaching definitions, available expressions.
    Forward,

    /// Information flows backward, from exit to entry.
    ///
    /// `OUT[n]` is the meet over the successors' `IN`, and `IN[n] = f_n(OUT[n])`.
    ///
    /// Examples: live variables.
    Backward,
}

/// How facts from several neighbours are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Meet {
    /// A fact holds if it holds on some path (may-analyses)
    Union,
    /// A fact holds if it holds on every path (must-analyses)
    Intersection,
}

impl Meet {
    /// Combines the sets in `inputs`.
    ///
    /// The meet over no inputs is the empty set for both operators.
    #[must_use]
    pub fn combine<'a>(self, domain_size: usize, inputs: impl IntoIterator<Item = &'a BitSet>) -> BitSet {
        let mut inputs = inputs.into_iter();
        let Some(first) = inputs.next() else {
            return BitSet::new(domain_size);
        };
        let mut result = first.clone();
        for set in inputs {
            match self {
                Meet::Union => result.union_with(set),
                Meet::Intersection => result.intersect_with(set),
            };
        }
        result
    }
}

/// A monotone data flow problem over the powerset of a finite domain.
///
/// Implementations precompute whatever they need per node (usually gen and kill sets)
/// and answer the solver's questions from that; the solver owns iteration.
///
/// # Boundary and initial values
///
/// The solver pins the boundary value: `IN[entry]` for forward problems and
/// `OUT[exit]` for backward ones. Every other `IN` and `OUT` starts at
/// [`initial`](DataFlowAnalysis::initial).
pub trait DataFlowAnalysis {
    /// Name used in logs and in [`Error::DataFlowDiverged`](crate::Error::DataFlowDiverged).
    fn name(&self) -> &str;

    /// Direction of propagation.
    fn direction(&self) -> Direction;

    /// Meet operator at merge points.
    fn meet(&self) -> Meet;

    /// Number of elements of the domain; every set has this capacity.
    fn domain_size(&self) -> usize;

    /// Value pinned at the boundary node.
    fn boundary(&self) -> BitSet;

    /// Starting value of every other set.
    fn initial(&self) -> BitSet;

    /// Transfer function of `node`: maps `IN` to `OUT` (forward) or `OUT` to `IN` (backward).
    fn transfer(&self, node: NodeId, input: &BitSet) -> BitSet;
}

/// Per-node transfer function of a [`DataFlowProblem`].
pub enum Transfer {
    /// `f_n(X) = gen[n] ∪ (X \ kill[n])`; nodes without entries are the identity.
    GenKill {
        /// Facts produced per node
        gen: Vec<BitSet>,
        /// Facts destroyed per node
        kill: Vec<BitSet>,
    },
    /// Arbitrary transfer function
    Closure(Box<dyn Fn(NodeId, &BitSet) -> BitSet + Send + Sync>),
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transfer::GenKill { gen, kill } => f
                .debug_struct("GenKill")
                .field("gen", gen)
                .field("kill", kill)
                .finish(),
            Transfer::Closure(_) => f.write_str("Closure(..)"),
        }
    }
}

/// A data flow problem assembled from its parts.
///
/// # Examples
///
/// ```rust
/// use goscope::{
///     analysis::dataflow::{DataFlowProblem, Direction, Meet},
///     ast::build::*,
///     build_cfg, solve,
///     utils::BitSet,
/// };
///
/// let f = func("f", &[], vec![assign("x", int(1))]);
/// let cfg = build_cfg(&f)?;
///
/// // One fact, generated by the function's first block.
/// let mut gen = vec![BitSet::new(1); cfg.block_count()];
/// gen[2].insert(0);
/// let kill = vec![BitSet::new(1); cfg.block_count()];
///
/// let problem = DataFlowProblem::gen_kill("marker", Direction::Forward, Meet::Union, 1, gen, kill);
/// let results = solve(&problem, &cfg)?;
/// assert!(results.out_set(cfg.exit()).unwrap().contains(0));
/// # Ok::<(), goscope::Error>(())
/// ```
#[derive(Debug)]
pub struct DataFlowProblem {
    name: String,
    direction: Direction,
    meet: Meet,
    domain_size: usize,
    boundary: BitSet,
    initial: BitSet,
    transfer: Transfer,
}

impl DataFlowProblem {
    /// Creates a problem with an empty boundary and an initial value matching the meet:
    /// empty for union, the full domain for intersection.
    pub fn new(
        name: impl Into<String>,
        direction: Direction,
        meet: Meet,
        domain_size: usize,
        transfer: Transfer,
    ) -> Self {
        let initial = match meet {
            Meet::Union => BitSet::new(domain_size),
            Meet::Intersection => BitSet::full(domain_size),
        };
        DataFlowProblem {
            name: name.into(),
            direction,
            meet,
            domain_size,
            boundary: BitSet::new(domain_size),
            initial,
            transfer,
        }
    }

    /// Creates a gen/kill problem.
    pub fn gen_kill(
        name: impl Into<String>,
        direction: Direction,
        meet: Meet,
        domain_size: usize,
        gen: Vec<BitSet>,
        kill: Vec<BitSet>,
    ) -> Self {
        Self::new(name, direction, meet, domain_size, Transfer::GenKill { gen, kill })
    }

    /// Creates a problem whose transfer function is `transfer`.
    pub fn with_closure(
        name: impl Into<String>,
        direction: Direction,
        meet: Meet,
        domain_size: usize,
        transfer: impl Fn(NodeId, &BitSet) -> BitSet + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, direction, meet, domain_size, Transfer::Closure(Box::new(transfer)))
    }

    /// Replaces the boundary value.
    #[must_use]
    pub fn with_boundary(mut self, boundary: BitSet) -> Self {
        self.boundary = boundary;
        self
    }

    /// Replaces the initial value of interior sets.
    #[must_use]
    pub fn with_initial(mut self, initial: BitSet) -> Self {
        self.initial = initial;
        self
    }
}

impl DataFlowAnalysis for DataFlowProblem {
    fn name(&self) -> &str {
        &self.name
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn meet(&self) -> Meet {
        self.meet
    }

    fn domain_size(&self) -> usize {
        self.domain_size
    }

    fn boundary(&self) -> BitSet {
        self.boundary.clone()
    }

    fn initial(&self) -> BitSet {
        self.initial.clone()
    }

    fn transfer(&self, node: NodeId, input: &BitSet) -> BitSet {
        match &self.transfer {
            Transfer::GenKill { gen, kill } => apply_gen_kill(
                input,
                gen.get(node.index()),
                kill.get(node.index()),
            ),
            Transfer::Closure(transfer) => transfer(node, input),
        }
    }
}

/// `gen ∪ (input \ kill)`.
pub(crate) fn apply_gen_kill(input: &BitSet, gen: Option<&BitSet>, kill: Option<&BitSet>) -> BitSet {
    let mut output = input.clone();
    if let Some(kill) = kill.filter(|kill| kill.len() == output.len()) {
        output.difference_with(kill);
    }
    if let Some(gen) = gen.filter(|gen| gen.len() == output.len()) {
        output.union_with(gen);
    }
    output
}

/// A graph the solver can run on: rooted, with a designated exit node.
///
/// Implemented by [`ControlFlowGraph`] and by [`SsaCfg`], which shares its node ids.
pub trait DataFlowCfg: RootedGraph {
    /// The node whose `OUT` is pinned by backward problems.
    fn exit(&self) -> NodeId;
}

impl DataFlowCfg for ControlFlowGraph<'_> {
    fn exit(&self) -> NodeId {
        ControlFlowGraph::exit(self)
    }
}

impl DataFlowCfg for SsaCfg<'_, '_> {
    fn exit(&self) -> NodeId {
        self.cfg().exit()
    }
}
