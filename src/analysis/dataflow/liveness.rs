//! Live variable analysis.
//!
//! A variable is *live* at a program point if there exists a path from that
//! point to a use of the variable that doesn't pass through a definition of
//! the variable.
//!
//! # Uses
//!
//! - **Dead store detection**: an assignment whose variable is not live afterwards is dead
//! - **Debugging**: determine which variables can be inspected at a breakpoint
//!
//! # Algorithm
//!
//! This is a backward data flow analysis:
//!
//! - `USE[B]` = variables used in B before any definition
//! - `DEF[B]` = variables defined in B
//! - `OUT[B]` = ∪{IN[S] | S is a successor of B}
//! - `IN[B]` = USE[B] ∪ (OUT[B] - DEF[B])
//!
//! Nothing is live after the function returns: `OUT[exit] = ∅`.

use crate::{
    analysis::{
        dataflow::{
            framework::{apply_gen_kill, DataFlowAnalysis, DataFlowCfg, Direction, Meet},
            solver::{DataFlowResults, DataFlowSolver},
            VariableTable,
        },
        ControlFlowGraph,
    },
    utils::{graph::NodeId, BitSet},
    Result,
};

/// Live variable analysis over a function's variables.
///
/// # Example
///
/// ```rust
/// use goscope::{analysis::dataflow::Liveness, ast::build::*, build_cfg};
///
/// let f = func(
///     "f",
///     &["a"],
///     vec![assign("x", ident("a")), ret(vec![ident("x")])],
/// );
/// let cfg = build_cfg(&f)?;
/// let live = Liveness::new(&cfg).compute(&cfg)?;
///
/// // `a` is live on entry to the function body, `x` is not.
/// assert_eq!(live.live_in(2.into()), vec!["a"]);
/// assert!(live.is_live_out(2.into(), "x"));
/// # Ok::<(), goscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Liveness {
    variables: VariableTable,
    /// USE sets for each block (variables used before definition).
    use_sets: Vec<BitSet>,
    /// DEF sets for each block (variables defined).
    def_sets: Vec<BitSet>,
}

impl Liveness {
    /// Computes the USE and DEF sets of every block of `cfg`.
    #[must_use]
    pub fn new(cfg: &ControlFlowGraph<'_>) -> Self {
        let variables = VariableTable::from_cfg(cfg);
        let num_vars = variables.len();

        let mut use_sets = Vec::with_capacity(cfg.block_count());
        let mut def_sets = Vec::with_capacity(cfg.block_count());

        for block in cfg.blocks() {
            let mut uses = BitSet::new(num_vars);
            let mut defs = BitSet::new(num_vars);

            for stmt in &block.stmts {
                // Uses first: `x = x + 1` reads the incoming x.
                for var in stmt.used_variables() {
                    if let Some(idx) = variables.index_of(var) {
                        if !defs.contains(idx) {
                            uses.insert(idx);
                        }
                    }
                }
                for var in stmt.defined_variables() {
                    if let Some(idx) = variables.index_of(var) {
                        defs.insert(idx);
                    }
                }
            }

            use_sets.push(uses);
            def_sets.push(defs);
        }

        Liveness {
            variables,
            use_sets,
            def_sets,
        }
    }

    /// The variable domain.
    #[must_use]
    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Variables read in `node` before being assigned there.
    #[must_use]
    pub fn use_set(&self, node: NodeId) -> Option<&BitSet> {
        self.use_sets.get(node.index())
    }

    /// Variables assigned in `node`.
    #[must_use]
    pub fn def_set(&self, node: NodeId) -> Option<&BitSet> {
        self.def_sets.get(node.index())
    }

    /// Solves the analysis with a default solver.
    ///
    /// # Errors
    ///
    /// Propagates the solver's errors.
    pub fn compute<G: DataFlowCfg>(self, graph: &G) -> Result<LivenessResults> {
        self.compute_with(&DataFlowSolver::new(), graph)
    }

    /// Solves the analysis with `solver`.
    ///
    /// # Errors
    ///
    /// Propagates the solver's errors.
    pub fn compute_with<G: DataFlowCfg>(
        self,
        solver: &DataFlowSolver,
        graph: &G,
    ) -> Result<LivenessResults> {
        let results = solver.solve(&self, graph)?;
        Ok(LivenessResults {
            variables: self.variables,
            results,
        })
    }
}

impl DataFlowAnalysis for Liveness {
    fn name(&self) -> &str {
        "liveness"
    }

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn meet(&self) -> Meet {
        Meet::Union
    }

    fn domain_size(&self) -> usize {
        self.variables.len()
    }

    fn boundary(&self) -> BitSet {
        BitSet::new(self.variables.len())
    }

    fn initial(&self) -> BitSet {
        BitSet::new(self.variables.len())
    }

    fn transfer(&self, node: NodeId, output: &BitSet) -> BitSet {
        // IN = USE ∪ (OUT - DEF)
        apply_gen_kill(
            output,
            self.use_sets.get(node.index()),
            self.def_sets.get(node.index()),
        )
    }
}

/// Solved liveness, queryable by variable name.
#[derive(Debug, Clone)]
pub struct LivenessResults {
    variables: VariableTable,
    results: DataFlowResults,
}

impl LivenessResults {
    /// The variable domain.
    #[must_use]
    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// The raw `IN`/`OUT` sets.
    #[must_use]
    pub fn results(&self) -> &DataFlowResults {
        &self.results
    }

    /// Returns `true` if `variable` is live on entry to `node`.
    #[must_use]
    pub fn is_live_in(&self, node: NodeId, variable: &str) -> bool {
        Self::member(&self.variables, self.results.in_set(node), variable)
    }

    /// Returns `true` if `variable` is live on exit from `node`.
    #[must_use]
    pub fn is_live_out(&self, node: NodeId, variable: &str) -> bool {
        Self::member(&self.variables, self.results.out_set(node), variable)
    }

    /// Variables live on entry to `node`, in name order.
    #[must_use]
    pub fn live_in(&self, node: NodeId) -> Vec<&str> {
        self.results
            .in_set(node)
            .map_or_else(Vec::new, |set| self.variables.names_in(set))
    }

    /// Variables live on exit from `node`, in name order.
    #[must_use]
    pub fn live_out(&self, node: NodeId) -> Vec<&str> {
        self.results
            .out_set(node)
            .map_or_else(Vec::new, |set| self.variables.names_in(set))
    }

    fn member(variables: &VariableTable, set: Option<&BitSet>, variable: &str) -> bool {
        match (set, variables.index_of(variable)) {
            (Some(set), Some(idx)) => set.contains(idx),
            _ => false,
        }
    }
}
