//! Reaching definitions analysis.
//!
//! A definition `d` of variable `v` *reaches* a program point `p` if there
//! exists a path from `d` to `p` along which `v` is not redefined.
//!
//! # Algorithm
//!
//! This is a forward data flow analysis over definition sites
//! `(variable, block, statement index)`:
//!
//! - `GEN[B]` = the last definition of each variable assigned in B
//! - `KILL[B]` = every other definition of the variables assigned in B
//! - `IN[B]` = ∪{OUT[P] | P is a predecessor of B}
//! - `OUT[B]` = GEN[B] ∪ (IN[B] - KILL[B])
//!
//! No definition reaches the function entry: `IN[entry] = ∅`. Parameters are not
//! definition sites.

use crate::{
    analysis::{
        dataflow::{
            framework::{apply_gen_kill, DataFlowAnalysis, DataFlowCfg, Direction, Meet},
            solver::{DataFlowResults, DataFlowSolver},
            DefinitionSite, DefinitionTable,
        },
        ControlFlowGraph,
    },
    utils::{graph::NodeId, BitSet},
    Result,
};

/// Reaching definitions analysis.
///
/// # Example
///
/// ```rust
/// use goscope::{analysis::dataflow::ReachingDefinitions, ast::build::*, build_cfg};
///
/// let f = func(
///     "f",
///     &[],
///     vec![assign("x", int(1)), assign("x", int(2)), ret(vec![ident("x")])],
/// );
/// let cfg = build_cfg(&f)?;
/// let reaching = ReachingDefinitions::new(&cfg).compute(&cfg)?;
///
/// // Only the second assignment reaches the return.
/// let ret_block = cfg.successors(2.into()).next().unwrap();
/// let defs = reaching.definitions_of(ret_block, "x");
/// assert_eq!(defs.len(), 1);
/// assert_eq!(defs[0].index, 1);
/// # Ok::<(), goscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReachingDefinitions {
    definitions: DefinitionTable,
    gen_sets: Vec<BitSet>,
    kill_sets: Vec<BitSet>,
}

impl ReachingDefinitions {
    /// Enumerates the definitions of `cfg` and computes GEN and KILL per block.
    #[must_use]
    pub fn new(cfg: &ControlFlowGraph<'_>) -> Self {
        let definitions = DefinitionTable::from_cfg(cfg);
        let num_defs = definitions.len();

        let mut gen_sets = vec![BitSet::new(num_defs); cfg.block_count()];
        let mut kill_sets = vec![BitSet::new(num_defs); cfg.block_count()];

        for (id, site) in definitions.iter().enumerate() {
            let block = site.node.index();
            // A later definition in the same block shadows this one.
            for &other in definitions.indices_of(&site.variable) {
                gen_sets[block].remove(other);
                kill_sets[block].insert(other);
            }
            gen_sets[block].insert(id);
        }
        for (gen, kill) in gen_sets.iter().zip(kill_sets.iter_mut()) {
            kill.difference_with(gen);
        }

        ReachingDefinitions {
            definitions,
            gen_sets,
            kill_sets,
        }
    }

    /// The definition domain.
    #[must_use]
    pub fn definitions(&self) -> &DefinitionTable {
        &self.definitions
    }

    /// Definitions generated by `node`.
    #[must_use]
    pub fn gen_set(&self, node: NodeId) -> Option<&BitSet> {
        self.gen_sets.get(node.index())
    }

    /// Definitions killed by `node`.
    #[must_use]
    pub fn kill_set(&self, node: NodeId) -> Option<&BitSet> {
        self.kill_sets.get(node.index())
    }

    /// Solves the analysis with a default solver.
    ///
    /// # Errors
    ///
    /// Propagates the solver's errors.
    pub fn compute<G: DataFlowCfg>(self, graph: &G) -> Result<ReachingResults> {
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
    ) -> Result<ReachingResults> {
        let results = solver.solve(&self, graph)?;
        Ok(ReachingResults {
            definitions: self.definitions,
            results,
        })
    }
}

impl DataFlowAnalysis for ReachingDefinitions {
    fn name(&self) -> &str {
        "reaching_definitions"
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn meet(&self) -> Meet {
        Meet::Union
    }

    fn domain_size(&self) -> usize {
        self.definitions.len()
    }

    fn boundary(&self) -> BitSet {
        BitSet::new(self.definitions.len())
    }

    fn initial(&self) -> BitSet {
        BitSet::new(self.definitions.len())
    }

    fn transfer(&self, node: NodeId, input: &BitSet) -> BitSet {
        apply_gen_kill(
            input,
            self.gen_sets.get(node.index()),
            self.kill_sets.get(node.index()),
        )
    }
}

/// Solved reaching definitions.
#[derive(Debug, Clone)]
pub struct ReachingResults {
    definitions: DefinitionTable,
    results: DataFlowResults,
}

impl ReachingResults {
    /// The definition domain.
    #[must_use]
    pub fn definitions(&self) -> &DefinitionTable {
        &self.definitions
    }

    /// The raw `IN`/`OUT` sets.
    #[must_use]
    pub fn results(&self) -> &DataFlowResults {
        &self.results
    }

    /// Definitions reaching the start of `node`.
    #[must_use]
    pub fn reaching_in(&self, node: NodeId) -> Vec<&DefinitionSite> {
        self.results
            .in_set(node)
            .map_or_else(Vec::new, |set| self.definitions.sites_in(set))
    }

    /// Definitions reaching the end of `node`.
    #[must_use]
    pub fn reaching_out(&self, node: NodeId) -> Vec<&DefinitionSite> {
        self.results
            .out_set(node)
            .map_or_else(Vec::new, |set| self.definitions.sites_in(set))
    }

    /// Definitions of `variable` reaching the start of `node`.
    #[must_use]
    pub fn definitions_of(&self, node: NodeId, variable: &str) -> Vec<&DefinitionSite> {
        self.reaching_in(node)
            .into_iter()
            .filter(|site| site.variable == variable)
            .collect()
    }
}
