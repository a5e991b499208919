//! Available expressions analysis.
//!
//! An expression `e` is *available* at a program point if every path from the
//! entry to that point evaluates `e`, and none of `e`'s operands is assigned
//! between that evaluation and the point.
//!
//! # Algorithm
//!
//! This is a forward must-analysis over the expressions of an
//! [`ExpressionTable`]:
//!
//! - `GEN[B]` = expressions evaluated in B whose operands B does not assign afterwards
//! - `KILL[B]` = expressions reading a variable B assigns
//! - `IN[B]` = ∩{OUT[P] | P is a predecessor of B} (∅ without predecessors)
//! - `OUT[B]` = GEN[B] ∪ (IN[B] - KILL[B])
//!
//! Nothing is available at the function entry; every other set starts at the full
//! domain, the top of the intersection lattice.

use crate::{
    analysis::{
        dataflow::{
            domain::candidates,
            framework::{apply_gen_kill, DataFlowAnalysis, DataFlowCfg, Direction, Meet},
            solver::{DataFlowResults, DataFlowSolver},
            ExpressionTable,
        },
        ControlFlowGraph,
    },
    utils::{graph::NodeId, BitSet},
    Result,
};

/// Available expressions analysis.
#[derive(Debug, Clone)]
pub struct AvailableExpressions {
    expressions: ExpressionTable,
    gen_sets: Vec<BitSet>,
    kill_sets: Vec<BitSet>,
}

impl AvailableExpressions {
    /// Collects the candidate expressions of `cfg` and computes GEN and KILL per block.
    #[must_use]
    pub fn new(cfg: &ControlFlowGraph<'_>) -> Self {
        let expressions = ExpressionTable::from_cfg(cfg);
        let num_exprs = expressions.len();

        let mut gen_sets = Vec::with_capacity(cfg.block_count());
        let mut kill_sets = Vec::with_capacity(cfg.block_count());

        for block in cfg.blocks() {
            let mut gen = BitSet::new(num_exprs);
            let mut kill = BitSet::new(num_exprs);

            for stmt in &block.stmts {
                for expr in stmt.expressions() {
                    for candidate in candidates(expr) {
                        if let Some(idx) = expressions.index_of_expr(candidate) {
                            gen.insert(idx);
                        }
                    }
                }
                for var in stmt.defined_variables() {
                    for idx in expressions.reading(var) {
                        gen.remove(idx);
                        kill.insert(idx);
                    }
                }
            }

            gen_sets.push(gen);
            kill_sets.push(kill);
        }

        AvailableExpressions {
            expressions,
            gen_sets,
            kill_sets,
        }
    }

    /// The expression domain.
    #[must_use]
    pub fn expressions(&self) -> &ExpressionTable {
        &self.expressions
    }

    /// Expressions generated by `node`.
    #[must_use]
    pub fn gen_set(&self, node: NodeId) -> Option<&BitSet> {
        self.gen_sets.get(node.index())
    }

    /// Expressions killed by `node`.
    #[must_use]
    pub fn kill_set(&self, node: NodeId) -> Option<&BitSet> {
        self.kill_sets.get(node.index())
    }

    /// Solves the analysis with a default solver.
    ///
    /// # Errors
    ///
    /// Propagates the solver's errors.
    pub fn compute<G: DataFlowCfg>(self, graph: &G) -> Result<AvailableResults> {
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
    ) -> Result<AvailableResults> {
        let results = solver.solve(&self, graph)?;
        Ok(AvailableResults {
            expressions: self.expressions,
            results,
        })
    }
}

impl DataFlowAnalysis for AvailableExpressions {
    fn name(&self) -> &str {
        "available_expressions"
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn meet(&self) -> Meet {
        Meet::Intersection
    }

    fn domain_size(&self) -> usize {
        self.expressions.len()
    }

    fn boundary(&self) -> BitSet {
        BitSet::new(self.expressions.len())
    }

    fn initial(&self) -> BitSet {
        BitSet::full(self.expressions.len())
    }

    fn transfer(&self, node: NodeId, input: &BitSet) -> BitSet {
        apply_gen_kill(
            input,
            self.gen_sets.get(node.index()),
            self.kill_sets.get(node.index()),
        )
    }
}

/// Solved available expressions, queryable by canonical expression text.
#[derive(Debug, Clone)]
pub struct AvailableResults {
    expressions: ExpressionTable,
    results: DataFlowResults,
}

impl AvailableResults {
    /// The expression domain.
    #[must_use]
    pub fn expressions(&self) -> &ExpressionTable {
        &self.expressions
    }

    /// The raw `IN`/`OUT` sets.
    #[must_use]
    pub fn results(&self) -> &DataFlowResults {
        &self.results
    }

    /// Expressions available on entry to `node`.
    #[must_use]
    pub fn available_in(&self, node: NodeId) -> Vec<&str> {
        self.results
            .in_set(node)
            .map_or_else(Vec::new, |set| self.expressions.texts_in(set))
    }

    /// Expressions available on exit from `node`.
    #[must_use]
    pub fn available_out(&self, node: NodeId) -> Vec<&str> {
        self.results
            .out_set(node)
            .map_or_else(Vec::new, |set| self.expressions.texts_in(set))
    }

    /// Returns `true` if the expression with canonical text `text` is available on entry
    /// to `node`.
    #[must_use]
    pub fn is_available_in(&self, node: NodeId, text: &str) -> bool {
        self.member(self.results.in_set(node), text)
    }

    /// Returns `true` if the expression with canonical text `text` is available on exit
    /// from `node`.
    #[must_use]
    pub fn is_available_out(&self, node: NodeId, text: &str) -> bool {
        self.member(self.results.out_set(node), text)
    }

    fn member(&self, set: Option<&BitSet>, text: &str) -> bool {
        match (set, self.expressions.index_of(text)) {
            (Some(set), Some(idx)) => set.contains(idx),
            _ => false,
        }
    }
}
