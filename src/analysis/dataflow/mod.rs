//! Monotone data flow analysis framework.
//!
//! This module computes facts that propagate along control flow edges: which variables
//! are live, which definitions reach a point, which expressions are available. Facts
//! are sets over a finite domain, stored as bitmaps.
//!
//! # Architecture
//!
//! The framework is built around three core abstractions:
//!
//! - **Domain**: a fixed enumeration of the facts ([`VariableTable`],
//!   [`DefinitionTable`], [`ExpressionTable`])
//! - **Analysis**: direction, meet, boundary and transfer functions
//!   ([`DataFlowAnalysis`], or an ad-hoc [`DataFlowProblem`])
//! - **Solver**: round-robin iteration to the fixed point ([`DataFlowSolver`])
//!
//! # Analyses Provided
//!
//! - [`Liveness`]: which variables are live at each block boundary (backward, union)
//! - [`ReachingDefinitions`]: which definitions may reach each block (forward, union)
//! - [`AvailableExpressions`]: which expressions are computed on every path (forward,
//!   intersection)
//!
//! # Example
//!
//! ```rust
//! use goscope::{
//!     analysis::dataflow::{Liveness, ReachingDefinitions},
//!     ast::build::*,
//!     build_cfg, to_ssa,
//! };
//!
//! let f = func(
//!     "f",
//!     &[],
//!     vec![
//!         assign("i", int(0)),
//!         while_loop(lt(ident("i"), int(10)), vec![inc("i")]),
//!     ],
//! );
//! let cfg = build_cfg(&f)?;
//! let ssa = to_ssa(&cfg)?;
//!
//! // Analyses run on the CFG or on its SSA form, which shares node ids.
//! let live = Liveness::new(&cfg).compute(&ssa)?;
//! let reaching = ReachingDefinitions::new(&cfg).compute(&cfg)?;
//!
//! let header = cfg.loops()[0].header;
//! assert!(live.is_live_in(header, "i"));
//! assert_eq!(reaching.definitions_of(header, "i").len(), 2);
//! # Ok::<(), goscope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`; a solve runs entirely on the calling
//! thread.

mod available;
mod domain;
mod framework;
mod liveness;
mod reaching;
mod solver;

pub use available::{AvailableExpressions, AvailableResults};
pub use domain::{DefinitionSite, DefinitionTable, ExpressionEntry, ExpressionTable, VariableTable};
pub use framework::{DataFlowAnalysis, DataFlowCfg, DataFlowProblem, Direction, Meet, Transfer};
pub use liveness::{Liveness, LivenessResults};
pub use reaching::{ReachingDefinitions, ReachingResults};
pub use solver::{CancellationToken, DataFlowResults, DataFlowSolver};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{CfgBuilder, SsaConverter},
        ast::build::*,
    };

    fn assert_fixed_point<A: DataFlowAnalysis>(analysis: &A, cfg: &crate::analysis::ControlFlowGraph<'_>) {
        let results = DataFlowSolver::new().solve(analysis, cfg).unwrap();
        assert!(results.is_fixed_point(analysis, cfg), "{}", analysis.name());
        assert!(
            results.iterations
                <= DataFlowSolver::default_bound(cfg.block_count(), analysis.domain_size())
        );
    }

    #[test]
    fn test_standard_analyses_reach_fixed_points() {
        let f = func(
            "f",
            &["n", "xs"],
            vec![
                define("sum", int(0)),
                range(Some("i"), Some("v"), ident("xs"), vec![
                    if_stmt(gt(ident("v"), ident("n")), vec![brk()]),
                    compound("sum", crate::ast::BinaryOp::Add, mul(ident("v"), ident("i"))),
                ]),
                switch(
                    Some(ident("sum")),
                    vec![
                        case(vec![int(0)], vec![ret(vec![int(0)])]),
                        default_case(vec![assign("sum", add(ident("sum"), ident("n")))]),
                    ],
                ),
                ret(vec![ident("sum")]),
            ],
        );
        let cfg = CfgBuilder::new().build(&f).unwrap();

        assert_fixed_point(&Liveness::new(&cfg), &cfg);
        assert_fixed_point(&ReachingDefinitions::new(&cfg), &cfg);
        assert_fixed_point(&AvailableExpressions::new(&cfg), &cfg);
    }

    #[test]
    fn test_results_identical_on_ssa_graph() {
        let f = func(
            "f",
            &["c"],
            vec![
                if_else(ident("c"), vec![assign("y", int(1))], vec![assign("y", int(2))]),
                ret(vec![ident("y")]),
            ],
        );
        let cfg = CfgBuilder::new().build(&f).unwrap();
        let ssa = SsaConverter::default().convert(&cfg).unwrap();

        let on_cfg = Liveness::new(&cfg).compute(&cfg).unwrap();
        let on_ssa = Liveness::new(&cfg).compute(&ssa).unwrap();
        assert_eq!(on_cfg.results(), on_ssa.results());
    }
}
