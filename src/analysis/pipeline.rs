//! Per-function analysis driver.
//!
//! [`analyze_function`] runs the configured stages on one function and applies the
//! error recovery policy:
//!
//! | Error | Effect |
//! |-------|--------|
//! | [`Error::InvalidAst`] | the function is skipped (returned as the error) |
//! | [`Error::NoEntry`], [`Error::SsaInternalError`] | SSA is skipped and recorded as a failure |
//! | [`Error::DataFlowDiverged`] | that analysis is skipped and recorded as a failure |
//! | [`Error::Cancelled`] | the function is abandoned (returned as the error) |
//!
//! A failed stage never contributes a partial result. [`analyze_functions`] fans out over
//! functions with rayon; each function is still analysed on a single thread.

use std::{collections::BTreeMap, sync::atomic::Ordering};

use rayon::prelude::*;
use strum::{Display, IntoStaticStr};
use tracing::{debug, instrument, warn};

use crate::{
    analysis::{
        dataflow::{
            AvailableExpressions, AvailableResults, CancellationToken, DataFlowSolver, Liveness,
            LivenessResults, ReachingDefinitions, ReachingResults,
        },
        Analyses, AnalysisConfig, CfgBuilder, ControlFlowGraph, PhiFunction, SsaConfig,
        SsaConverter,
    },
    ast::FuncDecl,
    utils::graph::NodeId,
    Error, Result,
};

/// A stage of the per-function pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// SSA conversion
    Ssa,
    /// Live variables
    Liveness,
    /// Reaching definitions
    Reaching,
    /// Available expressions
    Available,
}

/// A stage that was skipped because it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    /// The failed stage
    pub stage: Stage,
    /// Why it failed
    pub error: Error,
}

/// What SSA conversion produced for a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsaSummary {
    /// Every φ-function with its block, in block order
    pub phis: Vec<(NodeId, PhiFunction)>,
    /// Highest version minted per variable
    pub versions: BTreeMap<String, u32>,
}

impl SsaSummary {
    /// Number of φ-functions.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.phis.len()
    }
}

/// Everything the pipeline computed for one function.
#[derive(Debug)]
pub struct FunctionAnalysis<'ast> {
    /// The control flow graph
    pub cfg: ControlFlowGraph<'ast>,
    /// SSA conversion, if selected and successful
    pub ssa: Option<SsaSummary>,
    /// Live variables, if selected and successful
    pub liveness: Option<LivenessResults>,
    /// Reaching definitions, if selected and successful
    pub reaching: Option<ReachingResults>,
    /// Available expressions, if selected and successful
    pub available: Option<AvailableResults>,
    /// Stages that were selected but failed
    pub failures: Vec<StageFailure>,
}

impl FunctionAnalysis<'_> {
    /// Name of the analysed function.
    #[must_use]
    pub fn name(&self) -> &str {
        self.cfg.name()
    }

    /// Returns `true` if no selected stage failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The failure of `stage`, if it failed.
    #[must_use]
    pub fn failure(&self, stage: Stage) -> Option<&Error> {
        self.failures
            .iter()
            .find(|failure| failure.stage == stage)
            .map(|failure| &failure.error)
    }
}

/// Analyses one function.
///
/// `cancel` is polled before every stage and by the data flow solver between passes.
///
/// # Errors
///
/// Returns [`Error::InvalidAst`] if the CFG cannot be built and [`Error::Cancelled`] if
/// `cancel` was set. Failures of later stages are recorded in
/// [`FunctionAnalysis::failures`].
///
/// # Examples
///
/// ```rust
/// use goscope::{
///     analysis::{analyze_function, AnalysisConfig},
///     ast::build::*,
/// };
///
/// let f = func("f", &["x"], vec![assign("y", add(ident("x"), int(1))), ret(vec![ident("y")])]);
/// let report = analyze_function(&f, &AnalysisConfig::comprehensive(), None)?;
///
/// assert!(report.is_complete());
/// assert_eq!(report.ssa.as_ref().unwrap().versions["y"], 1);
/// assert!(report.available.is_some());
/// # Ok::<(), goscope::Error>(())
/// ```
#[instrument(level = "debug", skip_all, fields(function = %func.name))]
pub fn analyze_function<'ast>(
    func: &'ast FuncDecl,
    config: &AnalysisConfig,
    cancel: Option<&CancellationToken>,
) -> Result<FunctionAnalysis<'ast>> {
    let check_cancel = || -> Result<()> {
        match cancel {
            Some(token) if token.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    };

    check_cancel()?;
    let cfg = CfgBuilder::new()
        .with_max_nesting_depth(config.max_nesting_depth)
        .build(func)?;

    let mut report = FunctionAnalysis {
        cfg,
        ssa: None,
        liveness: None,
        reaching: None,
        available: None,
        failures: Vec::new(),
    };

    if config.runs(Analyses::SSA) {
        check_cancel()?;
        let converter = SsaConverter::new(SsaConfig {
            verify: config.verify_ssa,
        });
        match converter.convert(&report.cfg) {
            Ok(ssa) => {
                let phis = ssa
                    .nodes()
                    .flat_map(|node| node.phis.iter().map(move |phi| (node.id, phi.clone())))
                    .collect();
                report.ssa = Some(SsaSummary {
                    phis,
                    versions: ssa.versions().clone(),
                });
            }
            Err(error) => {
                warn!(%error, "skipping SSA");
                report.failures.push(StageFailure {
                    stage: Stage::Ssa,
                    error,
                });
            }
        }
    }

    let mut solver = DataFlowSolver::new();
    if let Some(limit) = config.iteration_limit {
        solver = solver.with_iteration_limit(limit);
    }
    if let Some(token) = cancel {
        solver = solver.with_cancellation(token.clone());
    }

    if config.runs(Analyses::LIVENESS) {
        check_cancel()?;
        let outcome = Liveness::new(&report.cfg).compute_with(&solver, &report.cfg);
        report.liveness = record(outcome, Stage::Liveness, &mut report.failures)?;
    }
    if config.runs(Analyses::REACHING) {
        check_cancel()?;
        let outcome = ReachingDefinitions::new(&report.cfg).compute_with(&solver, &report.cfg);
        report.reaching = record(outcome, Stage::Reaching, &mut report.failures)?;
    }
    if config.runs(Analyses::AVAILABLE) {
        check_cancel()?;
        let outcome = AvailableExpressions::new(&report.cfg).compute_with(&solver, &report.cfg);
        report.available = record(outcome, Stage::Available, &mut report.failures)?;
    }

    debug!(
        blocks = report.cfg.block_count(),
        failures = report.failures.len(),
        "function analysed"
    );
    Ok(report)
}

/// Keeps a successful data flow result, records a divergence, and propagates
/// cancellation.
fn record<T>(outcome: Result<T>, stage: Stage, failures: &mut Vec<StageFailure>) -> Result<Option<T>> {
    match outcome {
        Ok(results) => Ok(Some(results)),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(error) => {
            warn!(%stage, %error, "skipping analysis");
            failures.push(StageFailure { stage, error });
            Ok(None)
        }
    }
}

/// Analyses every function of `funcs` in parallel.
///
/// Results are returned in input order; a function that fails to build does not affect
/// the others.
pub fn analyze_functions<'ast>(
    funcs: &'ast [FuncDecl],
    config: &AnalysisConfig,
) -> Vec<Result<FunctionAnalysis<'ast>>> {
    funcs
        .par_iter()
        .map(|func| analyze_function(func, config, None))
        .collect()
}
