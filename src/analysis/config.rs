//! Analysis configuration for the per-function pipeline
//!
//! This module selects which stages [`analyze_function`](crate::analysis::analyze_function)
//! runs after building the control flow graph, and the limits those stages apply.

use bitflags::bitflags;

use crate::analysis::DEFAULT_MAX_NESTING_DEPTH;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Stages run after CFG construction
    pub struct Analyses: u8 {
        /// Convert the CFG to SSA form
        const SSA = 0x01;
        /// Live variables
        const LIVENESS = 0x02;
        /// Reaching definitions
        const REACHING = 0x04;
        /// Available expressions
        const AVAILABLE = 0x08;
        /// The three data flow analyses
        const DATAFLOW = Self::LIVENESS.bits() | Self::REACHING.bits() | Self::AVAILABLE.bits();
    }
}

/// Configuration for analysing one function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Stages to run after the CFG is built
    pub analyses: Analyses,

    /// Run the SSA verifier after conversion
    pub verify_ssa: bool,

    /// Maximum nesting depth of compound statements (default: 256)
    pub max_nesting_depth: usize,

    /// Upper bound on solver passes; `None` keeps the `|N| · |D| + 1` bound
    pub iteration_limit: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analyses: Analyses::SSA | Analyses::LIVENESS | Analyses::REACHING,
            verify_ssa: true,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            iteration_limit: None,
        }
    }
}

impl AnalysisConfig {
    /// Creates a configuration that only builds the CFG
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            analyses: Analyses::empty(),
            verify_ssa: false,
            ..Self::default()
        }
    }

    /// Creates a configuration running SSA conversion without verification
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            analyses: Analyses::SSA,
            verify_ssa: false,
            ..Self::default()
        }
    }

    /// Creates a configuration running every stage, with verification
    #[must_use]
    pub fn comprehensive() -> Self {
        Self {
            analyses: Analyses::all(),
            verify_ssa: true,
            ..Self::default()
        }
    }

    /// Returns `true` if `analyses` are all selected
    #[must_use]
    pub fn runs(&self, analyses: Analyses) -> bool {
        self.analyses.contains(analyses)
    }
}
