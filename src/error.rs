use thiserror::Error;

use crate::ast::Position;

macro_rules! invalid_ast {
    // Single string version
    ($pos:expr, $msg:expr) => {
        crate::Error::InvalidAst {
            position: $pos,
            reason: $msg.to_string(),
        }
    };

    // Format string with arguments version
    ($pos:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::InvalidAst {
            position: $pos,
            reason: format!($fmt, $($arg)*),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every top-level operation ([`build_cfg`](crate::build_cfg), [`to_ssa`](crate::to_ssa) and
/// [`solve`](crate::solve)) either returns its complete output or one of these values. Partial
/// results are never surfaced.
///
/// # Error Categories
///
/// ## Construction Errors
/// - [`Error::InvalidAst`] - The function body cannot be turned into a CFG
/// - [`Error::NoEntry`] - A graph without a designated entry block was handed to the SSA converter
/// - [`Error::GraphError`] - A graph operation referenced a node that does not exist
/// - [`Error::Serialization`] - A graph could not be written to or read from JSON
///
/// ## Internal Consistency Errors
/// - [`Error::SsaInternalError`] - The SSA verifier found a broken single-assignment property
/// - [`Error::DataFlowDiverged`] - The data-flow solver exceeded its iteration bound
///
/// ## Control
/// - [`Error::Cancelled`] - The embedder cancelled a running analysis
///
/// # Examples
///
/// ```rust
/// use goscope::{ast::build::*, build_cfg, Error};
///
/// let func = func("f", &[], vec![goto("missing")]);
/// match build_cfg(&func) {
///     Err(Error::InvalidAst { position, reason }) => {
///         eprintln!("{position}: {reason}");
///     }
///     Err(e) => eprintln!("other error: {e}"),
///     Ok(cfg) => println!("{} blocks", cfg.block_count()),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The AST handed to the CFG builder is malformed.
    ///
    /// Raised for undefined or duplicate labels, `break`/`continue` outside of an enclosing
    /// construct, `fallthrough` out of the final case clause and bodies nested deeper than
    /// the configured limit.
    #[error("Invalid AST at {position}: {reason}")]
    InvalidAst {
        /// Position of the offending statement
        position: Position,
        /// Human readable description of the problem
        reason: String,
    },

    /// The CFG has no entry block.
    #[error("The control flow graph has no entry block")]
    NoEntry,

    /// The SSA verifier found a violated single-assignment or dominance property.
    ///
    /// This never happens for CFGs produced by the builder and indicates a bug in the
    /// converter.
    #[error("SSA invariant violated for {name}_{version}: {reason}")]
    SsaInternalError {
        /// The base variable name
        name: String,
        /// The offending version
        version: u32,
        /// Which property was violated
        reason: String,
    },

    /// The data-flow solver did not reach a fixed point within `|N| * |D| + 1` passes.
    #[error("Data-flow analysis '{analysis}' diverged after {iterations} iterations (domain size {domain_size})")]
    DataFlowDiverged {
        /// Name of the analysis that diverged
        analysis: String,
        /// Number of elements in the analysis domain
        domain_size: usize,
        /// Iterations performed before giving up
        iterations: usize,
    },

    /// The analysis was cancelled through its cancellation token.
    #[error("Analysis was cancelled")]
    Cancelled,

    /// Graph construction or traversal error.
    ///
    /// Raised when an edge references a node that is not part of the graph.
    #[error("{0}")]
    GraphError(String),

    /// Exporting an analysis result to JSON failed.
    #[error("JSON export failed: {0}")]
    Serialization(String),
}

/// The result type used throughout goscope
pub type Result<T> = std::result::Result<T, Error>;
