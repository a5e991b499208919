//! Control flow edge kinds.
//!
//! Every edge of a [`ControlFlowGraph`](crate::analysis::ControlFlowGraph) carries the
//! construct that produced it. Kinds are informational: the graph invariants and the
//! analyses only look at adjacency, while visualizers and report writers use the kind to
//! label and colour edges.

use strum::IntoStaticStr;

/// The kind of control flow represented by an edge.
///
/// # Examples
///
/// ```rust
/// use goscope::analysis::CfgEdgeKind;
///
/// let edge_kind = CfgEdgeKind::ConditionalTrue;
/// assert!(edge_kind.is_conditional());
/// assert_eq!(edge_kind.label(), "true");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CfgEdgeKind {
    /// Straight-line flow into the next block.
    Unconditional,

    /// The branch taken when a condition holds (`if` then-branch, loop body).
    ConditionalTrue,

    /// The branch taken when a condition fails (`if` else-branch, loop exit).
    ConditionalFalse,

    /// From a switch or select header into the clause at `index`.
    Case {
        /// 0-based clause position in source order
        index: usize,
    },

    /// From a switch or select header into the `default` clause, or to the merge block
    /// when a switch has no default clause.
    Default,

    /// From the end of a switch clause into the next clause.
    Fallthrough,

    /// From the end of a loop body or post statement back to the loop header.
    Back,

    /// A `break` statement.
    Break,

    /// A `continue` statement.
    Continue,

    /// A `goto` statement.
    Goto,

    /// From a `return` block to the function exit.
    Return,
}

impl CfgEdgeKind {
    /// Returns `true` for the two branches of a condition.
    ///
    /// ```rust
    /// use goscope::analysis::CfgEdgeKind;
    ///
    /// assert!(CfgEdgeKind::ConditionalTrue.is_conditional());
    /// assert!(CfgEdgeKind::ConditionalFalse.is_conditional());
    /// assert!(!CfgEdgeKind::Unconditional.is_conditional());
    /// ```
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        matches!(self, Self::ConditionalTrue | Self::ConditionalFalse)
    }

    /// Returns `true` for edges leaving a switch or select header.
    #[must_use]
    pub const fn is_case(&self) -> bool {
        matches!(self, Self::Case { .. } | Self::Default)
    }

    /// Returns `true` for edges created by an explicit jump statement.
    #[must_use]
    pub const fn is_jump(&self) -> bool {
        matches!(self, Self::Break | Self::Continue | Self::Goto | Self::Return)
    }

    /// A short human-readable label; empty for unconditional flow.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Unconditional => String::new(),
            Self::ConditionalTrue => "true".to_string(),
            Self::ConditionalFalse => "false".to_string(),
            Self::Case { index } => format!("case {index}"),
            other => <&'static str>::from(other).to_string(),
        }
    }
}
