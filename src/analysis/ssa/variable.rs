//! Versioned variable names and definition sites.

use std::fmt;

use crate::utils::graph::NodeId;

/// A versioned variable, displayed as `x_k`.
///
/// Version 0 stands for the value flowing into the function: a parameter, or a variable
/// read before any definition. It is never the target of a definition; every definition
/// mints the next version of its variable, starting at 1.
///
/// # Examples
///
/// ```rust
/// use goscope::analysis::SsaName;
///
/// let name = SsaName::new("y", 3);
/// assert_eq!(name.to_string(), "y_3");
/// assert!(!name.is_incoming());
/// assert!(SsaName::new("x", 0).is_incoming());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SsaName {
    /// The source variable
    pub variable: String,
    /// Version number; 0 for the incoming value
    pub version: u32,
}

impl SsaName {
    /// Creates a versioned name.
    #[must_use]
    pub fn new(variable: impl Into<String>, version: u32) -> Self {
        SsaName {
            variable: variable.into(),
            version,
        }
    }

    /// Returns `true` for version 0, the value live on function entry.
    #[must_use]
    pub fn is_incoming(&self) -> bool {
        self.version == 0
    }
}

impl fmt::Display for SsaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.variable, self.version)
    }
}

/// Where an SSA name is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DefSite {
    /// By a φ-function at the entry of a block
    Phi(NodeId),
    /// By the statement at `index` within `node`
    Stmt {
        /// Defining block
        node: NodeId,
        /// Position of the statement within the block
        index: usize,
    },
}

impl DefSite {
    /// The defining block.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        match *self {
            DefSite::Phi(node) | DefSite::Stmt { node, .. } => node,
        }
    }
}

impl fmt::Display for DefSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefSite::Phi(node) => write!(f, "φ in {node}"),
            DefSite::Stmt { node, index } => write!(f, "statement {index} of {node}"),
        }
    }
}
