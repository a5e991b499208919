//! φ-functions.
//!
//! A φ-function `y_3 = φ(y_1 from n4, y_2 from n5)` at the entry of a join block selects
//! `y_1` when control arrives from `n4` and `y_2` when it arrives from `n5`. All
//! φ-functions of a block execute simultaneously, before the block's first statement.

use std::{collections::BTreeMap, fmt};

use crate::{analysis::ssa::SsaName, utils::graph::NodeId};

/// A φ-function attached to a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhiFunction {
    /// Variable merged by this φ
    pub variable: String,
    /// Version defined by this φ
    pub version: u32,
    /// Number of predecessors of the block at placement time
    pub arity: usize,
    /// Incoming name per predecessor block
    pub sources: BTreeMap<NodeId, SsaName>,
}

impl PhiFunction {
    pub(crate) fn new(variable: &str, arity: usize) -> Self {
        PhiFunction {
            variable: variable.to_string(),
            version: 0,
            arity,
            sources: BTreeMap::new(),
        }
    }

    /// The name this φ defines.
    #[must_use]
    pub fn target(&self) -> SsaName {
        SsaName::new(self.variable.as_str(), self.version)
    }

    /// The name flowing in from `predecessor`, if recorded.
    #[must_use]
    pub fn source(&self, predecessor: NodeId) -> Option<&SsaName> {
        self.sources.get(&predecessor)
    }
}

impl fmt::Display for PhiFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = φ(", self.target())?;
        for (i, (pred, name)) in self.sources.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name} from {pred}")?;
        }
        f.write_str(")")
    }
}
