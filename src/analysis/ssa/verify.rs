//! Structural checks on SSA form.
//!
//! A well-formed SSA graph satisfies three properties:
//!
//! - every name is defined exactly once,
//! - every use of a non-incoming name is dominated by its definition (a φ source only has
//!   to be available at the end of its predecessor),
//! - every φ-function has exactly one source per predecessor of its block.
//!
//! Unreachable blocks carry no resolved names and are skipped.

use std::{collections::BTreeMap, fmt};

use crate::{
    analysis::ssa::{DefSite, SsaCfg, SsaName},
    utils::graph::NodeId,
    Error,
};

/// A broken SSA property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsaViolation {
    /// `name` is defined at two sites
    DuplicateDefinition {
        /// The name defined twice
        name: SsaName,
        /// The earlier site
        first: DefSite,
        /// The later site
        second: DefSite,
    },
    /// `name` is used in `node` but never defined
    UndefinedUse {
        /// The undefined name
        name: SsaName,
        /// Block containing the use
        node: NodeId,
    },
    /// The definition of `name` does not dominate its use in `node`
    UseNotDominated {
        /// The used name
        name: SsaName,
        /// Where the name is defined
        def: DefSite,
        /// Block containing the use
        node: NodeId,
    },
    /// A φ-function does not have one source per predecessor
    PhiArity {
        /// The φ target
        name: SsaName,
        /// Block of the φ-function
        node: NodeId,
        /// Number of predecessors of the block
        expected: usize,
        /// Number of recorded sources
        found: usize,
    },
}

impl SsaViolation {
    /// The name the violation is about.
    #[must_use]
    pub fn name(&self) -> &SsaName {
        match self {
            SsaViolation::DuplicateDefinition { name, .. }
            | SsaViolation::UndefinedUse { name, .. }
            | SsaViolation::UseNotDominated { name, .. }
            | SsaViolation::PhiArity { name, .. } => name,
        }
    }

    pub(crate) fn into_error(self) -> Error {
        let reason = match &self {
            SsaViolation::DuplicateDefinition { first, second, .. } => {
                format!("defined at {first} and again at {second}")
            }
            SsaViolation::UndefinedUse { node, .. } => format!("used in {node} but never defined"),
            SsaViolation::UseNotDominated { def, node, .. } => {
                format!("definition at {def} does not dominate its use in {node}")
            }
            SsaViolation::PhiArity {
                node,
                expected,
                found,
                ..
            } => format!("φ in {node} has {found} sources for {expected} predecessors"),
        };
        let name = self.name();
        Error::SsaInternalError {
            name: name.variable.clone(),
            version: name.version,
            reason,
        }
    }
}

impl fmt::Display for SsaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SsaViolation::DuplicateDefinition {
                name,
                first,
                second,
            } => write!(f, "{name} defined at {first} and {second}"),
            SsaViolation::UndefinedUse { name, node } => {
                write!(f, "{name} used in {node} without a definition")
            }
            SsaViolation::UseNotDominated { name, def, node } => {
                write!(f, "{name} defined at {def} does not dominate use in {node}")
            }
            SsaViolation::PhiArity {
                name,
                node,
                expected,
                found,
            } => write!(
                f,
                "φ for {name} in {node} has {found} sources, expected {expected}"
            ),
        }
    }
}

/// Collects every violation, in block order.
pub(crate) fn check(ssa: &SsaCfg<'_, '_>) -> Vec<SsaViolation> {
    let mut violations = Vec::new();

    let mut sites: BTreeMap<SsaName, DefSite> = BTreeMap::new();
    for (name, site) in ssa.definitions() {
        if let Some(&first) = sites.get(&name) {
            violations.push(SsaViolation::DuplicateDefinition {
                name,
                first,
                second: site,
            });
        } else {
            sites.insert(name, site);
        }
    }

    let cfg = ssa.cfg();
    let dominators = ssa.dominators();

    for node in ssa.nodes().filter(|n| dominators.is_reachable(n.id)) {
        let preds: Vec<NodeId> = cfg
            .predecessors(node.id)
            .filter(|&p| dominators.is_reachable(p))
            .collect();

        for phi in &node.phis {
            let misplaced = phi.sources.keys().any(|source| !preds.contains(source));
            let missing = preds.iter().any(|pred| !phi.sources.contains_key(pred));
            if misplaced || missing || phi.arity != cfg.predecessors(node.id).count() {
                violations.push(SsaViolation::PhiArity {
                    name: phi.target(),
                    node: node.id,
                    expected: preds.len(),
                    found: phi.sources.len(),
                });
            }

            for (&pred, source) in &phi.sources {
                if source.is_incoming() {
                    continue;
                }
                match sites.get(source) {
                    None => violations.push(SsaViolation::UndefinedUse {
                        name: source.clone(),
                        node: pred,
                    }),
                    Some(&def) if !dominators.dominates(def.node(), pred) => {
                        violations.push(SsaViolation::UseNotDominated {
                            name: source.clone(),
                            def,
                            node: pred,
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        for (index, stmt) in node.stmts.iter().enumerate() {
            for used in stmt.uses.iter().filter(|name| !name.is_incoming()) {
                let Some(&def) = sites.get(used) else {
                    violations.push(SsaViolation::UndefinedUse {
                        name: used.clone(),
                        node: node.id,
                    });
                    continue;
                };
                let dominated = match def {
                    DefSite::Stmt { node: d, index: j } if d == node.id => j < index,
                    _ => dominators.dominates(def.node(), node.id),
                };
                if !dominated {
                    violations.push(SsaViolation::UseNotDominated {
                        name: used.clone(),
                        def,
                        node: node.id,
                    });
                }
            }
        }
    }

    violations
}
