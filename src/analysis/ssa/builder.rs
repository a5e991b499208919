//! SSA construction (Cytron et al.).
//!
//! > Cytron et al., "Efficiently Computing Static Single Assignment Form and the
//! > Control Dependence Graph", ACM TOPLAS 1991
//!
//! # Algorithm Overview
//!
//! 1. **Dominators**: iterative dominance sets over the reverse postorder, and the
//!    dominance frontier of every block.
//! 2. **φ Placement**: for each variable, the iterated dominance frontier of its defining
//!    blocks receives a φ-function. A φ counts as a definition, so the frontier of a block
//!    that just received one is explored as well.
//! 3. **Renaming**: a preorder walk of the dominator tree keeps one stack of live versions
//!    per variable. Each definition mints the next version from a counter scoped to this
//!    conversion; each use reads the top of its stack. φ sources are filled in from every
//!    predecessor, and the versions a block pushed are popped once its dominator subtree
//!    is done.
//!
//! The walk runs on an explicit heap stack, so deeply nested functions cannot exhaust
//! the call stack. Children of a dominator-tree node are visited in ascending block id
//! order, which makes version numbering deterministic.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument, trace};

use crate::{
    analysis::{
        ssa::{PhiFunction, SsaCfg, SsaName, SsaNode, SsaStatement},
        ControlFlowGraph,
    },
    utils::graph::{algorithms, NodeId},
    Error, Result,
};

/// Configuration of the SSA converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsaConfig {
    /// Run the verifier on the result and fail with
    /// [`Error::SsaInternalError`](crate::Error::SsaInternalError) on the first violation.
    pub verify: bool,
}

impl Default for SsaConfig {
    fn default() -> Self {
        SsaConfig { verify: true }
    }
}

impl SsaConfig {
    /// Conversion without the verification pass.
    #[must_use]
    pub const fn unchecked() -> Self {
        SsaConfig { verify: false }
    }
}

/// Converts control flow graphs into SSA form.
///
/// # Examples
///
/// ```rust
/// use goscope::{
///     analysis::{SsaConfig, SsaConverter},
///     ast::build::*,
///     build_cfg,
/// };
///
/// let f = func(
///     "f",
///     &["x"],
///     vec![
///         if_else(
///             gt(ident("x"), int(0)),
///             vec![assign("y", int(1))],
///             vec![assign("y", int(2))],
///         ),
///         ret(vec![ident("y")]),
///     ],
/// );
/// let cfg = build_cfg(&f)?;
/// let ssa = SsaConverter::new(SsaConfig::default()).convert(&cfg)?;
///
/// let merge = cfg.blocks().find(|b| b.label == "if_merge").unwrap().id;
/// assert_eq!(ssa.phis(merge)[0].to_string(), "y_3 = φ(y_1 from n4, y_2 from n5)");
/// # Ok::<(), goscope::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SsaConverter {
    config: SsaConfig,
}

impl SsaConverter {
    /// Creates a converter.
    #[must_use]
    pub const fn new(config: SsaConfig) -> Self {
        SsaConverter { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SsaConfig {
        &self.config
    }

    /// Converts `cfg` into SSA form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoEntry`] if the graph has no entry block, and
    /// [`Error::SsaInternalError`] if verification is enabled and fails.
    #[instrument(level = "debug", skip_all, fields(function = %cfg.name()))]
    pub fn convert<'cfg, 'ast>(
        &self,
        cfg: &'cfg ControlFlowGraph<'ast>,
    ) -> Result<SsaCfg<'cfg, 'ast>> {
        if cfg.block(cfg.entry()).is_none() {
            return Err(Error::NoEntry);
        }

        let dominators = cfg.dominators().clone();
        let frontiers = algorithms::compute_dominance_frontiers(cfg, &dominators);
        let mut phis = place_phis(cfg, &dominators, &frontiers);

        let mut renamer = Renamer::new(cfg);
        let stmts = renamer.rename(&dominators, &mut phis);

        let nodes: Vec<SsaNode<'ast>> = phis
            .into_iter()
            .zip(stmts)
            .enumerate()
            .map(|(index, (phis, stmts))| SsaNode {
                id: NodeId::new(index),
                phis,
                stmts,
            })
            .collect();

        let ssa = SsaCfg::new(cfg, nodes, dominators, frontiers, renamer.next_version);
        debug!(
            phis = ssa.phi_count(),
            variables = ssa.versions().len(),
            "converted to SSA"
        );

        if self.config.verify {
            ssa.verify()?;
        }
        Ok(ssa)
    }
}

/// Places φ-functions on the iterated dominance frontier of every variable's
/// definitions. Variables are processed in name order, so φ lists are name-ordered.
fn place_phis(
    cfg: &ControlFlowGraph<'_>,
    dominators: &algorithms::DominatorTree,
    frontiers: &[BTreeSet<NodeId>],
) -> Vec<Vec<PhiFunction>> {
    let mut def_blocks: BTreeMap<&str, BTreeSet<NodeId>> = BTreeMap::new();
    for block in cfg.blocks().filter(|b| dominators.is_reachable(b.id)) {
        for stmt in &block.stmts {
            for var in stmt.defined_variables() {
                def_blocks.entry(var).or_default().insert(block.id);
            }
        }
    }

    let mut phis: Vec<Vec<PhiFunction>> = vec![Vec::new(); cfg.block_count()];
    for (var, defs) in &def_blocks {
        let mut has_phi = BTreeSet::new();
        let mut worklist: Vec<NodeId> = defs.iter().copied().collect();

        while let Some(block) = worklist.pop() {
            for &frontier in &frontiers[block.index()] {
                if !has_phi.insert(frontier) {
                    continue;
                }
                let arity = cfg.predecessors(frontier).count();
                trace!(variable = var, block = %frontier, arity, "placing φ");
                phis[frontier.index()].push(PhiFunction::new(var, arity));
                if !defs.contains(&frontier) {
                    worklist.push(frontier);
                }
            }
        }
    }
    phis
}

/// One step of the dominator-tree walk.
enum Frame {
    /// Rename a block, then schedule its children
    Enter(NodeId),
    /// Pop the versions a finished block pushed
    Exit(Vec<String>),
}

struct Renamer<'cfg, 'ast> {
    cfg: &'cfg ControlFlowGraph<'ast>,
    stacks: BTreeMap<String, Vec<u32>>,
    next_version: BTreeMap<String, u32>,
}

impl<'cfg, 'ast> Renamer<'cfg, 'ast> {
    fn new(cfg: &'cfg ControlFlowGraph<'ast>) -> Self {
        Renamer {
            cfg,
            stacks: BTreeMap::new(),
            next_version: BTreeMap::new(),
        }
    }

    fn mint(&mut self, var: &str) -> u32 {
        let counter = self.next_version.entry(var.to_string()).or_insert(0);
        *counter += 1;
        let version = *counter;
        self.stacks.entry(var.to_string()).or_default().push(version);
        version
    }

    fn current(&self, var: &str) -> SsaName {
        let version = self
            .stacks
            .get(var)
            .and_then(|stack| stack.last())
            .copied()
            .unwrap_or(0);
        SsaName::new(var, version)
    }

    /// Renames every reachable block; unreachable blocks keep their statements with no
    /// resolved names.
    fn rename(
        &mut self,
        dominators: &algorithms::DominatorTree,
        phis: &mut [Vec<PhiFunction>],
    ) -> Vec<Vec<SsaStatement<'ast>>> {
        let cfg = self.cfg;
        let mut renamed: Vec<Vec<SsaStatement<'ast>>> = cfg
            .blocks()
            .map(|block| {
                block
                    .stmts
                    .iter()
                    .map(|&stmt| SsaStatement {
                        stmt,
                        uses: Vec::new(),
                        defs: Vec::new(),
                    })
                    .collect()
            })
            .collect();

        let mut stack = vec![Frame::Enter(cfg.entry())];
        while let Some(frame) = stack.pop() {
            let node = match frame {
                Frame::Enter(node) => node,
                Frame::Exit(pushed) => {
                    for var in &pushed {
                        if let Some(versions) = self.stacks.get_mut(var) {
                            versions.pop();
                        }
                    }
                    continue;
                }
            };

            let mut pushed: Vec<String> = Vec::new();

            for phi in &mut phis[node.index()] {
                phi.version = self.mint(&phi.variable);
                pushed.push(phi.variable.clone());
            }

            for stmt in &mut renamed[node.index()] {
                stmt.uses = stmt
                    .stmt
                    .used_variables()
                    .into_iter()
                    .map(|var| self.current(var))
                    .collect();
                for var in stmt.stmt.defined_variables() {
                    let version = self.mint(var);
                    stmt.defs.push(SsaName::new(var, version));
                    pushed.push(var.to_string());
                }
            }

            for succ in cfg.successors(node) {
                for phi in &mut phis[succ.index()] {
                    let source = self.current(&phi.variable);
                    phi.sources.insert(node, source);
                }
            }

            stack.push(Frame::Exit(pushed));
            for &child in dominators.children(node).iter().rev() {
                stack.push(Frame::Enter(child));
            }
        }

        renamed
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::{BlockKind, CfgBuilder, SsaConfig, SsaConverter, SsaName},
        ast::{build::*, FuncDecl},
        utils::graph::NodeId,
    };

    fn convert_and_check(func: &FuncDecl, check: impl FnOnce(&crate::analysis::SsaCfg<'_, '_>)) {
        let cfg = CfgBuilder::new().build(func).unwrap();
        let ssa = SsaConverter::new(SsaConfig::default()).convert(&cfg).unwrap();
        check(&ssa);
    }

    fn block_of(ssa: &crate::analysis::SsaCfg<'_, '_>, kind: BlockKind) -> NodeId {
        ssa.cfg().blocks().find(|b| b.kind == kind).unwrap().id
    }

    #[test]
    fn test_straight_line_versions() {
        let f = func(
            "f",
            &["a"],
            vec![
                assign("x", ident("a")),
                assign("x", add(ident("x"), int(1))),
                ret(vec![ident("x")]),
            ],
        );
        convert_and_check(&f, |ssa| {
            let body = ssa.node(NodeId::new(2)).unwrap();
            let rendered: Vec<String> = body.stmts.iter().map(ToString::to_string).collect();
            assert_eq!(rendered, vec!["x_1 = a_0", "x_2 = x_1 + 1"]);
            assert_eq!(ssa.next_version("x"), 2);
            assert_eq!(ssa.next_version("a"), 0);
            assert_eq!(ssa.phi_count(), 0);
        });
    }

    #[test]
    fn test_if_else_phi() {
        let f = func(
            "f",
            &["x"],
            vec![
                if_else(
                    gt(ident("x"), int(0)),
                    vec![assign("y", int(1))],
                    vec![assign("y", int(2))],
                ),
                ret(vec![ident("y")]),
            ],
        );
        convert_and_check(&f, |ssa| {
            let merge = block_of(ssa, BlockKind::IfMerge);
            let then = block_of(ssa, BlockKind::IfThen);
            let els = block_of(ssa, BlockKind::IfElse);
            let phis = ssa.phis(merge);
            assert_eq!(phis.len(), 1);
            assert_eq!(phis[0].target(), SsaName::new("y", 3));
            assert_eq!(phis[0].source(then), Some(&SsaName::new("y", 1)));
            assert_eq!(phis[0].source(els), Some(&SsaName::new("y", 2)));

            let ret_block = block_of(ssa, BlockKind::Return);
            assert_eq!(ssa.node(ret_block).unwrap().stmts[0].to_string(), "return y_3");
        });
    }

    #[test]
    fn test_loop_header_phi() {
        let f = func(
            "f",
            &[],
            vec![
                assign("i", int(0)),
                while_loop(
                    lt(ident("i"), int(10)),
                    vec![assign("i", add(ident("i"), int(1)))],
                ),
            ],
        );
        convert_and_check(&f, |ssa| {
            let header = block_of(ssa, BlockKind::ForHeader);
            let body = block_of(ssa, BlockKind::ForBody);
            let phis = ssa.phis(header);
            assert_eq!(phis.len(), 1);
            assert_eq!(
                phis[0].to_string(),
                format!("i_2 = φ(i_1 from n2, i_3 from {body})")
            );
            assert_eq!(ssa.node(header).unwrap().stmts[0].to_string(), "i_2 < 10");
            assert_eq!(ssa.node(body).unwrap().stmts[0].to_string(), "i_3 = i_2 + 1");
        });
    }

    #[test]
    fn test_one_sided_definition_merges_incoming_value() {
        let f = func(
            "f",
            &["c", "v"],
            vec![if_stmt(ident("c"), vec![assign("v", int(1))]), ret(vec![ident("v")])],
        );
        convert_and_check(&f, |ssa| {
            let merge = block_of(ssa, BlockKind::IfMerge);
            let cond = block_of(ssa, BlockKind::IfCond);
            let phi = &ssa.phis(merge)[0];
            assert_eq!(phi.source(cond), Some(&SsaName::new("v", 0)));
            assert_eq!(phi.arity, 2);
        });
    }

    #[test]
    fn test_phis_are_ordered_by_variable() {
        let f = func(
            "f",
            &["c"],
            vec![if_else(
                ident("c"),
                vec![assign("b", int(1)), assign("a", int(1))],
                vec![assign("a", int(2)), assign("b", int(2))],
            )],
        );
        convert_and_check(&f, |ssa| {
            let merge = block_of(ssa, BlockKind::IfMerge);
            let vars: Vec<&str> = ssa.phis(merge).iter().map(|p| p.variable.as_str()).collect();
            assert_eq!(vars, vec!["a", "b"]);
        });
    }

    #[test]
    fn test_nested_loops_place_phis_at_both_headers() {
        let f = func(
            "f",
            &["n", "m"],
            vec![while_loop(
                lt(ident("i"), ident("n")),
                vec![
                    while_loop(
                        lt(ident("j"), ident("m")),
                        vec![assign("k", add(ident("i"), ident("j"))), inc("j")],
                    ),
                    inc("i"),
                ],
            )],
        );
        convert_and_check(&f, |ssa| {
            let headers: Vec<NodeId> = ssa
                .cfg()
                .blocks()
                .filter(|b| b.kind == BlockKind::ForHeader)
                .map(|b| b.id)
                .collect();
            let vars = |node: NodeId| -> Vec<String> {
                ssa.phis(node).iter().map(|p| p.variable.clone()).collect()
            };
            assert_eq!(vars(headers[0]), vec!["i", "j", "k"]);
            assert_eq!(vars(headers[1]), vec!["j", "k"]);
        });
    }

    #[test]
    fn test_unchecked_conversion_skips_verifier() {
        let f = func("f", &[], vec![assign("x", int(1))]);
        let cfg = CfgBuilder::new().build(&f).unwrap();
        let converter = SsaConverter::new(SsaConfig::unchecked());
        assert!(!converter.config().verify);
        let ssa = converter.convert(&cfg).unwrap();
        assert!(ssa.violations().is_empty());
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let f = func(
            "f",
            &["x"],
            vec![switch(
                Some(ident("x")),
                vec![
                    case_fallthrough(vec![int(1)], vec![assign("y", int(1))]),
                    case(vec![int(2)], vec![assign("y", int(2))]),
                    case(vec![int(3)], vec![assign("y", int(3))]),
                ],
            )],
        );
        let cfg = CfgBuilder::new().build(&f).unwrap();
        let converter = SsaConverter::default();
        let first = converter.convert(&cfg).unwrap();
        let second = converter.convert(&cfg).unwrap();
        assert_eq!(first.dominators(), second.dominators());
        assert_eq!(first.frontiers(), second.frontiers());
        assert_eq!(first.definitions(), second.definitions());
    }
}
