//! Property-based tests over generated function bodies.
//!
//! Every generated body is well formed, so the CFG builder must accept it; the
//! properties then check the graph, the dominator tree, the SSA form and the data flow
//! fixed points derived from it.

use std::collections::BTreeSet;

use goscope::{
    analysis::{
        dataflow::{
            AvailableExpressions, DataFlowAnalysis, DataFlowProblem, DataFlowSolver, Direction,
            Liveness, Meet, ReachingDefinitions,
        },
        ControlFlowGraph, SsaConverter,
    },
    ast::{build::*, Expr, FuncDecl, Stmt},
    build_cfg, to_ssa,
    utils::graph::NodeId,
};
use proptest::prelude::*;

const VARS: &[&str] = &["a", "b", "c", "x"];

fn var() -> impl Strategy<Value = &'static str> {
    prop::sample::select(VARS)
}

fn expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![var().prop_map(ident), (0i64..10).prop_map(int)];
    leaf.prop_recursive(2, 8, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| add(l, r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| mul(l, r)),
            (inner.clone(), inner).prop_map(|(l, r)| lt(l, r)),
        ]
    })
}

/// Label every generated body ends with; `goto` only jumps forward to it.
const DONE: &str = "done";

/// How a generated loop body ends.
#[derive(Debug, Clone, Copy)]
enum LoopExit {
    FallThrough,
    Break,
    Continue,
    Return,
}

fn loop_exit() -> impl Strategy<Value = LoopExit> {
    prop_oneof![
        Just(LoopExit::FallThrough),
        Just(LoopExit::Break),
        Just(LoopExit::Continue),
        Just(LoopExit::Return),
    ]
}

fn close_loop(mut body: Vec<Stmt>, exit: LoopExit, guard: Expr) -> Vec<Stmt> {
    match exit {
        LoopExit::FallThrough => {}
        LoopExit::Break => body.push(brk()),
        LoopExit::Continue => body.insert(0, if_stmt(guard, vec![cont()])),
        LoopExit::Return => body.push(if_stmt(guard, vec![ret(vec![ident("x")])])),
    }
    body
}

fn stmt() -> impl Strategy<Value = Stmt> {
    let simple = prop_oneof![
        6 => (var(), expr()).prop_map(|(v, e)| assign(v, e)),
        3 => var().prop_map(inc),
        1 => var().prop_map(|v| ret(vec![ident(v)])),
        1 => var().prop_map(|v| go(call("worker", vec![ident(v)]))),
        1 => var().prop_map(|v| defer(call("release", vec![ident(v)]))),
        1 => Just(goto(DONE)),
    ];
    simple.prop_recursive(3, 24, 4, |inner| {
        let body = prop::collection::vec(inner, 0..4);
        let clause = prop_oneof![
            (expr(), body.clone()).prop_map(|(e, b)| comm(send(ident("ch"), e), b)),
            body.clone().prop_map(|b| comm(expr_stmt(recv(ident("ch"))), b)),
            body.clone().prop_map(default_comm),
        ];
        prop_oneof![
            (expr(), body.clone()).prop_map(|(c, then)| if_stmt(c, then)),
            (expr(), body.clone(), body.clone()).prop_map(|(c, then, els)| if_else(c, then, els)),
            (expr(), body.clone(), loop_exit(), expr()).prop_map(|(c, b, exit, guard)| {
                while_loop(c, close_loop(b, exit, guard))
            }),
            (var(), body.clone(), loop_exit(), expr()).prop_map(|(v, b, exit, guard)| {
                range(None, Some(v), ident("xs"), close_loop(b, exit, guard))
            }),
            (expr(), body.clone(), body, any::<bool>()).prop_map(|(tag, first, rest, fall)| {
                let first = if fall && !first.is_empty() {
                    case_fallthrough(vec![int(1)], first)
                } else {
                    case(vec![int(1)], first)
                };
                switch(Some(tag), vec![first, default_case(rest)])
            }),
            prop::collection::vec(clause, 0..3).prop_map(select),
        ]
    })
}

/// An outer loop labelled `outer` whose body leaves it through a labelled jump.
fn labeled_loop() -> impl Strategy<Value = Stmt> {
    (expr(), prop::collection::vec(stmt(), 0..3), expr(), any::<bool>()).prop_map(
        |(cond, mut body, guard, is_break)| {
            let jump = if is_break {
                brk_label("outer")
            } else {
                cont_label("outer")
            };
            body.push(while_loop(guard, vec![if_stmt(ident("c"), vec![jump])]));
            labeled("outer", while_loop(cond, body))
        },
    )
}

fn function() -> impl Strategy<Value = FuncDecl> {
    (
        prop::collection::vec(stmt(), 0..6),
        prop::option::of(labeled_loop()),
        prop::option::of(var()),
    )
        .prop_map(|(mut body, outer, tail)| {
            body.extend(outer);
            body.push(labeled(DONE, empty()));
            if let Some(v) = tail {
                body.push(ret(vec![ident(v)]));
            }
            func("generated", &["a", "b"], body)
        })
}

fn reachable(cfg: &ControlFlowGraph<'_>) -> BTreeSet<NodeId> {
    cfg.dfs().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn cfg_is_sound(f in function()) {
        let cfg = build_cfg(&f).unwrap();
        let reached = reachable(&cfg);

        for block in cfg.blocks() {
            prop_assert!(reached.contains(&block.id), "{} unreachable", block.id);
            for succ in cfg.successors(block.id) {
                prop_assert!(cfg.predecessors(succ).any(|p| p == block.id));
            }
            for pred in cfg.predecessors(block.id) {
                prop_assert!(cfg.successors(pred).any(|s| s == block.id));
            }
        }
        prop_assert!(cfg.predecessors(cfg.entry()).next().is_none());
        prop_assert!(cfg.successors(cfg.exit()).next().is_none());
    }

    #[test]
    fn immediate_dominator_is_closest(f in function()) {
        let cfg = build_cfg(&f).unwrap();
        let tree = cfg.dominators();

        for block in cfg.blocks() {
            let n = block.id;
            let Some(idom) = tree.immediate_dominator(n) else {
                prop_assert_eq!(n, cfg.entry());
                continue;
            };
            prop_assert!(tree.strictly_dominates(idom, n));
            for other in tree.dominance_set(n).iter().map(NodeId::new) {
                if other != n && other != idom {
                    prop_assert!(!tree.dominates(idom, other));
                }
            }
        }
    }

    #[test]
    fn dominators_agree_with_data_flow(f in function()) {
        let cfg = build_cfg(&f).unwrap();
        let problem = DataFlowProblem::with_closure(
            "dominators",
            Direction::Forward,
            Meet::Intersection,
            cfg.block_count(),
            |node, input| {
                let mut out = input.clone();
                out.insert(node.index());
                out
            },
        );
        let results = DataFlowSolver::new().solve(&problem, &cfg).unwrap();
        let tree = cfg.dominators();

        for block in cfg.blocks() {
            prop_assert_eq!(results.out_set(block.id), Some(tree.dominance_set(block.id)));
        }
    }

    #[test]
    fn ssa_defines_each_name_once(f in function()) {
        let cfg = build_cfg(&f).unwrap();
        let ssa = SsaConverter::default().convert(&cfg).unwrap();
        let definitions = ssa.definitions();
        let names: BTreeSet<_> = definitions.iter().map(|(name, _)| name.clone()).collect();

        prop_assert_eq!(names.len(), definitions.len());
        prop_assert!(definitions.iter().all(|(name, _)| !name.is_incoming()));
        prop_assert!(ssa.violations().is_empty());
    }

    #[test]
    fn ssa_uses_are_dominated(f in function()) {
        let cfg = build_cfg(&f).unwrap();
        let ssa = to_ssa(&cfg).unwrap();
        let tree = ssa.dominators();

        for node in ssa.nodes() {
            for stmt in &node.stmts {
                for name in stmt.uses.iter().filter(|name| !name.is_incoming()) {
                    let site = ssa.definition_of(name);
                    prop_assert!(site.is_some(), "{} has no definition", name);
                    prop_assert!(tree.dominates(site.unwrap().node(), node.id));
                }
            }
            for phi in &node.phis {
                prop_assert_eq!(phi.sources.len(), phi.arity);
                for (&pred, name) in phi.sources.iter().filter(|(_, name)| !name.is_incoming()) {
                    let site = ssa.definition_of(name);
                    prop_assert!(site.is_some(), "{} has no definition", name);
                    prop_assert!(tree.dominates(site.unwrap().node(), pred));
                }
            }
        }
    }

    #[test]
    fn analyses_reach_fixed_points_within_bound(f in function()) {
        let cfg = build_cfg(&f).unwrap();
        let solver = DataFlowSolver::new();
        let nodes = cfg.block_count();

        let liveness = Liveness::new(&cfg);
        let results = solver.solve(&liveness, &cfg).unwrap();
        prop_assert!(results.is_fixed_point(&liveness, &cfg));
        prop_assert!(results.iterations <= DataFlowSolver::default_bound(nodes, liveness.domain_size()));

        let reaching = ReachingDefinitions::new(&cfg);
        let results = solver.solve(&reaching, &cfg).unwrap();
        prop_assert!(results.is_fixed_point(&reaching, &cfg));
        prop_assert!(results.iterations <= DataFlowSolver::default_bound(nodes, reaching.domain_size()));

        let available = AvailableExpressions::new(&cfg);
        let results = solver.solve(&available, &cfg).unwrap();
        prop_assert!(results.is_fixed_point(&available, &cfg));
        prop_assert!(results.iterations <= DataFlowSolver::default_bound(nodes, available.domain_size()));
    }

    #[test]
    fn ssa_conversion_is_repeatable(f in function()) {
        let cfg = build_cfg(&f).unwrap();
        let first = to_ssa(&cfg).unwrap();
        let second = to_ssa(&cfg).unwrap();

        prop_assert_eq!(first.dominators(), second.dominators());
        prop_assert_eq!(first.frontiers(), second.frontiers());
        prop_assert_eq!(first.definitions(), second.definitions());
        prop_assert_eq!(first.versions(), second.versions());
    }
}
