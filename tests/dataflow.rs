//! Data flow integration tests.
//!
//! These tests run the built-in analyses and hand-written problems through the public
//! solver and check the fixed points they reach.

use std::sync::{atomic::AtomicBool, Arc};

use goscope::{
    analysis::{
        dataflow::{
            AvailableExpressions, DataFlowAnalysis, DataFlowProblem, DataFlowSolver, DefinitionSite,
            Direction, Liveness, Meet, ReachingDefinitions,
        },
        BlockKind, ControlFlowGraph,
    },
    ast::{build::*, FuncDecl},
    build_cfg, solve, to_ssa,
    utils::{graph::NodeId, BitSet},
    Error, Result,
};

fn find(cfg: &ControlFlowGraph<'_>, kind: BlockKind) -> NodeId {
    cfg.blocks()
        .find(|block| block.kind == kind)
        .map(|block| block.id)
        .unwrap_or_else(|| panic!("no {kind} block"))
}

fn find_all(cfg: &ControlFlowGraph<'_>, kind: BlockKind) -> Vec<NodeId> {
    cfg.blocks()
        .filter(|block| block.kind == kind)
        .map(|block| block.id)
        .collect()
}

/// `func f() { i = 0; for i < 10 { i = i + 1 } }`
fn counting_loop() -> FuncDecl {
    func(
        "f",
        &[],
        vec![
            assign("i", int(0)),
            while_loop(
                lt(ident("i"), int(10)),
                vec![assign("i", add(ident("i"), int(1)))],
            ),
        ],
    )
}

#[test]
fn test_empty_function_liveness() -> Result<()> {
    let f = func("f", &[], vec![]);
    let cfg = build_cfg(&f)?;
    let live = Liveness::new(&cfg).compute(&cfg)?;

    assert!(live.live_in(cfg.entry()).is_empty());
    assert!(live.live_out(cfg.exit()).is_empty());
    assert!(live.variables().is_empty());

    Ok(())
}

#[test]
fn test_single_if_reaching_definitions() -> Result<()> {
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
    let cfg = build_cfg(&f)?;
    let reaching = ReachingDefinitions::new(&cfg).compute(&cfg)?;

    let then = find(&cfg, BlockKind::IfThen);
    let els = find(&cfg, BlockKind::IfElse);
    let ret = find(&cfg, BlockKind::Return);

    let sites: Vec<DefinitionSite> = reaching.reaching_in(ret).into_iter().cloned().collect();
    assert_eq!(
        sites,
        vec![DefinitionSite::new("y", then, 0), DefinitionSite::new("y", els, 0)]
    );
    assert_eq!(sites[0].to_string(), format!("(y, {then}, 0)"));

    Ok(())
}

#[test]
fn test_simple_loop_liveness() -> Result<()> {
    let f = counting_loop();
    let cfg = build_cfg(&f)?;
    let live = Liveness::new(&cfg).compute(&cfg)?;
    let header = find(&cfg, BlockKind::ForHeader);
    let body = find(&cfg, BlockKind::ForBody);

    assert!(live.is_live_in(header, "i"));
    assert!(live.is_live_in(body, "i"));
    assert!(live.is_live_out(body, "i"));
    assert!(!live.is_live_in(find(&cfg, BlockKind::ForExit), "i"));
    // Defined before any read, so nothing flows into the function.
    assert!(!live.is_live_in(cfg.entry(), "i"));

    Ok(())
}

#[test]
fn test_nested_loop_available_expressions() -> Result<()> {
    let f = func(
        "f",
        &["n", "m"],
        vec![for_loop(
            Some(define("i", int(0))),
            Some(lt(ident("i"), ident("n"))),
            Some(inc("i")),
            vec![for_loop(
                Some(define("j", int(0))),
                Some(lt(ident("j"), ident("m"))),
                Some(inc("j")),
                vec![assign("k", add(ident("i"), ident("j")))],
            )],
        )],
    );
    let cfg = build_cfg(&f)?;
    let available = AvailableExpressions::new(&cfg).compute(&cfg)?;

    let bodies = find_all(&cfg, BlockKind::ForBody);
    let posts = find_all(&cfg, BlockKind::ForPost);
    let headers = find_all(&cfg, BlockKind::ForHeader);
    let inner_body = bodies[1];
    let inner_post = posts[1];

    assert!(available.is_available_out(inner_body, "i + j"));
    assert!(available.is_available_in(inner_post, "i + j"));
    assert!(!available.is_available_out(inner_post, "i + j"));
    assert!(!available.is_available_in(headers[1], "i + j"));
    assert!(!available.is_available_in(headers[0], "i < n"));

    Ok(())
}

#[test]
fn test_switch_fallthrough_reaching() -> Result<()> {
    let f = func(
        "f",
        &["x"],
        vec![
            switch(
                Some(ident("x")),
                vec![
                    case_fallthrough(vec![int(1)], vec![assign("y", int(1))]),
                    case(vec![int(2)], vec![assign("y", int(2))]),
                    case(vec![int(3)], vec![assign("y", int(3))]),
                ],
            ),
            ret(vec![ident("y")]),
        ],
    );
    let cfg = build_cfg(&f)?;
    let reaching = ReachingDefinitions::new(&cfg).compute(&cfg)?;
    let cases = find_all(&cfg, BlockKind::SwitchCase);
    let merge = find(&cfg, BlockKind::SwitchMerge);

    // Case 1 is overwritten by case 2 on the fall-through path.
    let nodes: Vec<NodeId> = reaching
        .definitions_of(merge, "y")
        .iter()
        .map(|site| site.node)
        .collect();
    assert_eq!(nodes, vec![cases[1], cases[2]]);

    Ok(())
}

#[test]
fn test_dominators_as_data_flow() -> Result<()> {
    let f = func(
        "f",
        &["c", "n"],
        vec![
            while_loop(
                lt(ident("i"), ident("n")),
                vec![
                    if_else(ident("c"), vec![inc("i")], vec![assign("i", int(0)), brk()]),
                ],
            ),
            ret(vec![ident("i")]),
        ],
    );
    let cfg = build_cfg(&f)?;
    let node_count = cfg.block_count();

    // OUT[n] = IN[n] ∪ {n} with intersection over predecessors computes Dom(n).
    let problem = DataFlowProblem::with_closure(
        "dominators",
        Direction::Forward,
        Meet::Intersection,
        node_count,
        |node, input| {
            let mut out = input.clone();
            out.insert(node.index());
            out
        },
    );
    let results = solve(&problem, &cfg)?;
    assert!(results.is_fixed_point(&problem, &cfg));

    let tree = cfg.dominators();
    for block in cfg.blocks() {
        let expected: Vec<usize> = tree.dominance_set(block.id).iter().collect();
        let computed: Vec<usize> = results.out_set(block.id).unwrap().iter().collect();
        assert_eq!(computed, expected, "Dom({})", block.id);
    }

    Ok(())
}

#[test]
fn test_gen_kill_problem_matches_builtin() -> Result<()> {
    let f = counting_loop();
    let cfg = build_cfg(&f)?;
    let builtin = ReachingDefinitions::new(&cfg);

    let gen: Vec<BitSet> = cfg
        .blocks()
        .map(|b| builtin.gen_set(b.id).cloned().unwrap_or_default())
        .collect();
    let kill: Vec<BitSet> = cfg
        .blocks()
        .map(|b| builtin.kill_set(b.id).cloned().unwrap_or_default())
        .collect();
    let problem = DataFlowProblem::gen_kill(
        "reaching_by_hand",
        Direction::Forward,
        Meet::Union,
        builtin.domain_size(),
        gen,
        kill,
    );

    let by_hand = solve(&problem, &cfg)?;
    let solved = builtin.compute(&cfg)?;
    assert_eq!(&by_hand, solved.results());

    Ok(())
}

#[test]
fn test_ssa_graph_gives_same_answers() -> Result<()> {
    let f = counting_loop();
    let cfg = build_cfg(&f)?;
    let ssa = to_ssa(&cfg)?;

    let on_cfg = AvailableExpressions::new(&cfg).compute(&cfg)?;
    let on_ssa = AvailableExpressions::new(&cfg).compute(&ssa)?;
    assert_eq!(on_cfg.results(), on_ssa.results());

    Ok(())
}

#[test]
fn test_iteration_bound() -> Result<()> {
    let f = counting_loop();
    let cfg = build_cfg(&f)?;
    let analysis = Liveness::new(&cfg);
    let bound = DataFlowSolver::default_bound(cfg.block_count(), analysis.domain_size());

    let results = solve(&analysis, &cfg)?;
    assert!(results.iterations <= bound);

    let limited = DataFlowSolver::new().with_iteration_limit(1).solve(&analysis, &cfg);
    assert!(matches!(
        limited,
        Err(Error::DataFlowDiverged { iterations: 1, .. })
    ));

    Ok(())
}

#[test]
fn test_cancelled_solve() -> Result<()> {
    let f = counting_loop();
    let cfg = build_cfg(&f)?;
    let token = Arc::new(AtomicBool::new(true));
    let solver = DataFlowSolver::new().with_cancellation(token);

    assert!(matches!(
        Liveness::new(&cfg).compute_with(&solver, &cfg),
        Err(Error::Cancelled)
    ));

    Ok(())
}
