//! Control flow graph integration tests.
//!
//! These tests build CFGs through the public API and check their shape: block kinds,
//! edge kinds, back edges and loops, and the errors reported for malformed bodies.

use goscope::{
    analysis::{BlockKind, CfgBuilder, CfgEdgeKind, ControlFlowGraph},
    ast::{build::*, BinaryOp, FuncDecl},
    build_cfg,
    utils::graph::NodeId,
    Error, Result,
};

fn find(cfg: &ControlFlowGraph<'_>, kind: BlockKind) -> NodeId {
    cfg.blocks()
        .find(|block| block.kind == kind)
        .map(|block| block.id)
        .unwrap_or_else(|| panic!("no {kind} block in {}", cfg.name()))
}

fn find_all(cfg: &ControlFlowGraph<'_>, kind: BlockKind) -> Vec<NodeId> {
    cfg.blocks()
        .filter(|block| block.kind == kind)
        .map(|block| block.id)
        .collect()
}

fn succs(cfg: &ControlFlowGraph<'_>, node: NodeId) -> Vec<NodeId> {
    cfg.successors(node).collect()
}

/// `func f(x) { if x > 0 { y = 1 } else { y = 2 }; return y }`
fn single_if() -> FuncDecl {
    func(
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
    )
}

#[test]
fn test_empty_function() -> Result<()> {
    let f = func("f", &[], vec![]);
    let cfg = build_cfg(&f)?;

    assert_eq!(cfg.block_count(), 3);
    let labels: Vec<&str> = cfg.blocks().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["entry", "exit", "func_f_entry"]);
    assert!(!cfg.has_loops());
    assert_eq!(cfg.edge_count(), 2);

    Ok(())
}

#[test]
fn test_single_if_diamond() -> Result<()> {
    let f = single_if();
    let cfg = build_cfg(&f)?;

    let cond = find(&cfg, BlockKind::IfCond);
    let then = find(&cfg, BlockKind::IfThen);
    let els = find(&cfg, BlockKind::IfElse);
    let merge = find(&cfg, BlockKind::IfMerge);
    let ret = find(&cfg, BlockKind::Return);

    assert_eq!(succs(&cfg, cond), vec![then, els]);
    assert_eq!(succs(&cfg, then), vec![merge]);
    assert_eq!(succs(&cfg, els), vec![merge]);
    assert_eq!(succs(&cfg, merge), vec![ret]);
    assert_eq!(cfg.edge_kind(ret, cfg.exit()), Some(CfgEdgeKind::Return));

    let dominators = cfg.dominators();
    assert_eq!(dominators.immediate_dominator(merge), Some(cond));
    assert!(!dominators.dominates(then, merge));

    Ok(())
}

#[test]
fn test_simple_loop_has_back_edge() -> Result<()> {
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
    let cfg = build_cfg(&f)?;
    let header = find(&cfg, BlockKind::ForHeader);
    let body = find(&cfg, BlockKind::ForBody);

    assert_eq!(cfg.back_edges(), vec![(body, header)]);
    assert_eq!(cfg.edge_kind(body, header), Some(CfgEdgeKind::Back));

    let loops = cfg.loops();
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].header, header);
    assert!(loops[0].contains(body));
    assert!(!loops[0].contains(find(&cfg, BlockKind::ForExit)));

    Ok(())
}

#[test]
fn test_early_return() -> Result<()> {
    let f = func(
        "f",
        &["x"],
        vec![
            if_stmt(lt(ident("x"), int(0)), vec![ret(vec![neg(int(1))])]),
            ret(vec![ident("x")]),
        ],
    );
    let cfg = build_cfg(&f)?;
    let then = find(&cfg, BlockKind::IfThen);
    let returns = find_all(&cfg, BlockKind::Return);

    assert_eq!(returns.len(), 2);
    let early = succs(&cfg, then)[0];
    assert!(returns.contains(&early));

    let mut into_exit: Vec<NodeId> = cfg.predecessors(cfg.exit()).collect();
    into_exit.sort();
    assert_eq!(into_exit, returns);
    for block in returns {
        assert_eq!(succs(&cfg, block), vec![cfg.exit()]);
    }

    Ok(())
}

#[test]
fn test_nested_loops() -> Result<()> {
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
    let cfg = build_cfg(&f)?;
    let headers = find_all(&cfg, BlockKind::ForHeader);

    assert_eq!(cfg.back_edges().len(), 2);
    let loops = cfg.loops();
    assert_eq!(loops.len(), 2);

    let outer = loops.iter().find(|l| l.header == headers[0]).unwrap();
    let inner = loops.iter().find(|l| l.header == headers[1]).unwrap();
    assert!(outer.contains(inner.header));
    assert!(inner.depth > outer.depth);
    assert_eq!(cfg.innermost_loop(headers[1]).map(|l| l.header), Some(headers[1]));

    let stats = cfg.stats();
    assert_eq!(stats.loop_count, 2);
    assert_eq!(stats.node_count, cfg.block_count());

    Ok(())
}

#[test]
fn test_switch_fallthrough() -> Result<()> {
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
    let cfg = build_cfg(&f)?;
    let header = find(&cfg, BlockKind::SwitchHeader);
    let cases = find_all(&cfg, BlockKind::SwitchCase);
    let merge = find(&cfg, BlockKind::SwitchMerge);

    assert_eq!(cfg.edge_kind(cases[0], cases[1]), Some(CfgEdgeKind::Fallthrough));
    assert_eq!(cfg.edge_kind(cases[1], cases[2]), None);
    assert_eq!(cfg.edge_kind(cases[0], merge), None);
    assert_eq!(cfg.edge_kind(header, merge), Some(CfgEdgeKind::Default));
    assert_eq!(
        cfg.predecessors(merge).collect::<Vec<_>>(),
        vec![header, cases[1], cases[2]]
    );

    Ok(())
}

#[test]
fn test_range_with_labeled_continue() -> Result<()> {
    let f = func(
        "sum",
        &["rows"],
        vec![
            define("total", int(0)),
            labeled(
                "outer",
                range(
                    None,
                    Some("row"),
                    ident("rows"),
                    vec![range(
                        None,
                        Some("v"),
                        ident("row"),
                        vec![
                            if_stmt(lt(ident("v"), int(0)), vec![cont_label("outer")]),
                            compound("total", BinaryOp::Add, ident("v")),
                        ],
                    )],
                ),
            ),
            ret(vec![ident("total")]),
        ],
    );
    let cfg = build_cfg(&f)?;
    let headers = find_all(&cfg, BlockKind::RangeHeader);
    let then = find(&cfg, BlockKind::IfThen);

    assert_eq!(cfg.edge_kind(then, headers[0]), Some(CfgEdgeKind::Continue));
    assert_eq!(cfg.loops().len(), 2);

    Ok(())
}

#[test]
fn test_dead_code_never_survives() -> Result<()> {
    let f = func(
        "f",
        &[],
        vec![
            while_loop(boolean(true), vec![brk(), assign("dead", int(1))]),
            ret(vec![]),
        ],
    );
    let cfg = build_cfg(&f)?;

    assert!(find_all(&cfg, BlockKind::Unreachable).is_empty());
    let reachable: Vec<NodeId> = cfg.dfs().collect();
    for block in cfg.blocks() {
        assert!(reachable.contains(&block.id), "{} is unreachable", block.id);
    }

    Ok(())
}

#[test]
fn test_go_and_defer() -> Result<()> {
    let f = func(
        "f",
        &["ch"],
        vec![
            defer(call("close", vec![ident("ch")])),
            go(call("worker", vec![ident("ch")])),
            ret(vec![]),
        ],
    );
    let cfg = build_cfg(&f)?;
    let defer_block = find(&cfg, BlockKind::DeferCall);

    assert_eq!(cfg.deferred_calls(), &[defer_block]);
    assert_eq!(succs(&cfg, defer_block), vec![find(&cfg, BlockKind::AfterDefer)]);
    assert_eq!(find_all(&cfg, BlockKind::GoSpawn).len(), 1);

    Ok(())
}

#[test]
fn test_malformed_bodies() {
    let cases = vec![
        func("f", &[], vec![brk()]),
        func("f", &[], vec![cont()]),
        func("f", &[], vec![goto("missing")]),
        func(
            "f",
            &[],
            vec![labeled("a", empty()), labeled("a", empty())],
        ),
        func(
            "f",
            &["x"],
            vec![switch(
                Some(ident("x")),
                vec![case_fallthrough(vec![int(1)], vec![])],
            )],
        ),
    ];
    for f in &cases {
        assert!(
            matches!(build_cfg(f), Err(Error::InvalidAst { .. })),
            "{f:?} should be rejected"
        );
    }
}

#[test]
fn test_nesting_limit() {
    let mut body = vec![assign("x", int(1))];
    for _ in 0..20 {
        body = vec![if_stmt(ident("c"), body)];
    }
    let f = func("deep", &["c"], body);

    assert!(CfgBuilder::new().with_max_nesting_depth(20).build(&f).is_ok());
    assert!(matches!(
        CfgBuilder::new().with_max_nesting_depth(19).build(&f),
        Err(Error::InvalidAst { .. })
    ));
}

#[test]
fn test_long_else_if_chain_is_flat() -> Result<()> {
    // if x == 0 { y = 0 } else if x == 1 { y = 1 } ... else if x == 299 { y = 299 }
    let arms = 300;
    let mut chain = if_stmt(
        eq(ident("x"), int(arms - 1)),
        vec![assign("y", int(arms - 1))],
    );
    for i in (0..arms - 1).rev() {
        chain = if_else_if(eq(ident("x"), int(i)), vec![assign("y", int(i))], chain);
    }
    let f = func("dispatch", &["x"], vec![chain, ret(vec![ident("y")])]);

    let cfg = build_cfg(&f)?;
    let conds = find_all(&cfg, BlockKind::IfCond);
    let merges = find_all(&cfg, BlockKind::IfMerge);
    assert_eq!(conds.len(), 300);
    assert_eq!(merges.len(), 300);

    // Each else block leads straight into the condition of the next arm.
    for (els, next) in find_all(&cfg, BlockKind::IfElse).into_iter().zip(&conds[1..]) {
        assert_eq!(succs(&cfg, els), vec![*next]);
    }
    // The outermost merge joins the first then branch and the merge of the rest.
    let mut into_first: Vec<NodeId> = cfg.predecessors(merges[0]).collect();
    into_first.sort();
    assert_eq!(into_first, vec![find(&cfg, BlockKind::IfThen), merges[1]]);
    assert_eq!(succs(&cfg, merges[0]), vec![find(&cfg, BlockKind::Return)]);

    Ok(())
}

#[test]
fn test_goto_self_loop_keeps_unreachable_exit() -> Result<()> {
    // func spin() { L: goto L }
    let f = func("spin", &[], vec![labeled("L", goto("L"))]);
    let cfg = build_cfg(&f)?;
    let label = find(&cfg, BlockKind::Label);

    assert_eq!(cfg.block_count(), 4);
    assert_eq!(cfg.edge_kind(label, label), Some(CfgEdgeKind::Goto));

    // Exit is the one block allowed to lose its incoming paths.
    let exit = cfg.exit();
    assert!(cfg.block(exit).is_some());
    assert!(cfg.predecessors(exit).next().is_none());
    let reachable: Vec<NodeId> = cfg.dfs().collect();
    assert!(!reachable.contains(&exit));
    for block in cfg.blocks().filter(|block| block.id != exit) {
        assert!(reachable.contains(&block.id), "{} is unreachable", block.id);
    }

    Ok(())
}

#[test]
fn test_dot_marks_back_edges() -> Result<()> {
    let f = func("f", &[], vec![while_loop(ident("c"), vec![inc("i")])]);
    let cfg = build_cfg(&f)?;
    let dot = cfg.to_dot(Some("loop"));

    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("back"));
    assert!(dot.contains("for_header"));
    assert!(dot.contains("fillcolor=lightpink"));
    assert!(dot.contains("fillcolor=lavender"));

    Ok(())
}
