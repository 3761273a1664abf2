use cellflow::{
    build_cfg, build_dfg, owner_of, parse_cells, AccessMode, DfgEdge, EdgeKind, GraphError, RefId,
    StatementKind, StatementTree, StmtId,
};

fn find_ref(
    tree: &StatementTree,
    scope: u32,
    name: &str,
    mode: AccessMode,
    line: u32,
) -> RefId {
    (0..tree.reference_count() as RefId)
        .find(|&r| {
            let reference = tree.reference(r);
            reference.scope == scope
                && reference.name == name
                && reference.mode == mode
                && reference.line == line
        })
        .unwrap_or_else(|| panic!("no {mode:?} of `{name}` at {scope}:{line}"))
}

fn nodes_of(tree: &StatementTree, nodes: &[StmtId], kind: StatementKind) -> Vec<StmtId> {
    nodes
        .iter()
        .copied()
        .filter(|&id| tree.statement(id).kind == kind)
        .collect()
}

#[test]
fn straight_line_cell_chains_sequentially() {
    let notebook = parse_cells(&["x = 1\ny = 2\nz = x + y"]).unwrap();
    let cfg = build_cfg(&notebook.tree, &notebook.scopes[0]).unwrap();

    assert_eq!(cfg.nodes.len(), 3);
    assert_eq!(cfg.edges.len(), 2);
    let [s1, s2, s3] = cfg.nodes[..] else {
        panic!("expected three nodes")
    };
    assert!(cfg.contains_edge(s1, s2, EdgeKind::Sequential));
    assert!(cfg.contains_edge(s2, s3, EdgeKind::Sequential));
    assert_eq!(cfg.exits, vec![s3]);
}

#[test]
fn conditional_without_else_falls_through_both_ways() {
    let source = "if flag:\n    a = 1\nb = 2";
    let notebook = parse_cells(&[source]).unwrap();
    let cfg = build_cfg(&notebook.tree, &notebook.scopes[0]).unwrap();

    let [cond, a, b] = cfg.nodes[..] else {
        panic!("expected three nodes")
    };
    assert_eq!(notebook.tree.statement(cond).kind, StatementKind::Conditional);
    assert!(cfg.contains_edge(cond, a, EdgeKind::TrueBranch));
    assert!(cfg.contains_edge(a, b, EdgeKind::Sequential));
    assert!(cfg.contains_edge(cond, b, EdgeKind::Sequential));
    assert_eq!(cfg.exits, vec![b]);
}

#[test]
fn break_terminates_the_body_and_skips_unreachable_statements() {
    let source = "while x > 0:\n    y = 1\n    break\n    z = 2";
    let notebook = parse_cells(&[source]).unwrap();
    let cfg = build_cfg(&notebook.tree, &notebook.scopes[0]).unwrap();

    let loops = nodes_of(&notebook.tree, &cfg.nodes, StatementKind::Loop);
    let breaks = nodes_of(&notebook.tree, &cfg.nodes, StatementKind::Break);
    let assignments = nodes_of(&notebook.tree, &cfg.nodes, StatementKind::Assignment);
    assert_eq!(loops.len(), 1);
    assert_eq!(breaks.len(), 1);
    // z = 2 after the break is unreachable and never visited.
    assert_eq!(assignments.len(), 1);
    assert!(!cfg.edges.iter().any(|e| e.kind == EdgeKind::LoopBack));
    assert_eq!(cfg.exits, vec![loops[0], breaks[0]]);
}

#[test]
fn loop_body_loops_back_and_header_skips_ahead() {
    let source = "for i in items:\n    total = total + i\nprint(total)";
    let notebook = parse_cells(&[source]).unwrap();
    let cfg = build_cfg(&notebook.tree, &notebook.scopes[0]).unwrap();

    let [lp, body, tail] = cfg.nodes[..] else {
        panic!("expected three nodes")
    };
    assert!(cfg.contains_edge(lp, body, EdgeKind::LoopBody));
    assert!(cfg.contains_edge(body, lp, EdgeKind::LoopBack));
    assert!(cfg.contains_edge(lp, tail, EdgeKind::LoopSkip));
    assert_eq!(cfg.exits, vec![tail]);
}

#[test]
fn elif_chains_lower_to_nested_conditionals() {
    let source = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3";
    let notebook = parse_cells(&[source]).unwrap();
    let cfg = build_cfg(&notebook.tree, &notebook.scopes[0]).unwrap();

    let conditionals = nodes_of(&notebook.tree, &cfg.nodes, StatementKind::Conditional);
    assert_eq!(conditionals.len(), 2);
    let [outer, inner] = conditionals[..] else {
        unreachable!()
    };
    assert!(cfg.contains_edge(outer, inner, EdgeKind::FalseBranch));

    // Every arm assigns, and all three arms can end the cell.
    let exits_are_assignments = cfg
        .exits
        .iter()
        .all(|&id| notebook.tree.statement(id).kind == StatementKind::Assignment);
    assert!(exits_are_assignments);
    assert_eq!(cfg.exits.len(), 3);
}

#[test]
fn writes_chain_to_reads_in_later_cells() {
    let notebook = parse_cells(&["import math\nx = 1", "y = x + 2", "print(y)"]).unwrap();
    let dfg = build_dfg(&notebook.tree, &notebook.scopes);

    let w_x = find_ref(&notebook.tree, 0, "x", AccessMode::Write, 2);
    let r_x = find_ref(&notebook.tree, 1, "x", AccessMode::Read, 1);
    let w_y = find_ref(&notebook.tree, 1, "y", AccessMode::Write, 1);
    let r_y = find_ref(&notebook.tree, 2, "y", AccessMode::Read, 1);

    assert!(dfg.edges.contains(&DfgEdge { from: w_x, to: r_x }));
    assert!(dfg.edges.contains(&DfgEdge { from: w_y, to: r_y }));
    // `print` is read but never written, so it starts no chain.
    assert_eq!(dfg.edges.len(), 2);
}

#[test]
fn delete_breaks_the_chain_for_later_reads() {
    let notebook = parse_cells(&["x = 1\ndel x\nprint(x)"]).unwrap();
    let dfg = build_dfg(&notebook.tree, &notebook.scopes);
    assert!(dfg.is_empty());
}

#[test]
fn owners_anchor_dataflow_endpoints_onto_cfg_nodes() {
    let source = "x = 1\nwhile x > 0:\n    x = x - 1\nprint(x)";
    let notebook = parse_cells(&[source]).unwrap();
    let tree = &notebook.tree;
    let cfg = build_cfg(tree, &notebook.scopes[0]).unwrap();
    let dfg = build_dfg(tree, &notebook.scopes);

    let [first, lp, body, tail] = cfg.nodes[..] else {
        panic!("expected four nodes")
    };
    let w1 = find_ref(tree, 0, "x", AccessMode::Write, 1);
    let guard = find_ref(tree, 0, "x", AccessMode::Read, 2);
    let body_read = find_ref(tree, 0, "x", AccessMode::Read, 3);
    let body_write = find_ref(tree, 0, "x", AccessMode::Write, 3);
    let last_read = find_ref(tree, 0, "x", AccessMode::Read, 4);

    // The chain runs initial write, guard read, body read; the body write
    // starts a fresh chain to the final read.
    let chain: Vec<DfgEdge> = dfg.edges_for(tree, "x").collect();
    assert_eq!(
        chain,
        vec![
            DfgEdge { from: w1, to: guard },
            DfgEdge { from: guard, to: body_read },
            DfgEdge { from: body_write, to: last_read },
        ]
    );

    // Every endpoint lands on a CFG node, with loop-header reads attributed
    // to the loop and body reads to the body statement.
    assert_eq!(owner_of(tree, w1, &cfg.nodes), Some(first));
    assert_eq!(owner_of(tree, guard, &cfg.nodes), Some(lp));
    assert_eq!(owner_of(tree, body_read, &cfg.nodes), Some(body));
    assert_eq!(owner_of(tree, body_write, &cfg.nodes), Some(body));
    assert_eq!(owner_of(tree, last_read, &cfg.nodes), Some(tail));
}

#[test]
fn function_bodies_stay_opaque_end_to_end() {
    let source = "def f(n):\n    return n + 1\ny = f(2)";
    let notebook = parse_cells(&[source]).unwrap();
    let tree = &notebook.tree;
    let cfg = build_cfg(tree, &notebook.scopes[0]).unwrap();

    let [func, ret, assign] = cfg.nodes[..] else {
        panic!("expected three nodes")
    };
    assert_eq!(tree.statement(func).kind, StatementKind::FunctionDef);
    assert!(cfg.contains_edge(func, ret, EdgeKind::Sequential));
    assert!(cfg.contains_edge(func, assign, EdgeKind::Sequential));
    assert!(cfg.successors(ret).is_empty());
    assert_eq!(cfg.exits, vec![assign]);

    // The parameter read inside the return resolves against no top-level
    // candidate: FunctionDef and Return are opaque boundaries.
    let n = find_ref(tree, 0, "n", AccessMode::Read, 2);
    assert_eq!(owner_of(tree, n, &cfg.nodes), None);
}

#[test]
fn unparsable_cells_are_skipped_but_keep_scope_positions() {
    let notebook = parse_cells(&["x = (", "y = 1"]).unwrap();
    assert_eq!(notebook.scopes.len(), 1);
    assert_eq!(notebook.scopes[0].id, 1);

    let cfg = build_cfg(&notebook.tree, &notebook.scopes[0]).unwrap();
    assert_eq!(cfg.scope, 1);
    assert_eq!(cfg.nodes.len(), 1);
}

#[test]
fn unrecognized_statements_are_dropped_without_failing_the_cell() {
    let notebook = parse_cells(&["pass\nx = 1"]).unwrap();
    let cfg = build_cfg(&notebook.tree, &notebook.scopes[0]).unwrap();
    assert_eq!(cfg.nodes.len(), 1);
    assert!(cfg.edges.is_empty());
    assert_eq!(cfg.exits, cfg.nodes);
}

#[test]
fn comment_only_cells_surface_as_empty_scopes() {
    let notebook = parse_cells(&["# notes to self"]).unwrap();
    assert_eq!(notebook.scopes.len(), 1);
    assert_eq!(
        build_cfg(&notebook.tree, &notebook.scopes[0]),
        Err(GraphError::EmptyScope { scope: 0 })
    );
}
