//! Control-flow graph construction.
//!
//! Walks one scope's statement tree and produces a directed edge set over
//! statement nodes representing possible execution order. The walk is a
//! recursion over statement lists; each list yields its exit-node set — the
//! statements after which control legitimately falls through to whatever
//! follows the list in its enclosing context. Break, Continue and Return are
//! always exit nodes and are never linked forward to a lexical successor;
//! they bubble upward until a loop (Break/Continue) or the function/scope
//! boundary (Return) interprets them.

use serde::{Deserialize, Serialize};

use crate::tree::{Scope, ScopeId, StatementKind, StatementTree, StmtId};
use crate::GraphError;

/// Kind of control-flow edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// Lexical fallthrough to the next statement
    Sequential,
    /// Conditional to the first statement of its true branch
    TrueBranch,
    /// Conditional to the first statement of its false branch
    FalseBranch,
    /// Loop header to the first statement of its body
    LoopBody,
    /// Body exit back to the loop header
    LoopBack,
    /// Loop header past the body (zero-iteration path)
    LoopSkip,
}

/// An edge in the control-flow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CfgEdge {
    pub from: StmtId,
    pub to: StmtId,
    pub kind: EdgeKind,
}

/// Control-flow graph of a single scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    /// Scope the graph was built from
    pub scope: ScopeId,
    /// Every statement visited, in document order; the candidate universe for
    /// [`crate::owner::owner_of`]
    pub nodes: Vec<StmtId>,
    pub edges: Vec<CfgEdge>,
    /// Exit-node set of the scope's top-level statement list
    pub exits: Vec<StmtId>,
}

impl ControlFlowGraph {
    pub fn successors(&self, id: StmtId) -> Vec<StmtId> {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to)
            .collect()
    }

    pub fn predecessors(&self, id: StmtId) -> Vec<StmtId> {
        self.edges
            .iter()
            .filter(|e| e.to == id)
            .map(|e| e.from)
            .collect()
    }

    pub fn contains_edge(&self, from: StmtId, to: StmtId, kind: EdgeKind) -> bool {
        self.edges
            .iter()
            .any(|e| e.from == from && e.to == to && e.kind == kind)
    }
}

/// Build the control-flow graph of one scope.
///
/// Fails with [`GraphError::MalformedTree`] when the entry node is not a
/// scope root or a branch/loop node lacks a required body, and with
/// [`GraphError::EmptyScope`] when the scope has no statements; callers
/// iterating cells report either and continue with the remaining scopes.
pub fn build_cfg(tree: &StatementTree, scope: &Scope) -> Result<ControlFlowGraph, GraphError> {
    let root = tree.statement(scope.root);
    if root.kind != StatementKind::Scope {
        return Err(GraphError::MalformedTree {
            reason: format!(
                "entry node of scope {} is {:?}, expected a scope root",
                scope.id, root.kind
            ),
        });
    }
    if root.body.is_empty() {
        return Err(GraphError::EmptyScope { scope: scope.id });
    }

    let mut builder = CfgBuilder {
        tree,
        nodes: Vec::new(),
        edges: Vec::new(),
    };
    let exits = builder.walk_list(&root.body)?;
    Ok(ControlFlowGraph {
        scope: scope.id,
        nodes: builder.nodes,
        edges: builder.edges,
        exits,
    })
}

struct CfgBuilder<'a> {
    tree: &'a StatementTree,
    nodes: Vec<StmtId>,
    edges: Vec<CfgEdge>,
}

impl CfgBuilder<'_> {
    fn edge(&mut self, from: StmtId, to: StmtId, kind: EdgeKind) {
        self.edges.push(CfgEdge { from, to, kind });
    }

    fn kind(&self, id: StmtId) -> StatementKind {
        self.tree.statement(id).kind
    }

    /// Walk one statement list, emitting edges and returning its exit-node set.
    fn walk_list(&mut self, stmts: &[StmtId]) -> Result<Vec<StmtId>, GraphError> {
        // Break/Continue/Return exits surfacing from conditionals mid-list;
        // never forward-linked here, handed upward with the final exit set.
        let mut bubbled: Vec<StmtId> = Vec::new();

        for (i, &id) in stmts.iter().enumerate() {
            self.nodes.push(id);
            let next = stmts.get(i + 1).copied();

            match self.kind(id) {
                StatementKind::Assignment | StatementKind::Import | StatementKind::Expression => {
                    match next {
                        Some(next) => self.edge(id, next, EdgeKind::Sequential),
                        None => return Ok(join(vec![id], bubbled)),
                    }
                }
                StatementKind::FunctionDef => {
                    // Internal CFG is built in isolation; the body's exits stay
                    // inside the function and the enclosing chain continues
                    // from the definition itself.
                    let stmt = self.tree.statement(id);
                    if stmt.body.is_empty() {
                        return Err(GraphError::MalformedTree {
                            reason: format!(
                                "function definition at line {} has an empty body",
                                stmt.span.0
                            ),
                        });
                    }
                    self.edge(id, stmt.body[0], EdgeKind::Sequential);
                    let _ = self.walk_list(&stmt.body)?;
                    match next {
                        Some(next) => self.edge(id, next, EdgeKind::Sequential),
                        None => return Ok(join(vec![id], bubbled)),
                    }
                }
                StatementKind::Conditional => {
                    let exits = self.conditional_exits(id)?;
                    match next {
                        Some(next) => {
                            for exit in exits {
                                match self.kind(exit) {
                                    StatementKind::Break
                                    | StatementKind::Continue
                                    | StatementKind::Return => bubbled.push(exit),
                                    _ => self.edge(exit, next, EdgeKind::Sequential),
                                }
                            }
                        }
                        None => return Ok(join(exits, bubbled)),
                    }
                }
                StatementKind::Loop => {
                    let breaks = self.loop_body(id)?;
                    match next {
                        Some(next) => {
                            self.edge(id, next, EdgeKind::LoopSkip);
                            for brk in breaks {
                                self.edge(brk, next, EdgeKind::Sequential);
                            }
                        }
                        None => {
                            let mut exits = vec![id];
                            exits.extend(breaks);
                            return Ok(join(exits, bubbled));
                        }
                    }
                }
                StatementKind::Break | StatementKind::Continue | StatementKind::Return => {
                    if next.is_some() {
                        log::warn!(
                            "statements after {:?} at line {} are unreachable; skipped",
                            self.kind(id),
                            self.tree.statement(id).span.0
                        );
                    }
                    return Ok(join(vec![id], bubbled));
                }
                StatementKind::Scope => {
                    log::warn!(
                        "unrecognized nested scope statement at line {}; skipped",
                        self.tree.statement(id).span.0
                    );
                    match next {
                        Some(next) => self.edge(id, next, EdgeKind::Sequential),
                        None => return Ok(join(vec![id], bubbled)),
                    }
                }
            }
        }

        // Only an empty list reaches here: every last statement returns above.
        Ok(bubbled)
    }

    /// Branch edges and exit set of one conditional. Without a false branch
    /// the conditional itself joins the exit set (the guard may fall through
    /// without entering either branch).
    fn conditional_exits(&mut self, id: StmtId) -> Result<Vec<StmtId>, GraphError> {
        let stmt = self.tree.statement(id);
        if stmt.body.is_empty() {
            return Err(GraphError::MalformedTree {
                reason: format!("conditional at line {} has no true branch", stmt.span.0),
            });
        }
        self.edge(id, stmt.body[0], EdgeKind::TrueBranch);
        let mut exits = self.walk_list(&stmt.body)?;

        let stmt = self.tree.statement(id);
        if stmt.or_else.is_empty() {
            exits.push(id);
        } else {
            self.edge(id, stmt.or_else[0], EdgeKind::FalseBranch);
            exits.extend(self.walk_list(&stmt.or_else)?);
        }
        Ok(exits)
    }

    /// Body edges of one loop. Every non-Break body exit loops back to the
    /// header (Continue participates); Break exits are returned for the
    /// enclosing list to link past the loop.
    fn loop_body(&mut self, id: StmtId) -> Result<Vec<StmtId>, GraphError> {
        let stmt = self.tree.statement(id);
        if stmt.body.is_empty() {
            return Err(GraphError::MalformedTree {
                reason: format!("loop at line {} has an empty body", stmt.span.0),
            });
        }
        self.edge(id, stmt.body[0], EdgeKind::LoopBody);
        let body_exits = self.walk_list(&stmt.body)?;

        let mut breaks = Vec::new();
        for exit in body_exits {
            if self.kind(exit) == StatementKind::Break {
                breaks.push(exit);
            } else {
                self.edge(exit, id, EdgeKind::LoopBack);
            }
        }
        Ok(breaks)
    }
}

fn join(mut exits: Vec<StmtId>, bubbled: Vec<StmtId>) -> Vec<StmtId> {
    exits.extend(bubbled);
    exits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::StatementNode;

    fn stmt(tree: &mut StatementTree, kind: StatementKind, line: u32) -> StmtId {
        tree.add_statement(StatementNode {
            kind,
            scope: 0,
            span: (line, line),
            refs: Vec::new(),
            body: Vec::new(),
            or_else: Vec::new(),
        })
    }

    fn scope_over(tree: &mut StatementTree, body: Vec<StmtId>) -> Scope {
        let root = tree.add_statement(StatementNode {
            kind: StatementKind::Scope,
            scope: 0,
            span: (1, 99),
            refs: Vec::new(),
            body,
            or_else: Vec::new(),
        });
        Scope { id: 0, root }
    }

    #[test]
    fn straight_line_chains_sequentially() {
        let mut tree = StatementTree::new();
        let s1 = stmt(&mut tree, StatementKind::Assignment, 1);
        let s2 = stmt(&mut tree, StatementKind::Assignment, 2);
        let s3 = stmt(&mut tree, StatementKind::Assignment, 3);
        let scope = scope_over(&mut tree, vec![s1, s2, s3]);

        let cfg = build_cfg(&tree, &scope).unwrap();
        assert_eq!(cfg.edges.len(), 2);
        assert!(cfg.contains_edge(s1, s2, EdgeKind::Sequential));
        assert!(cfg.contains_edge(s2, s3, EdgeKind::Sequential));
        assert_eq!(cfg.exits, vec![s3]);
    }

    #[test]
    fn empty_scope_is_reported() {
        let mut tree = StatementTree::new();
        let scope = scope_over(&mut tree, Vec::new());
        assert_eq!(
            build_cfg(&tree, &scope),
            Err(GraphError::EmptyScope { scope: 0 })
        );
    }

    #[test]
    fn non_scope_entry_is_malformed() {
        let mut tree = StatementTree::new();
        let s1 = stmt(&mut tree, StatementKind::Assignment, 1);
        let bogus = Scope { id: 0, root: s1 };
        assert!(matches!(
            build_cfg(&tree, &bogus),
            Err(GraphError::MalformedTree { .. })
        ));
    }

    #[test]
    fn conditional_without_body_is_malformed() {
        let mut tree = StatementTree::new();
        let cond = stmt(&mut tree, StatementKind::Conditional, 1);
        let scope = scope_over(&mut tree, vec![cond]);
        assert!(matches!(
            build_cfg(&tree, &scope),
            Err(GraphError::MalformedTree { .. })
        ));
    }
}
