//! Statement-owner resolution.
//!
//! Given a name reference and a candidate list of statements (typically a
//! CFG's node universe in document order), finds the statement that
//! structurally owns the reference so data-flow edges can be anchored onto
//! control-flow nodes. FunctionDef and Return candidates are opaque
//! boundaries and are never elected; references inside them resolve against
//! the inner scope's own candidate list, or not at all.

use crate::tree::{RefId, StatementKind, StatementTree, StmtId};

/// Resolve the statement owning `reference` among `candidates`.
///
/// Candidates are tried in the order given; the first match wins. Identity
/// comparison on the reference id is primary; when the reference is a
/// structural copy not present under any candidate, a second pass matches by
/// identifier name instead. Returns `None` when no candidate owns the
/// reference (typical for references inside FunctionDef or Return contexts).
pub fn owner_of(
    tree: &StatementTree,
    reference: RefId,
    candidates: &[StmtId],
) -> Option<StmtId> {
    if let Some(found) = resolve(tree, candidates, &|r| r == reference) {
        return Some(found);
    }
    let name = &tree.reference(reference).name;
    resolve(tree, candidates, &|r| tree.reference(r).name == *name)
}

fn resolve<F>(tree: &StatementTree, candidates: &[StmtId], matches: &F) -> Option<StmtId>
where
    F: Fn(RefId) -> bool,
{
    for &candidate in candidates {
        let stmt = tree.statement(candidate);
        match stmt.kind {
            // Opaque boundaries: never elected as owners.
            StatementKind::FunctionDef | StatementKind::Return => continue,
            // Only the loop header (guard, target, iterable) counts at this
            // level; a reference deep in the body belongs to the finer body
            // candidates instead.
            StatementKind::Loop => {
                if stmt.refs.iter().copied().any(matches) {
                    return Some(candidate);
                }
            }
            // Branches are tested independently so a reference used in one
            // branch is never attributed to the other; a match attributes to
            // the containing branch statement, a test match to the
            // conditional itself.
            StatementKind::Conditional => {
                for &line in &stmt.body {
                    if subtree_matches(tree, line, matches) {
                        return Some(line);
                    }
                }
                for &line in &stmt.or_else {
                    if subtree_matches(tree, line, matches) {
                        return Some(line);
                    }
                }
                if stmt.refs.iter().copied().any(matches) {
                    return Some(candidate);
                }
            }
            _ => {
                if subtree_matches(tree, candidate, matches) {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

fn subtree_matches<F>(tree: &StatementTree, root: StmtId, matches: &F) -> bool
where
    F: Fn(RefId) -> bool,
{
    tree.subtree_refs(root).into_iter().any(matches)
}
