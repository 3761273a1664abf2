//! Language-neutral statement tree model.
//!
//! A front-end (see [`crate::python`]) lowers each independently parsed scope
//! (a notebook cell) into this arena. The graph builders consume the tree
//! read-only; node identity is the arena index, never pointer equality.

use serde::{Deserialize, Serialize};

/// Stable index of a statement within a [`StatementTree`]
pub type StmtId = u32;

/// Stable index of a name reference within a [`StatementTree`]
pub type RefId = u32;

/// Position of a scope (cell) in execution order
pub type ScopeId = u32;

/// Kind of statement node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatementKind {
    /// Root of one independently parsed scope (module / cell)
    Scope,
    /// Assignment, including augmented and annotated forms
    Assignment,
    /// Expression evaluated for effect
    Expression,
    /// If/elif branch point; false branch in `or_else`
    Conditional,
    /// While/for loop header
    Loop,
    /// Function definition (opaque sub-scope)
    FunctionDef,
    Break,
    Continue,
    Return,
    Import,
}

/// How an identifier occurrence touches its binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    Read,
    Write,
    Delete,
}

/// An occurrence of an identifier inside a statement's expressions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameReference {
    /// Identifier text
    pub name: String,
    pub mode: AccessMode,
    /// Scope the occurrence was parsed in
    pub scope: ScopeId,
    /// Source line, 1-based
    pub line: u32,
    /// Column within the line; disambiguates occurrences sharing a line
    pub column: u32,
}

/// A node in the statement tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementNode {
    pub kind: StatementKind,
    /// Scope the statement belongs to
    pub scope: ScopeId,
    /// Source line range (start, end); used for ordering only
    pub span: (u32, u32),
    /// References in the statement's own expressions (guard, targets, values)
    pub refs: Vec<RefId>,
    /// Child statement list (scope/branch/loop/function body)
    pub body: Vec<StmtId>,
    /// False branch of a conditional; empty for every other kind
    pub or_else: Vec<StmtId>,
}

/// One independently parsed top-level statement sequence.
///
/// Scopes are totally ordered by `id`; identifiers persist into later scopes
/// in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    /// Root statement of the scope; always [`StatementKind::Scope`]
    pub root: StmtId,
}

/// Arena owning every statement and name reference of one analyzed program.
///
/// Built once per program, immutable for the duration of extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementTree {
    statements: Vec<StatementNode>,
    references: Vec<NameReference>,
}

impl StatementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement and return its id
    pub fn add_statement(&mut self, node: StatementNode) -> StmtId {
        let id = self.statements.len() as StmtId;
        self.statements.push(node);
        id
    }

    /// Add a name reference and return its id
    pub fn add_reference(&mut self, reference: NameReference) -> RefId {
        let id = self.references.len() as RefId;
        self.references.push(reference);
        id
    }

    pub fn statement(&self, id: StmtId) -> &StatementNode {
        &self.statements[id as usize]
    }

    pub fn reference(&self, id: RefId) -> &NameReference {
        &self.references[id as usize]
    }

    /// Attach extra references to an already-added statement
    pub fn extend_refs(&mut self, id: StmtId, refs: impl IntoIterator<Item = RefId>) {
        self.statements[id as usize].refs.extend(refs);
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Statement ids of the subtree rooted at `root` in document order
    /// (preorder: a statement, then its body, then its false branch)
    pub fn descendants(&self, root: StmtId) -> Vec<StmtId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let stmt = &self.statements[id as usize];
            for &child in stmt.or_else.iter().rev() {
                stack.push(child);
            }
            for &child in stmt.body.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// All references in the subtree rooted at `root`, document order
    pub fn subtree_refs(&self, root: StmtId) -> Vec<RefId> {
        self.descendants(root)
            .into_iter()
            .flat_map(|id| self.statements[id as usize].refs.iter().copied())
            .collect()
    }
}
