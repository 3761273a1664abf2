//! Python front-end: lowers cell sources into the statement tree.
//!
//! Each cell is parsed with tree-sitter and lowered into one scope of a
//! shared [`StatementTree`]. Lowering mirrors the Python `ast` name
//! contexts: assignment and for-loop targets are writes, `del` targets are
//! deletes, everything else is a read; import bindings contribute no
//! references. Constructs outside the recognized statement set are logged
//! and skipped, never fatal for the cell.

use anyhow::{bail, Context, Result};
use tree_sitter::{Node, Parser};

use crate::tree::{
    AccessMode, NameReference, RefId, Scope, ScopeId, StatementKind, StatementNode, StatementTree,
    StmtId,
};

/// One analyzed notebook: the shared tree plus the scopes that survived
/// parsing, in execution order.
#[derive(Debug, Default)]
pub struct ParsedNotebook {
    pub tree: StatementTree,
    pub scopes: Vec<Scope>,
}

/// Parse a sequence of cells executed in order.
///
/// Cells that fail to parse are logged and skipped; their scope id is still
/// consumed, so surviving scopes keep their execution position.
pub fn parse_cells(cells: &[&str]) -> Result<ParsedNotebook> {
    let mut notebook = ParsedNotebook::default();
    for (index, cell) in cells.iter().enumerate() {
        let id = index as ScopeId;
        match parse_cell(&mut notebook.tree, cell, id) {
            Ok(scope) => notebook.scopes.push(scope),
            Err(err) => log::warn!("cell {id} skipped: {err:#}"),
        }
    }
    Ok(notebook)
}

/// Parse one cell into `tree` as scope `scope`.
pub fn parse_cell(tree: &mut StatementTree, source: &str, scope: ScopeId) -> Result<Scope> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .context("loading the python grammar")?;
    let parsed = parser
        .parse(source, None)
        .context("parsing cell source")?;
    let root = parsed.root_node();
    if root.has_error() {
        bail!("cell {scope} contains syntax errors");
    }

    let mut lowering = Lowering {
        tree,
        source: source.as_bytes(),
        scope,
    };
    let body = lowering.lower_block(root);
    let span = (1, root.end_position().row as u32 + 1);
    let root_id = tree.add_statement(StatementNode {
        kind: StatementKind::Scope,
        scope,
        span,
        refs: Vec::new(),
        body,
        or_else: Vec::new(),
    });
    Ok(Scope {
        id: scope,
        root: root_id,
    })
}

struct Lowering<'a> {
    tree: &'a mut StatementTree,
    source: &'a [u8],
    scope: ScopeId,
}

impl Lowering<'_> {
    fn lower_block(&mut self, node: Node) -> Vec<StmtId> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if !child.is_named() {
                continue;
            }
            if let Some(id) = self.lower_statement(child) {
                out.push(id);
            }
        }
        out
    }

    fn lower_statement(&mut self, node: Node) -> Option<StmtId> {
        match node.kind() {
            "comment" => None,
            "import_statement" | "import_from_statement" | "future_import_statement" => Some(
                self.push(node, StatementKind::Import, Vec::new(), Vec::new(), Vec::new()),
            ),
            "expression_statement" => self.lower_expression_statement(node),
            "if_statement" => Some(self.lower_if(node)),
            "while_statement" => Some(self.lower_while(node)),
            "for_statement" => Some(self.lower_for(node)),
            "function_definition" => Some(self.lower_function(node)),
            "decorated_definition" => self.lower_decorated(node),
            "return_statement" => {
                let mut refs = Vec::new();
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.is_named() {
                        self.collect_reads(child, &mut refs);
                    }
                }
                Some(self.push(node, StatementKind::Return, refs, Vec::new(), Vec::new()))
            }
            "break_statement" => Some(self.push(
                node,
                StatementKind::Break,
                Vec::new(),
                Vec::new(),
                Vec::new(),
            )),
            "continue_statement" => Some(self.push(
                node,
                StatementKind::Continue,
                Vec::new(),
                Vec::new(),
                Vec::new(),
            )),
            "delete_statement" => {
                // `del` has no statement kind of its own; it survives as an
                // expression carrying delete-mode references, which is all
                // the data-flow chain breaking needs.
                let mut refs = Vec::new();
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.is_named() {
                        self.collect_delete_targets(child, &mut refs);
                    }
                }
                Some(self.push(node, StatementKind::Expression, refs, Vec::new(), Vec::new()))
            }
            other => {
                log::warn!(
                    "unrecognized statement kind `{}` at line {}; skipped",
                    other,
                    node.start_position().row + 1
                );
                None
            }
        }
    }

    fn lower_expression_statement(&mut self, node: Node) -> Option<StmtId> {
        let mut cursor = node.walk();
        let named: Vec<Node> = node.children(&mut cursor).filter(|c| c.is_named()).collect();
        if let [single] = named[..] {
            if matches!(single.kind(), "assignment" | "augmented_assignment") {
                let mut refs = Vec::new();
                self.collect_assignment(single, &mut refs);
                return Some(self.push(
                    node,
                    StatementKind::Assignment,
                    refs,
                    Vec::new(),
                    Vec::new(),
                ));
            }
        }
        let mut refs = Vec::new();
        for child in named {
            self.collect_reads(child, &mut refs);
        }
        Some(self.push(node, StatementKind::Expression, refs, Vec::new(), Vec::new()))
    }

    fn lower_if(&mut self, node: Node) -> StmtId {
        let mut refs = Vec::new();
        if let Some(condition) = node.child_by_field_name("condition") {
            self.collect_reads(condition, &mut refs);
        }
        let body = node
            .child_by_field_name("consequence")
            .map(|b| self.lower_block(b))
            .unwrap_or_default();

        let mut cursor = node.walk();
        let alternatives: Vec<Node> = node
            .children_by_field_name("alternative", &mut cursor)
            .collect();
        let or_else = self.lower_alternatives(&alternatives);

        self.push(node, StatementKind::Conditional, refs, body, or_else)
    }

    /// An elif chain becomes nested conditionals in the false branch, the
    /// same shape the Python `ast` module produces.
    fn lower_alternatives(&mut self, alternatives: &[Node]) -> Vec<StmtId> {
        let Some((first, rest)) = alternatives.split_first() else {
            return Vec::new();
        };
        match first.kind() {
            "else_clause" => first
                .child_by_field_name("body")
                .map(|b| self.lower_block(b))
                .unwrap_or_default(),
            "elif_clause" => {
                let mut refs = Vec::new();
                if let Some(condition) = first.child_by_field_name("condition") {
                    self.collect_reads(condition, &mut refs);
                }
                let body = first
                    .child_by_field_name("consequence")
                    .map(|b| self.lower_block(b))
                    .unwrap_or_default();
                let or_else = self.lower_alternatives(rest);
                vec![self.push(*first, StatementKind::Conditional, refs, body, or_else)]
            }
            _ => Vec::new(),
        }
    }

    fn lower_while(&mut self, node: Node) -> StmtId {
        let mut refs = Vec::new();
        if let Some(condition) = node.child_by_field_name("condition") {
            self.collect_reads(condition, &mut refs);
        }
        if node.child_by_field_name("alternative").is_some() {
            log::warn!(
                "while-else at line {} is not modeled; else branch skipped",
                node.start_position().row + 1
            );
        }
        let body = node
            .child_by_field_name("body")
            .map(|b| self.lower_block(b))
            .unwrap_or_default();
        self.push(node, StatementKind::Loop, refs, body, Vec::new())
    }

    fn lower_for(&mut self, node: Node) -> StmtId {
        let mut refs = Vec::new();
        if let Some(right) = node.child_by_field_name("right") {
            self.collect_reads(right, &mut refs);
        }
        if let Some(left) = node.child_by_field_name("left") {
            self.collect_targets(left, &mut refs);
        }
        if node.child_by_field_name("alternative").is_some() {
            log::warn!(
                "for-else at line {} is not modeled; else branch skipped",
                node.start_position().row + 1
            );
        }
        let body = node
            .child_by_field_name("body")
            .map(|b| self.lower_block(b))
            .unwrap_or_default();
        self.push(node, StatementKind::Loop, refs, body, Vec::new())
    }

    fn lower_function(&mut self, node: Node) -> StmtId {
        // The definition name is a binding, not a name expression; like the
        // Python ast it contributes no reference. Parameter defaults and
        // annotations are evaluated at definition time and stay reads.
        let mut refs = Vec::new();
        if let Some(parameters) = node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            for parameter in parameters.children(&mut cursor) {
                match parameter.kind() {
                    "default_parameter" | "typed_default_parameter" => {
                        if let Some(value) = parameter.child_by_field_name("value") {
                            self.collect_reads(value, &mut refs);
                        }
                        if let Some(ty) = parameter.child_by_field_name("type") {
                            self.collect_reads(ty, &mut refs);
                        }
                    }
                    "typed_parameter" => {
                        if let Some(ty) = parameter.child_by_field_name("type") {
                            self.collect_reads(ty, &mut refs);
                        }
                    }
                    _ => {}
                }
            }
        }
        if let Some(return_type) = node.child_by_field_name("return_type") {
            self.collect_reads(return_type, &mut refs);
        }
        let body = node
            .child_by_field_name("body")
            .map(|b| self.lower_block(b))
            .unwrap_or_default();
        self.push(node, StatementKind::FunctionDef, refs, body, Vec::new())
    }

    fn lower_decorated(&mut self, node: Node) -> Option<StmtId> {
        let definition = node.child_by_field_name("definition")?;
        let id = self.lower_statement(definition)?;
        // Decorator expressions are evaluated at definition time; their
        // names read like any other expression of the definition.
        let mut refs = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "decorator" {
                self.collect_reads(child, &mut refs);
            }
        }
        self.tree.extend_refs(id, refs);
        Some(id)
    }

    fn push(
        &mut self,
        node: Node,
        kind: StatementKind,
        refs: Vec<RefId>,
        body: Vec<StmtId>,
        or_else: Vec<StmtId>,
    ) -> StmtId {
        let span = (
            node.start_position().row as u32 + 1,
            node.end_position().row as u32 + 1,
        );
        self.tree.add_statement(StatementNode {
            kind,
            scope: self.scope,
            span,
            refs,
            body,
            or_else,
        })
    }

    fn add_ref(&mut self, node: Node, mode: AccessMode, refs: &mut Vec<RefId>) {
        let name = node.utf8_text(self.source).unwrap_or("").to_string();
        if name.is_empty() {
            return;
        }
        let id = self.tree.add_reference(NameReference {
            name,
            mode,
            scope: self.scope,
            line: node.start_position().row as u32 + 1,
            column: node.start_position().column as u32,
        });
        refs.push(id);
    }

    /// Every identifier read inside an expression. Attribute accesses read
    /// only their base object and keyword arguments only their value, the
    /// positions where the Python ast places `Name` nodes.
    fn collect_reads(&mut self, node: Node, refs: &mut Vec<RefId>) {
        match node.kind() {
            "identifier" => self.add_ref(node, AccessMode::Read, refs),
            "attribute" => {
                if let Some(object) = node.child_by_field_name("object") {
                    self.collect_reads(object, refs);
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.collect_reads(value, refs);
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.is_named() {
                        self.collect_reads(child, refs);
                    }
                }
            }
        }
    }

    /// Write targets of assignments and for loops. Bare identifiers are
    /// writes; subscript and attribute targets mutate an existing value, so
    /// their constituent names stay reads.
    fn collect_targets(&mut self, node: Node, refs: &mut Vec<RefId>) {
        match node.kind() {
            "identifier" => self.add_ref(node, AccessMode::Write, refs),
            "pattern_list" | "tuple_pattern" | "list_pattern" | "parenthesized_expression"
            | "list_splat_pattern" | "splat_pattern" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.is_named() {
                        self.collect_targets(child, refs);
                    }
                }
            }
            _ => self.collect_reads(node, refs),
        }
    }

    /// Delete targets: bare identifiers are destroyed, container elements
    /// only read their container.
    fn collect_delete_targets(&mut self, node: Node, refs: &mut Vec<RefId>) {
        match node.kind() {
            "identifier" => self.add_ref(node, AccessMode::Delete, refs),
            "expression_list" | "parenthesized_expression" | "pattern_list" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    if child.is_named() {
                        self.collect_delete_targets(child, refs);
                    }
                }
            }
            _ => self.collect_reads(node, refs),
        }
    }

    /// Value reads then target writes of one (possibly chained) assignment.
    fn collect_assignment(&mut self, node: Node, refs: &mut Vec<RefId>) {
        if let Some(right) = node.child_by_field_name("right") {
            if matches!(right.kind(), "assignment" | "augmented_assignment") {
                self.collect_assignment(right, refs);
            } else {
                self.collect_reads(right, refs);
            }
        }
        if let Some(ty) = node.child_by_field_name("type") {
            self.collect_reads(ty, refs);
        }
        if let Some(left) = node.child_by_field_name("left") {
            self.collect_targets(left, refs);
        }
    }
}
