//! Control-flow and data-flow graph extraction for notebook-style Python sources.
//!
//! The crate analyzes one or more sequentially executed scopes (cells) lowered
//! into a shared [`tree::StatementTree`] and derives:
//!
//! - a control-flow graph per scope ([`cfg::build_cfg`]): possible execution
//!   order between statements, including branch, loop and exit semantics;
//! - def-use chains spanning all scopes ([`dfg::build_dfg`]): which variable
//!   reads may observe which writes, with state persisting across cells;
//! - CFG anchors for data-flow endpoints ([`owner::owner_of`]): the statement
//!   that structurally owns a given name reference.
//!
//! Rendering, layout and notebook ingestion live outside this crate. The
//! [`python`] module is the reference front-end producing statement trees from
//! Python cell sources; the builders themselves are front-end independent.

use thiserror::Error;

pub mod cfg;
pub mod dfg;
pub mod owner;
pub mod python;
pub mod tree;

pub use cfg::{build_cfg, CfgEdge, ControlFlowGraph, EdgeKind};
pub use dfg::{build_dfg, DataFlowGraph, DfgEdge};
pub use owner::owner_of;
pub use python::{parse_cell, parse_cells, ParsedNotebook};
pub use tree::{
    AccessMode, NameReference, RefId, Scope, ScopeId, StatementKind, StatementNode, StatementTree,
    StmtId,
};

/// Failures raised by the graph builders.
///
/// Either variant is fatal for the single build call only; callers iterating
/// scopes report and continue. Unrecognized statement kinds never raise — they
/// are logged and skipped during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The entry node is not a valid scope root, or a branch/loop node is
    /// missing a required body.
    #[error("malformed statement tree: {reason}")]
    MalformedTree { reason: String },
    /// The scope contains no statements; yields empty edge sets when skipped.
    #[error("scope {scope} contains no statements")]
    EmptyScope { scope: tree::ScopeId },
}
