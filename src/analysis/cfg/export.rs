//! Serializable view of a control flow graph.
//!
//! [`CfgExport`] flattens a [`ControlFlowGraph`] into plain nodes and edges with integer
//! ids, which is what external visualizers consume. The JSON layout is
//!
//! ```text
//! { "function": "f",
//!   "nodes": [ { "id": 0, "label": "entry", "kind": "entry", "stmt_count": 0, "stmts": [] }, ... ],
//!   "edges": [ { "from": 0, "to": 2, "kind": "unconditional", "label": "", "back": false }, ... ],
//!   "entry": 0,
//!   "exit": 1 }
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    analysis::cfg::{CfgEdgeKind, ControlFlowGraph},
    Error, Result,
};

/// One block of an exported graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedNode {
    /// Block id
    pub id: usize,
    /// Block label, e.g. `if_then` or `label_retry`
    pub label: String,
    /// Snake-case block kind
    pub kind: String,
    /// Number of statements in the block
    pub stmt_count: usize,
    /// The statements, rendered as source
    pub stmts: Vec<String>,
}

/// One edge of an exported graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedEdge {
    /// Source block id
    pub from: usize,
    /// Target block id
    pub to: usize,
    /// Snake-case edge kind
    pub kind: String,
    /// Display label (`true`, `false`, `case 1`, ...); empty for straight-line flow
    pub label: String,
    /// Whether the edge closes a cycle in a depth-first walk from the entry
    pub back: bool,
}

/// A control flow graph as plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgExport {
    /// Name of the function
    pub function: String,
    /// Blocks in id order
    pub nodes: Vec<ExportedNode>,
    /// Edges grouped by source block, in successor order
    pub edges: Vec<ExportedEdge>,
    /// Id of the entry block
    pub entry: usize,
    /// Id of the exit block
    pub exit: usize,
}

impl CfgExport {
    /// Serializes the view as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the encoder fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parses a view previously written by [`CfgExport::to_json`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if `json` is not a valid export.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Returns the node with `id`.
    #[must_use]
    pub fn node(&self, id: usize) -> Option<&ExportedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

impl ControlFlowGraph<'_> {
    /// Flattens the graph into a [`CfgExport`].
    ///
    /// ```rust
    /// use goscope::{ast::build::*, build_cfg};
    ///
    /// let f = func("f", &["c"], vec![while_loop(ident("c"), vec![inc("i")])]);
    /// let export = build_cfg(&f)?.export();
    ///
    /// assert_eq!(export.entry, 0);
    /// assert_eq!(export.exit, 1);
    /// assert_eq!(export.edges.iter().filter(|e| e.back).count(), 1);
    /// # Ok::<(), goscope::Error>(())
    /// ```
    #[must_use]
    pub fn export(&self) -> CfgExport {
        let back_edges: BTreeSet<_> = self.back_edges().into_iter().collect();

        let nodes = self
            .blocks()
            .map(|block| ExportedNode {
                id: block.id.index(),
                label: block.label.clone(),
                kind: <&'static str>::from(block.kind).to_string(),
                stmt_count: block.stmts.len(),
                stmts: block.stmts.iter().map(ToString::to_string).collect(),
            })
            .collect();

        let edges = self
            .blocks()
            .flat_map(|block| {
                self.outgoing_edges(block.id)
                    .map(move |(target, kind)| (block.id, target, kind))
            })
            .map(|(source, target, kind): (_, _, CfgEdgeKind)| ExportedEdge {
                from: source.index(),
                to: target.index(),
                kind: <&'static str>::from(kind).to_string(),
                label: kind.label(),
                back: back_edges.contains(&(source, target)),
            })
            .collect();

        CfgExport {
            function: self.name().to_string(),
            nodes,
            edges,
            entry: self.entry().index(),
            exit: self.exit().index(),
        }
    }

    /// Renders the graph as JSON; see [`CfgExport`] for the layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the encoder fails.
    pub fn to_json(&self) -> Result<String> {
        self.export().to_json()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::{BlockKind, CfgBuilder},
        ast::build::*,
    };

    use super::CfgExport;

    #[test]
    fn test_export_if_diamond() {
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
        let cfg = CfgBuilder::new().build(&f).unwrap();
        let export = cfg.export();

        assert_eq!(export.function, "f");
        assert_eq!(export.nodes.len(), cfg.block_count());
        assert_eq!(export.edges.len(), cfg.edge_count());

        let cond = cfg.blocks().find(|b| b.kind == BlockKind::IfCond).unwrap().id.index();
        let node = export.node(cond).unwrap();
        assert_eq!(node.kind, "if_cond");
        assert_eq!(node.stmt_count, 1);
        assert_eq!(node.stmts, vec!["x > 0"]);

        let branches: Vec<(&str, &str)> = export
            .edges
            .iter()
            .filter(|e| e.from == cond)
            .map(|e| (e.kind.as_str(), e.label.as_str()))
            .collect();
        assert_eq!(
            branches,
            vec![("conditional_true", "true"), ("conditional_false", "false")]
        );
        assert!(export.edges.iter().all(|e| !e.back));
    }

    #[test]
    fn test_json_layout() {
        let f = func("loop", &["c"], vec![while_loop(ident("c"), vec![inc("i")])]);
        let cfg = CfgBuilder::new().build(&f).unwrap();
        let json = cfg.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entry"], 0);
        assert_eq!(value["exit"], 1);
        assert_eq!(value["nodes"][0]["label"], "entry");
        assert_eq!(value["nodes"][0]["stmt_count"], 0);
        assert!(value["edges"]
            .as_array()
            .unwrap()
            .iter()
            .any(|edge| edge["back"] == true && edge["kind"] == "back"));

        assert_eq!(CfgExport::from_json(&json).unwrap(), cfg.export());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            CfgExport::from_json("{\"nodes\": 3}"),
            Err(crate::Error::Serialization(_))
        ));
    }
}
