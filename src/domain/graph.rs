//! Call Graph View
//!
//! Flattens the analyzer's nested call tree into a deduplicated, leveled
//! node/edge graph ready for hierarchical layout.

use crate::domain::callgraph::{CallGraphNode, NodeKey, NodePath};
use crate::domain::classifier::{Classification, VulnerabilityClassifier, VulnerabilityStatus};
use serde::Serialize;
use std::collections::HashMap;

/// A node in the rendered graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    /// Synthetic identifier (`node-<n>`)
    pub id: String,
    /// Function name
    pub label: String,
    /// Classification color at first discovery
    pub color: &'static str,
    /// Depth at first discovery (root = 0)
    pub level: usize,
    pub status: VulnerabilityStatus,
    #[serde(skip)]
    pub key: NodeKey,
    /// Which root (in `add_root` order) the node was found under
    pub root: usize,
    /// Position of the originating node under that root
    pub origin: NodePath,
}

/// Edge colors for the normal, selected and hovered states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeColor {
    pub color: &'static str,
    pub highlight: &'static str,
    pub hover: &'static str,
}

impl From<Classification> for EdgeColor {
    fn from(class: Classification) -> Self {
        Self {
            color: class.color,
            highlight: class.color,
            hover: class.color,
        }
    }
}

/// A caller -> callee edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    /// Synthetic identifier (`edge-<n>`)
    pub id: String,
    pub from: String,
    pub to: String,
    pub color: EdgeColor,
}

/// The finished graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallGraphView {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    by_key: HashMap<NodeKey, usize>,
    by_id: HashMap<String, usize>,
    merged: usize,
}

impl CallGraphView {
    /// Build the graph of a single call tree.
    pub fn build(root: &CallGraphNode) -> Self {
        let mut builder = GraphBuilder::new();
        builder.add_root(root);
        builder.finish()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn node_id_for(&self, key: &NodeKey) -> Option<&str> {
        self.by_key.get(key).map(|&index| self.nodes[index].id.as_str())
    }

    /// Number of occurrences that were folded into an existing node.
    pub fn merged_occurrences(&self) -> usize {
        self.merged
    }

    /// Resolve a selected node id back to the document node of a single-root graph.
    pub fn resolve<'d>(&self, root: &'d CallGraphNode, id: &str) -> Option<&'d CallGraphNode> {
        self.resolve_among(&[root], id)
    }

    /// Resolve a selected node id when several roots were added.
    pub fn resolve_among<'d>(&self, roots: &[&'d CallGraphNode], id: &str) -> Option<&'d CallGraphNode> {
        let node = self.node(id)?;
        let root: &'d CallGraphNode = *roots.get(node.root)?;
        root.resolve(&node.origin)
    }

    /// Nodes grouped by level for layered rendering.
    pub fn nodes_by_level(&self) -> Vec<Vec<&GraphNode>> {
        let max_level = self.nodes.iter().map(|n| n.level).max().unwrap_or(0);
        let mut layers = vec![Vec::new(); max_level + 1];
        for node in &self.nodes {
            layers[node.level].push(node);
        }
        layers
    }
}

struct Pending<'n> {
    node: &'n CallGraphNode,
    path: NodePath,
    parent: Option<usize>,
    level: usize,
}

/// Accumulates nodes and edges over one or more call trees.
///
/// The dedup map persists across `add_root` calls, so a function seen under
/// an earlier root is only linked, never duplicated.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    view: CallGraphView,
    roots: usize,
    classifier: VulnerabilityClassifier,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth-first, pre-order walk of `root`.
    pub fn add_root(&mut self, root: &CallGraphNode) {
        let root_index = self.roots;
        self.roots += 1;

        let mut work = vec![Pending {
            node: root,
            path: NodePath::root(),
            parent: None,
            level: 0,
        }];

        while let Some(item) = work.pop() {
            let key = item.node.key();
            let class = self.classifier.classify(item.node);

            if let Some(&existing) = self.view.by_key.get(&key) {
                self.view.merged += 1;
                if let Some(parent) = item.parent {
                    self.push_edge(parent, existing, class);
                }
                continue;
            }

            let index = self.view.nodes.len();
            let id = format!("node-{}", index);
            self.view.by_key.insert(key.clone(), index);
            self.view.by_id.insert(id.clone(), index);
            self.view.nodes.push(GraphNode {
                id,
                label: item.node.name().to_string(),
                color: class.color,
                level: item.level,
                status: class.status,
                key,
                root: root_index,
                origin: item.path.clone(),
            });
            if let Some(parent) = item.parent {
                self.push_edge(parent, index, class);
            }

            // Reversed so the first child is popped first.
            for (i, child) in item.node.children.iter().enumerate().rev() {
                work.push(Pending {
                    node: child,
                    path: item.path.child(i),
                    parent: Some(index),
                    level: item.level + 1,
                });
            }
        }

        tracing::debug!(
            root = root.name(),
            nodes = self.view.nodes.len(),
            edges = self.view.edges.len(),
            merged = self.view.merged,
            "call tree added to graph"
        );
    }

    pub fn finish(self) -> CallGraphView {
        self.view
    }

    fn push_edge(&mut self, from: usize, to: usize, class: Classification) {
        let edge = GraphEdge {
            id: format!("edge-{}", self.view.edges.len()),
            from: self.view.nodes[from].id.clone(),
            to: self.view.nodes[to].id.clone(),
            color: class.into(),
        };
        self.view.edges.push(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::callgraph::CallLocation;

    fn func(name: &str, line: u32, children: Vec<CallGraphNode>) -> CallGraphNode {
        CallGraphNode {
            func_name: Some(name.to_string()),
            locations: vec![CallLocation { file: "main.cpp".to_string(), line, column: Some(4) }],
            children,
            ..Default::default()
        }
    }

    #[test]
    fn test_graph_from_call_tree() {
        let root = func(
            "main",
            1,
            vec![func("foo", 10, vec![func("baz", 30, vec![])]), func("bar", 20, vec![])],
        );

        let graph = CallGraphView::build(&root);
        let labels: Vec<&str> = graph.nodes().iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["main", "foo", "baz", "bar"]);
        assert_eq!(graph.edges().len(), 3);
        assert_eq!(graph.nodes()[2].level, 2);
        assert_eq!(graph.edges()[0].id, "edge-0");
        assert_eq!(graph.edges()[1].from, "node-1");
        assert_eq!(graph.edges()[1].to, "node-2");
    }

    #[test]
    fn test_repeated_function_is_merged() {
        let root = func(
            "main",
            1,
            vec![
                func("log", 5, vec![func("fmt", 6, vec![])]),
                func("run", 7, vec![func("log", 5, vec![func("never_visited", 99, vec![])])]),
            ],
        );

        let graph = CallGraphView::build(&root);
        assert_eq!(graph.nodes().len(), 4);
        assert!(graph.nodes().iter().all(|n| n.label != "never_visited"));
        assert_eq!(graph.merged_occurrences(), 1);

        let log_id = graph.node_id_for(&root.children[0].key()).unwrap().to_string();
        let into_log: Vec<&GraphEdge> = graph.edges().iter().filter(|e| e.to == log_id).collect();
        assert_eq!(into_log.len(), 2);
        assert_eq!(graph.node(&log_id).unwrap().level, 1);
    }

    #[test]
    fn test_nodes_by_level_and_resolve() {
        let root = func("main", 1, vec![func("a", 2, vec![func("b", 3, vec![])]), func("c", 4, vec![])]);
        let graph = CallGraphView::build(&root);

        let layers = graph.nodes_by_level();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[1].len(), 2);

        let b_id = graph.nodes().iter().find(|n| n.label == "b").unwrap().id.clone();
        assert_eq!(graph.resolve(&root, &b_id).map(|n| n.name()), Some("b"));
        assert!(graph.resolve(&root, "node-42").is_none());
    }

    #[test]
    fn test_multiple_roots_share_dedup_map() {
        let first = func("main", 1, vec![func("shared", 2, vec![])]);
        let second = func("worker", 3, vec![func("shared", 2, vec![])]);

        let mut builder = GraphBuilder::new();
        builder.add_root(&first);
        builder.add_root(&second);
        let graph = builder.finish();

        assert_eq!(graph.nodes().len(), 3);
        assert_eq!(graph.edges().len(), 2);
        let worker = graph.nodes().iter().find(|n| n.label == "worker").unwrap();
        assert_eq!(worker.root, 1);
        assert_eq!(worker.level, 0);
        assert_eq!(graph.resolve_among(&[&first, &second], &worker.id).map(|n| n.name()), Some("worker"));
    }
}
