//! Graphviz DOT Exporter
//!
//! Renders a CallGraphView as a top-down DOT digraph, one rank per level.

use crate::domain::callgraph::CallGraphNode;
use crate::domain::classifier::VulnerabilityStatus;
use crate::domain::graph::CallGraphView;
use crate::ports::OutputExporter;

pub struct DotExporter;

impl OutputExporter for DotExporter {
    fn render(&self, graph: &CallGraphView, _root: &CallGraphNode) -> anyhow::Result<String> {
        Ok(Self::to_dot(graph))
    }
}

impl DotExporter {
    /// Convert the graph to a DOT string.
    pub fn to_dot(graph: &CallGraphView) -> String {
        let mut lines = Vec::new();

        lines.push("digraph CallGraph {".to_string());
        lines.push("    rankdir=TB;".to_string());
        lines.push("    nodesep=0.8;".to_string());
        lines.push("    ranksep=1.0;".to_string());
        lines.push("    node [fontname=\"Helvetica\", fontsize=12, shape=box];".to_string());
        lines.push("".to_string());

        for node in graph.nodes() {
            lines.push(format!(
                "    \"{}\" [label=\"{}\", style=\"{}\", fillcolor=\"{}\", tooltip=\"{}\"];",
                node.id,
                Self::escape_label(&node.label),
                Self::node_style(node.status),
                node.color,
                node.status.label()
            ));
        }

        lines.push("".to_string());

        for edge in graph.edges() {
            lines.push(format!(
                "    \"{}\" -> \"{}\" [color=\"{}\"];",
                edge.from, edge.to, edge.color.color
            ));
        }

        for layer in graph.nodes_by_level() {
            if !layer.is_empty() {
                let node_ids: Vec<String> = layer.iter().map(|n| format!("\"{}\"", n.id)).collect();
                lines.push(format!("    {{ rank=same; {} }}", node_ids.join("; ")));
            }
        }

        lines.push("}".to_string());

        lines.join("\n")
    }

    fn node_style(status: VulnerabilityStatus) -> &'static str {
        match status {
            VulnerabilityStatus::HighRisk | VulnerabilityStatus::PotentiallyVulnerable => "filled,bold",
            VulnerabilityStatus::VulnerableByDescendant => "filled,dashed",
            _ => "filled",
        }
    }

    fn escape_label(label: &str) -> String {
        label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::callgraph::{CallLocation, Cve, Library, Severity};

    #[test]
    fn test_to_dot() {
        let root = CallGraphNode {
            func_name: Some("main".to_string()),
            children: vec![CallGraphNode {
                func_name: Some("png_read_info".to_string()),
                locations: vec![CallLocation { file: "img.cpp".to_string(), line: 8, column: None }],
                library: Some(Library {
                    name: "libpng".to_string(),
                    vendor: None,
                    version: "1.6.0".to_string(),
                    source: "find_package".to_string(),
                    git_repo: None,
                    options: Default::default(),
                    checked_at: None,
                    cves: vec![Cve {
                        id: "CVE-2015-8126".to_string(),
                        description: "overflow".to_string(),
                        severity: Severity::Critical,
                        cvss: Some(9.8),
                        published_date: None,
                        exploit: None,
                        affected_version: None,
                    }],
                }),
                ..Default::default()
            }],
            ..Default::default()
        };

        let graph = CallGraphView::build(&root);
        let dot = DotExporter.render(&graph, &root).unwrap();
        assert!(dot.contains("digraph CallGraph"));
        assert!(dot.contains("rankdir=TB"));
        assert!(dot.contains("\"node-0\" -> \"node-1\" [color=\"#d97706\"]"));
        assert!(dot.contains("fillcolor=\"#fecc76\""));
        assert!(dot.contains("{ rank=same; \"node-1\" }"));
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(DotExporter::escape_label("operator\"\""), "operator\\\"\\\"");
    }
}
