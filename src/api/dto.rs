use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use crate::domain::callgraph::{CallGraphNode, CallLocation, Library};
use crate::domain::graph::{CallGraphView, EdgeColor, GraphEdge, GraphNode};

/// Graph in the shape the network renderer consumes.
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphDto {
    pub nodes: Vec<NodeDto>,
    pub edges: Vec<EdgeDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: String,
    pub label: String,
    pub color: String,
    pub level: usize,
    pub data: NodeData,
}

/// Originating document node, without its subtree.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeData {
    pub func_name: String,
    pub status: String,
    pub locations: Vec<CallLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<Library>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_vulnerability_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_ai_reports: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_ai_vulnerability_scores: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_ai_metric_scores: Option<BTreeMap<String, BTreeMap<String, f64>>>,
    pub children: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeDto {
    pub id: String,
    pub from: String,
    pub to: String,
    pub color: EdgeColorDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeColorDto {
    pub color: String,
    pub highlight: String,
    pub hover: String,
}

impl From<EdgeColor> for EdgeColorDto {
    fn from(c: EdgeColor) -> Self {
        Self {
            color: c.color.to_string(),
            highlight: c.highlight.to_string(),
            hover: c.hover.to_string(),
        }
    }
}

impl From<&GraphEdge> for EdgeDto {
    fn from(e: &GraphEdge) -> Self {
        Self {
            id: e.id.clone(),
            from: e.from.clone(),
            to: e.to.clone(),
            color: e.color.into(),
        }
    }
}

impl NodeDto {
    fn from_node(node: &GraphNode, origin: Option<&CallGraphNode>) -> Self {
        let data = NodeData {
            func_name: node.label.clone(),
            status: node.status.label().to_string(),
            locations: origin.map(|o| o.locations.clone()).unwrap_or_default(),
            library: origin.and_then(|o| o.library.clone()),
            extracted_code: origin.and_then(|o| o.extracted_code.clone()),
            ai_report: origin.and_then(|o| o.ai_report.clone()),
            ai_vulnerability_score: origin.and_then(|o| o.ai_vulnerability_score),
            judge_ai_reports: origin.and_then(|o| o.judge_ai_reports.clone()),
            judge_ai_vulnerability_scores: origin.and_then(|o| o.judge_ai_vulnerability_scores.clone()),
            judge_ai_metric_scores: origin.and_then(|o| o.judge_ai_metric_scores.clone()),
            children: origin.map_or(0, |o| o.children.len()),
        };
        Self {
            id: node.id.clone(),
            label: node.label.clone(),
            color: node.color.to_string(),
            level: node.level,
            data,
        }
    }
}

impl GraphDto {
    /// `root` must be the call tree the view was built from.
    pub fn from_view(view: &CallGraphView, root: &CallGraphNode) -> Self {
        let nodes = view
            .nodes()
            .iter()
            .map(|n| NodeDto::from_node(n, view.resolve(root, &n.id)))
            .collect();
        let edges = view.edges().iter().map(EdgeDto::from).collect();
        GraphDto { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dto_shape() {
        let root: CallGraphNode = serde_json::from_str(
            r#"{"func_name": "main", "children": [
                {"func_name": "helper", "locations": [{"file": "main.cpp", "line": 4}],
                 "judge_ai_vulnerability_scores": {"claude": 1.5}}
            ]}"#,
        )
        .unwrap();
        let view = CallGraphView::build(&root);
        let dto = GraphDto::from_view(&view, &root);

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["nodes"][0]["id"], "node-0");
        assert_eq!(json["nodes"][0]["data"]["children"], 1);
        assert_eq!(json["nodes"][1]["level"], 1);
        assert_eq!(json["nodes"][1]["data"]["locations"][0]["file"], "main.cpp");
        assert_eq!(json["nodes"][1]["data"]["judge_ai_vulnerability_scores"]["claude"], 1.5);
        assert!(json["nodes"][0]["data"].get("judge_ai_reports").is_none());
        assert_eq!(json["edges"][0]["from"], "node-0");
        assert_eq!(json["edges"][0]["color"]["hover"], "#16a34a");
    }
}
