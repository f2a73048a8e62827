// Call graph document structures for vulngraph.
// Mirrors the JSON returned by the C/C++ analysis backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name given to functions the backend reported without one.
pub const UNKNOWN_FUNCTION: &str = "unknown";

/// A call site reference: where a function is called from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLocation {
    pub file: String,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl CallLocation {
    /// `file:line:column`, with an empty column when the backend gave none.
    pub fn signature(&self) -> String {
        match self.column {
            Some(column) => format!("{}:{}:{}", self.file, self.line, column),
            None => format!("{}:{}:", self.file, self.line),
        }
    }
}

/// CVE severity as rated by the backend (derived from CVSS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// Ordering weight: LOW=1 .. CRITICAL=4, anything else 0.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
            Severity::None | Severity::Unknown => 0,
        }
    }

    /// Display color used for CVE entries.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Low => "#22c55e",
            Severity::Medium => "#eab308",
            Severity::High => "#f97316",
            Severity::Critical => "#dc2626",
            Severity::None | Severity::Unknown => "#9ca3af",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A vulnerability record attached to a library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cve {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_version: Option<String>,
}

/// A third-party library a function belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default = "unknown_field")]
    pub version: String,
    #[serde(default = "unknown_field")]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_repo: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
    #[serde(default)]
    pub cves: Vec<Cve>,
}

fn unknown_field() -> String {
    "unknown".to_string()
}

impl Library {
    /// Highest severity among the recorded CVEs, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.cves.iter().map(|c| c.severity).max_by_key(Severity::rank)
    }
}

/// A node of the call tree returned by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallGraphNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_name: Option<String>,
    #[serde(default)]
    pub locations: Vec<CallLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<Library>,
    #[serde(default)]
    pub children: Vec<CallGraphNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_vulnerability_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_ai_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_ai_vulnerability_score: Option<f64>,

    // Model-evaluation runs, keyed by judge model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_ai_reports: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_ai_vulnerability_scores: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_ai_metric_scores: Option<BTreeMap<String, BTreeMap<String, f64>>>,
}

impl CallGraphNode {
    /// Function name, normalized to [`UNKNOWN_FUNCTION`] when missing or empty.
    pub fn name(&self) -> &str {
        match self.func_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => UNKNOWN_FUNCTION,
        }
    }

    /// Composite key used to merge repeated occurrences of a function.
    pub fn key(&self) -> NodeKey {
        NodeKey::of(self)
    }

    /// CVEs of the node's own library (empty when there is no library).
    pub fn cves(&self) -> &[Cve] {
        self.library.as_ref().map(|l| l.cves.as_slice()).unwrap_or(&[])
    }

    pub fn has_own_cves(&self) -> bool {
        !self.cves().is_empty()
    }

    /// Own CVEs that the AI assessment did not dismiss (no score, or score >= 2).
    pub fn is_flagged(&self) -> bool {
        self.has_own_cves()
            && self
                .ai_vulnerability_score
                .map_or(true, |score| score >= super::classifier::LOW_RISK_CEILING)
    }

    /// Follow a path of child indices from this node.
    pub fn resolve(&self, path: &NodePath) -> Option<&CallGraphNode> {
        path.0
            .iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }
}

/// Composite identity of a function occurrence: name plus sorted call sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    name: String,
    signature: String,
}

impl NodeKey {
    pub fn of(node: &CallGraphNode) -> Self {
        let mut sites: Vec<String> = node.locations.iter().map(CallLocation::signature).collect();
        sites.sort();
        Self {
            name: node.name().to_string(),
            signature: sites.join("|"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.signature)
    }
}

/// Position of a node in the document: child indices from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

/// Project document returned by `/analyze` and `/llm_generate_report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfos {
    #[serde(default = "unknown_field")]
    pub name: String,
    #[serde(default = "unknown_field")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpp_standard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmake_version: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Library>,
    pub call_graph: CallGraphNode,
}

impl ProjectInfos {
    /// Total number of CVEs across the declared dependencies.
    pub fn cve_count(&self) -> usize {
        self.dependencies.iter().map(|d| d.cves.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(file: &str, line: u32, column: Option<u32>) -> CallLocation {
        CallLocation { file: file.to_string(), line, column }
    }

    #[test]
    fn test_key_ignores_location_order() {
        let a = CallGraphNode {
            func_name: Some("parse".to_string()),
            locations: vec![loc("b.cpp", 3, Some(1)), loc("a.cpp", 10, None)],
            ..Default::default()
        };
        let b = CallGraphNode {
            func_name: Some("parse".to_string()),
            locations: vec![loc("a.cpp", 10, None), loc("b.cpp", 3, Some(1))],
            ..Default::default()
        };
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().to_string(), "parse@a.cpp:10:|b.cpp:3:1");
    }

    #[test]
    fn test_missing_name_uses_placeholder() {
        let node = CallGraphNode::default();
        assert_eq!(node.name(), UNKNOWN_FUNCTION);
        assert_eq!(node.key().name(), UNKNOWN_FUNCTION);

        let empty = CallGraphNode { func_name: Some(String::new()), ..Default::default() };
        assert_eq!(empty.key(), node.key());
    }

    #[test]
    fn test_deserialize_tolerates_missing_collections() {
        let node: CallGraphNode = serde_json::from_str(r#"{"func_name": "main"}"#).unwrap();
        assert!(node.locations.is_empty());
        assert!(node.children.is_empty());
        assert!(node.library.is_none());
        assert!(!node.has_own_cves());
    }

    #[test]
    fn test_severity_parsing_and_max() {
        let lib: Library = serde_json::from_str(
            r#"{"name": "zlib", "cves": [
                {"id": "CVE-1", "severity": "LOW", "cvss": 2.0},
                {"id": "CVE-2", "severity": "CRITICAL", "cvss": 9.8},
                {"id": "CVE-3", "severity": "weird"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(lib.version, "unknown");
        assert_eq!(lib.cves[2].severity, Severity::Unknown);
        assert_eq!(lib.max_severity(), Some(Severity::Critical));
        assert_eq!(Severity::High.color(), "#f97316");
    }

    #[test]
    fn test_resolve_path() {
        let root = CallGraphNode {
            func_name: Some("main".to_string()),
            children: vec![CallGraphNode {
                func_name: Some("init".to_string()),
                children: vec![CallGraphNode {
                    func_name: Some("curl_easy_init".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let path = NodePath::root().child(0).child(0);
        assert_eq!(root.resolve(&path).map(|n| n.name()), Some("curl_easy_init"));
        assert!(root.resolve(&NodePath(vec![3])).is_none());
        assert_eq!(root.resolve(&NodePath::root()).map(|n| n.name()), Some("main"));
    }
}
