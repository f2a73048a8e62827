//! Vulnerability Classification
//!
//! Decides whether a function (or anything it calls) carries a vulnerability
//! worth flagging, and how it should be colored and labeled.

use crate::domain::callgraph::{CallGraphNode, NodeKey};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// AI scores at or above this value mark a high-risk finding.
pub const HIGH_RISK_FLOOR: f64 = 7.0;
/// AI scores below this value dismiss the node's own CVEs as low risk.
pub const LOW_RISK_CEILING: f64 = 2.0;

/// Classification outcome, one per row of the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerabilityStatus {
    /// Own CVEs, not yet assessed by the AI (amber)
    PotentiallyVulnerable,
    /// Own CVEs, AI score >= 7 (red)
    HighRisk,
    /// Own CVEs, 2 <= AI score < 7 (yellow)
    MediumRisk,
    /// Own CVEs, AI score < 2 (green)
    LowRisk,
    /// No own CVEs but a callee is flagged (light orange)
    VulnerableByDescendant,
    /// Nothing flagged in the subtree (green)
    Safe,
}

impl VulnerabilityStatus {
    pub fn color(&self) -> &'static str {
        match self {
            VulnerabilityStatus::PotentiallyVulnerable => "#d97706",
            VulnerabilityStatus::HighRisk => "#dc2626",
            VulnerabilityStatus::MediumRisk => "#eab308",
            VulnerabilityStatus::LowRisk => "#22c55e",
            VulnerabilityStatus::VulnerableByDescendant => "#fecc76",
            VulnerabilityStatus::Safe => "#16a34a",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VulnerabilityStatus::PotentiallyVulnerable => "Potentially Vulnerable",
            VulnerabilityStatus::HighRisk => "Potentially Vulnerable (High Risk)",
            VulnerabilityStatus::MediumRisk => "Potentially Vulnerable (Medium Risk)",
            VulnerabilityStatus::LowRisk => "Potentially Vulnerable (Low Risk)",
            VulnerabilityStatus::VulnerableByDescendant => "Potentially Vulnerable by Descendant",
            VulnerabilityStatus::Safe => "Safe",
        }
    }

    /// Bucket an AI score for a node that has its own CVEs.
    fn from_score(score: Option<f64>) -> Self {
        match score {
            None => VulnerabilityStatus::PotentiallyVulnerable,
            Some(s) if s >= HIGH_RISK_FLOOR => VulnerabilityStatus::HighRisk,
            Some(s) if s >= LOW_RISK_CEILING => VulnerabilityStatus::MediumRisk,
            Some(_) => VulnerabilityStatus::LowRisk,
        }
    }
}

/// Color and label shown for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: VulnerabilityStatus,
    pub color: &'static str,
    pub label: &'static str,
}

impl From<VulnerabilityStatus> for Classification {
    fn from(status: VulnerabilityStatus) -> Self {
        Self {
            status,
            color: status.color(),
            label: status.label(),
        }
    }
}

/// Classifier with a memo table scoped to one traversal.
///
/// Results are memoized by composite key, so create a fresh classifier for
/// every new document.
#[derive(Debug, Default)]
pub struct VulnerabilityClassifier {
    memo: HashMap<NodeKey, bool>,
}

struct Frame<'n> {
    node: &'n CallGraphNode,
    key: NodeKey,
    next_child: usize,
    found: bool,
}

impl<'n> Frame<'n> {
    fn enter(node: &'n CallGraphNode, key: NodeKey) -> Self {
        Self {
            node,
            key,
            next_child: 0,
            found: node.is_flagged(),
        }
    }
}

impl VulnerabilityClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the node or any descendant has CVEs not dismissed by the AI score.
    ///
    /// A key that is re-entered while still being evaluated (a true cycle)
    /// counts as not vulnerable for the inner visit.
    pub fn has_vulnerabilities_recursively<'n>(&mut self, node: &'n CallGraphNode) -> bool {
        let root_key = node.key();
        if let Some(&hit) = self.memo.get(&root_key) {
            return hit;
        }

        let mut in_progress: HashSet<NodeKey> = HashSet::new();
        in_progress.insert(root_key.clone());
        let mut stack: Vec<Frame<'n>> = vec![Frame::enter(node, root_key)];
        let mut result = false;

        while let Some(top) = stack.last_mut() {
            let current: &'n CallGraphNode = top.node;
            let next = if top.found {
                None
            } else {
                current.children.get(top.next_child)
            };

            let Some(child) = next else {
                let Some(done) = stack.pop() else { break };
                in_progress.remove(&done.key);
                self.memo.insert(done.key, done.found);
                match stack.last_mut() {
                    Some(parent) => parent.found |= done.found,
                    None => result = done.found,
                }
                continue;
            };
            top.next_child += 1;

            let key = child.key();
            if let Some(&hit) = self.memo.get(&key) {
                top.found |= hit;
                continue;
            }
            if !in_progress.insert(key.clone()) {
                continue;
            }
            stack.push(Frame::enter(child, key));
        }

        result
    }

    /// Descendants (excluding `node`) whose own library has at least one CVE.
    ///
    /// Pre-order, each composite key reported once.
    pub fn collect_vulnerable_descendants<'n>(&self, node: &'n CallGraphNode) -> Vec<&'n CallGraphNode> {
        let mut found = Vec::new();
        let mut visited: HashSet<NodeKey> = HashSet::new();
        visited.insert(node.key());

        let mut stack: Vec<&CallGraphNode> = node.children.iter().rev().collect();
        while let Some(current) = stack.pop() {
            if !visited.insert(current.key()) {
                continue;
            }
            if current.has_own_cves() {
                found.push(current);
            }
            stack.extend(current.children.iter().rev());
        }

        found
    }

    /// Color and label for a node, per the decision table.
    pub fn classify(&mut self, node: &CallGraphNode) -> Classification {
        if node.has_own_cves() {
            return VulnerabilityStatus::from_score(node.ai_vulnerability_score).into();
        }
        let descendant_flagged = node
            .children
            .iter()
            .any(|child| self.has_vulnerabilities_recursively(child));
        if descendant_flagged {
            VulnerabilityStatus::VulnerableByDescendant.into()
        } else {
            VulnerabilityStatus::Safe.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::callgraph::{CallLocation, Cve, Library, Severity};

    fn cve(id: &str) -> Cve {
        Cve {
            id: id.to_string(),
            description: String::new(),
            severity: Severity::High,
            cvss: Some(7.5),
            published_date: None,
            exploit: None,
            affected_version: None,
        }
    }

    fn func(name: &str, cves: usize, score: Option<f64>, children: Vec<CallGraphNode>) -> CallGraphNode {
        let library = (cves > 0).then(|| Library {
            name: format!("lib{}", name),
            vendor: None,
            version: "1.0".to_string(),
            source: "find_package".to_string(),
            git_repo: None,
            options: Default::default(),
            checked_at: None,
            cves: (0..cves).map(|i| cve(&format!("CVE-{}-{}", name, i))).collect(),
        });
        CallGraphNode {
            func_name: Some(name.to_string()),
            locations: vec![CallLocation { file: format!("{}.cpp", name), line: 1, column: None }],
            library,
            ai_vulnerability_score: score,
            children,
            ..Default::default()
        }
    }

    #[test]
    fn test_decision_table() {
        let mut c = VulnerabilityClassifier::new();
        let cases = [
            (func("a", 1, None, vec![]), VulnerabilityStatus::PotentiallyVulnerable),
            (func("b", 1, Some(8.0), vec![]), VulnerabilityStatus::HighRisk),
            (func("c", 1, Some(7.0), vec![]), VulnerabilityStatus::HighRisk),
            (func("d", 1, Some(2.0), vec![]), VulnerabilityStatus::MediumRisk),
            (func("e", 1, Some(6.9), vec![]), VulnerabilityStatus::MediumRisk),
            (func("f", 1, Some(1.5), vec![]), VulnerabilityStatus::LowRisk),
            (func("g", 0, Some(9.0), vec![]), VulnerabilityStatus::Safe),
        ];
        for (node, expected) in cases {
            assert_eq!(c.classify(&node).status, expected, "node {}", node.name());
        }
    }

    #[test]
    fn test_high_and_low_risk_colors() {
        let mut c = VulnerabilityClassifier::new();
        let high = c.classify(&func("h", 1, Some(8.0), vec![]));
        assert_eq!(high.color, "#dc2626");
        assert_eq!(high.label, "Potentially Vulnerable (High Risk)");

        let low = c.classify(&func("l", 1, Some(1.5), vec![]));
        assert_eq!(low.color, "#22c55e");
        assert_eq!(low.label, "Potentially Vulnerable (Low Risk)");
    }

    #[test]
    fn test_vulnerable_by_descendant() {
        let root = func(
            "main",
            0,
            None,
            vec![func("a", 2, None, vec![]), func("b", 0, None, vec![])],
        );
        let mut c = VulnerabilityClassifier::new();
        let root_class = c.classify(&root);
        assert_eq!(root_class.color, "#fecc76");
        assert_eq!(root_class.label, "Potentially Vulnerable by Descendant");

        let a = c.classify(&root.children[0]);
        assert_eq!(a.color, "#d97706");
        assert_eq!(a.label, "Potentially Vulnerable");
    }

    #[test]
    fn test_low_score_descendant_is_dismissed() {
        let root = func("main", 0, None, vec![func("mid", 0, None, vec![func("leaf", 1, Some(0.5), vec![])])]);
        let mut c = VulnerabilityClassifier::new();
        assert!(!c.has_vulnerabilities_recursively(&root));
        assert_eq!(c.classify(&root).status, VulnerabilityStatus::Safe);
    }

    #[test]
    fn test_deep_descendant_propagates() {
        let root = func("main", 0, None, vec![func("mid", 0, None, vec![func("leaf", 1, Some(3.0), vec![])])]);
        let mut c = VulnerabilityClassifier::new();
        assert!(c.has_vulnerabilities_recursively(&root));
        assert_eq!(c.classify(&root).status, VulnerabilityStatus::VulnerableByDescendant);
        assert_eq!(c.classify(&root.children[0]).status, VulnerabilityStatus::VulnerableByDescendant);
    }

    #[test]
    fn test_key_cycle_terminates() {
        // "loop" calls itself at the same call sites: same composite key nested.
        let inner = func("loop", 0, None, vec![]);
        let outer = func("loop", 0, None, vec![func("loop", 0, None, vec![inner])]);
        let mut c = VulnerabilityClassifier::new();
        assert!(!c.has_vulnerabilities_recursively(&outer));
    }

    #[test]
    fn test_collect_vulnerable_descendants() {
        let shared = func("shared", 1, Some(0.1), vec![]);
        let root = func(
            "main",
            3,
            None,
            vec![
                func("a", 1, None, vec![shared.clone()]),
                func("b", 0, None, vec![shared.clone()]),
            ],
        );
        let c = VulnerabilityClassifier::new();
        let names: Vec<&str> = c.collect_vulnerable_descendants(&root).iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["a", "shared"]);
    }
}
