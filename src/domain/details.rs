//! Details shown for a selected function.

use crate::domain::callgraph::{CallGraphNode, CallLocation, Cve, Severity};
use crate::domain::classifier::{Classification, VulnerabilityClassifier};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct LibrarySummary {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_severity: Option<Severity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeDetails {
    pub name: String,
    pub classification: Classification,
    pub locations: Vec<CallLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<LibrarySummary>,
    /// Own CVEs, highest CVSS first
    pub cves: Vec<Cve>,
    /// Names of descendants with CVEs of their own
    pub vulnerable_descendants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_vulnerability_score: Option<f64>,
    /// Reports of the evaluation models, keyed by model name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge_ai_reports: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge_ai_vulnerability_scores: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge_ai_metric_scores: Option<BTreeMap<String, BTreeMap<String, f64>>>,
}

impl NodeDetails {
    pub fn describe(node: &CallGraphNode, classifier: &mut VulnerabilityClassifier) -> Self {
        let mut cves = node.cves().to_vec();
        cves.sort_by(|a, b| {
            b.cvss
                .unwrap_or(0.0)
                .total_cmp(&a.cvss.unwrap_or(0.0))
                .then_with(|| a.id.cmp(&b.id))
        });

        let vulnerable_descendants = classifier
            .collect_vulnerable_descendants(node)
            .into_iter()
            .map(|n| n.name().to_string())
            .collect();

        Self {
            name: node.name().to_string(),
            classification: classifier.classify(node),
            locations: node.locations.clone(),
            library: node.library.as_ref().map(|lib| LibrarySummary {
                name: lib.name.clone(),
                version: lib.version.clone(),
                vendor: lib.vendor.clone(),
                max_severity: lib.max_severity(),
            }),
            cves,
            vulnerable_descendants,
            extracted_code: node.extracted_code.clone(),
            ai_report: node.ai_report.clone(),
            ai_vulnerability_score: node.ai_vulnerability_score,
            judge_ai_reports: node.judge_ai_reports.clone(),
            judge_ai_vulnerability_scores: node.judge_ai_vulnerability_scores.clone(),
            judge_ai_metric_scores: node.judge_ai_metric_scores.clone(),
        }
    }
}
