// Use cases driving the backend, the graph builder and the exporters.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::api::dto::GraphDto;
use crate::common::error::BackendError;
use crate::domain::callgraph::ProjectInfos;
use crate::domain::classifier::VulnerabilityClassifier;
use crate::domain::details::NodeDetails;
use crate::domain::graph::CallGraphView;
use crate::ports::{AnalyzerBackend, OutputExporter};

/// One-shot: analyze a project and write its graph.
pub struct AnalyzeUsecase<'a> {
    pub backend: &'a dyn AnalyzerBackend,
    pub exporter: &'a dyn OutputExporter,
}

impl<'a> AnalyzeUsecase<'a> {
    pub fn run(&self, project_dir: &Path, export_path: &Path) -> Result<CallGraphView> {
        let project = self
            .backend
            .analyze(project_dir)
            .with_context(|| format!("analysis of {} failed", project_dir.display()))?;
        let graph = CallGraphView::build(&project.call_graph);
        self.exporter
            .export(&graph, &project.call_graph, export_path)
            .with_context(|| format!("failed to write {}", export_path.display()))?;
        Ok(graph)
    }
}

struct Loaded {
    project_dir: PathBuf,
    project: ProjectInfos,
    graph: CallGraphView,
}

/// Owns the current document and its graph.
///
/// Every successful backend response replaces both wholesale. A failed
/// request leaves whatever was displayed before untouched.
pub struct AnalysisSession<'a> {
    backend: &'a dyn AnalyzerBackend,
    loaded: Option<Loaded>,
}

impl<'a> AnalysisSession<'a> {
    pub fn new(backend: &'a dyn AnalyzerBackend) -> Self {
        Self { backend, loaded: None }
    }

    pub fn project(&self) -> Option<&ProjectInfos> {
        self.loaded.as_ref().map(|l| &l.project)
    }

    pub fn graph(&self) -> Option<&CallGraphView> {
        self.loaded.as_ref().map(|l| &l.graph)
    }

    /// Renderer DTO of the current graph.
    pub fn graph_dto(&self) -> Option<GraphDto> {
        self.loaded
            .as_ref()
            .map(|l| GraphDto::from_view(&l.graph, &l.project.call_graph))
    }

    /// Run `/analyze` on a project directory and rebuild the graph.
    pub fn analyze(&mut self, project_dir: &Path) -> Result<&CallGraphView> {
        tracing::info!(project_dir = %project_dir.display(), "analyzing project");
        let project = match self.backend.analyze(project_dir) {
            Ok(project) => project,
            Err(err) => {
                tracing::error!(error = %err, "analysis request failed, keeping previous graph");
                return Err(err).context("Error analyzing project");
            }
        };
        Ok(self.install(project_dir.to_path_buf(), project))
    }

    /// Install a document obtained elsewhere (e.g. sent over the API).
    pub fn load(&mut self, project_dir: PathBuf, project: ProjectInfos) -> &CallGraphView {
        self.install(project_dir, project)
    }

    /// Run `/llm_generate_report`, globally or for one selected node, and
    /// rebuild from the refreshed document.
    pub fn generate_report(&mut self, target_id: Option<&str>) -> Result<&CallGraphView> {
        let loaded = self.loaded.as_ref().ok_or(BackendError::NoProject)?;
        let target = match target_id {
            Some(id) => Some(
                loaded
                    .graph
                    .resolve(&loaded.project.call_graph, id)
                    .ok_or_else(|| BackendError::UnknownNode(id.to_string()))?,
            ),
            None => None,
        };

        tracing::info!(node = target.map(|n| n.name()), "requesting AI report");
        let refreshed = match self.backend.generate_report(&loaded.project_dir, &loaded.project, target) {
            Ok(project) => project,
            Err(err) => {
                tracing::error!(error = %err, "report request failed, keeping previous graph");
                return Err(err).context("Error generating AI report");
            }
        };
        let project_dir = loaded.project_dir.clone();
        Ok(self.install(project_dir, refreshed))
    }

    /// Resolve a "node selected" event to the details panel content.
    pub fn select(&self, id: &str) -> Result<NodeDetails, BackendError> {
        let loaded = self.loaded.as_ref().ok_or(BackendError::NoProject)?;
        let node = loaded
            .graph
            .resolve(&loaded.project.call_graph, id)
            .ok_or_else(|| BackendError::UnknownNode(id.to_string()))?;
        Ok(NodeDetails::describe(node, &mut VulnerabilityClassifier::new()))
    }

    fn install(&mut self, project_dir: PathBuf, project: ProjectInfos) -> &CallGraphView {
        let graph = CallGraphView::build(&project.call_graph);
        tracing::info!(
            project = %project.name,
            nodes = graph.nodes().len(),
            edges = graph.edges().len(),
            "graph rebuilt"
        );
        let loaded = self.loaded.insert(Loaded {
            project_dir,
            project,
            graph,
        });
        &loaded.graph
    }
}
