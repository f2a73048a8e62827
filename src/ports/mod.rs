use std::path::Path;

use crate::common::error::BackendError;
use crate::domain::callgraph::{CallGraphNode, ProjectInfos};
use crate::domain::graph::CallGraphView;

pub mod dot_exporter;

/// The external C/C++ analysis service.
pub trait AnalyzerBackend {
    /// `POST /analyze`: analyze an uploaded project tree.
    fn analyze(&self, project_dir: &Path) -> Result<ProjectInfos, BackendError>;

    /// `POST /llm_generate_report`: global report when `target` is `None`,
    /// otherwise a report targeted at one node.
    fn generate_report(
        &self,
        project_dir: &Path,
        current: &ProjectInfos,
        target: Option<&CallGraphNode>,
    ) -> Result<ProjectInfos, BackendError>;
}

pub trait OutputExporter {
    fn render(&self, graph: &CallGraphView, root: &CallGraphNode) -> anyhow::Result<String>;

    fn export(&self, graph: &CallGraphView, root: &CallGraphNode, path: &Path) -> anyhow::Result<()> {
        let content = self.render(graph, root)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
