// Infrastructure implementations for vulngraph.

use crate::api::dto::GraphDto;
use crate::common::config::ExportFormat;
use crate::domain::callgraph::CallGraphNode;
use crate::domain::graph::CallGraphView;
use crate::ports::dot_exporter::DotExporter;
use crate::ports::OutputExporter;

pub mod document_backend;

pub use document_backend::DocumentBackend;

/// Writes the renderer DTO as pretty-printed JSON.
pub struct JsonExporter;
impl OutputExporter for JsonExporter {
    fn render(&self, graph: &CallGraphView, root: &CallGraphNode) -> anyhow::Result<String> {
        let dto = GraphDto::from_view(graph, root);
        Ok(serde_json::to_string_pretty(&dto)?)
    }
}

/// Exporter for a configured output format.
pub fn exporter_for(format: ExportFormat) -> Box<dyn OutputExporter> {
    match format {
        ExportFormat::Json => Box::new(JsonExporter),
        ExportFormat::Dot => Box::new(DotExporter),
    }
}
