/// Document Backend
///
/// Replays analyzer responses captured on disk instead of calling the
/// remote service. Layout of the responses directory:
/// - `analysis.json` - body returned by `/analyze`
/// - `report.json` - body returned by a global `/llm_generate_report`
/// - `report-<func_name>.json` - body returned by a targeted report

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::common::error::BackendError;
use crate::domain::callgraph::{CallGraphNode, ProjectInfos};
use crate::ports::AnalyzerBackend;

pub const ANALYSIS_FILE: &str = "analysis.json";
pub const REPORT_FILE: &str = "report.json";

/// Parse JSON without serde_json's nesting limit.
///
/// Every call-tree level costs two levels of JSON nesting, so deep call
/// chains would otherwise be rejected. Recursion grows the heap-backed
/// stack from `serde_stacker` instead of the thread stack.
pub fn decode_json<T: DeserializeOwned>(content: &str) -> serde_json::Result<T> {
    let mut de = serde_json::Deserializer::from_str(content);
    de.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

/// Convert an already parsed value, with the same stack growth as [`decode_json`].
pub fn decode_value<T: DeserializeOwned>(value: serde_json::Value) -> serde_json::Result<T> {
    T::deserialize(serde_stacker::Deserializer::new(value))
}

#[derive(Debug, Clone, Default)]
pub struct DocumentBackend {
    responses: Option<PathBuf>,
}

impl DocumentBackend {
    /// Look for responses inside the analyzed project directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for responses in a fixed directory.
    pub fn with_responses_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            responses: Some(dir.into()),
        }
    }

    /// Read one backend response body.
    ///
    /// The service answers failures with `{"error": "..."}`, which is mapped
    /// to [`BackendError::Remote`].
    pub fn load_document(path: &Path) -> Result<ProjectInfos, BackendError> {
        let content = fs::read_to_string(path).map_err(|source| BackendError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_document(&content).map_err(|err| match err {
            BackendError::Decode { source, .. } => BackendError::Decode {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse a response body that did not come from a file.
    pub fn parse_document(content: &str) -> Result<ProjectInfos, BackendError> {
        let decode = |source: serde_json::Error| BackendError::Decode {
            path: PathBuf::from("<inline>"),
            source,
        };
        let value: serde_json::Value = decode_json(content).map_err(decode)?;
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return Err(BackendError::Remote(message.to_string()));
        }
        decode_value(value).map_err(decode)
    }

    fn responses_dir(&self, project_dir: &Path) -> PathBuf {
        self.responses
            .clone()
            .unwrap_or_else(|| project_dir.to_path_buf())
    }

    fn report_file(target: Option<&CallGraphNode>) -> String {
        match target {
            Some(node) => {
                // Function names end up in a file name: keep them to one path component.
                let name: String = node
                    .name()
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
                    .collect();
                format!("report-{}.json", name)
            }
            None => REPORT_FILE.to_string(),
        }
    }
}

impl AnalyzerBackend for DocumentBackend {
    fn analyze(&self, project_dir: &Path) -> Result<ProjectInfos, BackendError> {
        let path = self.responses_dir(project_dir).join(ANALYSIS_FILE);
        tracing::debug!(path = %path.display(), "replaying analysis response");
        Self::load_document(&path)
    }

    fn generate_report(
        &self,
        project_dir: &Path,
        current: &ProjectInfos,
        target: Option<&CallGraphNode>,
    ) -> Result<ProjectInfos, BackendError> {
        let path = self.responses_dir(project_dir).join(Self::report_file(target));
        tracing::debug!(
            path = %path.display(),
            project = %current.name,
            node = target.map(|n| n.name()),
            "replaying report response"
        );
        Self::load_document(&path)
    }
}
