use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::thread;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use crate::application::AnalysisSession;
use crate::domain::callgraph::{CallGraphNode, ProjectInfos};
use crate::domain::classifier::VulnerabilityClassifier;
use crate::infrastructure::document_backend::{decode_json, decode_value};
use crate::infrastructure::DocumentBackend;

#[derive(Debug, Deserialize)]
struct CommandReq {
    command: String,
    params: Option<serde_json::Value>,
}

/// Serve line-delimited JSON commands on `address` until the process exits.
pub fn start_server(address: &str) -> Result<()> {
    let listener = TcpListener::bind(address)
        .with_context(|| format!("Failed to bind to {}", address))?;

    tracing::info!(%address, "API server listening");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream) {
                        tracing::warn!(error = %e, "connection error");
                    }
                });
            }
            Err(e) => tracing::warn!(error = %e, "accept error"),
        }
    }

    Ok(())
}

fn handle_connection(mut stream: TcpStream) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();

    // Each connection gets its own session: graphs are never shared.
    let backend = DocumentBackend::new();
    let mut session = AnalysisSession::new(&backend);

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match process_command(&mut session, trimmed) {
            Ok(data) => json!({
                "status": "success",
                "data": data
            }),
            Err(e) => json!({
                "status": "error",
                "message": format!("{:#}", e)
            }),
        };

        let response_str = serde_json::to_string(&response)?;
        stream.write_all(response_str.as_bytes())?;
        stream.write_all(b"\n")?;

        if let Ok(req) = decode_json::<CommandReq>(trimmed) {
            if req.command == "SHUTDOWN" {
                tracing::info!("shutdown requested");
                std::process::exit(0);
            }
        }
    }
    Ok(())
}

fn process_command(session: &mut AnalysisSession<'_>, json_str: &str) -> Result<serde_json::Value> {
    let req: CommandReq = decode_json(json_str)
        .context("Invalid JSON format")?;

    tracing::debug!(command = %req.command, "processing command");
    match req.command.as_str() {
        "PING" => Ok(json!("PONG")),
        "BUILD" => handle_build(session, req.params),
        "SELECT" => handle_select(session, req.params),
        "REPORT" => handle_report(session, req.params),
        "CLASSIFY" => handle_classify(req.params),
        "SHUTDOWN" => Ok(json!("Shutting down...")),
        _ => anyhow::bail!("Unknown command: {}", req.command),
    }
}

fn handle_build(session: &mut AnalysisSession<'_>, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
    let params = params.ok_or_else(|| anyhow::anyhow!("Missing params for BUILD"))?;

    if let Some(document) = params.get("document") {
        let project: ProjectInfos = decode_value(document.clone())
            .context("Invalid project document")?;
        let project_dir = params
            .get("path")
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .unwrap_or_default();
        session.load(project_dir, project);
    } else {
        let path_str = params.get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing 'document' or 'path' param"))?;
        let project_dir = PathBuf::from(path_str);
        if !project_dir.exists() {
            anyhow::bail!("Project path not found: {}", path_str);
        }
        session.analyze(&project_dir)?;
    }

    let dto = session
        .graph_dto()
        .ok_or_else(|| anyhow::anyhow!("No graph was built"))?;
    Ok(serde_json::to_value(dto)?)
}

fn handle_select(session: &mut AnalysisSession<'_>, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
    let id = params
        .as_ref()
        .and_then(|p| p.get("id"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing 'id' param"))?;
    let details = session.select(id)?;
    Ok(serde_json::to_value(details)?)
}

fn handle_report(session: &mut AnalysisSession<'_>, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
    let id = params
        .as_ref()
        .and_then(|p| p.get("id"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    session.generate_report(id.as_deref())?;
    let dto = session
        .graph_dto()
        .ok_or_else(|| anyhow::anyhow!("No graph was built"))?;
    Ok(serde_json::to_value(dto)?)
}

fn handle_classify(params: Option<serde_json::Value>) -> Result<serde_json::Value> {
    let node = params
        .and_then(|mut p| p.get_mut("node").map(serde_json::Value::take))
        .ok_or_else(|| anyhow::anyhow!("Missing 'node' param"))?;
    let node: CallGraphNode = decode_value(node).context("Invalid call graph node")?;
    let classification = VulnerabilityClassifier::new().classify(&node);
    Ok(serde_json::to_value(classification)?)
}
