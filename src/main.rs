// Command-line entry point for vulngraph.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vulngraph::api::server;
use vulngraph::application::{AnalysisSession, AnalyzeUsecase};
use vulngraph::common::config::{ExportFormat, Settings, DEFAULT_CONFIG_FILE};
use vulngraph::common::logging::init_tracing;
use vulngraph::domain::graph::CallGraphView;
use vulngraph::infrastructure::{exporter_for, DocumentBackend};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the graph of an analyzed project
    Build {
        /// Backend response file, or a project directory holding analysis.json
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (defaults to the configured one)
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,
    },
    /// List graph nodes, or show the details of one node
    Inspect {
        /// Backend response file, or a project directory holding analysis.json
        #[arg(short, long)]
        input: PathBuf,

        /// Node id (e.g. node-3)
        #[arg(short, long)]
        node: Option<String>,
    },
    /// Refresh a project with an AI report and write the new graph
    Report {
        /// Project directory holding the captured responses
        #[arg(short, long)]
        project: PathBuf,

        /// Node id to target; global report when omitted
        #[arg(short, long)]
        node: Option<String>,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,
    },
    /// Serve line-delimited JSON commands over TCP
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load_or_default(&cli.config)?;
    init_tracing(&settings.logging.filter);

    match cli.command {
        Command::Build { input, output, format } => {
            let exporter = exporter_for(format.unwrap_or(settings.export.format));
            let graph = if input.is_dir() {
                let backend = DocumentBackend::new();
                let usecase = AnalyzeUsecase {
                    backend: &backend,
                    exporter: exporter.as_ref(),
                };
                usecase.run(&input, &output)?
            } else {
                let project = DocumentBackend::load_document(&input)?;
                let graph = CallGraphView::build(&project.call_graph);
                exporter.export(&graph, &project.call_graph, &output)?;
                graph
            };
            println!(
                "Graph written to {} ({} nodes, {} edges)",
                output.display(),
                graph.nodes().len(),
                graph.edges().len()
            );
        }
        Command::Inspect { input, node } => {
            let backend = DocumentBackend::new();
            let mut session = AnalysisSession::new(&backend);
            load_into(&mut session, &input)?;

            match node {
                Some(id) => {
                    let details = session.select(&id)?;
                    println!("{}", serde_json::to_string_pretty(&details)?);
                }
                None => {
                    let graph = session.graph().context("no graph was built")?;
                    for n in graph.nodes() {
                        println!("{:<10} {:<3} {:<40} {}", n.id, n.level, n.label, n.status.label());
                    }
                }
            }
        }
        Command::Report { project, node, output, format } => {
            let backend = DocumentBackend::new();
            let mut session = AnalysisSession::new(&backend);
            session.analyze(&project)?;
            session.generate_report(node.as_deref())?;

            let exporter = exporter_for(format.unwrap_or(settings.export.format));
            let doc = session.project().context("no project loaded")?;
            let graph = session.graph().context("no graph was built")?;
            exporter.export(graph, &doc.call_graph, &output)?;
            if let Some(score) = doc.call_graph.project_ai_vulnerability_score {
                println!("Project AI vulnerability score: {:.1}", score);
            }
            println!("Report graph written to {}", output.display());
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            server::start_server(&settings.server.address())?;
        }
    }

    Ok(())
}

fn load_into(session: &mut AnalysisSession<'_>, input: &Path) -> Result<()> {
    if input.is_dir() {
        session.analyze(input)?;
    } else {
        let project = DocumentBackend::load_document(input)?;
        let project_dir = input.parent().map(Path::to_path_buf).unwrap_or_default();
        session.load(project_dir, project);
    }
    Ok(())
}
