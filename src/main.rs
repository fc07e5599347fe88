use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meeting_insights::backend::BackendClient;
use meeting_insights::config::Config;
use meeting_insights::mcp_server::MeetingInsightsServer;
use meeting_insights::search::{SearchRequest, SegmentSearchService};
use meeting_insights::store::MeetingStore;
use rmcp::{ServiceExt, transport::stdio};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{self, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "meeting-insights", version, about = "Meeting insights server and tools")]
struct Cli {
    /// JSON data file for the meeting store
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Base URL of the processing backend
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the MCP tools over stdio (default)
    Serve,
    /// Search transcript segments and print the ranked results as JSON
    Search {
        query: String,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Upload a recording to the processing backend
    Upload {
        file: PathBuf,
        /// Wait for processing to finish
        #[arg(long)]
        wait: bool,
    },
    /// Wait for a processing job to finish
    Poll { job_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;

    let mut config = Config::from_env();
    if let Some(data) = cli.data {
        config.data_file = Some(data);
    }
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Search {
            query,
            limit,
            offset,
        } => search(&config, &query, limit, offset).await,
        Command::Upload { file, wait } => upload(&config, &file, wait).await,
        Command::Poll { job_id } => poll(&config, &job_id).await,
    }
}

// stdout carries the MCP transport, so logs never go there
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .init();
            Ok(None)
        }
    }
}

async fn open_store(config: &Config) -> Result<Arc<MeetingStore>> {
    let path = config.data_file_path()?;
    tracing::info!("Using data file: {}", path.display());
    Ok(Arc::new(MeetingStore::open(&path).await?))
}

async fn serve(config: &Config) -> Result<()> {
    tracing::info!("Starting Meeting Insights MCP Server");

    let store = open_store(config).await?;
    if let Some(path) = store.path() {
        tracing::info!("Action item updates are saved to {}", path.display());
    }
    let server = MeetingInsightsServer::new(store);

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}

async fn search(config: &Config, query: &str, limit: Option<i64>, offset: Option<i64>) -> Result<()> {
    let store = open_store(config).await?;
    let service = SegmentSearchService::new(store);

    let request = SearchRequest::new(query, limit, offset)?;
    let response = service.search(&request).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn upload(config: &Config, file: &Path, wait: bool) -> Result<()> {
    let client = BackendClient::new(&config.backend_url)?;
    let upload = client.upload_file(file).await?;
    tracing::info!("Uploaded {} as job {}", file.display(), upload.job_id);

    if wait {
        let job = client.poll_job(&upload.job_id, config.poll_options()).await?;
        println!("{}", serde_json::to_string_pretty(&job)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&upload)?);
    }
    Ok(())
}

async fn poll(config: &Config, job_id: &str) -> Result<()> {
    let client = BackendClient::new(&config.backend_url)?;
    let job = client.poll_job(job_id, config.poll_options()).await?;

    if let Some(error) = &job.error {
        tracing::warn!("Job {} failed: {}", job.id, error);
    }
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}
