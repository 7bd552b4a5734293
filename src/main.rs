use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use resume_matcher::{
    config::Config,
    courses, db,
    embeddings::create_provider,
    llm::create_completion,
    models::{AppState, Category},
    pipeline::{IngestRequest, MatchingPipeline},
    routes::create_router,
    storage::create_blob_store,
    utils::init_logger,
};

#[derive(Parser, Debug)]
#[command(
    name = "resume-matcher",
    about = "Match résumés, job postings and courses by text embeddings"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Embed and upsert a JSON course catalog
    IngestCourses {
        /// Path to a JSON array of courses
        #[arg(default_value = "seeds/courses.json")]
        path: PathBuf,
    },
    /// Ingest a single file (PDF, DOCX or plain text)
    Ingest {
        path: PathBuf,
        #[arg(long, default_value = "resume")]
        category: Category,
        /// Override the MIME type guessed from the file extension
        #[arg(long)]
        mime_type: Option<String>,
        #[arg(long)]
        id: Option<String>,
    },
    /// Rank stored records of one category against a text query
    Search {
        text: String,
        #[arg(long, default_value = "course")]
        category: Category,
        #[arg(long, default_value_t = 5)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;
    let _log_guard = init_logger(&config.logging);
    info!("Configuration loaded: {:?}", config.server);

    let provider = create_provider(&config.embedding).context("configuring embedding provider")?;
    let store = db::create_store(&config.database).await?;
    let pipeline = MatchingPipeline::new(
        provider,
        store,
        config.extraction.clone(),
        config.search.clone(),
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pipeline).await,
        Command::IngestCourses { path } => {
            let catalog = courses::load_courses(&path)?;
            info!(count = catalog.len(), path = %path.display(), "Ingesting course catalog");
            let summary = courses::ingest_courses(&pipeline, catalog).await;
            println!(
                "Ingested {} course{}, {} failed.",
                summary.ingested,
                if summary.ingested == 1 { "" } else { "s" },
                summary.failed
            );
            Ok(())
        }
        Command::Ingest {
            path,
            category,
            mime_type,
            id,
        } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let mime_type = mime_type.unwrap_or_else(|| {
                mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });

            let mut request = if mime_type.starts_with("text/") {
                IngestRequest::text(category, String::from_utf8_lossy(&bytes).into_owned())
            } else {
                IngestRequest::document(category, bytes, mime_type)
            };
            request = request.with_source(path.display().to_string());
            if let Some(name) = path.file_name() {
                request = request.with_title(name.to_string_lossy());
            }
            if let Some(id) = id {
                request = request.with_id(id);
            }

            let report = pipeline.ingest(request).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Search {
            text,
            category,
            limit,
        } => {
            let report = pipeline.query_text(&text, category, limit).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(config: Config, pipeline: MatchingPipeline) -> anyhow::Result<()> {
    let blobs = create_blob_store(&config.storage)?;
    let completion = create_completion(&config.llm)?;

    // Create shared state
    let state = AppState {
        config: config.clone(),
        pipeline,
        blobs,
        completion,
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.host, config.server.port))?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
