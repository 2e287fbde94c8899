use anyhow::Result;
use clap::Parser;
use doc_query::config::Config;
use std::path::PathBuf;
use std::sync::Arc;

/// Answer questions about the documents in a folder over HTTP
#[derive(Parser, Debug)]
#[command(name = "doc-query", version, about)]
struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory of documents read on every request
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::new(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.documents.data_dir = data_dir;
    }
    config.validate()?;

    tracing::info!(
        "doc-query {} ({}), built {}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    tracing::info!(
        "Documents: {}, embedding: {}, llm: {} at {}",
        config.documents.data_dir.display(),
        config.embedding.model,
        config.llm.model,
        config.llm.base_url
    );

    doc_query::server::serve(Arc::new(config)).await
}
