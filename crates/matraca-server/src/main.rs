mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{info, warn};

use matraca_db::InboxDb;
use matraca_gateway::EvolutionClient;
use matraca_ingest::{ConnectionStore, Importer, MediaResolver, MediaStore, WebhookRouter};

use crate::routes::AppState;

#[derive(Debug, Parser)]
#[command(author, version, about = "WhatsApp inbox bridge over the Evolution API")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "MATRACA_PORT", default_value_t = 3000)]
    port: u16,

    /// SQLite database path (defaults to the platform data dir)
    #[arg(long, env = "MATRACA_DB")]
    database: Option<String>,

    /// Directory media files are written under
    #[arg(long, env = "MATRACA_MEDIA_DIR", default_value = "media")]
    media_dir: PathBuf,

    /// Public base URL the media directory is served from
    #[arg(long, env = "MATRACA_MEDIA_URL", default_value = "http://localhost:3000/media")]
    media_url: String,

    /// Evolution API base URL
    #[arg(long, env = "EVOLUTION_URL", default_value = "http://127.0.0.1:8085")]
    evolution_url: String,

    /// Evolution API key
    #[arg(long, env = "EVOLUTION_API_KEY")]
    evolution_api_key: String,

    /// Evolution instance name
    #[arg(long, env = "EVOLUTION_INSTANCE", default_value = "matraca")]
    instance: String,

    /// Publicly reachable URL of this server's /webhook endpoint;
    /// registered with the gateway on startup when set
    #[arg(long, env = "MATRACA_WEBHOOK_URL")]
    webhook_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .from_env_lossy()
                .add_directive("matraca_server=info".parse().unwrap())
                .add_directive("matraca_ingest=info".parse().unwrap())
                .add_directive("matraca_gateway=info".parse().unwrap())
                .add_directive("matraca_db=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let db = Arc::new(match &cli.database {
        Some(path) => InboxDb::new_with_path(path).await?,
        None => InboxDb::new().await?,
    });

    let gateway = Arc::new(EvolutionClient::new(
        &cli.evolution_url,
        &cli.evolution_api_key,
        &cli.instance,
    )?);

    let store = Arc::new(ConnectionStore::new());
    let media = MediaResolver::new(MediaStore::new(&cli.media_dir, &cli.media_url), gateway.clone());
    let router = WebhookRouter::new(db.clone(), media, store.clone());
    let importer = Importer::new(db.clone(), gateway.clone());

    if let Some(url) = &cli.webhook_url {
        match gateway.register_webhook(url).await {
            Ok(()) => info!(url = %url, "Webhook registered with gateway"),
            Err(e) => warn!(url = %url, error = %e, "Webhook registration failed, continuing"),
        }
    }

    let state = Arc::new(AppState {
        db,
        gateway,
        router,
        importer,
        store,
    });

    let app = routes::app(state);
    let addr = format!("0.0.0.0:{}", cli.port);
    info!(addr = %addr, instance = %cli.instance, "matraca listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
