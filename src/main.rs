use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use std::env;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vertex_cms::{CmsConfig, Vertex, playground};

/// Serves the CMS config API over the sample content model.
#[derive(Debug, Parser)]
#[command(name = "vertex-server", version, about)]
struct Args {
    /// Address to bind (overrides VERTEX_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides VERTEX_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Clone)]
struct ServerConfig {
    host: String,
    port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let host = env::var("VERTEX_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("VERTEX_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("VERTEX_PORT must be a valid u16")?;
        Ok(Self { host, port })
    }

    fn apply(mut self, args: Args) -> Self {
        if let Some(host) = args.host {
            self.host = host;
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        self
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let server = ServerConfig::from_env()?.apply(args);
    let config = CmsConfig::from_env().context("failed to load CMS configuration")?;

    let cms = Vertex::builder()
        .config(config)
        .blocks(playground::blocks())
        .collections(playground::collections())
        .build()
        .await
        .context("failed to boot the schema registry")?;

    let app = Router::new()
        .nest("/api/vertex", cms.config_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = server.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(address = %addr, collections = cms.registry().all().len(), "vertex server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vertex_cms=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "unable to install Ctrl+C signal handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
