use anyhow::Result;
use clap::Parser;
use server::build_app_with_token;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

/// Serve keyword search over an index written by `indexer build`.
#[derive(Parser)]
#[command(name = "server", version)]
struct Args {
    /// Index directory holding lexicon.txt and meta.json
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Token required by POST /index/reload; reload is disabled without one
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    if args.admin_token.is_none() {
        tracing::warn!("no admin token configured, /index/reload will reject every request");
    }
    let app = build_app_with_token(args.index.to_string_lossy().into_owned(), args.admin_token)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index.display(), "serving search");
    axum::serve(listener, app).await?;
    Ok(())
}
