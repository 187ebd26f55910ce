use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use practice_core::Clock;
use services::AppServices;

#[derive(Debug, Parser)]
#[command(name = "practice-server", about = "Adaptive practice question API server")]
struct Args {
    /// SQLite database URL
    #[arg(
        long,
        env = "PRACTICE_DB_URL",
        default_value = "sqlite:practice.sqlite3?mode=rwc"
    )]
    db: String,

    /// Address to listen on
    #[arg(long, env = "PRACTICE_LISTEN", default_value = "127.0.0.1:5000")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let services = AppServices::new_sqlite(&args.db, Clock::default_clock())
        .await
        .context("initializing storage")?;

    let router = api::router(services);
    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;

    info!(listen = %args.listen, db = %args.db, "practice server listening");
    axum::serve(listener, router).await.context("serving")?;

    Ok(())
}
