//! Duet API server binary.
//!
//! Usage:
//!   duet-api
//!   duet-api --config duet.toml --port 7860
//!   duet-api --bind 0.0.0.0 --cors-origins https://example.com
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY`, `OPENAI_API_KEY` - Backend credentials (required)
//! - `CLAUDE_MODEL`, `OPENAI_MODEL` - Model overrides
//! - `DUET_MEMORY_CAPACITY` - Turns remembered per session
//! - `DUET_BIND_ADDR`, `DUET_PORT`, `DUET_CORS_ORIGINS` - Server options
//!
//! A `.env` file in the working directory is loaded first.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use duet_api::{AppState, serve};
use duet_pipeline::DuetConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "duet-api",
    about = "Web chat where one model drafts and another reviews",
    version
)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "DUET_PORT", default_value_t = 7860)]
    port: u16,

    /// Bind address
    #[arg(short, long, env = "DUET_BIND_ADDR", default_value = "127.0.0.1")]
    bind: String,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Allowed CORS origins (comma-separated)
    #[arg(long, env = "DUET_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,duet_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = DuetConfig::load(args.config.as_deref())?;
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Cannot start without backend credentials");
        eprintln!("❌ {e}");
        std::process::exit(1);
    }

    if args.bind == "0.0.0.0" {
        tracing::warn!(
            "Server binding to 0.0.0.0 exposes the chat to every network interface. \
             Anyone who can reach it spends your API credits."
        );
    }

    let cors_origins = (!args.cors_origins.is_empty()).then_some(args.cors_origins);

    let state = AppState::from_config(&config)?;
    println!(
        "✨ Starting collaboration between {} and {}",
        state.participants.drafter.label(),
        state.participants.reviewer.label()
    );
    println!("📊 Access the web interface at http://{}:{}", args.bind, args.port);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    serve(Arc::new(state), addr, cors_origins).await?;

    Ok(())
}
