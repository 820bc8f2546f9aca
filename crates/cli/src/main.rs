use std::sync::Arc;

use clap::Parser;
use duet_cli::{Cli, Command, TerminalSession};
use duet_memory::MemoryBuffer;
use duet_pipeline::{CollaborationPipeline, DuetConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the transcript, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = DuetConfig::load(cli.config.as_deref())?;
    if let Err(e) = config.validate() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }

    let memory = Arc::new(MemoryBuffer::from_config(&config.memory));
    let pipeline = CollaborationPipeline::new(config.build_participants()?, memory);
    let session = TerminalSession::new(pipeline, config.attachments.clone());

    let mut stdout = std::io::stdout();
    match cli.command {
        Command::Ask { prompt, file } => {
            session.ask(&prompt.join(" "), file.as_deref(), &mut stdout).await?;
        }
        Command::Chat { file } => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            session.chat(stdin, &mut stdout, file).await?;
        }
    }

    Ok(())
}
