use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use ragchat_cli::{Cli, Command, Settings, console};
use ragchat_rag::ChatSession;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env_file = ragchat_cli::load_env_file(cli.env_file.as_deref())?;

    ragchat_telemetry::init_with_level("ragchat", cli.log_level(), cli.log_json)?;
    if let Some(path) = env_file {
        info!(path = %path.display(), "loaded environment file");
    }

    let mut settings = Settings::load_or_default(cli.config.as_deref())?;
    settings.apply(cli.corpus().overrides());

    let documents = ragchat_cli::load_documents(&cli.corpus().files).await?;
    let (pipeline, stored) = ragchat_cli::build_index(&settings, &documents).await?;

    match &cli.command {
        Command::Ingest(args) => {
            print!("{}", ragchat_cli::ingest_report(&documents, &stored, args.show_passages));
        }
        Command::Chat(args) => {
            let generator = ragchat_cli::build_generator(&settings)?;
            info!(model = generator.model(), "generation model selected");
            let mut session = ChatSession::new(pipeline, generator);
            info!(session = %session.id(), "chat started");

            if args.plain || !std::io::stdin().is_terminal() {
                console::run_plain(&mut session).await?;
            } else {
                console::run_interactive(&mut session).await?;
            }
        }
    }

    Ok(())
}
