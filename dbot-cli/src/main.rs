//! dbot CLI: run the Telegram bot or inspect the model registry. Config from env (and `.env`).

use anyhow::Result;
use clap::Parser;
use dbot_cli::{format_registry, load_config, load_selector, Cli, Commands};
use dbot_telegram::{run_bot, ModelRegistryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = load_config(token)?;
            run_bot(config).await
        }
        Commands::Models => {
            let selector = load_selector(ModelRegistryConfig::from_env())?;
            println!("{}", format_registry(&selector));
            Ok(())
        }
    }
}
