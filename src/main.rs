use chainwatch::config::AppConfig;
use chainwatch::dispatcher::{Dispatcher, TelegramTransport};
use chainwatch::engine::WatchEngine;
use chainwatch::explorer::ExplorerClient;
use chainwatch::prices::PriceOracle;
use chainwatch::registry::InMemoryRegistry;
use chainwatch::watermark::WatermarkStore;
use clap::Parser;
use log::info;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "chainwatch")]
#[command(about = "Multi-chain wallet watch and notification engine")]
struct Args {
    /// Path to TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    sample_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.sample_config {
        println!("{}", AppConfig::generate_sample_config()?);
        return Ok(());
    }

    if let Some(path) = args.config {
        std::env::set_var("CONFIG_FILE", path);
    }

    let config = AppConfig::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.level),
    )
    .init();

    info!("starting chainwatch");

    let registry = Arc::new(InMemoryRegistry::new());
    let explorer = Arc::new(ExplorerClient::from_config(&config.explorer)?);
    let oracle = PriceOracle::from_config(&config.prices)?;
    let transport = Arc::new(TelegramTransport::from_config(&config.telegram)?);
    let dispatcher = Dispatcher::new(transport, &config.poll);

    // Watermark starts at process start: history is never replayed.
    let watermarks = WatermarkStore::new(chrono::Utc::now().timestamp() as u64);

    let mut engine = WatchEngine::new(
        registry,
        explorer,
        oracle,
        dispatcher,
        watermarks,
        config.poll,
    );
    engine.run().await;

    info!("chainwatch stopped");
    Ok(())
}
