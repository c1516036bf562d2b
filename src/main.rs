//! Application entry point for zenshell-bot.
//!
//! Initializes all components and starts the Discord bot.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use dotenv::dotenv;
use log::debug;
use log::info;
use tracing_appender::non_blocking::WorkerGuard;
use zenshell_bot::bot::Bot;
use zenshell_bot::config::Config;
use zenshell_bot::logging::setup_logging;
use zenshell_bot::repository::Repository;
use zenshell_bot::service::Services;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let (config, _log_guard) = load_config().await?;
    let db = setup_database(&config, init_start).await?;
    let services = setup_services(db).await?;
    let bot = setup_bot(&config, services, init_start).await?;

    run(&bot, init_start).await
}

async fn load_config() -> Result<(Arc<Config>, WorkerGuard)> {
    debug!("Loading configuration...");
    let mut config = Config::new();
    config.load()?;
    let config = Arc::new(config);
    let guard = setup_logging(&config)?;
    info!("Starting zenshell-bot v{}...", config.version);
    Ok((config, guard))
}

async fn setup_database(config: &Config, init_start: Instant) -> Result<Arc<Repository>> {
    debug!("Setting up Repository...");
    let db = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);

    info!("Running database migrations...");
    db.run_migrations().await?;
    info!(
        "Database setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(db)
}

async fn setup_services(db: Arc<Repository>) -> Result<Arc<Services>> {
    debug!("Setting up Services...");
    Ok(Arc::new(Services::new(db).await?))
}

async fn setup_bot(
    config: &Arc<Config>,
    services: Arc<Services>,
    init_start: Instant,
) -> Result<Bot> {
    info!("Starting bot...");
    let mut bot = Bot::new(config.clone(), services).await?;
    bot.start();
    info!(
        "Bot setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );
    Ok(bot)
}

async fn run(bot: &Bot, init_start: Instant) -> Result<()> {
    info!(
        "zenshell-bot is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down.");
    bot.shutdown().await;

    Ok(())
}
