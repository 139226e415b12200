use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::sync::Arc;

mod app;
mod cli;

use cli::{Cli, Commands};
use vocab_review::database::db;
use vocab_review::export::{export_cards_to_path, import_vocabulary};
use vocab_review::{CardStore, OffsetClock, ReviewConfig, SessionController, SqliteCardStore};

fn setup_logging(cli: &Cli, config: &ReviewConfig) {
    let default_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level.clone().unwrap_or_else(|| "warn".to_string())
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Opens the database with a clock shifted by the stored simulated day offset
fn open_store(config: &ReviewConfig) -> Result<(Arc<SqliteCardStore>, Arc<OffsetClock>)> {
    if let Some(parent) = config.database_path.parent() {
        fs::create_dir_all(parent).context("Failed to create data directory")?;
    }

    let conn = db::open_connection(&config.database_path)
        .wrap_err_with(|| format!("Failed to open {}", config.database_path.display()))?;
    let offset = db::get_day_offset(&conn)?;
    let clock = Arc::new(OffsetClock::new(offset));
    let store = Arc::new(SqliteCardStore::from_connection(conn, clock.clone()));
    Ok((store, clock))
}

async fn run_application(cli: &Cli, config: &ReviewConfig) -> Result<()> {
    let (store, clock) = open_store(config)?;

    match &cli.command {
        Commands::Add { term, definition } => {
            let id = store.add_vocabulary(term, definition).await?;
            info!("Added '{}' as {}", term, id);
            println!("{} {} = {}", "Added:".green(), term, definition);
        }
        Commands::Import { file } => {
            let list = import_vocabulary(file)
                .wrap_err_with(|| format!("Failed to import {}", file.display()))?;
            let inserted = store.import_list(&list).await?;
            println!(
                "{} {} new words from '{}' ({} in file)",
                "Imported:".green(),
                inserted,
                list.name,
                list.items.len()
            );
        }
        Commands::Review { limit } => {
            let controller = SessionController::from_config(store.clone(), clock, config);
            let limit = limit.unwrap_or(config.session.default_limit);
            app::run_review(&controller, store, limit).await?;
        }
        Commands::Stats => {
            let controller = SessionController::from_config(store.clone(), clock, config);
            let stats = controller.stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Export { file } => {
            let cards = store.snapshot().await?;
            export_cards_to_path(&cards, file)
                .wrap_err_with(|| format!("Failed to export to {}", file.display()))?;
            println!("{} {} cards to {}", "Exported:".green(), cards.len(), file.display());
        }
        Commands::AdvanceDay { days } => {
            let offset = store.advance_days(*days).await?;
            println!("{} simulated date is now today + {} days", "Advanced:".cyan(), offset);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ReviewConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(&cli, &config);
    info!("Using database at {}", config.database_path.display());

    run_application(&cli, &config).await.context("Application failed")?;
    Ok(())
}
