mod collectors;
mod config;
mod db;
mod error;
mod models;
mod report;
mod store;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::collectors::headhunter::HeadHunter;
use crate::collectors::runner::{self, InvalidItems};
use crate::config::Config;
use crate::error::AppError;
use crate::store::memory::MemoryStore;
use crate::store::postgres::with_manager;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vacancy_etl=info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let source = HeadHunter::new(&config.api_url, &config.user_agent)?;
    let query = config.fetch_query();
    let invalid = if config.skip_invalid {
        InvalidItems::Skip
    } else {
        InvalidItems::Abort
    };
    let keyword = config.report_keyword.clone();

    let report = if config.dry_run {
        tracing::info!("Dry run: results are kept in memory");
        let mut store = MemoryStore::new();
        let report = runner::run(&source, &mut store, &query, &keyword, invalid).await?;
        let (organizations, vacancies) = store.table_counts();
        tracing::info!("In memory: {organizations} organizations, {vacancies} vacancies");
        report
    } else {
        with_manager(config.db.clone(), move |db| {
            Box::pin(async move {
                let report = runner::run(&source, &mut *db, &query, &keyword, invalid).await?;
                let (organizations, vacancies) = db.table_counts().await?;
                tracing::info!("Database holds {organizations} organizations, {vacancies} vacancies");
                Ok::<_, AppError>(report)
            })
        })
        .await?
    };

    report::print(&report, std::io::stdout().lock())?;
    Ok(())
}
