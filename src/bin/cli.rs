//! News ingestion CLI
//!
//! Runs feed polling, content scraping and reporting against a local
//! article store.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use news_ingest::{
    error::Result,
    models::Config,
    pipeline::{self, AnalysisKind, AnalysisRequest},
    services::NlpClient,
    storage::{ArticleRepository, LocalRepository},
};

/// News feed ingestion and article scraping
#[derive(Parser, Debug)]
#[command(
    name = "news-ingest",
    version,
    about = "Czech news feed ingestion and article content scraper"
)]
struct Cli {
    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the article store
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll RSS/Atom feeds and store new articles
    Feeds {
        /// Poll only this source
        #[arg(long)]
        source: Option<String>,
    },

    /// Scrape body text for articles without content
    Content {
        /// Process at most this many articles (capped at one batch)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print scraping statistics as JSON
    Stats,

    /// Validate configuration
    Validate,

    /// Check that the NLP service is reachable
    NlpHealth,

    /// Send the newest stored articles to the NLP service and print the result
    Analyze {
        /// Analysis to run
        #[arg(value_enum)]
        kind: AnalysisKind,

        /// Number of newest articles to send
        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// Only analyze articles from this source
        #[arg(long)]
        source: Option<String>,

        /// Query for semantic search
        #[arg(long)]
        query: Option<String>,

        /// Number of topics to extract
        #[arg(long)]
        num_topics: Option<usize>,
    },
}

/// Initialize logging from the verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));
    let loaded = Config::load(&config_path);
    let level = loaded
        .as_ref()
        .map(|config| config.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let config = match loaded {
        Ok(config) => {
            log::info!("Loaded configuration from {}", config_path.display());
            config
        }
        Err(e) => {
            log::warn!(
                "Config load failed from {}: {}. Using defaults.",
                config_path.display(),
                e
            );
            Config::default()
        }
    };

    let repository: Arc<dyn ArticleRepository> =
        Arc::new(LocalRepository::new(&cli.storage_dir));

    match cli.command {
        Command::Feeds { source } => {
            config.validate()?;
            let reports =
                pipeline::run_ingest(&config, Arc::clone(&repository), source.as_deref()).await?;
            let failed = reports.iter().filter(|r| !r.is_ok()).count();
            log::info!(
                "Polled {} feeds ({} failed)",
                reports.len(),
                failed
            );
        }

        Command::Content { limit } => {
            config.validate()?;
            let summary = pipeline::run_content(&config, Arc::clone(&repository), limit).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Stats => {
            let stats = pipeline::run_stats(&config, Arc::clone(&repository)).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} feeds: {})",
                config.feeds.len(),
                config.source_names().join(", ")
            );
            log::info!("✓ {} site rules", config.sites.len());
        }

        Command::NlpHealth => {
            let client = NlpClient::new(&config.nlp)?;
            let health = client.health().await?;
            log::info!(
                "NLP service {} at {}: {}",
                health.service,
                config.nlp.base_url,
                health.status
            );
        }

        Command::Analyze {
            kind,
            limit,
            source,
            query,
            num_topics,
        } => {
            let request = AnalysisRequest {
                kind,
                limit,
                source,
                query,
                num_topics,
            };
            let result =
                pipeline::run_analysis(&config, Arc::clone(&repository), &request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    log::info!("Done!");

    Ok(())
}
