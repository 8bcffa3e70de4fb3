use clap::Parser;
use course_catalog_scraper::{
    dump_records, retrieve, Catalog, FetchConfig, Fetcher, LinkParams, ParsePolicy, ScrapeError,
    University,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

/// Scrape one university's course catalog and replace its rows in the store.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// University to scrape
    #[arg(value_enum)]
    university: University,

    /// SQLite database file
    #[arg(long, env = "COURSES_DB", default_value = "courses.db")]
    database: String,

    /// Catalog term (mit: spring | fall)
    #[arg(long)]
    term: Option<String>,

    /// Search query (stanford)
    #[arg(long)]
    query: Option<String>,

    /// Term filters (stanford: Autumn,Winter,Spring,Summer)
    #[arg(long, value_delimiter = ',')]
    terms: Vec<String>,

    /// Number of result pages (ucb)
    #[arg(long)]
    pages: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// What to do with a page whose structure is not recognized
    #[arg(long, value_enum, default_value_t = ParsePolicy::Abort)]
    on_parse_error: ParsePolicy,

    /// Also write the retrieved records to this JSON file
    #[arg(long)]
    dump: Option<PathBuf>,
}

async fn run(cli: Cli) -> Result<usize, ScrapeError> {
    let catalog = Catalog::open(&cli.database).await?;
    let adapter = cli.university.adapter();
    let fetcher = Fetcher::new(FetchConfig {
        timeout: Duration::from_secs(cli.timeout),
    })?;
    let params = LinkParams {
        term: cli.term,
        query: cli.query,
        terms: cli.terms,
        pages: cli.pages,
    };

    info!("[{}] Starting retrieval", cli.university);
    let records = retrieve(adapter.as_ref(), &fetcher, &params, cli.on_parse_error).await?;

    if let Some(path) = cli.dump {
        dump_records(&path, &records).await?;
        info!("[{}] Saved {} records to {}", cli.university, records.len(), path.display());
    }

    catalog
        .replace_university(cli.university.token(), records)
        .await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let cli = Cli::parse();
    let university = cli.university;

    match run(cli).await {
        Ok(written) => {
            info!("[{}] Successfully saved {} courses", university, written);
            println!("{}", written);
            Ok(())
        }
        Err(e) => {
            error!("[{}] Import failed: {}", university, e);
            Err(e.into())
        }
    }
}
