use clap::Parser;
use course_catalog_scraper::{Catalog, ScrapeError};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

/// Print per-university course counts, or one page of a university's courses.
#[derive(Debug, Parser)]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "COURSES_DB", default_value = "courses.db")]
    database: String,

    /// Show courses of this university instead of the counts
    #[arg(long)]
    university: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = 20)]
    size: u32,
}

async fn summary(cli: Cli) -> Result<(), ScrapeError> {
    let catalog = Catalog::open(&cli.database).await?;

    match cli.university {
        Some(university) => {
            let page = catalog.page(Some(&university), cli.page, cli.size).await?;
            for course in &page.items {
                println!("{}", course);
            }
            println!("Page {}/{} ({} courses)", page.page, page.pages, page.total);
        }
        None => {
            for university in catalog.universities().await? {
                let count = catalog.count_university(&university).await?;
                println!("{:<10} {}", university, count);
            }
            println!("{:<10} {}", "total", catalog.count().await?);
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL")
                .unwrap_or_else(|_| "warn,sqlx=warn".into()),
        )
        .with(ErrorLayer::default())
        .init();

    summary(Cli::parse()).await?;
    Ok(())
}
