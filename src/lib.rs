use serde::Serialize;
use tracing::{info, warn};

pub mod catalog;
pub mod fetch;
pub mod university;

mod data;
mod error;
mod utils;

pub use catalog::{CanonicalCourse, Catalog, Page};
pub use data::Table;
pub use error::ScrapeError;
pub use fetch::{Fetch, FetchConfig, Fetcher, PageRequest};
pub use university::University;

/// Institution-shaped extraction output, before promotion to [`CanonicalCourse`].
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Optional knobs for link generation. Each adapter reads only what it understands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkParams {
    pub term: Option<String>,
    pub query: Option<String>,
    pub terms: Vec<String>,
    pub pages: Option<usize>,
}

/// What to do when an extractor rejects a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ParsePolicy {
    /// Stop the whole run; nothing is written.
    #[default]
    Abort,
    /// Drop the offending page and carry on with the next link.
    SkipPage,
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn university(&self) -> University;

    fn links(&self, params: &LinkParams) -> Vec<String>;

    fn request(&self, url: &str) -> PageRequest {
        PageRequest::get(url)
    }

    fn parse(&self, html: &str) -> Result<Vec<RawRecord>, ScrapeError>;

    async fn fetch(&self, fetcher: &dyn Fetch, url: &str) -> String {
        fetcher.fetch(self.request(url)).await
    }
}

pub(crate) fn to_records<T: Serialize>(
    university: University,
    items: Vec<T>,
) -> Result<Vec<RawRecord>, ScrapeError> {
    items
        .into_iter()
        .map(|item| match serde_json::to_value(item)? {
            serde_json::Value::Object(record) => Ok(record),
            other => Err(ScrapeError::Structure {
                university: university.token(),
                detail: format!("extracted value is not a record: {}", other),
            }),
        })
        .collect()
}

/// Fetches and parses every link of `adapter` in order, one at a time.
///
/// Empty pages (failed fetches) are skipped. Records from overlapping pages are kept as
/// duplicates.
#[tracing::instrument(skip_all, fields(university = %adapter.university()))]
pub async fn retrieve(
    adapter: &dyn SourceAdapter,
    fetcher: &dyn Fetch,
    params: &LinkParams,
    policy: ParsePolicy,
) -> Result<Vec<RawRecord>, ScrapeError> {
    let links = adapter.links(params);
    info!("Processing {} links", links.len());

    let mut records = vec![];
    for link in links {
        let html = adapter.fetch(fetcher, &link).await;
        if html.is_empty() {
            continue;
        }

        match adapter.parse(&html) {
            Ok(parsed) => {
                info!("[{}] {} records from {}", adapter.university(), parsed.len(), link);
                records.extend(parsed);
            }
            Err(e) if policy == ParsePolicy::SkipPage => {
                warn!("Skipping {}: {}", link, e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(records)
}

/// Writes `records` to `path` as pretty-printed JSON.
pub async fn dump_records(
    path: &std::path::Path,
    records: &[RawRecord],
) -> Result<(), ScrapeError> {
    tokio::fs::write(path, serde_json::to_string_pretty(records)?).await?;
    Ok(())
}
