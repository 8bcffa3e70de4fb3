use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use scraper::{ElementRef, Node};
use sqlx::SqlitePool;

pub(crate) async fn is_table_exists(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<bool, sqlx::Error> {
    Ok(
        sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?
            .is_some(),
    )
}

pub(crate) fn get_now() -> DateTime<FixedOffset> {
    let now = chrono::offset::Local::now();
    now.with_timezone(now.offset())
}

/// Text of an element with every fragment trimmed and empty fragments dropped.
pub(crate) fn stripped_text(el: ElementRef) -> String {
    el.text().map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Same as [`stripped_text`] but fragments are joined with `sep`.
pub(crate) fn joined_text(el: ElementRef, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .join(sep)
}

/// Stripped text of an element, ignoring everything under descendants named `skip`.
pub(crate) fn stripped_text_without(el: ElementRef, skip: &str) -> String {
    let mut out = String::new();
    collect_text_without(el, skip, &mut out);
    out
}

fn collect_text_without(el: ElementRef, skip: &str, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text.trim()),
            Node::Element(e) if e.name() != skip => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text_without(child, skip, out);
                }
            }
            _ => {}
        }
    }
}

pub(crate) fn has_class(el: ElementRef, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}
