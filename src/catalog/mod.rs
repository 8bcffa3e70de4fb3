mod data;

pub use data::{Catalog, CourseTable};

use crate::{RawRecord, ScrapeError};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Keys that may carry the course identifier, in order of preference.
pub const CODE_KEYS: [&str; 3] = ["course_code", "id", "code"];

pub const MAX_PAGE_SIZE: u32 = 100;

/// A stored course row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalCourse {
    pub id: Option<i64>,
    pub university: String,
    pub course_code: Option<String>,
    pub title: Option<String>,
    pub units: Option<String>,
    pub description: Option<String>,
    /// Every field of the raw record that was not promoted to a column.
    pub details: RawRecord,
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Moves the string value at `key` out of `record`. Nulls stay behind in the record.
fn promote(record: &mut RawRecord, key: &str) -> Result<Option<String>, ScrapeError> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(_)) => match record.remove(key) {
            Some(Value::String(s)) => Ok(Some(s)),
            _ => Ok(None),
        },
        Some(other) => Err(ScrapeError::Mapping {
            key: key.to_string(),
            found: json_type(other),
        }),
    }
}

impl CanonicalCourse {
    pub fn from_raw(
        university: &str,
        mut record: RawRecord,
    ) -> Result<CanonicalCourse, ScrapeError> {
        let course_code = match CODE_KEYS.iter().find(|k| record.contains_key(**k)) {
            Some(key) => promote(&mut record, key)?,
            None => None,
        };
        let title = promote(&mut record, "title")?;
        let units = promote(&mut record, "units")?;
        let description = promote(&mut record, "description")?;

        Ok(CanonicalCourse {
            id: None,
            university: university.to_string(),
            course_code,
            title,
            units,
            description,
            details: record,
        })
    }
}

impl fmt::Display for CanonicalCourse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let none = "None".to_string();
        writeln!(f, "University      : {}", self.university)?;
        writeln!(f, "Code            : {}", self.course_code.as_ref().unwrap_or(&none))?;
        writeln!(f, "Title           : {}", self.title.as_ref().unwrap_or(&none))?;
        writeln!(f, "Units           : {}", self.units.as_ref().unwrap_or(&none))?;
        writeln!(f, "Details         : {} fields", self.details.len())?;
        Ok(())
    }
}

/// One page of a listing, as served to readers of the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u32,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

impl<T> Page<T> {
    pub fn validate(page: u32, size: u32) -> Result<(), ScrapeError> {
        if page == 0 || size == 0 || size > MAX_PAGE_SIZE {
            return Err(ScrapeError::InvalidPage { page, size });
        }
        Ok(())
    }

    pub fn page_count(total: u32, size: u32) -> u32 {
        total / size + u32::from(total % size != 0)
    }

    /// Row offset of `page`. Any page accepted by [`Page::validate`] fits.
    pub fn offset(page: u32, size: u32) -> i64 {
        i64::from(page.saturating_sub(1)) * i64::from(size)
    }
}
