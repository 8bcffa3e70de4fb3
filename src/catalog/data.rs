use super::{CanonicalCourse, Page};
use crate::{utils, RawRecord, ScrapeError, Table};
use futures::TryStreamExt;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, Sqlite, SqlitePool, Transaction,
};
use std::str::FromStr;
use tracing::{debug, info};

pub struct CourseTable {
    name: String,
    pool: SqlitePool,
}

#[async_trait::async_trait]
impl Table for CourseTable {
    fn get_name(&self) -> &str {
        self.name.as_str()
    }

    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create(&self) -> Result<(), sqlx::Error> {
        if !self.is_created().await? {
            let query = format!(
                r#"
                    CREATE TABLE {0} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        university TEXT NOT NULL CHECK (length(university) > 0),
                        course_code TEXT,
                        title TEXT,
                        units TEXT,
                        description TEXT,
                        details TEXT,
                        imported_at DATETIME
                    )
                "#,
                &self.name
            );
            sqlx::query(query.as_str()).execute(self.get_pool()).await?;

            let query = format!(
                "CREATE INDEX ix_{0}_university ON {0} (university)",
                &self.name
            );
            sqlx::query(query.as_str()).execute(self.get_pool()).await?;
        }
        Ok(())
    }
}

impl CourseTable {
    async fn delete_university(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        university: &str,
    ) -> Result<u64, sqlx::Error> {
        let query = format!("DELETE FROM {} WHERE university = ?", self.name);
        Ok(sqlx::query(&query)
            .bind(university)
            .execute(&mut *tx)
            .await?
            .rows_affected())
    }

    async fn insert(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        course: &CanonicalCourse,
    ) -> Result<(), ScrapeError> {
        let query = format!(
            r#"INSERT INTO {} (
                university,
                course_code,
                title,
                units,
                description,
                details,
                imported_at) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            self.name
        );
        sqlx::query(&query)
            .bind(&course.university)
            .bind(&course.course_code)
            .bind(&course.title)
            .bind(&course.units)
            .bind(&course.description)
            .bind(serde_json::to_string(&course.details)?)
            .bind(utils::get_now())
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    fn from_row(row: &SqliteRow) -> Result<CanonicalCourse, ScrapeError> {
        let details: Option<String> = row.try_get("details")?;
        let details = match details {
            Some(json) => serde_json::from_str::<RawRecord>(&json)?,
            None => RawRecord::new(),
        };
        Ok(CanonicalCourse {
            id: Some(row.try_get("id")?),
            university: row.try_get("university")?,
            course_code: row.try_get("course_code")?,
            title: row.try_get("title")?,
            units: row.try_get("units")?,
            description: row.try_get("description")?,
            details,
        })
    }
}

/// The course store. One connection, one writer.
pub struct Catalog {
    pub courses: CourseTable,
    pool: SqlitePool,
}

impl Catalog {
    pub async fn open(path: &str) -> Result<Catalog, ScrapeError> {
        let opt = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Catalog::connect(opt).await
    }

    pub async fn open_in_memory() -> Result<Catalog, ScrapeError> {
        Catalog::connect(SqliteConnectOptions::from_str("sqlite::memory:")?).await
    }

    async fn connect(opt: SqliteConnectOptions) -> Result<Catalog, ScrapeError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opt)
            .await?;
        let catalog = Catalog {
            courses: CourseTable {
                name: "courses".to_string(),
                pool: pool.clone(),
            },
            pool,
        };

        if catalog.courses.is_created().await? {
            debug!("Use table {}", catalog.courses.get_name());
        } else {
            debug!("Create table {}", catalog.courses.get_name());
            catalog.courses.create().await?;
        }

        Ok(catalog)
    }

    /// Deletes every row of `university` and inserts `records` in their place, in one
    /// transaction. On any error nothing changes.
    pub async fn replace_university(
        &self,
        university: &str,
        records: Vec<RawRecord>,
    ) -> Result<usize, ScrapeError> {
        let mut tx = self.pool.begin().await?;

        let deleted = self.courses.delete_university(&mut tx, university).await?;
        debug!("[{}] Deleted {} previous rows", university, deleted);

        let mut written = 0;
        for record in records {
            let course = CanonicalCourse::from_raw(university, record)?;
            self.courses.insert(&mut tx, &course).await?;
            written += 1;
        }

        tx.commit().await?;
        info!("[{}] Wrote {} courses", university, written);
        Ok(written)
    }

    pub async fn count(&self) -> Result<u32, ScrapeError> {
        Ok(self.courses.count().await?)
    }

    pub async fn count_university(&self, university: &str) -> Result<u32, ScrapeError> {
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE university = ?",
            self.courses.get_name()
        );
        Ok(sqlx::query(&query)
            .bind(university)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?)
    }

    pub async fn courses_for(&self, university: &str) -> Result<Vec<CanonicalCourse>, ScrapeError> {
        let query = format!(
            "SELECT * FROM {} WHERE university = ? ORDER BY id",
            self.courses.get_name()
        );
        sqlx::query(&query)
            .bind(university)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(CourseTable::from_row)
            .collect()
    }

    /// A page of courses ordered by id, optionally for one university only.
    pub async fn page(
        &self,
        university: Option<&str>,
        page: u32,
        size: u32,
    ) -> Result<Page<CanonicalCourse>, ScrapeError> {
        Page::<CanonicalCourse>::validate(page, size)?;

        let total = match university {
            Some(u) => self.count_university(u).await?,
            None => self.count().await?,
        };

        let filter = if university.is_some() {
            "WHERE university = ?"
        } else {
            ""
        };
        let query = format!(
            "SELECT * FROM {} {} ORDER BY id LIMIT ? OFFSET ?",
            self.courses.get_name(),
            filter
        );
        let mut q = sqlx::query(&query);
        if let Some(u) = university {
            q = q.bind(u);
        }
        let items = q
            .bind(size)
            .bind(Page::<CanonicalCourse>::offset(page, size))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(CourseTable::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            total,
            page,
            size,
            pages: Page::<CanonicalCourse>::page_count(total, size),
        })
    }

    /// Distinct non-empty university tokens, sorted.
    pub async fn universities(&self) -> Result<Vec<String>, ScrapeError> {
        let mut universities = vec![];
        let query = format!(
            "SELECT DISTINCT university FROM {} WHERE university <> '' ORDER BY university",
            self.courses.get_name()
        );
        let mut rows = sqlx::query(&query).fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            universities.push(row.try_get("university")?);
        }
        Ok(universities)
    }
}
