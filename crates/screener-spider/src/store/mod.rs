mod sql;

use crate::error::Error;
use crate::http::SqlitePool;
use crate::normalize::{StockRecord, Value};
use chrono::Utc;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, trace};

/// The snapshot store: one `stocks` row per ticker plus `snapshot_meta` bookkeeping.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `path` and bring its schema up to date.
    pub async fn open(path: &Path) -> Result<Self, Error> {
        debug!("opening store at {}", path.display());
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create missing tables, then add any schema column an older `stocks` table lacks.
    ///
    /// Returns the names of the columns that were added.
    pub async fn migrate(&self) -> Result<Vec<&'static str>, Error> {
        sqlx::query(&sql::CREATE_STOCKS).execute(&self.pool).await?;
        sqlx::query(sql::CREATE_META).execute(&self.pool).await?;

        let existing: HashSet<String> = sqlx::query_scalar::<_, String>(sql::TABLE_INFO)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .collect();

        let mut added = vec![];
        for (column, sql_type) in sql::STOCK_COLUMNS.iter() {
            if existing.contains(*column) {
                continue;
            }
            sqlx::query(&format!("ALTER TABLE stocks ADD COLUMN {column} {sql_type}"))
                .execute(&self.pool)
                .await?;
            added.push(*column);
        }
        if !added.is_empty() {
            info!("added {} column(s) to stocks: {}", added.len(), added.join(", "));
        }

        for index in sql::CREATE_INDEXES {
            sqlx::query(index).execute(&self.pool).await?;
        }

        Ok(added)
    }

    /// Every tracked ticker, largest market cap first.
    pub async fn tickers(&self) -> Result<Vec<String>, Error> {
        let tickers = sqlx::query_scalar(sql::SELECT_TICKERS)
            .fetch_all(&self.pool)
            .await?;
        Ok(tickers)
    }

    pub async fn row_count(&self) -> Result<i64, Error> {
        let count = sqlx::query_scalar(sql::COUNT_STOCKS)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Upsert `records` inside one transaction; either all of them become visible or none do.
    pub async fn write_batch(&self, records: &[StockRecord]) -> Result<(), Error> {
        if records.is_empty() {
            return Ok(());
        }
        let time = std::time::Instant::now();
        let updated_at = Utc::now();

        let mut transaction = self.pool.begin().await?;
        for record in records {
            let mut query = sqlx::query(&sql::UPSERT_STOCK)
                .bind(&record.ticker)
                .bind(&record.company_name)
                .bind(&record.sector)
                .bind(&record.industry)
                .bind(&record.country)
                .bind(record.market_cap_tier.map(|tier| tier.as_str()));

            for (column, _) in crate::normalize::schema::columns() {
                query = match record.value(column) {
                    Value::Number(n) => query.bind(Some(*n)),
                    Value::Date(date) => query.bind(Some(*date)),
                    Value::Text(text) => query.bind(Some(text.as_str())),
                    Value::Unknown => query.bind(None::<f64>),
                };
            }

            query.bind(updated_at).execute(&mut *transaction).await?;
            trace!("staged upsert for [{}]", record.ticker);
        }
        transaction.commit().await?;

        debug!(
            "committed {} record(s), {}",
            records.len(),
            crate::time_elapsed(time)
        );
        Ok(())
    }

    /// Record the refresh time, row count and summary of the run that just finished.
    pub async fn record_run<T: Serialize>(&self, summary: &T) -> Result<(), Error> {
        let now = Utc::now();
        let row_count = self.row_count().await?;
        let summary = serde_json::to_string(summary)?;

        let entries = [
            ("last_refresh", now.to_rfc3339()),
            ("row_count", row_count.to_string()),
            ("last_run", summary),
        ];

        let mut transaction = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(sql::UPSERT_META)
                .bind(key)
                .bind(value)
                .bind(now)
                .execute(&mut *transaction)
                .await?;
        }
        transaction.commit().await?;
        Ok(())
    }

    pub async fn meta(&self, key: &str) -> Result<Option<String>, Error> {
        let value = sqlx::query_scalar(sql::SELECT_META)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }
}
