//! SQLite-backed history store using sqlx.

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions},
};

use castellan_common::time::{datetime_to_ms, ms_to_datetime};

use crate::{
    context::LocationFix,
    error::{Context, Result},
    history::{AttemptRecord, HistorySnapshot, SubjectHistory},
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS auth_attempts (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id         TEXT NOT NULL,
    succeeded          INTEGER NOT NULL,
    device_fingerprint TEXT,
    country            TEXT,
    latitude           REAL,
    longitude          REAL,
    observed_at_ms     INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_auth_attempts_subject
    ON auth_attempts (subject_id, observed_at_ms);
";

/// SQLite-backed persistence for per-subject attempt history.
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    /// Create a new store with its own connection pool and ensure the schema.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .with_context(|| format!("failed to open history database '{database_url}'"))?;
        let store = Self::with_pool(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create a store using an existing pool. Call [`Self::ensure_schema`]
    /// once before first use.
    #[must_use]
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the attempt table and index if missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .context("failed to create attempt history schema")?;
        Ok(())
    }

    /// Append one attempt to the subject's record.
    pub async fn record_attempt(&self, record: &AttemptRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO auth_attempts
                 (subject_id, succeeded, device_fingerprint, country, latitude, longitude, observed_at_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.subject_id)
        .bind(record.succeeded)
        .bind(&record.device_fingerprint)
        .bind(&record.country)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(datetime_to_ms(record.observed_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SubjectHistory for SqliteHistory {
    async fn snapshot(
        &self,
        subject_id: &str,
        failures_since: DateTime<Utc>,
    ) -> Result<HistorySnapshot> {
        let device_rows = sqlx::query(
            "SELECT DISTINCT device_fingerprint FROM auth_attempts
             WHERE subject_id = ? AND succeeded = 1 AND device_fingerprint IS NOT NULL
             ORDER BY device_fingerprint",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        let known_devices = device_rows
            .iter()
            .map(|row| row.get("device_fingerprint"))
            .collect();

        let country_rows = sqlx::query(
            "SELECT DISTINCT country FROM auth_attempts
             WHERE subject_id = ? AND succeeded = 1 AND country IS NOT NULL
             ORDER BY country",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        let known_countries = country_rows.iter().map(|row| row.get("country")).collect();

        let last_fix = sqlx::query(
            "SELECT latitude, longitude, observed_at_ms FROM auth_attempts
             WHERE subject_id = ? AND succeeded = 1
               AND latitude IS NOT NULL AND longitude IS NOT NULL
             ORDER BY observed_at_ms DESC
             LIMIT 1",
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| LocationFix {
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            observed_at: ms_to_datetime(row.get("observed_at_ms")),
        });

        let failed_attempts: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM auth_attempts
             WHERE subject_id = ? AND succeeded = 0 AND observed_at_ms >= ?",
        )
        .bind(subject_id)
        .bind(datetime_to_ms(failures_since))
        .fetch_one(&self.pool)
        .await?
        .get("n");

        Ok(HistorySnapshot {
            known_devices,
            known_countries,
            last_fix,
            failed_attempts: failed_attempts.max(0) as u32,
        })
    }
}
