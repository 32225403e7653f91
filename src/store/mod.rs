use crate::error::StoreError;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// One attempted headline change. Immutable once written; the ordered
/// history per creative is the uniqueness ledger the selector draws on.
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub creative_id: String,
    pub prior_headline: String,
    pub new_headline: String,
    pub status: OutcomeStatus,
    pub error_message: Option<String>,
    pub timestamp: String,
}

impl OutcomeRecord {
    pub fn success(
        creative_id: impl Into<String>,
        prior_headline: impl Into<String>,
        new_headline: impl Into<String>,
    ) -> Self {
        Self {
            creative_id: creative_id.into(),
            prior_headline: prior_headline.into(),
            new_headline: new_headline.into(),
            status: OutcomeStatus::Success,
            error_message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn failed(
        creative_id: impl Into<String>,
        prior_headline: impl Into<String>,
        new_headline: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            creative_id: creative_id.into(),
            prior_headline: prior_headline.into(),
            new_headline: new_headline.into(),
            status: OutcomeStatus::Failed,
            error_message: Some(error_message.into()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Append-only SQLite ledger of headline update attempts.
pub struct OutcomeStore {
    pool: SqlitePool,
}

const NOT_A_DATABASE: &str = "file is not a database";

impl OutcomeStore {
    /// Open (or create) the ledger at `path`.
    ///
    /// A file that SQLite rejects as "not a database" is removed and
    /// recreated empty; the recovery is reported through the log, prior
    /// rows are gone.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        match Self::connect(path).await {
            Ok(store) => Ok(store),
            Err(e) if e.to_string().contains(NOT_A_DATABASE) => {
                tracing::warn!(
                    "outcome store at {} is not a valid database, recreating it empty: {e}",
                    path.display()
                );
                std::fs::remove_file(path).map_err(|io| StoreError::Open(io.to_string()))?;
                Self::connect(path).await
            }
            Err(e) => Err(e),
        }
    }

    async fn connect(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Open(e.to_string()))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Open(e.to_string()))?;

        Self::with_pool(pool).await
    }

    /// Initialize the schema on an existing pool. Safe to call repeatedly.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS outcomes (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 creative_id TEXT NOT NULL,
                 prior_headline TEXT NOT NULL,
                 new_headline TEXT NOT NULL,
                 status TEXT NOT NULL,
                 error_message TEXT,
                 timestamp TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Open(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_outcomes_creative
                 ON outcomes(creative_id, id)",
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Open(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Persist one outcome. Never overwrites or deletes.
    pub async fn append(&self, record: &OutcomeRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO outcomes (creative_id, prior_headline, new_headline, status, error_message, timestamp)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&record.creative_id)
        .bind(&record.prior_headline)
        .bind(&record.new_headline)
        .bind(record.status.to_string())
        .bind(&record.error_message)
        .bind(&record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(())
    }

    /// Every `new_headline` ever recorded for the creative, across both
    /// SUCCESS and FAILED attempts.
    pub async fn used_headlines(&self, creative_id: &str) -> Result<HashSet<String>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT new_headline FROM outcomes WHERE creative_id = $1")
                .bind(creative_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(rows.into_iter().map(|(headline,)| headline).collect())
    }

    /// Full ordered audit trail for one creative, oldest first.
    pub async fn history(&self, creative_id: &str) -> Result<Vec<OutcomeRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT creative_id, prior_headline, new_headline, status, error_message, timestamp
             FROM outcomes
             WHERE creative_id = $1
             ORDER BY id ASC",
        )
        .bind(creative_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.iter().map(map_outcome_row).collect()
    }
}

fn map_outcome_row(row: &SqliteRow) -> Result<OutcomeRecord, StoreError> {
    let status_raw: String = row
        .try_get("status")
        .map_err(|e| StoreError::Query(e.to_string()))?;
    let status = OutcomeStatus::from_str(&status_raw)
        .map_err(|_| StoreError::Query(format!("unknown outcome status: {status_raw}")))?;

    Ok(OutcomeRecord {
        creative_id: row
            .try_get("creative_id")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        prior_headline: row
            .try_get("prior_headline")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        new_headline: row
            .try_get("new_headline")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        status,
        error_message: row
            .try_get("error_message")
            .map_err(|e| StoreError::Query(e.to_string()))?,
        timestamp: row
            .try_get("timestamp")
            .map_err(|e| StoreError::Query(e.to_string()))?,
    })
}
