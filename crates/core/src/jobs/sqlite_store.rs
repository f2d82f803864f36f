//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{CreateJobRequest, DownloadJob, JobFilter, JobStatus, JobStore, JobStoreError};

const SELECT_COLUMNS: &str = "SELECT id, user_id, subject, target_album_id, status, external_ref, error, created_at, updated_at FROM download_jobs";

/// SQLite-backed job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JobStoreError> {
        let conn = Connection::open(path).map_err(|e| JobStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, JobStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| JobStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS download_jobs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                subject TEXT NOT NULL,
                target_album_id TEXT NOT NULL,
                status TEXT NOT NULL,
                external_ref TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_download_jobs_target ON download_jobs(target_album_id);
            CREATE INDEX IF NOT EXISTS idx_download_jobs_subject ON download_jobs(subject);
            "#,
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, JobStoreError> {
        self.conn
            .lock()
            .map_err(|e| JobStoreError::Database(format!("connection lock poisoned: {}", e)))
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<DownloadJob> {
        let status: String = row.get(4)?;
        let created_at: String = row.get(7)?;
        let updated_at: String = row.get(8)?;

        Ok(DownloadJob {
            id: row.get(0)?,
            user_id: row.get(1)?,
            subject: row.get(2)?,
            target_album_id: row.get(3)?,
            status: JobStatus::parse(&status),
            external_ref: row.get(5)?,
            error: row.get(6)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl JobStore for SqliteJobStore {
    fn create(&self, request: CreateJobRequest) -> Result<DownloadJob, JobStoreError> {
        let conn = self.lock()?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO download_jobs (id, user_id, subject, target_album_id, status, external_ref, error, created_at, updated_at) VALUES (?, ?, ?, ?, ?, NULL, NULL, ?, ?)",
            params![
                id,
                request.user_id,
                request.subject,
                request.target_album_id,
                JobStatus::Pending.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(DownloadJob {
            id,
            user_id: request.user_id,
            subject: request.subject,
            target_album_id: request.target_album_id,
            status: JobStatus::Pending,
            external_ref: None,
            error: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<DownloadJob>, JobStoreError> {
        let conn = self.lock()?;

        let result = conn.query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            params![id],
            Self::row_to_job,
        );

        match result {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(JobStoreError::Database(e.to_string())),
        }
    }

    fn list(&self, filter: &JobFilter) -> Result<Vec<DownloadJob>, JobStoreError> {
        let conn = self.lock()?;

        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();
        if let Some(status) = filter.status {
            conditions.push("status = ?");
            values.push(status.as_str().to_string());
        }
        if let Some(ref album_id) = filter.target_album_id {
            conditions.push("target_album_id = ?");
            values.push(album_id.clone());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "{} {} ORDER BY created_at ASC LIMIT {}",
            SELECT_COLUMNS, where_clause, filter.limit
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| JobStoreError::Database(e.to_string()))?;
        let jobs = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), Self::row_to_job)
            .map_err(|e| JobStoreError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(jobs)
    }

    fn link_external_ref(
        &self,
        target_album_id: &str,
        external_ref: &str,
    ) -> Result<usize, JobStoreError> {
        let conn = self.lock()?;

        conn.execute(
            "UPDATE download_jobs SET external_ref = ?, status = 'processing', updated_at = ? \
             WHERE target_album_id = ? AND status IN ('pending', 'processing') \
             AND (external_ref IS NULL OR external_ref = '')",
            params![external_ref, Utc::now().to_rfc3339(), target_album_id],
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))
    }

    fn mark_failed_by_subject(
        &self,
        subject: &str,
        reason: &str,
    ) -> Result<usize, JobStoreError> {
        let conn = self.lock()?;

        conn.execute(
            "UPDATE download_jobs SET status = 'failed', error = ?, updated_at = ? \
             WHERE subject = ? AND status IN ('pending', 'processing')",
            params![reason, Utc::now().to_rfc3339(), subject],
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))
    }
}
