//! SQLite-backed sync queue.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{SyncJob, SyncOwner, SyncQueue, SyncQueueError, LIBRARY_SCAN};

/// SQLite-backed sync queue sharing the application database.
pub struct SqliteSyncQueue {
    conn: Mutex<Connection>,
}

impl SqliteSyncQueue {
    /// Open the queue, creating tables if needed.
    pub fn new(path: &Path) -> Result<Self, SyncQueueError> {
        let conn = Connection::open(path).map_err(|e| SyncQueueError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory queue (useful for testing).
    pub fn in_memory() -> Result<Self, SyncQueueError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SyncQueueError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SyncQueueError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sync_jobs (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                reason TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sync_jobs_status ON sync_jobs(status);
            "#,
        )
        .map_err(|e| SyncQueueError::Database(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SyncQueueError> {
        self.conn
            .lock()
            .map_err(|e| SyncQueueError::Database(format!("connection lock poisoned: {}", e)))
    }

    /// Register a user. Returns the new user's ID.
    pub fn create_user(&self, username: &str, role: &str) -> Result<String, SyncQueueError> {
        let conn = self.lock()?;
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO users (id, username, role, created_at) VALUES (?, ?, ?, ?)",
            params![id, username, role, Utc::now().to_rfc3339()],
        )
        .map_err(|e| SyncQueueError::Database(e.to_string()))?;

        Ok(id)
    }

    fn query_owner(conn: &Connection, sql: &str) -> Result<Option<SyncOwner>, SyncQueueError> {
        let result = conn.query_row(sql, [], |row| {
            Ok(SyncOwner {
                id: row.get(0)?,
                username: row.get(1)?,
                role: row.get(2)?,
            })
        });

        match result {
            Ok(owner) => Ok(Some(owner)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SyncQueueError::Database(e.to_string())),
        }
    }
}

impl SyncQueue for SqliteSyncQueue {
    fn resolve_owner(&self) -> Result<Option<SyncOwner>, SyncQueueError> {
        let conn = self.lock()?;

        let admin = Self::query_owner(
            &conn,
            "SELECT id, username, role FROM users WHERE role = 'admin' ORDER BY created_at ASC LIMIT 1",
        )?;
        if admin.is_some() {
            return Ok(admin);
        }

        Self::query_owner(
            &conn,
            "SELECT id, username, role FROM users ORDER BY created_at ASC LIMIT 1",
        )
    }

    fn enqueue_library_scan(
        &self,
        owner_id: &str,
        reason: &str,
    ) -> Result<String, SyncQueueError> {
        let conn = self.lock()?;
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO sync_jobs (id, owner_id, kind, reason, status, created_at) VALUES (?, ?, ?, ?, 'queued', ?)",
            params![id, owner_id, LIBRARY_SCAN, reason, Utc::now().to_rfc3339()],
        )
        .map_err(|e| SyncQueueError::Database(e.to_string()))?;

        Ok(id)
    }

    fn list_jobs(&self) -> Result<Vec<SyncJob>, SyncQueueError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, kind, reason, status, created_at FROM sync_jobs ORDER BY created_at ASC",
            )
            .map_err(|e| SyncQueueError::Database(e.to_string()))?;

        let jobs = stmt
            .query_map([], |row| {
                let created_at: String = row.get(5)?;
                Ok(SyncJob {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    kind: row.get(2)?,
                    reason: row.get(3)?,
                    status: row.get(4)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })
            .map_err(|e| SyncQueueError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SyncQueueError::Database(e.to_string()))?;

        Ok(jobs)
    }
}
