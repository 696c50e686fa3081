//! SQLite-backed job, record and original storage.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::{check_finalize, check_update};
use crate::error::{PactumError, PactumResult};
use crate::traits::{ContractStore, OriginalStore};
use crate::types::{
    sanitize_filename, ContractJob, ContractRecord, JobPage, JobQuery, JobStatus, JobSummary,
    OriginalDocument, SortField, SortOrder,
};

const JOB_COLUMNS: &str = "id, filename, file_size_bytes, uploaded_at, status, progress, \
                           progress_message, error, processed_at, attempt, retry_of";

/// Durable store in a single SQLite database.
pub struct SqliteContractStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContractStore {
    /// Open (or create) the database at `path`. `:memory:` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> PactumResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory database (for testing).
    pub fn in_memory() -> PactumResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> PactumResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> PactumResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PactumError::Internal("sqlite connection lock poisoned".to_string()))
    }

    fn init_schema(&self) -> PactumResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS contract_jobs (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                file_size_bytes INTEGER NOT NULL,
                uploaded_at TEXT NOT NULL,
                status TEXT NOT NULL,
                progress INTEGER NOT NULL,
                progress_message TEXT NOT NULL,
                error TEXT,
                processed_at TEXT,
                attempt INTEGER NOT NULL,
                retry_of TEXT,
                search_content TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_status ON contract_jobs(status);
            CREATE INDEX IF NOT EXISTS idx_jobs_uploaded ON contract_jobs(uploaded_at);

            CREATE TABLE IF NOT EXISTS contract_records (
                job_id TEXT PRIMARY KEY REFERENCES contract_jobs(id),
                result TEXT NOT NULL,
                gaps TEXT NOT NULL,
                gaps_count INTEGER NOT NULL,
                search_content TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contract_originals (
                job_id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                content_type TEXT NOT NULL,
                bytes BLOB NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    fn fetch_job(conn: &Connection, job_id: &str) -> PactumResult<Option<ContractJob>> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM contract_jobs WHERE id = ?1", JOB_COLUMNS),
                params![job_id],
                JobRow::from_row,
            )
            .optional()?;
        row.map(JobRow::into_job).transpose()
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> PactumResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PactumError::persistence(format!("invalid timestamp '{}': {}", raw, e)))
}

/// Raw `contract_jobs` columns, in `JOB_COLUMNS` order.
struct JobRow {
    id: String,
    filename: String,
    file_size_bytes: i64,
    uploaded_at: String,
    status: String,
    progress: i64,
    progress_message: String,
    error: Option<String>,
    processed_at: Option<String>,
    attempt: i64,
    retry_of: Option<String>,
}

impl JobRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            file_size_bytes: row.get(2)?,
            uploaded_at: row.get(3)?,
            status: row.get(4)?,
            progress: row.get(5)?,
            progress_message: row.get(6)?,
            error: row.get(7)?,
            processed_at: row.get(8)?,
            attempt: row.get(9)?,
            retry_of: row.get(10)?,
        })
    }

    fn into_job(self) -> PactumResult<ContractJob> {
        let status = JobStatus::from_str(&self.status).map_err(|_| {
            PactumError::persistence(format!("job {} has unknown status '{}'", self.id, self.status))
        })?;
        Ok(ContractJob {
            uploaded_at: parse_timestamp(&self.uploaded_at)?,
            processed_at: self.processed_at.as_deref().map(parse_timestamp).transpose()?,
            id: self.id,
            filename: self.filename,
            file_size_bytes: self.file_size_bytes.max(0) as u64,
            status,
            progress: self.progress.clamp(0, 100) as u8,
            progress_message: self.progress_message,
            error: self.error,
            attempt: self.attempt.max(1) as u32,
            retry_of: self.retry_of,
        })
    }
}

/// Explain why a guarded write touched no row.
fn refusal(conn: &Connection, incoming: &ContractJob, finalize: Option<&ContractRecord>) -> PactumError {
    match SqliteContractStore::fetch_job(conn, incoming.id()) {
        Ok(Some(stored)) => {
            let checked = match finalize {
                Some(record) => check_finalize(&stored, incoming, record),
                None => check_update(&stored, incoming),
            };
            checked.err().unwrap_or_else(|| {
                PactumError::persistence(format!("job {} changed concurrently", incoming.id()))
            })
        }
        Ok(None) => PactumError::not_found(incoming.id()),
        Err(e) => e,
    }
}

#[async_trait]
impl ContractStore for SqliteContractStore {
    async fn insert_job(&self, job: &ContractJob) -> PactumResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"INSERT INTO contract_jobs
               (id, filename, file_size_bytes, uploaded_at, status, progress, progress_message,
                error, processed_at, attempt, retry_of, search_content)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                job.id(),
                job.filename(),
                job.file_size_bytes() as i64,
                timestamp(job.uploaded_at()),
                job.status().as_str(),
                job.progress() as i64,
                job.progress_message(),
                job.error(),
                job.processed_at().map(timestamp),
                job.attempt() as i64,
                job.retry_of_id(),
                sanitize_filename(job.filename()).to_lowercase(),
            ],
        )?;
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> PactumResult<Option<ContractJob>> {
        let conn = self.conn()?;
        Self::fetch_job(&conn, job_id)
    }

    async fn claim_job(&self, job_id: &str) -> PactumResult<Option<ContractJob>> {
        let conn = self.conn()?;
        let claimed = conn.execute(
            "UPDATE contract_jobs SET status = ?2 WHERE id = ?1 AND status = ?3",
            params![
                job_id,
                JobStatus::Processing.as_str(),
                JobStatus::Pending.as_str()
            ],
        )?;
        match Self::fetch_job(&conn, job_id)? {
            Some(job) if claimed == 1 => Ok(Some(job)),
            Some(_) => Ok(None),
            None => Err(PactumError::not_found(job_id)),
        }
    }

    async fn update_job(&self, job: &ContractJob) -> PactumResult<()> {
        let conn = self.conn()?;
        if !matches!(job.status(), JobStatus::Processing | JobStatus::Failed) {
            return Err(refusal(&conn, job, None));
        }
        let updated = conn.execute(
            r#"UPDATE contract_jobs
               SET status = ?2, progress = ?3, progress_message = ?4, error = ?5, processed_at = ?6
               WHERE id = ?1 AND status = ?7 AND progress <= ?3"#,
            params![
                job.id(),
                job.status().as_str(),
                job.progress() as i64,
                job.progress_message(),
                job.error(),
                job.processed_at().map(timestamp),
                JobStatus::Processing.as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(refusal(&conn, job, None));
        }
        Ok(())
    }

    async fn finalize(&self, job: &ContractJob, record: &ContractRecord) -> PactumResult<()> {
        let result = serde_json::to_string(&record.result)?;
        let gaps = serde_json::to_string(&record.gaps)?;

        let mut conn = self.conn()?;
        if job.status() != JobStatus::Completed || record.job_id != job.id() {
            return Err(refusal(&conn, job, Some(record)));
        }

        let tx = conn.transaction()?;
        let updated = tx.execute(
            r#"UPDATE contract_jobs
               SET status = ?2, progress = ?3, progress_message = ?4, processed_at = ?5,
                   search_content = ?6
               WHERE id = ?1 AND status = ?7"#,
            params![
                job.id(),
                job.status().as_str(),
                job.progress() as i64,
                job.progress_message(),
                job.processed_at().map(timestamp),
                record.search_content,
                JobStatus::Processing.as_str(),
            ],
        )?;
        if updated == 0 {
            let error = refusal(&tx, job, Some(record));
            tx.rollback()?;
            return Err(error);
        }
        tx.execute(
            r#"INSERT INTO contract_records (job_id, result, gaps, gaps_count, search_content)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                record.job_id,
                result,
                gaps,
                record.gaps.len() as i64,
                record.search_content
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn get_record(&self, job_id: &str) -> PactumResult<Option<ContractRecord>> {
        let conn = self.conn()?;
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT result, gaps, search_content FROM contract_records WHERE job_id = ?1",
                params![job_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(result, gaps, search_content)| {
            Ok(ContractRecord {
                job_id: job_id.to_string(),
                result: serde_json::from_str(&result)?,
                gaps: serde_json::from_str(&gaps)?,
                search_content,
            })
        })
        .transpose()
    }

    async fn list_jobs(&self, query: &JobQuery) -> PactumResult<JobPage> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(filename) = query.filename.as_deref() {
            clauses.push("instr(lower(filename), ?) > 0");
            values.push(Value::Text(filename.to_lowercase()));
        }
        if let Some(from) = query.uploaded_from {
            clauses.push("uploaded_at >= ?");
            values.push(Value::Text(timestamp(from)));
        }
        if let Some(to) = query.uploaded_to {
            clauses.push("uploaded_at <= ?");
            values.push(Value::Text(timestamp(to)));
        }
        if let Some(q) = query.q.as_deref().map(|q| q.trim().to_lowercase()) {
            if !q.is_empty() {
                clauses.push("instr(search_content, ?) > 0");
                values.push(Value::Text(q));
            }
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let column = match query.sort_by {
            SortField::UploadedAt => "uploaded_at",
            SortField::Filename => "filename",
            SortField::Status => "status",
        };
        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let limit = query.effective_limit();

        let conn = self.conn()?;
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM contract_jobs {}", where_sql),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {}, (SELECT gaps_count FROM contract_records r WHERE r.job_id = contract_jobs.id) \
             FROM contract_jobs {} ORDER BY {} {}, id {} LIMIT {} OFFSET {}",
            JOB_COLUMNS, where_sql, column, direction, direction, limit, query.offset
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            let gaps_count: Option<i64> = row.get(11)?;
            Ok((JobRow::from_row(row)?, gaps_count))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (job_row, gaps_count) = row?;
            let mut summary = JobSummary::new(&job_row.into_job()?, None);
            summary.gaps_count = gaps_count.map(|n| n.max(0) as usize);
            items.push(summary);
        }

        Ok(JobPage {
            items,
            total: total.max(0) as usize,
            limit,
            offset: query.offset,
        })
    }
}

#[async_trait]
impl OriginalStore for SqliteContractStore {
    async fn put_original(&self, job_id: &str, original: &OriginalDocument) -> PactumResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO contract_originals (job_id, filename, content_type, bytes)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                job_id,
                original.filename,
                original.content_type,
                original.bytes
            ],
        )?;
        Ok(())
    }

    async fn get_original(&self, job_id: &str) -> PactumResult<Option<OriginalDocument>> {
        let conn = self.conn()?;
        let original = conn
            .query_row(
                "SELECT filename, content_type, bytes FROM contract_originals WHERE job_id = ?1",
                params![job_id],
                |row| {
                    Ok(OriginalDocument {
                        filename: row.get(0)?,
                        content_type: row.get(1)?,
                        bytes: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(original)
    }
}
