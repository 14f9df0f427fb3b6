//! Download task repository.
//!
//! The claim step reads a row with `SELECT ... FOR UPDATE`, which blocks
//! on contention for the life of the enclosing transaction. That row lock
//! is the only serialization primitive between competing workers.

use super::Result;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};

/// Protocol tag; one variant per supported downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadType {
    Http,
}

impl DownloadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadType::Http => "http",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "http" => Some(DownloadType::Http),
            _ => None,
        }
    }
}

/// Lifecycle status. Transitions are constrained to
/// Pending -> Downloading -> {Success, Failed} on the worker path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Success,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Success => "success",
            DownloadStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DownloadStatus::Pending),
            "downloading" => Some(DownloadStatus::Downloading),
            "success" => Some(DownloadStatus::Success),
            "failed" => Some(DownloadStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub of_account_id: i64,
    pub download_type: String,
    pub url: String,
    pub download_status: String,
    pub metadata: String,
}

impl TaskRow {
    pub fn download_type(&self) -> Option<DownloadType> {
        DownloadType::parse(&self.download_type)
    }

    pub fn status(&self) -> Option<DownloadStatus> {
        DownloadStatus::parse(&self.download_status)
    }
}

/// Fields for task creation; id is DB-assigned.
#[derive(Debug)]
pub struct NewTask<'a> {
    pub of_account_id: i64,
    pub download_type: DownloadType,
    pub url: &'a str,
    pub download_status: DownloadStatus,
    pub metadata: &'a str,
}

pub async fn create_task<'e>(executor: impl PgExecutor<'e>, task: NewTask<'_>) -> Result<i64> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO download_tasks (of_account_id, download_type, url, download_status, metadata)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(task.of_account_id)
    .bind(task.download_type.as_str())
    .bind(task.url)
    .bind(task.download_status.as_str())
    .bind(task.metadata)
    .fetch_one(executor)
    .await?;
    Ok(id)
}

pub async fn get_task<'e>(executor: impl PgExecutor<'e>, id: i64) -> Result<Option<TaskRow>> {
    let row = sqlx::query_as::<_, TaskRow>(
        "SELECT id, of_account_id, download_type, url, download_status, metadata
         FROM download_tasks WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

/// Like [`get_task`] but acquires a row-exclusive lock held until the
/// enclosing transaction ends. Blocks, rather than spins, on contention.
pub async fn get_task_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: i64,
) -> Result<Option<TaskRow>> {
    let row = sqlx::query_as::<_, TaskRow>(
        "SELECT id, of_account_id, download_type, url, download_status, metadata
         FROM download_tasks WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

pub async fn list_tasks_by_account<'e>(
    executor: impl PgExecutor<'e>,
    account_id: i64,
    offset: i64,
    limit: i64,
) -> Result<Vec<TaskRow>> {
    let rows = sqlx::query_as::<_, TaskRow>(
        "SELECT id, of_account_id, download_type, url, download_status, metadata
         FROM download_tasks WHERE of_account_id = $1
         ORDER BY id
         OFFSET $2 LIMIT $3",
    )
    .bind(account_id)
    .bind(offset)
    .bind(limit)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

pub async fn count_tasks_by_account<'e>(
    executor: impl PgExecutor<'e>,
    account_id: i64,
) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM download_tasks WHERE of_account_id = $1")
            .bind(account_id)
            .fetch_one(executor)
            .await?;
    Ok(count)
}

/// Write all mutable columns; id and of_account_id never change.
pub async fn update_task<'e>(executor: impl PgExecutor<'e>, task: &TaskRow) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE download_tasks
         SET download_type = $1, url = $2, download_status = $3, metadata = $4
         WHERE id = $5",
    )
    .bind(&task.download_type)
    .bind(&task.url)
    .bind(&task.download_status)
    .bind(&task.metadata)
    .bind(task.id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_task<'e>(executor: impl PgExecutor<'e>, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM download_tasks WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            DownloadStatus::Pending,
            DownloadStatus::Downloading,
            DownloadStatus::Success,
            DownloadStatus::Failed,
        ] {
            assert_eq!(DownloadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DownloadStatus::parse("queued"), None);
    }

    #[test]
    fn test_type_round_trip() {
        assert_eq!(DownloadType::parse("http"), Some(DownloadType::Http));
        assert_eq!(DownloadType::parse("ftp"), None);
    }

    #[test]
    fn test_status_serde_wire_form() {
        let json = serde_json::to_string(&DownloadStatus::Downloading).unwrap();
        assert_eq!(json, "\"downloading\"");
        let parsed: DownloadStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, DownloadStatus::Failed);
    }
}
