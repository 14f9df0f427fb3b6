//! Download task lifecycle.
//!
//! Owns every mutation of download-task rows: creation with its paired
//! event publish, the client-facing update/delete/list operations gated on
//! ownership, and the worker-side execute path that claims a task, drives
//! the fetch, and finalizes its status.

use super::{CoreError, Result};
use crate::blob::{task_blob_key, BlobStore};
use crate::bus::{EventProducer, TaskCreatedEvent, TOPIC_DOWNLOAD_TASK_CREATED};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::store::{
    self, AccountRow, DownloadStatus, DownloadType, NewTask, Store, TaskRow,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Metadata key pointing at the blob holding the payload.
pub const METADATA_KEY_FILE_NAME: &str = "file-name";

const ERR_NOT_ALLOWED_TO_UPDATE: &str = "only owners can update their download tasks";
const ERR_NOT_ALLOWED_TO_DELETE: &str = "only owners can delete their download tasks";

/// Client-facing task projection.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: i64,
    pub of_account: AccountRow,
    pub download_type: DownloadType,
    pub url: String,
    pub download_status: DownloadStatus,
}

impl TaskView {
    fn from_row(row: &TaskRow, account: &AccountRow) -> Result<Self> {
        let download_type = row.download_type().ok_or_else(|| {
            CoreError::Internal(format!("unknown download type: {}", row.download_type))
        })?;
        let download_status = row.status().ok_or_else(|| {
            CoreError::Internal(format!("unknown download status: {}", row.download_status))
        })?;
        Ok(Self {
            id: row.id,
            of_account: account.clone(),
            download_type,
            url: row.url.clone(),
            download_status,
        })
    }
}

pub struct TaskService {
    store: Store,
    producer: Arc<dyn EventProducer>,
    blobs: BlobStore,
    http: HttpFetcher,
}

impl TaskService {
    pub fn new(
        store: Store,
        producer: Arc<dyn EventProducer>,
        blobs: BlobStore,
        http: HttpFetcher,
    ) -> Self {
        Self {
            store,
            producer,
            blobs,
            http,
        }
    }

    /// Insert a Pending task and publish its creation event inside one
    /// unit of work: a failed publish rolls the insert back and the
    /// caller sees the failure.
    pub async fn create_download_task(&self, account_id: i64, url: &str) -> Result<TaskView> {
        if url.trim().is_empty() {
            return Err(CoreError::InvalidArgument("url must not be empty".to_string()));
        }

        let account = self.get_account(account_id).await?;

        let mut tx = self.store.begin().await?;
        let id = store::create_task(
            &mut *tx,
            NewTask {
                of_account_id: account.id,
                download_type: DownloadType::Http,
                url,
                download_status: DownloadStatus::Pending,
                metadata: "{}",
            },
        )
        .await?;

        let event = TaskCreatedEvent {
            download_task_id: id,
        };
        let payload = serde_json::to_vec(&event)
            .map_err(|e| CoreError::Internal(format!("failed to encode event: {}", e)))?;
        self.producer
            .produce(TOPIC_DOWNLOAD_TASK_CREATED, payload)
            .await?;

        tx.commit().await?;

        info!(id, account_id, "Download task created");

        Ok(TaskView {
            id,
            of_account: account,
            download_type: DownloadType::Http,
            url: url.to_string(),
            download_status: DownloadStatus::Pending,
        })
    }

    /// Apply a non-empty url and any provided status. The status DAG is
    /// not enforced on this path; only the worker path constrains
    /// transitions.
    pub async fn update_download_task(
        &self,
        account_id: i64,
        task_id: i64,
        url: Option<&str>,
        status: Option<DownloadStatus>,
    ) -> Result<bool> {
        let mut task = self
            .get_owned_task(account_id, task_id, ERR_NOT_ALLOWED_TO_UPDATE)
            .await?;

        if let Some(url) = url {
            if !url.is_empty() {
                task.url = url.to_string();
            }
        }
        if let Some(status) = status {
            task.download_status = status.as_str().to_string();
        }

        let updated = store::update_task(self.store.pool(), &task).await?;
        Ok(updated)
    }

    pub async fn delete_download_task(&self, account_id: i64, task_id: i64) -> Result<bool> {
        self.get_owned_task(account_id, task_id, ERR_NOT_ALLOWED_TO_DELETE)
            .await?;

        let deleted = store::delete_task(self.store.pool(), task_id).await?;
        Ok(deleted)
    }

    /// List a page of the caller's tasks along with the total count. The
    /// two reads are separate; the count is not snapshotted with the page.
    pub async fn get_download_task_list(
        &self,
        account_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<TaskView>, i64)> {
        if offset < 0 || limit < 0 {
            return Err(CoreError::InvalidArgument(
                "offset and limit must not be negative".to_string(),
            ));
        }

        let account = self.get_account(account_id).await?;

        let total = store::count_tasks_by_account(self.store.pool(), account.id).await?;
        let rows =
            store::list_tasks_by_account(self.store.pool(), account.id, offset, limit).await?;

        let views = rows
            .iter()
            .map(|row| TaskView::from_row(row, &account))
            .collect::<Result<Vec<_>>>()?;
        Ok((views, total))
    }

    /// Worker entry point: claim the task, stream the payload into the
    /// blob sink, and finalize. Returns Ok(()) without side effects when
    /// another worker already owns the task.
    pub async fn execute_download_task(&self, cancel: &CancellationToken, id: i64) -> Result<()> {
        let Some(mut task) = self.claim(id).await? else {
            return Ok(());
        };

        let file_name = task_blob_key(task.id);
        let mut writer = self.blobs.writer(&file_name);

        let Some(download_type) = task.download_type() else {
            error!(id, download_type = %task.download_type, "Unsupported download type");
            self.mark_failed(&mut task).await;
            return Ok(());
        };
        let fetcher = Fetcher::for_type(download_type, &self.http);

        let mut metadata = match fetcher.fetch(cancel, &task.url, &mut writer).await {
            Ok(metadata) => metadata,
            Err(err) => {
                error!(id, error = %err, "Failed to download file");
                self.mark_failed(&mut task).await;
                return Err(err.into());
            }
        };
        if let Err(err) = writer.shutdown().await {
            error!(id, error = %err, "Failed to finish blob write");
            self.mark_failed(&mut task).await;
            return Err(CoreError::Internal(err.to_string()));
        }

        metadata.insert(METADATA_KEY_FILE_NAME.to_string(), file_name);
        task.metadata = serde_json::to_string(&metadata)
            .map_err(|e| CoreError::Internal(format!("failed to encode metadata: {}", e)))?;
        task.download_status = DownloadStatus::Success.as_str().to_string();

        store::update_task(self.store.pool(), &task).await.map_err(|err| {
            error!(id, error = %err, "Failed to update download task status to success");
            CoreError::from(err)
        })?;

        info!(id, "Download task executed successfully");
        Ok(())
    }

    /// The claim: read the row under an exclusive lock, and only a
    /// Pending task transitions to Downloading. After commit exactly one
    /// worker owns the task; any other claimant observes a non-Pending
    /// status and exits as a no-op.
    async fn claim(&self, id: i64) -> Result<Option<TaskRow>> {
        let mut tx = self.store.begin().await?;

        let Some(mut task) = store::get_task_for_update(&mut *tx, id).await? else {
            return Err(CoreError::NotFound("download task not found".to_string()));
        };

        if task.status() != Some(DownloadStatus::Pending) {
            warn!(id, status = %task.download_status, "Download task is not ready to be executed");
            tx.commit().await?;
            return Ok(None);
        }

        task.download_status = DownloadStatus::Downloading.as_str().to_string();
        store::update_task(&mut *tx, &task).await?;
        tx.commit().await?;

        Ok(Some(task))
    }

    /// Best-effort transition to Failed; errors are logged only.
    async fn mark_failed(&self, task: &mut TaskRow) {
        task.download_status = DownloadStatus::Failed.as_str().to_string();
        if let Err(err) = store::update_task(self.store.pool(), task).await {
            warn!(id = task.id, error = %err, "Failed to update download task status to failed");
        }
    }

    async fn get_account(&self, account_id: i64) -> Result<AccountRow> {
        store::get_account_by_id(self.store.pool(), account_id)
            .await
            .map_err(CoreError::from)?
            .ok_or_else(|| CoreError::NotFound("account not found".to_string()))
    }

    async fn get_owned_task(
        &self,
        account_id: i64,
        task_id: i64,
        denial: &str,
    ) -> Result<TaskRow> {
        let account = self.get_account(account_id).await?;

        let task = store::get_task(self.store.pool(), task_id)
            .await
            .map_err(CoreError::from)?
            .ok_or_else(|| CoreError::NotFound("download task not found".to_string()))?;

        if task.of_account_id != account.id {
            return Err(CoreError::PermissionDenied(denial.to_string()));
        }
        Ok(task)
    }
}
