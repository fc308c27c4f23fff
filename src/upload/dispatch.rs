use super::tracker::ProgressTracker;
use super::types::{UploadProgress, UploadRequest, UploadStatus, UploadTask};
use crate::database::BucketConfig;
use crate::error::Result;
use crate::logging::{log_error, log_info};
use crate::staging::StagedItem;
use uuid::Uuid;

pub const DISPATCH_ERROR_CODE: &str = "DISPATCH_ERROR";

/// The transfer engine. Implementations send progress back through a
/// `ProgressSender`; `submit` only queues the work.
pub trait Uploader: Send + Sync {
    fn submit(&self, request: UploadRequest) -> Result<()>;
}

/// Register and submit one task per item. Returns the task ids in item order.
/// A rejected submission finishes its task with `DISPATCH_ERROR` and the
/// remaining items are still submitted.
pub async fn dispatch(
    uploader: &dyn Uploader,
    tracker: &ProgressTracker,
    bucket: &BucketConfig,
    items: Vec<StagedItem>,
) -> Result<Vec<String>> {
    let mut task_ids = Vec::with_capacity(items.len());

    for item in items {
        let task_id = Uuid::new_v4().to_string();
        let remote_key = item.remote_key();

        tracker.register(UploadTask {
            task_id: task_id.clone(),
            item_id: item.id().to_string(),
            file_name: item.display_name(),
            remote_key: remote_key.clone(),
            target: bucket.bucket_name.clone(),
            url: bucket.public_url(&remote_key),
        })?;

        let filename = item.display_name();
        let request = UploadRequest {
            task_id: task_id.clone(),
            item,
            remote_key,
            bucket: bucket.clone(),
        };

        if let Err(e) = uploader.submit(request) {
            log_error(
                "upload",
                &format!("Failed to submit task {}: {}", task_id, e),
            )
            .unwrap_or_default();
            tracker
                .on_progress(UploadProgress::new(
                    task_id.clone(),
                    filename,
                    UploadStatus::error(e.to_string(), DISPATCH_ERROR_CODE),
                ))
                .await?;
        }

        task_ids.push(task_id);
    }

    log_info(
        "upload",
        &format!("Dispatched {} task(s) to {}", task_ids.len(), bucket.bucket_name),
    )
    .unwrap_or_default();
    Ok(task_ids)
}
