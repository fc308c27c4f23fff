//! Application context: owns the store, settings, staging queue, tracker and
//! event plumbing. The UI shell holds one `AppContext` and calls into it.

use crate::database::{BucketConfig, BucketSummary, Store, UploadHistoryRecord};
use crate::error::{ErrorContext, Result, UploaderError};
use crate::events::{AppEventPayload, EventBus, EventReceiver, ProgressEventHandler};
use crate::ingest::{preview_file, Clipboard, FsPathResolver, IngestReport, Ingestor, PathResolver};
use crate::logging::log_info;
use crate::settings::SettingsManager;
use crate::shutdown::ShutdownCoordinator;
use crate::staging::{StagedItem, StagingQueue};
use crate::upload::{
    dispatch, progress_channel, ProgressReceiver, ProgressSender, ProgressTracker, TaskSnapshot,
    Uploader,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;

pub struct AppContext {
    pub store: Store,
    pub settings: SettingsManager,
    pub queue: StagingQueue,
    pub ingestor: Ingestor,
    pub tracker: ProgressTracker,
    pub event_bus: EventBus,
    pub shutdown: ShutdownCoordinator,
    uploader: RwLock<Option<Arc<dyn Uploader>>>,
    progress_tx: ProgressSender,
    progress_rx: Mutex<Option<ProgressReceiver>>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("store", &self.store)
            .field("queue", &self.queue)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Open the database at `db_path` and build a context over the local filesystem
    pub fn open(db_path: &Path) -> Result<Self> {
        let store = Store::open(db_path)?;
        Self::new(store, Arc::new(FsPathResolver))
    }

    pub fn new(store: Store, resolver: Arc<dyn PathResolver>) -> Result<Self> {
        let event_bus = EventBus::default();
        let queue = StagingQueue::new();
        let settings = SettingsManager::new(store.clone());
        settings.init_app_settings()?;
        settings.init_proxy_settings()?;

        let ingestor = Ingestor::new(queue.clone(), resolver, event_bus.clone());
        let tracker = ProgressTracker::new(store.clone(), queue.clone(), event_bus.clone());
        let (progress_tx, progress_rx) = progress_channel();

        Ok(Self {
            store,
            settings,
            queue,
            ingestor,
            tracker,
            event_bus,
            shutdown: ShutdownCoordinator::new(),
            uploader: RwLock::new(None),
            progress_tx,
            progress_rx: Mutex::new(Some(progress_rx)),
        })
    }

    /// Start consuming uploader progress. Only the first call starts a handler.
    pub fn start(&self) -> Result<Option<JoinHandle<()>>> {
        let Some(events) = self.progress_rx.lock()?.take() else {
            return Ok(None);
        };

        let handler =
            ProgressEventHandler::new(events, self.tracker.clone(), self.shutdown.clone());
        log_info("context", "✓ Progress handler started").unwrap_or_default();
        Ok(Some(handler.start()))
    }

    /// Sender the uploader reports progress through
    pub fn progress_sender(&self) -> ProgressSender {
        self.progress_tx.clone()
    }

    pub fn attach_uploader(&self, uploader: Arc<dyn Uploader>) -> Result<()> {
        *self.uploader.write()? = Some(uploader);
        Ok(())
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }

    // Ingestion

    pub async fn add_paths(&self, paths: Vec<PathBuf>) -> IngestReport {
        self.ingestor.ingest_paths(paths).await
    }

    pub fn add_text(&self, content: String, remote_filename: &str) -> Result<StagedItem> {
        self.ingestor.add_text(content, remote_filename)
    }

    pub fn add_image(&self, base64_payload: &str) -> Result<StagedItem> {
        self.ingestor.add_image(base64_payload)
    }

    pub async fn check_clipboard(&self, clipboard: &dyn Clipboard) -> usize {
        self.ingestor.check_clipboard_content(clipboard).await
    }

    pub async fn preview(&self, path: &Path) -> Result<String> {
        preview_file(path).await
    }

    // Staging queue

    pub fn staged_items(&self) -> Result<Vec<StagedItem>> {
        self.queue.list()
    }

    pub fn remove_item(&self, id: &str) -> Result<bool> {
        let removed = self.queue.dequeue(id)?.is_some();
        if removed {
            self.notify_queue_changed();
        }
        Ok(removed)
    }

    pub fn clear_queue(&self) -> Result<usize> {
        let cleared = self.queue.clear_all()?;
        if cleared > 0 {
            self.notify_queue_changed();
        }
        Ok(cleared)
    }

    pub fn remove_selected(&self) -> Result<usize> {
        let removed = self.queue.remove_selected()?;
        if removed > 0 {
            self.notify_queue_changed();
        }
        Ok(removed)
    }

    fn notify_queue_changed(&self) {
        self.event_bus.publish(AppEventPayload::QueueChanged {
            len: self.queue.len(),
        });
    }

    // Buckets

    pub fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        Ok(self
            .store
            .list_buckets()?
            .iter()
            .map(BucketConfig::summary)
            .collect())
    }

    pub fn save_bucket(&self, bucket: &BucketConfig) -> Result<i64> {
        if bucket.bucket_name.trim().is_empty() {
            return Err(UploaderError::Validation("Bucket name is required".to_string()));
        }
        self.store.put_bucket(bucket)
    }

    /// Delete a bucket; the default bucket reference is cleared on disk and in memory
    pub fn delete_bucket(&self, id: i64) -> Result<bool> {
        let deleted = self.store.delete_bucket(id)?;
        self.settings.forget_bucket(id)?;
        Ok(deleted)
    }

    pub fn default_bucket(&self) -> Result<Option<BucketConfig>> {
        match self.settings.default_bucket_id()? {
            Some(id) => self.store.get_bucket(id),
            None => Ok(None),
        }
    }

    // Uploads

    /// Dispatch staged items to `bucket_id`, or the default bucket when `None`.
    /// Items stay staged until their task succeeds.
    pub async fn upload_staged(
        &self,
        bucket_id: Option<i64>,
        selected_only: bool,
    ) -> Result<Vec<String>> {
        if self.shutdown.is_shutting_down() {
            return Err(UploaderError::Upload("Application is shutting down".to_string()));
        }

        let bucket_id = match bucket_id {
            Some(id) => id,
            None => self
                .settings
                .default_bucket_id()?
                .ok_or_else(|| UploaderError::Validation("No bucket selected".to_string()))?,
        };

        let bucket = self
            .store
            .call(move |store| store.get_bucket(bucket_id))
            .await?
            .ok_or_else(|| UploaderError::NotFound(format!("bucket {}", bucket_id)))?;

        let uploader = self
            .uploader
            .read()?
            .clone()
            .ok_or_else(|| UploaderError::Upload("No uploader attached".to_string()))?;

        let items = if selected_only {
            self.queue.selected()?
        } else {
            self.queue.list()?
        };
        if items.is_empty() {
            return Ok(Vec::new());
        }

        dispatch(uploader.as_ref(), &self.tracker, &bucket, items)
            .await
            .context(&format!("Upload to {}", bucket.bucket_name))
    }

    pub fn tasks(&self) -> Result<Vec<TaskSnapshot>> {
        self.tracker.snapshot()
    }

    pub async fn history(&self, limit: usize) -> Result<Vec<UploadHistoryRecord>> {
        self.store.call(move |store| store.recent_history(limit)).await
    }

    /// Persist app and proxy settings and tell listeners
    pub fn save_settings(&self) -> Result<()> {
        self.settings.save_app_settings()?;
        self.settings.save_proxy_settings()?;
        self.event_bus.publish(AppEventPayload::SettingsSaved);
        Ok(())
    }

    /// Save settings and stop background handlers
    pub fn shutdown(&self) -> Result<()> {
        self.save_settings()?;
        self.shutdown.shutdown();
        log_info("context", "Application context shut down").unwrap_or_default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{UploadProgress, UploadRequest, UploadStatus};

    struct AcceptAll;

    impl Uploader for AcceptAll {
        fn submit(&self, _request: UploadRequest) -> Result<()> {
            Ok(())
        }
    }

    fn context() -> AppContext {
        AppContext::new(Store::open_in_memory().unwrap(), Arc::new(FsPathResolver)).unwrap()
    }

    #[tokio::test]
    async fn test_upload_without_bucket_fails() {
        let ctx = context();
        ctx.attach_uploader(Arc::new(AcceptAll)).unwrap();
        ctx.add_text("hi".to_string(), "hi.txt").unwrap();

        let err = ctx.upload_staged(None, false).await.unwrap_err();
        assert!(err.to_string().contains("No bucket selected"));
    }

    #[tokio::test]
    async fn test_upload_without_uploader_fails() {
        let ctx = context();
        let id = ctx
            .save_bucket(&BucketConfig {
                bucket_name: "photos".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert!(ctx.upload_staged(Some(id), false).await.is_err());
    }

    #[tokio::test]
    async fn test_progress_flows_through_handler() {
        let ctx = context();
        let id = ctx
            .save_bucket(&BucketConfig {
                bucket_name: "photos".to_string(),
                custom_domain: "cdn.example.com".to_string(),
                ..Default::default()
            })
            .unwrap();
        ctx.settings.set_default_bucket(Some(id)).unwrap();
        ctx.attach_uploader(Arc::new(AcceptAll)).unwrap();
        let handle = ctx.start().unwrap().unwrap();
        assert!(ctx.start().unwrap().is_none());

        let mut events = ctx.subscribe();
        ctx.add_text("hello".to_string(), "hello.txt").unwrap();
        let task_ids = ctx.upload_staged(None, false).await.unwrap();
        assert_eq!(task_ids.len(), 1);
        assert_eq!(ctx.staged_items().unwrap().len(), 1);

        ctx.progress_sender()
            .send(UploadProgress::new(&task_ids[0], "hello.txt", UploadStatus::Success))
            .unwrap();

        loop {
            let event = events.recv().await.unwrap();
            if event.payload_type() == "history_recorded" {
                break;
            }
        }

        let history = ctx.history(10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].url.as_deref(), Some("https://cdn.example.com/hello.txt"));
        assert!(ctx.staged_items().unwrap().is_empty());

        ctx.shutdown().unwrap();
        handle.await.unwrap();
        assert!(ctx.upload_staged(None, false).await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_still_records_sent_success() {
        let ctx = context();
        let id = ctx
            .save_bucket(&BucketConfig {
                bucket_name: "photos".to_string(),
                ..Default::default()
            })
            .unwrap();
        ctx.settings.set_default_bucket(Some(id)).unwrap();
        ctx.attach_uploader(Arc::new(AcceptAll)).unwrap();

        ctx.add_text("late".to_string(), "late.txt").unwrap();
        let task_ids = ctx.upload_staged(None, false).await.unwrap();
        ctx.progress_sender()
            .send(UploadProgress::new(&task_ids[0], "late.txt", UploadStatus::Success))
            .unwrap();

        // Stop is already latched when the handler first polls
        ctx.shutdown().unwrap();
        let handle = ctx.start().unwrap().unwrap();
        handle.await.unwrap();

        assert_eq!(ctx.history(10).await.unwrap().len(), 1);
        assert!(ctx.staged_items().unwrap().is_empty());
        assert_eq!(ctx.tracker.status(&task_ids[0]), Some(UploadStatus::Success));
    }
}
