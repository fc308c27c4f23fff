//! Turns raw inputs (paths, clipboard text, clipboard images) into staged items.

use super::clipboard::Clipboard;
use super::image::{sniff_image_format, to_data_url};
use super::naming::{generate_text_filename, generate_timestamp, ItemIdGenerator};
use super::paths::{normalize_relative_path, FileDetail, PathResolver};
use crate::error::{Result, UploaderError};
use crate::events::{AppEventPayload, EventBus};
use crate::logging::{log_info, log_warn};
use crate::staging::{StagedItem, StagingQueue};
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub staged: usize,
    pub failures: Vec<IngestFailure>,
}

#[derive(Clone)]
pub struct Ingestor {
    queue: StagingQueue,
    resolver: Arc<dyn PathResolver>,
    bus: EventBus,
    ids: Arc<ItemIdGenerator>,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("queue", &self.queue)
            .field("resolver", &"<path resolver>")
            .field("bus", &self.bus)
            .finish()
    }
}

impl Ingestor {
    pub fn new(queue: StagingQueue, resolver: Arc<dyn PathResolver>, bus: EventBus) -> Self {
        Self {
            queue,
            resolver,
            bus,
            ids: Arc::new(ItemIdGenerator::new()),
        }
    }

    /// Stage every file under `paths`. Each path is resolved on its own task;
    /// a failing path is reported and alerted without stopping the others.
    pub async fn ingest_paths<I, P>(&self, paths: I) -> IngestReport
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let handles: Vec<_> = paths
            .into_iter()
            .map(|path| {
                let ingestor = self.clone();
                let path = path.into();
                tokio::spawn(async move { ingestor.ingest_path(path).await })
            })
            .collect();

        let mut report = IngestReport::default();
        for handle in handles {
            match handle.await {
                Ok(Ok(staged)) => report.staged += staged,
                Ok(Err(failure)) => report.failures.push(failure),
                Err(e) => report.failures.push(IngestFailure {
                    path: PathBuf::new(),
                    message: format!("Ingestion task failed: {}", e),
                }),
            }
        }
        report
    }

    async fn ingest_path(&self, path: PathBuf) -> std::result::Result<usize, IngestFailure> {
        let resolver = Arc::clone(&self.resolver);
        let resolve_path = path.clone();
        let resolved = tokio::task::spawn_blocking(move || resolver.resolve(&resolve_path))
            .await
            .map_err(UploaderError::from)
            .and_then(|result| result);

        let details = match resolved {
            Ok(details) => details,
            Err(e) => {
                let message = format!("Failed to get file details for '{}': {}", path.display(), e);
                log_warn("ingest", &message).unwrap_or_default();
                self.bus.alert(message.clone());
                return Err(IngestFailure { path, message });
            }
        };

        let items = file_items(details);
        let staged = self.queue.enqueue_batch(items).map_err(|e| IngestFailure {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if staged > 0 {
            log_info(
                "ingest",
                &format!("✓ Staged {} file(s) from {}", staged, path.display()),
            )
            .unwrap_or_default();
            self.notify_queue_changed();
        }
        Ok(staged)
    }

    /// Stage a text snippet under the given remote name
    pub fn add_text(
        &self,
        content: String,
        remote_filename: impl Into<String>,
    ) -> Result<StagedItem> {
        let item = StagedItem::text(self.ids.next_id(), content, remote_filename);
        self.stage(item)
    }

    /// Stage clipboard text as `<timestamp>.txt`
    pub fn add_clipboard_text(&self, content: String) -> Result<StagedItem> {
        self.add_text(content, generate_text_filename())
    }

    /// Stage a base64 image; the format comes from the payload prefix
    pub fn add_image(&self, base64_payload: &str) -> Result<StagedItem> {
        let payload = base64_payload.trim();
        if payload.is_empty() {
            return Err(UploaderError::Validation("Empty image payload".to_string()));
        }

        let format = sniff_image_format(payload);
        let remote_filename = format!("{}.{}", generate_timestamp(), format.extension());
        let item = StagedItem::image(
            self.ids.next_id(),
            to_data_url(format, payload),
            format,
            remote_filename,
        );
        self.stage(item)
    }

    /// Stage raw image bytes (encoded to base64 first)
    pub fn add_image_bytes(&self, bytes: &[u8]) -> Result<StagedItem> {
        self.add_image(&general_purpose::STANDARD.encode(bytes))
    }

    /// Pull whatever the clipboard holds: text, then image, then file list.
    /// Clipboard failures are logged and never propagate.
    pub async fn check_clipboard_content(&self, clipboard: &dyn Clipboard) -> usize {
        let mut staged = 0;

        match self.stage_clipboard_text(clipboard) {
            Ok(count) => staged += count,
            Err(e) => {
                log_warn("ingest", &format!("clipboard text error: {}", e)).unwrap_or_default()
            }
        }

        match self.stage_clipboard_image(clipboard) {
            Ok(count) => staged += count,
            Err(e) => {
                log_warn("ingest", &format!("clipboard image error: {}", e)).unwrap_or_default()
            }
        }

        let files = match clipboard.has_files() {
            Ok(true) => clipboard.read_files(),
            Ok(false) => Ok(Vec::new()),
            Err(e) => Err(e),
        };
        match files {
            Ok(files) if !files.is_empty() => staged += self.ingest_paths(files).await.staged,
            Ok(_) => {}
            Err(e) => {
                log_warn("ingest", &format!("clipboard files error: {}", e)).unwrap_or_default()
            }
        }

        staged
    }

    fn stage_clipboard_text(&self, clipboard: &dyn Clipboard) -> Result<usize> {
        if !clipboard.has_text()? {
            return Ok(0);
        }
        self.add_clipboard_text(clipboard.read_text()?)?;
        Ok(1)
    }

    fn stage_clipboard_image(&self, clipboard: &dyn Clipboard) -> Result<usize> {
        if !clipboard.has_image()? {
            return Ok(0);
        }
        self.add_image(&clipboard.read_image_base64()?)?;
        Ok(1)
    }

    fn stage(&self, item: StagedItem) -> Result<StagedItem> {
        self.queue.enqueue(item.clone())?;
        self.notify_queue_changed();
        Ok(item)
    }

    fn notify_queue_changed(&self) {
        self.bus.publish(AppEventPayload::QueueChanged {
            len: self.queue.len(),
        });
    }
}

fn file_items(details: Vec<FileDetail>) -> Vec<StagedItem> {
    details
        .into_iter()
        .filter(|detail| !detail.is_dir)
        .map(|detail| {
            let remote_filename = normalize_relative_path(&detail.relative_path);
            StagedItem::file(detail.id, PathBuf::from(detail.path), remote_filename)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::paths::FsPathResolver;
    use crate::staging::{ImageFormat, ItemKind, StagedContent};
    use std::path::Path;
    use std::sync::Mutex;

    fn ingestor(resolver: Arc<dyn PathResolver>) -> (Ingestor, StagingQueue, EventBus) {
        let queue = StagingQueue::new();
        let bus = EventBus::new(64);
        (Ingestor::new(queue.clone(), resolver, bus.clone()), queue, bus)
    }

    struct FailingResolver;

    impl PathResolver for FailingResolver {
        fn resolve(&self, path: &Path) -> Result<Vec<FileDetail>> {
            if path.to_string_lossy().contains("locked") {
                return Err(UploaderError::Ingestion("permission denied".to_string()));
            }
            FsPathResolver.resolve(path)
        }
    }

    #[test]
    fn test_add_png_image() {
        let (ingestor, queue, _bus) = ingestor(Arc::new(FsPathResolver));

        let item = ingestor.add_image("iVBORw0KGgoAAAANSUhEUg").unwrap();
        assert_eq!(item.kind(), ItemKind::Image);
        assert!(item.remote_filename().ends_with(".png"));
        match item.content() {
            StagedContent::Image { file_content, format } => {
                assert_eq!(*format, ImageFormat::Png);
                assert!(file_content.starts_with("data:image/png;base64,iVBORw0KGgo"));
            }
            other => panic!("unexpected content {:?}", other),
        }
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_image_extension_per_format() {
        let (ingestor, _queue, _bus) = ingestor(Arc::new(FsPathResolver));
        let cases = [
            ("/9j/4AAQ", ".jpeg", "data:image/jpeg;base64,"),
            ("R0lGODlhAQ", ".gif", "data:image/gif;base64,"),
            ("UklGRiQA", ".webp", "data:image/webp;base64,"),
            ("AAAAAAAA", ".png", "data:image/png;base64,"),
        ];
        for (payload, ext, prefix) in cases {
            let item = ingestor.add_image(payload).unwrap();
            assert!(item.remote_filename().ends_with(ext), "{}", payload);
            match item.content() {
                StagedContent::Image { file_content, .. } => {
                    assert!(file_content.starts_with(prefix))
                }
                other => panic!("unexpected content {:?}", other),
            }
        }
    }

    #[test]
    fn test_add_image_bytes_encodes() {
        let (ingestor, _queue, _bus) = ingestor(Arc::new(FsPathResolver));
        let item = ingestor
            .add_image_bytes(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'])
            .unwrap();
        assert!(item.remote_filename().ends_with(".png"));
        assert!(ingestor.add_image("   ").is_err());
    }

    #[test]
    fn test_clipboard_text_and_image_get_distinct_ids() {
        let (ingestor, queue, _bus) = ingestor(Arc::new(FsPathResolver));
        let text = ingestor.add_clipboard_text("hello".to_string()).unwrap();
        let image = ingestor.add_image("R0lGODlh").unwrap();

        assert_ne!(text.id(), image.id());
        assert!(text.remote_filename().ends_with(".txt"));
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_bad_path_does_not_abort_batch() {
        let temp = tempfile::tempdir().unwrap();
        let good = temp.path().join("good.txt");
        std::fs::write(&good, "ok").unwrap();

        let (ingestor, queue, bus) = ingestor(Arc::new(FailingResolver));
        let mut events = bus.subscribe();

        let report = ingestor
            .ingest_paths(vec![temp.path().join("locked"), good.clone()])
            .await;

        assert_eq!(report.staged, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].message.contains("permission denied"));
        assert_eq!(queue.list().unwrap()[0].file_path(), Some(good.as_path()));

        let mut saw_alert = false;
        while let Ok(event) = events.try_recv() {
            if event.payload_type() == "alert" {
                saw_alert = true;
            }
        }
        assert!(saw_alert);
    }

    struct FakeClipboard {
        text: Option<String>,
        image: Option<String>,
        files: Mutex<Vec<String>>,
    }

    impl Clipboard for FakeClipboard {
        fn has_text(&self) -> Result<bool> {
            Ok(self.text.is_some())
        }
        fn read_text(&self) -> Result<String> {
            self.text
                .clone()
                .ok_or_else(|| UploaderError::Ingestion("no text".to_string()))
        }
        fn has_image(&self) -> Result<bool> {
            Err(UploaderError::Ingestion("clipboard busy".to_string()))
        }
        fn read_image_base64(&self) -> Result<String> {
            self.image
                .clone()
                .ok_or_else(|| UploaderError::Ingestion("no image".to_string()))
        }
        fn has_files(&self) -> Result<bool> {
            Ok(!self.files.lock().unwrap().is_empty())
        }
        fn read_files(&self) -> Result<Vec<String>> {
            Ok(self.files.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn test_clipboard_errors_are_contained() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("copied.md");
        std::fs::write(&file, "# copied").unwrap();

        let clipboard = FakeClipboard {
            text: Some("snippet".to_string()),
            image: Some("iVBORw0KGgo".to_string()),
            files: Mutex::new(vec![file.to_string_lossy().into_owned()]),
        };

        let (ingestor, queue, _bus) = ingestor(Arc::new(FsPathResolver));
        let staged = ingestor.check_clipboard_content(&clipboard).await;

        // image check failed, text and file still staged
        assert_eq!(staged, 2);
        let kinds: Vec<ItemKind> = queue.list().unwrap().iter().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec![ItemKind::Text, ItemKind::File]);
    }
}
