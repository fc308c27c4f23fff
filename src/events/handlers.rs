use crate::logging::{log_error, log_info};
use crate::shutdown::ShutdownCoordinator;
use crate::upload::{ProgressReceiver, ProgressTracker, UploadProgress};
use tokio::task::JoinHandle;

/// Feeds progress events from the external uploader into the tracker
pub struct ProgressEventHandler {
    events: ProgressReceiver,
    tracker: ProgressTracker,
    shutdown: ShutdownCoordinator,
}

impl ProgressEventHandler {
    pub fn new(
        events: ProgressReceiver,
        tracker: ProgressTracker,
        shutdown: ShutdownCoordinator,
    ) -> Self {
        Self {
            events,
            tracker,
            shutdown,
        }
    }

    pub fn start(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut stop = self.shutdown.subscribe();

            loop {
                tokio::select! {
                    received = self.events.recv() => {
                        match received {
                            Some(event) => feed_tracker(&self.tracker, event).await,
                            None => {
                                log_info(
                                    "events",
                                    "Progress handler stopped (uploader channel closed)",
                                )
                                .unwrap_or_default();
                                break;
                            }
                        }
                    }
                    _ = async { let _ = stop.wait_for(|stopped| *stopped).await; } => {
                        // Events already sent still count; finish them before stopping
                        while let Ok(event) = self.events.try_recv() {
                            feed_tracker(&self.tracker, event).await;
                        }
                        log_info("events", "Progress handler gracefully shutting down")
                            .unwrap_or_default();
                        break;
                    }
                }
            }
        })
    }
}

async fn feed_tracker(tracker: &ProgressTracker, event: UploadProgress) {
    let task_id = event.task_id.clone();
    if let Err(e) = tracker.on_progress(event).await {
        log_error(
            "upload",
            &format!("Progress handler error for task {}: {}", task_id, e),
        )
        .unwrap_or_default();
    }
}
