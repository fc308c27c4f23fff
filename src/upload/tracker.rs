//! Per-task upload status with sticky terminal states.
//!
//! The uploader may deliver events late, twice or out of order. Once a task
//! reaches `success`, `error` or `cancelled` every later event for it is
//! dropped, which also makes the history append on success happen once.

use super::types::{UploadProgress, UploadStatus, UploadTask};
use crate::database::{Store, UploadHistoryRecord};
use crate::error::{Result, UploaderError};
use crate::events::{AppEventPayload, EventBus};
use crate::logging::{log_debug, log_info, log_warn};
use crate::staging::StagingQueue;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct TaskEntry {
    task: Option<UploadTask>,
    latest: UploadProgress,
}

/// What `on_progress` did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressOutcome {
    /// Latest status replaced
    Updated,
    /// First success for a known task; history row written
    Completed { history_id: i64 },
    /// Task was already terminal
    Ignored,
    /// Task id was never registered; status kept without history
    Untracked,
}

/// UI view of one task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub task_id: String,
    pub item_id: Option<String>,
    pub filename: String,
    pub remote_key: Option<String>,
    pub status: UploadStatus,
    pub timestamp: u64,
}

#[derive(Clone)]
pub struct ProgressTracker {
    tasks: Arc<Mutex<IndexMap<String, TaskEntry>>>,
    store: Store,
    queue: StagingQueue,
    bus: EventBus,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("tasks", &"<task map>")
            .field("store", &self.store)
            .finish()
    }
}

impl ProgressTracker {
    pub fn new(store: Store, queue: StagingQueue, bus: EventBus) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(IndexMap::new())),
            store,
            queue,
            bus,
        }
    }

    /// Start tracking a dispatched task at 0%
    pub fn register(&self, task: UploadTask) -> Result<()> {
        let mut tasks = self.tasks.lock()?;
        if tasks.contains_key(&task.task_id) {
            return Err(UploaderError::Validation(format!(
                "Task {} is already registered",
                task.task_id
            )));
        }

        let latest = UploadProgress::new(
            task.task_id.clone(),
            task.file_name.clone(),
            UploadStatus::uploading(0, 0, 0.0),
        );
        tasks.insert(
            task.task_id.clone(),
            TaskEntry {
                task: Some(task),
                latest,
            },
        );
        Ok(())
    }

    pub async fn on_progress(&self, event: UploadProgress) -> Result<ProgressOutcome> {
        let event = UploadProgress {
            status: event.status.normalized(),
            ..event
        };

        // Check-and-set under one lock so two terminal events cannot both pass
        let applied = {
            let mut tasks = self.tasks.lock()?;
            match tasks.get_mut(&event.task_id) {
                Some(entry) if entry.latest.status.is_terminal() => None,
                Some(entry) => {
                    entry.latest = event.clone();
                    Some(entry.task.clone())
                }
                None => {
                    tasks.insert(
                        event.task_id.clone(),
                        TaskEntry {
                            task: None,
                            latest: event.clone(),
                        },
                    );
                    Some(None)
                }
            }
        };

        let Some(task) = applied else {
            log_debug(
                "upload",
                &format!("Ignoring event for finished task {}", event.task_id),
            )
            .unwrap_or_default();
            return Ok(ProgressOutcome::Ignored);
        };

        self.bus.publish(AppEventPayload::TaskUpdated {
            progress: event.clone(),
        });

        let Some(task) = task else {
            log_warn(
                "upload",
                &format!("Progress for unknown task {}", event.task_id),
            )
            .unwrap_or_default();
            return Ok(ProgressOutcome::Untracked);
        };

        match &event.status {
            UploadStatus::Success => self.complete(task).await,
            UploadStatus::Error { message, code } => {
                log_warn(
                    "upload",
                    &format!("✗ Upload of {} failed [{}]: {}", task.remote_key, code, message),
                )
                .unwrap_or_default();
                Ok(ProgressOutcome::Updated)
            }
            _ => Ok(ProgressOutcome::Updated),
        }
    }

    async fn complete(&self, task: UploadTask) -> Result<ProgressOutcome> {
        let mut record = UploadHistoryRecord::new(&task.file_name, &task.remote_key, &task.target);
        record.url = task.url.clone();

        let to_store = record.clone();
        let history_id = self
            .store
            .call(move |store| store.append_history(&to_store))
            .await?;
        record.id = Some(history_id);

        if self.queue.dequeue(&task.item_id)?.is_some() {
            self.bus.publish(AppEventPayload::QueueChanged {
                len: self.queue.len(),
            });
        }

        log_info(
            "upload",
            &format!("✓ Uploaded {} to {}", task.remote_key, task.target),
        )
        .unwrap_or_default();
        self.bus.publish(AppEventPayload::HistoryRecorded { record });

        Ok(ProgressOutcome::Completed { history_id })
    }

    pub fn status(&self, task_id: &str) -> Option<UploadStatus> {
        self.tasks
            .lock()
            .ok()?
            .get(task_id)
            .map(|entry| entry.latest.status.clone())
    }

    /// All known tasks in dispatch order
    pub fn snapshot(&self) -> Result<Vec<TaskSnapshot>> {
        Ok(self
            .tasks
            .lock()?
            .values()
            .map(|entry| TaskSnapshot {
                task_id: entry.latest.task_id.clone(),
                item_id: entry.task.as_ref().map(|t| t.item_id.clone()),
                filename: entry.latest.filename.clone(),
                remote_key: entry.task.as_ref().map(|t| t.remote_key.clone()),
                status: entry.latest.status.clone(),
                timestamp: entry.latest.timestamp,
            })
            .collect())
    }

    pub fn clear(&self, task_id: &str) -> Result<bool> {
        Ok(self.tasks.lock()?.shift_remove(task_id).is_some())
    }

    /// Drop every task that reached a terminal state
    pub fn clear_finished(&self) -> Result<usize> {
        let mut tasks = self.tasks.lock()?;
        let before = tasks.len();
        tasks.retain(|_, entry| !entry.latest.status.is_terminal());
        Ok(before - tasks.len())
    }
}
