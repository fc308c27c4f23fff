use crate::database::UploadHistoryRecord;
use crate::upload::UploadProgress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sequence number for ordering events
pub type EventSequence = u64;

/// Events the UI layer listens to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppEvent {
    pub sequence: EventSequence,
    pub timestamp: DateTime<Utc>,
    pub payload: AppEventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEventPayload {
    /// Non-fatal problem the user should see (e.g. a dropped path failed)
    Alert { message: String },

    /// Staging queue contents changed
    QueueChanged { len: usize },

    /// Latest status of an upload task
    TaskUpdated { progress: UploadProgress },

    /// A successful upload was written to history
    HistoryRecorded { record: UploadHistoryRecord },

    /// App or proxy settings were saved
    SettingsSaved,
}

impl AppEvent {
    pub fn payload_type(&self) -> &str {
        match &self.payload {
            AppEventPayload::Alert { .. } => "alert",
            AppEventPayload::QueueChanged { .. } => "queue_changed",
            AppEventPayload::TaskUpdated { .. } => "task_updated",
            AppEventPayload::HistoryRecorded { .. } => "history_recorded",
            AppEventPayload::SettingsSaved => "settings_saved",
        }
    }

    /// Task id for task-scoped events
    pub fn task_id(&self) -> Option<&str> {
        match &self.payload {
            AppEventPayload::TaskUpdated { progress } => Some(&progress.task_id),
            _ => None,
        }
    }
}
