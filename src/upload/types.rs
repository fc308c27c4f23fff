use crate::database::BucketConfig;
use crate::staging::StagedItem;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Status of one upload task as reported by the uploader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UploadStatus {
    Uploading {
        progress: f64,
        bytes_uploaded: u64,
        total_bytes: u64,
        speed: f64,
    },
    Success,
    Error {
        message: String,
        code: String,
    },
    Cancelled,
}

impl UploadStatus {
    pub fn uploading(bytes_uploaded: u64, total_bytes: u64, speed: f64) -> Self {
        let progress = if total_bytes > 0 {
            bytes_uploaded as f64 / total_bytes as f64
        } else {
            0.0
        };
        Self::Uploading {
            progress,
            bytes_uploaded,
            total_bytes,
            speed,
        }
        .normalized()
    }

    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code: code.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Uploading { .. })
    }

    /// Clamp inbound progress numbers into a consistent range
    pub fn normalized(self) -> Self {
        match self {
            Self::Uploading {
                progress,
                bytes_uploaded,
                total_bytes,
                speed,
            } => {
                let progress = if progress.is_finite() {
                    progress.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let bytes_uploaded = if total_bytes > 0 {
                    bytes_uploaded.min(total_bytes)
                } else {
                    bytes_uploaded
                };
                let speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
                Self::Uploading {
                    progress,
                    bytes_uploaded,
                    total_bytes,
                    speed,
                }
            }
            other => other,
        }
    }
}

/// Progress event flowing back from the uploader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub task_id: String,
    pub filename: String,
    pub status: UploadStatus,
    /// Unix seconds
    pub timestamp: u64,
}

impl UploadProgress {
    pub fn new(
        task_id: impl Into<String>,
        filename: impl Into<String>,
        status: UploadStatus,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            filename: filename.into(),
            status,
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        }
    }
}

/// What the tracker remembers about a dispatched task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTask {
    pub task_id: String,
    pub item_id: String,
    pub file_name: String,
    pub remote_key: String,
    /// Bucket name
    pub target: String,
    pub url: Option<String>,
}

/// One unit of work handed to the uploader
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub task_id: String,
    pub item: StagedItem,
    pub remote_key: String,
    pub bucket: BucketConfig,
}

pub type ProgressSender = mpsc::UnboundedSender<UploadProgress>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<UploadProgress>;

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_format() {
        let status = UploadStatus::Uploading {
            progress: 0.5,
            bytes_uploaded: 5,
            total_bytes: 10,
            speed: 1.0,
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "uploading": {"progress": 0.5, "bytesUploaded": 5, "totalBytes": 10, "speed": 1.0}
            })
        );
        assert_eq!(serde_json::to_value(UploadStatus::Success).unwrap(), json!("success"));

        let parsed: UploadStatus =
            serde_json::from_value(json!({"error": {"message": "denied", "code": "403"}})).unwrap();
        assert_eq!(parsed, UploadStatus::error("denied", "403"));
    }

    #[test]
    fn test_normalize_clamps_values() {
        let status = UploadStatus::Uploading {
            progress: 1.7,
            bytes_uploaded: 50,
            total_bytes: 40,
            speed: f64::NAN,
        }
        .normalized();

        assert_eq!(
            status,
            UploadStatus::Uploading {
                progress: 1.0,
                bytes_uploaded: 40,
                total_bytes: 40,
                speed: 0.0,
            }
        );

        match UploadStatus::uploading(0, 0, 2.0) {
            UploadStatus::Uploading { progress, .. } => assert_eq!(progress, 0.0),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!UploadStatus::uploading(1, 2, 0.0).is_terminal());
        assert!(UploadStatus::Success.is_terminal());
        assert!(UploadStatus::Cancelled.is_terminal());
        assert!(UploadStatus::error("x", "y").is_terminal());
    }

    #[test]
    fn test_progress_event_camel_case() {
        let event = UploadProgress {
            task_id: "t1".to_string(),
            filename: "a.txt".to_string(),
            status: UploadStatus::Cancelled,
            timestamp: 1_700_000_000,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["taskId"], "t1");
        assert_eq!(value["status"], "cancelled");
    }
}
