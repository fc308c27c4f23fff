//! Upload dispatch and progress tracking. The transfer itself is done by an
//! external `Uploader`.

mod dispatch;
mod tracker;
mod types;

pub use dispatch::{dispatch, Uploader, DISPATCH_ERROR_CODE};
pub use tracker::{ProgressOutcome, ProgressTracker, TaskSnapshot};
pub use types::{
    progress_channel, ProgressReceiver, ProgressSender, UploadProgress, UploadRequest,
    UploadStatus, UploadTask,
};
