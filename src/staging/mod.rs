mod queue;
mod types;

pub use queue::StagingQueue;
pub use types::{ImageFormat, ItemKind, StagedContent, StagedItem};
