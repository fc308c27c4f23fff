mod clipboard;
mod image;
mod naming;
mod paths;
mod pipeline;
mod preview;

pub use clipboard::Clipboard;
pub use image::{sniff_image_format, to_data_url};
pub use naming::{generate_text_filename, generate_timestamp, ItemIdGenerator};
pub use paths::{
    file_id, normalize_relative_path, normalize_relative_path_with, FileDetail, FsPathResolver,
    PathResolver,
};
pub use pipeline::{IngestFailure, IngestReport, Ingestor};
pub use preview::{preview_file, MAX_PREVIEW_LINES, MAX_PREVIEW_SIZE};
