// Library exports for the desktop shell and integration tests

pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod events;
pub mod ingest;
pub mod logging;
pub mod settings;
pub mod shutdown;
pub mod staging;
pub mod upload;

pub use context::AppContext;
pub use error::{Result, UploaderError};
