pub mod config;
pub mod error;
pub mod types;

pub use config::{ServiceConfig, StorageBackend};
pub use error::ServiceError;
pub use types::merge_patch;
