// Public modules
pub mod artifact;
pub mod config;
pub mod db_sync;
pub mod env_file;
pub mod env_generate;
pub mod error;
pub mod files;
pub mod local_site;
pub mod recipe;
pub mod shared;
pub mod ssh;
pub mod transport;
pub mod url;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
