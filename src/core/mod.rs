// Public modules
pub mod azure;
pub mod error;
pub mod naming;
pub mod provision;
pub mod sample_data;
pub mod summary;

// Public modules for CLI access
pub mod config;
pub mod defaults;
pub mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
