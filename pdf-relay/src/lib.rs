// pdf-relay/src/lib.rs
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::ApiResponse;
