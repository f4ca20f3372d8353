//! CZ ID Uploader Library
//!
//! Discovers sequencing samples on local disk, assembles and validates their
//! metadata against the CZ ID API, registers them in a project and uploads
//! their files to object storage with resumable multipart transfers.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
