//! Command-line interface components
//!
//! Argument parsing and the command handlers that drive the upload pipeline.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, GlobalArgs, UploadArgs, UploadSampleArgs, UploadSamplesArgs};
pub use commands::{handle_upload_sample, handle_upload_samples};
