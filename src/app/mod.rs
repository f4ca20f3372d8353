//! Core application logic for the CZ ID uploader
//!
//! - `discovery`: grouping local sequencing files into samples
//! - `metadata`: metadata sheets, command-line metadata and geocoding
//! - `client`: the CZ ID API boundary
//! - `workflow`: pipelines and per-run sample options
//! - `transfer`: resumable multipart uploads to object storage
//! - `orchestrator`: the stage-by-stage upload pipeline
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use czid_uploader::app::{samples_from_dir, CzidClient, ClientConfig, S3Connector, TransferConfig};
//! use czid_uploader::app::orchestrator::UploadOrchestrator;
//! use czid_uploader::app::workflow::Workflow;
//! use czid_uploader::config::UploadConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let samples = samples_from_dir("fastqs".as_ref(), false)?;
//! let client = CzidClient::new(&ClientConfig::default())?;
//! let mut orchestrator = UploadOrchestrator::new(
//!     Arc::new(client),
//!     Arc::new(S3Connector::default()),
//!     TransferConfig::default(),
//!     UploadConfig::new("My Project", Workflow::ShortReadMngs),
//! );
//! let summary = orchestrator.run(samples).await?;
//! println!("uploaded {} samples", summary.completed.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod discovery;
pub mod metadata;
pub mod orchestrator;
pub mod transfer;
pub mod workflow;

// Re-export main public API
pub use client::{ClientConfig, CzidClient, RemoteApi};
pub use discovery::{samples_from_dir, SampleFileSet};
pub use metadata::{GeoCache, Metadata, MetadataTable};
pub use orchestrator::{UploadOrchestrator, UploadStage, UploadSummary};
pub use transfer::{ObjectStore, S3Connector, StorageConnector, TransferConfig, TransferEngine};
pub use workflow::{SampleOptions, Workflow};
