//! Resumable transfer of sample files to object storage
//!
//! - `engine`: skip/direct/multipart decision and the bounded part pool
//! - `store`: the [`ObjectStore`] seam and its S3 implementation
//! - `lanes`: lazy concatenation of lane files
//! - `progress`: part-completion queue and progress bar

pub mod engine;
pub mod lanes;
pub mod progress;
pub mod store;

pub use engine::{TransferConfig, TransferEngine, TransferOutcome};
pub use lanes::LaneReader;
pub use progress::{PartProgress, ProgressReporter};
pub use store::{ObjectKey, ObjectStore, S3Connector, S3Store, StorageConnector, UploadedPart};
