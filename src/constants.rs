//! Application constants for the CZ ID uploader
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Default environment variable holding the API bearer token
    pub const TOKEN: &str = "CZID_TOKEN";

    /// Environment variable overriding the API base URL
    pub const BASE_URL: &str = "CZID_BASE_URL";
}

/// Remote API endpoints and wire constants
pub mod api {
    use super::Duration;

    /// Default CZ ID API base URL
    pub const DEFAULT_BASE_URL: &str = "https://czid.org";

    /// User agent sent with every request
    pub const USER_AGENT: &str = concat!("czid-uploader/", env!("CARGO_PKG_VERSION"));

    /// Default request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Project listing
    pub const PROJECTS_PATH: &str = "/projects.json";

    /// Bulk sample registration
    pub const BULK_UPLOAD_PATH: &str = "/samples/bulk_upload_with_metadata.json";

    /// Metadata validation for new samples
    pub const VALIDATE_METADATA_PATH: &str = "/metadata/validate_csv_for_new_samples.json";

    /// Free-text location search
    pub const GEO_SEARCH_PATH: &str = "/locations/external_search";

    /// Status written when a sample is registered
    pub const STATUS_CREATED: &str = "created";

    /// Status written once every file of a sample is transferred
    pub const STATUS_UPLOADED: &str = "uploaded";

    /// `source_type` for locally uploaded input files
    pub const SOURCE_TYPE_LOCAL: &str = "local";

    /// `upload_client` reported for input files
    pub const UPLOAD_CLIENT: &str = "cli";
}

/// Sample discovery limits
pub mod discovery {
    /// Maximum samples accepted per invocation (service-side batch limit)
    pub const MAX_SAMPLES_PER_UPLOAD: usize = 500;
}

/// Metadata field names
pub mod metadata {
    /// Reserved spreadsheet column identifying the sample
    pub const SAMPLE_NAME_COLUMN: &str = "Sample Name";

    /// Normalized name of the host organism field
    pub const HOST_GENOME_FIELD: &str = "Host Organism";

    /// Normalized name of the collection location field
    pub const COLLECTION_LOCATION_FIELD: &str = "Collection Location";

    /// Spellings folded into the host genome attribute
    pub const HOST_GENOME_ALIASES: &[&str] = &[
        "host_genome",
        "Host Genome",
        "Host genome",
        "host genome",
        "host_organism",
        "Host Organism",
        "Host organism",
        "host organism",
    ];

    /// Spellings folded into the raw collection location
    pub const COLLECTION_LOCATION_ALIASES: &[&str] = &[
        "collection location",
        "Collection Location",
        "Collection location",
        "collection_location",
    ];

    /// Host genome value marking human samples
    pub const HUMAN_HOST: &str = "human";
}

/// Object storage transfer configuration
pub mod transfer {
    /// Smallest part the storage service accepts in a multipart upload (5 MiB)
    pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

    /// Default part size
    pub const DEFAULT_PART_SIZE: u64 = MIN_PART_SIZE;

    /// Maximum number of parts in one multipart upload
    pub const MAX_PARTS: u64 = 10_000;

    /// Region hosting the upload buckets
    pub const DEFAULT_REGION: &str = "us-west-2";

    /// Capacity of the part-completion queue feeding the progress reporter
    pub const PROGRESS_QUEUE_CAPACITY: usize = 64;

    /// Object key scheme used by the remote API
    pub const S3_SCHEME: &str = "s3";
}

/// Process exit codes
pub mod exit {
    /// Remote metadata validation rejected the input
    pub const VALIDATION_FAILED: i32 = 2;

    /// Any other unrecoverable error
    pub const FATAL: i32 = 1;
}

/// Progress display
pub mod progress {
    /// Template for byte-granularity transfer bars
    pub const BAR_TEMPLATE: &str =
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {bytes_per_sec}";
}

pub use api::{DEFAULT_BASE_URL, USER_AGENT};
pub use discovery::MAX_SAMPLES_PER_UPLOAD;
pub use transfer::{DEFAULT_PART_SIZE, MIN_PART_SIZE};
