//! Error types for the CZ ID uploader
//!
//! Each component owns an error enum; [`AppError`] wraps them all so that the
//! binary can pick an exit code and a log category from a single value.

use std::path::PathBuf;
use thiserror::Error;

use crate::constants::exit;

/// Errors raised while discovering samples in a directory
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The input path exists but is not a directory
    #[error("path {path} must be a directory")]
    NotADirectory { path: PathBuf },

    /// Directory traversal failed
    #[error("failed to walk sample directory")]
    Walk(#[from] walkdir::Error),

    /// A paired read file and a single-end file share a sample name
    #[error("found {role} file and single end file for sample '{sample}': {path}, {existing}")]
    MixedRoles {
        sample: String,
        role: &'static str,
        path: PathBuf,
        existing: PathBuf,
    },

    /// Two single-end files for one sample that are not distinct lanes
    #[error("found multiple single end files for sample '{sample}': {path}, {existing}")]
    DuplicateSingle {
        sample: String,
        path: PathBuf,
        existing: PathBuf,
    },

    /// R1 and R2 lane counts differ
    #[error("mismatch in R1 and R2 file count for sample name '{sample}' {r1} != {r2}")]
    CountMismatch { sample: String, r1: usize, r2: usize },

    /// R1 and R2 lanes are not aligned
    #[error("mismatched lane numbers for sample '{sample}': R1 lane {r1_lane:?}, R2 lane {r2_lane:?}")]
    LaneMismatch {
        sample: String,
        r1_lane: Option<u32>,
        r2_lane: Option<u32>,
    },

    /// Too many samples for one upload
    #[error(
        "to not overwhelm CZ ID, please limit your uploads to {limit} samples or fewer per upload"
    )]
    TooManySamples { limit: usize },

    /// Single-sample inputs were invalid
    #[error("invalid sample input: {reason}")]
    InvalidInput { reason: String },

    /// I/O error while inspecting files
    #[error("I/O error during sample discovery")]
    Io(#[from] std::io::Error),
}

/// Errors raised while assembling sample metadata
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The metadata sheet could not be parsed
    #[error("failed to parse metadata CSV")]
    Csv(#[from] csv::Error),

    /// The metadata sheet could not be read
    #[error("failed to read metadata CSV")]
    Io(#[from] std::io::Error),

    /// The reserved sample-name column is absent
    #[error("column '{column}' is required but it was not found")]
    MissingSampleNameColumn { column: &'static str },

    /// A data row is too short to carry the sample name
    #[error("row {row} is missing 'Sample Name'")]
    RowMissingSampleName { row: usize },

    /// Discovered samples have no row in the supplied sheet
    #[error("missing metadata in CSV for samples: {}", names.join(", "))]
    MissingSamples { names: Vec<String> },

    /// A CLI metadatum was not `KEY=VALUE`
    #[error("invalid metadatum '{raw}', expected KEY=VALUE")]
    InvalidMetadatum { raw: String },

    /// Location lookup failed
    #[error("failed to resolve collection location")]
    Geocode(#[source] ApiError),
}

/// Errors raised by the remote API client
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure
    #[error("HTTP request to CZ ID failed")]
    Http(#[from] reqwest::Error),

    /// 401/403 from the service
    #[error("not authenticated with CZ ID, try logging in again")]
    NotAuthenticated,

    /// 426 from the service
    #[error("czid-uploader version out of date, please install the latest version")]
    ClientOutdated,

    /// Any other error status
    #[error("CZ ID API responded with error code {status} for {path}")]
    Status { status: u16, path: String },

    /// No project carries the requested name
    #[error("project '{name}' not found")]
    ProjectNotFound { name: String },

    /// Response body did not match the expected shape
    #[error("unexpected response body from CZ ID")]
    Decode(#[from] serde_json::Error),

    /// Bulk registration reported errors
    #[error("encountered errors while registering samples: {}", errors.join("; "))]
    Registration { errors: Vec<String> },

    /// Base URL or path could not be joined
    #[error("invalid API URL: {url}")]
    InvalidUrl { url: String },

    /// No bearer token available
    #[error("no API token found, set the {var} environment variable")]
    MissingToken { var: String },
}

/// Errors returned by an object storage backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Object or upload does not exist
    #[error("object not found")]
    NotFound,

    /// Access denied, returned instead of not-found under scoped policies
    #[error("access denied")]
    AccessDenied,

    /// Service-side error with a code
    #[error("storage service error {code}: {message}")]
    Service { code: String, message: String },

    /// Network or SDK failure without a service code
    #[error("storage transport error: {0}")]
    Transport(String),
}

/// Errors raised while transferring a file set
#[derive(Error, Debug)]
pub enum TransferError {
    /// Local file I/O failed
    #[error("file I/O error during transfer")]
    Io(#[from] std::io::Error),

    /// Storage backend failed
    #[error("storage request failed for {key}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },

    /// Remote object key could not be parsed
    #[error("invalid remote object key: {key}")]
    InvalidKey { key: String },

    /// A part upload task panicked or was cancelled
    #[error("part upload task failed")]
    PartTask(#[from] tokio::task::JoinError),

    /// Transfer called without any local file
    #[error("no local files supplied for {key}")]
    EmptyInput { key: String },

    /// No local role matches a remote key
    #[error("remote path {key} did not match any of {}", candidates.join(", "))]
    NoMatchingRole {
        key: String,
        candidates: Vec<String>,
    },

    /// Progress display could not be configured
    #[error("progress display error: {0}")]
    Progress(String),
}

/// Errors raised by the upload pipeline itself
#[derive(Error, Debug)]
pub enum UploadError {
    /// Nothing to upload
    #[error("no samples found to upload")]
    NoSamples,

    /// Name reconciliation returned a different number of names
    #[error("error validating sample names: sent {sent}, received {received}")]
    NameCountMismatch { sent: usize, received: usize },

    /// Remote validation rejected the metadata
    #[error("metadata validation failed with {errors} error(s)")]
    MetadataValidationFailed { errors: usize },

    /// Registration returned a sample this run never proposed
    #[error("registered sample '{name}' does not match any local sample")]
    UnknownRegisteredSample { name: String },

    /// Upload options are inconsistent
    #[error("{0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration file unreadable
    #[error("failed to read configuration file")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("{message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Upload(UploadError::MetadataValidationFailed { .. }) => {
                exit::VALIDATION_FAILED
            }
            _ => exit::FATAL,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Upload(upload) => match upload {
                UploadError::Discovery(_) => "discovery",
                UploadError::Metadata(_) => "metadata",
                UploadError::Api(_) => "api",
                UploadError::Transfer(_) => "transfer",
                UploadError::MetadataValidationFailed { .. } => "validation",
                _ => "upload",
            },
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

impl From<DiscoveryError> for AppError {
    fn from(error: DiscoveryError) -> Self {
        AppError::Upload(error.into())
    }
}

impl From<MetadataError> for AppError {
    fn from(error: MetadataError) -> Self {
        AppError::Upload(error.into())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Discovery result type alias
pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

/// Metadata result type alias
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

/// API result type alias
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Storage result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Transfer result type alias
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Upload pipeline result type alias
pub type UploadResult<T> = std::result::Result<T, UploadError>;
