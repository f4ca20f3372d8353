//! Boundary to the CZ ID web API
//!
//! The orchestrator talks to the service only through [`RemoteApi`], so tests
//! can substitute an in-memory implementation.
//!
//! - `config`: HTTP client configuration and building
//! - `http`: the reqwest implementation
//! - `types`: request and response bodies

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::app::metadata::{GeoSuggestion, MetadataTable};
use crate::errors::ApiResult;

pub mod config;
pub mod http;
pub mod types;

pub use config::ClientConfig;
pub use http::CzidClient;
pub use types::{
    HostGenome, InputFileAttributes, InputFileType, RegisteredSample, RemoteFile, SampleRequest,
    SamplesRequest, UploadCredentials, ValidationIssue, ValidationIssues, ValidationReport,
};

/// Operations the upload pipeline needs from the service
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Numeric id of the project with this exact name
    async fn get_project_id(&self, name: &str) -> ApiResult<u64>;

    /// Names the service will accept, same length and order as `names`
    async fn validate_sample_names(&self, project_id: u64, names: &[String])
        -> ApiResult<Vec<String>>;

    async fn validate_metadata(
        &self,
        project_id: u64,
        table: &MetadataTable,
    ) -> ApiResult<ValidationReport>;

    /// Create every sample in one call
    async fn register_samples(&self, request: &SamplesRequest) -> ApiResult<Vec<RegisteredSample>>;

    async fn get_upload_credentials(&self, sample_id: u64) -> ApiResult<UploadCredentials>;

    async fn mark_uploaded(&self, sample_id: u64, name: &str) -> ApiResult<()>;

    /// Best match for a free-text location, empty when nothing matched
    async fn get_geo_suggestion(&self, query: &str, is_human: bool) -> ApiResult<GeoSuggestion>;
}
