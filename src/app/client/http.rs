//! reqwest-backed implementation of the CZ ID API
//!
//! Every request carries the bearer token and speaks JSON. Failures are not
//! retried; a single failed call ends the run.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::config::ClientConfig;
use super::types::{
    MarkUploadedRequest, MarkUploadedSample, ProjectList, RegisteredSample, RegistrationResponse,
    SamplesRequest, UploadCredentials, ValidateMetadataRequest, ValidateMetadataSample,
    ValidateSampleNamesRequest, ValidationReport,
};
use super::RemoteApi;
use crate::app::metadata::{GeoSuggestion, MetadataTable};
use crate::constants::api;
use crate::errors::{ApiError, ApiResult};

/// Map an HTTP status to the error it stands for, if any
pub(crate) fn status_error(status: StatusCode, path: &str) -> Option<ApiError> {
    match status.as_u16() {
        401 | 403 => Some(ApiError::NotAuthenticated),
        426 => Some(ApiError::ClientOutdated),
        code if code >= 400 => Some(ApiError::Status {
            status: code,
            path: path.to_string(),
        }),
        _ => None,
    }
}

/// Client for the CZ ID web API
#[derive(Debug, Clone)]
pub struct CzidClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl CzidClient {
    /// Create a client using the token from the configured environment variable
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the token is missing, the base URL is invalid,
    /// or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let token = config.token_from_env()?;
        Self::with_token(config, token)
    }

    /// Create a client with an explicit bearer token
    pub fn with_token(config: &ClientConfig, token: impl Into<String>) -> ApiResult<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|_| ApiError::InvalidUrl {
            url: config.base_url.clone(),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client: config.build_http_client()?,
            base_url,
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| ApiError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
            })
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        debug!("{} {}", method, path);
        Ok(self
            .client
            .request(method, self.url(path)?)
            .bearer_auth(&self.token))
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> ApiResult<reqwest::Response> {
        let response = builder.send().await?;
        match status_error(response.status(), path) {
            Some(error) => {
                warn!("{} responded with {}", path, response.status());
                Err(error)
            }
            None => Ok(response),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> ApiResult<T> {
        let response = self.send(builder, path).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl RemoteApi for CzidClient {
    async fn get_project_id(&self, name: &str) -> ApiResult<u64> {
        let path = api::PROJECTS_PATH;
        let builder = self.request(Method::GET, path)?.query(&[("basic", "true")]);
        let list: ProjectList = self.execute(builder, path).await?;
        list.projects
            .into_iter()
            .find(|project| project.name == name)
            .map(|project| project.id)
            .ok_or_else(|| ApiError::ProjectNotFound {
                name: name.to_string(),
            })
    }

    async fn validate_sample_names(
        &self,
        project_id: u64,
        names: &[String],
    ) -> ApiResult<Vec<String>> {
        let path = format!("/projects/{}/validate_sample_names", project_id);
        let builder = self
            .request(Method::POST, &path)?
            .json(&ValidateSampleNamesRequest {
                sample_names: names,
                ignore_unuploaded: true,
            });
        self.execute(builder, &path).await
    }

    async fn validate_metadata(
        &self,
        project_id: u64,
        table: &MetadataTable,
    ) -> ApiResult<ValidationReport> {
        let path = api::VALIDATE_METADATA_PATH;
        let samples = table
            .sample_names()
            .into_iter()
            .map(|name| ValidateMetadataSample { name, project_id })
            .collect();
        let builder = self
            .request(Method::POST, path)?
            .json(&ValidateMetadataRequest {
                metadata: table,
                samples,
            });
        self.execute(builder, path).await
    }

    async fn register_samples(&self, request: &SamplesRequest) -> ApiResult<Vec<RegisteredSample>> {
        let path = api::BULK_UPLOAD_PATH;
        let builder = self.request(Method::POST, path)?.json(request);
        let response: RegistrationResponse = self.execute(builder, path).await?;
        if !response.errors.is_empty() {
            println!("encountered errors while uploading");
            for error in &response.errors {
                println!("  {}", error);
            }
            return Err(ApiError::Registration {
                errors: response.errors,
            });
        }
        Ok(response.samples)
    }

    async fn get_upload_credentials(&self, sample_id: u64) -> ApiResult<UploadCredentials> {
        let path = format!("/samples/{}/upload_credentials", sample_id);
        let builder = self.request(Method::GET, &path)?;
        self.execute(builder, &path).await
    }

    async fn mark_uploaded(&self, sample_id: u64, name: &str) -> ApiResult<()> {
        let path = format!("/samples/{}.json", sample_id);
        let builder = self
            .request(Method::PUT, &path)?
            .json(&MarkUploadedRequest {
                sample: MarkUploadedSample {
                    id: sample_id,
                    name,
                    status: api::STATUS_UPLOADED,
                },
            });
        self.send(builder, &path).await?;
        Ok(())
    }

    async fn get_geo_suggestion(&self, query: &str, is_human: bool) -> ApiResult<GeoSuggestion> {
        let path = api::GEO_SEARCH_PATH;
        let builder = self
            .request(Method::GET, path)?
            .query(&[("query", query), ("limit", "1")]);
        let suggestions: Vec<GeoSuggestion> = self.execute(builder, path).await?;
        let mut suggestion = suggestions.into_iter().next().unwrap_or_default();
        if is_human {
            suggestion.coarsen_for_human();
        }
        Ok(suggestion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base_url: &str) -> CzidClient {
        let config = ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        CzidClient::with_token(&config, "token").unwrap()
    }

    #[test]
    fn test_status_policy() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "/p"),
            Some(ApiError::NotAuthenticated)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "/p"),
            Some(ApiError::NotAuthenticated)
        ));
        assert!(matches!(
            status_error(StatusCode::UPGRADE_REQUIRED, "/p"),
            Some(ApiError::ClientOutdated)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "/p"),
            Some(ApiError::Status { status: 500, .. })
        ));
        assert!(status_error(StatusCode::OK, "/p").is_none());
    }

    #[test]
    fn test_url_joining_keeps_base_path() {
        let client = client_for("https://example.org/api");
        assert_eq!(
            client.url("/projects.json").unwrap().as_str(),
            "https://example.org/api/projects.json"
        );

        let client = client_for("https://czid.org");
        assert_eq!(
            client.url("/samples/3/upload_credentials").unwrap().as_str(),
            "https://czid.org/samples/3/upload_credentials"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            CzidClient::with_token(&config, "token"),
            Err(ApiError::InvalidUrl { .. })
        ));
    }
}
