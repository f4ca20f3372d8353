//! In-memory collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use czid_uploader::app::client::{
    RegisteredSample, RemoteApi, RemoteFile, SamplesRequest, UploadCredentials, ValidationReport,
};
use czid_uploader::app::metadata::{GeoSuggestion, MetadataTable};
use czid_uploader::app::transfer::{ObjectKey, ObjectStore, StorageConnector, UploadedPart};
use czid_uploader::errors::{ApiError, ApiResult, StoreError, StoreResult};

pub const BUCKET: &str = "czid-test-bucket";

/// Write `len` bytes of a repeating pattern starting at `seed`
pub fn write_pattern(dir: &Path, name: &str, len: usize, seed: u8) -> PathBuf {
    let path = dir.join(name);
    let body: Vec<u8> = (0..len).map(|i| seed.wrapping_add((i % 251) as u8)).collect();
    std::fs::write(&path, body).unwrap();
    path
}

pub fn remote_key(path: &str) -> String {
    format!("s3://{}/{}", BUCKET, path)
}

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<String, Vec<u8>>,
    uploads: HashMap<String, BTreeMap<i32, Vec<u8>>>,
    next_upload: u32,
    heads: usize,
    puts: usize,
    part_uploads: Vec<i32>,
    creates: usize,
}

/// Object store keeping everything in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    /// Answer missing objects with access denied instead of not found
    pub deny_missing: bool,
    /// Fail every existence check with a service error
    pub fail_head: bool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn denying_missing() -> Arc<Self> {
        Arc::new(Self {
            deny_missing: true,
            ..Default::default()
        })
    }

    pub fn failing_head() -> Arc<Self> {
        Arc::new(Self {
            fail_head: true,
            ..Default::default()
        })
    }

    pub fn insert_object(&self, key: &str, body: Vec<u8>) {
        self.state.lock().unwrap().objects.insert(key.to_string(), body);
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().objects.get(key).cloned()
    }

    /// Start an upload and store the given parts under it
    pub fn seed_upload(&self, parts: BTreeMap<i32, Vec<u8>>) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_upload += 1;
        let id = format!("upload-{}", state.next_upload);
        state.uploads.insert(id.clone(), parts);
        id
    }

    pub fn heads(&self) -> usize {
        self.state.lock().unwrap().heads
    }

    pub fn puts(&self) -> usize {
        self.state.lock().unwrap().puts
    }

    pub fn creates(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn part_uploads(&self) -> Vec<i32> {
        let mut parts = self.state.lock().unwrap().part_uploads.clone();
        parts.sort_unstable();
        parts
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, key: &ObjectKey) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.heads += 1;
        if self.fail_head {
            Err(StoreError::Service {
                code: "InternalError".to_string(),
                message: "we encountered an internal error".to_string(),
            })
        } else if state.objects.contains_key(&key.to_string()) {
            Ok(())
        } else if self.deny_missing {
            Err(StoreError::AccessDenied)
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn put_object(&self, key: &ObjectKey, body: Vec<u8>) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.puts += 1;
        state.objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn create_multipart_upload(&self, _key: &ObjectKey) -> StoreResult<String> {
        let mut state = self.state.lock().unwrap();
        state.creates += 1;
        state.next_upload += 1;
        let id = format!("upload-{}", state.next_upload);
        state.uploads.insert(id.clone(), BTreeMap::new());
        Ok(id)
    }

    async fn list_parts(&self, _key: &ObjectKey, upload_id: &str) -> StoreResult<Vec<UploadedPart>> {
        let state = self.state.lock().unwrap();
        let parts = state.uploads.get(upload_id).ok_or(StoreError::NotFound)?;
        Ok(parts
            .iter()
            .map(|(number, body)| UploadedPart {
                part_number: *number,
                e_tag: format!("etag-{}", number),
                size: body.len() as u64,
            })
            .collect())
    }

    async fn upload_part(
        &self,
        _key: &ObjectKey,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> StoreResult<UploadedPart> {
        let mut state = self.state.lock().unwrap();
        let size = body.len() as u64;
        state
            .uploads
            .get_mut(upload_id)
            .ok_or(StoreError::NotFound)?
            .insert(part_number, body);
        state.part_uploads.push(part_number);
        Ok(UploadedPart {
            part_number,
            e_tag: format!("etag-{}", part_number),
            size,
        })
    }

    async fn complete_multipart_upload(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let mut stored = state.uploads.remove(upload_id).ok_or(StoreError::NotFound)?;
        let mut body = Vec::new();
        for part in parts {
            let bytes = stored.remove(&part.part_number).ok_or(StoreError::Service {
                code: "InvalidPart".to_string(),
                message: format!("part {} was never uploaded", part.part_number),
            })?;
            body.extend(bytes);
        }
        state.objects.insert(key.to_string(), body);
        Ok(())
    }
}

/// Hands out one shared store and counts connections
#[derive(Debug)]
pub struct MemoryConnector {
    pub store: Arc<MemoryStore>,
    connections: Mutex<Vec<String>>,
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            connections: Mutex::new(Vec::new()),
        })
    }

    /// Access key ids seen, one per connection
    pub fn connections(&self) -> Vec<String> {
        self.connections.lock().unwrap().clone()
    }
}

impl StorageConnector for MemoryConnector {
    fn connect(&self, credentials: &UploadCredentials) -> Arc<dyn ObjectStore> {
        self.connections
            .lock()
            .unwrap()
            .push(credentials.access_key_id.clone());
        self.store.clone()
    }
}

#[derive(Debug, Default)]
pub struct ApiCalls {
    pub validated_names: Vec<Vec<String>>,
    pub validated_tables: Vec<MetadataTable>,
    pub registrations: Vec<serde_json::Value>,
    pub credentials: Vec<u64>,
    pub marked: Vec<(u64, String)>,
    pub geocoded: Vec<(String, bool)>,
}

/// Scripted CZ ID API
#[derive(Debug, Default)]
pub struct FakeApi {
    pub project: String,
    /// Renames applied by name validation
    pub renames: HashMap<String, String>,
    pub report: ValidationReport,
    pub fail_mark_for: Option<String>,
    /// Sample left out of the registration response
    pub skip_register: Option<String>,
    pub calls: Mutex<ApiCalls>,
}

impl FakeApi {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            ..Default::default()
        }
    }

    fn sample_id(index: usize) -> u64 {
        100 + index as u64
    }
}

#[async_trait]
impl RemoteApi for FakeApi {
    async fn get_project_id(&self, name: &str) -> ApiResult<u64> {
        if name == self.project {
            Ok(7)
        } else {
            Err(ApiError::ProjectNotFound {
                name: name.to_string(),
            })
        }
    }

    async fn validate_sample_names(&self, _project_id: u64, names: &[String]) -> ApiResult<Vec<String>> {
        self.calls.lock().unwrap().validated_names.push(names.to_vec());
        Ok(names
            .iter()
            .map(|name| self.renames.get(name).cloned().unwrap_or_else(|| name.clone()))
            .collect())
    }

    async fn validate_metadata(
        &self,
        _project_id: u64,
        table: &MetadataTable,
    ) -> ApiResult<ValidationReport> {
        self.calls.lock().unwrap().validated_tables.push(table.clone());
        Ok(self.report.clone())
    }

    async fn register_samples(&self, request: &SamplesRequest) -> ApiResult<Vec<RegisteredSample>> {
        let body = serde_json::to_value(request)?;
        self.calls.lock().unwrap().registrations.push(body);
        Ok(request
            .samples
            .iter()
            .enumerate()
            .filter(|(_, sample)| self.skip_register.as_deref() != Some(sample.name.as_str()))
            .map(|(index, sample)| {
                let id = Self::sample_id(index);
                RegisteredSample {
                    id,
                    name: sample.name.clone(),
                    input_files: sample
                        .input_files_attributes
                        .iter()
                        .map(|file| RemoteFile {
                            s3_path: remote_key(&format!("samples/7/{}/fastqs/{}", id, file.name)),
                            multipart_upload_id: None,
                        })
                        .collect(),
                }
            })
            .collect())
    }

    async fn get_upload_credentials(&self, sample_id: u64) -> ApiResult<UploadCredentials> {
        self.calls.lock().unwrap().credentials.push(sample_id);
        Ok(UploadCredentials {
            access_key_id: format!("key-{}", sample_id),
            secret_access_key: "secret".to_string(),
            session_token: "token".to_string(),
            expiration: None,
        })
    }

    async fn mark_uploaded(&self, sample_id: u64, name: &str) -> ApiResult<()> {
        if self.fail_mark_for.as_deref() == Some(name) {
            return Err(ApiError::Status {
                status: 500,
                path: format!("/samples/{}.json", sample_id),
            });
        }
        self.calls
            .lock()
            .unwrap()
            .marked
            .push((sample_id, name.to_string()));
        Ok(())
    }

    async fn get_geo_suggestion(&self, query: &str, is_human: bool) -> ApiResult<GeoSuggestion> {
        self.calls
            .lock()
            .unwrap()
            .geocoded
            .push((query.to_string(), is_human));
        Ok(GeoSuggestion {
            name: format!("{} County, California, USA", query),
            geo_level: "subdivision".to_string(),
            country_name: "USA".to_string(),
            state_name: "California".to_string(),
            subdivision_name: format!("{} County", query),
            ..Default::default()
        })
    }
}
