//! Upload pipeline
//!
//! [`UploadOrchestrator`] walks a batch of samples through a fixed sequence
//! of stages: project lookup, name reconciliation, metadata resolution,
//! remote validation, registration, and then one sample at a time credential
//! acquisition, file transfer and marking as uploaded. Any error ends the run.

pub mod record;
pub mod registration;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::app::client::RemoteApi;
use crate::app::discovery::SampleFileSet;
use crate::app::metadata::{load_metadata, parse_metadata_pairs, GeoCache, LocationRewrite};
use crate::app::transfer::{ObjectKey, StorageConnector, TransferConfig, TransferEngine, TransferOutcome};
use crate::config::UploadConfig;
use crate::errors::{TransferError, UploadError, UploadResult};

pub use record::{RemoteSample, SampleBatch, SampleRecord};
pub use registration::build_samples_request;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Pending,
    ResolveProject,
    ReconcileSampleNames,
    ResolveMetadata,
    ValidateMetadata,
    RegisterSamples,
    TransferSamples,
    Complete,
}

impl UploadStage {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStage::Pending => "pending",
            UploadStage::ResolveProject => "resolve project",
            UploadStage::ReconcileSampleNames => "reconcile sample names",
            UploadStage::ResolveMetadata => "resolve metadata",
            UploadStage::ValidateMetadata => "validate metadata",
            UploadStage::RegisterSamples => "register samples",
            UploadStage::TransferSamples => "transfer samples",
            UploadStage::Complete => "complete",
        }
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sample whose files are all in storage and that the service knows is uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSample {
    pub id: u64,
    pub name: String,
    /// One outcome per remote file, in registration order
    pub outcomes: Vec<TransferOutcome>,
}

/// Result of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub project_id: u64,
    /// `(local, accepted)` names the service changed
    pub renamed: Vec<(String, String)>,
    pub rewrites: Vec<LocationRewrite>,
    pub completed: Vec<CompletedSample>,
}

/// Drives a batch of samples from local files to uploaded samples
pub struct UploadOrchestrator {
    api: Arc<dyn RemoteApi>,
    connector: Arc<dyn StorageConnector>,
    transfer: TransferConfig,
    config: UploadConfig,
    geo_cache: GeoCache,
    stage: UploadStage,
}

impl UploadOrchestrator {
    pub fn new(
        api: Arc<dyn RemoteApi>,
        connector: Arc<dyn StorageConnector>,
        transfer: TransferConfig,
        config: UploadConfig,
    ) -> Self {
        Self {
            api,
            connector,
            transfer,
            config,
            geo_cache: GeoCache::new(),
            stage: UploadStage::Pending,
        }
    }

    /// Stage reached so far; after a failure, the stage that failed
    pub fn stage(&self) -> UploadStage {
        self.stage
    }

    pub fn geo_cache(&self) -> &GeoCache {
        &self.geo_cache
    }

    fn enter(&mut self, stage: UploadStage) {
        debug!("upload stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Upload every sample in `samples`
    ///
    /// # Errors
    ///
    /// Returns `UploadError::MetadataValidationFailed` when the service rejects
    /// the metadata, and any other `UploadError` for input, API, or transfer
    /// failures. Samples completed before a transfer failure are logged.
    pub async fn run(
        &mut self,
        mut samples: BTreeMap<String, SampleFileSet>,
    ) -> UploadResult<UploadSummary> {
        if samples.is_empty() {
            return Err(UploadError::NoSamples);
        }

        let options = self.config.options.resolve(self.config.workflow)?;
        for files in samples.values_mut() {
            files.attach_consensus_inputs(
                options.reference_fasta.as_deref(),
                options.primer_bed.as_deref(),
            );
        }
        let cli_metadata = parse_metadata_pairs(&self.config.metadata)?;
        let metadata = load_metadata(
            samples.keys().map(String::as_str),
            &cli_metadata,
            self.config.metadata_csv.as_deref(),
        )?;
        let mut batch = SampleBatch::prepare(samples, metadata);
        info!(
            "uploading {} samples to project '{}' with workflow {}",
            batch.len(),
            self.config.project,
            options.workflow
        );

        self.enter(UploadStage::ResolveProject);
        let project_id = self.api.get_project_id(&self.config.project).await?;
        debug!("project '{}' has id {}", self.config.project, project_id);

        self.enter(UploadStage::ReconcileSampleNames);
        let accepted = self
            .api
            .validate_sample_names(project_id, &batch.names())
            .await?;
        let renamed = batch.apply_renames(&accepted)?;
        for (old, new) in &renamed {
            println!("  sample name \"{}\" is taken, using \"{}\"", old, new);
            info!("renamed sample '{}' to '{}'", old, new);
        }

        self.enter(UploadStage::ResolveMetadata);
        let rewrites = self
            .geo_cache
            .resolve_all(self.api.as_ref(), batch.metadata_mut())
            .await?;

        self.enter(UploadStage::ValidateMetadata);
        let report = self
            .api
            .validate_metadata(project_id, &batch.metadata_table())
            .await?;
        let printed = report.to_string();
        if !printed.is_empty() {
            print!("{}", printed);
        }
        if report.has_errors() {
            warn!("metadata validation failed for project {}", project_id);
            return Err(UploadError::MetadataValidationFailed {
                errors: report.issues.errors.len(),
            });
        }

        self.enter(UploadStage::RegisterSamples);
        let request = build_samples_request(project_id, &batch, &options);
        let registered = self.api.register_samples(&request).await?;
        info!("registered {} samples", registered.len());
        batch.attach_registrations(registered)?;
        let skipped = batch.unregistered();
        if !skipped.is_empty() {
            warn!(
                "{} samples were not registered and will not be uploaded: {}",
                skipped.len(),
                skipped.join(", ")
            );
        }

        self.enter(UploadStage::TransferSamples);
        let mut completed = Vec::new();
        for (record, remote) in batch.registered() {
            match self.upload_sample(record, remote).await {
                Ok(outcomes) => {
                    info!("sample '{}' ({}) uploaded", record.name, remote.id);
                    completed.push(CompletedSample {
                        id: remote.id,
                        name: record.name.clone(),
                        outcomes,
                    });
                }
                Err(err) => {
                    error!("upload of sample '{}' ({}) failed: {}", record.name, remote.id, err);
                    log_completed(&completed);
                    return Err(err);
                }
            }
        }

        self.enter(UploadStage::Complete);
        Ok(UploadSummary {
            project_id,
            renamed,
            rewrites,
            completed,
        })
    }

    async fn upload_sample(
        &self,
        record: &SampleRecord,
        remote: &RemoteSample,
    ) -> UploadResult<Vec<TransferOutcome>> {
        // Credentials are scoped to one sample
        let credentials = self.api.get_upload_credentials(remote.id).await?;
        let engine = TransferEngine::new(self.connector.connect(&credentials), self.transfer.clone());

        let mut outcomes = Vec::with_capacity(remote.files.len());
        for file in &remote.files {
            let key = ObjectKey::parse(&file.s3_path)?;
            let local = record
                .files
                .match_remote_name(key.file_name())
                .map_err(|candidates| TransferError::NoMatchingRole {
                    key: file.s3_path.clone(),
                    candidates,
                })?;
            let outcome = engine
                .transfer(local, &file.s3_path, file.multipart_upload_id.as_deref())
                .await?;
            debug!("{}: {:?}", file.s3_path, outcome);
            outcomes.push(outcome);
        }

        self.api.mark_uploaded(remote.id, &record.name).await?;
        Ok(outcomes)
    }
}

fn log_completed(completed: &[CompletedSample]) {
    if completed.is_empty() {
        warn!("no samples were completed before the failure");
        return;
    }
    for sample in completed {
        warn!("sample '{}' ({}) was completed before the failure", sample.name, sample.id);
    }
}
