//! Command handlers for the CZ ID uploader CLI
//!
//! Handlers turn parsed arguments into a sample map and an [`UploadConfig`],
//! wire the HTTP client and S3 connector into the orchestrator, and print the
//! run summary.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::app::client::CzidClient;
use crate::app::discovery::{sample_name, samples_from_dir, SampleFileSet};
use crate::app::orchestrator::{UploadOrchestrator, UploadSummary};
use crate::app::transfer::{S3Connector, TransferOutcome};
use crate::cli::{UploadSampleArgs, UploadSamplesArgs};
use crate::config::{AppConfig, UploadConfig};
use crate::errors::{DiscoveryError, Result, UploadError};

/// Handle the directory upload command
pub async fn handle_upload_samples(
    args: UploadSamplesArgs,
    config: &AppConfig,
    verbose: bool,
) -> Result<()> {
    info!("Searching {} for samples", args.directory.display());
    let samples = samples_from_dir(&args.directory, verbose)?;
    info!("Found {} samples", samples.len());
    run_upload(samples, args.upload.upload_config(), config).await
}

/// Handle the single-sample upload command
pub async fn handle_upload_sample(
    args: UploadSampleArgs,
    config: &AppConfig,
    verbose: bool,
) -> Result<()> {
    for path in std::iter::once(&args.r1).chain(args.r2.as_ref()) {
        ensure_file(path)?;
    }
    let name = args
        .sample_name
        .clone()
        .unwrap_or_else(|| sample_name(&args.r1));
    let files = SampleFileSet::from_reads(args.r1.clone(), args.r2.clone())?;
    if verbose {
        info!("detected sample: {}", name);
    }
    info!("Uploading sample '{}' ({} files)", name, if files.is_paired() { 2 } else { 1 });

    let samples = BTreeMap::from([(name, files)]);
    run_upload(samples, args.upload.upload_config(), config).await
}

fn ensure_file(path: &Path) -> std::result::Result<(), DiscoveryError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DiscoveryError::InvalidInput {
            reason: format!("{} is not a readable file", path.display()),
        })
    }
}

async fn run_upload(
    samples: BTreeMap<String, SampleFileSet>,
    upload: UploadConfig,
    config: &AppConfig,
) -> Result<()> {
    let start_time = Instant::now();
    let client = CzidClient::new(&config.client_config()).map_err(UploadError::from)?;
    let connector = S3Connector::new(config.storage.region.clone());

    let mut orchestrator = UploadOrchestrator::new(
        Arc::new(client),
        Arc::new(connector),
        config.transfer_config(),
        upload,
    );
    let summary = orchestrator.run(samples).await?;
    info!("Upload finished in {:?}", start_time.elapsed());
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &UploadSummary) {
    println!();
    println!(
        "Uploaded {} samples to project {}",
        summary.completed.len(),
        summary.project_id
    );
    for sample in &summary.completed {
        let skipped = sample
            .outcomes
            .iter()
            .filter(|outcome| matches!(outcome, TransferOutcome::AlreadyUploaded))
            .count();
        if skipped > 0 {
            println!(
                "  {} (id {}), {} of {} files already uploaded",
                sample.name,
                sample.id,
                skipped,
                sample.outcomes.len()
            );
        } else {
            println!("  {} (id {})", sample.name, sample.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a_R1.fastq");
        std::fs::write(&file, b"@r\nACGT\n+\nIIII\n").unwrap();

        assert!(ensure_file(&file).is_ok());
        assert!(matches!(
            ensure_file(dir.path()),
            Err(DiscoveryError::InvalidInput { .. })
        ));
        assert!(ensure_file(&dir.path().join("missing.fastq")).is_err());
    }
}
