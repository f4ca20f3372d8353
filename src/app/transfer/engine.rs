//! Resumable multipart transfer of one logical input

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::lanes::LaneReader;
use super::progress::ProgressReporter;
use super::store::{ObjectKey, ObjectStore, UploadedPart};
use crate::constants::transfer::{
    DEFAULT_PART_SIZE, MAX_PARTS, MIN_PART_SIZE, PROGRESS_QUEUE_CAPACITY,
};
use crate::errors::{StoreError, StoreResult, TransferError, TransferResult};

/// Tuning for the transfer engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Preferred part size in bytes, never below the storage minimum
    pub part_size: u64,
    /// Parts uploaded at once
    pub concurrency: usize,
    /// Capacity of the part-completion queue
    pub progress_queue_capacity: usize,
    /// Draw a progress bar
    pub show_progress: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            concurrency: num_cpus::get(),
            progress_queue_capacity: PROGRESS_QUEUE_CAPACITY,
            show_progress: atty::is(atty::Stream::Stdout),
        }
    }
}

impl TransferConfig {
    /// Part size for an input of `total` bytes
    ///
    /// Grows past the configured size when the input would otherwise need
    /// more parts than the storage service allows.
    pub fn part_size_for(&self, total: u64) -> u64 {
        self.part_size
            .max(MIN_PART_SIZE)
            .max(total.div_ceil(MAX_PARTS))
    }
}

/// What a transfer did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The object already existed
    AlreadyUploaded,
    /// Written with a single put
    Direct { bytes: u64 },
    /// Written in parts
    Multipart { bytes: u64, parts: u64, resumed: bool },
}

/// Uploads lane files to object storage
pub struct TransferEngine {
    store: Arc<dyn ObjectStore>,
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn ObjectStore>, config: TransferConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Upload the concatenation of `files` to `remote`
    ///
    /// Existing objects are skipped. A resume id continues an earlier
    /// multipart upload; if that fails for any reason the upload starts over.
    ///
    /// # Errors
    ///
    /// Returns `TransferError` on local I/O failures, an unparseable key, or
    /// a storage failure outside the resume attempt.
    pub async fn transfer(
        &self,
        files: &[PathBuf],
        remote: &str,
        resume_id: Option<&str>,
    ) -> TransferResult<TransferOutcome> {
        if files.is_empty() {
            return Err(TransferError::EmptyInput {
                key: remote.to_string(),
            });
        }
        let key = ObjectKey::parse(remote)?;
        let label = files
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let mut reader = LaneReader::open(files).await?;
        let total = reader.total_size();

        match self.store.head_object(&key).await {
            Ok(()) => {
                println!("skipping upload of {}: already uploaded", label);
                info!("{} already exists, skipping", key);
                return Ok(TransferOutcome::AlreadyUploaded);
            }
            // Scoped credentials see missing objects as access denied
            Err(StoreError::NotFound | StoreError::AccessDenied) => {}
            Err(source) => return Err(store_failure(&key, source)),
        }

        if total <= MIN_PART_SIZE {
            debug!("writing {} bytes to {} in one request", total, key);
            let body = reader.read_to_end().await?;
            self.store
                .put_object(&key, body)
                .await
                .map_err(|source| store_failure(&key, source))?;
            return Ok(TransferOutcome::Direct { bytes: total });
        }

        let part_size = self.config.part_size_for(total);
        if let Some(upload_id) = resume_id {
            println!("resuming upload of {}", label);
            match self.resume(&key, upload_id, reader, total, part_size).await {
                Ok(parts) => {
                    return Ok(TransferOutcome::Multipart {
                        bytes: total,
                        parts,
                        resumed: true,
                    })
                }
                Err(error) => {
                    warn!("could not resume upload {} of {}: {}", upload_id, key, error);
                    println!("could not resume upload, starting fresh upload");
                }
            }
            reader = LaneReader::open(files).await?;
        } else {
            println!("starting upload of {}", label);
        }

        let upload_id = self
            .store
            .create_multipart_upload(&key)
            .await
            .map_err(|source| store_failure(&key, source))?;
        info!("created multipart upload {} for {}", upload_id, key);
        let parts = self
            .upload_parts(&key, &upload_id, reader, total, part_size, Vec::new())
            .await?;
        Ok(TransferOutcome::Multipart {
            bytes: total,
            parts,
            resumed: false,
        })
    }

    async fn resume(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        reader: LaneReader,
        total: u64,
        part_size: u64,
    ) -> TransferResult<u64> {
        let stored = self
            .store
            .list_parts(key, upload_id)
            .await
            .map_err(|source| store_failure(key, source))?;

        // Stored parts must line up with this run's part layout
        for part in &stored {
            let expected = part_length(part.part_number, total, part_size);
            if expected.is_none() || (part.size > 0 && Some(part.size) != expected) {
                return Err(TransferError::Store {
                    key: key.to_string(),
                    source: StoreError::Service {
                        code: "PartLayoutMismatch".to_string(),
                        message: format!(
                            "stored part {} has {} bytes",
                            part.part_number, part.size
                        ),
                    },
                });
            }
        }
        debug!("resuming {} with {} stored parts", upload_id, stored.len());
        self.upload_parts(key, upload_id, reader, total, part_size, stored)
            .await
    }

    async fn upload_parts(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        mut reader: LaneReader,
        total: u64,
        part_size: u64,
        stored: Vec<UploadedPart>,
    ) -> TransferResult<u64> {
        let part_count = total.div_ceil(part_size);
        let (reporter, sender) = ProgressReporter::spawn(
            total,
            part_size,
            self.config.progress_queue_capacity,
            self.config.show_progress,
        )?;

        let result = self
            .send_parts(
                key,
                upload_id,
                &mut reader,
                (total, part_size, part_count),
                stored,
                sender,
            )
            .await;
        let progress = reporter.finish().await?;
        let parts = result?;
        debug!(
            "{} parts uploaded this run for {}",
            progress.completed(),
            key
        );

        self.store
            .complete_multipart_upload(key, upload_id, parts)
            .await
            .map_err(|source| store_failure(key, source))?;
        Ok(part_count)
    }

    async fn send_parts(
        &self,
        key: &ObjectKey,
        upload_id: &str,
        reader: &mut LaneReader,
        (total, part_size, part_count): (u64, u64, u64),
        stored: Vec<UploadedPart>,
        sender: mpsc::Sender<i32>,
    ) -> TransferResult<Vec<UploadedPart>> {
        let mut parts: BTreeMap<i32, UploadedPart> = stored
            .into_iter()
            .map(|part| (part.part_number, part))
            .collect();
        let mut tasks: JoinSet<StoreResult<UploadedPart>> = JoinSet::new();
        let concurrency = self.config.concurrency.max(1);

        // part_count never exceeds MAX_PARTS, so part numbers fit in i32
        for number in 1..=part_count {
            let part_number = number as i32;
            let length = part_length(part_number, total, part_size).unwrap_or_default();
            if parts.contains_key(&part_number) {
                reader.skip(length).await?;
                continue;
            }

            while tasks.len() >= concurrency {
                if let Some(joined) = tasks.join_next().await {
                    let part = joined?.map_err(|source| store_failure(key, source))?;
                    parts.insert(part.part_number, part);
                }
            }

            let body = reader.read_exact_chunk(length as usize).await?;
            let store = Arc::clone(&self.store);
            let key = key.clone();
            let upload_id = upload_id.to_string();
            let sender = sender.clone();
            tasks.spawn(async move {
                let part = store
                    .upload_part(&key, &upload_id, part_number, body)
                    .await?;
                // The reporter may already be gone on shutdown
                let _ = sender.send(part_number).await;
                Ok(part)
            });
        }
        drop(sender);

        while let Some(joined) = tasks.join_next().await {
            let part = joined?.map_err(|source| store_failure(key, source))?;
            parts.insert(part.part_number, part);
        }
        Ok(parts.into_values().collect())
    }
}

/// Length of a 1-based part, or `None` when the part lies past the end
fn part_length(part_number: i32, total: u64, part_size: u64) -> Option<u64> {
    let index = u64::try_from(part_number).ok()?.checked_sub(1)?;
    let start = index.checked_mul(part_size)?;
    (start < total).then(|| part_size.min(total - start))
}

fn store_failure(key: &ObjectKey, source: StoreError) -> TransferError {
    TransferError::Store {
        key: key.to_string(),
        source,
    }
}
