//! Per-sample state carried through the upload pipeline

use std::collections::BTreeMap;

use crate::app::client::{RegisteredSample, RemoteFile};
use crate::app::discovery::SampleFileSet;
use crate::app::metadata::{Metadata, MetadataTable};
use crate::errors::{UploadError, UploadResult};

/// Server-side identity of a registered sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSample {
    pub id: u64,
    pub files: Vec<RemoteFile>,
}

/// Files, metadata and remote identity of one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRecord {
    /// Current name, updated when the service renames the sample
    pub name: String,
    /// Name derived from the local files
    pub local_name: String,
    pub files: SampleFileSet,
    pub metadata: Metadata,
    pub remote: Option<RemoteSample>,
}

/// Every sample of one run, kept in a fixed order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleBatch {
    records: Vec<SampleRecord>,
}

impl SampleBatch {
    /// Pair file sets with their metadata
    ///
    /// Samples without a metadata entry start with empty metadata.
    pub fn prepare(
        files: BTreeMap<String, SampleFileSet>,
        mut metadata: BTreeMap<String, Metadata>,
    ) -> Self {
        let records = files
            .into_iter()
            .map(|(name, files)| SampleRecord {
                metadata: metadata.remove(&name).unwrap_or_default(),
                local_name: name.clone(),
                name,
                files,
                remote: None,
            })
            .collect();
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|record| record.name.clone()).collect()
    }

    /// Apply names returned by reconciliation, position by position
    ///
    /// Returns the `(old, new)` pairs that changed.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::NameCountMismatch` when the lengths differ; no
    /// record is touched in that case.
    pub fn apply_renames(&mut self, names: &[String]) -> UploadResult<Vec<(String, String)>> {
        if names.len() != self.records.len() {
            return Err(UploadError::NameCountMismatch {
                sent: self.records.len(),
                received: names.len(),
            });
        }
        let mut renamed = Vec::new();
        for (record, name) in self.records.iter_mut().zip(names) {
            if record.name != *name {
                renamed.push((record.name.clone(), name.clone()));
                record.name = name.clone();
            }
        }
        Ok(renamed)
    }

    pub fn metadata_mut(&mut self) -> impl Iterator<Item = &mut Metadata> {
        self.records.iter_mut().map(|record| &mut record.metadata)
    }

    /// Metadata keyed by current sample name
    pub fn metadata_by_name(&self) -> BTreeMap<String, Metadata> {
        self.records
            .iter()
            .map(|record| (record.name.clone(), record.metadata.clone()))
            .collect()
    }

    pub fn metadata_table(&self) -> MetadataTable {
        MetadataTable::from_samples(
            self.records
                .iter()
                .map(|record| (record.name.as_str(), &record.metadata)),
        )
    }

    /// Record the ids and destinations returned by registration
    ///
    /// # Errors
    ///
    /// Returns `UploadError::UnknownRegisteredSample` for a name this batch
    /// never proposed.
    pub fn attach_registrations(&mut self, registered: Vec<RegisteredSample>) -> UploadResult<()> {
        for sample in registered {
            let record = self
                .records
                .iter_mut()
                .find(|record| record.name == sample.name)
                .ok_or_else(|| UploadError::UnknownRegisteredSample {
                    name: sample.name.clone(),
                })?;
            record.remote = Some(RemoteSample {
                id: sample.id,
                files: sample.input_files,
            });
        }
        Ok(())
    }

    /// Names the service did not register, in batch order
    pub fn unregistered(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|record| record.remote.is_none())
            .map(|record| record.name.as_str())
            .collect()
    }

    /// Records the service registered, in batch order
    pub fn registered(&self) -> impl Iterator<Item = (&SampleRecord, &RemoteSample)> {
        self.records
            .iter()
            .filter_map(|record| record.remote.as_ref().map(|remote| (record, remote)))
    }
}
