//! Request and response bodies exchanged with the CZ ID API

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::metadata::{Metadata, MetadataTable};

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectList {
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Project {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidateSampleNamesRequest<'a> {
    pub sample_names: &'a [String],
    pub ignore_unuploaded: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidateMetadataRequest<'a> {
    pub metadata: &'a MetadataTable,
    pub samples: Vec<ValidateMetadataSample>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidateMetadataSample {
    pub name: String,
    pub project_id: u64,
}

/// One validation finding: a message or a table of offending rows
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ValidationIssue {
    Message(String),
    Detailed {
        caption: String,
        #[serde(default)]
        headers: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<serde_json::Value>>,
        #[serde(default, rename = "isGroup")]
        is_group: bool,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Message(message) => writeln!(f, "  {}", message),
            ValidationIssue::Detailed {
                caption,
                headers,
                rows,
                ..
            } => {
                writeln!(f, "  {}", caption)?;
                for row in rows {
                    for (header, cell) in headers.iter().zip(row) {
                        match cell {
                            serde_json::Value::String(text) => {
                                writeln!(f, "      {}: {}", header, text)?
                            }
                            other => writeln!(f, "      {}: {}", header, other)?,
                        }
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValidationIssues {
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

/// Host organism known to the service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostGenome {
    pub name: String,
    #[serde(default, rename = "showAsOption")]
    pub show_as_option: bool,
}

/// Outcome of remote metadata validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValidationReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub issues: ValidationIssues,
    #[serde(default, rename = "newHostGenomes")]
    pub new_host_genomes: Vec<HostGenome>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.issues.errors.is_empty()
    }

    /// Host organisms the service does not offer as an option
    ///
    /// The service lists every host it saw; unknown ones are not shown as options.
    pub fn unrecognized_hosts(&self) -> impl Iterator<Item = &str> {
        self.new_host_genomes
            .iter()
            .filter(|host| !host.show_as_option)
            .map(|host| host.name.as_str())
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (errors, warnings) = (&self.issues.errors, &self.issues.warnings);
        if !errors.is_empty() || !warnings.is_empty() {
            writeln!(
                f,
                "found {} errors and {} warnings\n",
                errors.len(),
                warnings.len()
            )?;
            for (label, issues) in [("errors:", errors), ("warnings:", warnings)] {
                if issues.is_empty() {
                    continue;
                }
                writeln!(f, "{}", label)?;
                for issue in issues {
                    writeln!(f, "{}", issue)?;
                }
            }
        }

        let mut unrecognized = self.unrecognized_hosts().peekable();
        if unrecognized.peek().is_some() {
            writeln!(f, "some of your host organisms were not found in CZ ID")?;
            writeln!(f, "host filtering will only filter out ERCC reads")?;
            writeln!(f, "confirm these host organisms are correct:")?;
            for host in unrecognized {
                writeln!(f, "  {}", host)?;
            }
        }
        Ok(())
    }
}

/// Kind of input file registered with a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFileType {
    Fastq,
    ReferenceSequence,
    PrimerBed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputFileAttributes {
    pub file_type: InputFileType,
    pub name: String,
    pub parts: String,
    pub source: String,
    pub source_type: String,
    pub upload_client: String,
}

/// One sample in a bulk registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRequest {
    pub host_genome_name: String,
    pub input_files_attributes: Vec<InputFileAttributes>,
    pub name: String,
    pub project_id: u64,
    pub status: String,
    pub workflows: Vec<String>,
    pub technology: String,
    pub wetlab_protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medaka_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guppy_basecaller_setting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clearlabs: Option<bool>,
    #[serde(rename = "accession_id", skip_serializing_if = "Option::is_none")]
    pub reference_accession: Option<String>,
    #[serde(rename = "ref_fasta", skip_serializing_if = "Option::is_none")]
    pub reference_fasta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primer_bed: Option<String>,
}

/// Body of the bulk registration call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplesRequest {
    pub client: String,
    pub metadata: BTreeMap<String, Metadata>,
    pub samples: Vec<SampleRequest>,
}

/// Destination of one input file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteFile {
    pub s3_path: String,
    #[serde(default)]
    pub multipart_upload_id: Option<String>,
}

/// A sample created by bulk registration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredSample {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub input_files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationResponse {
    #[serde(default)]
    pub samples: Vec<RegisteredSample>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Short-lived storage credentials scoped to one sample
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct UploadCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl fmt::Debug for UploadCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MarkUploadedRequest<'a> {
    pub sample: MarkUploadedSample<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MarkUploadedSample<'a> {
    pub id: u64,
    pub name: &'a str,
    pub status: &'a str,
}
