//! Pipelines and per-run sample options
//!
//! Option values are given by their display names (as typed on the command
//! line) and resolved to the codes the service expects.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::{UploadError, UploadResult};

/// Sequencing platforms: display name to wire code
pub const TECHNOLOGIES: &[(&str, &str)] = &[("Illumina", "Illumina"), ("Nanopore", "ONT")];

/// Wetlab protocols: display name to wire code
pub const WETLAB_PROTOCOLS: &[(&str, &str)] = &[
    ("ARTIC v4/ARTIC v4.1", "artic_v4"),
    ("ARTIC v3 - Short Amplicons (275 bp)", "artic_short_amplicons"),
    ("ARTIC v3", "artic"),
    ("AmpliSeq", "ampliseq"),
    ("Combined MSSPE & ARTIC v3", "combined_msspe_artic"),
    ("MSSPE", "msspe"),
    ("SNAP", "snap"),
    ("COVIDseq", "covidseq"),
    ("Midnight", "midnight"),
    ("Varskip", "varskip"),
];

/// Wetlab protocols available for Nanopore runs
pub const NANOPORE_WETLAB_PROTOCOLS: &[&str] =
    &["ARTIC v4/ARTIC v4.1", "Midnight", "ARTIC v3", "Varskip"];

/// Default Nanopore wetlab protocol
pub const NANOPORE_DEFAULT_WETLAB_PROTOCOL: &str = "ARTIC v3";

/// Medaka consensus models
pub const MEDAKA_MODELS: &[&str] = &[
    "r941_min_fast_g303",
    "r941_min_high_g303",
    "r941_min_high_g330",
    "r941_min_high_g340_rle",
    "r941_min_high_g344",
    "r941_min_high_g351",
    "r941_min_high_g360",
    "r103_prom_high_g360",
    "r103_prom_snp_g3210",
    "r103_prom_variant_g3210",
    "r941_prom_fast_g303",
    "r941_prom_high_g303",
    "r941_prom_high_g330",
    "r941_prom_high_g344",
    "r941_prom_high_g360",
    "r941_prom_high_g4011",
    "r941_prom_snp_g303",
    "r941_prom_snp_g322",
    "r941_prom_snp_g360",
    "r941_prom_variant_g303",
    "r941_prom_variant_g322",
    "r941_prom_variant_g360",
];

/// Default medaka model for Nanopore consensus genomes
pub const DEFAULT_MEDAKA_MODEL: &str = "r941_min_high_g360";

/// Guppy basecaller settings for Nanopore metagenomics
pub const GUPPY_BASECALLER_SETTINGS: &[&str] = &["fast", "hac", "super"];

fn lookup(table: &[(&str, &'static str)], name: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(display, _)| *display == name)
        .map(|(_, code)| *code)
}

fn quoted(names: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    names
        .into_iter()
        .map(|name| format!("\"{}\"", name.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn invalid(message: impl Into<String>) -> UploadError {
    UploadError::InvalidOptions(message.into())
}

/// Analysis pipeline the samples are registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Workflow {
    /// Short-read metagenomics (long-read for Nanopore)
    ShortReadMngs,
    /// Consensus genome
    ConsensusGenome,
    /// Antimicrobial resistance
    Amr,
}

impl Workflow {
    /// Wire name of the workflow
    pub fn as_str(self) -> &'static str {
        match self {
            Workflow::ShortReadMngs => "short-read-mngs",
            Workflow::ConsensusGenome => "consensus-genome",
            Workflow::Amr => "amr",
        }
    }
}

/// Sample options as supplied by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleOptions {
    pub technology: Option<String>,
    pub wetlab_protocol: Option<String>,
    pub medaka_model: Option<String>,
    pub guppy_basecaller_setting: Option<String>,
    pub clear_labs: bool,
    pub reference_accession: Option<String>,
    pub reference_fasta: Option<PathBuf>,
    pub primer_bed: Option<PathBuf>,
}

/// Validated options in wire form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Effective workflow name
    pub workflow: &'static str,
    pub technology: Option<&'static str>,
    pub wetlab_protocol: Option<&'static str>,
    pub medaka_model: Option<String>,
    pub guppy_basecaller_setting: Option<String>,
    pub clear_labs: bool,
    pub reference_accession: Option<String>,
    pub reference_fasta: Option<PathBuf>,
    pub primer_bed: Option<PathBuf>,
}

impl ResolvedOptions {
    /// Basename of the reference fasta, as registered
    pub fn reference_fasta_name(&self) -> Option<String> {
        self.reference_fasta.as_deref().and_then(base_name)
    }

    /// Basename of the primer bed file, as registered
    pub fn primer_bed_name(&self) -> Option<String> {
        self.primer_bed.as_deref().and_then(base_name)
    }
}

fn base_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

impl SampleOptions {
    /// Validate the options for a workflow and translate them to wire codes
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidOptions` describing the first inconsistency.
    pub fn resolve(&self, workflow: Workflow) -> UploadResult<ResolvedOptions> {
        match workflow {
            Workflow::ShortReadMngs => self.resolve_metagenomics(),
            Workflow::ConsensusGenome => self.resolve_consensus_genome(),
            Workflow::Amr => Ok(ResolvedOptions {
                workflow: Workflow::Amr.as_str(),
                technology: self.technology()?,
                ..Default::default()
            }),
        }
    }

    fn technology(&self) -> UploadResult<Option<&'static str>> {
        match self.technology.as_deref() {
            None => Ok(None),
            Some(name) => lookup(TECHNOLOGIES, name).map(Some).ok_or_else(|| {
                invalid(format!(
                    "sequencing platform \"{}\" not supported, please choose one of: {}",
                    name,
                    quoted(TECHNOLOGIES.iter().map(|(display, _)| display))
                ))
            }),
        }
    }

    fn required_technology(&self) -> UploadResult<&'static str> {
        self.technology()?
            .ok_or_else(|| invalid("missing required argument: sequencing-platform"))
    }

    fn resolve_metagenomics(&self) -> UploadResult<ResolvedOptions> {
        let technology = self.required_technology()?;
        let nanopore = self.technology.as_deref() == Some("Nanopore");

        match (&self.guppy_basecaller_setting, nanopore) {
            (None, true) => {
                return Err(invalid(
                    "missing required argument for sequencing-platform 'Nanopore': guppy-basecaller-setting",
                ))
            }
            (Some(_), false) => {
                return Err(invalid(
                    "guppy-basecaller-setting is not supported for sequencing-platform 'Illumina'",
                ))
            }
            (Some(setting), true) if !GUPPY_BASECALLER_SETTINGS.contains(&setting.as_str()) => {
                return Err(invalid(format!(
                    "guppy-basecaller-setting \"{}\" not supported, please choose one of: {}",
                    setting,
                    quoted(GUPPY_BASECALLER_SETTINGS)
                )))
            }
            _ => {}
        }

        Ok(ResolvedOptions {
            workflow: if nanopore { "long-read-mngs" } else { Workflow::ShortReadMngs.as_str() },
            technology: Some(technology),
            guppy_basecaller_setting: self.guppy_basecaller_setting.clone(),
            ..Default::default()
        })
    }

    fn resolve_consensus_genome(&self) -> UploadResult<ResolvedOptions> {
        let technology = self.required_technology()?;
        let platform = self.technology.as_deref().unwrap_or_default();
        let illumina = platform == "Illumina";
        let nanopore = platform == "Nanopore";
        let has_reference = self.reference_accession.is_some()
            || self.reference_fasta.is_some()
            || self.primer_bed.is_some();

        if !illumina && has_reference {
            return Err(invalid(
                "reference-accession, reference-fasta, and primer-bed require sequencing-platform 'Illumina'",
            ));
        }

        let mut wetlab_protocol = self.wetlab_protocol.clone();
        if nanopore && wetlab_protocol.is_none() {
            wetlab_protocol = Some(NANOPORE_DEFAULT_WETLAB_PROTOCOL.to_string());
        }
        if illumina && wetlab_protocol.is_none() && !has_reference {
            return Err(invalid("missing required argument: wetlab-protocol"));
        }
        if wetlab_protocol.is_some() && has_reference {
            return Err(invalid(
                "wetlab-protocol is not supported with reference-accession, reference-fasta, or primer-bed",
            ));
        }

        let wetlab_code = match wetlab_protocol.as_deref() {
            None => None,
            Some(protocol) => {
                let code = lookup(WETLAB_PROTOCOLS, protocol).ok_or_else(|| {
                    invalid(format!(
                        "wetlab protocol \"{}\" not supported, please choose one of: {}",
                        protocol,
                        quoted(WETLAB_PROTOCOLS.iter().map(|(display, _)| display))
                    ))
                })?;
                if nanopore && !NANOPORE_WETLAB_PROTOCOLS.contains(&protocol) {
                    return Err(invalid(format!(
                        "wetlab protocol \"{}\" not supported, please choose one of: {}",
                        protocol,
                        quoted(NANOPORE_WETLAB_PROTOCOLS)
                    )));
                }
                Some(code)
            }
        };

        let mut medaka_model = self.medaka_model.clone();
        if nanopore && medaka_model.is_none() {
            medaka_model = Some(DEFAULT_MEDAKA_MODEL.to_string());
        }
        if let Some(model) = medaka_model.as_deref() {
            if !MEDAKA_MODELS.contains(&model) {
                return Err(invalid(format!(
                    "medaka model \"{}\" not supported, please choose one of: {}",
                    model,
                    quoted(MEDAKA_MODELS)
                )));
            }
        }

        if self.clear_labs {
            if illumina {
                return Err(invalid("clearlabs is only supported for Nanopore"));
            }
            if wetlab_protocol.as_deref() != Some(NANOPORE_DEFAULT_WETLAB_PROTOCOL) {
                return Err(invalid(format!(
                    "wetlab-protocol {} is required with clearlabs",
                    NANOPORE_DEFAULT_WETLAB_PROTOCOL
                )));
            }
            if medaka_model.as_deref() != Some(DEFAULT_MEDAKA_MODEL) {
                return Err(invalid(format!(
                    "medaka-model {} is required with clearlabs",
                    DEFAULT_MEDAKA_MODEL
                )));
            }
        }

        let has_reference_sequence =
            self.reference_accession.is_some() || self.reference_fasta.is_some();
        if self.reference_accession.is_some() && self.reference_fasta.is_some() {
            return Err(invalid(
                "reference-accession can't be used if reference-fasta is set",
            ));
        }
        if has_reference_sequence && self.primer_bed.is_none() {
            return Err(invalid(
                "reference-accession or reference-fasta require primer-bed",
            ));
        }
        if !has_reference_sequence && self.primer_bed.is_some() {
            return Err(invalid(
                "primer-bed requires reference-accession or reference-fasta",
            ));
        }

        Ok(ResolvedOptions {
            workflow: Workflow::ConsensusGenome.as_str(),
            technology: Some(technology),
            wetlab_protocol: wetlab_code,
            medaka_model,
            guppy_basecaller_setting: None,
            clear_labs: self.clear_labs,
            reference_accession: self.reference_accession.clone(),
            reference_fasta: self.reference_fasta.clone(),
            primer_bed: self.primer_bed.clone(),
        })
    }
}
