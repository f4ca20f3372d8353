//! Command-line argument parsing for the CZ ID uploader
//!
//! Both upload commands share [`UploadArgs`]; they differ only in how the
//! local samples are found.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::workflow::{SampleOptions, Workflow};
use crate::config::UploadConfig;

/// CZ ID uploader - send local sequencing samples to a CZ ID project
#[derive(Parser, Debug)]
#[command(
    name = "czid-uploader",
    version,
    about = "Upload local sequencing samples to CZ ID",
    long_about = "Discovers FASTQ/FASTA samples, resolves and validates their metadata with CZ ID,
registers them in a project and uploads their files with resumable multipart transfers."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging, including sample discovery details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (trace level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload every sample found under a directory
    UploadSamples(UploadSamplesArgs),

    /// Upload one sample from an R1 file and an optional R2 file
    UploadSample(UploadSampleArgs),
}

/// Arguments for the directory upload command
#[derive(Args, Debug, Clone)]
pub struct UploadSamplesArgs {
    /// Directory searched recursively for sample files
    #[arg(value_name = "DIR")]
    pub directory: PathBuf,

    #[command(flatten)]
    pub upload: UploadArgs,
}

/// Arguments for the single-sample upload command
#[derive(Args, Debug, Clone)]
pub struct UploadSampleArgs {
    /// R1 (or single-end) read file
    #[arg(value_name = "R1")]
    pub r1: PathBuf,

    /// R2 read file for paired-end samples
    #[arg(value_name = "R2")]
    pub r2: Option<PathBuf>,

    /// Sample name, derived from the R1 file name when omitted
    #[arg(long)]
    pub sample_name: Option<String>,

    #[command(flatten)]
    pub upload: UploadArgs,
}

/// Options shared by the upload commands
#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// Name of the CZ ID project to upload to
    #[arg(short, long)]
    pub project: String,

    /// Analysis workflow to run on the samples
    #[arg(long, value_enum, default_value_t = Workflow::ShortReadMngs)]
    pub workflow: Workflow,

    /// Metadata applied to every sample (repeatable)
    #[arg(short = 'm', long = "metadatum", value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,

    /// CSV file with one row of metadata per sample
    #[arg(long, value_name = "FILE")]
    pub metadata_csv: Option<PathBuf>,

    /// Sequencing platform (Illumina or Nanopore)
    #[arg(long = "sequencing-platform", value_name = "PLATFORM")]
    pub technology: Option<String>,

    /// Wetlab protocol (consensus-genome only)
    #[arg(long)]
    pub wetlab_protocol: Option<String>,

    /// Medaka model (Nanopore consensus-genome only)
    #[arg(long)]
    pub medaka_model: Option<String>,

    /// Guppy basecaller setting (Nanopore metagenomics only)
    #[arg(long)]
    pub guppy_basecaller_setting: Option<String>,

    /// Samples were prepared with Clear Labs
    #[arg(long)]
    pub clearlabs: bool,

    /// Accession of the reference sequence
    #[arg(long)]
    pub reference_accession: Option<String>,

    /// Reference sequence file
    #[arg(long, value_name = "FILE")]
    pub reference_fasta: Option<PathBuf>,

    /// Primer BED file
    #[arg(long, value_name = "FILE")]
    pub primer_bed: Option<PathBuf>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::TRACE)
        } else if self.global.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }
}

impl UploadArgs {
    /// Build the run configuration handed to the orchestrator
    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            project: self.project.clone(),
            workflow: self.workflow,
            options: SampleOptions {
                technology: self.technology.clone(),
                wetlab_protocol: self.wetlab_protocol.clone(),
                medaka_model: self.medaka_model.clone(),
                guppy_basecaller_setting: self.guppy_basecaller_setting.clone(),
                clear_labs: self.clearlabs,
                reference_accession: self.reference_accession.clone(),
                reference_fasta: self.reference_fasta.clone(),
                primer_bed: self.primer_bed.clone(),
            },
            metadata: self.metadata.clone(),
            metadata_csv: self.metadata_csv.clone(),
        }
    }
}
