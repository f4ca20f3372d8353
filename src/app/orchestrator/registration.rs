//! Bulk registration request assembly

use super::record::{SampleBatch, SampleRecord};
use crate::app::client::{InputFileAttributes, InputFileType, SampleRequest, SamplesRequest};
use crate::app::discovery::FileRole;
use crate::app::workflow::ResolvedOptions;
use crate::constants::api;

fn input_file(file_type: InputFileType, name: String) -> InputFileAttributes {
    InputFileAttributes {
        file_type,
        parts: name.clone(),
        source: name.clone(),
        name,
        source_type: api::SOURCE_TYPE_LOCAL.to_string(),
        upload_client: api::UPLOAD_CLIENT.to_string(),
    }
}

fn input_files(record: &SampleRecord) -> Vec<InputFileAttributes> {
    let files = &record.files;
    let reads: &[FileRole] = if files.is_paired() {
        &[FileRole::R1, FileRole::R2]
    } else {
        &[FileRole::Single]
    };
    let extras = [
        (FileRole::ReferenceFasta, InputFileType::ReferenceSequence),
        (FileRole::PrimerBed, InputFileType::PrimerBed),
    ];

    reads
        .iter()
        .map(|role| (*role, InputFileType::Fastq))
        .chain(extras)
        .filter_map(|(role, file_type)| {
            files
                .upload_name(role)
                .map(|name| input_file(file_type, name))
        })
        .collect()
}

fn sample_request(project_id: u64, record: &SampleRecord, options: &ResolvedOptions) -> SampleRequest {
    SampleRequest {
        host_genome_name: record.metadata.host_genome().unwrap_or_default().to_string(),
        input_files_attributes: input_files(record),
        name: record.name.clone(),
        project_id,
        status: api::STATUS_CREATED.to_string(),
        workflows: vec![options.workflow.to_string()],
        technology: options.technology.unwrap_or_default().to_string(),
        wetlab_protocol: options.wetlab_protocol.unwrap_or_default().to_string(),
        medaka_model: options.medaka_model.clone(),
        guppy_basecaller_setting: options.guppy_basecaller_setting.clone(),
        clearlabs: options.clear_labs.then_some(true),
        reference_accession: options.reference_accession.clone(),
        reference_fasta: options.reference_fasta_name(),
        primer_bed: options.primer_bed_name(),
    }
}

/// Build the body of the bulk registration call
pub fn build_samples_request(
    project_id: u64,
    batch: &SampleBatch,
    options: &ResolvedOptions,
) -> SamplesRequest {
    SamplesRequest {
        client: env!("CARGO_PKG_VERSION").to_string(),
        metadata: batch.metadata_by_name(),
        samples: batch
            .records()
            .iter()
            .map(|record| sample_request(project_id, record, options))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::discovery::SampleFileSet;
    use crate::app::metadata::Metadata;
    use crate::app::workflow::{SampleOptions, Workflow};
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_paired_consensus_request() {
        let mut files = SampleFileSet::from_reads(
            PathBuf::from("/data/s_L001_R1_001.fastq.gz"),
            Some(PathBuf::from("/data/s_L001_R2_001.fastq.gz")),
        )
        .unwrap();
        files.attach_consensus_inputs(Some(Path::new("/refs/ref.fa")), Some(Path::new("/refs/p.bed")));

        let mut samples = BTreeMap::new();
        samples.insert("s".to_string(), files);
        let mut metadata = BTreeMap::new();
        metadata.insert("s".to_string(), Metadata::new([("host_genome", "Human")]));
        let batch = SampleBatch::prepare(samples, metadata);

        let options = SampleOptions {
            technology: Some("Illumina".to_string()),
            reference_fasta: Some(PathBuf::from("/refs/ref.fa")),
            primer_bed: Some(PathBuf::from("/refs/p.bed")),
            ..Default::default()
        }
        .resolve(Workflow::ConsensusGenome)
        .unwrap();

        let request = build_samples_request(42, &batch, &options);
        let sample = &request.samples[0];
        assert_eq!(sample.host_genome_name, "Human");
        assert_eq!(sample.workflows, vec!["consensus-genome"]);
        assert_eq!(sample.technology, "Illumina");
        assert_eq!(sample.reference_fasta.as_deref(), Some("ref.fa"));

        let names: Vec<_> = sample
            .input_files_attributes
            .iter()
            .map(|file| (file.file_type, file.name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                (InputFileType::Fastq, "s_R1_001.fastq.gz"),
                (InputFileType::Fastq, "s_R2_001.fastq.gz"),
                (InputFileType::ReferenceSequence, "ref.fa"),
                (InputFileType::PrimerBed, "p.bed"),
            ]
        );

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["metadata"]["s"]["Host Organism"], "Human");
        assert_eq!(body["samples"][0]["ref_fasta"], "ref.fa");
        assert!(body["samples"][0].get("clearlabs").is_none());
    }
}
