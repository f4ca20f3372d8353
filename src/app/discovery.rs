//! Sample discovery from a directory of sequencing files
//!
//! Files are recognised by their suffix (`.fasta`, `.fa`, `.fastq`, `.fq`,
//! optionally gzipped) and grouped by the sample name left after stripping the
//! suffix and any lane (`_L001`) or read-role (`_R1`, `_R2`, `_R1_001`) markers.
//! Multi-lane samples are kept in lane order so the transfer engine can
//! concatenate them into one logical read file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::constants::discovery::MAX_SAMPLES_PER_UPLOAD;
use crate::errors::{DiscoveryError, DiscoveryResult};

const EXTENSION_PATTERN: &str = r"\.(fasta|fa|fastq|fq)(\.gz)?$";

fn input_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EXTENSION_PATTERN).expect("static regex"))
}

fn suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(_L(0\d\d))?(_R[12](_001)?)?{EXTENSION_PATTERN}"))
            .expect("static regex")
    })
}

fn r1_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"_R1(_001)?{EXTENSION_PATTERN}")).expect("static regex"))
}

fn r2_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"_R2(_001)?{EXTENSION_PATTERN}")).expect("static regex"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether a path carries a recognised sequencing-file suffix
pub fn is_input(path: &Path) -> bool {
    input_regex().is_match(&file_name(path))
}

/// Derive the sample name from a sequencing file path
pub fn sample_name(path: &Path) -> String {
    suffix_regex().replace(&file_name(path), "").into_owned()
}

/// Lane number encoded in the file name, if any
pub fn lane_number(path: &Path) -> Option<u32> {
    let name = file_name(path);
    suffix_regex()
        .captures(&name)
        .and_then(|caps| caps.get(2))
        .and_then(|lane| lane.as_str().parse().ok())
}

/// File name with the lane marker removed
///
/// `ABC_L001_R1.fastq.gz` becomes `ABC_R1.fastq.gz`; names without a lane
/// marker are returned unchanged. This is the name the service knows the
/// concatenated lane files by.
pub fn lane_stripped_name(path: &Path) -> String {
    let name = file_name(path);
    match suffix_regex().captures(&name).and_then(|caps| caps.get(1)) {
        Some(lane) => format!("{}{}", &name[..lane.start()], &name[lane.end()..]),
        None => name,
    }
}

/// Read role of a sequencing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRole {
    /// Forward read of a pair
    R1,
    /// Reverse read of a pair
    R2,
    /// Unpaired reads
    Single,
}

impl ReadRole {
    /// Classify a file by its read-role marker
    pub fn of(path: &Path) -> Self {
        let name = file_name(path);
        if r1_regex().is_match(&name) {
            ReadRole::R1
        } else if r2_regex().is_match(&name) {
            ReadRole::R2
        } else {
            ReadRole::Single
        }
    }

    fn label(self) -> &'static str {
        match self {
            ReadRole::R1 => "R1",
            ReadRole::R2 => "R2",
            ReadRole::Single => "single",
        }
    }
}

/// Role of a local file within a sample, as matched against remote keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    R1,
    R2,
    Single,
    ReferenceFasta,
    PrimerBed,
}

impl FileRole {
    /// All roles in matching order
    pub const ALL: [FileRole; 5] = [
        FileRole::R1,
        FileRole::R2,
        FileRole::Single,
        FileRole::ReferenceFasta,
        FileRole::PrimerBed,
    ];

    /// Whether this role holds sequencing reads (lane-concatenated)
    pub fn is_reads(self) -> bool {
        matches!(self, FileRole::R1 | FileRole::R2 | FileRole::Single)
    }
}

/// The local files making up one sample
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleFileSet {
    pub r1: Vec<PathBuf>,
    pub r2: Vec<PathBuf>,
    pub single: Vec<PathBuf>,
    pub reference_fasta: Vec<PathBuf>,
    pub primer_bed: Vec<PathBuf>,
}

impl SampleFileSet {
    /// Build a file set for one explicitly named pair or single file
    pub fn from_reads(r1: PathBuf, r2: Option<PathBuf>) -> DiscoveryResult<Self> {
        match r2 {
            Some(r2) if r2 == r1 => Err(DiscoveryError::InvalidInput {
                reason: "r1 and r2 cannot be the same file".to_string(),
            }),
            Some(r2) => Ok(Self {
                r1: vec![r1],
                r2: vec![r2],
                ..Default::default()
            }),
            None => Ok(Self {
                single: vec![r1],
                ..Default::default()
            }),
        }
    }

    /// Whether the sample holds paired-end reads
    pub fn is_paired(&self) -> bool {
        !self.r1.is_empty()
    }

    /// Files for a role, in concatenation order
    pub fn files(&self, role: FileRole) -> &[PathBuf] {
        match role {
            FileRole::R1 => &self.r1,
            FileRole::R2 => &self.r2,
            FileRole::Single => &self.single,
            FileRole::ReferenceFasta => &self.reference_fasta,
            FileRole::PrimerBed => &self.primer_bed,
        }
    }

    /// Name the service knows a role's (concatenated) input by
    pub fn upload_name(&self, role: FileRole) -> Option<String> {
        let first = self.files(role).first()?;
        if role.is_reads() {
            Some(lane_stripped_name(first))
        } else {
            Some(file_name(first))
        }
    }

    /// Attach consensus-genome reference and primer files
    pub fn attach_consensus_inputs(&mut self, reference_fasta: Option<&Path>, primer_bed: Option<&Path>) {
        if let Some(path) = reference_fasta {
            self.reference_fasta = vec![path.to_path_buf()];
        }
        if let Some(path) = primer_bed {
            self.primer_bed = vec![path.to_path_buf()];
        }
    }

    /// Local files whose upload name matches the basename of a remote key
    pub fn match_remote_name(&self, remote_name: &str) -> Result<&[PathBuf], Vec<String>> {
        for role in FileRole::ALL {
            if self.upload_name(role).as_deref() == Some(remote_name) {
                return Ok(self.files(role));
            }
        }
        Err(FileRole::ALL
            .iter()
            .filter_map(|role| self.upload_name(*role))
            .collect())
    }

    fn add(&mut self, sample: &str, path: PathBuf) -> DiscoveryResult<ReadRole> {
        let role = ReadRole::of(&path);
        match role {
            ReadRole::R1 | ReadRole::R2 => {
                if let Some(existing) = self.single.first() {
                    return Err(DiscoveryError::MixedRoles {
                        sample: sample.to_string(),
                        role: role.label(),
                        path,
                        existing: existing.clone(),
                    });
                }
                if role == ReadRole::R1 {
                    self.r1.push(path);
                } else {
                    self.r2.push(path);
                }
            }
            ReadRole::Single => {
                if let Some(existing) = self.r1.first().or_else(|| self.r2.first()) {
                    let role = if self.r1.is_empty() { "R2" } else { "R1" };
                    return Err(DiscoveryError::MixedRoles {
                        sample: sample.to_string(),
                        role,
                        path,
                        existing: existing.clone(),
                    });
                }
                // Several single-end files are only valid as distinct lanes
                let lane = lane_number(&path);
                if let Some(existing) = self
                    .single
                    .iter()
                    .find(|existing| lane.is_none() || lane_number(existing).is_none() || lane_number(existing) == lane)
                {
                    return Err(DiscoveryError::DuplicateSingle {
                        sample: sample.to_string(),
                        path,
                        existing: existing.clone(),
                    });
                }
                self.single.push(path);
            }
        }
        Ok(role)
    }

    fn finalize(&mut self, sample: &str) -> DiscoveryResult<()> {
        if self.r1.len() != self.r2.len() {
            return Err(DiscoveryError::CountMismatch {
                sample: sample.to_string(),
                r1: self.r1.len(),
                r2: self.r2.len(),
            });
        }

        for lanes in [&mut self.r1, &mut self.r2, &mut self.single] {
            if lanes.len() > 1 {
                lanes.sort();
                info!(
                    "concatenating lane files: {}",
                    lanes
                        .iter()
                        .map(|path| path.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }

        if self.r1.len() > 1 {
            for (r1, r2) in self.r1.iter().zip(&self.r2) {
                let (r1_lane, r2_lane) = (lane_number(r1), lane_number(r2));
                if r1_lane != r2_lane {
                    return Err(DiscoveryError::LaneMismatch {
                        sample: sample.to_string(),
                        r1_lane,
                        r2_lane,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Discover samples under a directory
///
/// Walks `directory` recursively and groups every recognised sequencing file
/// by sample name.
///
/// # Errors
///
/// Returns `DiscoveryError` if the path is not a directory, if a sample mixes
/// paired and single-end files, if R1/R2 lanes do not line up, or if more than
/// the per-upload sample limit is found.
pub fn samples_from_dir(
    directory: &Path,
    verbose: bool,
) -> DiscoveryResult<BTreeMap<String, SampleFileSet>> {
    if !std::fs::metadata(directory)?.is_dir() {
        return Err(DiscoveryError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }

    let mut samples: BTreeMap<String, SampleFileSet> = BTreeMap::new();
    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_input(entry.path()) {
            continue;
        }

        let path = entry.into_path();
        let name = sample_name(&path);
        if !samples.contains_key(&name) && samples.len() >= MAX_SAMPLES_PER_UPLOAD {
            return Err(DiscoveryError::TooManySamples {
                limit: MAX_SAMPLES_PER_UPLOAD,
            });
        }

        let files = samples.entry(name.clone()).or_default();
        let shown = path.display().to_string();
        let role = files.add(&name, path)?;
        if verbose {
            info!(
                "detected {} sample file for sample: {} at path {}",
                role.label(),
                name,
                shown
            );
        } else {
            debug!("classified {} as {} for sample {}", shown, role.label(), name);
        }
    }

    for (name, files) in samples.iter_mut() {
        if verbose {
            info!("detected sample: {}", name);
        }
        files.finalize(name)?;
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch_all(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b">r\nACGT\n").unwrap();
        }
    }

    #[test]
    fn test_patterns_compile() {
        assert!(input_regex().is_match("a.fq.gz"));
        assert_eq!(suffix_regex().replace("a_L001_R1_001.fastq", ""), "a");
        assert!(r1_regex().is_match("a_R1.fa"));
        assert!(r2_regex().is_match("a_R2_001.fasta.gz"));
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|path| file_name(path)).collect()
    }

    #[test]
    fn test_sample_name_strips_markers() {
        assert_eq!(sample_name(Path::new("ABC_L001_R1.fasta")), "ABC");
        assert_eq!(sample_name(Path::new("ABC_S1_L002_R2_001.fastq.gz")), "ABC_S1");
        assert_eq!(sample_name(Path::new("/data/DEF.fq")), "DEF");
        assert_eq!(sample_name(Path::new("GHI_L003.fa.gz")), "GHI");
    }

    #[test]
    fn test_is_input() {
        assert!(is_input(Path::new("a.fastq.gz")));
        assert!(is_input(Path::new("a.fa")));
        assert!(!is_input(Path::new("a.fastq.bz2")));
        assert!(!is_input(Path::new("notes.txt")));
    }

    #[test]
    fn test_read_roles() {
        assert_eq!(ReadRole::of(Path::new("x_R1.fastq")), ReadRole::R1);
        assert_eq!(ReadRole::of(Path::new("x_L001_R2_001.fq.gz")), ReadRole::R2);
        assert_eq!(ReadRole::of(Path::new("x_R3.fastq")), ReadRole::Single);
    }

    #[test]
    fn test_lane_helpers() {
        assert_eq!(lane_number(Path::new("ABC_L002_R1.fastq")), Some(2));
        assert_eq!(lane_number(Path::new("ABC_R1.fastq")), None);
        assert_eq!(lane_stripped_name(Path::new("/x/ABC_L001_R1.fastq.gz")), "ABC_R1.fastq.gz");
        assert_eq!(lane_stripped_name(Path::new("ABC.fastq")), "ABC.fastq");
    }

    #[test]
    fn test_groups_and_sorts_lanes() {
        let dir = TempDir::new().unwrap();
        touch_all(
            dir.path(),
            &[
                "ABC_L001_R1.fasta",
                "ABC_L002_R1.fasta",
                "ABC_L002_R2.fasta",
                "ABC_L001_R2.fasta",
                "DEF.fasta",
            ],
        );

        let samples = samples_from_dir(dir.path(), false).unwrap();
        assert_eq!(samples.len(), 2);

        let abc = &samples["ABC"];
        assert_eq!(names(&abc.r1), ["ABC_L001_R1.fasta", "ABC_L002_R1.fasta"]);
        assert_eq!(names(&abc.r2), ["ABC_L001_R2.fasta", "ABC_L002_R2.fasta"]);
        assert!(abc.single.is_empty());

        let def = &samples["DEF"];
        assert_eq!(names(&def.single), ["DEF.fasta"]);
        assert!(!def.is_paired());
    }

    #[test]
    fn test_walks_nested_directories_and_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("run1")).unwrap();
        touch_all(dir.path(), &["README.md", "X_R1.fastq.gz"]);
        touch_all(&dir.path().join("run1"), &["X_R2.fastq.gz"]);

        let samples = samples_from_dir(dir.path(), true).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples["X"].r1.len(), 1);
        assert_eq!(samples["X"].r2.len(), 1);
    }

    #[test]
    fn test_unequal_lane_counts_fail() {
        let dir = TempDir::new().unwrap();
        touch_all(dir.path(), &["ABC_L001_R1.fasta", "ABC_L002_R1.fasta", "ABC_L002_R2.fasta"]);

        let err = samples_from_dir(dir.path(), false).unwrap_err();
        assert!(matches!(err, DiscoveryError::CountMismatch { r1: 2, r2: 1, .. }));
    }

    #[test]
    fn test_mixed_single_and_paired_fail() {
        let dir = TempDir::new().unwrap();
        touch_all(dir.path(), &["ABC_L001_R1.fasta", "ABC_L001.fasta"]);

        let err = samples_from_dir(dir.path(), false).unwrap_err();
        assert!(matches!(err, DiscoveryError::MixedRoles { .. }));
    }

    #[test]
    fn test_misaligned_lanes_fail() {
        let dir = TempDir::new().unwrap();
        touch_all(
            dir.path(),
            &["ABC_L001_R1.fq", "ABC_L002_R1.fq", "ABC_L001_R2.fq", "ABC_L003_R2.fq"],
        );

        let err = samples_from_dir(dir.path(), false).unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::LaneMismatch {
                r1_lane: Some(2),
                r2_lane: Some(3),
                ..
            }
        ));
    }

    #[test]
    fn test_single_end_lanes_concatenate() {
        let dir = TempDir::new().unwrap();
        touch_all(dir.path(), &["S_L002.fastq", "S_L001.fastq"]);

        let samples = samples_from_dir(dir.path(), false).unwrap();
        assert_eq!(names(&samples["S"].single), ["S_L001.fastq", "S_L002.fastq"]);
        assert_eq!(samples["S"].upload_name(FileRole::Single).unwrap(), "S.fastq");
    }

    #[test]
    fn test_conflicting_single_files_fail() {
        let dir = TempDir::new().unwrap();
        touch_all(dir.path(), &["S.fastq", "S.fasta"]);

        let err = samples_from_dir(dir.path(), false).unwrap_err();
        assert!(matches!(err, DiscoveryError::DuplicateSingle { .. }));
    }

    #[test]
    fn test_rejects_file_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("A.fastq");
        fs::write(&file, b"").unwrap();

        let err = samples_from_dir(&file, false).unwrap_err();
        assert!(matches!(err, DiscoveryError::NotADirectory { .. }));
    }

    #[test]
    fn test_sample_limit() {
        let dir = TempDir::new().unwrap();
        for i in 0..=MAX_SAMPLES_PER_UPLOAD {
            fs::write(dir.path().join(format!("s{i:04}.fa")), b"").unwrap();
        }

        let err = samples_from_dir(dir.path(), false).unwrap_err();
        assert!(matches!(err, DiscoveryError::TooManySamples { .. }));
    }

    #[test]
    fn test_match_remote_name() {
        let mut files = SampleFileSet {
            r1: vec![PathBuf::from("/d/ABC_L001_R1.fq"), PathBuf::from("/d/ABC_L002_R1.fq")],
            r2: vec![PathBuf::from("/d/ABC_L001_R2.fq"), PathBuf::from("/d/ABC_L002_R2.fq")],
            ..Default::default()
        };
        files.attach_consensus_inputs(Some(Path::new("/ref/ref.fa")), Some(Path::new("/ref/p.bed")));

        assert_eq!(files.match_remote_name("ABC_R2.fq").unwrap(), files.r2.as_slice());
        assert_eq!(files.match_remote_name("p.bed").unwrap(), files.primer_bed.as_slice());

        let candidates = files.match_remote_name("other.fq").unwrap_err();
        assert_eq!(candidates, ["ABC_R1.fq", "ABC_R2.fq", "ref.fa", "p.bed"]);
    }

    #[test]
    fn test_from_reads() {
        let pair = SampleFileSet::from_reads("a_R1.fq".into(), Some("a_R2.fq".into())).unwrap();
        assert!(pair.is_paired());

        let single = SampleFileSet::from_reads("a.fq".into(), None).unwrap();
        assert_eq!(single.single.len(), 1);

        assert!(SampleFileSet::from_reads("a.fq".into(), Some("a.fq".into())).is_err());
    }
}
