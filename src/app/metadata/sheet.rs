//! Metadata spreadsheet parsing

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use super::types::Metadata;
use crate::constants::metadata::SAMPLE_NAME_COLUMN;
use crate::errors::{MetadataError, MetadataResult};

/// Characters stripped from the ends of headers and cells
fn is_invisible(c: char) -> bool {
    c.is_control()
        || (c.is_whitespace() && c != ' ')
        || matches!(
            c,
            '\u{00AD}' | '\u{200B}'..='\u{200F}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
        )
}

/// Trim non-printable characters (BOMs, zero-width marks, control codes)
pub fn trim_invisible(value: &str) -> &str {
    value.trim_matches(is_invisible)
}

/// Parse a metadata sheet keyed by the `Sample Name` column
///
/// The first row names the fields. Blank rows are skipped and short rows
/// fill the missing cells with empty strings.
///
/// # Errors
///
/// Returns `MetadataError` when the sheet is malformed, when the sample name
/// column is absent, or when a row stops before the sample name cell.
pub fn parse_sheet<R: Read>(reader: R) -> MetadataResult<BTreeMap<String, Metadata>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = csv_reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record?
            .iter()
            .map(|header| trim_invisible(header).to_string())
            .collect(),
        None => return Ok(BTreeMap::new()),
    };

    let name_index = headers
        .iter()
        .position(|header| header == SAMPLE_NAME_COLUMN)
        .ok_or(MetadataError::MissingSampleNameColumn {
            column: SAMPLE_NAME_COLUMN,
        })?;

    let mut samples = BTreeMap::new();
    for (index, record) in records.enumerate() {
        let record = record?;
        let row = index + 1;
        if record.iter().all(|cell| trim_invisible(cell).is_empty()) {
            continue;
        }

        let name = record
            .get(name_index)
            .map(|cell| trim_invisible(cell).to_string())
            .ok_or(MetadataError::RowMissingSampleName { row })?;

        let fields = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != name_index)
            .map(|(i, header)| {
                let value = record.get(i).map(trim_invisible).unwrap_or_default();
                (header.clone(), value.to_string())
            });
        debug!("read metadata row {} for sample '{}'", row, name);
        samples.insert(name, Metadata::new(fields));
    }
    Ok(samples)
}

/// Read and parse a metadata sheet from disk
pub fn read_sheet(path: &Path) -> MetadataResult<BTreeMap<String, Metadata>> {
    let file = std::fs::File::open(path)?;
    parse_sheet(file)
}
