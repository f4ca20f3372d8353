//! Tabular form of sample metadata for remote validation

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use super::types::Metadata;
use crate::constants::metadata::{COLLECTION_LOCATION_FIELD, HOST_GENOME_FIELD, SAMPLE_NAME_COLUMN};

/// Header row plus one row per sample
///
/// Columns are `Sample Name`, `Collection Location`, `Host Organism` when any
/// sample names one, then every other field in sorted order. Cells a sample
/// does not fill are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl MetadataTable {
    pub fn from_samples<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Metadata)>,
    {
        let samples: Vec<(&str, &Metadata)> = samples.into_iter().collect();
        let with_host = samples.iter().any(|(_, m)| m.host_genome().is_some());
        let fields: BTreeSet<&str> = samples
            .iter()
            .flat_map(|(_, m)| m.fields().keys().map(String::as_str))
            .collect();

        let mut headers = vec![
            SAMPLE_NAME_COLUMN.to_string(),
            COLLECTION_LOCATION_FIELD.to_string(),
        ];
        if with_host {
            headers.push(HOST_GENOME_FIELD.to_string());
        }
        headers.extend(fields.iter().map(|field| field.to_string()));

        let rows = samples
            .iter()
            .map(|(name, metadata)| {
                let mut row = vec![
                    Value::from(*name),
                    metadata
                        .location_value()
                        .and_then(|location| serde_json::to_value(location).ok())
                        .unwrap_or_else(|| Value::from("")),
                ];
                if with_host {
                    row.push(Value::from(metadata.host_genome().unwrap_or_default()));
                }
                row.extend(
                    fields
                        .iter()
                        .map(|field| Value::from(metadata.get(field).unwrap_or_default())),
                );
                row
            })
            .collect();

        Self { headers, rows }
    }

    /// Sample names in row order
    pub fn sample_names(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_str).map(str::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_columns_and_blank_cells() {
        let a = Metadata::new([("host_genome", "Human"), ("Water Control", "No")]);
        let b = Metadata::new([("collection_location", "Oakland"), ("Foo", "Bar")]);
        let table = MetadataTable::from_samples([("a", &a), ("b", &b)]);

        assert_eq!(
            table.headers,
            vec!["Sample Name", "Collection Location", "Host Organism", "Foo", "Water Control"]
        );
        assert_eq!(table.rows[0], vec![json!("a"), json!(""), json!("Human"), json!(""), json!("No")]);
        assert_eq!(table.rows[1], vec![json!("b"), json!("Oakland"), json!(""), json!("Bar"), json!("")]);
        assert_eq!(table.sample_names(), vec!["a", "b"]);
    }
}
