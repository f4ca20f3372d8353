//! Combining metadata sources and resolving collection locations

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::{debug, info};

use super::sheet::read_sheet;
use super::types::{GeoSuggestion, Metadata};
use crate::app::client::RemoteApi;
use crate::errors::{MetadataError, MetadataResult};

/// Parse `KEY=VALUE` pairs given on the command line
///
/// Only the first `=` splits, so values may contain `=`.
pub fn parse_metadata_pairs<I>(pairs: I) -> MetadataResult<Metadata>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let parsed = pairs
        .into_iter()
        .map(|pair| {
            let pair = pair.as_ref();
            pair.split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| MetadataError::InvalidMetadatum {
                    raw: pair.to_string(),
                })
        })
        .collect::<MetadataResult<Vec<_>>>()?;
    Ok(Metadata::new(parsed))
}

/// Build one metadata value per discovered sample
///
/// Without a sheet every sample starts empty. With a sheet, rows for unknown
/// samples are dropped and a discovered sample without a row is an error.
/// Command-line metadata is fused on top in both cases.
///
/// # Errors
///
/// Returns `MetadataError::MissingSamples` naming every sample the sheet
/// lacks, or the sheet's own parse error.
pub fn combine_metadata<'a, I>(
    sample_names: I,
    cli_metadata: &Metadata,
    sheet: Option<BTreeMap<String, Metadata>>,
) -> MetadataResult<BTreeMap<String, Metadata>>
where
    I: IntoIterator<Item = &'a str>,
{
    let has_sheet = sheet.is_some();
    let mut sheet = sheet.unwrap_or_default();
    let mut combined = BTreeMap::new();
    let mut missing = Vec::new();

    for name in sample_names {
        match sheet.remove(name) {
            Some(metadata) => {
                combined.insert(name.to_string(), metadata.fuse(cli_metadata));
            }
            None if has_sheet => missing.push(name.to_string()),
            None => {
                combined.insert(name.to_string(), Metadata::default().fuse(cli_metadata));
            }
        }
    }

    for name in sheet.keys() {
        debug!("ignoring metadata for '{}', no matching sample files", name);
    }

    if !missing.is_empty() {
        return Err(MetadataError::MissingSamples { names: missing });
    }
    Ok(combined)
}

/// Load the optional sheet and combine it with command-line metadata
pub fn load_metadata<'a, I>(
    sample_names: I,
    cli_metadata: &Metadata,
    sheet_path: Option<&Path>,
) -> MetadataResult<BTreeMap<String, Metadata>>
where
    I: IntoIterator<Item = &'a str>,
{
    let sheet = sheet_path.map(read_sheet).transpose()?;
    combine_metadata(sample_names, cli_metadata, sheet)
}

/// A raw location the service resolved to a different display form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRewrite {
    pub raw: String,
    pub resolved: String,
}

/// Run-wide cache of location lookups
///
/// Keyed by the raw string and whether the host is human, since human
/// samples get a coarser suggestion. Entries are only ever added.
#[derive(Debug, Default)]
pub struct GeoCache {
    entries: HashMap<(String, bool), GeoSuggestion>,
}

impl GeoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve one raw location, asking the service only on a cache miss
    pub async fn resolve(
        &mut self,
        api: &dyn RemoteApi,
        raw: &str,
        is_human: bool,
    ) -> MetadataResult<GeoSuggestion> {
        let key = (raw.to_string(), is_human);
        if let Some(cached) = self.entries.get(&key) {
            return Ok(cached.clone());
        }
        let suggestion = api
            .get_geo_suggestion(raw, is_human)
            .await
            .map_err(MetadataError::Geocode)?;
        debug!("resolved location '{}' to '{}'", raw, suggestion);
        self.entries.insert(key, suggestion.clone());
        Ok(suggestion)
    }

    /// Resolve the collection location of every sample
    ///
    /// Samples with an empty raw location are left alone. Each raw string the
    /// service rewrites is reported once.
    pub async fn resolve_all<'a, I>(
        &mut self,
        api: &dyn RemoteApi,
        samples: I,
    ) -> MetadataResult<Vec<LocationRewrite>>
    where
        I: IntoIterator<Item = &'a mut Metadata>,
    {
        let mut rewrites: Vec<LocationRewrite> = Vec::new();
        for metadata in samples {
            let raw = metadata.raw_collection_location().to_string();
            if raw.is_empty() {
                continue;
            }
            let suggestion = self.resolve(api, &raw, metadata.is_human()).await?;
            let resolved = suggestion.to_string();
            if !suggestion.is_empty()
                && resolved != raw
                && !rewrites.iter().any(|rewrite| rewrite.raw == raw)
            {
                println!("  replacing location \"{}\" with \"{}\"", raw, resolved);
                info!("replacing location '{}' with '{}'", raw, resolved);
                rewrites.push(LocationRewrite { raw, resolved });
            }
            metadata.set_collection_location(suggestion);
        }
        Ok(rewrites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::MockRemoteApi;

    fn names() -> Vec<&'static str> {
        vec!["a", "b"]
    }

    #[test]
    fn test_parse_metadata_pairs() {
        let metadata = parse_metadata_pairs(["host_genome=Human", "Notes=a=b"]).unwrap();
        assert!(metadata.is_human());
        assert_eq!(metadata.get("Notes"), Some("a=b"));

        let err = parse_metadata_pairs(["novalue"]).unwrap_err();
        assert!(matches!(err, MetadataError::InvalidMetadatum { .. }));
    }

    #[test]
    fn test_combine_without_sheet_fills_empty() {
        let cli = Metadata::new([("Water Control", "No")]);
        let combined = combine_metadata(names(), &cli, None).unwrap();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined["b"].get("Water Control"), Some("No"));
    }

    #[test]
    fn test_combine_with_sheet_requires_every_sample() {
        let mut sheet = BTreeMap::new();
        sheet.insert("a".to_string(), Metadata::new([("Foo", "1")]));
        sheet.insert("zzz".to_string(), Metadata::new([("Foo", "2")]));

        let err = combine_metadata(names(), &Metadata::default(), Some(sheet)).unwrap_err();
        match err {
            MetadataError::MissingSamples { names } => assert_eq!(names, vec!["b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cli_metadata_wins_over_sheet() {
        let mut sheet = BTreeMap::new();
        sheet.insert("a".to_string(), Metadata::new([("Foo", "sheet")]));
        let cli = Metadata::new([("Foo", "flag")]);

        let combined = combine_metadata(["a"], &cli, Some(sheet)).unwrap();
        assert_eq!(combined["a"].get("Foo"), Some("flag"));
    }

    #[tokio::test]
    async fn test_geocode_each_location_once() {
        let mut api = MockRemoteApi::new();
        api.expect_get_geo_suggestion()
            .times(1)
            .returning(|_, _| {
                Ok(GeoSuggestion {
                    name: "California, USA".to_string(),
                    geo_level: "state".to_string(),
                    state_name: "California".to_string(),
                    country_name: "USA".to_string(),
                    ..Default::default()
                })
            });

        let mut samples = vec![
            Metadata::new([("collection_location", "california")]),
            Metadata::new([("collection_location", "california")]),
            Metadata::default(),
        ];
        let mut cache = GeoCache::new();
        let rewrites = cache.resolve_all(&api, samples.iter_mut()).await.unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(rewrites.len(), 1);
        assert_eq!(rewrites[0].resolved, "California, USA");
        assert_eq!(
            samples[1].collection_location().map(|s| s.state_name.as_str()),
            Some("California")
        );
        assert!(samples[2].collection_location().is_none());
    }

    #[tokio::test]
    async fn test_geocode_distinguishes_human_hosts() {
        let mut api = MockRemoteApi::new();
        api.expect_get_geo_suggestion()
            .times(2)
            .returning(|_, _| Ok(GeoSuggestion::default()));

        let mut samples = vec![
            Metadata::new([("collection_location", "Oakland"), ("host_genome", "Human")]),
            Metadata::new([("collection_location", "Oakland"), ("host_genome", "Mosquito")]),
        ];
        let mut cache = GeoCache::new();
        let rewrites = cache.resolve_all(&api, samples.iter_mut()).await.unwrap();

        assert!(rewrites.is_empty());
        assert_eq!(cache.len(), 2);
        assert_eq!(samples[0].raw_collection_location(), "Oakland");
    }
}
