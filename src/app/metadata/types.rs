//! Metadata value types
//!
//! [`Metadata`] keeps the host organism and the collection location apart from
//! the open bag of fields, so the aliases users type never leak into what is
//! sent to the service.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::constants::metadata::{
    COLLECTION_LOCATION_ALIASES, COLLECTION_LOCATION_FIELD, HOST_GENOME_ALIASES,
    HOST_GENOME_FIELD, HUMAN_HOST,
};

/// Structured place resolved from a free-text location
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSuggestion {
    pub name: String,
    pub geo_level: String,
    pub country_name: String,
    pub state_name: String,
    pub subdivision_name: String,
    pub city_name: String,
    pub country_code: String,
}

impl GeoSuggestion {
    /// Whether nothing was resolved
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Drop city-level detail, used for human hosts
    ///
    /// The subdivision goes too when it only repeats the city. The display
    /// name and geo level are rebuilt from what remains.
    pub fn coarsen_for_human(&mut self) {
        if self.geo_level != "city" {
            return;
        }
        if self.subdivision_name == self.city_name {
            self.subdivision_name.clear();
        }
        self.city_name.clear();
        self.name = [&self.subdivision_name, &self.state_name, &self.country_name]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        if !self.subdivision_name.is_empty() {
            self.geo_level = "subdivision".to_string();
        } else if !self.state_name.is_empty() {
            self.geo_level = "state".to_string();
        } else if !self.country_name.is_empty() {
            self.geo_level = "country".to_string();
        }
    }
}

impl fmt::Display for GeoSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places: Vec<&str> = [
            &self.city_name,
            &self.subdivision_name,
            &self.state_name,
            &self.country_name,
        ]
        .into_iter()
        .filter(|place| !place.is_empty())
        .map(String::as_str)
        .collect();
        write!(f, "{}", places.join(", "))
    }
}

/// Metadata for one sample
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    host_genome: Option<String>,
    raw_collection_location: String,
    collection_location: Option<GeoSuggestion>,
    fields: BTreeMap<String, String>,
}

impl Metadata {
    /// Build metadata from field/value pairs, folding aliased fields
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut metadata = Self::default();
        for (key, value) in pairs {
            metadata.set(key.into(), value.into());
        }
        metadata
    }

    fn set(&mut self, key: String, value: String) {
        if HOST_GENOME_ALIASES.contains(&key.as_str()) {
            self.host_genome = Some(value);
        } else if COLLECTION_LOCATION_ALIASES.contains(&key.as_str()) {
            self.raw_collection_location = value;
        } else {
            self.fields.insert(key, value);
        }
    }

    /// Combine with `other`, whose values win
    ///
    /// An empty collection location on `other` keeps the one on `self`.
    pub fn fuse(&self, other: &Metadata) -> Metadata {
        let mut fused = self.clone();
        fused
            .fields
            .extend(other.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        if other.host_genome.is_some() {
            fused.host_genome = other.host_genome.clone();
        }
        if !other.raw_collection_location.is_empty() {
            fused.raw_collection_location = other.raw_collection_location.clone();
        }
        if other.collection_location.is_some() {
            fused.collection_location = other.collection_location.clone();
        }
        fused
    }

    pub fn host_genome(&self) -> Option<&str> {
        self.host_genome.as_deref()
    }

    pub fn raw_collection_location(&self) -> &str {
        &self.raw_collection_location
    }

    pub fn collection_location(&self) -> Option<&GeoSuggestion> {
        self.collection_location.as_ref()
    }

    /// Store a resolved location; an empty suggestion clears it
    pub fn set_collection_location(&mut self, suggestion: GeoSuggestion) {
        self.collection_location = (!suggestion.is_empty()).then_some(suggestion);
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Whether the host organism is human
    pub fn is_human(&self) -> bool {
        self.host_genome
            .as_deref()
            .is_some_and(|host| host.eq_ignore_ascii_case(HUMAN_HOST))
    }
}

/// Collection location as sent to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocationValue<'a> {
    Resolved(&'a GeoSuggestion),
    Raw(&'a str),
}

impl Metadata {
    /// The serialized form of the collection location, if any
    pub fn location_value(&self) -> Option<LocationValue<'_>> {
        match &self.collection_location {
            Some(suggestion) => Some(LocationValue::Resolved(suggestion)),
            None if !self.raw_collection_location.is_empty() => {
                Some(LocationValue::Raw(&self.raw_collection_location))
            }
            None => None,
        }
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let location = self.location_value();
        let len = self.fields.len()
            + usize::from(self.host_genome.is_some())
            + usize::from(location.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        if let Some(host) = &self.host_genome {
            map.serialize_entry(HOST_GENOME_FIELD, host)?;
        }
        if let Some(location) = location {
            map.serialize_entry(COLLECTION_LOCATION_FIELD, &location)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn koala() -> Metadata {
        Metadata::new([
            ("host_genome", "Koala"),
            ("collection_location", "X"),
            ("Water Control", "No"),
            ("Nucleotide Type", "DNA"),
        ])
    }

    #[test]
    fn test_fuse_is_right_biased() {
        let b = Metadata::new([
            ("host_genome", "Human"),
            ("Water Control", "Yes"),
            ("Foo", "Bar"),
        ]);
        let fused = koala().fuse(&b);

        assert!(fused.is_human());
        assert_eq!(fused.raw_collection_location(), "X");
        assert_eq!(fused.get("Water Control"), Some("Yes"));
        assert_eq!(fused.get("Nucleotide Type"), Some("DNA"));
        assert_eq!(fused.get("Foo"), Some("Bar"));
    }

    #[test]
    fn test_aliases_are_folded() {
        let metadata = koala();
        assert_eq!(metadata.host_genome(), Some("Koala"));
        assert!(metadata.get("host_genome").is_none());
        assert!(metadata.get("collection_location").is_none());
    }

    #[test]
    fn test_serialize_uses_normalized_names() {
        let value = serde_json::to_value(koala()).unwrap();
        assert_eq!(
            value,
            json!({
                "Water Control": "No",
                "Nucleotide Type": "DNA",
                "Host Organism": "Koala",
                "Collection Location": "X",
            })
        );
    }

    #[test]
    fn test_serialize_omits_empty_location() {
        let value = serde_json::to_value(Metadata::new([("Foo", "Bar")])).unwrap();
        assert_eq!(value, json!({ "Foo": "Bar" }));
    }

    #[test]
    fn test_serialize_prefers_suggestion() {
        let mut metadata = koala();
        metadata.set_collection_location(GeoSuggestion {
            name: "Sydney, Australia".to_string(),
            geo_level: "city".to_string(),
            country_name: "Australia".to_string(),
            city_name: "Sydney".to_string(),
            ..Default::default()
        });
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["Collection Location"]["city_name"], "Sydney");
    }

    #[test]
    fn test_coarsen_city_for_human() {
        let mut suggestion = GeoSuggestion {
            name: "San Francisco, California, USA".to_string(),
            geo_level: "city".to_string(),
            country_name: "USA".to_string(),
            state_name: "California".to_string(),
            subdivision_name: "San Francisco".to_string(),
            city_name: "San Francisco".to_string(),
            country_code: "us".to_string(),
        };
        suggestion.coarsen_for_human();
        assert_eq!(suggestion.name, "California, USA");
        assert_eq!(suggestion.geo_level, "state");
        assert!(suggestion.city_name.is_empty());
        assert_eq!(suggestion.to_string(), "California, USA");
    }

    #[test]
    fn test_display_order() {
        let suggestion = GeoSuggestion {
            city_name: "Oakland".to_string(),
            subdivision_name: "Alameda County".to_string(),
            state_name: "California".to_string(),
            country_name: "USA".to_string(),
            ..Default::default()
        };
        assert_eq!(
            suggestion.to_string(),
            "Oakland, Alameda County, California, USA"
        );
    }
}
