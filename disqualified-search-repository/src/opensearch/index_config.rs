//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the disqualified
//! officer search index.

use serde_json::{json, Value};

/// Default alias documents are written to.
pub const DEFAULT_INDEX_ALIAS: &str = "disqualified-officers";

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The alias name for the search index (used for all document operations).
    pub alias: String,
    /// The version number of the concrete index (e.g. 0 for "disqualified-officers_v0").
    pub version: u32,
}

impl IndexConfig {
    /// Create a new index configuration.
    ///
    /// # Arguments
    ///
    /// * `alias` - The index alias name
    /// * `version` - The version number
    pub fn new(alias: impl Into<String>, version: u32) -> Self {
        Self {
            alias: alias.into(),
            version,
        }
    }

    /// Name of the concrete index behind the alias (e.g. "disqualified-officers_v0").
    pub fn versioned_index_name(&self) -> String {
        format!("{}_v{}", self.alias, self.version)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_ALIAS, 0)
    }
}

/// Get the index settings and mappings for the disqualified officer index.
///
/// Names and addresses are full-text fields with a `raw` keyword sub-field for
/// exact matching and sorting. Identifiers and the wildcard key are keywords.
/// Links are stored but not indexed.
pub fn get_index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "properties": {
                "kind": { "type": "keyword" },
                "sort_key": { "type": "keyword" },
                "links": {
                    "properties": {
                        "self": { "type": "keyword", "index": false }
                    }
                },
                "items": {
                    "properties": {
                        "record_type": { "type": "keyword" },
                        "name": {
                            "type": "text",
                            "fields": { "raw": { "type": "keyword" } }
                        },
                        "title": { "type": "keyword" },
                        "forename": { "type": "text" },
                        "other_forenames": { "type": "text" },
                        "surname": {
                            "type": "text",
                            "fields": { "raw": { "type": "keyword" } }
                        },
                        "honours": { "type": "keyword" },
                        "corporate_name": {
                            "type": "text",
                            "fields": { "raw": { "type": "keyword" } }
                        },
                        "wildcard_key": { "type": "keyword" },
                        "full_address": { "type": "text" },
                        "date_of_birth": { "type": "date", "format": "yyyy-MM-dd" },
                        "nationality": { "type": "keyword" },
                        "disqualified_from": { "type": "date", "format": "yyyy-MM-dd" },
                        "disqualified_until": { "type": "date", "format": "yyyy-MM-dd" },
                        "company_names": { "type": "text" },
                        "case_identifiers": { "type": "keyword" }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        let settings = get_index_settings();

        assert!(settings["settings"]["number_of_shards"].is_number());
        assert!(settings["settings"]["number_of_replicas"].is_number());

        let items = &settings["mappings"]["properties"]["items"]["properties"];
        assert_eq!(items["name"]["type"], "text");
        assert_eq!(items["name"]["fields"]["raw"]["type"], "keyword");
        assert_eq!(items["wildcard_key"]["type"], "keyword");
        assert_eq!(items["date_of_birth"]["type"], "date");
        assert_eq!(
            settings["mappings"]["properties"]["links"]["properties"]["self"]["index"],
            false
        );
    }

    #[test]
    fn test_versioned_index_name() {
        assert_eq!(
            IndexConfig::default().versioned_index_name(),
            "disqualified-officers_v0"
        );
        assert_eq!(
            IndexConfig::new("officers", 3).versioned_index_name(),
            "officers_v3"
        );
    }
}
