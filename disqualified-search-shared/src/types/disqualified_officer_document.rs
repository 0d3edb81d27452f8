//! Disqualified officer document types for the search index.
//!
//! This module defines the document structure that is indexed in the search engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind value of every disqualified officer search document.
pub const DOCUMENT_KIND: &str = "searchresults#disqualified-officer";

/// Record type of every disqualified officer search item.
pub const RECORD_TYPE: &str = "disqualifications";

/// Document representation for the search index.
///
/// One document exists per disqualified officer and is stored under the
/// resource id of the change envelope it was built from. The document contains
/// no generated values, so building it twice from the same payload yields equal
/// documents and re-indexing is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisqualifiedOfficerDocument {
    pub kind: String,
    pub items: Vec<DisqualifiedOfficerItem>,
    pub links: DocumentLinks,
    pub sort_key: String,
}

impl DisqualifiedOfficerDocument {
    /// The self link of the document.
    pub fn self_link(&self) -> &str {
        &self.links.self_link
    }
}

/// Searchable projection of a disqualified officer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisqualifiedOfficerItem {
    pub record_type: String,
    /// Full display name (person name or corporate name).
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_forenames: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub honours: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corporate_name: Option<String>,
    /// Normalised name used for wildcard matching.
    pub wildcard_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disqualified_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disqualified_until: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub company_names: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub case_identifiers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentLinks {
    #[serde(rename = "self")]
    pub self_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> DisqualifiedOfficerDocument {
        DisqualifiedOfficerDocument {
            kind: DOCUMENT_KIND.to_string(),
            items: vec![DisqualifiedOfficerItem {
                record_type: RECORD_TYPE.to_string(),
                name: "John SMITH".to_string(),
                title: None,
                forename: Some("John".to_string()),
                other_forenames: None,
                surname: Some("SMITH".to_string()),
                honours: None,
                corporate_name: None,
                wildcard_key: "johnsmith".to_string(),
                full_address: None,
                date_of_birth: NaiveDate::from_ymd_opt(1970, 1, 2),
                nationality: None,
                disqualified_from: None,
                disqualified_until: None,
                company_names: Vec::new(),
                case_identifiers: Vec::new(),
            }],
            links: DocumentLinks {
                self_link: "/disqualified-officers/natural/123456789".to_string(),
            },
            sort_key: "john smith 123456789".to_string(),
        }
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample_document()).unwrap();

        assert_eq!(json["kind"], DOCUMENT_KIND);
        assert_eq!(
            json["links"]["self"],
            "/disqualified-officers/natural/123456789"
        );
        assert_eq!(json["items"][0]["date_of_birth"], "1970-01-02");
        // Absent optional fields are omitted rather than written as null
        assert!(json["items"][0].get("corporate_name").is_none());
        assert!(json["items"][0].get("company_names").is_none());
    }

    #[test]
    fn test_self_link() {
        assert_eq!(
            sample_document().self_link(),
            "/disqualified-officers/natural/123456789"
        );
    }
}
