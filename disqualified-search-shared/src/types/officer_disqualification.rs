//! Officer disqualification payload types.
//!
//! These mirror the JSON carried in the `data` field of a changed envelope.
//! Unknown fields are ignored; dates use the `YYYY-MM-DD` format.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind value used by corporate officer disqualifications.
pub const CORPORATE_KIND: &str = "corporate-disqualification";

/// A disqualified officer, either a natural person or a corporate body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfficerDisqualification {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub forename: Option<String>,
    #[serde(default)]
    pub other_forenames: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub honours: Option<String>,
    /// Corporate officer name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company_number: Option<String>,
    #[serde(default)]
    pub country_of_registration: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub disqualifications: Vec<Disqualification>,
    #[serde(default)]
    pub links: Option<DisqualificationLinks>,
    #[serde(default)]
    pub etag: Option<String>,
}

impl OfficerDisqualification {
    /// Whether this is a corporate officer rather than a natural person.
    pub fn is_corporate(&self) -> bool {
        match self.kind.as_deref() {
            Some(kind) => kind == CORPORATE_KIND,
            None => self.surname.is_none() && self.name.is_some(),
        }
    }

    /// The self link carried by the payload, if any.
    pub fn self_link(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.self_link.as_deref())
            .filter(|link| !link.is_empty())
    }
}

/// A single disqualification order or undertaking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Disqualification {
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub case_identifier: Option<String>,
    #[serde(default)]
    pub company_names: Vec<String>,
    #[serde(default)]
    pub court_name: Option<String>,
    #[serde(default)]
    pub disqualification_type: Option<String>,
    #[serde(default)]
    pub disqualified_from: Option<NaiveDate>,
    #[serde(default)]
    pub disqualified_until: Option<NaiveDate>,
    #[serde(default)]
    pub heard_on: Option<NaiveDate>,
    #[serde(default)]
    pub undertaken_on: Option<NaiveDate>,
    #[serde(default)]
    pub reason: Option<DisqualificationReason>,
}

/// Service address of a disqualified officer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub premises: Option<String>,
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub address_line_2: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Address {
    /// Join the non-empty address parts with `", "`.
    pub fn full_address(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.premises,
            &self.address_line_1,
            &self.address_line_2,
            &self.locality,
            &self.region,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Legal reason for a disqualification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisqualificationReason {
    #[serde(default)]
    pub description_identifier: Option<String>,
    #[serde(default)]
    pub act: Option<String>,
    #[serde(default)]
    pub article: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisqualificationLinks {
    #[serde(rename = "self", default)]
    pub self_link: Option<String>,
    #[serde(default)]
    pub officer: Option<String>,
}
