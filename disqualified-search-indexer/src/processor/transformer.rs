//! Transformation of officer disqualification payloads into search documents.

use thiserror::Error;
use tracing::debug;

use disqualified_search_shared::{
    ChangeEnvelope, DisqualifiedOfficerDocument, DisqualifiedOfficerItem, DocumentLinks,
    OfficerDisqualification, DOCUMENT_KIND, RECORD_TYPE,
};

/// Errors that can occur while transforming a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The payload is not a usable officer disqualification.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl TransformError {
    /// Create a malformed payload error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }
}

/// Maps the payload of a changed envelope to a search document.
///
/// Implementations must be pure: no I/O, and the same input always produces
/// the same document.
pub trait DocumentTransformer: Send + Sync {
    /// Transform `payload` (the envelope's `data`) into a document.
    fn transform(
        &self,
        envelope: &ChangeEnvelope,
        payload: &str,
    ) -> Result<DisqualifiedOfficerDocument, TransformError>;
}

/// Transformer for officer disqualification payloads.
#[derive(Debug, Clone, Default)]
pub struct DisqualificationTransformer;

impl DisqualificationTransformer {
    pub fn new() -> Self {
        Self
    }

    fn build_item(officer: &OfficerDisqualification) -> Result<DisqualifiedOfficerItem, TransformError> {
        let name = display_name(officer)
            .ok_or_else(|| TransformError::malformed("officer has no name"))?;

        let first = officer.disqualifications.first();
        let full_address = first
            .and_then(|d| d.address.as_ref())
            .and_then(|address| address.full_address());

        let disqualified_from = officer
            .disqualifications
            .iter()
            .filter_map(|d| d.disqualified_from)
            .min();
        let disqualified_until = officer
            .disqualifications
            .iter()
            .filter_map(|d| d.disqualified_until)
            .max();

        let company_names = distinct(
            officer
                .disqualifications
                .iter()
                .flat_map(|d| d.company_names.iter().map(String::as_str)),
        );
        let case_identifiers = distinct(
            officer
                .disqualifications
                .iter()
                .filter_map(|d| d.case_identifier.as_deref()),
        );

        let corporate = officer.is_corporate();

        Ok(DisqualifiedOfficerItem {
            record_type: RECORD_TYPE.to_string(),
            wildcard_key: wildcard_key(&name),
            name,
            title: non_blank(&officer.title).filter(|_| !corporate),
            forename: non_blank(&officer.forename).filter(|_| !corporate),
            other_forenames: non_blank(&officer.other_forenames).filter(|_| !corporate),
            surname: non_blank(&officer.surname).filter(|_| !corporate),
            honours: non_blank(&officer.honours).filter(|_| !corporate),
            corporate_name: non_blank(&officer.name).filter(|_| corporate),
            full_address,
            date_of_birth: officer.date_of_birth.filter(|_| !corporate),
            nationality: non_blank(&officer.nationality).filter(|_| !corporate),
            disqualified_from,
            disqualified_until,
            company_names,
            case_identifiers,
        })
    }
}

impl DocumentTransformer for DisqualificationTransformer {
    fn transform(
        &self,
        envelope: &ChangeEnvelope,
        payload: &str,
    ) -> Result<DisqualifiedOfficerDocument, TransformError> {
        let officer: OfficerDisqualification = serde_json::from_str(payload)
            .map_err(|e| TransformError::malformed(e.to_string()))?;

        if officer.disqualifications.is_empty() {
            return Err(TransformError::malformed("officer has no disqualifications"));
        }

        let self_link = match officer.self_link() {
            Some(link) => link.to_string(),
            None if !envelope.resource_uri.trim().is_empty() => envelope.resource_uri.clone(),
            None => return Err(TransformError::malformed("no self link")),
        };

        let item = Self::build_item(&officer)?;
        let sort_key = format!("{} {}", item.name.to_lowercase(), envelope.resource_id);

        debug!(
            context_id = %envelope.context_id,
            resource_id = %envelope.resource_id,
            corporate = officer.is_corporate(),
            "Transformed officer disqualification"
        );

        Ok(DisqualifiedOfficerDocument {
            kind: DOCUMENT_KIND.to_string(),
            items: vec![item],
            links: DocumentLinks { self_link },
            sort_key,
        })
    }
}

/// Person name from its parts, or the corporate name.
fn display_name(officer: &OfficerDisqualification) -> Option<String> {
    if officer.is_corporate() {
        return non_blank(&officer.name);
    }

    let parts: Vec<&str> = [&officer.forename, &officer.other_forenames, &officer.surname]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Lowercased name with everything but letters and digits removed.
fn wildcard_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Non-blank values in first-seen order without duplicates.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values.map(str::trim).filter(|v| !v.is_empty()) {
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
