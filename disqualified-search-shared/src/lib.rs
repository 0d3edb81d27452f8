//! # Disqualified Search Shared
//!
//! This crate defines shared data structures used across the disqualified officers
//! search indexer. It includes the change envelope received from the resource-changed
//! stream, the officer disqualification payload it carries, and the document that is
//! written to the search index.

pub mod types;

pub use types::change_envelope::{ChangeEnvelope, EventKind, EventRecord};
pub use types::disqualified_officer_document::{
    DisqualifiedOfficerDocument, DisqualifiedOfficerItem, DocumentLinks, DOCUMENT_KIND,
    RECORD_TYPE,
};
pub use types::officer_disqualification::{
    Address, Disqualification, DisqualificationLinks, DisqualificationReason,
    OfficerDisqualification,
};
