//! This module defines the core data structures used across the search indexer.
//! It re-exports the envelope, payload and document types.

pub mod change_envelope;
pub mod disqualified_officer_document;
pub mod officer_disqualification;

pub use change_envelope::{ChangeEnvelope, EventKind, EventRecord};
pub use disqualified_officer_document::DisqualifiedOfficerDocument;
pub use officer_disqualification::OfficerDisqualification;
