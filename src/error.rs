//! Data-quality errors raised by the reconciliation engine.

use crate::models::SnapshotYear;
use thiserror::Error;

/// Defects in a snapshot that would corrupt downstream totals.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("{year} record {id} is missing required field `{field}`")]
    MissingField {
        year: SnapshotYear,
        /// Policy identifier, or `#<position>` when the identifier itself is missing.
        id: String,
        field: &'static str,
    },

    #[error("{year} snapshot contains policy identifier {id} more than once")]
    DuplicateIdentifier { year: SnapshotYear, id: String },

    #[error("{year} record {id} uses reserved company name \"{company}\"")]
    ReservedCompany {
        year: SnapshotYear,
        id: String,
        company: String,
    },
}
