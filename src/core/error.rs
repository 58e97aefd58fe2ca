use super::types::FamilyType;

/// Conditions surfaced by the comparison operations.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("no baseline budget for {family_type} families in {county_state}")]
    NotFound {
        county_state: String,
        family_type: FamilyType,
    },

    #[error("invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("invalid family type: {0}")]
    InvalidFamilyType(String),
}

/// Errors raised while building the reference dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("invalid record in {path} at line {line}: {message}")]
    InvalidRecord {
        path: String,
        line: u64,
        message: String,
    },

    #[error("duplicate entry for {county_state} ({family_type})")]
    DuplicateKey {
        county_state: String,
        family_type: FamilyType,
    },
}
