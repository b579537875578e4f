// ⚠️ Error taxonomy for ingestion and patient queries
// Every failure is raised straight to the caller: nothing is retried or skipped.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// ROW LOCATION
// ============================================================================

/// Where in a source table a row came from (file name + 1-based line)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLocation {
    pub source: String,
    pub line: u64,
}

impl RowLocation {
    pub fn new(source: impl Into<String>, line: u64) -> Self {
        RowLocation {
            source: source.into(),
            line,
        }
    }
}

impl fmt::Display for RowLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

fn at(location: &Option<RowLocation>) -> String {
    match location {
        Some(loc) => format!(" at {}", loc),
        None => String::new(),
    }
}

// ============================================================================
// ERROR
// ============================================================================

#[derive(Error, Debug)]
pub enum EhrError {
    /// Malformed date or numeric text
    #[error("malformed value '{value}' (expected {expected}){}", at(.location))]
    Format {
        expected: &'static str,
        value: String,
        location: Option<RowLocation>,
    },

    /// Required column absent from a row
    #[error("{location}: missing required column '{column}'")]
    MissingField {
        location: RowLocation,
        column: String,
    },

    /// Lab row references a PatientID the patient file never declared
    #[error("{location}: lab references unknown patient '{patient_id}'")]
    UnknownPatient {
        location: RowLocation,
        patient_id: String,
    },

    /// Query needs labs but the patient has none
    #[error("patient '{patient_id}' has no lab results")]
    EmptyData { patient_id: String },

    #[error("unsupported comparison operator '{0}' (expected '>' or '<')")]
    UnsupportedOperator(String),

    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read TSV {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },
}

impl EhrError {
    /// Tag a format error with the row it came from.
    /// Other variants already carry their own location and pass through.
    pub fn at_row(self, row: &RowLocation) -> Self {
        match self {
            EhrError::Format {
                expected,
                value,
                location: None,
            } => EhrError::Format {
                expected,
                value,
                location: Some(row.clone()),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, EhrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_message_without_location() {
        let err = EhrError::Format {
            expected: "a number",
            value: "abc".to_string(),
            location: None,
        };
        assert_eq!(err.to_string(), "malformed value 'abc' (expected a number)");
    }

    #[test]
    fn test_at_row_fills_missing_location() {
        let err = EhrError::Format {
            expected: "a number",
            value: "abc".to_string(),
            location: None,
        }
        .at_row(&RowLocation::new("labs.tsv", 4));

        assert_eq!(
            err.to_string(),
            "malformed value 'abc' (expected a number) at labs.tsv:4"
        );
    }

    #[test]
    fn test_at_row_keeps_other_variants() {
        let err = EhrError::EmptyData {
            patient_id: "P1".to_string(),
        }
        .at_row(&RowLocation::new("labs.tsv", 4));

        assert!(matches!(err, EhrError::EmptyData { .. }));
    }

    #[test]
    fn test_missing_field_message() {
        let err = EhrError::MissingField {
            location: RowLocation::new("patients.tsv", 2),
            column: "PatientRace".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "patients.tsv:2: missing required column 'PatientRace'"
        );
    }
}
