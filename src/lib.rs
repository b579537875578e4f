// EHR Utils - Core Library
// Patients + lab results from two TSV extracts, linked and queryable.
// Exposes all modules for use in the CLI and tests

pub mod error;
pub mod temporal;
pub mod entities;
pub mod parser;
pub mod report;

// Re-export commonly used types
pub use error::{EhrError, Result, RowLocation};
pub use temporal::{
    Clock, FixedClock, SystemClock,
    format_timestamp, parse_timestamp, years_between,
    TIMESTAMP_FORMAT,
};
pub use entities::{Comparison, Lab, Patient, PatientRegistry};
pub use parser::{
    FromRow, TableRow, PatientRow, LabRow,
    attach_labs, load_patients, parse_data, parse_readers,
};
pub use report::{PatientSummary, SickReport, sick_report, summarize};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
