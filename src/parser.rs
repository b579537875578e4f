// 🏗️ Ingestion - two TSV tables → PatientRegistry
//
// 1. Patient table is read start to finish → one Patient per row
// 2. Only then the lab table is opened → each Lab is attached to its owner
//
// Rows are zipped with the header by position, then decoded into typed
// rows (PatientRow / LabRow) that check their required columns.
// First error wins: no partial registry is ever returned.

use crate::entities::{Lab, Patient, PatientRegistry};
use crate::error::{EhrError, Result, RowLocation};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

// ============================================================================
// TABLE ROW
// ============================================================================

/// One data row keyed by header name.
///
/// Values past the end of the header are dropped; header columns past the
/// end of a short row are simply absent. A repeated header keeps its last value.
#[derive(Debug)]
pub struct TableRow<'a> {
    location: RowLocation,
    fields: HashMap<&'a str, &'a str>,
}

impl<'a> TableRow<'a> {
    pub fn zip(headers: &'a StringRecord, record: &'a StringRecord, location: RowLocation) -> Self {
        TableRow {
            location,
            fields: strip_line(headers).zip(strip_line(record)).collect(),
        }
    }

    pub fn location(&self) -> &RowLocation {
        &self.location
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.fields.get(column).copied()
    }

    /// Value of a required column, or `MissingField`
    pub fn require(&self, column: &str) -> Result<&'a str> {
        self.get(column).ok_or_else(|| EhrError::MissingField {
            location: self.location.clone(),
            column: column.to_string(),
        })
    }
}

/// Fields of a record with whitespace stripped from both ends of the line
/// (leading on the first field, trailing on the last)
fn strip_line(record: &StringRecord) -> impl Iterator<Item = &str> + '_ {
    let last = record.len().saturating_sub(1);
    record.iter().enumerate().map(move |(i, field)| {
        let field = if i == 0 { field.trim_start() } else { field };
        if i == last { field.trim_end() } else { field }
    })
}

// ============================================================================
// TYPED ROWS
// ============================================================================

/// Decode a typed record from a table row
pub trait FromRow: Sized {
    fn from_row(row: &TableRow<'_>) -> Result<Self>;
}

/// Patient table row: `PatientID`, `PatientGender`, `PatientDateOfBirth`, `PatientRace`
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRow {
    pub patient_id: String,
    pub gender: String,
    pub date_of_birth: String,
    pub race: String,
}

impl FromRow for PatientRow {
    fn from_row(row: &TableRow<'_>) -> Result<Self> {
        Ok(PatientRow {
            patient_id: row.require("PatientID")?.to_string(),
            gender: row.require("PatientGender")?.to_string(),
            date_of_birth: row.require("PatientDateOfBirth")?.to_string(),
            race: row.require("PatientRace")?.to_string(),
        })
    }
}

impl PatientRow {
    pub fn into_patient(self) -> Result<Patient> {
        Patient::new(self.patient_id, self.gender, &self.date_of_birth, self.race)
    }
}

/// Lab table row: `PatientID`, `LabName`, `LabValue`, `LabUnits`, `LabDateTime`
///
/// `patient_id` only locates the owner; it is not stored on the Lab.
#[derive(Debug, Clone, PartialEq)]
pub struct LabRow {
    pub patient_id: String,
    pub name: String,
    pub value: f64,
    pub units: String,
    pub date_time: String,
}

impl FromRow for LabRow {
    fn from_row(row: &TableRow<'_>) -> Result<Self> {
        let patient_id = row.require("PatientID")?.to_string();
        let name = row.require("LabName")?.to_string();
        let raw_value = row.require("LabValue")?;
        let value = raw_value.trim().parse::<f64>().map_err(|_| EhrError::Format {
            expected: "a floating point number",
            value: raw_value.to_string(),
            location: Some(row.location().clone()),
        })?;

        Ok(LabRow {
            patient_id,
            name,
            value,
            units: row.require("LabUnits")?.to_string(),
            date_time: row.require("LabDateTime")?.to_string(),
        })
    }
}

impl LabRow {
    pub fn into_lab(self) -> Result<(String, Lab)> {
        let lab = Lab::new(self.name, self.value, self.units, &self.date_time)?;
        Ok((self.patient_id, lab))
    }
}

// ============================================================================
// TABLE READER
// ============================================================================

/// Walk every data row of a TSV table, decoding each into `T`.
///
/// `each` receives the decoded row and its location. Returns the row count.
fn read_table<R, T, F>(reader: R, source: &str, mut each: F) -> Result<usize>
where
    R: Read,
    T: FromRow,
    F: FnMut(T, &RowLocation) -> Result<()>,
{
    let csv_error = |source_err: csv::Error| EhrError::Csv {
        source_name: source.to_string(),
        source: source_err,
    };

    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_error)?.clone();
    debug!("{}: columns {:?}", source, headers.iter().collect::<Vec<_>>());

    let mut count = 0;
    for (index, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_error)?;

        // +2 because: 1-indexed + header row
        let line = record
            .position()
            .map(|pos| pos.line())
            .unwrap_or(index as u64 + 2);
        let location = RowLocation::new(source, line);

        let row = TableRow::zip(&headers, &record, location);
        let decoded = T::from_row(&row)?;
        each(decoded, row.location()).map_err(|e| e.at_row(row.location()))?;
        count += 1;
    }

    Ok(count)
}

// ============================================================================
// INGESTION
// ============================================================================

/// Build the registry from a patient table
pub fn load_patients<R: Read>(reader: R, source: &str) -> Result<PatientRegistry> {
    let mut registry = PatientRegistry::new();

    let rows = read_table(reader, source, |row: PatientRow, location| {
        let patient = row.into_patient()?;
        debug!("{}: patient {}", location, patient.patient_id());

        if let Some(previous) = registry.insert(patient) {
            warn!(
                "{}: duplicate PatientID '{}' replaces the earlier row",
                location,
                previous.patient_id()
            );
        }
        Ok(())
    })?;

    info!("Loaded {} patients from {} rows of {}", registry.len(), rows, source);
    Ok(registry)
}

/// Attach every lab in a lab table to its owning patient.
///
/// On error the registry may already hold some of this table's labs;
/// callers wanting all-or-nothing should drop it (as `parse_data` does).
pub fn attach_labs<R: Read>(reader: R, source: &str, registry: &mut PatientRegistry) -> Result<usize> {
    let rows = read_table(reader, source, |row: LabRow, location| {
        let (patient_id, lab) = row.into_lab()?;

        registry
            .add_lab(&patient_id, lab)
            .map_err(|_| EhrError::UnknownPatient {
                location: location.clone(),
                patient_id: patient_id.clone(),
            })?;
        debug!("{}: lab attached to {}", location, patient_id);
        Ok(())
    })?;

    info!("Attached {} labs from {}", rows, source);
    Ok(rows)
}

/// Ingest patient and lab tables from any readers.
///
/// The patient table is fully consumed before the lab table is touched.
pub fn parse_readers<P: Read, L: Read>(
    patients: P,
    patient_source: &str,
    labs: L,
    lab_source: &str,
) -> Result<PatientRegistry> {
    let mut registry = load_patients(patients, patient_source)?;
    attach_labs(labs, lab_source, &mut registry)?;
    Ok(registry)
}

/// Ingest a patient file and a lab file.
///
/// Each file is opened only when it is needed and closed when dropped,
/// on success and on every error path.
pub fn parse_data(patient_path: &Path, lab_path: &Path) -> Result<PatientRegistry> {
    let mut registry = {
        let file = open(patient_path)?;
        load_patients(file, &source_name(patient_path))?
    };

    let file = open(lab_path)?;
    attach_labs(file, &source_name(lab_path), &mut registry)?;

    Ok(registry)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| EhrError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// TESTS
// ============================================================================
