// 🧑‍⚕️ Patient Entity - one person + their lab history
//
// A Patient owns its labs in file order. The only mutation is add_lab,
// and it only happens during ingestion.
//
// PatientRegistry is the ingestion result: patient id → Patient,
// iterated in the order patients were first seen.

use crate::entities::lab::Lab;
use crate::error::{EhrError, Result};
use crate::temporal::{parse_timestamp, serde_timestamp, years_between, Clock};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// COMPARISON
// ============================================================================

/// Threshold comparison used by sickness checks (always strict)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::LessThan => "<",
        }
    }

    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::LessThan => value < threshold,
        }
    }
}

impl FromStr for Comparison {
    type Err = EhrError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ">" => Ok(Comparison::GreaterThan),
            "<" => Ok(Comparison::LessThan),
            other => Err(EhrError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ============================================================================
// PATIENT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patient {
    patient_id: String,
    gender: String,
    #[serde(with = "serde_timestamp")]
    date_of_birth: NaiveDateTime,
    race: String,
    labs: Vec<Lab>,
}

impl Patient {
    /// Create a patient with no labs, parsing `date_of_birth` in the fixed format
    pub fn new(
        patient_id: impl Into<String>,
        gender: impl Into<String>,
        date_of_birth: &str,
        race: impl Into<String>,
    ) -> Result<Self> {
        Ok(Patient {
            patient_id: patient_id.into(),
            gender: gender.into(),
            date_of_birth: parse_timestamp(date_of_birth)?,
            race: race.into(),
            labs: Vec::new(),
        })
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn gender(&self) -> &str {
        &self.gender
    }

    pub fn date_of_birth(&self) -> NaiveDateTime {
        self.date_of_birth
    }

    pub fn race(&self) -> &str {
        &self.race
    }

    /// Labs in the order they were added
    pub fn labs(&self) -> &[Lab] {
        &self.labs
    }

    /// Append a lab (no dedup, no reordering)
    pub fn add_lab(&mut self, lab: Lab) {
        self.labs.push(lab);
    }

    // ------------------------------------------------------------------------
    // Age queries
    // ------------------------------------------------------------------------

    /// Age in whole years on the given reference instant
    pub fn age_on(&self, reference: NaiveDateTime) -> i32 {
        years_between(&self.date_of_birth, &reference)
    }

    /// Current age according to `clock`. Recomputed on every call.
    pub fn age(&self, clock: &dyn Clock) -> i32 {
        self.age_on(clock.now())
    }

    /// Earliest lab by date. On ties the first one added wins.
    pub fn first_lab(&self) -> Option<&Lab> {
        self.labs.iter().min_by_key(|lab| lab.date())
    }

    /// Age at the earliest recorded lab
    pub fn age_at_first_lab(&self) -> Result<i32> {
        let first = self.first_lab().ok_or_else(|| EhrError::EmptyData {
            patient_id: self.patient_id.clone(),
        })?;
        Ok(self.age_on(first.date()))
    }

    // ------------------------------------------------------------------------
    // Sickness checks
    // ------------------------------------------------------------------------

    /// True if any lab named `lab_name` satisfies `comparison` against `threshold`
    pub fn matches_threshold(&self, lab_name: &str, comparison: Comparison, threshold: f64) -> bool {
        self.labs
            .iter()
            .any(|lab| lab.name() == lab_name && comparison.holds(lab.value(), threshold))
    }

    /// Same as [`Patient::matches_threshold`] with the operator given as text.
    ///
    /// Only `">"` and `"<"` are accepted; anything else is an
    /// `UnsupportedOperator` error rather than a silent `false`.
    pub fn is_sick(&self, lab_name: &str, operator: &str, threshold: f64) -> Result<bool> {
        let comparison: Comparison = operator.parse()?;
        Ok(self.matches_threshold(lab_name, comparison, threshold))
    }
}

// ============================================================================
// PATIENT REGISTRY
// ============================================================================

/// Patients keyed by id, iterated in insertion order
#[derive(Debug, Clone, Default)]
pub struct PatientRegistry {
    patients: Vec<Patient>,
    index: HashMap<String, usize>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        PatientRegistry::default()
    }

    /// Insert a patient.
    ///
    /// If the id is already present the old patient is replaced in place
    /// and returned; its position in iteration order is kept.
    pub fn insert(&mut self, patient: Patient) -> Option<Patient> {
        match self.index.get(patient.patient_id()) {
            Some(&slot) => Some(std::mem::replace(&mut self.patients[slot], patient)),
            None => {
                self.index.insert(patient.patient_id().to_string(), self.patients.len());
                self.patients.push(patient);
                None
            }
        }
    }

    pub fn get(&self, patient_id: &str) -> Option<&Patient> {
        self.index.get(patient_id).map(|&slot| &self.patients[slot])
    }

    pub fn get_mut(&mut self, patient_id: &str) -> Option<&mut Patient> {
        match self.index.get(patient_id) {
            Some(&slot) => Some(&mut self.patients[slot]),
            None => None,
        }
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.index.contains_key(patient_id)
    }

    /// Attach a lab to its owner. Hands the lab back if the id is unknown.
    pub fn add_lab(&mut self, patient_id: &str, lab: Lab) -> std::result::Result<(), Lab> {
        match self.get_mut(patient_id) {
            Some(patient) => {
                patient.add_lab(lab);
                Ok(())
            }
            None => Err(lab),
        }
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patient> {
        self.patients.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.patients.iter().map(|p| p.patient_id())
    }

    /// Patients with at least one `lab_name` result beyond `threshold`
    pub fn sick_patients(&self, lab_name: &str, comparison: Comparison, threshold: f64) -> Vec<&Patient> {
        self.patients
            .iter()
            .filter(|p| p.matches_threshold(lab_name, comparison, threshold))
            .collect()
    }
}

/// Mapping equality: same ids bound to equal patients, order ignored
impl PartialEq for PatientRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .patients
                .iter()
                .all(|p| other.get(p.patient_id()) == Some(p))
    }
}

impl<'a> IntoIterator for &'a PatientRegistry {
    type Item = &'a Patient;
    type IntoIter = std::slice::Iter<'a, Patient>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// TESTS
// ============================================================================
