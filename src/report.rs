// 📊 Reports - per-patient summaries + sickness cohorts
// Consumers of the ingestion result; nothing here mutates patients.

use crate::entities::{Comparison, Patient, PatientRegistry};
use crate::error::Result;
use crate::temporal::{format_timestamp, Clock};
use serde::Serialize;
use std::fmt;

// ============================================================================
// PATIENT SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientSummary {
    pub patient_id: String,
    pub gender: String,
    pub race: String,
    pub date_of_birth: String,
    pub age: i32,
    /// None when the patient has no labs
    pub age_at_first_lab: Option<i32>,
    pub lab_count: usize,
}

impl PatientSummary {
    pub fn from_patient(patient: &Patient, clock: &dyn Clock) -> Self {
        PatientSummary {
            patient_id: patient.patient_id().to_string(),
            gender: patient.gender().to_string(),
            race: patient.race().to_string(),
            date_of_birth: format_timestamp(&patient.date_of_birth()),
            age: patient.age(clock),
            age_at_first_lab: patient.age_at_first_lab().ok(),
            lab_count: patient.labs().len(),
        }
    }
}

impl fmt::Display for PatientSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Patient ID: {}, Age: {}, Gender: {}, Race: {}",
            self.patient_id, self.age, self.gender, self.race
        )
    }
}

/// One summary per patient, in registry order
pub fn summarize(registry: &PatientRegistry, clock: &dyn Clock) -> Vec<PatientSummary> {
    registry
        .iter()
        .map(|patient| PatientSummary::from_patient(patient, clock))
        .collect()
}

// ============================================================================
// SICKNESS COHORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SickReport {
    pub lab_name: String,
    pub operator: Comparison,
    pub threshold: f64,
    pub patient_ids: Vec<String>,
}

impl SickReport {
    pub fn summary(&self) -> String {
        format!(
            "{} patient(s) with {} {} {}",
            self.patient_ids.len(),
            self.lab_name,
            self.operator,
            self.threshold
        )
    }
}

/// Patients with any `lab_name` result beyond `threshold`.
/// Fails on operators other than `">"` / `"<"`.
pub fn sick_report(
    registry: &PatientRegistry,
    lab_name: &str,
    operator: &str,
    threshold: f64,
) -> Result<SickReport> {
    let comparison: Comparison = operator.parse()?;
    let patient_ids = registry
        .sick_patients(lab_name, comparison, threshold)
        .into_iter()
        .map(|p| p.patient_id().to_string())
        .collect();

    Ok(SickReport {
        lab_name: lab_name.to_string(),
        operator: comparison,
        threshold,
        patient_ids,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Lab;
    use crate::error::EhrError;
    use crate::temporal::FixedClock;

    fn registry() -> PatientRegistry {
        let mut with_labs = Patient::new("P1", "Male", "1947-12-28 02:45:40.547", "Unknown").unwrap();
        with_labs.add_lab(Lab::new("CBC: MCHC", 38.1, "g/dl", "1976-08-02 02:31:35.373").unwrap());
        with_labs.add_lab(Lab::new("CBC: MCHC", 31.0, "g/dl", "1968-10-07 14:41:30.843").unwrap());

        let without_labs = Patient::new("P2", "Female", "1952-01-18 19:51:12.917", "Asian").unwrap();

        let mut registry = PatientRegistry::new();
        registry.insert(with_labs);
        registry.insert(without_labs);
        registry
    }

    fn clock() -> FixedClock {
        FixedClock::parse("2024-01-01 00:00:00.000000").unwrap()
    }

    #[test]
    fn test_summarize() {
        let summaries = summarize(&registry(), &clock());

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].patient_id, "P1");
        assert_eq!(summaries[0].age, 76);
        assert_eq!(summaries[0].age_at_first_lab, Some(20));
        assert_eq!(summaries[0].lab_count, 2);
        assert_eq!(summaries[0].date_of_birth, "1947-12-28 02:45:40.547000");

        assert_eq!(summaries[1].age, 71);
        assert_eq!(summaries[1].age_at_first_lab, None);
        assert_eq!(summaries[1].lab_count, 0);
    }

    #[test]
    fn test_summary_display() {
        let summaries = summarize(&registry(), &clock());
        assert_eq!(
            summaries[1].to_string(),
            "Patient ID: P2, Age: 71, Gender: Female, Race: Asian"
        );
    }

    #[test]
    fn test_summary_serializes() {
        let summaries = summarize(&registry(), &clock());
        let json = serde_json::to_value(&summaries).unwrap();

        assert_eq!(json[0]["age_at_first_lab"], 20);
        assert!(json[1]["age_at_first_lab"].is_null());
    }

    #[test]
    fn test_sick_report() {
        let report = sick_report(&registry(), "CBC: MCHC", ">", 35.0).unwrap();

        assert_eq!(report.patient_ids, vec!["P1".to_string()]);
        assert_eq!(report.operator, Comparison::GreaterThan);
        assert_eq!(report.summary(), "1 patient(s) with CBC: MCHC > 35");
        assert_eq!(serde_json::to_value(&report).unwrap()["operator"], ">");

        let none = sick_report(&registry(), "CBC: MCHC", "<", 30.0).unwrap();
        assert!(none.patient_ids.is_empty());
    }

    #[test]
    fn test_sick_report_rejects_unknown_operator() {
        let err = sick_report(&registry(), "CBC: MCHC", "==", 35.0).unwrap_err();
        assert!(matches!(err, EhrError::UnsupportedOperator(_)));
    }
}
