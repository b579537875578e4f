// Entity Models
//
// - Lab: immutable measurement value
// - Patient: owns its labs, answers age / sickness queries
// - PatientRegistry: patient id → Patient, built by ingestion

pub mod lab;
pub mod patient;

pub use lab::Lab;
pub use patient::{Comparison, Patient, PatientRegistry};
