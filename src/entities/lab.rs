// 🧪 Lab Entity - one named, dated, unit-qualified measurement
//
// Value type: no identity, no mutation after construction.
// Two labs are equal when all four fields are equal.

use crate::error::Result;
use crate::temporal::{format_timestamp, parse_timestamp, serde_timestamp};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lab {
    name: String,
    value: f64,
    units: String,
    #[serde(with = "serde_timestamp")]
    date: NaiveDateTime,
}

impl Lab {
    /// Create a lab result, parsing `date` as `YYYY-MM-DD HH:MM:SS.ffffff`
    pub fn new(
        name: impl Into<String>,
        value: f64,
        units: impl Into<String>,
        date: &str,
    ) -> Result<Self> {
        Ok(Lab {
            name: name.into(),
            value,
            units: units.into(),
            date: parse_timestamp(date)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn date(&self) -> NaiveDateTime {
        self.date
    }
}

impl fmt::Display for Lab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} on {}",
            self.name,
            self.value,
            self.units,
            format_timestamp(&self.date)
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
