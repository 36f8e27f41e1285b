use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Volume as the backend delivered it, before coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VolumeValue {
    Number(f64),
    Text(String),
}

/// Backend record with both fields present but not yet type-checked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawReading {
    pub date: String,
    pub volume: VolumeValue,
}

impl RawReading {
    pub fn new(date: impl Into<String>, volume: VolumeValue) -> Self {
        Self {
            date: date.into(),
            volume,
        }
    }
}

/// One dated meter reading in cubic meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub date: NaiveDate,
    pub volume: f64,
}

/// Result of listing a backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub readings: Vec<RawReading>,
    /// Records discarded because `date` or `volume` was missing
    pub dropped: usize,
}
