//! Reading coercion and summary statistics
//!
//! Volumes are treated as cumulative meter readings: the reported total is the
//! difference between the chronologically last and first readings, not a sum.

use chrono::NaiveDate;
use serde::Serialize;

use crate::store::{RawReading, Reading, VolumeValue};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Malformed reading at position {index}: invalid {field} '{value}'")]
    MalformedReading {
        index: usize,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConsumptionSummary {
    /// Last volume minus first volume
    pub total: f64,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub reading_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SummaryOutcome {
    /// No readings yet; consumers show a "no data" message
    Empty,
    Ok {
        summary: ConsumptionSummary,
        series: Vec<SeriesPoint>,
    },
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// A lone `,` with no `.` is a decimal comma ("3,5" is 3.5); any other
/// comma, such as a thousands separator next to a `.`, is malformed
pub fn coerce_volume(value: &VolumeValue) -> Option<f64> {
    let volume = match value {
        VolumeValue::Number(n) => *n,
        VolumeValue::Text(s) => parse_decimal(s.trim())?,
    };
    volume.is_finite().then_some(volume)
}

fn parse_decimal(text: &str) -> Option<f64> {
    match text.matches(',').count() {
        0 => text.parse().ok(),
        1 if !text.contains('.') => text.replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Coerce every raw reading, failing on the first malformed one
pub fn coerce_readings(raw: &[RawReading]) -> Result<Vec<Reading>, PipelineError> {
    raw.iter()
        .enumerate()
        .map(|(index, reading)| {
            let date = parse_date(&reading.date).ok_or_else(|| PipelineError::MalformedReading {
                index,
                field: "date",
                value: reading.date.clone(),
            })?;
            let volume =
                coerce_volume(&reading.volume).ok_or_else(|| PipelineError::MalformedReading {
                    index,
                    field: "volume",
                    value: match &reading.volume {
                        VolumeValue::Number(n) => n.to_string(),
                        VolumeValue::Text(s) => s.clone(),
                    },
                })?;
            Ok(Reading { date, volume })
        })
        .collect()
}

/// Stable ascending sort by date; equal dates keep their input order
pub fn sort_readings(readings: &mut [Reading]) {
    readings.sort_by_key(|reading| reading.date);
}

/// Coerce and sort
pub fn prepare(raw: &[RawReading]) -> Result<Vec<Reading>, PipelineError> {
    let mut readings = coerce_readings(raw)?;
    sort_readings(&mut readings);
    Ok(readings)
}

/// Statistics over an already sorted list, `None` when it is empty
pub fn compute_summary(sorted: &[Reading]) -> Option<ConsumptionSummary> {
    let (first, last) = (sorted.first()?, sorted.last()?);

    let max = sorted.iter().map(|r| r.volume).fold(f64::NEG_INFINITY, f64::max);
    let min = sorted.iter().map(|r| r.volume).fold(f64::INFINITY, f64::min);
    let sum: f64 = sorted.iter().map(|r| r.volume).sum();
    // Rounding in the sum can land the mean just outside [min, max]
    let mean = (sum / sorted.len() as f64).clamp(min, max);

    Some(ConsumptionSummary {
        total: normalize_zero(last.volume - first.volume),
        max,
        min,
        mean,
        reading_count: sorted.len(),
        first_date: first.date,
        last_date: last.date,
    })
}

pub fn series(sorted: &[Reading]) -> Vec<SeriesPoint> {
    sorted
        .iter()
        .map(|r| SeriesPoint {
            date: r.date,
            volume: r.volume,
        })
        .collect()
}

/// Full pipeline: coerce, sort, then summarize or report empty
pub fn summarize(raw: &[RawReading]) -> Result<SummaryOutcome, PipelineError> {
    let readings = prepare(raw)?;
    Ok(outcome_for(&readings))
}

pub fn outcome_for(sorted: &[Reading]) -> SummaryOutcome {
    match compute_summary(sorted) {
        Some(summary) => SummaryOutcome::Ok {
            summary,
            series: series(sorted),
        },
        None => SummaryOutcome::Empty,
    }
}

/// Normalize -0.0 to 0.0 for cleaner API responses
fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}
