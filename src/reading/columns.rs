//! Variable name resolution and time decoding.
//!
//! ERA5 files from different CDS releases spell the same fields differently:
//! the time axis is `valid_time` in current NetCDF4 output, `time` in the
//! legacy output and `date` (as `YYYYMMDD` integers) in some conversions.

use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::ClimateError;

pub const LATITUDE_NAMES: &[&str] = &["latitude", "lat"];
pub const LONGITUDE_NAMES: &[&str] = &["longitude", "lon"];
pub const TIME_NAMES: &[&str] = &["valid_time", "time", "date"];
pub const TEMPERATURE_NAMES: &[&str] = &["t2m", "2t"];

/// Returns the first candidate name for which `present` holds.
pub fn resolve(names: &[&'static str], present: impl Fn(&str) -> bool) -> Option<&'static str> {
    names.iter().copied().find(|name| present(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "second" | "seconds" | "s" | "sec" | "secs" => Some(TimeUnit::Seconds),
            "minute" | "minutes" | "min" | "mins" => Some(TimeUnit::Minutes),
            "hour" | "hours" | "h" | "hr" | "hrs" => Some(TimeUnit::Hours),
            "day" | "days" | "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }

    fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3_600.0,
            TimeUnit::Days => 86_400.0,
        }
    }
}

/// How raw time values map to timestamps.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeEncoding {
    /// CF convention, e.g. `hours since 1900-01-01 00:00:00.0`.
    Offset {
        unit: TimeUnit,
        reference: NaiveDateTime,
    },
    /// Integers such as `19400101`.
    CompactDate,
}

impl TimeEncoding {
    /// Picks the encoding from the variable's `units` attribute.
    pub fn from_units(units: Option<&str>) -> Result<Self> {
        let Some(units) = units.map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(TimeEncoding::CompactDate);
        };

        if units.to_lowercase().starts_with("day as") {
            return Ok(TimeEncoding::CompactDate);
        }

        let (unit, reference) = units
            .split_once(" since ")
            .ok_or_else(|| ClimateError::UnsupportedTimeUnits(units.to_string()))?;
        let unit = TimeUnit::parse(unit)
            .ok_or_else(|| ClimateError::UnsupportedTimeUnits(units.to_string()))?;
        let reference = parse_reference(reference)
            .ok_or_else(|| ClimateError::UnsupportedTimeUnits(units.to_string()))?;

        Ok(TimeEncoding::Offset { unit, reference })
    }

    pub fn decode(&self, raw: f64) -> Result<NaiveDateTime> {
        if !raw.is_finite() {
            return Err(anyhow!("Non-finite time value {}", raw));
        }

        match self {
            TimeEncoding::Offset { unit, reference } => {
                let millis = (raw * unit.seconds() * 1_000.0).round() as i64;
                Duration::try_milliseconds(millis)
                    .and_then(|offset| reference.checked_add_signed(offset))
                    .ok_or_else(|| anyhow!("Time value {} overflows", raw))
            }
            TimeEncoding::CompactDate => {
                let value = raw as i64;
                let (year, month, day) = (value / 10_000, (value / 100) % 100, value % 100);
                NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .ok_or_else(|| anyhow!("Invalid YYYYMMDD date {}", value))
            }
        }
    }

    pub fn decode_all(&self, raw: &[f64]) -> Result<Vec<NaiveDateTime>> {
        raw.iter().map(|v| self.decode(*v)).collect()
    }
}

fn parse_reference(reference: &str) -> Option<NaiveDateTime> {
    let reference = reference
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(reference, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(reference, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// -- Tests -------------------------------------------------------------------
