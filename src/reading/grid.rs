//! In-memory gridded dataset and its flattening into observations.

use anyhow::Result;
use chrono::{Datelike, NaiveDateTime};

use crate::error::ClimateError;

pub const KELVIN_OFFSET: f64 = 273.15;

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// One grid cell at one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub time: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    /// Degrees Celsius; `None` when the source file had no temperature field
    /// or the cell was masked.
    pub temperature: Option<f64>,
}

impl Observation {
    pub fn year(&self) -> i32 {
        self.time.year()
    }

    pub fn month(&self) -> u32 {
        self.time.month()
    }
}

/// A dataset laid out `[time][latitude][longitude]`.
#[derive(Debug, Clone, Default)]
pub struct GriddedDataset {
    pub times: Vec<NaiveDateTime>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    /// Kelvin values, row-major over (time, latitude, longitude). Masked cells
    /// are NaN.
    pub kelvin: Option<Vec<f64>>,
}

impl GriddedDataset {
    pub fn cell_count(&self) -> usize {
        self.times.len() * self.latitudes.len() * self.longitudes.len()
    }

    /// One row per (time, latitude, longitude), converting Kelvin to Celsius
    /// when the temperature field is present.
    pub fn flatten(&self) -> Result<Vec<Observation>> {
        if let Some(kelvin) = &self.kelvin {
            if kelvin.len() != self.cell_count() {
                return Err(ClimateError::ShapeMismatch {
                    name: "temperature".to_string(),
                    expected: self.cell_count(),
                    found: kelvin.len(),
                }
                .into());
            }
        }

        let mut rows = Vec::with_capacity(self.cell_count());
        let mut idx = 0;

        for time in &self.times {
            for latitude in &self.latitudes {
                for longitude in &self.longitudes {
                    let temperature = self
                        .kelvin
                        .as_ref()
                        .map(|k| k[idx])
                        .filter(|k| k.is_finite())
                        .map(kelvin_to_celsius);

                    rows.push(Observation {
                        time: *time,
                        latitude: *latitude,
                        longitude: *longitude,
                        temperature,
                    });
                    idx += 1;
                }
            }
        }

        Ok(rows)
    }
}

// -- Tests -------------------------------------------------------------------
