//! Run settings. Defaults reproduce the Slovakia 1940-2024 study; a TOML file
//! passed with `--config` overrides any subset of them.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub file_prefix: String,
    pub frequency: Frequency,
    pub start_year: i32,
    pub end_year: i32,
    pub area: BoundingBox,
    pub window_length: i32,
    pub window_step: i32,
    pub spreadsheet_path: PathBuf,
    pub sheet_name: String,
    pub animation_path: PathBuf,
    pub frame_delay_ms: u32,
    pub diverging_bars: bool,
    pub diverging_range: f64,
    pub poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("slovakia_temperature_data"),
            file_prefix: "slovakia_temperature".to_string(),
            frequency: Frequency::Monthly,
            start_year: 1940,
            end_year: 2024,
            area: BoundingBox::default(),
            window_length: 10,
            window_step: 1,
            spreadsheet_path: PathBuf::from("slovakia_temperature_1940_2024_combined.xlsx"),
            sheet_name: "Temperature Data".to_string(),
            animation_path: PathBuf::from("temperature_trends.gif"),
            frame_delay_ms: 100,
            diverging_bars: false,
            diverging_range: 6.0,
            poll_interval_secs: 5,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Settings::default(),
        };

        settings.validate()?;

        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(anyhow!(
                "start_year {} is after end_year {}",
                self.start_year,
                self.end_year
            ));
        }
        if self.window_length < 1 || self.window_step < 1 {
            return Err(anyhow!("window_length and window_step must be at least 1"));
        }
        if self.area.north <= self.area.south {
            return Err(anyhow!("area.north must be greater than area.south"));
        }

        Ok(())
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start_year..=self.end_year
    }

    /// Path of the cached file for one year, e.g.
    /// `slovakia_temperature_data/slovakia_temperature_monthly_1940.nc`.
    pub fn year_file(&self, year: i32) -> PathBuf {
        self.data_dir.join(format!(
            "{}_{}_{}.nc",
            self.file_prefix, self.frequency, year
        ))
    }
}

/// Sampling cadence of the requested reanalysis product.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Daily,
}

impl Frequency {
    pub fn dataset(&self) -> &'static str {
        match self {
            Frequency::Monthly => "reanalysis-era5-single-levels-monthly-means",
            Frequency::Daily => "reanalysis-era5-land",
        }
    }

    pub fn product_type(&self) -> &'static str {
        match self {
            Frequency::Monthly => "monthly_averaged_reanalysis",
            Frequency::Daily => "reanalysis",
        }
    }

    pub fn time(&self) -> &'static str {
        match self {
            Frequency::Monthly => "00:00",
            Frequency::Daily => "12:00",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Daily => write!(f, "daily"),
        }
    }
}

/// Geographic request area in degrees.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        // Slovakia
        BoundingBox {
            north: 49.6,
            west: 16.8,
            south: 47.7,
            east: 22.6,
        }
    }
}

impl BoundingBox {
    /// Order expected by the retrieval API.
    pub fn as_area(&self) -> [f64; 4] {
        [self.north, self.west, self.south, self.east]
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_slovakia_study() {
        let s = Settings::default();

        assert_eq!(s.years().count(), 85);
        assert_eq!(s.area.as_area(), [49.6, 16.8, 47.7, 22.6]);
        assert_eq!(
            s.year_file(1940),
            PathBuf::from("slovakia_temperature_data/slovakia_temperature_monthly_1940.nc")
        );
        assert!(s.validate().is_ok());
    }

    #[test]
    fn should_override_subset_from_toml() {
        let text = r#"
            window_length = 20
            frequency = "daily"

            [area]
            north = 50.0
            west = 10.0
            south = 45.0
            east = 15.0
        "#;

        let s = Settings::from_toml(text).unwrap();

        assert_eq!(s.window_length, 20);
        assert_eq!(s.frequency, Frequency::Daily);
        assert_eq!(s.area.north, 50.0);
        assert_eq!(s.start_year, 1940);
        assert_eq!(s.sheet_name, "Temperature Data");
        assert_eq!(
            s.year_file(2000).file_name().unwrap(),
            "slovakia_temperature_daily_2000.nc"
        );
    }

    #[test]
    fn should_reject_inverted_years() {
        let s = Settings {
            start_year: 2000,
            end_year: 1990,
            ..Settings::default()
        };

        assert!(s.validate().is_err());
    }

    #[test]
    fn should_reject_zero_window() {
        let s = Settings {
            window_length: 0,
            ..Settings::default()
        };

        assert!(s.validate().is_err());
    }
}
