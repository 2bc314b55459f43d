//! Loads every configured year's file and concatenates the flattened rows.

use std::path::PathBuf;

use anyhow::Result;
use log::{debug, error, info, warn};

use crate::{
    cli::create_progress_bar,
    config::Settings,
    error::ClimateError,
    reading::{GridSource, Observation},
};

#[derive(Debug, Default)]
pub struct LoadReport {
    pub observations: Vec<Observation>,
    pub loaded_years: Vec<i32>,
    pub missing_years: Vec<i32>,
    pub failed: Vec<(PathBuf, String)>,
}

impl LoadReport {
    /// The concatenated rows, or an error when nothing could be read.
    pub fn into_observations(self) -> Result<Vec<Observation>> {
        if self.observations.is_empty() {
            return Err(ClimateError::NoUsableData(format!(
                "no rows loaded ({} years missing, {} files failed)",
                self.missing_years.len(),
                self.failed.len()
            ))
            .into());
        }

        Ok(self.observations)
    }
}

/// Reads each year's file through `source`. Absent files are skipped and files
/// that fail to parse are logged and excluded; neither stops the batch. A
/// source that cannot read anything fails before the first year.
pub fn load_years<S: GridSource>(settings: &Settings, source: &S) -> Result<LoadReport> {
    source.ready()?;

    let years: Vec<i32> = settings.years().collect();
    let pb = create_progress_bar(years.len() as u64, "Reading yearly files".to_string());
    let mut report = LoadReport::default();

    for year in years {
        let path = settings.year_file(year);
        pb.inc(1);

        if !path.exists() {
            debug!("No file for {} at {}", year, path.display());
            report.missing_years.push(year);
            continue;
        }

        match source.open(&path).and_then(|ds| ds.flatten()) {
            Ok(rows) => {
                if rows.iter().all(|r| r.temperature.is_none()) {
                    warn!("{} has no temperature values", path.display());
                }
                report.observations.extend(rows);
                report.loaded_years.push(year);
            }
            Err(e) => {
                error!("Error processing {}: {:#}", path.display(), e);
                report.failed.push((path, format!("{:#}", e)));
            }
        }
    }

    pb.finish_with_message("Files read");
    info!(
        "Loaded {} of {} years ({} missing, {} failed)",
        report.loaded_years.len(),
        settings.years().count(),
        report.missing_years.len(),
        report.failed.len()
    );

    Ok(report)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::{fs, path::Path};

    use anyhow::anyhow;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::reading::GriddedDataset;

    /// One-cell dataset holding `kelvin` for every month of `year`.
    pub fn year_dataset(year: i32, kelvin: Option<f64>) -> GriddedDataset {
        GriddedDataset {
            times: (1..=12)
                .map(|m| {
                    NaiveDate::from_ymd_opt(year, m, 1)
                        .unwrap()
                        .and_hms_opt(0, 0, 0)
                        .unwrap()
                })
                .collect(),
            latitudes: vec![48.5],
            longitudes: vec![19.0],
            kelvin: kelvin.map(|k| vec![k; 12]),
        }
    }

    pub fn year_from_path(path: &Path) -> i32 {
        let stem = path.file_stem().unwrap().to_string_lossy();
        stem.rsplit('_').next().unwrap().parse().unwrap()
    }

    pub fn settings_in(dir: &Path, start_year: i32, end_year: i32) -> Settings {
        Settings {
            data_dir: dir.to_path_buf(),
            start_year,
            end_year,
            ..Settings::default()
        }
    }

    pub fn touch_years(settings: &Settings, years: impl IntoIterator<Item = i32>) {
        for year in years {
            fs::write(settings.year_file(year), b"").unwrap();
        }
    }

    #[test]
    fn should_skip_missing_and_failed_years() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path(), 1940, 1943);
        touch_years(&settings, [1940, 1941, 1943]);

        let source = |path: &Path| -> Result<GriddedDataset> {
            match year_from_path(path) {
                1941 => Err(anyhow!("corrupt header")),
                year => Ok(year_dataset(year, Some(273.15))),
            }
        };

        let report = load_years(&settings, &source).unwrap();

        assert_eq!(report.loaded_years, vec![1940, 1943]);
        assert_eq!(report.missing_years, vec![1942]);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("corrupt header"));
        assert_eq!(report.observations.len(), 24);
    }

    #[test]
    fn should_keep_rows_of_file_without_temperature() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path(), 1940, 1941);
        touch_years(&settings, [1940, 1941]);

        let source = |path: &Path| -> Result<GriddedDataset> {
            let year = year_from_path(path);
            Ok(year_dataset(year, (year == 1940).then_some(280.0)))
        };

        let rows = load_years(&settings, &source).unwrap().into_observations().unwrap();

        assert_eq!(rows.len(), 24);
        assert_eq!(rows.iter().filter(|r| r.temperature.is_some()).count(), 12);
    }

    #[test]
    fn should_fail_when_nothing_loads() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path(), 1940, 1945);
        let source = |_: &Path| -> Result<GriddedDataset> { Err(anyhow!("unreachable")) };

        let err = load_years(&settings, &source).unwrap().into_observations().unwrap_err();

        assert!(err.to_string().contains("No usable data"));
    }

    struct Unreadable;

    impl GridSource for Unreadable {
        fn open(&self, _: &Path) -> Result<GriddedDataset> {
            panic!("no file should be opened");
        }

        fn ready(&self) -> Result<()> {
            Err(ClimateError::FeatureDisabled("the yearly files".to_string()).into())
        }
    }

    #[test]
    fn should_stop_before_any_year_when_source_unavailable() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(dir.path(), 1940, 1942);
        touch_years(&settings, settings.years());

        let err = load_years(&settings, &Unreadable).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ClimateError>(),
            Some(ClimateError::FeatureDisabled(_))
        ));
    }
}
