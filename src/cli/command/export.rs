use std::path::PathBuf;

use anyhow::{anyhow, Result};
use log::info;

use crate::{
    config::Settings,
    deserialise::load_years,
    export::{read_spreadsheet, save_observations, write_spreadsheet},
    reading::{GridSource, NetcdfSource},
};

use super::make_parquet_file_name;

pub fn export(settings: &Settings, parquet: bool) -> Result<Vec<PathBuf>> {
    export_with(settings, &NetcdfSource, parquet)
}

/// Writes the combined spreadsheet, and the parquet file when asked. Returns
/// the paths written.
pub fn export_with<S: GridSource>(settings: &Settings, source: &S, parquet: bool) -> Result<Vec<PathBuf>> {
    let rows = load_years(settings, source)?.into_observations()?;
    info!("Combined {} rows", rows.len());

    write_spreadsheet(&rows, &settings.spreadsheet_path, &settings.sheet_name)?;
    let written = read_spreadsheet(&settings.spreadsheet_path, &settings.sheet_name)?.len();
    if written != rows.len() {
        return Err(anyhow!(
            "{} holds {} rows, expected {}",
            settings.spreadsheet_path.display(),
            written,
            rows.len()
        ));
    }

    let mut saved = vec![settings.spreadsheet_path.clone()];

    if parquet {
        let parquet_file_name = make_parquet_file_name(settings);
        save_observations(&rows, &parquet_file_name)?;
        saved.push(parquet_file_name);
    }

    Ok(saved)
}

// -- Tests -------------------------------------------------------------------
