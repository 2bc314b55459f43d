pub mod animate;
pub mod download;
pub mod export;

use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};

pub use animate::animate;
pub use download::download;
pub use export::export;

use crate::config::Settings;

/// Date-stamped parquet path placed next to the spreadsheet.
pub fn make_parquet_file_name(settings: &Settings) -> PathBuf {
    let today = Local::now();
    let file_name = format!(
        "{}-{}-{}-{:02}-{:02}.parquet",
        settings.file_prefix,
        settings.frequency,
        today.year(),
        today.month(),
        today.day()
    );

    settings
        .spreadsheet_path
        .parent()
        .unwrap_or(Path::new(""))
        .join(file_name)
}

// -- Tests -------------------------------------------------------------------
