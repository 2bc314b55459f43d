//! Writes the flattened multi-year record for downstream use.

pub mod parquet;
pub mod spreadsheet;

pub use self::parquet::save_observations;
pub use spreadsheet::{read_spreadsheet, write_spreadsheet};
