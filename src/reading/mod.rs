#[cfg_attr(not(feature = "netcdf"), allow(dead_code))]
pub mod columns;
pub mod grid;
#[cfg(feature = "netcdf")]
mod nc;

use std::path::Path;

use anyhow::Result;

pub use grid::{GriddedDataset, Observation};

// Define a trait for loading one year's file into a gridded dataset
pub trait GridSource {
    fn open(&self, path: &Path) -> Result<GriddedDataset>;

    /// Fails when the source cannot read any file at all.
    fn ready(&self) -> Result<()> {
        Ok(())
    }
}

impl<F> GridSource for F
where
    F: Fn(&Path) -> Result<GriddedDataset>,
{
    fn open(&self, path: &Path) -> Result<GriddedDataset> {
        self(path)
    }
}

/// Reads the yearly files with the system NetCDF library.
pub struct NetcdfSource;

impl GridSource for NetcdfSource {
    #[cfg(feature = "netcdf")]
    fn open(&self, path: &Path) -> Result<GriddedDataset> {
        nc::read_dataset(path)
    }

    #[cfg(not(feature = "netcdf"))]
    fn open(&self, path: &Path) -> Result<GriddedDataset> {
        Err(crate::error::ClimateError::FeatureDisabled(path.display().to_string()).into())
    }

    #[cfg(not(feature = "netcdf"))]
    fn ready(&self) -> Result<()> {
        Err(crate::error::ClimateError::FeatureDisabled("the yearly files".to_string()).into())
    }
}

// -- Tests -------------------------------------------------------------------
