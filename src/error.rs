//! Failure kinds that callers match on or report specially. Everything else
//! travels as `anyhow::Error` with context attached.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimateError {
    #[error("Missing variable: {0}")]
    #[cfg_attr(not(feature = "netcdf"), allow(dead_code))]
    MissingVariable(String),

    #[error("Unsupported time units '{0}'")]
    UnsupportedTimeUnits(String),

    #[error("Variable '{name}' has {found} values, expected {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("No usable data: {0}")]
    NoUsableData(String),

    #[error("Retrieval job {job_id} ended with status '{status}'")]
    JobFailed { job_id: String, status: String },

    #[error("No CDS API credentials found (set CDSAPI_URL/CDSAPI_KEY or create ~/.cdsapirc)")]
    MissingCredentials,

    #[error("Built without the `netcdf` feature; cannot read {0}")]
    FeatureDisabled(String),
}
