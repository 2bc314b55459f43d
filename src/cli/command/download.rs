use std::{fmt, fs, time::Duration};

use anyhow::{Context, Result};
use log::{error, info};

use crate::{
    config::Settings,
    download::{CdsClient, Credentials, RetrievalRequest, Retriever},
};

/// Outcome of one acquisition run, by year.
#[derive(Debug, Default, PartialEq)]
pub struct AcquisitionReport {
    pub downloaded: Vec<i32>,
    pub present: Vec<i32>,
    pub failed: Vec<(i32, String)>,
}

impl fmt::Display for AcquisitionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downloaded, {} already present, {} failed",
            self.downloaded.len(),
            self.present.len(),
            self.failed.len()
        )?;
        for (year, reason) in &self.failed {
            write!(f, "\n  {}: {}", year, reason)?;
        }

        Ok(())
    }
}

pub async fn download(settings: &Settings) -> Result<AcquisitionReport> {
    let credentials = Credentials::discover()?;
    let client = CdsClient::new(
        credentials,
        Duration::from_secs(settings.poll_interval_secs),
    );

    acquire(&client, settings).await
}

/// Fetches every configured year that is not already on disk. A failed year is
/// recorded and the run moves on to the next one.
pub async fn acquire<R: Retriever>(retriever: &R, settings: &Settings) -> Result<AcquisitionReport> {
    fs::create_dir_all(&settings.data_dir)
        .with_context(|| format!("Failed to create {}", settings.data_dir.display()))?;

    let mut report = AcquisitionReport::default();

    for year in settings.years() {
        let target = settings.year_file(year);

        if target.exists() {
            info!("{} already exists, skipping", target.display());
            report.present.push(year);
            continue;
        }

        let request = RetrievalRequest::for_year(settings, year);
        match retriever.retrieve(&request, &target).await {
            Ok(()) => {
                info!("Downloaded {}", target.display());
                report.downloaded.push(year);
            }
            Err(e) => {
                error!("Error downloading data for {}: {:#}", year, e);
                report.failed.push((year, format!("{:#}", e)));
            }
        }
    }

    Ok(report)
}

// -- Tests -------------------------------------------------------------------
