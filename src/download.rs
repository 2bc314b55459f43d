//! Retrieves yearly ERA5 files from the Copernicus Climate Data Store.

use std::{
    env, fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context, Error, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{cli::create_spinner, config::Settings, error::ClimateError};

const DEFAULT_API_URL: &str = "https://cds.climate.copernicus.eu/api";

/// Request body for one year of 2m temperature.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RetrievalRequest {
    #[serde(skip)]
    pub dataset: String,
    pub product_type: Vec<String>,
    pub variable: Vec<String>,
    pub year: Vec<String>,
    pub month: Vec<String>,
    pub time: Vec<String>,
    pub area: [f64; 4],
    pub data_format: String,
    pub download_format: String,
}

impl RetrievalRequest {
    pub fn for_year(settings: &Settings, year: i32) -> Self {
        let frequency = settings.frequency;

        RetrievalRequest {
            dataset: frequency.dataset().to_string(),
            product_type: vec![frequency.product_type().to_string()],
            variable: vec!["2m_temperature".to_string()],
            year: vec![year.to_string()],
            month: (1..=12).map(|m| format!("{:02}", m)).collect(),
            time: vec![frequency.time().to_string()],
            area: settings.area.as_area(),
            data_format: "netcdf".to_string(),
            download_format: "unarchived".to_string(),
        }
    }
}

/// Fetches the file described by `request` and saves it at `target`.
#[allow(async_fn_in_trait)]
pub trait Retriever {
    async fn retrieve(&self, request: &RetrievalRequest, target: &Path) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub url: String,
    pub key: String,
}

impl Credentials {
    /// `CDSAPI_URL`/`CDSAPI_KEY` if set, else `~/.cdsapirc`.
    pub fn discover() -> Result<Self> {
        if let Some(credentials) =
            Self::from_env_values(env::var("CDSAPI_URL").ok(), env::var("CDSAPI_KEY").ok())
        {
            return Ok(credentials);
        }

        let rc_path = dirs::home_dir()
            .map(|home| home.join(".cdsapirc"))
            .ok_or(ClimateError::MissingCredentials)?;
        let text = fs::read_to_string(&rc_path).map_err(|_| ClimateError::MissingCredentials)?;

        Ok(Self::parse_rc(&text).ok_or(ClimateError::MissingCredentials)?)
    }

    /// Credentials from the environment values; a blank key counts as unset.
    pub fn from_env_values(url: Option<String>, key: Option<String>) -> Option<Self> {
        let key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())?;
        let url = url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Some(Credentials { url, key })
    }

    /// Parses the `url: ...` / `key: ...` lines of a `.cdsapirc` file.
    pub fn parse_rc(text: &str) -> Option<Self> {
        let mut url = None;
        let mut key = None;

        for line in text.lines() {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            match name.trim() {
                "url" => url = Some(value.trim().to_string()),
                "key" => key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        Some(Credentials {
            url: url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            key: key.filter(|k| !k.is_empty())?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    #[serde(rename = "jobID")]
    job_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct JobResults {
    asset: Asset,
}

#[derive(Debug, Deserialize)]
struct Asset {
    value: AssetValue,
}

#[derive(Debug, Deserialize)]
struct AssetValue {
    href: String,
}

/// Client for the CDS "retrieve v1" job API.
pub struct CdsClient {
    http: reqwest::Client,
    credentials: Credentials,
    poll_interval: Duration,
}

impl CdsClient {
    pub fn new(credentials: Credentials, poll_interval: Duration) -> Self {
        CdsClient {
            http: reqwest::Client::new(),
            credentials,
            poll_interval,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/retrieve/v1/{}", self.credentials.url.trim_end_matches('/'), path)
    }

    async fn submit(&self, request: &RetrievalRequest) -> Result<JobStatus> {
        let url = self.endpoint(&format!("processes/{}/execution", request.dataset));
        let body = serde_json::json!({ "inputs": request });

        let response = self
            .http
            .post(&url)
            .header("PRIVATE-TOKEN", &self.credentials.key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to submit request to {}", url))?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let response = self
            .http
            .get(self.endpoint(&format!("jobs/{}", job_id)))
            .header("PRIVATE-TOKEN", &self.credentials.key)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    async fn wait_for(&self, mut job: JobStatus, spinner: &ProgressBar) -> Result<String> {
        loop {
            match job.status.as_str() {
                "successful" => return Ok(job.job_id),
                "accepted" | "running" => {
                    spinner.set_message(format!("Job {} {}", job.job_id, job.status));
                    tokio::time::sleep(self.poll_interval).await;
                    job = self.status(&job.job_id).await?;
                }
                _ => {
                    return Err(ClimateError::JobFailed {
                        job_id: job.job_id,
                        status: job.status,
                    }
                    .into())
                }
            }
        }
    }

    async fn result_href(&self, job_id: &str) -> Result<String> {
        let response = self
            .http
            .get(self.endpoint(&format!("jobs/{}/results", job_id)))
            .header("PRIVATE-TOKEN", &self.credentials.key)
            .send()
            .await?
            .error_for_status()?;
        let results: JobResults = response.json().await?;

        Ok(results.asset.value.href)
    }
}

impl Retriever for CdsClient {
    async fn retrieve(&self, request: &RetrievalRequest, target: &Path) -> Result<()> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let spinner = create_spinner(format!("Requesting {}", name));

        let job = self.submit(request).await?;
        debug!("Submitted job {} for {}", job.job_id, name);
        let job_id = self.wait_for(job, &spinner).await?;
        let href = self.result_href(&job_id).await?;

        spinner.set_message(format!("Downloading {}", name));
        download_with_progress(&self.http, &href, target, spinner.clone()).await?;
        spinner.finish_with_message(format!("{} downloaded", name));

        Ok(())
    }
}

/// Streams `url` into a temporary file next to `file_path` and moves it into
/// place once complete, so an interrupted download leaves nothing behind.
pub async fn download_with_progress(
    http: &reqwest::Client,
    url: &str,
    file_path: &Path,
    progress_bar: ProgressBar,
) -> Result<(), Error> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| Error::msg(format!("Failed to download file: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::msg(format!("Failed to download file: {}", response.status())));
    }

    // Get content length and convert spinner to progress bar if we have size info
    let total_size = response.content_length().unwrap_or(0);
    if total_size > 0 {
        progress_bar.set_length(total_size);
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
        ) {
            progress_bar.set_style(style.progress_chars("=> "));
        }
    }

    let dir = parent_dir(file_path);
    let mut file = NamedTempFile::new_in(&dir)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| Error::msg(format!("Error reading chunk: {}", e)))?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress_bar.set_position(downloaded);
    }

    file.as_file().sync_all()?;
    file.persist(file_path)
        .map_err(|e| anyhow!("Failed to save {}: {}", file_path.display(), e))?;

    Ok(())
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Frequency;

    #[test]
    fn should_build_monthly_request() {
        let request = RetrievalRequest::for_year(&Settings::default(), 1940);

        assert_eq!(request.dataset, "reanalysis-era5-single-levels-monthly-means");
        assert_eq!(request.product_type, vec!["monthly_averaged_reanalysis"]);
        assert_eq!(request.variable, vec!["2m_temperature"]);
        assert_eq!(request.year, vec!["1940"]);
        assert_eq!(request.month.len(), 12);
        assert_eq!(request.month[0], "01");
        assert_eq!(request.month[11], "12");
        assert_eq!(request.time, vec!["00:00"]);
        assert_eq!(request.area, [49.6, 16.8, 47.7, 22.6]);
    }

    #[test]
    fn should_build_daily_request() {
        let settings = Settings {
            frequency: Frequency::Daily,
            ..Settings::default()
        };
        let request = RetrievalRequest::for_year(&settings, 2001);

        assert_eq!(request.dataset, "reanalysis-era5-land");
        assert_eq!(request.product_type, vec!["reanalysis"]);
        assert_eq!(request.time, vec!["12:00"]);
    }

    #[test]
    fn should_serialise_request_without_dataset() {
        let request = RetrievalRequest::for_year(&Settings::default(), 1940);
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("dataset").is_none());
        assert_eq!(json["data_format"], "netcdf");
        assert_eq!(json["year"][0], "1940");
        assert_eq!(json["area"][2], 47.7);
    }

    #[test]
    fn should_parse_cdsapirc() {
        let text = "url: https://cds.example.org/api\nkey: abcd-1234\n";
        let credentials = Credentials::parse_rc(text).unwrap();

        assert_eq!(credentials.url, "https://cds.example.org/api");
        assert_eq!(credentials.key, "abcd-1234");
    }

    #[test]
    fn should_default_url_and_require_key() {
        let credentials = Credentials::parse_rc("key: k\n").unwrap();
        assert_eq!(credentials.url, DEFAULT_API_URL);

        assert!(Credentials::parse_rc("url: https://x\n").is_none());
        assert!(Credentials::parse_rc("key:   \n").is_none());
    }

    #[test]
    fn should_ignore_blank_environment_key() {
        assert_eq!(Credentials::from_env_values(None, Some(String::new())), None);
        assert_eq!(Credentials::from_env_values(Some("https://x".to_string()), Some("  ".to_string())), None);
        assert_eq!(Credentials::from_env_values(None, None), None);

        let credentials = Credentials::from_env_values(Some(String::new()), Some("k".to_string())).unwrap();
        assert_eq!(credentials.url, DEFAULT_API_URL);
        assert_eq!(credentials.key, "k");
    }

    #[test]
    fn should_build_endpoints() {
        let client = CdsClient::new(
            Credentials {
                url: "https://cds.example.org/api/".to_string(),
                key: "k".to_string(),
            },
            Duration::from_secs(1),
        );

        assert_eq!(
            client.endpoint("jobs/42"),
            "https://cds.example.org/api/retrieve/v1/jobs/42"
        );
    }

    #[test]
    fn should_use_current_dir_for_bare_file_names() {
        assert_eq!(parent_dir(Path::new("x.nc")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("data/x.nc")), PathBuf::from("data"));
    }
}
