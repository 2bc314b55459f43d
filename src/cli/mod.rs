//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{command, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

#[cfg(not(feature = "netcdf"))]
const BUILD_NOTE: &str = "This build cannot read the yearly files. Rebuild with \
`--features netcdf` (needs the system libnetcdf) to use `export` and `animate`.";

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[cfg_attr(not(feature = "netcdf"), command(after_help = BUILD_NOTE))]
/// Contains the commands
pub struct Cli {
    /// TOML file overriding the default settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download one file per year from the Climate Data Store
    Download {},
    /// Combine the yearly files into one spreadsheet
    Export {
        /// Also write the rows to a parquet file
        #[arg(long)]
        parquet: bool,
    },
    /// Render the moving-average animation
    Animate {
        /// Where to write the GIF
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    ProgressBar::new(size)
        .with_message(message)
        .with_style(style.progress_chars("##-"))
}

// -- Tests -------------------------------------------------------------------
