use std::path::{Path, PathBuf};

use anyhow::Result;
use log::info;

use crate::{
    aggregate::{monthly_aggregates, sliding_windows, window_profiles, year_span},
    animation::{frames, render_gif, Frames, RenderOptions},
    config::Settings,
    deserialise::load_years,
    error::ClimateError,
    reading::{GridSource, NetcdfSource, Observation},
};

pub fn animate(settings: &Settings, output: Option<&Path>) -> Result<PathBuf> {
    animate_with(settings, &NetcdfSource, output)
}

pub fn animate_with<S: GridSource>(
    settings: &Settings,
    source: &S,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let observations = load_years(settings, source)?.into_observations()?;
    let (frames, first_year, last_year) = build_frames(settings, &observations)?;

    let path = output.map_or_else(|| settings.animation_path.clone(), Path::to_path_buf);
    let options = RenderOptions::new(settings, first_year, last_year);
    let count = render_gif(frames, &options, &path)?;
    info!("Rendered {} frames", count);

    Ok(path)
}

/// Aggregates the observations and lays sliding windows over the years that
/// have data. Returns the frames together with that year span.
pub fn build_frames(settings: &Settings, observations: &[Observation]) -> Result<(Frames, i32, i32)> {
    let aggregates = monthly_aggregates(observations);
    let (first_year, last_year) = year_span(&aggregates)
        .ok_or_else(|| ClimateError::NoUsableData("no temperature values".to_string()))?;

    let windows = sliding_windows(
        first_year,
        last_year,
        settings.window_length,
        settings.window_step,
    );
    if windows.is_empty() {
        return Err(ClimateError::NoUsableData(format!(
            "{}-{} is shorter than one {}-year window",
            first_year, last_year, settings.window_length
        ))
        .into());
    }

    let profiles = window_profiles(&aggregates, &windows);

    Ok((frames(profiles), first_year, last_year))
}

// -- Tests -------------------------------------------------------------------
