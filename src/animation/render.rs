//! Draws frames with plotters and encodes them into a GIF that plays once.

use std::{fs::File, io::BufWriter, ops::Range, path::Path};

use anyhow::{anyhow, Context, Result};
use image::{
    codecs::gif::{GifEncoder, Repeat},
    Delay, DynamicImage, RgbImage,
};
use plotters::{coord::Shift, prelude::*};
use tempfile::NamedTempFile;

use super::{palette::diverging_color, Frame};
use crate::{
    aggregate::MonthlyValues, cli::create_progress_bar, config::Settings, download::parent_dir,
    error::ClimateError,
};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const MONTH_AXIS: Range<f64> = 0.5..12.5;
const TEMPERATURE_AXIS: Range<f64> = -7.0..23.0;
const DIFF_AXIS: Range<f64> = -2.0..4.0;
const TRACE_GREY: RGBColor = RGBColor(128, 128, 128);

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub window_length: i32,
    pub first_year: i32,
    pub last_year: i32,
    pub frame_delay_ms: u32,
    /// Colour bars on a diverging scale saturating at this many degrees.
    pub diverging_range: Option<f64>,
}

impl RenderOptions {
    pub fn new(settings: &Settings, first_year: i32, last_year: i32) -> Self {
        RenderOptions {
            width: 1000,
            height: 800,
            window_length: settings.window_length,
            first_year,
            last_year,
            frame_delay_ms: settings.frame_delay_ms,
            diverging_range: settings.diverging_bars.then_some(settings.diverging_range),
        }
    }

    pub fn title(&self) -> String {
        format!(
            "{}-Year Moving Average Monthly Air Temperatures and Difference from Cumulative Mean ({}-{})",
            self.window_length, self.first_year, self.last_year
        )
    }
}

/// Renders every frame into `path` and returns the number of frames written.
pub fn render_gif<I>(frames: I, options: &RenderOptions, path: &Path) -> Result<usize>
where
    I: IntoIterator<Item = Frame>,
{
    let mut frames = frames.into_iter().peekable();
    if frames.peek().is_none() {
        return Err(ClimateError::NoUsableData("no frames to render".to_string()).into());
    }

    write_via_temp(path, |file| encode_frames(frames, options, file))
}

/// Runs `write` against a temporary file beside `path` and moves it into place
/// only when `write` succeeds.
fn write_via_temp<T, F>(path: &Path, write: F) -> Result<T>
where
    F: FnOnce(&File) -> Result<T>,
{
    let temp = NamedTempFile::new_in(parent_dir(path))
        .with_context(|| format!("Failed to create a temporary file for {}", path.display()))?;

    let value = write(temp.as_file())?;

    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|e| anyhow!("Failed to save {}: {}", path.display(), e))?;

    Ok(value)
}

fn encode_frames<I>(frames: I, options: &RenderOptions, file: &File) -> Result<usize>
where
    I: Iterator<Item = Frame>,
{
    let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), 10);
    encoder.set_repeat(Repeat::Finite(0))?;

    let pb = create_progress_bar(frames.size_hint().0 as u64, "Rendering frames".to_string());
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    let mut count = 0;

    for frame in frames {
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            draw_frame(&root, &frame, options)?;
            root.present()?;
        }

        let rgb = RgbImage::from_raw(width, height, buffer.clone())
            .ok_or_else(|| anyhow!("Frame buffer does not match {}x{}", width, height))?;
        let rgba = DynamicImage::ImageRgb8(rgb).into_rgba8();
        let delay = Delay::from_numer_denom_ms(options.frame_delay_ms, 1);
        encoder.encode_frame(image::Frame::from_parts(rgba, 0, 0, delay))?;

        count += 1;
        pb.inc(1);
    }

    pb.finish_with_message("Frames rendered");
    drop(encoder);

    Ok(count)
}

fn draw_frame<DB>(root: &DrawingArea<DB, Shift>, frame: &Frame, options: &RenderOptions) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let root = root.titled(&options.title(), ("sans-serif", 18))?;

    // 2:1 height ratio between the panels
    let split = root.dim_in_pixel().1 as i32 * 2 / 3;
    let (upper, lower) = root.split_vertically(split);

    draw_profile_panel(&upper, frame, options)?;
    draw_diff_panel(&lower, frame, options)?;

    Ok(())
}

fn draw_profile_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
    options: &RenderOptions,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(MONTH_AXIS, TEMPERATURE_AXIS)?;

    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&month_tick)
        .y_desc("Average Temperature (°C)")
        .draw()?;

    for trace in &frame.faded {
        for segment in segments(trace) {
            chart.draw_series(LineSeries::new(segment, TRACE_GREY.mix(0.1)))?;
        }
    }

    for segment in segments(&frame.profile) {
        chart.draw_series(LineSeries::new(segment, RED.stroke_width(2)))?;
    }
    chart.draw_series(points(&frame.profile).map(|p| Circle::new(p, 4, RED.filled())))?;

    let caption = format!("{} {}-Year Average", frame.label, options.window_length);
    let style = TextStyle::from(("sans-serif", 16).into_font());
    let (text_width, _) = area.estimate_text_size(&caption, &style)?;
    let x = (area.dim_in_pixel().0 as i32 - text_width as i32) / 2;
    area.draw_text(&caption, &style, (x.max(0), 14))?;

    Ok(())
}

fn draw_diff_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    frame: &Frame,
    options: &RenderOptions,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(MONTH_AXIS, DIFF_AXIS)?;

    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&month_tick)
        .y_desc("Difference from Cumulative Mean (°C)")
        .draw()?;

    chart.draw_series(LineSeries::new(
        [(MONTH_AXIS.start, 0.0), (MONTH_AXIS.end, 0.0)],
        BLACK.mix(0.4),
    ))?;

    if let Some(diff) = &frame.diff {
        chart.draw_series(points(diff).map(|(month, d)| {
            let style = match options.diverging_range {
                Some(range) => diverging_color(d, range).filled(),
                None => TRACE_GREY.mix(0.6).filled(),
            };
            let top = d.clamp(DIFF_AXIS.start, DIFF_AXIS.end);
            Rectangle::new([(month - 0.4, 0.0), (month + 0.4, top)], style)
        }))?;
    }

    Ok(())
}

fn month_tick(x: &f64) -> String {
    let month = x.round();
    if (x - month).abs() > 1e-6 || !(1.0..=12.0).contains(&month) {
        return String::new();
    }

    MONTH_LABELS[month as usize - 1].to_string()
}

/// Defined values as (month, value) points, month 1 first.
fn points(values: &MonthlyValues) -> impl Iterator<Item = (f64, f64)> + '_ {
    values
        .iter()
        .enumerate()
        .filter_map(|(idx, v)| v.map(|v| ((idx + 1) as f64, v)))
}

/// Runs of consecutive defined months, so gaps break the line.
fn segments(values: &MonthlyValues) -> Vec<Vec<(f64, f64)>> {
    let mut runs = vec![];
    let mut current = vec![];

    for (idx, value) in values.iter().enumerate() {
        match value {
            Some(v) => current.push(((idx + 1) as f64, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

// -- Tests -------------------------------------------------------------------
