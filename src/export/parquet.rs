//! Save the flattened observations to a parquet file.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::{Context, Result};
use arrow::{
    array::{Date32Builder, Float64Builder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::{cli::create_progress_bar, reading::Observation};

const CHUNK_SIZE: usize = 100_000;

pub fn save_observations(rows: &[Observation], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)
        .with_context(|| format!("Failed to create {}", file_path.display()))?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("time", DataType::Date32, false),
        Field::new("latitude", DataType::Float64, false),
        Field::new("longitude", DataType::Float64, false),
        Field::new("2m_temperature", DataType::Float64, true),
    ]));

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
    let pb = create_progress_bar(rows.len() as u64, "Writing parquet file".to_string());

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();

    for chunk in rows.chunks(CHUNK_SIZE) {
        let mut time_builder = Date32Builder::with_capacity(chunk.len());
        let mut lat_builder = Float64Builder::with_capacity(chunk.len());
        let mut lon_builder = Float64Builder::with_capacity(chunk.len());
        let mut temperature_builder = Float64Builder::with_capacity(chunk.len());

        for obs in chunk {
            let days = obs.time.date().signed_duration_since(epoch).num_days();
            time_builder.append_value(days as i32);
            lat_builder.append_value(obs.latitude);
            lon_builder.append_value(obs.longitude);
            temperature_builder.append_option(obs.temperature);
        }

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(time_builder.finish()),
                Arc::new(lat_builder.finish()),
                Arc::new(lon_builder.finish()),
                Arc::new(temperature_builder.finish()),
            ],
        )?;

        writer.write(&batch)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_with_message("Finished writing Parquet file");
    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
