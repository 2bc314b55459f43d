//! Spreadsheet export of the flattened record.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::NaiveDate;
use simple_excel_writer::{Row, Workbook};

use crate::reading::Observation;

pub const COLUMNS: [&str; 4] = ["time", "latitude", "longitude", "2m_temperature"];
const TIME_FORMAT: &str = "%Y/%m/%d";

/// Writes one sheet with a header row and one row per observation. Absent
/// temperatures are left as empty cells.
pub fn write_spreadsheet(rows: &[Observation], path: &Path, sheet_name: &str) -> Result<()> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow!("Spreadsheet path {} is not valid UTF-8", path.display()))?;

    let mut workbook = Workbook::create(path_str);
    let mut sheet = workbook.create_sheet(sheet_name);

    workbook
        .write_sheet(&mut sheet, |sheet_writer| {
            sheet_writer.append_row(Row::from_iter(COLUMNS.iter().copied()))?;

            for obs in rows {
                let mut row = Row::new();
                row.add_cell(obs.time.format(TIME_FORMAT).to_string());
                row.add_cell(obs.latitude);
                row.add_cell(obs.longitude);
                match obs.temperature {
                    Some(t) => row.add_cell(t),
                    None => row.add_empty_cells(1),
                }
                sheet_writer.append_row(row)?;
            }

            Ok(())
        })
        .with_context(|| format!("Failed to write sheet '{}'", sheet_name))?;

    workbook
        .close()
        .with_context(|| format!("Failed to save {}", path.display()))?;

    Ok(())
}

/// Reads back a sheet written by [`write_spreadsheet`]. Timestamps come back
/// at midnight since the sheet stores dates only.
pub fn read_spreadsheet(path: &Path, sheet_name: &str) -> Result<Vec<Observation>> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).with_context(|| format!("Could not open {}", path.display()))?;
    let range = workbook
        .worksheet_range(sheet_name)
        .with_context(|| format!("Could not read sheet '{}'", sheet_name))?;

    let mut rows = Vec::new();
    for (idx, cells) in range.rows().enumerate().skip(1) {
        let cell = |col: usize| cells.get(col).unwrap_or(&Data::Empty);

        let time = match cell(0) {
            Data::String(s) => NaiveDate::parse_from_str(s, TIME_FORMAT)
                .with_context(|| format!("Row {}: bad date '{}'", idx + 1, s))?,
            other => return Err(anyhow!("Row {}: expected a date string, found {:?}", idx + 1, other)),
        };
        let latitude = number(cell(1)).ok_or_else(|| anyhow!("Row {}: missing latitude", idx + 1))?;
        let longitude = number(cell(2)).ok_or_else(|| anyhow!("Row {}: missing longitude", idx + 1))?;

        rows.push(Observation {
            time: time.and_hms_opt(0, 0, 0).unwrap_or_default(),
            latitude,
            longitude,
            temperature: number(cell(3)),
        });
    }

    Ok(rows)
}

fn number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// -- Tests -------------------------------------------------------------------
