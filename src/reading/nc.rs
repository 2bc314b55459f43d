//! NetCDF reader for the yearly ERA5 files.

use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

use super::{
    columns::{
        resolve, TimeEncoding, LATITUDE_NAMES, LONGITUDE_NAMES, TEMPERATURE_NAMES, TIME_NAMES,
    },
    GriddedDataset,
};
use crate::error::ClimateError;

/// Values this large are fill values whatever the declared attribute says.
const FILL_THRESHOLD: f64 = 1.0e30;

pub fn read_dataset(path: &Path) -> Result<GriddedDataset> {
    let file = netcdf::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let latitudes = read_coord(&file, LATITUDE_NAMES)?;
    let longitudes = read_coord(&file, LONGITUDE_NAMES)?;

    let time_name = resolve(TIME_NAMES, |n| file.variable(n).is_some())
        .ok_or_else(|| ClimateError::MissingVariable(TIME_NAMES.join(" or ")))?;
    let time_var = file
        .variable(time_name)
        .ok_or_else(|| ClimateError::MissingVariable(time_name.to_string()))?;
    let units = string_attribute(&time_var, "units");
    let encoding = TimeEncoding::from_units(units.as_deref())?;
    let raw_times: Vec<f64> = time_var.get_values(..)?;
    let times = encoding.decode_all(&raw_times)?;
    let time_dim = time_var
        .dimensions()
        .first()
        .map(|d| d.name())
        .unwrap_or_else(|| time_name.to_string());

    debug!(
        "{}: {} times via '{}', {}x{} grid",
        path.display(),
        times.len(),
        time_name,
        latitudes.len(),
        longitudes.len()
    );

    let mut dataset = GriddedDataset {
        times,
        latitudes,
        longitudes,
        kelvin: None,
    };

    if let Some(name) = resolve(TEMPERATURE_NAMES, |n| file.variable(n).is_some()) {
        let var = file
            .variable(name)
            .ok_or_else(|| ClimateError::MissingVariable(name.to_string()))?;
        dataset.kelvin = Some(read_temperature(&var, &time_dim, &dataset)?);
    }

    Ok(dataset)
}

fn read_coord(file: &netcdf::File, names: &[&'static str]) -> Result<Vec<f64>> {
    let name = resolve(names, |n| file.variable(n).is_some())
        .ok_or_else(|| ClimateError::MissingVariable(names.join(" or ")))?;
    let var = file
        .variable(name)
        .ok_or_else(|| ClimateError::MissingVariable(name.to_string()))?;

    Ok(var.get_values(..)?)
}

/// Reads the Kelvin field into `[time][lat][lon]` order, unpacking
/// `scale_factor`/`add_offset` and masking fill values as NaN. Any further
/// dimension (ERA5 `expver`, ensemble `number`) is merged by keeping the first
/// defined value along it.
fn read_temperature(
    var: &netcdf::Variable,
    time_dim: &str,
    dataset: &GriddedDataset,
) -> Result<Vec<f64>> {
    let dims: Vec<(String, usize)> = var
        .dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .collect();
    let axis = |names: &[&str]| dims.iter().position(|(n, _)| names.contains(&n.as_str()));

    let t_axis = axis(&[time_dim])
        .ok_or_else(|| ClimateError::MissingVariable(format!("dimension {}", time_dim)))?;
    let lat_axis = axis(LATITUDE_NAMES)
        .ok_or_else(|| ClimateError::MissingVariable("latitude dimension".to_string()))?;
    let lon_axis = axis(LONGITUDE_NAMES)
        .ok_or_else(|| ClimateError::MissingVariable("longitude dimension".to_string()))?;

    let (n_time, n_lat, n_lon) = (
        dataset.times.len(),
        dataset.latitudes.len(),
        dataset.longitudes.len(),
    );
    for (axis, expected) in [(t_axis, n_time), (lat_axis, n_lat), (lon_axis, n_lon)] {
        if dims[axis].1 != expected {
            return Err(ClimateError::ShapeMismatch {
                name: dims[axis].0.clone(),
                expected,
                found: dims[axis].1,
            }
            .into());
        }
    }

    let raw: Vec<f64> = var.get_values(..)?;
    let total: usize = dims.iter().map(|(_, len)| len).product();
    if raw.len() != total {
        return Err(ClimateError::ShapeMismatch {
            name: var.name(),
            expected: total,
            found: raw.len(),
        }
        .into());
    }

    let scale = numeric_attribute(var, "scale_factor").unwrap_or(1.0);
    let offset = numeric_attribute(var, "add_offset").unwrap_or(0.0);
    let fill = numeric_attribute(var, "_FillValue");
    let missing = numeric_attribute(var, "missing_value");

    let mut strides = vec![1usize; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1].1;
    }
    let index_on = |flat: usize, axis: usize| (flat / strides[axis]) % dims[axis].1;

    let mut kelvin = vec![f64::NAN; n_time * n_lat * n_lon];
    for (flat, value) in raw.iter().enumerate() {
        if !value.is_finite()
            || value.abs() >= FILL_THRESHOLD
            || Some(*value) == fill
            || Some(*value) == missing
        {
            continue;
        }

        let target = (index_on(flat, t_axis) * n_lat + index_on(flat, lat_axis)) * n_lon
            + index_on(flat, lon_axis);
        if kelvin[target].is_nan() {
            kelvin[target] = value * scale + offset;
        }
    }

    Ok(kelvin)
}

fn numeric_attribute(var: &netcdf::Variable, name: &str) -> Option<f64> {
    use netcdf::AttributeValue as V;

    match var.attribute_value(name)?.ok()? {
        V::Double(v) => Some(v),
        V::Float(v) => Some(v as f64),
        V::Short(v) => Some(v as f64),
        V::Ushort(v) => Some(v as f64),
        V::Int(v) => Some(v as f64),
        V::Uint(v) => Some(v as f64),
        V::Longlong(v) => Some(v as f64),
        V::Ulonglong(v) => Some(v as f64),
        V::Schar(v) => Some(v as f64),
        V::Uchar(v) => Some(v as f64),
        _ => None,
    }
}

fn string_attribute(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;
    use netcdf::create;
    use tempfile::TempDir;

    use super::*;

    const LATS: [f64; 2] = [49.0, 48.0];
    const LONS: [f64; 1] = [17.0];

    fn add_grid(file: &mut netcdf::FileMut) {
        file.add_dimension("latitude", LATS.len()).unwrap();
        file.add_dimension("longitude", LONS.len()).unwrap();

        {
            let mut lat = file.add_variable::<f64>("latitude", &["latitude"]).unwrap();
            lat.put_attribute("units", "degrees_north").unwrap();
            lat.put_values(&LATS, ..).unwrap();
        }
        {
            let mut lon = file.add_variable::<f64>("longitude", &["longitude"]).unwrap();
            lon.put_attribute("units", "degrees_east").unwrap();
            lon.put_values(&LONS, ..).unwrap();
        }
    }

    fn add_valid_time(file: &mut netcdf::FileMut, seconds: &[f64]) {
        file.add_dimension("valid_time", seconds.len()).unwrap();
        let mut time = file.add_variable::<f64>("valid_time", &["valid_time"]).unwrap();
        time.put_attribute("units", "seconds since 1970-01-01").unwrap();
        time.put_values(seconds, ..).unwrap();
    }

    fn fixture(dir: &TempDir, name: &str) -> (PathBuf, netcdf::FileMut) {
        let path = dir.path().join(name);
        let file = create(&path).unwrap();

        (path, file)
    }

    fn ymd(y: i32, m: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn should_unpack_packed_temperature_and_mask_fill() {
        let dir = TempDir::new().unwrap();
        let (path, mut file) = fixture(&dir, "packed.nc");
        add_grid(&mut file);
        add_valid_time(&mut file, &[0.0, 2_678_400.0]);
        {
            let mut t2m = file
                .add_variable::<i16>("t2m", &["valid_time", "latitude", "longitude"])
                .unwrap();
            t2m.put_attribute("_FillValue", -32767i16).unwrap();
            t2m.put_attribute("scale_factor", 0.01f64).unwrap();
            t2m.put_attribute("add_offset", 273.15f64).unwrap();
            t2m.put_values(&[0i16, 1000, -32767, -500], ..).unwrap();
        }
        drop(file);

        let dataset = read_dataset(&path).unwrap();

        assert_eq!(dataset.times, vec![ymd(1970, 1, 1), ymd(1970, 2, 1)]);
        assert_eq!(dataset.latitudes, LATS.to_vec());

        let rows = dataset.flatten().unwrap();
        let temps: Vec<Option<f64>> = rows.iter().map(|r| r.temperature).collect();
        assert_eq!(temps.len(), 4);
        assert!(temps[0].unwrap().abs() < 1e-6);
        assert!((temps[1].unwrap() - 10.0).abs() < 1e-6);
        assert_eq!(temps[2], None);
        assert!((temps[3].unwrap() + 5.0).abs() < 1e-6);
        assert_eq!((rows[2].latitude, rows[2].longitude), (49.0, 17.0));
    }

    #[test]
    fn should_merge_expver_by_first_defined_value() {
        let dir = TempDir::new().unwrap();
        let (path, mut file) = fixture(&dir, "expver.nc");
        add_grid(&mut file);
        add_valid_time(&mut file, &[0.0]);
        file.add_dimension("expver", 2).unwrap();
        {
            let mut t2m = file
                .add_variable::<f64>("t2m", &["valid_time", "expver", "latitude", "longitude"])
                .unwrap();
            t2m.put_attribute("_FillValue", -9999.0f64).unwrap();
            // first expver is missing at the first latitude
            t2m.put_values(&[-9999.0, 280.0, 300.0, 290.0], ..).unwrap();
        }
        drop(file);

        let dataset = read_dataset(&path).unwrap();

        assert_eq!(dataset.kelvin, Some(vec![300.0, 280.0]));
    }

    #[test]
    fn should_decode_compact_date_field() {
        let dir = TempDir::new().unwrap();
        let (path, mut file) = fixture(&dir, "dated.nc");
        add_grid(&mut file);
        file.add_dimension("date", 2).unwrap();
        {
            let mut date = file.add_variable::<i32>("date", &["date"]).unwrap();
            date.put_values(&[19400101i32, 19401201], ..).unwrap();
        }
        {
            let mut t2m = file
                .add_variable::<f32>("t2m", &["date", "latitude", "longitude"])
                .unwrap();
            t2m.put_values(&[273.15f32; 4], ..).unwrap();
        }
        drop(file);

        let dataset = read_dataset(&path).unwrap();

        assert_eq!(dataset.times, vec![ymd(1940, 1, 1), ymd(1940, 12, 1)]);
        assert_eq!(dataset.kelvin.map(|k| k.len()), Some(4));
    }

    #[test]
    fn should_read_file_without_temperature_field() {
        let dir = TempDir::new().unwrap();
        let (path, mut file) = fixture(&dir, "no_t2m.nc");
        add_grid(&mut file);
        file.add_dimension("time", 1).unwrap();
        {
            let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
            time.put_attribute("units", "hours since 1900-01-01 00:00:00.0").unwrap();
            time.put_values(&[350_616.0], ..).unwrap();
        }
        drop(file);

        let dataset = read_dataset(&path).unwrap();
        let rows = dataset.flatten().unwrap();

        assert_eq!(dataset.kelvin, None);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.temperature.is_none()));
        assert_eq!(rows[0].time, ymd(1940, 1, 1));
    }

    #[test]
    fn should_fail_without_time_field() {
        let dir = TempDir::new().unwrap();
        let (path, mut file) = fixture(&dir, "no_time.nc");
        add_grid(&mut file);
        drop(file);

        let err = read_dataset(&path).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ClimateError>(),
            Some(ClimateError::MissingVariable(_))
        ));
    }
}
