//! NetCDF fixtures shared by the integration tests
#![allow(dead_code)]

use ndarray::{Array1, Array2, Array3};
use netcdf::create;
use netcdf::types::{NcTypeDescriptor, NcVariableType};
use std::path::{Path, PathBuf};

pub const NY: usize = 2;
pub const NX: usize = 3;

/// Length of a WRF `Times` entry such as `2017-06-01_00:00:00`
pub const DATE_STR_LEN: usize = 19;

/// A NetCDF `char`
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
pub struct NcChar(pub u8);

unsafe impl NcTypeDescriptor for NcChar {
    fn type_descriptor() -> NcVariableType {
        NcVariableType::Char
    }
}

/// Layout of the latitude/longitude variables in a fixture file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordLayout {
    /// `(time, y, x)`, as written by WRF-style models
    ThreeD,
    /// `(y, x)`
    TwoD,
}

/// Write one LSM file with `times.len()` time steps.
///
/// `RAIN` is filled with `offset + flat index` so values can be traced back to
/// their file.
pub fn write_lsm_file(
    path: &Path,
    times: &[f64],
    layout: CoordLayout,
    offset: f64,
) -> Result<(), netcdf::Error> {
    let nt = times.len();
    let mut file = create(path)?;
    file.add_attribute("title", "pangaea test output")?;

    file.add_dimension("time", nt)?;
    file.add_dimension("y", NY)?;
    file.add_dimension("x", NX)?;

    {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_attribute("units", "days since 2017-01-01")?;
        time.put_attribute("calendar", "gregorian")?;
        let time_array = Array1::from(times.to_vec());
        time.put(time_array.view(), ..)?;
    }

    let lat2 = Array2::from_shape_fn((NY, NX), |(j, _)| 40.0 + j as f64);
    let lon2 = Array2::from_shape_fn((NY, NX), |(_, i)| -100.0 + i as f64);

    match layout {
        CoordLayout::ThreeD => {
            let lat3 = Array3::from_shape_fn((nt, NY, NX), |(_, j, i)| lat2[[j, i]]);
            let lon3 = Array3::from_shape_fn((nt, NY, NX), |(_, j, i)| lon2[[j, i]]);
            let mut lat = file.add_variable::<f64>("lat", &["time", "y", "x"])?;
            lat.put_attribute("units", "degrees_north")?;
            lat.put(lat3.view(), ..)?;
            let mut lon = file.add_variable::<f64>("lon", &["time", "y", "x"])?;
            lon.put_attribute("units", "degrees_east")?;
            lon.put(lon3.view(), ..)?;
        }
        CoordLayout::TwoD => {
            let mut lat = file.add_variable::<f64>("lat", &["y", "x"])?;
            lat.put_attribute("units", "degrees_north")?;
            lat.put(lat2.view(), ..)?;
            let mut lon = file.add_variable::<f64>("lon", &["y", "x"])?;
            lon.put_attribute("units", "degrees_east")?;
            lon.put(lon2.view(), ..)?;
        }
    }

    {
        let rain = Array3::from_shape_fn((nt, NY, NX), |(t, j, i)| {
            offset + ((t * NY + j) * NX + i) as f64
        });
        let mut var = file.add_variable::<f32>("RAIN", &["time", "y", "x"])?;
        var.put_attribute("units", "mm")?;
        var.put_attribute("_FillValue", -9999.0f32)?;
        var.put(rain.mapv(|v| v as f32).view(), ..)?;
    }

    Ok(())
}

/// Write `count` single-step files named `lsm_000.nc`, `lsm_001.nc`, ...
/// covering consecutive days.
pub fn write_daily_files(dir: &Path, count: usize, layout: CoordLayout) -> Vec<PathBuf> {
    (0..count)
        .map(|day| {
            let path = dir.join(format!("lsm_{:03}.nc", day));
            write_lsm_file(&path, &[day as f64], layout, day as f64 * 100.0)
                .expect("Failed to write fixture file");
            path
        })
        .collect()
}

pub fn pattern(dir: &Path) -> String {
    format!("{}/*.nc", dir.display())
}

/// Write a WRF-style file: `Times(Time, DateStrLen)` characters, 3-D
/// `XLAT`/`XLONG` and `RAINNC`, one time step per stamp.
pub fn write_wrf_file(path: &Path, stamps: &[&str], offset: f32) -> Result<(), netcdf::Error> {
    let nt = stamps.len();
    let mut file = create(path)?;
    file.add_dimension("Time", nt)?;
    file.add_dimension("DateStrLen", DATE_STR_LEN)?;
    file.add_dimension("south_north", NY)?;
    file.add_dimension("west_east", NX)?;

    {
        let chars: Vec<NcChar> = stamps
            .iter()
            .flat_map(|stamp| {
                let mut bytes = stamp.as_bytes().to_vec();
                bytes.resize(DATE_STR_LEN, 0);
                bytes.into_iter().map(NcChar)
            })
            .collect();
        let mut times = file.add_variable::<NcChar>("Times", &["Time", "DateStrLen"])?;
        times.put_values(&chars, ..)?;
    }

    let dims = ["Time", "south_north", "west_east"];
    let xlat = Array3::from_shape_fn((nt, NY, NX), |(_, j, _)| 40.0f32 + j as f32);
    let xlong = Array3::from_shape_fn((nt, NY, NX), |(_, _, i)| -100.0f32 + i as f32);
    let rain = Array3::from_shape_fn((nt, NY, NX), |(t, j, i)| {
        offset + ((t * NY + j) * NX + i) as f32
    });
    for (name, values) in [("XLAT", xlat), ("XLONG", xlong), ("RAINNC", rain)] {
        let mut var = file.add_variable::<f32>(name, &dims)?;
        var.put(values.view(), ..)?;
    }

    Ok(())
}

/// Write a single-step file on the 2-D grid with the given `time`
/// attributes. Latitude starts at `lat_start`.
pub fn write_grid_file(
    path: &Path,
    time: f64,
    time_attrs: &[(&str, &str)],
    lat_start: f64,
) -> Result<(), netcdf::Error> {
    let mut file = create(path)?;
    file.add_dimension("time", 1)?;
    file.add_dimension("y", NY)?;
    file.add_dimension("x", NX)?;

    {
        let mut var = file.add_variable::<f64>("time", &["time"])?;
        for (name, value) in time_attrs {
            var.put_attribute(name, *value)?;
        }
        var.put(Array1::from(vec![time]).view(), ..)?;
    }

    let lat = Array2::from_shape_fn((NY, NX), |(j, _)| lat_start + j as f64);
    let lon = Array2::from_shape_fn((NY, NX), |(_, i)| -100.0 + i as f64);
    for (name, values) in [("lat", lat), ("lon", lon)] {
        let mut var = file.add_variable::<f64>(name, &["y", "x"])?;
        var.put(values.view(), ..)?;
    }

    let rain = Array3::<f32>::zeros((1, NY, NX));
    let mut var = file.add_variable::<f32>("RAIN", &["time", "y", "x"])?;
    var.put(rain.view(), ..)?;

    Ok(())
}

/// Write a file with packed values: `RAIN = [-9999, 4]` (`_FillValue` -9999,
/// `scale_factor` 0.5) and a `lat` stored as hundredths of a degree.
pub fn write_packed_file(path: &Path) -> Result<(), netcdf::Error> {
    let mut file = create(path)?;
    file.add_dimension("time", 1)?;
    file.add_dimension("y", 1)?;
    file.add_dimension("x", 2)?;

    {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_attribute("units", "days since 2017-01-01")?;
        time.put(Array1::from(vec![0.0]).view(), ..)?;
    }
    {
        let mut lat = file.add_variable::<i16>("lat", &["y", "x"])?;
        lat.put_attribute("scale_factor", 0.01f64)?;
        lat.put_attribute("add_offset", 40.0f64)?;
        lat.put(Array2::from_shape_vec((1, 2), vec![0i16, 50]).unwrap().view(), ..)?;
    }
    {
        let mut lon = file.add_variable::<f64>("lon", &["y", "x"])?;
        lon.put(Array2::from_shape_vec((1, 2), vec![-100.0, -99.0]).unwrap().view(), ..)?;
    }
    {
        let mut rain = file.add_variable::<f32>("RAIN", &["time", "y", "x"])?;
        rain.put_attribute("_FillValue", -9999.0f32)?;
        rain.put_attribute("scale_factor", 0.5f32)?;
        rain.put_attribute("coordinates", "lat lon")?;
        let values = Array3::from_shape_vec((1, 1, 2), vec![-9999.0f32, 4.0]).unwrap();
        rain.put(values.view(), ..)?;
    }

    Ok(())
}
