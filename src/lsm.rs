//! Land surface model accessor
//!
//! Every [`Dataset`] carries an [`LsmAccessor`] recording which variables and
//! dimensions hold latitude, longitude and time. Once the names are set the
//! accessor can decode the time coordinate into datetimes and present the
//! latitude/longitude coordinates as 2-D grids.

use crate::dataset::{Dataset, Variable};
use crate::errors::{PangaeaError, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use ndarray::{Array2, Ix1, Ix2};
use tracing::debug;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Formats of times stored as text, WRF `Times` first
const TEXT_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d_%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// CF calendars that can be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    /// `standard`, `gregorian` and `proleptic_gregorian`
    Standard,
    /// `noleap` / `365_day`
    NoLeap,
    /// `all_leap` / `366_day`
    AllLeap,
    /// `360_day`
    Day360,
}

impl Calendar {
    /// Calendar named by a CF `calendar` attribute
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" => Some(Calendar::Standard),
            "noleap" | "365_day" => Some(Calendar::NoLeap),
            "all_leap" | "366_day" => Some(Calendar::AllLeap),
            "360_day" => Some(Calendar::Day360),
            _ => None,
        }
    }

    /// Month lengths of calendars whose years all have the same length
    fn month_lengths(self) -> Option<[i64; 12]> {
        match self {
            Calendar::Standard => None,
            Calendar::NoLeap => Some([31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]),
            Calendar::AllLeap => Some([31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]),
            Calendar::Day360 => Some([30; 12]),
        }
    }

    /// Add `millis` to `reference`, counting days the way this calendar does.
    ///
    /// `None` when the result is out of range or is a date the proleptic
    /// Gregorian calendar does not have (such as 30 February in `360_day`).
    fn offset(self, reference: NaiveDateTime, millis: i64) -> Option<NaiveDateTime> {
        let Some(months) = self.month_lengths() else {
            return Duration::try_milliseconds(millis)
                .and_then(|offset| reference.checked_add_signed(offset));
        };
        let year_len: i64 = months.iter().sum();

        let month = reference.month0() as usize;
        let day = i64::from(reference.day0());
        if day >= months[month] {
            return None;
        }
        let day_of_year = months[..month].iter().sum::<i64>() + day;
        let time_of_day = i64::from(reference.num_seconds_from_midnight()) * 1000
            + i64::from(reference.nanosecond() / 1_000_000);
        let start = (i64::from(reference.year()) * year_len + day_of_year)
            .checked_mul(MILLIS_PER_DAY)?
            .checked_add(time_of_day)?;

        let total = start.checked_add(millis)?;
        let days = total.div_euclid(MILLIS_PER_DAY);
        let millis_of_day = total.rem_euclid(MILLIS_PER_DAY);

        let year = i32::try_from(days.div_euclid(year_len)).ok()?;
        let mut day_of_year = days.rem_euclid(year_len);
        let mut month = 1;
        for len in months {
            if day_of_year < len {
                break;
            }
            day_of_year -= len;
            month += 1;
        }

        let date = NaiveDate::from_ymd_opt(year, month, u32::try_from(day_of_year + 1).ok()?)?;
        let time = NaiveTime::from_num_seconds_from_midnight_opt(
            u32::try_from(millis_of_day / 1000).ok()?,
            u32::try_from(millis_of_day % 1000 * 1_000_000).ok()?,
        )?;
        Some(date.and_time(time))
    }
}

/// Variable and dimension names of an LSM grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsmNames {
    pub lat_var: String,
    pub lon_var: String,
    pub time_var: String,
    pub lat_dim: String,
    pub lon_dim: String,
    pub time_dim: String,
}

impl LsmNames {
    pub fn new(
        lat_var: &str,
        lon_var: &str,
        time_var: &str,
        lat_dim: &str,
        lon_dim: &str,
        time_dim: &str,
    ) -> Self {
        Self {
            lat_var: lat_var.to_string(),
            lon_var: lon_var.to_string(),
            time_var: time_var.to_string(),
            lat_dim: lat_dim.to_string(),
            lon_dim: lon_dim.to_string(),
            time_dim: time_dim.to_string(),
        }
    }
}

impl Default for LsmNames {
    fn default() -> Self {
        Self::new("lat", "lon", "time", "lat", "lon", "time")
    }
}

/// Naming metadata and decoded times attached to a dataset
#[derive(Debug, Clone, Default)]
pub struct LsmAccessor {
    pub y_var: String,
    pub x_var: String,
    pub time_var: String,
    pub y_dim: String,
    pub x_dim: String,
    pub time_dim: String,
    datetime: Option<Vec<NaiveDateTime>>,
}

impl LsmAccessor {
    pub fn set_names(&mut self, names: &LsmNames) {
        self.y_var = names.lat_var.clone();
        self.x_var = names.lon_var.clone();
        self.time_var = names.time_var.clone();
        self.y_dim = names.lat_dim.clone();
        self.x_dim = names.lon_dim.clone();
        self.time_dim = names.time_dim.clone();
    }

    pub fn names(&self) -> LsmNames {
        LsmNames::new(
            &self.y_var,
            &self.x_var,
            &self.time_var,
            &self.y_dim,
            &self.x_dim,
            &self.time_dim,
        )
    }

    /// Decoded time steps, available after [`Dataset::lsm_to_datetime`]
    pub fn datetime(&self) -> Option<&[NaiveDateTime]> {
        self.datetime.as_deref()
    }
}

impl Dataset {
    /// Decode the accessor's time variable into datetimes.
    pub fn lsm_to_datetime(&mut self) -> Result<()> {
        let time_var = self.lsm().time_var.clone();
        let var = self
            .variable(&time_var)
            .ok_or_else(|| PangaeaError::VariableNotFound {
                var: time_var.clone(),
            })?;

        let datetimes = decode_times(var)?;
        debug!(var = %time_var, steps = datetimes.len(), "decoded time coordinate");
        self.lsm_mut().datetime = Some(datetimes);
        Ok(())
    }

    /// Latitude as a 2-D `(y, x)` grid
    pub fn lsm_latitude(&self) -> Result<Array2<f64>> {
        let lsm = self.lsm();
        self.coordinate_grid(&lsm.y_var, &lsm.y_dim)
    }

    /// Longitude as a 2-D `(y, x)` grid
    pub fn lsm_longitude(&self) -> Result<Array2<f64>> {
        let lsm = self.lsm();
        self.coordinate_grid(&lsm.x_var, &lsm.x_dim)
    }

    /// A 1-D coordinate must run along `dim`; it is repeated along the other
    /// grid dimension.
    fn coordinate_grid(&self, var_name: &str, dim: &str) -> Result<Array2<f64>> {
        let var = self
            .variable(var_name)
            .ok_or_else(|| PangaeaError::VariableNotFound {
                var: var_name.to_string(),
            })?;
        let values = var.values()?;

        match var.ndim() {
            2 => Ok(values.into_dimensionality::<Ix2>()?),
            1 => {
                if var.dims()[0] != dim {
                    return Err(PangaeaError::DimensionNotFound {
                        var: var_name.to_string(),
                        dim: dim.to_string(),
                    });
                }
                let lsm = self.lsm();
                let line = values.into_dimensionality::<Ix1>()?;
                if dim == lsm.y_dim {
                    let nx = self.grid_len(&lsm.x_dim, &lsm.x_var)?;
                    Ok(Array2::from_shape_fn((line.len(), nx), |(i, _)| line[i]))
                } else {
                    let ny = self.grid_len(&lsm.y_dim, &lsm.y_var)?;
                    Ok(Array2::from_shape_fn((ny, line.len()), |(_, j)| line[j]))
                }
            }
            n => Err(PangaeaError::Generic(format!(
                "Coordinate '{}' is {}-D; expected 1-D or 2-D",
                var_name, n
            ))),
        }
    }

    fn grid_len(&self, dim: &str, var_name: &str) -> Result<usize> {
        self.dim_len(dim)
            .ok_or_else(|| PangaeaError::DimensionNotFound {
                var: var_name.to_string(),
                dim: dim.to_string(),
            })
    }
}

/// Decode a time variable, either text timestamps or CF numeric offsets.
pub fn decode_times(var: &Variable) -> Result<Vec<NaiveDateTime>> {
    let Some(strings) = var.strings() else {
        return decode_cf_times(var);
    };

    strings
        .iter()
        .map(|text| {
            parse_time_text(text).ok_or_else(|| PangaeaError::TimeDecodeError {
                var: var.name().to_string(),
                message: format!("cannot parse time '{}'", text),
            })
        })
        .collect()
}

fn parse_time_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TEXT_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Decode a CF-style numeric time variable (`<unit> since <reference>`).
///
/// The `calendar` attribute selects how days are counted; it defaults to
/// `standard`.
pub fn decode_cf_times(var: &Variable) -> Result<Vec<NaiveDateTime>> {
    let fail = |message: String| PangaeaError::TimeDecodeError {
        var: var.name().to_string(),
        message,
    };

    let calendar = match var.string_attribute("calendar") {
        Some(name) => Calendar::from_name(name)
            .ok_or_else(|| fail(format!("unsupported calendar '{}'", name)))?,
        None => Calendar::Standard,
    };

    let units = var
        .string_attribute("units")
        .ok_or_else(|| fail("missing 'units' attribute".to_string()))?;
    let (seconds_per_step, reference) = parse_time_units(units).map_err(fail)?;

    let values = var.values()?;
    values
        .iter()
        .map(|&value| {
            if !value.is_finite() {
                return Err(fail(format!("non-finite time value {}", value)));
            }
            let millis = (value * seconds_per_step * 1000.0).round() as i64;
            calendar.offset(reference, millis).ok_or_else(|| {
                fail(format!(
                    "time value {} is out of range for the {:?} calendar",
                    value, calendar
                ))
            })
        })
        .collect()
}

/// Split CF time units into seconds per step and the reference datetime
fn parse_time_units(units: &str) -> std::result::Result<(f64, NaiveDateTime), String> {
    let lowered = units.trim().to_lowercase();
    let (unit, reference) = lowered
        .split_once(" since ")
        .ok_or_else(|| format!("units '{}' are not of the form '<unit> since <date>'", units))?;

    let seconds = match unit.trim() {
        "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
        "minutes" | "minute" | "mins" | "min" => 60.0,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
        "days" | "day" | "d" => 86_400.0,
        "weeks" | "week" => 604_800.0,
        other => return Err(format!("unsupported time unit '{}'", other)),
    };

    Ok((seconds, parse_reference(reference)?))
}

fn parse_reference(reference: &str) -> std::result::Result<NaiveDateTime, String> {
    let trimmed = reference
        .trim()
        .trim_end_matches("utc")
        .trim_end_matches('z')
        .trim()
        .trim_end_matches("+00:00")
        .trim();

    for format in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dt%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dt%H:%M",
    ] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("cannot parse reference date '{}'", reference.trim()))
}
