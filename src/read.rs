//! Helpers to read in land surface model datasets
//!
//! [`open_mfdataset`] opens a set of LSM output files as one dataset stacked
//! along time, with latitude, longitude and time registered as coordinates.

use crate::dataset::Dataset;
use crate::errors::{PangaeaError, Result};
use crate::lsm::LsmNames;
use crate::reader::open_dataset;
use crate::source::{FileHandles, LoadStrategy};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Open land surface model NetCDF files as a single dataset.
///
/// # Arguments
///
/// * `path_to_lsm_files` - Path to the files with wildcard (e.g. `/path/to/files/*.nc`)
/// * `names` - Latitude, longitude and time variable and dimension names
/// * `strategy` - How files are accessed when data variables are read.
///   `true` or [`LoadStrategy::AutoClose`] closes each file after every read.
///
/// # Errors
///
/// Fails when the pattern matches no file, when a file cannot be read, when a
/// named variable or dimension is absent, or when files do not share a schema.
/// A time coordinate that cannot be decoded does not fail the open; the
/// accessor's `datetime()` is then `None`.
pub fn open_mfdataset(
    path_to_lsm_files: &str,
    names: &LsmNames,
    strategy: impl Into<LoadStrategy>,
) -> Result<Dataset> {
    let strategy = strategy.into();
    let paths = resolve_paths(path_to_lsm_files)?;
    info!(
        pattern = path_to_lsm_files,
        files = paths.len(),
        ?strategy,
        "opening land surface model files"
    );

    let handles = Rc::new(FileHandles::new(strategy));
    let datasets = paths
        .iter()
        .map(|path| define_coords(open_dataset(path, &handles)?, names))
        .collect::<Result<Vec<_>>>()?;

    let mut xds = Dataset::concat(datasets, &names.time_dim)?;
    xds.lsm_mut().set_names(names);
    match xds.lsm_to_datetime() {
        Ok(()) => {}
        Err(PangaeaError::TimeDecodeError { var, message }) => {
            warn!(%var, %message, "time coordinate left undecoded");
        }
        Err(err) => return Err(err),
    }

    Ok(xds)
}

/// Ensure latitude, longitude and time are loaded as proper coordinates.
///
/// 3-D latitude/longitude variables lose their time dimension. If any of the
/// three variables is not yet a coordinate, all three are promoted.
pub fn define_coords(mut xds: Dataset, names: &LsmNames) -> Result<Dataset> {
    for var_name in [&names.lat_var, &names.lon_var] {
        let var = xds
            .variable_mut(var_name)
            .ok_or_else(|| PangaeaError::VariableNotFound {
                var: var_name.clone(),
            })?;
        if var.ndim() == 3 {
            debug!(var = %var_name, dim = %names.time_dim, "removing time dimension");
            var.squeeze(&names.time_dim)?;
        }
    }

    let coords = [
        names.lat_var.as_str(),
        names.lon_var.as_str(),
        names.time_var.as_str(),
    ];
    if !coords.iter().all(|name| xds.is_coord(name)) {
        xds.set_coords(&coords)?;
    }

    Ok(xds)
}

/// Expand a glob pattern into a sorted, non-empty list of files
pub fn resolve_paths(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths = glob::glob(pattern)?.collect::<std::result::Result<Vec<_>, _>>()?;
    if paths.is_empty() {
        return Err(PangaeaError::NoFilesFound {
            pattern: pattern.to_string(),
        });
    }
    paths.sort();
    Ok(paths)
}
