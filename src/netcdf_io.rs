//! Writing datasets back to NetCDF
//!
//! The writer stores every numeric variable as unpacked `f64` (missing values
//! as NaN) and text variables as NetCDF strings. It keeps attributes, and
//! records auxiliary coordinates (such as 2-D latitude/longitude) through the
//! CF `coordinates` attribute so that reading the file again restores them.

use crate::dataset::{Dataset, Variable};
use crate::errors::Result;
use crate::source::attribute_numbers;
use chrono::Utc;
use ndarray::Dimension;
use netcdf::{create, AttributeValue, FileMut};
use std::{fs, path::Path};
use tracing::{debug, info, warn};

/// Writes a dataset to a NetCDF file, replacing any existing file.
pub struct NetCDFWriter<'a> {
    dataset: &'a Dataset,
    output_path: &'a Path,
}

impl<'a> NetCDFWriter<'a> {
    pub fn new(dataset: &'a Dataset, output_path: &'a Path) -> Self {
        Self {
            dataset,
            output_path,
        }
    }

    pub fn write(&self) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = create(self.output_path)?;

        for (dim_name, dim_len) in self.dataset.dims() {
            file.add_dimension(&dim_name, dim_len)?;
        }

        let auxiliary = self.auxiliary_coords();
        for var in self.dataset.variables() {
            let coordinates = if self.dataset.is_coord(var.name()) {
                None
            } else {
                Some(auxiliary.as_slice())
            };
            write_variable(&mut file, var, coordinates)?;
        }

        for (name, value) in self.dataset.attrs() {
            if name != "history" {
                file.add_attribute(name, value.clone())?;
            }
        }
        file.add_attribute(
            "history",
            format!("Created by pangaea on {}", Utc::now().to_rfc3339()),
        )?;

        info!(path = %self.output_path.display(), "wrote dataset");
        Ok(())
    }

    /// Coordinates that are not indexed by a dimension of the same name
    fn auxiliary_coords(&self) -> Vec<&'a str> {
        let dataset: &'a Dataset = self.dataset;
        dataset
            .coords()
            .into_iter()
            .filter(|name| {
                dataset
                    .variable(name)
                    .map(|var| !(var.ndim() == 1 && var.dims()[0] == *name))
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// Attributes the writer sets itself, or whose packing was undone on read
const SKIPPED_ATTRIBUTES: &[&str] = &[
    "_FillValue",
    "missing_value",
    "scale_factor",
    "add_offset",
    "coordinates",
];

fn write_variable(file: &mut FileMut, var: &Variable, coordinates: Option<&[&str]>) -> Result<()> {
    let dim_refs: Vec<&str> = var.dims().iter().map(|s| s.as_str()).collect();

    if let Some(strings) = var.strings() {
        let mut new_var = file.add_string_variable(var.name(), &dim_refs)?;
        for (index, text) in strings.indexed_iter() {
            new_var.put_string(text, index.slice())?;
        }
        for (name, value) in var
            .attrs()
            .iter()
            .filter(|(name, _)| !SKIPPED_ATTRIBUTES.contains(&name.as_str()))
        {
            new_var.put_attribute(name, value.clone())?;
        }
        debug!(var = var.name(), "wrote text variable");
        return Ok(());
    }

    let data = var.values()?;
    let mut new_var = file.add_variable::<f64>(var.name(), &dim_refs)?;

    // `_FillValue` has to match the variable type and be set before data
    if let Some(fill) = var.attribute("_FillValue") {
        match fill_value_as_f64(fill) {
            Some(fv) => {
                new_var.put_attribute("_FillValue", fv)?;
            }
            None => warn!(var = var.name(), "skipped non-numeric _FillValue"),
        }
    }

    if data.ndim() == 0 {
        new_var.put(data.view(), &[] as &[usize])?;
    } else {
        new_var.put(data.view(), ..)?;
    }

    for (name, value) in var
        .attrs()
        .iter()
        .filter(|(name, _)| !SKIPPED_ATTRIBUTES.contains(&name.as_str()))
    {
        new_var.put_attribute(name, value.clone())?;
    }

    if let Some(coords) = coordinates.filter(|c| !c.is_empty()) {
        new_var.put_attribute("coordinates", coords.join(" "))?;
    }

    debug!(var = var.name(), "wrote variable");
    Ok(())
}

fn fill_value_as_f64(value: &AttributeValue) -> Option<f64> {
    attribute_numbers(value).first().copied()
}

/// Writes a dataset to `output_path`.
pub fn write_dataset(dataset: &Dataset, output_path: &Path) -> Result<()> {
    NetCDFWriter::new(dataset, output_path).write()
}
