//! Reading a single NetCDF file into a [`Dataset`]

use crate::dataset::{Dataset, Variable};
use crate::errors::{PangaeaError, Result};
use crate::source::{Encoding, FileHandles, LazyArray};
use ndarray::{indices, ArrayD, Dimension, IxDyn};
use netcdf::types::NcVariableType;
use netcdf::{Attribute, AttributeValue};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, warn};

/// Open one NetCDF file.
///
/// Coordinate variables (1-D variables named after their dimension, and any
/// name listed in a CF `coordinates` attribute) are read immediately, as are
/// text variables. All other numeric variables are left on disk until loaded.
/// Numeric values are masked and unpacked according to their CF attributes.
pub fn open_dataset(path: &Path, handles: &Rc<FileHandles>) -> Result<Dataset> {
    handles.with_file(path, |file| {
        let mut coord_names: BTreeSet<String> = BTreeSet::new();
        for var in file.variables() {
            let name = var.name();
            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            if dims.len() == 1 && dims[0] == name {
                coord_names.insert(name);
            }
            if let Some(Ok(AttributeValue::Str(listed))) = var.attribute_value("coordinates") {
                coord_names.extend(listed.split_whitespace().map(str::to_string));
            }
        }

        let mut ds = Dataset::new();
        ds.add_source(path);

        for var in file.variables() {
            let name = var.name();
            let vartype = var.vartype();
            if !matches!(
                vartype,
                NcVariableType::Int(_)
                    | NcVariableType::Float(_)
                    | NcVariableType::Char
                    | NcVariableType::String
            ) {
                warn!(var = %name, ?vartype, "skipping variable of unsupported type");
                continue;
            }

            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
            let attrs = read_attributes(var.attributes())?;

            let variable = if matches!(vartype, NcVariableType::Char | NcVariableType::String) {
                read_text(&var, dims, shape)?
            } else if coord_names.contains(&name) {
                let values: Vec<f64> = var.get_values::<f64, _>(..)?;
                let mut data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
                Encoding::from_attrs(&attrs).apply(&mut data);
                Variable::new(&name, dims, data)?
            } else {
                let encoding = Encoding::from_attrs(&attrs);
                let lazy = LazyArray::new(path, &name, shape, encoding, Rc::clone(handles));
                Variable::lazy(&name, dims, lazy)
            };
            ds.insert_variable(variable.with_attrs(attrs));
        }

        let present: Vec<&str> = coord_names
            .iter()
            .map(String::as_str)
            .filter(|name| ds.contains(name))
            .collect();
        ds.set_coords(&present)?;

        for (name, value) in read_attributes(file.attributes())? {
            ds.set_attribute(&name, value);
        }

        debug!(
            path = %path.display(),
            variables = ds.variables().count(),
            coords = present.len(),
            "opened file"
        );
        Ok(ds)
    })
}

/// Read a char or string variable as one string per element.
///
/// For char arrays the last dimension holds the characters of each string and
/// is dropped; trailing NULs and blanks are trimmed.
fn read_text(
    var: &netcdf::Variable<'_>,
    mut dims: Vec<String>,
    mut shape: Vec<usize>,
) -> Result<Variable> {
    let name = var.name();
    let strings: Vec<String> = match var.vartype() {
        NcVariableType::Char => {
            dims.pop();
            let width = shape.pop().unwrap_or(1);
            let count: usize = shape.iter().product();
            if width == 0 {
                vec![String::new(); count]
            } else {
                var.get_raw_values(..)?
                    .chunks(width)
                    .map(|chars| {
                        String::from_utf8_lossy(chars)
                            .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
                            .to_string()
                    })
                    .collect()
            }
        }
        NcVariableType::String => indices(IxDyn(&shape))
            .into_iter()
            .map(|index| var.get_string(index.slice()))
            .collect::<std::result::Result<Vec<String>, netcdf::Error>>()?,
        other => {
            return Err(PangaeaError::Generic(format!(
                "Variable '{}' of type {:?} is not text",
                name, other
            )))
        }
    };

    let data = ArrayD::from_shape_vec(IxDyn(&shape), strings)?;
    Variable::text(&name, dims, data)
}

fn read_attributes<'a>(
    attributes: impl Iterator<Item = Attribute<'a>>,
) -> Result<BTreeMap<String, AttributeValue>> {
    let mut attrs = BTreeMap::new();
    for attr in attributes {
        attrs.insert(attr.name().to_string(), attr.value()?);
    }
    Ok(attrs)
}
