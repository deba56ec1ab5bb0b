//! Labeled variables and datasets
//!
//! A [`Dataset`] is an ordered collection of named [`Variable`]s. Each variable
//! carries its dimension names, attributes and values, which are either held in
//! memory or read from the source files on demand. Variables flagged as
//! coordinates are always held in memory, as are text variables such as WRF
//! `Times`.

use crate::errors::{PangaeaError, Result};
use crate::lsm::LsmAccessor;
use crate::source::LazyArray;
use ndarray::{concatenate, ArrayD, ArrayViewD, Axis};
use netcdf::AttributeValue;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Values of a variable
#[derive(Debug, Clone)]
pub enum Values {
    Loaded(ArrayD<f64>),
    Lazy(LazyArray),
    /// One string per element, e.g. timestamps stored as characters
    Text(ArrayD<String>),
}

/// A named array with labeled dimensions
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    dims: Vec<String>,
    attrs: BTreeMap<String, AttributeValue>,
    values: Values,
}

impl Variable {
    /// Create an in-memory variable. The array rank must match `dims`.
    pub fn new<S: Into<String>>(name: &str, dims: Vec<S>, data: ArrayD<f64>) -> Result<Self> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != data.ndim() {
            return Err(PangaeaError::Generic(format!(
                "Variable '{}' has {} dimension names for a {}-D array",
                name,
                dims.len(),
                data.ndim()
            )));
        }

        Ok(Self {
            name: name.to_string(),
            dims,
            attrs: BTreeMap::new(),
            values: Values::Loaded(data),
        })
    }

    /// Create an in-memory text variable. The array rank must match `dims`.
    pub fn text<S: Into<String>>(name: &str, dims: Vec<S>, data: ArrayD<String>) -> Result<Self> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != data.ndim() {
            return Err(PangaeaError::Generic(format!(
                "Variable '{}' has {} dimension names for a {}-D array",
                name,
                dims.len(),
                data.ndim()
            )));
        }

        Ok(Self {
            name: name.to_string(),
            dims,
            attrs: BTreeMap::new(),
            values: Values::Text(data),
        })
    }

    /// Create a variable whose values stay on disk until loaded
    pub fn lazy(name: &str, dims: Vec<String>, lazy: LazyArray) -> Self {
        Self {
            name: name.to_string(),
            dims,
            attrs: BTreeMap::new(),
            values: Values::Lazy(lazy),
        }
    }

    pub fn with_attrs(mut self, attrs: BTreeMap<String, AttributeValue>) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        match &self.values {
            Values::Loaded(data) => data.shape().to_vec(),
            Values::Lazy(lazy) => lazy.shape().to_vec(),
            Values::Text(text) => text.shape().to_vec(),
        }
    }

    pub fn attrs(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attrs
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attrs.get(name)
    }

    pub fn set_attribute(&mut self, name: &str, value: AttributeValue) {
        self.attrs.insert(name.to_string(), value);
    }

    /// String attribute lookup, e.g. `units`
    pub fn string_attribute(&self, name: &str) -> Option<&str> {
        match self.attrs.get(name) {
            Some(AttributeValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self.values, Values::Lazy(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.values, Values::Text(_))
    }

    pub fn raw_values(&self) -> &Values {
        &self.values
    }

    /// In-memory data, if the variable has been loaded
    pub fn data(&self) -> Option<&ArrayD<f64>> {
        match &self.values {
            Values::Loaded(data) => Some(data),
            _ => None,
        }
    }

    /// Strings of a text variable
    pub fn strings(&self) -> Option<&ArrayD<String>> {
        match &self.values {
            Values::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric values of the variable, reading them from disk when necessary
    pub fn values(&self) -> Result<ArrayD<f64>> {
        match &self.values {
            Values::Loaded(data) => Ok(data.clone()),
            Values::Lazy(lazy) => lazy.read(),
            Values::Text(_) => Err(PangaeaError::Generic(format!(
                "Variable '{}' holds text, not numbers",
                self.name
            ))),
        }
    }

    /// Whether both variables hold the same values, NaN matching NaN
    pub fn same_values(&self, other: &Variable) -> Result<bool> {
        match (&self.values, &other.values) {
            (Values::Text(a), Values::Text(b)) => Ok(a == b),
            (Values::Text(_), _) | (_, Values::Text(_)) => Ok(false),
            _ => {
                let a = self.values()?;
                let b = other.values()?;
                Ok(a.shape() == b.shape()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(x, y)| x == y || (x.is_nan() && y.is_nan())))
            }
        }
    }

    /// Read lazy values into memory
    pub fn load(&mut self) -> Result<()> {
        if let Values::Lazy(lazy) = &self.values {
            self.values = Values::Loaded(lazy.read()?);
        }
        Ok(())
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Remove a length-1 dimension.
    pub fn squeeze(&mut self, dim: &str) -> Result<()> {
        let axis = self
            .axis_of(dim)
            .ok_or_else(|| PangaeaError::DimensionNotFound {
                var: self.name.clone(),
                dim: dim.to_string(),
            })?;

        let len = self.shape()[axis];
        if len != 1 {
            return Err(PangaeaError::NotSqueezable {
                var: self.name.clone(),
                dim: dim.to_string(),
                len,
            });
        }

        match &mut self.values {
            Values::Loaded(data) => {
                let squeezed = data.index_axis(Axis(axis), 0).to_owned();
                *data = squeezed;
            }
            Values::Lazy(lazy) => lazy.remove_axis(axis),
            Values::Text(text) => {
                let squeezed = text.index_axis(Axis(axis), 0).to_owned();
                *text = squeezed;
            }
        }
        self.dims.remove(axis);
        Ok(())
    }

    /// Join parts of the same variable along `axis`
    fn stack(parts: &[&Variable], axis: usize) -> Result<Variable> {
        let first = parts[0];

        let texts: Option<Vec<ArrayViewD<'_, String>>> =
            parts.iter().map(|part| part.strings().map(|t| t.view())).collect();
        let lazies: Option<Vec<&LazyArray>> = parts
            .iter()
            .map(|part| match &part.values {
                Values::Lazy(lazy) => Some(lazy),
                _ => None,
            })
            .collect();

        let values = match (texts, lazies.and_then(|l| LazyArray::stack(&l, axis))) {
            (Some(views), _) => Values::Text(concatenate(Axis(axis), &views)?),
            (None, Some(lazy)) => Values::Lazy(lazy),
            (None, None) => {
                let arrays = parts
                    .iter()
                    .map(|part| part.values())
                    .collect::<Result<Vec<_>>>()?;
                let views: Vec<ArrayViewD<'_, f64>> = arrays.iter().map(|a| a.view()).collect();
                Values::Loaded(concatenate(Axis(axis), &views)?)
            }
        };

        Ok(Variable {
            name: first.name.clone(),
            dims: first.dims.clone(),
            attrs: first.attrs.clone(),
            values,
        })
    }
}

/// An ordered collection of labeled variables
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    variables: Vec<Variable>,
    coords: BTreeSet<String>,
    attrs: BTreeMap<String, AttributeValue>,
    sources: Vec<PathBuf>,
    lsm: LsmAccessor,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files the dataset was read from, in concatenation order
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub(crate) fn add_source(&mut self, path: &Path) {
        self.sources.push(path.to_path_buf());
    }

    pub fn attrs(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attrs
    }

    pub fn set_attribute(&mut self, name: &str, value: AttributeValue) {
        self.attrs.insert(name.to_string(), value);
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// Add a data variable, replacing any variable with the same name
    pub fn insert_variable(&mut self, variable: Variable) {
        match self.variables.iter_mut().find(|v| v.name == variable.name) {
            Some(existing) => *existing = variable,
            None => self.variables.push(variable),
        }
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        let index = self.variables.iter().position(|v| v.name == name)?;
        self.coords.remove(name);
        Some(self.variables.remove(index))
    }

    /// Dimension names and lengths in order of first appearance
    pub fn dims(&self) -> Vec<(String, usize)> {
        let mut dims: Vec<(String, usize)> = Vec::new();
        for var in &self.variables {
            for (dim, len) in var.dims.iter().zip(var.shape()) {
                if !dims.iter().any(|(name, _)| name == dim) {
                    dims.push((dim.clone(), len));
                }
            }
        }
        dims
    }

    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.variables.iter().find_map(|var| {
            var.axis_of(dim).map(|axis| var.shape()[axis])
        })
    }

    pub fn is_coord(&self, name: &str) -> bool {
        self.coords.contains(name)
    }

    /// Coordinate variable names in dataset order
    pub fn coords(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| self.coords.contains(&v.name))
            .map(|v| v.name.as_str())
            .collect()
    }

    /// Data variable names in dataset order
    pub fn data_vars(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| !self.coords.contains(&v.name))
            .map(|v| v.name.as_str())
            .collect()
    }

    /// Promote variables to coordinates, loading their values.
    ///
    /// Nothing changes unless every name exists.
    pub fn set_coords(&mut self, names: &[&str]) -> Result<()> {
        if let Some(missing) = names.iter().find(|name| !self.contains(name)) {
            return Err(PangaeaError::VariableNotFound {
                var: missing.to_string(),
            });
        }

        for name in names {
            if let Some(var) = self.variable_mut(name) {
                var.load()?;
            }
            self.coords.insert(name.to_string());
        }
        Ok(())
    }

    /// Load every lazy variable into memory
    pub fn load(&mut self) -> Result<()> {
        for var in &mut self.variables {
            var.load()?;
        }
        Ok(())
    }

    pub fn lsm(&self) -> &LsmAccessor {
        &self.lsm
    }

    pub fn lsm_mut(&mut self) -> &mut LsmAccessor {
        &mut self.lsm
    }

    /// Stack datasets along `dim`.
    ///
    /// Variables that use `dim` are joined in the given order. Variables that
    /// do not are taken from the first dataset, as are attributes, the
    /// coordinate set and the accessor. Coordinates without `dim` must hold the
    /// same values in every dataset.
    pub fn concat(datasets: Vec<Dataset>, dim: &str) -> Result<Dataset> {
        let mut iter = datasets.into_iter();
        let mut first = iter.next().ok_or_else(|| {
            PangaeaError::Generic("Cannot concatenate an empty list of datasets".to_string())
        })?;
        let rest: Vec<Dataset> = iter.collect();
        if rest.is_empty() {
            return Ok(first);
        }

        for other in &rest {
            first.check_schema(other, dim)?;
        }

        let mut variables = Vec::with_capacity(first.variables.len());
        for var in &first.variables {
            let variable = match var.axis_of(dim) {
                Some(axis) => {
                    let mut parts = vec![var];
                    for other in &rest {
                        if let Some(part) = other.variable(&var.name) {
                            parts.push(part);
                        }
                    }
                    Variable::stack(&parts, axis)?
                }
                None => var.clone(),
            };
            variables.push(variable);
        }

        first.variables = variables;
        for other in rest {
            first.sources.extend(other.sources);
        }
        Ok(first)
    }

    /// Check that `other` can be appended to `self` along `dim`
    fn check_schema(&self, other: &Dataset, dim: &str) -> Result<()> {
        let path = other.sources.first().cloned().unwrap_or_default();
        let mismatch = |message: String| PangaeaError::SchemaMismatch {
            path: path.clone(),
            message,
        };

        for var in &self.variables {
            let other_var = other
                .variable(&var.name)
                .ok_or_else(|| mismatch(format!("variable '{}' is missing", var.name)))?;

            if other_var.dims != var.dims {
                return Err(mismatch(format!(
                    "variable '{}' has dimensions [{}], expected [{}]",
                    var.name,
                    other_var.dims.join(", "),
                    var.dims.join(", ")
                )));
            }

            let shape = var.shape();
            let other_shape = other_var.shape();
            for (axis, name) in var.dims.iter().enumerate() {
                if name != dim && shape[axis] != other_shape[axis] {
                    return Err(mismatch(format!(
                        "dimension '{}' of variable '{}' has length {}, expected {}",
                        name, var.name, other_shape[axis], shape[axis]
                    )));
                }
            }
        }

        for var in self.variables.iter().filter(|v| self.is_coord(&v.name)) {
            if var.axis_of(dim).is_some() || !other.is_coord(&var.name) {
                continue;
            }
            if let Some(other_var) = other.variable(&var.name) {
                if !var.same_values(other_var)? {
                    return Err(mismatch(format!(
                        "values of coordinate '{}' differ",
                        var.name
                    )));
                }
            }
        }
        Ok(())
    }
}
