//! File handle management and lazily read variable chunks
//!
//! A variable that has not been loaded is described by one [`Chunk`] per
//! source file. Reading goes through [`FileHandles`], which either reopens the
//! file for every read or keeps one handle per path for the lifetime of the
//! dataset. Values pass through the variable's [`Encoding`] as they are read,
//! so fill values come back as NaN and packed integers come back scaled.

use crate::errors::{PangaeaError, Result};
use ndarray::{concatenate, ArrayD, ArrayViewD, Axis, IxDyn};
use netcdf::{AttributeValue, File};
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// How source files are accessed when lazy variables are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStrategy {
    /// Open the file for each read and close it right after
    #[default]
    AutoClose,
    /// Keep every file open once it has been read from
    KeepOpen,
}

impl From<bool> for LoadStrategy {
    /// `true` selects [`LoadStrategy::AutoClose`].
    fn from(autoclose: bool) -> Self {
        if autoclose {
            LoadStrategy::AutoClose
        } else {
            LoadStrategy::KeepOpen
        }
    }
}

/// Shared access to the files backing a dataset
pub struct FileHandles {
    strategy: LoadStrategy,
    open: RefCell<HashMap<PathBuf, File>>,
}

impl FileHandles {
    pub fn new(strategy: LoadStrategy) -> Self {
        Self {
            strategy,
            open: RefCell::new(HashMap::new()),
        }
    }

    pub fn strategy(&self) -> LoadStrategy {
        self.strategy
    }

    /// Number of files currently held open
    pub fn open_count(&self) -> usize {
        self.open.borrow().len()
    }

    /// Run `f` against the NetCDF file at `path`.
    pub fn with_file<T, F>(&self, path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&File) -> Result<T>,
    {
        match self.strategy {
            LoadStrategy::AutoClose => {
                let file = netcdf::open(path)?;
                f(&file)
            }
            LoadStrategy::KeepOpen => {
                let mut open = self.open.borrow_mut();
                let file = match open.entry(path.to_path_buf()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        debug!(path = %path.display(), "keeping file open");
                        entry.insert(netcdf::open(path)?)
                    }
                };
                f(file)
            }
        }
    }
}

impl fmt::Debug for FileHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandles")
            .field("strategy", &self.strategy)
            .field("open", &self.open_count())
            .finish()
    }
}

/// CF missing-value and packing attributes of a variable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Encoding {
    fill_values: Vec<f64>,
    scale_factor: Option<f64>,
    add_offset: Option<f64>,
}

impl Encoding {
    /// Collect `_FillValue`, `missing_value`, `scale_factor` and `add_offset`.
    pub fn from_attrs(attrs: &BTreeMap<String, AttributeValue>) -> Self {
        let fill_values = ["_FillValue", "missing_value"]
            .iter()
            .filter_map(|name| attrs.get(*name))
            .flat_map(attribute_numbers)
            .filter(|v| !v.is_nan())
            .collect();
        let first = |name: &str| {
            attrs
                .get(name)
                .and_then(|v| attribute_numbers(v).first().copied())
        };

        Self {
            fill_values,
            scale_factor: first("scale_factor"),
            add_offset: first("add_offset"),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.fill_values.is_empty() && self.scale_factor.is_none() && self.add_offset.is_none()
    }

    /// Mask fill values to NaN, then unpack with `value * scale_factor + add_offset`.
    pub fn apply(&self, data: &mut ArrayD<f64>) {
        if self.is_identity() {
            return;
        }
        let scale = self.scale_factor.unwrap_or(1.0);
        let offset = self.add_offset.unwrap_or(0.0);
        data.mapv_inplace(|v| {
            if self.fill_values.contains(&v) {
                f64::NAN
            } else {
                v * scale + offset
            }
        });
    }
}

/// Numeric contents of an attribute, empty for text
pub(crate) fn attribute_numbers(value: &AttributeValue) -> Vec<f64> {
    match value {
        AttributeValue::Uchar(v) => vec![f64::from(*v)],
        AttributeValue::Uchars(v) => v.iter().map(|&x| f64::from(x)).collect(),
        AttributeValue::Schar(v) => vec![f64::from(*v)],
        AttributeValue::Schars(v) => v.iter().map(|&x| f64::from(x)).collect(),
        AttributeValue::Ushort(v) => vec![f64::from(*v)],
        AttributeValue::Ushorts(v) => v.iter().map(|&x| f64::from(x)).collect(),
        AttributeValue::Short(v) => vec![f64::from(*v)],
        AttributeValue::Shorts(v) => v.iter().map(|&x| f64::from(x)).collect(),
        AttributeValue::Uint(v) => vec![f64::from(*v)],
        AttributeValue::Uints(v) => v.iter().map(|&x| f64::from(x)).collect(),
        AttributeValue::Int(v) => vec![f64::from(*v)],
        AttributeValue::Ints(v) => v.iter().map(|&x| f64::from(x)).collect(),
        AttributeValue::Ulonglong(v) => vec![*v as f64],
        AttributeValue::Ulonglongs(v) => v.iter().map(|&x| x as f64).collect(),
        AttributeValue::Longlong(v) => vec![*v as f64],
        AttributeValue::Longlongs(v) => v.iter().map(|&x| x as f64).collect(),
        AttributeValue::Float(v) => vec![f64::from(*v)],
        AttributeValue::Floats(v) => v.iter().map(|&x| f64::from(x)).collect(),
        AttributeValue::Double(v) => vec![*v],
        AttributeValue::Doubles(v) => v.clone(),
        AttributeValue::Str(_) | AttributeValue::Strs(_) => Vec::new(),
    }
}

/// One file's contribution to a lazy variable
#[derive(Debug, Clone)]
pub struct Chunk {
    path: PathBuf,
    var_name: String,
    shape: Vec<usize>,
    encoding: Encoding,
}

impl Chunk {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn read(&self, handles: &FileHandles) -> Result<ArrayD<f64>> {
        handles.with_file(&self.path, |file| {
            let var = file
                .variable(&self.var_name)
                .ok_or_else(|| PangaeaError::VariableNotFound {
                    var: self.var_name.clone(),
                })?;
            let values: Vec<f64> = var.get_values::<f64, _>(..)?;
            // The stored shape may have had length-1 axes squeezed out
            let mut data = ArrayD::from_shape_vec(IxDyn(&self.shape), values)?;
            self.encoding.apply(&mut data);
            Ok(data)
        })
    }
}

/// Variable values that are read from disk on demand
#[derive(Debug, Clone)]
pub struct LazyArray {
    chunks: Vec<Chunk>,
    axis: usize,
    shape: Vec<usize>,
    handles: Rc<FileHandles>,
}

impl LazyArray {
    pub fn new(
        path: &Path,
        var_name: &str,
        shape: Vec<usize>,
        encoding: Encoding,
        handles: Rc<FileHandles>,
    ) -> Self {
        Self {
            chunks: vec![Chunk {
                path: path.to_path_buf(),
                var_name: var_name.to_string(),
                shape: shape.clone(),
                encoding,
            }],
            axis: 0,
            shape,
            handles,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Axis the chunks are stacked along
    pub fn concat_axis(&self) -> usize {
        self.axis
    }

    /// Drop a length-1 axis without touching the files.
    pub(crate) fn remove_axis(&mut self, axis: usize) {
        for chunk in &mut self.chunks {
            chunk.shape.remove(axis);
        }
        self.shape.remove(axis);
        if axis < self.axis {
            self.axis -= 1;
        } else if axis == self.axis {
            self.axis = 0;
        }
    }

    /// Join lazy arrays end to end along `axis`.
    ///
    /// Returns `None` when one of the parts is already stacked along a
    /// different axis.
    pub(crate) fn stack(parts: &[&LazyArray], axis: usize) -> Option<LazyArray> {
        let first = parts.first()?;
        if parts
            .iter()
            .any(|part| part.chunks.len() > 1 && part.axis != axis)
        {
            return None;
        }

        let chunks: Vec<Chunk> = parts
            .iter()
            .flat_map(|part| part.chunks.iter().cloned())
            .collect();
        let mut shape = first.shape.clone();
        shape[axis] = parts.iter().map(|part| part.shape[axis]).sum();

        Some(LazyArray {
            chunks,
            axis,
            shape,
            handles: Rc::clone(&first.handles),
        })
    }

    /// Read every chunk and assemble the full array
    pub fn read(&self) -> Result<ArrayD<f64>> {
        debug!(chunks = self.chunks.len(), "reading lazy variable");
        let mut arrays = self
            .chunks
            .iter()
            .map(|chunk| chunk.read(&self.handles))
            .collect::<Result<Vec<_>>>()?;

        if arrays.len() == 1 {
            return Ok(arrays.remove(0));
        }

        let views: Vec<ArrayViewD<'_, f64>> = arrays.iter().map(|a| a.view()).collect();
        Ok(concatenate(Axis(self.axis), &views)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles() -> Rc<FileHandles> {
        Rc::new(FileHandles::new(LoadStrategy::AutoClose))
    }

    fn lazy(path: &str, shape: Vec<usize>, handles: &Rc<FileHandles>) -> LazyArray {
        LazyArray::new(Path::new(path), "T2", shape, Encoding::default(), Rc::clone(handles))
    }

    #[test]
    fn test_load_strategy_from_bool() {
        assert_eq!(LoadStrategy::from(true), LoadStrategy::AutoClose);
        assert_eq!(LoadStrategy::from(false), LoadStrategy::KeepOpen);
        assert_eq!(LoadStrategy::default(), LoadStrategy::AutoClose);
    }

    #[test]
    fn test_stack_sums_concat_axis() {
        let h = handles();
        let a = lazy("a.nc", vec![1, 2, 3], &h);
        let b = lazy("b.nc", vec![2, 2, 3], &h);

        let stacked = LazyArray::stack(&[&a, &b], 0).expect("parts should stack");
        assert_eq!(stacked.shape(), &[3, 2, 3]);
        assert_eq!(stacked.chunks().len(), 2);
        assert_eq!(stacked.chunks()[1].path(), Path::new("b.nc"));
    }

    #[test]
    fn test_remove_axis_shifts_concat_axis() {
        let h = handles();
        let a = lazy("a.nc", vec![2, 1, 3], &h);
        let b = lazy("b.nc", vec![2, 1, 3], &h);
        let mut stacked = LazyArray::stack(&[&a, &b], 2).expect("parts should stack");
        assert_eq!(stacked.shape(), &[2, 1, 6]);

        stacked.remove_axis(1);
        assert_eq!(stacked.shape(), &[2, 6]);
        assert_eq!(stacked.concat_axis(), 1);
        assert!(stacked.chunks().iter().all(|c| c.shape() == [2, 3]));
    }

    #[test]
    fn test_encoding_masks_then_scales() {
        let mut attrs = BTreeMap::new();
        attrs.insert("_FillValue".to_string(), AttributeValue::Float(-9999.0));
        attrs.insert("scale_factor".to_string(), AttributeValue::Double(0.5));
        attrs.insert("add_offset".to_string(), AttributeValue::Short(1));
        let encoding = Encoding::from_attrs(&attrs);

        let mut data = ArrayD::from_shape_vec(IxDyn(&[3]), vec![-9999.0, 4.0, 0.0]).unwrap();
        encoding.apply(&mut data);
        assert!(data[[0]].is_nan());
        assert_eq!(data[[1]], 3.0);
        assert_eq!(data[[2]], 1.0);
    }

    #[test]
    fn test_encoding_without_attributes_is_identity() {
        let mut attrs = BTreeMap::new();
        attrs.insert("units".to_string(), AttributeValue::Str("mm".to_string()));
        let encoding = Encoding::from_attrs(&attrs);
        assert!(encoding.is_identity());

        let mut data = ArrayD::from_shape_vec(IxDyn(&[2]), vec![-9999.0, 4.0]).unwrap();
        encoding.apply(&mut data);
        assert_eq!(data.as_slice().unwrap(), &[-9999.0, 4.0]);
    }

    #[test]
    fn test_missing_file_propagates_netcdf_error() {
        let missing = lazy("/nonexistent/pangaea/missing.nc", vec![1], &handles());
        assert!(matches!(missing.read(), Err(PangaeaError::NetCDFError(_))));
    }
}
