//! Dataset inspection
//!
//! Builds a [`DatasetSummary`] describing dimensions, coordinates, data
//! variables and the LSM naming of an opened dataset, printable as text or
//! JSON.

use crate::dataset::{Dataset, Variable};
use chrono::NaiveDateTime;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Structured description of a variable
#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub name: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub units: Option<String>,
    pub loaded: bool,
}

impl VariableInfo {
    fn from_variable(var: &Variable) -> Self {
        Self {
            name: var.name().to_string(),
            dimensions: var.dims().to_vec(),
            shape: var.shape(),
            units: var.string_attribute("units").map(str::to_string),
            loaded: var.is_loaded(),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "dimensions": self.dimensions,
            "shape": self.shape,
            "units": self.units,
            "loaded": self.loaded,
        })
    }
}

/// Overview of an opened dataset
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub sources: Vec<PathBuf>,
    pub dimensions: Vec<(String, usize)>,
    pub coordinates: Vec<VariableInfo>,
    pub data_variables: Vec<VariableInfo>,
    pub lsm: [(&'static str, String); 6],
    pub time_range: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl DatasetSummary {
    pub fn from_dataset(ds: &Dataset) -> Self {
        let lsm = ds.lsm();
        let time_range = lsm
            .datetime()
            .and_then(|times| Some((*times.first()?, *times.last()?)));

        Self {
            sources: ds.sources().to_vec(),
            dimensions: ds.dims(),
            coordinates: describe(ds, ds.coords()),
            data_variables: describe(ds, ds.data_vars()),
            lsm: [
                ("y_var", lsm.y_var.clone()),
                ("x_var", lsm.x_var.clone()),
                ("time_var", lsm.time_var.clone()),
                ("y_dim", lsm.y_dim.clone()),
                ("x_dim", lsm.x_dim.clone()),
                ("time_dim", lsm.time_dim.clone()),
            ],
            time_range,
        }
    }

    pub fn to_json(&self) -> Value {
        let lsm: serde_json::Map<String, Value> = self
            .lsm
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
            .collect();
        let dimensions: serde_json::Map<String, Value> = self
            .dimensions
            .iter()
            .map(|(name, len)| (name.clone(), json!(len)))
            .collect();

        json!({
            "sources": self.sources.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "dimensions": dimensions,
            "coordinates": self.coordinates.iter().map(VariableInfo::to_json).collect::<Vec<_>>(),
            "data_variables": self.data_variables.iter().map(VariableInfo::to_json).collect::<Vec<_>>(),
            "lsm": lsm,
            "time_range": self.time_range.map(|(start, end)| json!({
                "start": start.to_string(),
                "end": end.to_string(),
            })),
        })
    }
}

fn describe(ds: &Dataset, names: Vec<&str>) -> Vec<VariableInfo> {
    names
        .into_iter()
        .filter_map(|name| ds.variable(name))
        .map(VariableInfo::from_variable)
        .collect()
}

fn print_variables(title: &str, variables: &[VariableInfo]) {
    println!("\n {}", title);
    println!("{}", "=".repeat(title.len() + 2));
    if variables.is_empty() {
        println!("   (none)");
        return;
    }

    for var in variables {
        let shape: Vec<String> = var.shape.iter().map(|s| s.to_string()).collect();
        let units = var
            .units
            .as_ref()
            .map(|u| format!(" [{}]", u))
            .unwrap_or_default();
        println!(
            "    {}: ({}) = ({}){}",
            var.name,
            var.dimensions.join(", "),
            shape.join(" × "),
            units
        );
    }
}

/// Prints a human-readable summary of the dataset.
pub fn print_summary(ds: &Dataset) {
    let summary = DatasetSummary::from_dataset(ds);

    println!("\n Sources");
    println!("=========");
    for source in &summary.sources {
        println!("    {}", source.display());
    }

    println!("\n Dimensions");
    println!("============");
    for (name, len) in &summary.dimensions {
        println!("    {} = {}", name, len);
    }

    print_variables("Coordinates", &summary.coordinates);
    print_variables("Data variables", &summary.data_variables);

    println!("\n LSM names");
    println!("===========");
    for (key, value) in &summary.lsm {
        println!("    {}: {}", key, value);
    }

    if let Some((start, end)) = summary.time_range {
        println!("\n Time range: {} to {}", start, end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsm::LsmNames;
    use ndarray::{ArrayD, IxDyn};
    use netcdf::AttributeValue;

    fn dataset() -> Dataset {
        let mut ds = Dataset::new();
        let mut time = Variable::new(
            "time",
            vec!["time"],
            ArrayD::from_shape_vec(IxDyn(&[2]), vec![0.0, 1.0]).unwrap(),
        )
        .unwrap();
        time.set_attribute("units", AttributeValue::Str("days since 2017-01-01".to_string()));
        ds.insert_variable(time);
        ds.insert_variable(
            Variable::new(
                "RAINRATE",
                vec!["time", "y"],
                ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![0.0; 6]).unwrap(),
            )
            .unwrap(),
        );
        ds.set_coords(&["time"]).unwrap();
        ds.lsm_mut()
            .set_names(&LsmNames::new("lat", "lon", "time", "y", "x", "time"));
        ds.lsm_to_datetime().unwrap();
        ds
    }

    #[test]
    fn test_summary_splits_coords_and_data() {
        let summary = DatasetSummary::from_dataset(&dataset());
        assert_eq!(summary.coordinates.len(), 1);
        assert_eq!(summary.coordinates[0].units.as_deref(), Some("days since 2017-01-01"));
        assert_eq!(summary.data_variables[0].name, "RAINRATE");
        assert_eq!(summary.data_variables[0].shape, vec![2, 3]);
        let (start, end) = summary.time_range.unwrap();
        assert_eq!(end - start, chrono::Duration::days(1));
    }

    #[test]
    fn test_summary_json() {
        let value = DatasetSummary::from_dataset(&dataset()).to_json();
        assert_eq!(value["dimensions"]["time"], json!(2));
        assert_eq!(value["lsm"]["y_dim"], json!("y"));
        assert_eq!(value["data_variables"][0]["name"], json!("RAINRATE"));
        assert_eq!(value["time_range"]["start"], json!("2017-01-01 00:00:00"));
    }
}
