//! Defines command-line interface options using `clap` for the pangaea application.

use clap::Parser;
use pangaea::{LoadStrategy, LsmNames};
use std::path::PathBuf;

/// A CLI tool for opening land surface model NetCDF output
#[derive(Parser, Debug)]
#[command(
    version,
    name = "pangaea",
    about = "Open land surface model NetCDF files as one dataset"
)]
pub struct Args {
    /// Path to the LSM files with wildcard (e.g. '/path/to/files/*.nc')
    #[arg(short, long)]
    pub files: String,

    /// Latitude variable
    #[arg(long, default_value = "lat")]
    pub lat_var: String,

    /// Longitude variable
    #[arg(long, default_value = "lon")]
    pub lon_var: String,

    /// Time variable
    #[arg(long, default_value = "time")]
    pub time_var: String,

    /// Latitude dimension
    #[arg(long, default_value = "lat")]
    pub lat_dim: String,

    /// Longitude dimension
    #[arg(long, default_value = "lon")]
    pub lon_dim: String,

    /// Time dimension
    #[arg(long, default_value = "time")]
    pub time_dim: String,

    /// Keep files open between reads instead of closing them after each read
    #[arg(long, default_value_t = false)]
    pub keep_open: bool,

    /// Print the dataset summary as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Path to save the normalized dataset as NetCDF
    #[arg(long)]
    pub output_netcdf: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn names(&self) -> LsmNames {
        LsmNames::new(
            &self.lat_var,
            &self.lon_var,
            &self.time_var,
            &self.lat_dim,
            &self.lon_dim,
            &self.time_dim,
        )
    }

    pub fn strategy(&self) -> LoadStrategy {
        LoadStrategy::from(!self.keep_open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["pangaea", "--files", "/data/*.nc"]);
        assert_eq!(args.names(), LsmNames::default());
        assert_eq!(args.strategy(), LoadStrategy::AutoClose);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_custom_names() {
        let args = Args::parse_from([
            "pangaea",
            "-f",
            "/data/*.nc",
            "--lat-var",
            "XLAT",
            "--lon-var",
            "XLONG",
            "--lat-dim",
            "south_north",
            "--lon-dim",
            "west_east",
            "--keep-open",
            "-vv",
        ]);
        let names = args.names();
        assert_eq!(names.lat_var, "XLAT");
        assert_eq!(names.lon_dim, "west_east");
        assert_eq!(names.time_dim, "time");
        assert_eq!(args.strategy(), LoadStrategy::KeepOpen);
        assert_eq!(args.verbose, 2);
    }
}
