//! pangaea: land surface model datasets from NetCDF
//!
//! A convenience layer for loading gridded land surface model (LSM) output
//! stored across many NetCDF files as one labeled dataset with standardized
//! coordinates.
//!
//! ## Module Organization
//!
//! - [`read`]: the multi-file loader [`open_mfdataset`]
//! - [`dataset`]: labeled variables, squeezing and concatenation
//! - [`lsm`]: the LSM accessor (naming metadata, datetime decoding, grids)
//! - [`reader`]: reading a single NetCDF file
//! - [`source`]: file handles and lazily read variables
//! - [`netcdf_io`]: writing datasets back to NetCDF
//! - [`metadata`]: dataset summaries
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pangaea::prelude::*;
//!
//! let names = LsmNames::new("XLAT", "XLONG", "Times", "south_north", "west_east", "Time");
//! let xds = open_mfdataset("/path/to/files/*.nc", &names, true).unwrap();
//!
//! assert_eq!(xds.lsm().y_var, "XLAT");
//! println!("{:?}", xds.lsm().datetime());
//! ```

pub mod dataset;
pub mod errors;
pub mod lsm;
pub mod metadata;
pub mod netcdf_io;
pub mod read;
pub mod reader;
pub mod source;

pub use dataset::{Dataset, Values, Variable};
pub use errors::{PangaeaError, Result};
pub use lsm::{LsmAccessor, LsmNames};
pub use read::open_mfdataset;
pub use source::LoadStrategy;

/// Version of the library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::dataset::{Dataset, Variable};
    pub use crate::errors::{PangaeaError, Result};
    pub use crate::lsm::{LsmAccessor, LsmNames};
    pub use crate::read::open_mfdataset;
    pub use crate::source::LoadStrategy;
}
