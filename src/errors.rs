//! Centralized error handling for pangaea
//!
//! Errors raised by the NetCDF library, the filesystem and glob resolution are
//! wrapped as-is so callers see the underlying cause.

use std::fmt;
use std::path::PathBuf;

/// Main error type for pangaea operations
#[derive(Debug)]
pub enum PangaeaError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Malformed glob pattern
    PatternError(glob::PatternError),

    /// Unreadable path while walking a glob pattern
    GlobError(glob::GlobError),

    /// Glob pattern did not match any file
    NoFilesFound { pattern: String },

    /// Variable not found in the dataset
    VariableNotFound { var: String },

    /// Dimension not found in variable
    DimensionNotFound { var: String, dim: String },

    /// Squeezing a dimension whose length is not 1
    NotSqueezable { var: String, dim: String, len: usize },

    /// Files that are concatenated do not share a schema
    SchemaMismatch { path: PathBuf, message: String },

    /// Time coordinate could not be decoded into datetimes
    TimeDecodeError { var: String, message: String },

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Generic error
    Generic(String),
}

impl fmt::Display for PangaeaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PangaeaError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            PangaeaError::IoError(e) => write!(f, "I/O error: {}", e),
            PangaeaError::PatternError(e) => write!(f, "Invalid path pattern: {}", e),
            PangaeaError::GlobError(e) => write!(f, "Unreadable path: {}", e),
            PangaeaError::NoFilesFound { pattern } => {
                write!(f, "No files found matching '{}'", pattern)
            }
            PangaeaError::VariableNotFound { var } => {
                write!(f, "Variable '{}' not found in dataset", var)
            }
            PangaeaError::DimensionNotFound { var, dim } => {
                write!(f, "Dimension '{}' not found in variable '{}'", dim, var)
            }
            PangaeaError::NotSqueezable { var, dim, len } => write!(
                f,
                "Cannot squeeze dimension '{}' of variable '{}': length is {}, not 1",
                dim, var, len
            ),
            PangaeaError::SchemaMismatch { path, message } => {
                write!(f, "Schema mismatch in '{}': {}", path.display(), message)
            }
            PangaeaError::TimeDecodeError { var, message } => {
                write!(f, "Cannot decode time variable '{}': {}", var, message)
            }
            PangaeaError::ArrayError(e) => write!(f, "Array error: {}", e),
            PangaeaError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PangaeaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PangaeaError::NetCDFError(e) => Some(e),
            PangaeaError::IoError(e) => Some(e),
            PangaeaError::PatternError(e) => Some(e),
            PangaeaError::GlobError(e) => Some(e),
            PangaeaError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for PangaeaError {
    fn from(error: netcdf::Error) -> Self {
        PangaeaError::NetCDFError(error)
    }
}

impl From<std::io::Error> for PangaeaError {
    fn from(error: std::io::Error) -> Self {
        PangaeaError::IoError(error)
    }
}

impl From<glob::PatternError> for PangaeaError {
    fn from(error: glob::PatternError) -> Self {
        PangaeaError::PatternError(error)
    }
}

impl From<glob::GlobError> for PangaeaError {
    fn from(error: glob::GlobError) -> Self {
        PangaeaError::GlobError(error)
    }
}

impl From<ndarray::ShapeError> for PangaeaError {
    fn from(error: ndarray::ShapeError) -> Self {
        PangaeaError::ArrayError(error)
    }
}

impl From<String> for PangaeaError {
    fn from(error: String) -> Self {
        PangaeaError::Generic(error)
    }
}

/// Result type alias for pangaea operations
pub type Result<T> = std::result::Result<T, PangaeaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PangaeaError::NoFilesFound {
            pattern: "/data/*.nc".to_string(),
        };
        assert_eq!(format!("{}", err), "No files found matching '/data/*.nc'");

        let err = PangaeaError::NotSqueezable {
            var: "lat".to_string(),
            dim: "time".to_string(),
            len: 3,
        };
        assert!(format!("{}", err).contains("length is 3"));

        let err: PangaeaError = "boom".to_string().into();
        assert_eq!(format!("{}", err), "boom");
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;

        let io = PangaeaError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.source().is_some());

        let missing = PangaeaError::VariableNotFound {
            var: "lat".to_string(),
        };
        assert!(missing.source().is_none());
    }
}
