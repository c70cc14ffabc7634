//! Ready-made transforms that load a file named on the command line.
//!
//! Use them with [`Arg::try_transform`](crate::Arg::try_transform) on a
//! `PathBuf` field; a failure is reported to the user like a validation
//! error.
//!
//! # Examples
//!
//! ```
//! use std::path::PathBuf;
//! use cfgspec_core::{Arg, transforms};
//!
//! let notes = Arg::<PathBuf>::new("Release notes file").try_transform(transforms::file_text);
//! let settings =
//!     Arg::<PathBuf>::new("Settings file").try_transform(transforms::json_file::<serde_json::Value>);
//! # let _ = (notes, settings);
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure to load a file through one of the bundled transforms.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    /// The file is not valid JSON for the target type.
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The file is not valid YAML for the target type.
    #[error("invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Reads a UTF-8 text file.
pub fn file_text(path: PathBuf) -> Result<String, TransformError> {
    fs::read_to_string(&path).map_err(|source| TransformError::Io { path, source })
}

/// Reads a file as raw bytes.
pub fn file_bytes(path: PathBuf) -> Result<Vec<u8>, TransformError> {
    fs::read(&path).map_err(|source| TransformError::Io { path, source })
}

/// Reads and deserializes a JSON file.
pub fn json_file<T: DeserializeOwned>(path: PathBuf) -> Result<T, TransformError> {
    let text = file_text(path.clone())?;
    serde_json::from_str(&text).map_err(|source| TransformError::Json { path, source })
}

/// Reads and deserializes a YAML file.
pub fn yaml_file<T: DeserializeOwned>(path: PathBuf) -> Result<T, TransformError> {
    let text = file_text(path.clone())?;
    serde_yaml::from_str(&text).map_err(|source| TransformError::Yaml { path, source })
}

impl TransformError {
    /// Path of the file that failed to load.
    pub fn path(&self) -> &Path {
        match self {
            TransformError::Io { path, .. }
            | TransformError::Json { path, .. }
            | TransformError::Yaml { path, .. } => path,
        }
    }
}
