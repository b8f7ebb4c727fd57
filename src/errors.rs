use std::path::PathBuf;

#[cfg(feature = "ndarray")]
use ndarray::ShapeError;
use thiserror::Error;

/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, MiraMonError>;

#[derive(Debug, Error)]
pub enum MiraMonError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Bad argument: {0}")]
    BadArgument(String),
    #[error("Unable to open '{path}': {msg}")]
    OpenFailed { path: PathBuf, msg: String },
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("Key '{key}' not found in section [{section}] of '{rel}'")]
    MissingKey {
        rel: PathBuf,
        section: String,
        key: String,
    },
    #[error("Invalid value '{value}' for key '{key}' in section [{section}]")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
    #[error("Unsupported REL version in '{0}': version 4.3 or later is required")]
    UnsupportedRelVersion(PathBuf),
    #[error("Data type '{0}' is not handled")]
    UnhandledDataType(String),
    #[error("Invalid color table '{path}': {msg}")]
    InvalidColorTable { path: PathBuf, msg: String },
    #[error("Invalid DBF file '{path}': {msg}")]
    InvalidDbf { path: PathBuf, msg: String },
    #[error("Invalid attribute table '{path}': {msg}")]
    InvalidAttributeTable { path: PathBuf, msg: String },
    #[error("Corrupt data in row {row} of '{path}': {msg}")]
    CorruptBlock {
        path: PathBuf,
        row: usize,
        msg: String,
    },
    #[error("Block index ({0}, {1}) out of range")]
    BlockIndexOutOfRange(usize, usize),
    #[error("Band index {0} out of range")]
    BandIndexOutOfRange(usize),
    #[error("No geotransform documented")]
    NoGeoTransform,
    #[cfg(feature = "ndarray")]
    #[error(transparent)]
    NdarrayShapeError(#[from] ShapeError),
}
