//! Error types.

use crate::common::*;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error taxonomy of encoding and batch generation.
///
/// None of these are retried. A failing sample aborts the batch it belongs to.
#[derive(Debug, Error)]
pub enum Error {
    /// The annotation names a class absent from the class list.
    #[error("unknown class name '{name}'")]
    UnknownClass { name: String },
    /// Degenerate or out-of-frame box geometry.
    #[error("invalid box: {reason}")]
    InvalidBox { reason: String },
    /// Two boxes fall into one cell under [CollisionPolicy::Reject](crate::CollisionPolicy::Reject).
    #[error("grid cell (row {row}, col {col}) already holds an object")]
    CellCollision { row: usize, col: usize },
    /// The image or annotation of a sample is missing or unparsable.
    #[error("failed to load sample '{id}'")]
    SampleLoad {
        id: String,
        #[source]
        source: LoadError,
    },
    #[error("failed to access '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file '{}'", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: json5::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("malformed target vector: {0}")]
    MalformedTarget(String),
}

impl Error {
    pub(crate) fn invalid_box(reason: impl Into<String>) -> Self {
        Self::InvalidBox {
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// The underlying cause of [Error::SampleLoad].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Annotation(#[from] serde_xml_rs::Error),
    #[error("expect image shape {expect:?}, but get {actual:?}")]
    Shape {
        expect: (usize, usize, usize),
        actual: (usize, usize, usize),
    },
}
