use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire simulation crate.
pub type Result<T> = std::result::Result<T, FedErr>;

/// The simulation's error type.
#[derive(Debug)]
pub enum FedErr {
    /// Two parameter or gradient sets that must be combined disagree on their keys or shapes.
    ShapeMismatch { key: String, detail: String },
    /// An operation that needs at least one element was given none.
    EmptyInput { what: &'static str },
    /// The configuration was rejected before the first round.
    InvalidConfig(String),
    /// A dataset could not be built or partitioned.
    InvalidDataset(String),
    /// The aggregated global model contains `NaN` or infinite values.
    NonFinite { round: usize },
    Io(io::Error),
    Json(serde_json::Error),
}

impl FedErr {
    pub(crate) fn shape_mismatch<K, D>(key: K, detail: D) -> Self
    where
        K: Into<String>,
        D: Into<String>,
    {
        Self::ShapeMismatch {
            key: key.into(),
            detail: detail.into(),
        }
    }
}

impl Display for FedErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FedErr::ShapeMismatch { key, detail } => {
                write!(f, "shape mismatch at parameter `{key}`: {detail}")
            }
            FedErr::EmptyInput { what } => write!(f, "empty input: {what}"),
            FedErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            FedErr::InvalidDataset(msg) => write!(f, "invalid dataset: {msg}"),
            FedErr::NonFinite { round } => {
                write!(f, "the global model diverged to non-finite values in round {round}")
            }
            FedErr::Io(e) => write!(f, "io error: {e}"),
            FedErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for FedErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FedErr::Io(e) => Some(e),
            FedErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FedErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for FedErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
